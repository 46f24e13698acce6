use std::fs;
use std::path::Path;

use anyhow::Context;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;

use crate::renderer::CapturedFrame;

/// File the capture shortcut writes next to the working directory.
pub const CAPTURE_FILE_NAME: &str = "relief3d_capture.png";

pub fn encode_png(width: u32, height: u32, pixels: &[u8]) -> anyhow::Result<Vec<u8>> {
    anyhow::ensure!(
        pixels.len() == (width * height * 4) as usize,
        "pixel buffer does not match {width}x{height} rgba"
    );

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(pixels, width, height, image::ColorType::Rgba8)
        .context("encoding capture as png")?;
    Ok(out)
}

pub fn save_frame(frame: &CapturedFrame, path: &Path) -> anyhow::Result<()> {
    let png = encode_png(frame.width, frame.height, &frame.pixels)?;
    fs::write(path, &png).with_context(|| format!("writing {}", path.display()))?;
    log::info!(
        "exported {}x{} frame to {}",
        frame.width,
        frame.height,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_frame() -> CapturedFrame {
        let mut pixels = Vec::with_capacity(4 * 4 * 4);
        for y in 0..4u32 {
            for x in 0..4u32 {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        CapturedFrame {
            width: 4,
            height: 4,
            pixels,
        }
    }

    #[test]
    fn encoded_png_decodes_to_the_same_pixels() {
        let frame = checker_frame();

        let png = encode_png(frame.width, frame.height, &frame.pixels).expect("encode");
        let decoded = image::load_from_memory(&png).expect("decode").to_rgba8();

        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
        assert_eq!(decoded.into_raw(), frame.pixels);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        assert!(encode_png(4, 4, &[0u8; 7]).is_err());
    }

    #[test]
    fn save_frame_writes_a_readable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CAPTURE_FILE_NAME);

        save_frame(&checker_frame(), &path).expect("save");

        let bytes = fs::read(&path).expect("read back");
        assert!(image::load_from_memory(&bytes).is_ok());
    }
}
