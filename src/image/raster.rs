use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use image::ImageFormat;
use parking_lot::Mutex;

use crate::error::ViewerError;

/// Decoded image pixels, RGBA8 row-major. Immutable once built.
#[derive(Debug)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at (x, y), clamped to the image bounds.
    pub fn sample(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }
}

/// Sniffs the byte stream and decodes it into RGBA8. Remote sources never get
/// this far: the loader only reads local files, and URLs are rejected up front.
pub fn decode_raster(bytes: &[u8]) -> Result<RasterImage, ViewerError> {
    let format = image::guess_format(bytes).map_err(|_| ViewerError::InvalidFormat)?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(ViewerError::InvalidFormat);
    }

    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(RasterImage::new(width, height, rgba.into_raw()))
}

#[derive(Debug)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub image: Arc<RasterImage>,
}

enum LoaderCommand {
    Load(PathBuf),
    Stop,
}

/// Decodes images off the UI thread. Commands go in, results are drained with
/// `try_recv` from the frame update, so a slow decode never stalls a frame.
pub struct ImageLoader {
    tx_cmd: Sender<LoaderCommand>,
    rx_result: Receiver<Result<LoadedImage, ViewerError>>,
    last_error: Arc<Mutex<Option<String>>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ImageLoader {
    pub fn new() -> Self {
        let (tx_cmd, rx_cmd) = channel::unbounded::<LoaderCommand>();
        let (tx_result, rx_result) = channel::bounded::<Result<LoadedImage, ViewerError>>(2);
        let last_error = Arc::new(Mutex::new(None));
        let last_error_clone = Arc::clone(&last_error);

        let thread_handle = thread::spawn(move || {
            loader_thread(rx_cmd, tx_result, last_error_clone);
        });

        Self {
            tx_cmd,
            rx_result,
            last_error,
            thread_handle: Some(thread_handle),
        }
    }

    pub fn load(&self, path: PathBuf) {
        let _ = self.tx_cmd.send(LoaderCommand::Load(path));
    }

    pub fn try_recv_result(&self) -> Option<Result<LoadedImage, ViewerError>> {
        self.rx_result.try_recv().ok()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub fn stop(&self) {
        let _ = self.tx_cmd.send(LoaderCommand::Stop);
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        let _ = self.tx_cmd.send(LoaderCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

fn loader_thread(
    rx_cmd: Receiver<LoaderCommand>,
    tx_result: Sender<Result<LoadedImage, ViewerError>>,
    last_error: Arc<Mutex<Option<String>>>,
) {
    loop {
        let cmd = match rx_cmd.recv() {
            Ok(c) => c,
            Err(_) => return,
        };

        match cmd {
            LoaderCommand::Load(path) => {
                *last_error.lock() = None;

                match load_from_path(path) {
                    Ok(loaded) => {
                        log::info!(
                            "decoded {} ({}x{})",
                            loaded.path.display(),
                            loaded.image.width(),
                            loaded.image.height()
                        );
                        let _ = tx_result.send(Ok(loaded));
                    }
                    Err(err) => {
                        log::error!("image load failed: {err}");
                        *last_error.lock() = Some(err.to_string());
                        let _ = tx_result.send(Err(err));
                    }
                }
            }
            LoaderCommand::Stop => return,
        }
    }
}

fn load_from_path(path: PathBuf) -> Result<LoadedImage, ViewerError> {
    let display = path.to_string_lossy();
    if display.starts_with("http://") || display.starts_with("https://") {
        return Err(ViewerError::InvalidFormat);
    }

    let bytes = fs::read(&path).map_err(|source| ViewerError::Io {
        path: path.clone(),
        source,
    })?;
    let image = decode_raster(&bytes)?;
    Ok(LoadedImage {
        path,
        image: Arc::new(image),
    })
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    use image::codecs::png::PngEncoder;
    use image::{ColorType, ImageEncoder};

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(rgba, width, height, ColorType::Rgba8.into())
        .expect("encode png");
    out
}

/// Solid-color image helper for displacement and lifecycle tests.
#[cfg(test)]
pub(crate) fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> RasterImage {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
    }
    RasterImage::new(width, height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn decode_raster_round_trips_png() {
        let rgba = vec![10u8, 20, 30, 255, 40, 50, 60, 255];
        let bytes = png_bytes(2, 1, &rgba);

        let raster = decode_raster(&bytes).expect("decode");

        assert_eq!(raster.width(), 2);
        assert_eq!(raster.height(), 1);
        assert_eq!(raster.pixels(), &rgba[..]);
        assert_eq!(raster.sample(0, 0), [10, 20, 30, 255]);
        assert_eq!(raster.sample(99, 99), [40, 50, 60, 255]);
    }

    #[test]
    fn decode_raster_rejects_non_image_bytes() {
        let err = decode_raster(b"definitely not pixels").unwrap_err();
        assert!(matches!(err, ViewerError::InvalidFormat));
    }

    #[test]
    fn decode_raster_reports_corrupt_image_as_decode_error() {
        let mut bytes = png_bytes(4, 4, &[128u8; 4 * 4 * 4]);
        // Valid PNG signature, garbage body.
        bytes.truncate(20);
        let err = decode_raster(&bytes).unwrap_err();
        assert!(matches!(err, ViewerError::Decode(_)));
    }

    #[test]
    fn loader_rejects_url_sources() {
        let err = load_from_path(PathBuf::from("https://example.com/pic.png")).unwrap_err();
        assert!(matches!(err, ViewerError::InvalidFormat));
    }

    #[test]
    fn loader_thread_delivers_decoded_image() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("white.png");
        fs::write(&path, png_bytes(3, 2, &[255u8; 3 * 2 * 4])).expect("write png");

        let loader = ImageLoader::new();
        loader.load(path.clone());

        let mut result = None;
        for _ in 0..200 {
            if let Some(r) = loader.try_recv_result() {
                result = Some(r);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let loaded = result.expect("loader result").expect("decode ok");
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.image.width(), 3);
        assert_eq!(loaded.image.height(), 2);
        assert!(loader.last_error().is_none());
    }
}
