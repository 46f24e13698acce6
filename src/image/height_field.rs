use crate::image::RasterImage;

/// Luminance samples in [0, 1], one per vertex of the panel grid, row-major.
pub struct HeightField {
    width: usize,
    height: usize,
    samples: Vec<f32>,
}

impl HeightField {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn sample(&self, x: usize, y: usize) -> f32 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.samples[y * self.width + x]
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// Resamples a centered crop of `image` into an `out_w` x `out_h` grid of
/// luminance values. The crop is symmetric and matches the target grid's
/// aspect ratio: a relatively wider image loses its left/right margins, a
/// relatively taller one loses top/bottom.
pub fn extract(image: &RasterImage, out_w: usize, out_h: usize) -> HeightField {
    let out_w = out_w.max(1);
    let out_h = out_h.max(1);

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    let img_aspect = src_w / src_h.max(1.0);
    let target_aspect = out_w as f32 / out_h as f32;

    let (mut sx, mut sy, mut sw, mut sh) = (0.0f32, 0.0f32, src_w, src_h);
    if img_aspect > target_aspect {
        let cropped_w = sh * target_aspect;
        sx = (sw - cropped_w) / 2.0;
        sw = cropped_w;
    } else {
        let cropped_h = sw / target_aspect;
        sy = (sh - cropped_h) / 2.0;
        sh = cropped_h;
    }

    // out dims of 1 collapse to sampling the crop center.
    let du = if out_w > 1 {
        1.0 / (out_w - 1) as f32
    } else {
        0.0
    };
    let dv = if out_h > 1 {
        1.0 / (out_h - 1) as f32
    } else {
        0.0
    };

    let mut samples = Vec::with_capacity(out_w * out_h);
    for y in 0..out_h {
        let v = if out_h > 1 { y as f32 * dv } else { 0.5 };
        for x in 0..out_w {
            let u = if out_w > 1 { x as f32 * du } else { 0.5 };
            let px = sx + u * (sw - 1.0).max(0.0);
            let py = sy + v * (sh - 1.0).max(0.0);
            let [r, g, b, _] = image.sample(px.round() as u32, py.round() as u32);
            samples.push(luminance(r, g, b));
        }
    }

    HeightField {
        width: out_w,
        height: out_h,
        samples,
    }
}

/// Rec.601 luma on channels normalized to [0, 1].
fn luminance(r: u8, g: u8, b: u8) -> f32 {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    0.299 * r + 0.587 * g + 0.114 * b
}
