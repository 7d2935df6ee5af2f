//! Shared image geometry for the ONNX preprocessors: letterbox planning and
//! bilinear resizing.

/// Placement of a source image inside a square model input, and the metadata
/// to map detections back out of it.
#[derive(Debug, Clone, Copy)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    /// Resized content size inside the padded square.
    pub new_w: usize,
    pub new_h: usize,
}

impl Letterbox {
    /// Fit `src_w` × `src_h` into a `dst` × `dst` square, preserving aspect
    /// ratio and centering the content.
    pub fn plan(src_w: usize, src_h: usize, dst: usize) -> Self {
        let scale_w = dst as f32 / src_w as f32;
        let scale_h = dst as f32 / src_h as f32;
        let scale = scale_w.min(scale_h);

        let new_w = (src_w as f32 * scale).round() as usize;
        let new_h = (src_h as f32 * scale).round() as usize;
        let pad_x = (dst - new_w) as f32 / 2.0;
        let pad_y = (dst - new_h) as f32 / 2.0;

        Self {
            scale,
            pad_x,
            pad_y,
            new_w,
            new_h,
        }
    }

    /// Map an x coordinate from model-input space back to source space.
    pub fn unmap_x(&self, x: f32) -> f32 {
        (x - self.pad_x) / self.scale
    }

    /// Map a y coordinate from model-input space back to source space.
    pub fn unmap_y(&self, y: f32) -> f32 {
        (y - self.pad_y) / self.scale
    }
}

/// Resize a grayscale image with bilinear interpolation.
pub fn resize_luma(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    resize_channels::<1>(src, src_w, src_h, dst_w, dst_h)
}

/// Resize a packed RGB image with bilinear interpolation.
pub fn resize_rgb(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    resize_channels::<3>(src, src_w, src_h, dst_w, dst_h)
}

/// Bilinear resize over `C` interleaved channels.
///
/// Uses the half-pixel-center convention so that content does not shift when
/// scaling, and clamps at the borders.
fn resize_channels<const C: usize>(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<u8> {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return Vec::new();
    }

    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    let mut out = vec![0u8; dst_w * dst_h * C];

    for y in 0..dst_h {
        let src_y = (y as f32 + 0.5) * y_ratio - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, src_h as i32 - 1) as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..dst_w {
            let src_x = (x as f32 + 0.5) * x_ratio - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, src_w as i32 - 1) as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            for c in 0..C {
                let tl = src[(y0 * src_w + x0) * C + c] as f32;
                let tr = src[(y0 * src_w + x1) * C + c] as f32;
                let bl = src[(y1 * src_w + x0) * C + c] as f32;
                let br = src[(y1 * src_w + x1) * C + c] as f32;

                let val = tl * (1.0 - fx) * (1.0 - fy)
                    + tr * fx * (1.0 - fy)
                    + bl * (1.0 - fx) * fy
                    + br * fx * fy;

                out[(y * dst_w + x) * C + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}
