use anyhow::Context;
use fast_image_resize as fir;

use crate::buffer::PixelBuffer;
use crate::config::PreviewOptions;
use crate::error::Error;

/// Backing-store size for displaying a `src_w x src_h` raster.
///
/// The display width is the native width, or `min(native, target)` when
/// fitting; the height follows the aspect ratio. Both are multiplied by zoom
/// and device pixel ratio, rounded, kept at least 1, and scaled down together
/// if either exceeds `max_dimension`.
pub fn compute_backing_size(src_w: u32, src_h: u32, options: &PreviewOptions) -> (u32, u32) {
    let iw = f64::from(src_w.max(1));
    let ih = f64::from(src_h.max(1));
    let display_w = if options.fit_to_width && options.target_display_width > 0 {
        iw.min(f64::from(options.target_display_width))
    } else {
        iw
    };
    let display_h = ih * display_w / iw;

    let scale = positive_or_one(options.zoom) * positive_or_one(options.device_pixel_ratio);
    let mut w = display_w * scale;
    let mut h = display_h * scale;

    let max_dim = f64::from(options.max_dimension.max(1));
    let overflow = (w / max_dim).max(h / max_dim);
    if overflow > 1.0 {
        w /= overflow;
        h /= overflow;
    }
    (
        w.round().clamp(1.0, max_dim) as u32,
        h.round().clamp(1.0, max_dim) as u32,
    )
}

fn positive_or_one(value: f32) -> f64 {
    if value.is_finite() && value > 0.0 {
        f64::from(value)
    } else {
        1.0
    }
}

/// Smoothly resample `buffer` for display. Never mutates its input.
///
/// # Errors
/// Returns [`Error::Preview`] if the resizer rejects the buffers.
pub fn scale(buffer: &PixelBuffer, options: &PreviewOptions) -> Result<PixelBuffer, Error> {
    let (target_w, target_h) = compute_backing_size(buffer.width(), buffer.height(), options);
    resize_bilinear(buffer, target_w, target_h).map_err(Error::Preview)
}

fn resize_bilinear(
    source: &PixelBuffer,
    target_w: u32,
    target_h: u32,
) -> anyhow::Result<PixelBuffer> {
    if source.dimensions() == (target_w, target_h) {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for preview resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("preview resize failed")?;
    PixelBuffer::from_raw(target_w, target_h, dst_image.into_vec())
        .context("failed to construct resized preview")
}
