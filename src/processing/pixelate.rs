use image::RgbaImage;

use crate::buffer::PixelBuffer;

/// Blocky pixelation: nearest-neighbour downscale by `factor`, then
/// nearest-neighbour upscale back to the original size.
///
/// `factor <= 1` returns an unmodified copy. Factors larger than the raster
/// collapse to a single block.
pub fn pixelate(src: &PixelBuffer, factor: u32) -> PixelBuffer {
    if factor <= 1 {
        return src.clone();
    }
    let (width, height) = src.dimensions();
    let reduced_w = (width / factor).max(1);
    let reduced_h = (height / factor).max(1);

    let reduced = resize_nearest(src.as_image(), reduced_w, reduced_h);
    let restored = resize_nearest(&reduced, width, height);
    match PixelBuffer::from_image(restored) {
        Ok(buf) => buf,
        Err(_) => src.clone(),
    }
}

/// Nearest-neighbour resample with pixel-centre mapping.
///
/// Destination index `d` samples source index `floor((2d + 1) * src / (2 * dst))`.
pub fn resize_nearest(src: &RgbaImage, dst_w: u32, dst_h: u32) -> RgbaImage {
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return src.clone();
    }
    if (src_w, src_h) == (dst_w, dst_h) {
        return src.clone();
    }
    let columns: Vec<u32> = (0..dst_w).map(|x| nearest_index(x, src_w, dst_w)).collect();
    let mut out = RgbaImage::new(dst_w, dst_h);
    for y in 0..dst_h {
        let sy = nearest_index(y, src_h, dst_h);
        for (x, &sx) in columns.iter().enumerate() {
            out.put_pixel(x as u32, y, *src.get_pixel(sx, sy));
        }
    }
    out
}

fn nearest_index(dst: u32, src_len: u32, dst_len: u32) -> u32 {
    let idx = ((2 * u64::from(dst) + 1) * u64::from(src_len)) / (2 * u64::from(dst_len));
    (idx as u32).min(src_len - 1)
}
