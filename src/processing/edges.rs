use crate::buffer::PixelBuffer;
use crate::config::EdgePolicy;
use crate::processing::color::{luma_u8, quantize};

const SOBEL_X: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
const SOBEL_Y: [f32; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

/// Sobel gradient magnitude over the luma field, written as a grayscale map.
///
/// Interior pixels get `min(255, sqrt(gx^2 + gy^2))` on RGB and an opaque
/// alpha; the 1-pixel ring follows `edges`.
pub fn detect_edges(buffer: &PixelBuffer, edges: EdgePolicy) -> PixelBuffer {
    let (width, height) = buffer.dimensions();
    if width < 3 || height < 3 {
        return buffer.clone();
    }
    let w = width as usize;
    let luminance: Vec<f32> = buffer.as_image().pixels().map(|p| luma_u8(p.0)).collect();

    let mut out = edges.prepare(buffer);
    let dst = out.as_image_mut();
    for y in 1..height as usize - 1 {
        for x in 1..w - 1 {
            let mut gx = 0.0f32;
            let mut gy = 0.0f32;
            for ky in 0..3 {
                let row = (y + ky - 1) * w;
                for kx in 0..3 {
                    let value = luminance[row + x + kx - 1];
                    gx += value * SOBEL_X[ky * 3 + kx];
                    gy += value * SOBEL_Y[ky * 3 + kx];
                }
            }
            let magnitude = quantize((gx * gx + gy * gy).sqrt().min(255.0));
            dst.get_pixel_mut(x as u32, y as u32).0 = [magnitude, magnitude, magnitude, 255];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_image_has_no_edges() {
        let src = PixelBuffer::from_pixel(5, 4, [90, 180, 30, 255]).unwrap();
        let out = detect_edges(&src, EdgePolicy::CopyThrough);
        for y in 1..3 {
            for x in 1..4 {
                assert_eq!(out.pixel(x, y), Some([0, 0, 0, 255]));
            }
        }
    }

    #[test]
    fn vertical_step_saturates() {
        let mut src = PixelBuffer::from_pixel(4, 3, [0, 0, 0, 255]).unwrap();
        for y in 0..3 {
            src.put_pixel(2, y, [255, 255, 255, 255]).unwrap();
            src.put_pixel(3, y, [255, 255, 255, 255]).unwrap();
        }
        let out = detect_edges(&src, EdgePolicy::Transparent);
        assert_eq!(out.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(out.pixel(2, 1), Some([255, 255, 255, 255]));
        assert_eq!(out.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn weak_gradient_is_exact() {
        // columns 10 | 10 | 20: gx = 4 * 10 luma on the centre pixel.
        let mut src = PixelBuffer::from_pixel(3, 3, [10, 10, 10, 255]).unwrap();
        for y in 0..3 {
            src.put_pixel(2, y, [20, 20, 20, 255]).unwrap();
        }
        let out = detect_edges(&src, EdgePolicy::CopyThrough);
        assert_eq!(out.pixel(1, 1), Some([40, 40, 40, 255]));
    }
}
