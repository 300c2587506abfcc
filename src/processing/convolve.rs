use crate::buffer::PixelBuffer;
use crate::config::{EdgePolicy, PostKernel};
use crate::processing::color::quantize;

pub type Kernel3x3 = [f32; 9];

pub const IDENTITY: Kernel3x3 = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
pub const SHARPEN: Kernel3x3 = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];
pub const BOX_BLUR: Kernel3x3 = [1.0; 9];
pub const EMBOSS: Kernel3x3 = [-2.0, -1.0, 0.0, -1.0, 1.0, 1.0, 0.0, 1.0, 2.0];

/// Weights for a named post kernel, or `None` when no kernel is selected.
pub fn kernel_for(kind: PostKernel) -> Option<Kernel3x3> {
    match kind {
        PostKernel::None => None,
        PostKernel::Sharpen => Some(SHARPEN),
        PostKernel::Blur => Some(BOX_BLUR),
        PostKernel::Emboss => Some(EMBOSS),
    }
}

/// Divide every weight by the kernel sum, or by 1 when the sum is zero.
pub fn normalize(kernel: &Kernel3x3) -> Kernel3x3 {
    let sum: f32 = kernel.iter().sum();
    let divisor = if sum == 0.0 { 1.0 } else { sum };
    kernel.map(|w| w / divisor)
}

/// Convolve the interior of `buffer` with a normalised 3x3 kernel.
///
/// Interior pixels get the clamped weighted RGB sum and an opaque alpha. The
/// outermost 1-pixel ring is filled according to `edges`. Rasters without an
/// interior (narrower or shorter than 3 pixels) are returned unchanged.
pub fn convolve(buffer: &PixelBuffer, kernel: &Kernel3x3, edges: EdgePolicy) -> PixelBuffer {
    let (width, height) = buffer.dimensions();
    if width < 3 || height < 3 {
        return buffer.clone();
    }
    let weights = normalize(kernel);
    let src = buffer.as_image();
    let mut out = edges.prepare(buffer);
    let dst = out.as_image_mut();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = [0.0f32; 3];
            for ky in 0..3 {
                for kx in 0..3 {
                    let weight = weights[(ky * 3 + kx) as usize];
                    if weight == 0.0 {
                        continue;
                    }
                    let sample = src.get_pixel(x + kx - 1, y + ky - 1);
                    acc[0] += f32::from(sample[0]) * weight;
                    acc[1] += f32::from(sample[1]) * weight;
                    acc[2] += f32::from(sample[2]) * weight;
                }
            }
            let pixel = dst.get_pixel_mut(x, y);
            pixel.0 = [quantize(acc[0]), quantize(acc[1]), quantize(acc[2]), 255];
        }
    }
    out
}
