/// Largest accepted Gaussian sigma in pixels; larger requests are clamped.
pub const MAX_BLUR_SIGMA: f32 = 100.0;

/// Normalised 1D Gaussian weights for `sigma`, with radius `ceil(3 * sigma)`.
///
/// `sigma` is clamped to `MAX_BLUR_SIGMA`, so the radius never exceeds 300.
pub fn gaussian_kernel(sigma: f32) -> (Vec<f32>, u32) {
    let sigma = if sigma.is_finite() {
        sigma.clamp(0.01, MAX_BLUR_SIGMA)
    } else {
        0.01
    };
    let radius = (sigma * 3.0).ceil() as u32;
    if radius == 0 {
        return (vec![1.0], 0);
    }

    let r = radius as i32;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f32> = (-r..=r)
        .map(|i| {
            let x = i as f32;
            (-x * x / denom).exp()
        })
        .collect();

    let sum: f32 = weights.iter().sum();
    if sum > 0.0 {
        for w in &mut weights {
            *w /= sum;
        }
    }

    (weights, radius)
}

/// Separable Gaussian blur over an interleaved RGB `f32` plane, in place.
///
/// Samples past the raster edge are clamped to the nearest edge pixel.
pub fn blur_rgb_plane(plane: &mut [[f32; 3]], width: usize, height: usize, sigma: f32) {
    if sigma <= 0.0 || width == 0 || height == 0 || plane.len() != width * height {
        return;
    }
    let (weights, radius) = gaussian_kernel(sigma);
    if radius == 0 {
        return;
    }
    let mut tmp = vec![[0.0f32; 3]; plane.len()];
    blur_pass(plane, &mut tmp, width, height, radius as usize, &weights, true);
    blur_pass(&tmp, plane, width, height, radius as usize, &weights, false);
}

fn blur_pass(
    src: &[[f32; 3]],
    dst: &mut [[f32; 3]],
    width: usize,
    height: usize,
    radius: usize,
    weights: &[f32],
    horizontal: bool,
) {
    let kernel = &weights[..(2 * radius + 1)];
    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f32; 3];
            for (idx, &weight) in kernel.iter().enumerate() {
                let offset = idx as isize - radius as isize;
                let sample_index = if horizontal {
                    let sx = clamp_i((x as isize) + offset, width as isize);
                    y * width + sx
                } else {
                    let sy = clamp_i((y as isize) + offset, height as isize);
                    sy * width + x
                };
                let pix = src[sample_index];
                acc[0] += pix[0] * weight;
                acc[1] += pix[1] * weight;
                acc[2] += pix[2] * weight;
            }
            dst[y * width + x] = acc;
        }
    }
}

#[inline(always)]
fn clamp_i(value: isize, max: isize) -> usize {
    value.clamp(0, max.saturating_sub(1)) as usize
}
