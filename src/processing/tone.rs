//! Per-pixel tone mapping chain.
//!
//! Stages run in a fixed order (brightness, contrast, saturation, hue,
//! grayscale, sepia, invert, blur) because they do not commute. Channels stay
//! in `f32` between stages, clamped to `[0, 255]` after each one, and are
//! quantized once at the end with round-half-away-from-zero.

use palette::{FromColor, Hsl, RgbHue, Srgb};

use crate::buffer::PixelBuffer;
use crate::config::FilterParameters;
use crate::processing::blur::blur_rgb_plane;
use crate::processing::color::{clamp_channel, luma, mix_rgb, quantize, sepia};

/// Apply the tone chain to `buffer`, returning a new raster.
///
/// Returns an unmodified copy when every tone parameter is neutral.
pub fn apply(buffer: &PixelBuffer, params: &FilterParameters) -> PixelBuffer {
    if params.is_tone_identity() {
        return buffer.clone();
    }
    let stages = ToneStages::from(params);
    let (width, height) = buffer.dimensions();

    let mut plane: Vec<[f32; 3]> = buffer
        .as_image()
        .pixels()
        .map(|p| stages.map_pixel([f32::from(p[0]), f32::from(p[1]), f32::from(p[2])]))
        .collect();

    if stages.blur_sigma > 0.0 {
        blur_rgb_plane(&mut plane, width as usize, height as usize, stages.blur_sigma);
    }

    let mut out = buffer.clone();
    for (pixel, rgb) in out.as_image_mut().pixels_mut().zip(plane) {
        pixel[0] = quantize(rgb[0]);
        pixel[1] = quantize(rgb[1]);
        pixel[2] = quantize(rgb[2]);
    }
    out
}

/// Per-stage factors; `None` marks a stage at its neutral value.
struct ToneStages {
    brightness: Option<f32>,
    contrast: Option<f32>,
    saturation: Option<f32>,
    hue: Option<f32>,
    grayscale: Option<f32>,
    sepia: Option<f32>,
    invert: Option<f32>,
    blur_sigma: f32,
}

impl From<&FilterParameters> for ToneStages {
    fn from(params: &FilterParameters) -> Self {
        let percent = |value: f32, neutral: f32| (value != neutral).then_some(value / 100.0);
        let hue = params.hue.rem_euclid(360.0);
        Self {
            brightness: percent(params.brightness, 100.0),
            contrast: percent(params.contrast, 100.0),
            saturation: percent(params.saturation, 100.0),
            hue: (hue != 0.0).then_some(params.hue),
            grayscale: percent(params.grayscale, 0.0),
            sepia: percent(params.sepia, 0.0),
            invert: percent(params.invert, 0.0),
            blur_sigma: params.blur.max(0.0),
        }
    }
}

impl ToneStages {
    fn map_pixel(&self, mut rgb: [f32; 3]) -> [f32; 3] {
        if let Some(k) = self.brightness {
            rgb = rgb.map(|c| clamp_channel(c * k));
        }
        if let Some(k) = self.contrast {
            rgb = rgb.map(|c| clamp_channel((c - 128.0) * k + 128.0));
        }
        if let Some(k) = self.saturation {
            let y = luma(rgb);
            rgb = rgb.map(|c| clamp_channel(y + (c - y) * k));
        }
        if let Some(degrees) = self.hue {
            rgb = rotate_hue(rgb, degrees);
        }
        if let Some(k) = self.grayscale {
            let y = luma(rgb);
            rgb = mix_rgb(rgb, [y, y, y], k).map(clamp_channel);
        }
        if let Some(k) = self.sepia {
            rgb = mix_rgb(rgb, sepia(rgb), k).map(clamp_channel);
        }
        if let Some(k) = self.invert {
            rgb = mix_rgb(rgb, rgb.map(|c| 255.0 - c), k).map(clamp_channel);
        }
        rgb
    }
}

fn rotate_hue(rgb: [f32; 3], degrees: f32) -> [f32; 3] {
    let mut hsl = Hsl::from_color(Srgb::new(rgb[0] / 255.0, rgb[1] / 255.0, rgb[2] / 255.0));
    let hue = (hsl.hue.into_degrees() + degrees).rem_euclid(360.0);
    hsl.hue = RgbHue::from_degrees(hue);
    let srgb = Srgb::from_color(hsl);
    [
        clamp_channel(srgb.red * 255.0),
        clamp_channel(srgb.green * 255.0),
        clamp_channel(srgb.blue * 255.0),
    ]
}
