use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::buffer::PixelBuffer;
use crate::processing::blur::MAX_BLUR_SIGMA;

/// Complete parameter set for one render.
///
/// Percent values are neutral at 100 (brightness, contrast, saturation) or 0
/// (grayscale, sepia, invert). Use [`FilterParameters::normalized`] to clamp
/// values into their documented ranges.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterParameters {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    /// Degrees. Any angle is accepted and wrapped into -180..180.
    pub hue: f32,
    pub grayscale: f32,
    pub sepia: f32,
    pub invert: f32,
    /// Gaussian sigma in pixels, at most `MAX_BLUR_SIGMA`.
    pub blur: f32,
    pub pixelate: u32,
    pub edge_detect: bool,
    pub post_kernel: PostKernel,
    /// Bypass every stage and show the source as loaded.
    pub show_original: bool,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue: 0.0,
            grayscale: 0.0,
            sepia: 0.0,
            invert: 0.0,
            blur: 0.0,
            pixelate: 1,
            edge_detect: false,
            post_kernel: PostKernel::None,
            show_original: false,
        }
    }
}

impl FilterParameters {
    /// Clamp every field into its documented range. Non-finite values fall
    /// back to the neutral default.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let neutral = Self::default();
        Self {
            brightness: non_negative(self.brightness, neutral.brightness),
            contrast: non_negative(self.contrast, neutral.contrast),
            saturation: non_negative(self.saturation, neutral.saturation),
            hue: wrap_degrees(finite_or(self.hue, neutral.hue)),
            grayscale: percent(self.grayscale),
            sepia: percent(self.sepia),
            invert: percent(self.invert),
            blur: non_negative(self.blur, neutral.blur).min(MAX_BLUR_SIGMA),
            pixelate: self.pixelate.max(1),
            ..*self
        }
    }

    /// Whether every tone stage sits at its neutral value.
    #[must_use]
    pub fn is_tone_identity(&self) -> bool {
        self.brightness == 100.0
            && self.contrast == 100.0
            && self.saturation == 100.0
            && self.hue.rem_euclid(360.0) == 0.0
            && self.grayscale == 0.0
            && self.sepia == 0.0
            && self.invert == 0.0
            && self.blur <= 0.0
    }

    /// Apply a partial update and re-clamp.
    #[must_use]
    pub fn updated(&self, update: &FilterUpdate) -> Self {
        let mut next = *self;
        update.apply_to(&mut next);
        next.normalized()
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

fn non_negative(value: f32, fallback: f32) -> f32 {
    finite_or(value, fallback).max(0.0)
}

fn wrap_degrees(value: f32) -> f32 {
    (value + 180.0).rem_euclid(360.0) - 180.0
}

fn percent(value: f32) -> f32 {
    finite_or(value, 0.0).clamp(0.0, 100.0)
}

/// Partial parameter update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct FilterUpdate {
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub saturation: Option<f32>,
    pub hue: Option<f32>,
    pub grayscale: Option<f32>,
    pub sepia: Option<f32>,
    pub invert: Option<f32>,
    pub blur: Option<f32>,
    /// Floored and raised to at least 1.
    pub pixelate: Option<f32>,
    pub edge_detect: Option<bool>,
    pub post_kernel: Option<PostKernel>,
    pub show_original: Option<bool>,
}

impl FilterUpdate {
    pub fn apply_to(&self, params: &mut FilterParameters) {
        macro_rules! assign {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    params.$field = value;
                })*
            };
        }
        assign!(
            brightness,
            contrast,
            saturation,
            hue,
            grayscale,
            sepia,
            invert,
            blur,
            edge_detect,
            post_kernel,
            show_original
        );
        if let Some(factor) = self.pixelate {
            params.pixelate = pixelate_factor(factor);
        }
    }

    /// Layer `other` on top of `self`; fields present in `other` win.
    #[must_use]
    pub fn merged(&self, other: &FilterUpdate) -> Self {
        Self {
            brightness: other.brightness.or(self.brightness),
            contrast: other.contrast.or(self.contrast),
            saturation: other.saturation.or(self.saturation),
            hue: other.hue.or(self.hue),
            grayscale: other.grayscale.or(self.grayscale),
            sepia: other.sepia.or(self.sepia),
            invert: other.invert.or(self.invert),
            blur: other.blur.or(self.blur),
            pixelate: other.pixelate.or(self.pixelate),
            edge_detect: other.edge_detect.or(self.edge_detect),
            post_kernel: other.post_kernel.or(self.post_kernel),
            show_original: other.show_original.or(self.show_original),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn pixelate_factor(raw: f32) -> u32 {
    if !raw.is_finite() {
        return 1;
    }
    raw.floor().clamp(1.0, u32::MAX as f32) as u32
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostKernel {
    #[default]
    None,
    Sharpen,
    Blur,
    Emboss,
}

/// How convolution and edge detection fill the outermost 1-pixel ring,
/// which the 3x3 loops never compute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgePolicy {
    /// Ring pixels keep the stage input's value.
    #[default]
    CopyThrough,
    /// Ring pixels are cleared to transparent black.
    Transparent,
}

impl EdgePolicy {
    /// Output raster seeded with the ring already filled.
    pub(crate) fn prepare(self, input: &PixelBuffer) -> PixelBuffer {
        let mut out = input.clone();
        if self == Self::Transparent {
            let (width, height) = out.dimensions();
            for (x, y, pixel) in out.as_image_mut().enumerate_pixels_mut() {
                if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                    pixel.0 = [0, 0, 0, 0];
                }
            }
        }
        out
    }
}

/// Display request for the preview scaler.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PreviewOptions {
    pub zoom: f32,
    pub device_pixel_ratio: f32,
    pub fit_to_width: bool,
    /// CSS-pixel width available for display; 0 disables fitting.
    pub target_display_width: u32,
    /// Upper bound on either backing-store dimension.
    pub max_dimension: u32,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            device_pixel_ratio: 1.0,
            fit_to_width: true,
            target_display_width: 1280,
            max_dimension: 8192,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Parameters applied on top of the neutral defaults.
    pub filters: FilterUpdate,
    /// Named parameter sets selectable at runtime.
    pub presets: BTreeMap<String, FilterUpdate>,
    /// Maximum number of retained history snapshots.
    pub history_limit: usize,
    /// Fill rule for the ring convolution/edge detection never computes.
    pub edge_policy: EdgePolicy,
    pub preview: PreviewOptions,
    /// Capacity of the command and render channels.
    pub render_queue_depth: usize,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.history_limit > 0,
            "history-limit must be greater than zero"
        );
        ensure!(
            self.render_queue_depth > 0,
            "render-queue-depth must be greater than zero"
        );
        ensure!(
            self.preview.zoom.is_finite() && self.preview.zoom > 0.0,
            "preview.zoom must be positive"
        );
        ensure!(
            self.preview.device_pixel_ratio.is_finite() && self.preview.device_pixel_ratio > 0.0,
            "preview.device-pixel-ratio must be positive"
        );
        ensure!(
            self.preview.max_dimension > 0,
            "preview.max-dimension must be greater than zero"
        );
        for name in self.presets.keys() {
            ensure!(!name.trim().is_empty(), "preset names must not be blank");
        }
        Ok(self)
    }

    /// Look up a preset by name.
    pub fn preset(&self, name: &str) -> Result<&FilterUpdate> {
        self.presets.get(name).with_context(|| {
            let known: Vec<&str> = self.presets.keys().map(String::as_str).collect();
            format!(
                "unknown preset '{}', expected one of: {}",
                name,
                known.join(", ")
            )
        })
    }

    /// The configured base parameters, clamped.
    pub fn initial_parameters(&self) -> FilterParameters {
        FilterParameters::default().updated(&self.filters)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            filters: FilterUpdate::default(),
            presets: BTreeMap::new(),
            history_limit: crate::history::DEFAULT_HISTORY_LIMIT,
            edge_policy: EdgePolicy::default(),
            preview: PreviewOptions::default(),
            render_queue_depth: 16,
        }
    }
}
