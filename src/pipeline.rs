//! Deterministic `render(source, params)` over the processing stages.

use crate::buffer::PixelBuffer;
use crate::config::{EdgePolicy, FilterParameters, PostKernel};
use crate::processing::{convolve, edges, pixelate, tone};

/// Stateless orchestrator for the processing stages.
///
/// Stage order: pixelate, tone map, edge detect, post kernel. Tone mapping
/// always runs after pixelation so filtered colours never bleed across block
/// boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterPipeline {
    edges: EdgePolicy,
}

impl FilterPipeline {
    #[must_use]
    pub const fn new(edges: EdgePolicy) -> Self {
        Self { edges }
    }

    /// Render `source` under `params`. Identical inputs always produce
    /// byte-identical output; `source` is never modified.
    #[must_use]
    pub fn render(&self, source: &PixelBuffer, params: &FilterParameters) -> PixelBuffer {
        if is_passthrough(params) {
            return source.clone();
        }
        let params = params.normalized();

        let mut buf = pixelate::pixelate(source, params.pixelate);
        if !params.is_tone_identity() {
            buf = tone::apply(&buf, &params);
        }
        if params.edge_detect {
            buf = edges::detect_edges(&buf, self.edges);
        }
        if let Some(kernel) = convolve::kernel_for(params.post_kernel) {
            buf = convolve::convolve(&buf, &kernel, self.edges);
        }
        buf
    }
}

/// Render with the default (copy-through) edge policy.
#[must_use]
pub fn render(source: &PixelBuffer, params: &FilterParameters) -> PixelBuffer {
    FilterPipeline::default().render(source, params)
}

/// Whether `params` would leave `source` untouched.
#[must_use]
pub fn is_passthrough(params: &FilterParameters) -> bool {
    let params = params.normalized();
    params.show_original
        || (params.pixelate <= 1
            && params.is_tone_identity()
            && !params.edge_detect
            && params.post_kernel == PostKernel::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PixelBuffer {
        let mut pixels = Vec::new();
        for i in 0..36u32 {
            pixels.extend_from_slice(&[(i * 7) as u8, (i * 13) as u8, (255 - i * 5) as u8, 255]);
        }
        PixelBuffer::from_raw(6, 6, pixels).unwrap()
    }

    #[test]
    fn show_original_bypasses_everything() {
        let src = sample();
        let params = FilterParameters {
            show_original: true,
            invert: 100.0,
            pixelate: 3,
            edge_detect: true,
            ..FilterParameters::default()
        };
        assert!(is_passthrough(&params));
        assert_eq!(render(&src, &params), src);
    }

    #[test]
    fn tone_mapping_runs_after_pixelation() {
        let src = sample();
        let params = FilterParameters {
            pixelate: 2,
            invert: 100.0,
            ..FilterParameters::default()
        };
        let expected = tone::apply(&pixelate::pixelate(&src, 2), &params);
        assert_eq!(render(&src, &params), expected);
    }

    #[test]
    fn edge_detect_precedes_post_kernel() {
        let src = sample();
        let params = FilterParameters {
            edge_detect: true,
            post_kernel: PostKernel::Sharpen,
            ..FilterParameters::default()
        };
        let pipeline = FilterPipeline::new(EdgePolicy::Transparent);
        let edged = edges::detect_edges(&src, EdgePolicy::Transparent);
        let expected = convolve::convolve(&edged, &convolve::SHARPEN, EdgePolicy::Transparent);
        assert_eq!(pipeline.render(&src, &params), expected);
    }

    #[test]
    fn output_keeps_source_dimensions() {
        let src = sample();
        let params = FilterParameters {
            pixelate: 4,
            blur: 3.0,
            post_kernel: PostKernel::Emboss,
            ..FilterParameters::default()
        };
        assert_eq!(render(&src, &params).dimensions(), src.dimensions());
    }

    #[test]
    fn full_turn_hue_leaves_red_alone() {
        let red = PixelBuffer::from_pixel(3, 3, [255, 0, 0, 255]).unwrap();
        let params = FilterParameters {
            hue: 360.0,
            ..FilterParameters::default()
        };
        assert!(is_passthrough(&params));
        assert_eq!(render(&red, &params), red);

        let wide = FilterParameters {
            hue: 480.0,
            ..FilterParameters::default()
        };
        let narrow = FilterParameters {
            hue: 120.0,
            ..FilterParameters::default()
        };
        assert_eq!(render(&red, &wide), render(&red, &narrow));
        assert_eq!(render(&red, &wide).pixel(1, 1), Some([0, 255, 0, 255]));
    }
}
