use thiserror::Error;

/// Library error type for photo-lab operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A raster was requested with a zero width or height.
    #[error("invalid raster dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Raw pixel data does not match the raster dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// A pixel coordinate lies outside the raster.
    #[error("pixel ({x}, {y}) is outside the raster")]
    OutOfBounds { x: u32, y: u32 },

    /// The input bytes could not be decoded into a raster.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The working raster could not be encoded for export.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Export was requested before any raster was rendered.
    #[error("nothing to export: no image has been rendered")]
    NothingToExport,

    /// Resampling for the preview frame failed.
    #[error("preview error: {0}")]
    Preview(anyhow::Error),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}
