pub mod buffer;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod pipeline;
pub mod session;
pub mod processing {
    pub mod blur;
    pub mod color;
    pub mod convolve;
    pub mod edges;
    pub mod pixelate;
    pub mod preview;
    pub mod tone;
}
pub mod tasks {
    pub mod editor;
    pub mod render;
}

pub use buffer::PixelBuffer;
pub use error::Error;
pub use pipeline::{FilterPipeline, render};
pub use session::Session;
