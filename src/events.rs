use std::sync::Arc;

use tokio::sync::oneshot;

use crate::buffer::PixelBuffer;
use crate::config::{FilterParameters, FilterUpdate, PreviewOptions};
use crate::error::Error;
use crate::pipeline::FilterPipeline;

/// One render job: a source raster and the parameters to apply to it.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub generation: u64,
    pub source: Arc<PixelBuffer>,
    pub params: FilterParameters,
}

impl RenderRequest {
    /// Run the job to completion on the current thread.
    pub fn execute(&self, pipeline: &FilterPipeline) -> RenderedFrame {
        RenderedFrame {
            generation: self.generation,
            buffer: Arc::new(pipeline.render(&self.source, &self.params)),
        }
    }
}

/// Output of a completed render, tagged with the request generation.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub generation: u64,
    pub buffer: Arc<PixelBuffer>,
}

/// Preview-scaled frame ready for display.
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    pub generation: u64,
    pub frame: Arc<PixelBuffer>,
}

/// Cursor position and depth of the history stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStatus {
    pub len: usize,
    pub cursor: Option<usize>,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Commands accepted by the editor task.
#[derive(Debug)]
pub enum EditorCommand {
    /// Replace the source with an already decoded raster.
    LoadImage(PixelBuffer),
    /// Decode `bytes` and replace the source. Existing state is kept on failure.
    LoadEncoded {
        bytes: Vec<u8>,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    SetParameters(FilterUpdate),
    SetPreview(PreviewOptions),
    /// Commit the working raster once the latest render has landed.
    Snapshot,
    Undo,
    Redo,
    /// PNG bytes of the working raster at full source resolution.
    Export {
        reply: oneshot::Sender<Result<Vec<u8>, Error>>,
    },
    QueryHistory {
        reply: oneshot::Sender<HistoryStatus>,
    },
}
