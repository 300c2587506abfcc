//! Command surface over one source image, its parameters, the working raster
//! and the history stack.
//!
//! Renders are addressed by generation: every load, parameter change and
//! history step bumps the generation, and a rendered frame is only accepted
//! while its generation is still current. The synchronous methods render
//! inline; the editor task drives the same state through
//! [`Session::stage_load`], [`Session::stage_parameters`] and
//! [`Session::accept_render`] with renders running elsewhere.

use std::io::Cursor;
use std::sync::Arc;

use image::ImageFormat;
use tracing::{debug, info};

use crate::buffer::PixelBuffer;
use crate::config::{Configuration, FilterParameters, FilterUpdate, PreviewOptions};
use crate::error::Error;
use crate::events::{HistoryStatus, RenderRequest, RenderedFrame};
use crate::history::{HistoryEntry, HistoryStack};
use crate::pipeline::FilterPipeline;
use crate::processing::preview;

#[derive(Debug, Clone)]
pub struct Session {
    pipeline: FilterPipeline,
    source: Option<Arc<PixelBuffer>>,
    params: FilterParameters,
    working: Option<Arc<PixelBuffer>>,
    history: HistoryStack,
    generation: u64,
    rendered_generation: u64,
    seed_history: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(FilterPipeline::default(), HistoryStack::default())
    }
}

impl Session {
    #[must_use]
    pub fn new(pipeline: FilterPipeline, history: HistoryStack) -> Self {
        Self {
            pipeline,
            source: None,
            params: FilterParameters::default(),
            working: None,
            history,
            generation: 0,
            rendered_generation: 0,
            seed_history: false,
        }
    }

    #[must_use]
    pub fn from_config(cfg: &Configuration) -> Self {
        let mut session = Self::new(
            FilterPipeline::new(cfg.edge_policy),
            HistoryStack::with_limit(cfg.history_limit),
        );
        session.params = cfg.initial_parameters();
        session
    }

    /// Replace the source and schedule its first render. History is cleared;
    /// the first accepted render becomes its base entry.
    pub fn stage_load(&mut self, image: PixelBuffer) -> RenderRequest {
        let (width, height) = image.dimensions();
        info!(width, height, "loaded source image");
        let source = Arc::new(image);
        self.source = Some(Arc::clone(&source));
        self.working = None;
        self.history.clear();
        self.seed_history = true;
        self.generation += 1;
        RenderRequest {
            generation: self.generation,
            source,
            params: self.params,
        }
    }

    /// Apply a partial update. Returns the render to run, or `None` before
    /// any image is loaded.
    pub fn stage_parameters(&mut self, update: &FilterUpdate) -> Option<RenderRequest> {
        self.params = self.params.updated(update);
        let source = Arc::clone(self.source.as_ref()?);
        self.generation += 1;
        Some(RenderRequest {
            generation: self.generation,
            source,
            params: self.params,
        })
    }

    /// Install a rendered frame if it belongs to the current generation.
    pub fn accept_render(&mut self, frame: RenderedFrame) -> bool {
        if frame.generation != self.generation || self.source.is_none() {
            debug!(
                frame = frame.generation,
                current = self.generation,
                "discarding stale render"
            );
            return false;
        }
        if self.seed_history {
            self.history.push(&frame.buffer);
            self.seed_history = false;
        }
        self.working = Some(frame.buffer);
        self.rendered_generation = self.generation;
        true
    }

    /// Whether the working raster reflects the latest load/parameters.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.source.is_none() || self.rendered_generation == self.generation
    }

    pub fn load_image(&mut self, image: PixelBuffer) -> Arc<PixelBuffer> {
        let request = self.stage_load(image);
        let frame = request.execute(&self.pipeline);
        let buffer = Arc::clone(&frame.buffer);
        self.accept_render(frame);
        buffer
    }

    /// Decode and load encoded image bytes.
    ///
    /// # Errors
    /// Returns [`Error::Decode`] and leaves the session untouched if `bytes`
    /// cannot be decoded.
    pub fn load_encoded(&mut self, bytes: &[u8]) -> Result<Arc<PixelBuffer>, Error> {
        let image = decode(bytes)?;
        Ok(self.load_image(image))
    }

    /// Update parameters and re-render. Returns `None` before any load.
    pub fn set_parameters(&mut self, update: &FilterUpdate) -> Option<Arc<PixelBuffer>> {
        let request = self.stage_parameters(update)?;
        let frame = request.execute(&self.pipeline);
        let buffer = Arc::clone(&frame.buffer);
        self.accept_render(frame);
        Some(buffer)
    }

    /// Commit the working raster to history. Returns `false` when nothing has
    /// been rendered yet.
    pub fn snapshot(&mut self) -> bool {
        match &self.working {
            Some(working) => {
                self.history.push(working);
                debug!(len = self.history.len(), "history snapshot");
                true
            }
            None => false,
        }
    }

    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.history.undo()?;
        Some(self.restore(entry))
    }

    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.history.redo()?;
        Some(self.restore(entry))
    }

    // Parameters are left as they are: history holds pixels, not slider state.
    fn restore(&mut self, entry: HistoryEntry) -> HistoryEntry {
        self.generation += 1;
        self.rendered_generation = self.generation;
        self.seed_history = false;
        self.working = Some(Arc::clone(&entry));
        entry
    }

    /// PNG encoding of the working raster at full source resolution.
    ///
    /// # Errors
    /// Returns [`Error::NothingToExport`] before the first render and
    /// [`Error::Encode`] if encoding fails.
    pub fn export_png(&self) -> Result<Vec<u8>, Error> {
        let working = self.working.as_ref().ok_or(Error::NothingToExport)?;
        encode_png(working)
    }

    /// Display frame for the working raster, or `None` before the first render.
    ///
    /// # Errors
    /// Returns [`Error::Preview`] if resampling fails.
    pub fn preview(&self, options: &PreviewOptions) -> Result<Option<PixelBuffer>, Error> {
        self.working
            .as_deref()
            .map(|working| preview::scale(working, options))
            .transpose()
    }

    #[must_use]
    pub fn parameters(&self) -> &FilterParameters {
        &self.params
    }

    #[must_use]
    pub fn source(&self) -> Option<&Arc<PixelBuffer>> {
        self.source.as_ref()
    }

    #[must_use]
    pub fn working(&self) -> Option<&Arc<PixelBuffer>> {
        self.working.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    #[must_use]
    pub fn history_status(&self) -> HistoryStatus {
        HistoryStatus {
            len: self.history.len(),
            cursor: self.history.cursor(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn pipeline(&self) -> &FilterPipeline {
        &self.pipeline
    }
}

/// Decode PNG/JPEG/GIF/WebP bytes into an RGBA8 raster.
///
/// # Errors
/// Returns [`Error::Decode`] for unreadable data and
/// [`Error::InvalidDimensions`] for zero-area images.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, Error> {
    let image = image::load_from_memory(bytes).map_err(Error::Decode)?;
    PixelBuffer::from_image(image.to_rgba8())
}

/// Encode a raster as PNG.
///
/// # Errors
/// Returns [`Error::Encode`] if the encoder fails.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    buffer
        .as_image()
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(Error::Encode)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shade(v: u8) -> PixelBuffer {
        PixelBuffer::from_pixel(3, 3, [v, v, v, 255]).unwrap()
    }

    #[test]
    fn parameters_before_load_are_kept_but_not_rendered() {
        let mut session = Session::default();
        let update = FilterUpdate {
            invert: Some(100.0),
            ..FilterUpdate::default()
        };
        assert!(session.set_parameters(&update).is_none());
        assert_eq!(session.parameters().invert, 100.0);
        let out = session.load_image(shade(0));
        assert_eq!(out.pixel(1, 1), Some([255, 255, 255, 255]));
    }

    #[test]
    fn stale_frames_are_rejected() {
        let mut session = Session::default();
        let first = session.stage_load(shade(10));
        let second = session
            .stage_parameters(&FilterUpdate {
                brightness: Some(50.0),
                ..FilterUpdate::default()
            })
            .unwrap();
        assert!(!session.accept_render(first.execute(session.pipeline())));
        assert!(!session.is_settled());
        assert!(session.accept_render(second.execute(session.pipeline())));
        assert!(session.is_settled());
        assert_eq!(session.working().unwrap().pixel(0, 0), Some([5, 5, 5, 255]));
    }

    #[test]
    fn history_seeded_by_first_render_only() {
        let mut session = Session::default();
        session.load_image(shade(10));
        assert_eq!(session.history().len(), 1);
        session.set_parameters(&FilterUpdate {
            sepia: Some(50.0),
            ..FilterUpdate::default()
        });
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn export_requires_a_render() {
        let session = Session::default();
        assert!(matches!(session.export_png(), Err(Error::NothingToExport)));
    }

    #[test]
    fn failed_decode_keeps_state() {
        let mut session = Session::default();
        session.load_image(shade(42));
        let before = session.generation();
        assert!(matches!(
            session.load_encoded(b"not an image"),
            Err(Error::Decode(_))
        ));
        assert_eq!(session.generation(), before);
        assert_eq!(**session.source().unwrap(), shade(42));
        assert_eq!(session.history().len(), 1);
    }
}
