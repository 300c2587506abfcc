//! Bounded, cursor-based stack of committed raster snapshots.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::PixelBuffer;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// An immutable snapshot of a rendered raster.
pub type HistoryEntry = Arc<PixelBuffer>;

/// Undo/redo stack over rendered rasters.
///
/// Invariants: the cursor is `None` only when the stack is empty, otherwise it
/// indexes an entry; the length never exceeds `limit`. Pushing while the cursor
/// is behind the newest entry discards the redo branch.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<HistoryEntry>,
    cursor: Option<usize>,
    limit: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryStack {
    /// Create an empty stack retaining at most `limit` entries (minimum 1).
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit),
            cursor: None,
            limit,
        }
    }

    /// Commit a copy of `buffer` after the cursor.
    pub fn push(&mut self, buffer: &PixelBuffer) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push_back(Arc::new(buffer.clone()));
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Step back one entry. Returns `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let cursor = self.cursor.filter(|&c| c > 0)? - 1;
        self.cursor = Some(cursor);
        self.entries.get(cursor).cloned()
    }

    /// Step forward one entry. Returns `None` at the newest entry.
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let cursor = self.cursor.filter(|&c| c + 1 < self.entries.len())? + 1;
        self.cursor = Some(cursor);
        self.entries.get(cursor).cloned()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Entry under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shade(v: u8) -> PixelBuffer {
        PixelBuffer::from_pixel(1, 1, [v, v, v, 255]).unwrap()
    }

    #[test]
    fn empty_stack_ignores_navigation() {
        let mut history = HistoryStack::default();
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn snapshot_is_independent_of_caller() {
        let mut history = HistoryStack::default();
        let mut buf = shade(1);
        history.push(&buf);
        buf.put_pixel(0, 0, [9, 9, 9, 9]).unwrap();
        assert_eq!(history.current().unwrap().pixel(0, 0), Some([1, 1, 1, 255]));
    }

    #[test]
    fn limit_of_zero_is_raised_to_one() {
        let mut history = HistoryStack::with_limit(0);
        history.push(&shade(1));
        history.push(&shade(2));
        assert_eq!(history.len(), 1);
        assert_eq!(**history.current().unwrap(), shade(2));
        assert!(!history.can_undo());
    }

    #[test]
    fn clear_resets_cursor() {
        let mut history = HistoryStack::default();
        history.push(&shade(1));
        history.push(&shade(2));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), None);
        assert!(!history.can_redo());
    }
}
