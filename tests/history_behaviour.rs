use rust_photo_lab::PixelBuffer;
use rust_photo_lab::history::{DEFAULT_HISTORY_LIMIT, HistoryStack};

fn snapshot(tag: u8) -> PixelBuffer {
    PixelBuffer::from_pixel(2, 2, [tag, tag, tag, 255]).unwrap()
}

fn tag_of(history: &HistoryStack) -> u8 {
    history.current().expect("cursor on an entry").pixel(0, 0).unwrap()[0]
}

#[test]
fn undo_and_redo_walk_the_stack() {
    let mut history = HistoryStack::default();
    for tag in 1..=3 {
        history.push(&snapshot(tag));
    }
    assert_eq!(history.cursor(), Some(2));

    assert_eq!(history.undo().unwrap().pixel(0, 0).unwrap()[0], 2);
    assert_eq!(history.undo().unwrap().pixel(0, 0).unwrap()[0], 1);
    assert!(history.undo().is_none(), "undo past the oldest entry is a no-op");
    assert_eq!(tag_of(&history), 1);

    assert_eq!(history.redo().unwrap().pixel(0, 0).unwrap()[0], 2);
    assert_eq!(history.redo().unwrap().pixel(0, 0).unwrap()[0], 3);
    assert!(history.redo().is_none(), "redo past the newest entry is a no-op");
    assert_eq!(tag_of(&history), 3);
}

#[test]
fn push_after_undo_discards_redo_branch() {
    let mut history = HistoryStack::default();
    for tag in 1..=3 {
        history.push(&snapshot(tag));
    }
    history.undo();
    history.undo();
    history.push(&snapshot(9));

    assert_eq!(history.len(), 2);
    assert_eq!(history.cursor(), Some(1));
    assert!(!history.can_redo());
    assert_eq!(tag_of(&history), 9);
    assert_eq!(history.undo().unwrap().pixel(0, 0).unwrap()[0], 1);
}

#[test]
fn oldest_entries_are_evicted_past_the_limit() {
    let mut history = HistoryStack::default();
    assert_eq!(history.limit(), DEFAULT_HISTORY_LIMIT);
    for tag in 1..=25 {
        history.push(&snapshot(tag));
    }
    assert_eq!(history.len(), 20);
    assert_eq!(history.cursor(), Some(19));
    assert_eq!(tag_of(&history), 25);

    let mut oldest = 25;
    while let Some(entry) = history.undo() {
        oldest = entry.pixel(0, 0).unwrap()[0];
    }
    assert_eq!(oldest, 6);
}

#[test]
fn custom_limit_is_respected() {
    let mut history = HistoryStack::with_limit(3);
    for tag in 1..=5 {
        history.push(&snapshot(tag));
    }
    assert_eq!(history.len(), 3);
    history.undo();
    history.undo();
    assert_eq!(tag_of(&history), 3);
    assert!(!history.can_undo());
}
