use rust_photo_lab::config::{Configuration, FilterUpdate, PreviewOptions};
use rust_photo_lab::session::{Session, decode, encode_png};
use rust_photo_lab::{Error, PixelBuffer};

fn gradient(width: u32, height: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::new(width, height).unwrap();
    for y in 0..height {
        for x in 0..width {
            let v = ((x + y) * 255 / (width + height - 2)) as u8;
            buf.put_pixel(x, y, [v, 255 - v, 128, 255]).unwrap();
        }
    }
    buf
}

fn invert(amount: f32) -> FilterUpdate {
    FilterUpdate {
        invert: Some(amount),
        ..FilterUpdate::default()
    }
}

#[test]
fn load_seeds_history_with_base_render() {
    let mut session = Session::default();
    let src = gradient(8, 6);
    let working = session.load_image(src.clone());
    assert_eq!(*working, src);
    let status = session.history_status();
    assert_eq!(status.len, 1);
    assert_eq!(status.cursor, Some(0));
    assert!(!status.can_undo);
}

#[test]
fn undo_restores_pixels_but_not_parameters() {
    let mut session = Session::default();
    let src = gradient(5, 5);
    session.load_image(src.clone());

    let inverted = session.set_parameters(&invert(100.0)).unwrap();
    assert!(session.snapshot());
    assert_eq!(session.history().len(), 2);

    let restored = session.undo().unwrap();
    assert_eq!(*restored, src);
    assert_eq!(**session.working().unwrap(), src);
    assert!((session.parameters().invert - 100.0).abs() < f32::EPSILON);

    let again = session.redo().unwrap();
    assert_eq!(again, inverted);
}

#[test]
fn loading_a_new_image_clears_history() {
    let mut session = Session::default();
    session.load_image(gradient(4, 4));
    session.set_parameters(&invert(50.0));
    session.snapshot();
    assert_eq!(session.history().len(), 2);

    session.load_image(gradient(6, 3));
    assert_eq!(session.history().len(), 1);
    assert!(!session.history().can_undo());
    // parameters survive the reload
    assert!((session.parameters().invert - 50.0).abs() < f32::EPSILON);
}

#[test]
fn export_round_trips_through_png() {
    let mut session = Session::default();
    assert!(matches!(session.export_png(), Err(Error::NothingToExport)));

    session.load_image(gradient(7, 3));
    let working = session.set_parameters(&invert(100.0)).unwrap();
    let png = session.export_png().unwrap();
    let decoded = decode(&png).unwrap();
    assert_eq!(decoded, *working);
}

#[test]
fn export_ignores_preview_zoom() {
    let mut session = Session::default();
    session.load_image(gradient(30, 20));
    let preview = session
        .preview(&PreviewOptions {
            zoom: 0.5,
            fit_to_width: false,
            ..PreviewOptions::default()
        })
        .unwrap()
        .unwrap();
    assert_eq!(preview.dimensions(), (15, 10));
    let exported = decode(&session.export_png().unwrap()).unwrap();
    assert_eq!(exported.dimensions(), (30, 20));
}

#[test]
fn load_encoded_png() {
    let src = gradient(9, 4);
    let png = encode_png(&src).unwrap();
    let mut session = Session::default();
    let working = session.load_encoded(&png).unwrap();
    assert_eq!(*working, src);
}

#[test]
fn corrupt_bytes_leave_session_untouched() {
    let mut session = Session::default();
    let src = gradient(4, 4);
    session.load_image(src.clone());
    let mut png = encode_png(&gradient(3, 3)).unwrap();
    png.truncate(png.len() / 2);
    assert!(matches!(session.load_encoded(&png), Err(Error::Decode(_))));
    assert_eq!(**session.source().unwrap(), src);
    assert_eq!(**session.working().unwrap(), src);
}

#[test]
fn session_from_config_applies_filters_and_limit() {
    let yaml = r#"
history-limit: 2
filters:
  invert: 100
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let mut session = Session::from_config(&cfg);
    let working = session.load_image(PixelBuffer::from_pixel(2, 2, [0, 0, 0, 255]).unwrap());
    assert_eq!(working.pixel(0, 0), Some([255, 255, 255, 255]));
    for amount in [10.0, 20.0, 30.0] {
        session.set_parameters(&invert(amount));
        session.snapshot();
    }
    assert_eq!(session.history().len(), 2);
}
