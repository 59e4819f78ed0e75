use crate::error::RaceError;
use crate::geometry::Vec2;
use crate::track::{CellKind, GridPos, Track, TrackFile, DEFAULT_CELL_SIZE};

#[test]
fn test_from_ascii() {
    let track = Track::from_ascii(&["#####", "#S.F#", "#####"], DEFAULT_CELL_SIZE).unwrap();
    assert_eq!(track.width(), 5);
    assert_eq!(track.height(), 3);
    assert_eq!(track.start(), Some(GridPos::new(1, 1)));
    assert_eq!(track.finish(), Some(GridPos::new(3, 1)));
    assert_eq!(track.pixel_width(), 200.0);
    assert_eq!(track.start_center(), Some(Vec2::new(60.0, 60.0)));
    assert_eq!(track.laps_required(), 1);
}

#[test]
fn test_from_ascii_rejects_bad_input() {
    assert!(matches!(
        Track::from_ascii(&["#S", "#"], DEFAULT_CELL_SIZE),
        Err(RaceError::InvalidTrack(_))
    ));
    assert!(matches!(
        Track::from_ascii(&["#x"], DEFAULT_CELL_SIZE),
        Err(RaceError::InvalidTrack(_))
    ));
    assert!(Track::from_ascii(&[], DEFAULT_CELL_SIZE).is_err());
    assert!(Track::new(3, 3, 0.0).is_err());
}

#[test]
fn test_single_start_and_finish() {
    let mut track = Track::new(4, 1, DEFAULT_CELL_SIZE).unwrap();
    track.paint(GridPos::new(0, 0), CellKind::Start).unwrap();
    track.paint(GridPos::new(2, 0), CellKind::Start).unwrap();

    assert_eq!(track.start(), Some(GridPos::new(2, 0)));
    assert_eq!(track.cell(GridPos::new(0, 0)), Some(CellKind::Road));

    track.paint(GridPos::new(3, 0), CellKind::Finish).unwrap();
    track.paint(GridPos::new(1, 0), CellKind::Finish).unwrap();
    assert_eq!(track.finish(), Some(GridPos::new(1, 0)));
    assert_eq!(track.cell(GridPos::new(3, 0)), Some(CellKind::Road));

    // Finish painted over the start replaces it
    track.paint(GridPos::new(2, 0), CellKind::Finish).unwrap();
    assert_eq!(track.start(), None);
    assert_eq!(track.finish(), Some(GridPos::new(2, 0)));
}

#[test]
fn test_painting_over_references() {
    let mut track = Track::from_ascii(&["S.F"], DEFAULT_CELL_SIZE).unwrap();
    track.add_checkpoint(GridPos::new(1, 0)).unwrap();

    track.paint(GridPos::new(2, 0), CellKind::Wall).unwrap();
    assert_eq!(track.finish(), None);

    track.paint(GridPos::new(1, 0), CellKind::Wall).unwrap();
    assert!(track.checkpoints().is_empty());

    track.paint(GridPos::new(0, 0), CellKind::Road).unwrap();
    assert_eq!(track.start(), None);

    assert!(track.paint(GridPos::new(5, 0), CellKind::Road).is_err());
}

#[test]
fn test_checkpoints_and_laps() {
    let mut track = Track::from_ascii(&["S.#F"], DEFAULT_CELL_SIZE).unwrap();
    track.add_checkpoint(GridPos::new(1, 0)).unwrap();
    track.add_checkpoint(GridPos::new(1, 0)).unwrap();
    assert_eq!(track.checkpoints(), &[GridPos::new(1, 0)]);

    assert!(track.add_checkpoint(GridPos::new(2, 0)).is_err());
    assert!(track.add_checkpoint(GridPos::new(9, 0)).is_err());

    assert!(track.set_laps_required(0).is_err());
    track.set_laps_required(3).unwrap();
    assert_eq!(track.laps_required(), 3);

    track.clear_checkpoints();
    assert!(track.checkpoints().is_empty());
}

#[test]
fn test_blocked_cells() {
    let track = Track::from_ascii(&["#."], DEFAULT_CELL_SIZE).unwrap();
    assert!(track.is_blocked(Vec2::new(10.0, 10.0)));
    assert!(!track.is_blocked(Vec2::new(50.0, 10.0)));
    assert!(track.is_blocked(Vec2::new(90.0, 10.0)));
    assert!(track.is_blocked(Vec2::new(50.0, -1.0)));
    assert_eq!(track.cell_at(Vec2::new(50.0, 45.0)), None);
}

#[test]
fn test_track_file_round_trip() {
    let mut track = Track::from_ascii(&["######", "#S..F#", "######"], DEFAULT_CELL_SIZE).unwrap();
    track.add_checkpoint(GridPos::new(2, 1)).unwrap();
    track.set_laps_required(2).unwrap();

    let json = TrackFile::from_track(&track).to_json().unwrap();
    let restored = TrackFile::from_json(&json).unwrap().into_track().unwrap();
    assert_eq!(restored, track);
}

#[test]
fn test_track_file_defaults_and_codes() {
    let file = TrackFile::from_json(r#"{"grid": [[2, 1, 3]], "start": {"x": 0, "y": 0}, "finish": {"x": 2, "y": 0}}"#)
        .unwrap();
    assert_eq!(file.laps_required, 1);
    assert!(file.checkpoints.is_empty());

    let track = file.into_track().unwrap();
    assert_eq!(track.cell(GridPos::new(1, 0)), Some(CellKind::Road));
    assert_eq!(track.finish(), Some(GridPos::new(2, 0)));
}

#[test]
fn test_track_file_validation() {
    let bad_code = TrackFile::from_json(r#"{"grid": [[0, 7]]}"#).unwrap();
    assert!(bad_code.into_track().is_err());

    let ragged = TrackFile::from_json(r#"{"grid": [[0, 1], [1]]}"#).unwrap();
    assert!(ragged.into_track().is_err());

    let outside = TrackFile::from_json(r#"{"grid": [[1]], "start": {"x": 3, "y": 0}}"#).unwrap();
    assert!(outside.into_track().is_err());

    let no_laps = TrackFile::from_json(r#"{"grid": [[1]], "laps_required": 0}"#).unwrap();
    assert!(no_laps.into_track().is_err());
}
