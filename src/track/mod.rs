//! # Track Module
//!
//! A track is a rectangular grid of cells, each a wall, open road, the start
//! cell or the finish cell. Physics and training read it; only the editing
//! operations on [`Track`] change it, and a race treats every edited track as
//! a full replacement.
//!
//! ## Coordinates
//!
//! - Grid positions ([`GridPos`]) are `(x = column, y = row)`.
//! - Pixel positions are `grid * cell_size`, so the centre of cell `(x, y)`
//!   is `((x + 0.5) * cell_size, (y + 0.5) * cell_size)`.
//! - Anything outside the grid behaves like a wall.
//!
//! ## Example
//!
//! ```rust
//! use gridrace::track::{Track, CellKind, GridPos};
//!
//! let track = Track::from_ascii(&[
//!     "#####",
//!     "#S.F#",
//!     "#####",
//! ], 40.0).unwrap();
//!
//! assert_eq!(track.start(), Some(GridPos::new(1, 1)));
//! assert_eq!(track.cell(GridPos::new(2, 1)), Some(CellKind::Road));
//! ```

pub mod format;
pub mod grid;

pub use format::TrackFile;
pub use grid::{CellKind, GridPos, Track, DEFAULT_CELL_SIZE};
