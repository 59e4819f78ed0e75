use serde::{Deserialize, Serialize};
use std::path::Path;

use super::grid::{CellKind, GridPos, Track, DEFAULT_CELL_SIZE};
use crate::error::{RaceError, Result};

/// On-disk track layout.
///
/// ```json
/// {
///   "grid": [[0, 0, 0], [0, 2, 3], [0, 0, 0]],
///   "start": {"x": 1, "y": 1},
///   "finish": {"x": 2, "y": 1},
///   "checkpoints": [],
///   "laps_required": 1
/// }
/// ```
///
/// Grid codes: 0 wall, 1 road, 2 start, 3 finish.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrackFile {
    pub grid: Vec<Vec<u8>>,
    #[serde(default)]
    pub start: Option<GridPos>,
    #[serde(default)]
    pub finish: Option<GridPos>,
    #[serde(default)]
    pub checkpoints: Vec<GridPos>,
    #[serde(default = "default_laps")]
    pub laps_required: u32,
}

fn default_laps() -> u32 {
    1
}

impl TrackFile {
    pub fn from_track(track: &Track) -> Self {
        TrackFile {
            grid: track
                .rows()
                .iter()
                .map(|row| row.iter().map(|kind| kind.code()).collect())
                .collect(),
            start: track.start(),
            finish: track.finish(),
            checkpoints: track.checkpoints().to_vec(),
            laps_required: track.laps_required(),
        }
    }

    /// Convert into a track using the default cell size.
    pub fn into_track(self) -> Result<Track> {
        self.into_track_with_cell_size(DEFAULT_CELL_SIZE)
    }

    pub fn into_track_with_cell_size(self, cell_size: f32) -> Result<Track> {
        let cells = self
            .grid
            .iter()
            .enumerate()
            .map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(|(x, &code)| {
                        CellKind::from_code(code).ok_or_else(|| {
                            RaceError::InvalidTrack(format!(
                                "unknown cell code {} at ({}, {})",
                                code, x, y
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Track::from_parts(
            cells,
            self.start,
            self.finish,
            self.checkpoints,
            self.laps_required,
            cell_size,
        )
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a track file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Save this track file to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
