use serde::{Deserialize, Serialize};

use crate::error::{RaceError, Result};
use crate::geometry::Vec2;

/// Pixels per grid cell.
pub const DEFAULT_CELL_SIZE: f32 = 40.0;

/// Kind of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CellKind {
    #[default]
    Wall,
    Road,
    Start,
    Finish,
}

impl CellKind {
    /// Small-integer code used by the track file format.
    pub fn code(self) -> u8 {
        match self {
            CellKind::Wall => 0,
            CellKind::Road => 1,
            CellKind::Start => 2,
            CellKind::Finish => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CellKind::Wall),
            1 => Some(CellKind::Road),
            2 => Some(CellKind::Start),
            3 => Some(CellKind::Finish),
            _ => None,
        }
    }

    pub fn is_drivable(self) -> bool {
        !matches!(self, CellKind::Wall)
    }
}

/// Column/row coordinate of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: usize,
    pub y: usize,
}

impl GridPos {
    pub const fn new(x: usize, y: usize) -> Self {
        GridPos { x, y }
    }
}

/// Grid of cells plus the start/finish/checkpoint references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    cells: Vec<Vec<CellKind>>,
    start: Option<GridPos>,
    finish: Option<GridPos>,
    checkpoints: Vec<GridPos>,
    laps_required: u32,
    cell_size: f32,
}

impl Track {
    /// An all-wall track of the given size.
    pub fn new(width: usize, height: usize, cell_size: f32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RaceError::InvalidTrack(format!(
                "grid must be non-empty, got {}x{}",
                width, height
            )));
        }
        if !(cell_size > 0.0) {
            return Err(RaceError::invalid_parameter(
                "cell_size",
                "must be positive",
            ));
        }
        Ok(Track {
            cells: vec![vec![CellKind::Wall; width]; height],
            start: None,
            finish: None,
            checkpoints: Vec::new(),
            laps_required: 1,
            cell_size,
        })
    }

    /// Build a track from ASCII art: `#` wall, `.` road, `S` start, `F` finish.
    pub fn from_ascii(rows: &[&str], cell_size: f32) -> Result<Self> {
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        let mut track = Track::new(width, rows.len(), cell_size)?;
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(RaceError::InvalidTrack(format!(
                    "row {} has {} cells, expected {}",
                    y,
                    row.chars().count(),
                    width
                )));
            }
            for (x, ch) in row.chars().enumerate() {
                let kind = match ch {
                    '#' => CellKind::Wall,
                    '.' => CellKind::Road,
                    'S' => CellKind::Start,
                    'F' => CellKind::Finish,
                    other => {
                        return Err(RaceError::InvalidTrack(format!(
                            "unknown cell '{}' at ({}, {})",
                            other, x, y
                        )))
                    }
                };
                track.paint(GridPos::new(x, y), kind)?;
            }
        }
        Ok(track)
    }

    /// Assemble a track from raw parts, checking that every reference is in bounds.
    pub(crate) fn from_parts(
        cells: Vec<Vec<CellKind>>,
        start: Option<GridPos>,
        finish: Option<GridPos>,
        checkpoints: Vec<GridPos>,
        laps_required: u32,
        cell_size: f32,
    ) -> Result<Self> {
        let width = cells.first().map(Vec::len).unwrap_or(0);
        let mut track = Track::new(width, cells.len(), cell_size)?;
        if cells.iter().any(|row| row.len() != width) {
            return Err(RaceError::InvalidTrack("grid rows differ in length".to_string()));
        }
        track.cells = cells;
        for pos in start.iter().chain(finish.iter()).chain(checkpoints.iter()) {
            if !track.in_bounds(*pos) {
                return Err(RaceError::InvalidTrack(format!(
                    "cell ({}, {}) is outside the grid",
                    pos.x, pos.y
                )));
            }
        }
        track.start = start;
        track.finish = finish;
        track.checkpoints = checkpoints;
        track.set_laps_required(laps_required)?;
        Ok(track)
    }

    pub fn width(&self) -> usize {
        self.cells.first().map(Vec::len).unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Track width in pixels.
    pub fn pixel_width(&self) -> f32 {
        self.width() as f32 * self.cell_size
    }

    /// Track height in pixels.
    pub fn pixel_height(&self) -> f32 {
        self.height() as f32 * self.cell_size
    }

    pub fn start(&self) -> Option<GridPos> {
        self.start
    }

    pub fn finish(&self) -> Option<GridPos> {
        self.finish
    }

    pub fn checkpoints(&self) -> &[GridPos] {
        &self.checkpoints
    }

    pub fn laps_required(&self) -> u32 {
        self.laps_required
    }

    pub fn rows(&self) -> &[Vec<CellKind>] {
        &self.cells
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.y < self.height() && pos.x < self.width()
    }

    pub fn cell(&self, pos: GridPos) -> Option<CellKind> {
        self.cells.get(pos.y).and_then(|row| row.get(pos.x)).copied()
    }

    /// Cell under a pixel position, `None` outside the grid.
    pub fn cell_at(&self, point: Vec2) -> Option<CellKind> {
        if !(point.x >= 0.0 && point.y >= 0.0) {
            return None;
        }
        let x = (point.x / self.cell_size).floor() as usize;
        let y = (point.y / self.cell_size).floor() as usize;
        self.cell(GridPos::new(x, y))
    }

    /// True when the pixel lies outside the grid or inside a wall cell.
    pub fn is_blocked(&self, point: Vec2) -> bool {
        !self.cell_at(point).map(CellKind::is_drivable).unwrap_or(false)
    }

    pub fn cell_center(&self, pos: GridPos) -> Vec2 {
        Vec2::new(
            (pos.x as f32 + 0.5) * self.cell_size,
            (pos.y as f32 + 0.5) * self.cell_size,
        )
    }

    pub fn start_center(&self) -> Option<Vec2> {
        self.start.map(|pos| self.cell_center(pos))
    }

    pub fn finish_center(&self) -> Option<Vec2> {
        self.finish.map(|pos| self.cell_center(pos))
    }

    /// Set a cell's kind, keeping at most one start and one finish cell.
    pub fn paint(&mut self, pos: GridPos, kind: CellKind) -> Result<()> {
        if !self.in_bounds(pos) {
            return Err(RaceError::InvalidTrack(format!(
                "cell ({}, {}) is outside the {}x{} grid",
                pos.x,
                pos.y,
                self.width(),
                self.height()
            )));
        }

        match kind {
            CellKind::Start => {
                if let Some(old) = self.start.replace(pos) {
                    if old != pos {
                        self.cells[old.y][old.x] = CellKind::Road;
                    }
                }
                if self.finish == Some(pos) {
                    self.finish = None;
                }
            }
            CellKind::Finish => {
                if let Some(old) = self.finish.replace(pos) {
                    if old != pos {
                        self.cells[old.y][old.x] = CellKind::Road;
                    }
                }
                if self.start == Some(pos) {
                    self.start = None;
                }
            }
            CellKind::Wall | CellKind::Road => {
                if self.start == Some(pos) {
                    self.start = None;
                }
                if self.finish == Some(pos) {
                    self.finish = None;
                }
                if kind == CellKind::Wall {
                    self.checkpoints.retain(|&cp| cp != pos);
                }
            }
        }

        self.cells[pos.y][pos.x] = kind;
        Ok(())
    }

    /// Append a checkpoint; it must be a drivable cell not already listed.
    pub fn add_checkpoint(&mut self, pos: GridPos) -> Result<()> {
        match self.cell(pos) {
            Some(kind) if kind.is_drivable() => {
                if !self.checkpoints.contains(&pos) {
                    self.checkpoints.push(pos);
                }
                Ok(())
            }
            Some(_) => Err(RaceError::InvalidTrack(format!(
                "checkpoint ({}, {}) is a wall",
                pos.x, pos.y
            ))),
            None => Err(RaceError::InvalidTrack(format!(
                "checkpoint ({}, {}) is outside the grid",
                pos.x, pos.y
            ))),
        }
    }

    pub fn clear_checkpoints(&mut self) {
        self.checkpoints.clear();
    }

    pub fn set_laps_required(&mut self, laps: u32) -> Result<()> {
        if laps == 0 {
            return Err(RaceError::invalid_parameter(
                "laps_required",
                "must be at least 1",
            ));
        }
        self.laps_required = laps;
        Ok(())
    }
}
