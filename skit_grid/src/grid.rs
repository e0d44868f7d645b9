//! Collision grid
//!
//! Maps expose their walkability to the scripting layer as a flat matrix of
//! cells. A cell is either free, permanently solid, or soft-blocked by an
//! actor standing on it. Soft blocks are set and cleared by the host as
//! actors move and are independent of any search in progress. Door points
//! are tracked separately from the matrix: a door cell may be walk-free as
//! far as collision goes and still refuse through-traffic.

use std::collections::HashSet;
use std::fmt::Display;

use log::warn;
use serde::{Deserialize, Serialize};

/// An unoccupied, walkable cell.
pub const FREE: u8 = 0;
/// A permanently blocked cell (walls, furniture, locked doors).
pub const SOLID: u8 = 1;
/// A cell temporarily held by an actor standing on it.
pub const SOFT_BLOCK: u8 = 2;

/// A single cell coordinate on a map grid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// City-block distance to another cell.
    pub fn manhattan(self, other: GridPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Walkability matrix for one map, plus its door points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollisionGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
    doors: HashSet<GridPos>,
}

impl CollisionGrid {
    /// Create an all-free grid of the given dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![FREE; width * height],
            doors: HashSet::new(),
        }
    }

    /// Build a grid from row-major cell values. Rows are clipped or padded
    /// solid to the width of the first row.
    pub fn from_rows(rows: &[Vec<u8>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let height = rows.len();
        let mut cells = Vec::with_capacity(width * height);
        for row in rows {
            for x in 0..width {
                cells.push(row.get(x).copied().unwrap_or(SOLID));
            }
        }
        Self {
            width,
            height,
            cells,
            doors: HashSet::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && (pos.x as usize) < self.width
            && (pos.y as usize) < self.height
    }

    fn index(&self, pos: GridPos) -> usize {
        (pos.y as usize) * self.width + (pos.x as usize)
    }

    /// Raw cell value, or `None` outside the grid.
    pub fn cell(&self, pos: GridPos) -> Option<u8> {
        if self.in_bounds(pos) {
            Some(self.cells[self.index(pos)])
        } else {
            None
        }
    }

    /// True for any non-free cell; out-of-bounds counts as blocked.
    pub fn is_blocked(&self, pos: GridPos) -> bool {
        self.cell(pos) != Some(FREE)
    }

    /// Overwrite a cell value. Out-of-bounds writes are dropped with a warning.
    pub fn set_cell(&mut self, pos: GridPos, value: u8) {
        if self.in_bounds(pos) {
            let index = self.index(pos);
            self.cells[index] = value;
        } else {
            warn!("ignoring cell write outside {}x{} grid at {pos}", self.width, self.height);
        }
    }

    /// Mark a free cell as held by an actor. Solid cells are left alone.
    pub fn occupy(&mut self, pos: GridPos) {
        if self.cell(pos) == Some(FREE) {
            let index = self.index(pos);
            self.cells[index] = SOFT_BLOCK;
        }
    }

    /// Release an actor's hold on a cell. Only soft blocks are cleared.
    pub fn vacate(&mut self, pos: GridPos) {
        if self.cell(pos) == Some(SOFT_BLOCK) {
            let index = self.index(pos);
            self.cells[index] = FREE;
        }
    }

    /// Flag a cell as a door point.
    pub fn add_door(&mut self, pos: GridPos) {
        self.doors.insert(pos);
    }

    pub fn is_door(&self, pos: GridPos) -> bool {
        self.doors.contains(&pos)
    }
}
