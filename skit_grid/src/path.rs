//! Waypoint paths
//!
//! A [`Path`] is the finished product of a grid search: the ordered cells
//! from start to goal inclusive. Once built it never changes; actors walk
//! it by index and the engine hands clones of it around freely.

use serde::{Deserialize, Serialize};

use crate::grid::GridPos;

/// Immutable ordered waypoint sequence from start to goal inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    waypoints: Vec<GridPos>,
}

impl Path {
    pub fn new(waypoints: Vec<GridPos>) -> Self {
        Self { waypoints }
    }

    /// Waypoint at `index`, counting from the start cell.
    pub fn get(&self, index: usize) -> Option<GridPos> {
        self.waypoints.get(index).copied()
    }

    /// The start cell.
    pub fn first(&self) -> Option<GridPos> {
        self.waypoints.first().copied()
    }

    /// The goal cell.
    pub fn last(&self) -> Option<GridPos> {
        self.waypoints.last().copied()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.waypoints.iter().copied()
    }
}
