//! Cast and orientation types
//!
//! The engine never owns actor state. A [`CastMember`] records what the
//! script declared about a role (spawn cell, facing, sprite variant) plus
//! the opaque handle the host's directory returned for it; every runtime
//! mutation goes back through that handle.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use skit_grid::GridPos;
use uuid::Uuid;
use variantly::Variantly;

/// Facing / travel direction on the tile grid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Variantly)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    /// Parse a script token. Tokens are lowercase; anything else is a
    /// compile error at the call site.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Unit cell offset, y growing downward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// World clock state a finale may change.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Variantly)]
pub enum TimeOfDay {
    #[default]
    Day,
    Night,
}

impl TimeOfDay {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "day" => Some(TimeOfDay::Day),
            "night" => Some(TimeOfDay::Night),
            _ => None,
        }
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeOfDay::Day => write!(f, "day"),
            TimeOfDay::Night => write!(f, "night"),
        }
    }
}

/// One declared scene role, resolved to a spawned actor handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub role: String,
    pub variant: Option<u32>,
    pub actor: Uuid,
    pub spawn: GridPos,
    pub facing: Direction,
}
