#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

//! Spatial model shared by the Skit engine and its hosts.
//!
//! Holds the collision grid a map exposes to the scripting layer, the
//! immutable waypoint [`Path`] movement commands walk along, and the
//! [`Pathfinder`] that produces one from the other.

pub mod astar;
pub mod grid;
pub mod path;

pub use astar::Pathfinder;
pub use grid::{CollisionGrid, GridPos};
pub use path::Path;
