//! Grid pathfinding
//!
//! A* over a [`CollisionGrid`], 4-directional with unit step cost and a
//! Manhattan heuristic. Two behaviors here are load-bearing for script
//! playback and must not drift:
//!
//! - The open list is kept sorted by f = cost + estimate, and entries with
//!   equal f keep their insertion order. Routes are therefore reproducible
//!   run to run, which scripted scenes depend on.
//! - The goal cell is exempt from collision and door checks, so an actor
//!   can be routed onto an occupied or door cell deliberately.
//!
//! Search work is bounded by a parent-chain depth budget rather than wall
//! clock. Every call allocates its own node arena; nothing persists
//! between searches.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::grid::{CollisionGrid, GridPos};
use crate::path::Path;

/// Deep enough for any scripted route on shipping maps.
pub const DEFAULT_DEPTH_BUDGET: u32 = 512;

/// Neighbor expansion order. Fixed: it feeds the stable tie-break.
const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// One discovered cell in a single search.
#[derive(Debug, Clone, Copy)]
struct Node {
    pos: GridPos,
    cost: u32,
    estimate: u32,
    depth: u32,
    parent: Option<usize>,
    closed: bool,
}

impl Node {
    fn score(&self) -> u32 {
        self.cost + self.estimate
    }
}

/// Grid A* search with a bounded expansion depth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pathfinder {
    pub depth_budget: u32,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self {
            depth_budget: DEFAULT_DEPTH_BUDGET,
        }
    }
}

impl Pathfinder {
    pub fn new(depth_budget: u32) -> Self {
        Self { depth_budget }
    }

    /// Search for a route between two cells.
    ///
    /// Returns the waypoints start..goal inclusive, or `None` when the goal
    /// lies outside the grid, the open list runs dry, or the depth budget
    /// runs out. An unreachable goal is a normal outcome, not an error.
    pub fn find_path(&self, grid: &CollisionGrid, start: GridPos, goal: GridPos) -> Option<Path> {
        if !grid.in_bounds(goal) {
            return None;
        }

        // Fresh arena per call, slotted by cell so each cell owns one node.
        let mut arena: Vec<Node> = Vec::new();
        let mut slots: Vec<Option<usize>> = vec![None; grid.width() * grid.height()];
        let mut open: Vec<usize> = Vec::new();

        arena.push(Node {
            pos: start,
            cost: 0,
            estimate: start.manhattan(goal),
            depth: 0,
            parent: None,
            closed: false,
        });
        if grid.in_bounds(start) {
            slots[slot_index(grid, start)] = Some(0);
        }
        open.push(0);

        let mut expansions = 0usize;
        while !open.is_empty() {
            let current = open.remove(0);
            if arena[current].pos == goal {
                let route = reconstruct(&arena, current);
                debug!("route {start} -> {goal}: {} waypoint(s), {expansions} expansion(s)", route.len());
                return Some(route);
            }
            if arena[current].depth > self.depth_budget {
                debug!("search {start} -> {goal} abandoned: depth budget {} exceeded", self.depth_budget);
                return None;
            }
            arena[current].closed = true;
            expansions += 1;

            let from = arena[current].pos;
            let next_cost = arena[current].cost + 1;
            let next_depth = arena[current].depth + 1;
            for (dx, dy) in NEIGHBOR_OFFSETS {
                let candidate = GridPos::new(from.x + dx, from.y + dy);
                if !grid.in_bounds(candidate) {
                    continue;
                }
                // The goal is always enterable; everything else respects
                // collision and door points.
                if candidate != goal && (grid.is_blocked(candidate) || grid.is_door(candidate)) {
                    continue;
                }

                let slot = slot_index(grid, candidate);
                match slots[slot] {
                    Some(existing) => {
                        // Reopen only on a strictly better cost.
                        if next_cost < arena[existing].cost {
                            arena[existing].cost = next_cost;
                            arena[existing].depth = next_depth;
                            arena[existing].parent = Some(current);
                            arena[existing].closed = false;
                            if let Some(held) = open.iter().position(|&id| id == existing) {
                                open.remove(held);
                            }
                            insert_sorted(&mut open, &arena, existing);
                        }
                    },
                    None => {
                        arena.push(Node {
                            pos: candidate,
                            cost: next_cost,
                            estimate: candidate.manhattan(goal),
                            depth: next_depth,
                            parent: Some(current),
                            closed: false,
                        });
                        let id = arena.len() - 1;
                        slots[slot] = Some(id);
                        insert_sorted(&mut open, &arena, id);
                    },
                }
            }
        }

        debug!("no route {start} -> {goal} after {expansions} expansion(s)");
        None
    }
}

fn slot_index(grid: &CollisionGrid, pos: GridPos) -> usize {
    (pos.y as usize) * grid.width() + (pos.x as usize)
}

/// Insert after every entry with an equal or lower score, so equal-score
/// entries pop in the order they arrived.
fn insert_sorted(open: &mut Vec<usize>, arena: &[Node], id: usize) {
    let score = arena[id].score();
    let at = open
        .iter()
        .position(|&held| arena[held].score() > score)
        .unwrap_or(open.len());
    open.insert(at, id);
}

fn reconstruct(arena: &[Node], goal: usize) -> Path {
    let mut cells = Vec::new();
    let mut cursor = Some(goal);
    while let Some(id) = cursor {
        cells.push(arena[id].pos);
        cursor = arena[id].parent;
    }
    cells.reverse();
    Path::new(cells)
}
