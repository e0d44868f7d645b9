//! Compiled scripts
//!
//! A [`Script`] is the loader's output and the engine's input: the scene's
//! cast, one immutable template queue per cast member plus the UI-only
//! interface queue, and the [`Finale`] applied when every queue drains.
//! Template queues are never mutated after compilation; the engine clones
//! them into run queues each time playback starts.

use serde::{Deserialize, Serialize};
use skit_grid::GridPos;
use uuid::Uuid;

use crate::actor::{CastMember, Direction, TimeOfDay};
use crate::command::Command;

/// Which queue a command or wait target lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueKey {
    /// A cast member's queue, by actor handle.
    Actor(Uuid),
    /// The no-actor queue for UI-only commands.
    Interface,
}

impl QueueKey {
    pub fn actor(&self) -> Option<Uuid> {
        match self {
            QueueKey::Actor(id) => Some(*id),
            QueueKey::Interface => None,
        }
    }
}

/// Template command sequence for one queue, built once at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandQueue {
    pub key: QueueKey,
    pub commands: Vec<Command>,
}

/// End-of-scene world transition. `None` fields mean "no change".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finale {
    pub next_script: Option<u32>,
    pub time: Option<TimeOfDay>,
    pub map: Option<String>,
    pub player: Option<(GridPos, Direction)>,
}

/// One compiled scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Map the scene plays on; its grid was used for compile-time routing.
    pub map_name: String,
    /// Background music the host should run under the scene, if any.
    pub music: Option<String>,
    pub skippable: bool,
    pub cast: Vec<CastMember>,
    /// Cast queues in declaration order, interface queue last.
    pub queues: Vec<CommandQueue>,
    pub finale: Finale,
}

impl Script {
    /// Role name that designates the player's actor.
    pub const PLAYER_ROLE: &'static str = "player";

    pub fn member(&self, role: &str) -> Option<&CastMember> {
        self.cast.iter().find(|member| member.role == role)
    }

    /// Handle of the player's actor, when the scene declares one.
    pub fn player(&self) -> Option<Uuid> {
        self.member(Self::PLAYER_ROLE).map(|member| member.actor)
    }

    /// Where the scene expects the player to stand when it begins.
    pub fn player_spawn(&self) -> Option<(GridPos, Direction)> {
        self.member(Self::PLAYER_ROLE)
            .map(|member| (member.spawn, member.facing))
    }

    pub fn command_count(&self) -> usize {
        self.queues.iter().map(|queue| queue.commands.len()).sum()
    }
}
