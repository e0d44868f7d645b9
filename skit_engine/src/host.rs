//! Collaborator seams
//!
//! The engine is deliberately blind to how the game renders, sounds, or
//! stores anything: every side effect is a request through one of these
//! traits, and every condition the engine polls (dialogue visibility, route
//! progress) is state the host reports back on a later tick. A
//! [`ScriptContext`] bundles the mutable handles and is threaded into each
//! command execution, so nothing in the engine reaches for global state.
//!
//! Movement is one uniform capability: player-controlled and scripted
//! actors alike sit behind [`MovementHost`], keyed by the opaque handle
//! their directory returned at spawn time.

use skit_grid::{CollisionGrid, GridPos, Path};
use uuid::Uuid;

use crate::actor::{Direction, TimeOfDay};

/// Compile-time lookup of a map's collision grid.
pub trait MapCatalog {
    fn collision_grid(&self, map_name: &str) -> Option<&CollisionGrid>;
}

/// Resolves a script role to a spawned actor.
///
/// Returning `None` means the role cannot be staged (unknown sprite,
/// missing character table entry, ...) and aborts compilation of the
/// requesting script.
pub trait ActorDirectory {
    fn spawn(
        &mut self,
        role: &str,
        variant: Option<u32>,
        spawn: GridPos,
        facing: Direction,
    ) -> Option<Uuid>;
}

/// Per-actor movement capability.
pub trait MovementHost {
    fn position(&self, actor: Uuid) -> GridPos;
    fn set_position(&mut self, actor: Uuid, position: GridPos);
    fn speed(&self, actor: Uuid) -> u32;
    fn set_speed(&mut self, actor: Uuid, speed: u32);
    fn rotate(&mut self, actor: Uuid, facing: Direction);
    /// Hand the actor a route to walk. Replaces any route in progress.
    fn assign_path(&mut self, actor: Uuid, route: Path);
    /// Ask the actor to move one step along its assigned route.
    fn advance_along_path(&mut self, actor: Uuid);
    /// Has the actor reached the final waypoint of its assigned route?
    fn at_goal(&self, actor: Uuid) -> bool;
}

/// Screen-side collaborator: dialogue, indicators, overlays, sound cues.
pub trait PresentationHost {
    fn show_dialogue(&mut self, speaker: Option<Uuid>, message: &str);
    /// Is a dialogue box currently on screen? Polled by waiting commands.
    fn dialogue_visible(&self) -> bool;
    fn set_loading(&mut self, show: bool);
    fn play_jingle(&mut self, cue: &str);
    fn show_emote(&mut self, actor: Uuid, tag: &str);
    fn emote_visible(&self, actor: Uuid) -> bool;
    fn clear_emote(&mut self, actor: Uuid);
    /// Toggle the scene overlay; the engine takes it down when playback
    /// ends.
    fn set_overlay(&mut self, visible: bool);
    /// Restore the movement-speed indicator the scene suppressed.
    fn restore_speed_indicator(&mut self);
    /// Before/after effect for a time-of-day change.
    fn time_transition(&mut self, from: TimeOfDay, to: TimeOfDay);
}

/// World-side collaborator: clock, maps, music, inventory, progress flags.
pub trait WorldHost {
    fn time_of_day(&self) -> TimeOfDay;
    fn set_time_of_day(&mut self, time: TimeOfDay);
    fn load_map(&mut self, map_name: &str);
    fn reload_map(&mut self);
    /// Switch background music to the active map's theme.
    fn play_map_theme(&mut self);
    fn give_item(&mut self, item: &str, amount: u32);
    fn set_flag(&mut self, flag: &str, value: bool);
    fn flag(&self, flag: &str) -> bool;
    /// Re-enable player interaction once a scene ends.
    fn release_player(&mut self);
}

/// Bundle of collaborator handles threaded through one engine tick.
pub struct ScriptContext<'a> {
    pub actors: &'a mut dyn MovementHost,
    pub presentation: &'a mut dyn PresentationHost,
    pub world: &'a mut dyn WorldHost,
}

impl<'a> ScriptContext<'a> {
    pub fn new(
        actors: &'a mut dyn MovementHost,
        presentation: &'a mut dyn PresentationHost,
        world: &'a mut dyn WorldHost,
    ) -> Self {
        Self {
            actors,
            presentation,
            world,
        }
    }
}
