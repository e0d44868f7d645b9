#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

//! Skit: a cooperative, tick-driven cutscene engine.
//!
//! A scene is authored as a compact three-segment text script, compiled by
//! [`loader`] into an immutable [`Script`] (cast registry, one command queue
//! per actor plus a UI-only queue, and a finale descriptor), and played back
//! by the [`ScriptEngine`], which the host game ticks once per frame. All
//! game-facing side effects go through the collaborator traits in [`host`].

pub const SKIT_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod actor;
pub mod command;
pub mod effect;
pub mod engine;
pub mod host;
pub mod loader;
pub mod script;
pub mod testing;

// Re-exports for convenience
pub use actor::{CastMember, Direction, TimeOfDay};
pub use command::{Command, CommandKind};
pub use effect::ScriptEffect;
pub use engine::{EnginePhase, ScriptEngine};
pub use host::{
    ActorDirectory, MapCatalog, MovementHost, PresentationHost, ScriptContext, WorldHost,
};
pub use loader::{ScriptError, compile_script, load_script};
pub use script::{CommandQueue, Finale, QueueKey, Script};
