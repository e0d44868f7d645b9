//! Script effects
//!
//! Dialogue boxes can hand the engine a follow-up effect to run once the
//! player closes them. Effects are plain data so a compiled script can be
//! inspected and tested without running anything; the engine resolves them
//! through its own dispatch table when the moment comes.

use serde::{Deserialize, Serialize};

/// Deferred effect attached to a dialogue box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptEffect {
    /// Cancel every remaining queued command across all actors.
    SkipScene,
    /// Put items in the player's inventory.
    GiveItem { item: String, amount: u32 },
    /// Set or clear a progress flag.
    SetFlag { flag: String, value: bool },
}
