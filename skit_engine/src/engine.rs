//! Script engine
//!
//! Plays a compiled [`Script`] forward one cooperative tick at a time. The
//! host game owns the loop: it builds a [`ScriptContext`] each frame and
//! calls [`ScriptEngine::execute`]. Within a tick every run queue gets one
//! step; a queue whose front command finished on a previous tick pops it
//! and runs the successor once in the same tick. When the last queue
//! drains, the finale fires exactly once and the engine parks in
//! `Finished`.
//!
//! Cancellation is the skip flag: checked once at the top of a tick, it
//! resets each front command and drains every queue without running any
//! further side effects. Effects that already reached the host stay as
//! they are.

use std::collections::VecDeque;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use skit_grid::GridPos;
use variantly::Variantly;

use crate::actor::Direction;
use crate::command::Command;
use crate::effect::ScriptEffect;
use crate::host::ScriptContext;
use crate::script::{QueueKey, Script};

/// Playback lifecycle. `Finished` is terminal until the next `start`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Variantly)]
pub enum EnginePhase {
    Loaded,
    Started,
    Running,
    Finished,
}

/// Live, drainable copy of one template queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunQueue {
    pub key: QueueKey,
    pub commands: VecDeque<Command>,
}

/// Read-only view of the run queues, handed to commands so Wait can poll
/// another actor's progress.
pub struct QueueStatus<'a> {
    queues: &'a [RunQueue],
}

impl<'a> QueueStatus<'a> {
    pub fn new(queues: &'a [RunQueue]) -> Self {
        Self { queues }
    }

    /// Line index at the front of a queue, or `None` once it has drained.
    pub fn front_line(&self, key: &QueueKey) -> Option<usize> {
        self.queues
            .iter()
            .find(|queue| queue.key == *key)
            .and_then(|queue| queue.commands.front())
            .map(|command| command.line)
    }
}

/// Tick-driven interpreter for one script instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEngine {
    script: Script,
    phase: EnginePhase,
    skip: bool,
    runs: Vec<RunQueue>,
}

impl ScriptEngine {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            phase: EnginePhase::Loaded,
            skip: false,
            runs: Vec::new(),
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }

    /// Request cancellation; honored at the top of the next tick.
    pub fn set_skip(&mut self, skip: bool) {
        self.skip = skip;
    }

    pub fn skippable(&self) -> bool {
        self.script.skippable
    }

    pub fn map_name(&self) -> &str {
        &self.script.map_name
    }

    pub fn music(&self) -> Option<&str> {
        self.script.music.as_deref()
    }

    pub fn player_spawn(&self) -> Option<(GridPos, Direction)> {
        self.script.player_spawn()
    }

    /// Follow-up script to hand back to the host once finished.
    pub fn next_script(&self) -> Option<u32> {
        self.script.finale.next_script
    }

    /// Clone every template queue into a fresh run copy. Restartable from
    /// any phase, so a finished scene can be replayed without recompiling.
    pub fn start(&mut self) {
        self.runs = self
            .script
            .queues
            .iter()
            .map(|template| RunQueue {
                key: template.key.clone(),
                commands: template.commands.iter().cloned().collect(),
            })
            .collect();
        self.skip = false;
        self.phase = EnginePhase::Started;
        info!(
            "script on '{}' started: {} queue(s), {} command(s)",
            self.script.map_name,
            self.runs.len(),
            self.script.command_count()
        );
    }

    /// Advance playback by one tick.
    pub fn execute(&mut self, ctx: &mut ScriptContext<'_>) {
        match self.phase {
            EnginePhase::Loaded => {
                warn!("script engine ticked before start; ignoring");
                return;
            },
            EnginePhase::Finished => return,
            EnginePhase::Started => self.phase = EnginePhase::Running,
            EnginePhase::Running => {},
        }

        if self.skip {
            debug!("skip raised: draining {} queue(s)", self.runs.len());
            for queue in &mut self.runs {
                if let Some(front) = queue.commands.front_mut() {
                    front.reset();
                }
                queue.commands.clear();
            }
        } else {
            for index in 0..self.runs.len() {
                self.step_queue(index, ctx);
            }
        }

        if self.runs.iter().all(|queue| queue.commands.is_empty()) {
            self.finish(ctx);
        }
    }

    /// One tick of one queue: pop a command that finished last tick and
    /// give its successor a single cascaded run, or run the current front.
    ///
    /// The cascade is one level deep on purpose: a successor that finishes
    /// instantly on its cascaded run stays at the front, marked finished,
    /// until the next tick pops it. Scene timing is tuned around that
    /// extra tick.
    fn step_queue(&mut self, index: usize, ctx: &mut ScriptContext<'_>) {
        let Some(front_finished) = self.runs[index].commands.front().map(|c| c.finished) else {
            return;
        };
        if front_finished {
            if let Some(mut done) = self.runs[index].commands.pop_front() {
                done.reset();
            }
            if !self.runs[index].commands.is_empty() {
                self.run_front(index, ctx);
            }
        } else {
            self.run_front(index, ctx);
        }
    }

    fn run_front(&mut self, index: usize, ctx: &mut ScriptContext<'_>) {
        let owner = self.runs[index].key.actor();
        let Some(mut command) = self.runs[index].commands.pop_front() else {
            return;
        };
        let effect = command.execute(owner, ctx, &QueueStatus::new(&self.runs));
        self.runs[index].commands.push_front(command);
        if let Some(effect) = effect {
            self.apply_effect(ctx, &effect);
        }
    }

    /// Effect dispatch table for deferred dialogue effects.
    fn apply_effect(&mut self, ctx: &mut ScriptContext<'_>, effect: &ScriptEffect) {
        info!("dispatching script effect {effect:?}");
        match effect {
            ScriptEffect::SkipScene => self.skip = true,
            ScriptEffect::GiveItem { item, amount } => ctx.world.give_item(item, *amount),
            ScriptEffect::SetFlag { flag, value } => ctx.world.set_flag(flag, *value),
        }
    }

    /// Apply the finale once every queue has drained.
    fn finish(&mut self, ctx: &mut ScriptContext<'_>) {
        self.phase = EnginePhase::Finished;
        info!("script on '{}' finished", self.script.map_name);

        ctx.presentation.set_overlay(false);
        ctx.presentation.restore_speed_indicator();
        ctx.world.release_player();

        if let Some((position, facing)) = self.script.finale.player {
            if let Some(player) = self.script.player() {
                ctx.actors.set_position(player, position);
                ctx.actors.rotate(player, facing);
            } else {
                warn!("finale repositions the player but the scene casts no player role");
            }
        }

        if let Some(time) = self.script.finale.time {
            let previous = ctx.world.time_of_day();
            ctx.world.set_time_of_day(time);
            if previous != time {
                ctx.presentation.time_transition(previous, time);
            }
        }

        match &self.script.finale.map {
            Some(map) => ctx.world.load_map(map),
            None => ctx.world.reload_map(),
        }
        ctx.world.play_map_theme();
    }
}
