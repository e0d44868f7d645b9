//! Script commands
//!
//! Every instruction a scene can issue is a [`CommandKind`] variant wrapped
//! in a [`Command`] carrying its queue position and completion flag. The
//! engine calls [`Command::execute`] once per tick on the front of each run
//! queue; a command requests side effects through the context, reports
//! completion by flipping `finished`, and may hand back a [`ScriptEffect`]
//! for the engine to dispatch. [`Command::reset`] returns a command to its
//! pre-execution state so a scene can be replayed without recompiling.
//!
//! Commands never block: "waiting" is returning with `finished` still
//! false and being polled again next tick.

use serde::{Deserialize, Serialize};
use skit_grid::Path;
use uuid::Uuid;

use crate::actor::Direction;
use crate::effect::ScriptEffect;
use crate::engine::QueueStatus;
use crate::host::ScriptContext;
use crate::script::QueueKey;

/// One queued instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Position within the owning queue. Assigned at compile time, strictly
    /// increasing, never renumbered; Wait commands compare against it.
    pub line: usize,
    pub finished: bool,
    pub kind: CommandKind,
}

/// The closed instruction vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Face a direction, then walk `steps` cells along it. The route was
    /// computed at compile time; `steps == 0` is a pure rotation, and a
    /// missing route degrades to the rotation alone.
    MoveDirection {
        facing: Direction,
        speed: u32,
        steps: u32,
        route: Option<Path>,
        started: bool,
    },
    /// Walk a precomputed route to its final waypoint.
    MoveAlongPath {
        route: Path,
        speed: u32,
        started: bool,
    },
    /// Hold until the target queue's front line has moved past `past_line`
    /// or the target queue has drained.
    Wait { target: QueueKey, past_line: usize },
    /// Mood indicator over the actor; clears once the dialogue box is gone
    /// or the indicator was cleared externally.
    Emotion { tag: String, shown: bool },
    /// Dialogue box, with an optional effect once the player closes it.
    Text {
        message: String,
        on_close: Option<ScriptEffect>,
        shown: bool,
    },
    /// One-shot sound cue; reports finished on the tick after it fires.
    Jingle { cue: String, played: bool },
    /// Toggle the loading indicator. Single-tick.
    Loading { show: bool },
}

impl Command {
    pub fn new(line: usize, kind: CommandKind) -> Self {
        Self {
            line,
            finished: false,
            kind,
        }
    }

    /// Advance this command by one tick.
    ///
    /// `owner` is the actor whose queue the command sits on (`None` on the
    /// interface queue). Returns a deferred effect for the engine to
    /// dispatch, at most once per activation.
    pub fn execute(
        &mut self,
        owner: Option<Uuid>,
        ctx: &mut ScriptContext<'_>,
        queues: &QueueStatus<'_>,
    ) -> Option<ScriptEffect> {
        match &mut self.kind {
            CommandKind::MoveDirection {
                facing,
                speed,
                steps,
                route,
                started,
            } => {
                let actor = owner?;
                if *started {
                    ctx.actors.advance_along_path(actor);
                    if ctx.actors.at_goal(actor) {
                        self.finished = true;
                    }
                } else {
                    *started = true;
                    ctx.actors.rotate(actor, *facing);
                    match route {
                        Some(route) if *steps > 0 => {
                            ctx.actors.set_speed(actor, *speed);
                            ctx.actors.assign_path(actor, route.clone());
                        },
                        // pure rotation, or no route was found
                        _ => self.finished = true,
                    }
                }
                None
            },
            CommandKind::MoveAlongPath {
                route,
                speed,
                started,
            } => {
                let actor = owner?;
                if *started {
                    ctx.actors.advance_along_path(actor);
                    if ctx.actors.at_goal(actor) {
                        self.finished = true;
                    }
                } else {
                    *started = true;
                    ctx.actors.set_speed(actor, *speed);
                    ctx.actors.assign_path(actor, route.clone());
                }
                None
            },
            CommandKind::Wait { target, past_line } => {
                let released = match queues.front_line(target) {
                    Some(line) => line > *past_line,
                    None => true,
                };
                if released {
                    self.finished = true;
                }
                None
            },
            CommandKind::Emotion { tag, shown } => {
                let actor = owner?;
                if *shown {
                    if !ctx.presentation.dialogue_visible() || !ctx.presentation.emote_visible(actor)
                    {
                        ctx.presentation.clear_emote(actor);
                        self.finished = true;
                    }
                } else {
                    *shown = true;
                    ctx.presentation.show_emote(actor, tag);
                }
                None
            },
            CommandKind::Text {
                message,
                on_close,
                shown,
            } => {
                if *shown {
                    if !ctx.presentation.dialogue_visible() {
                        self.finished = true;
                        return on_close.clone();
                    }
                } else {
                    *shown = true;
                    ctx.presentation.show_dialogue(owner, message);
                }
                None
            },
            CommandKind::Jingle { cue, played } => {
                if *played {
                    self.finished = true;
                } else {
                    *played = true;
                    ctx.presentation.play_jingle(cue);
                }
                None
            },
            CommandKind::Loading { show } => {
                ctx.presentation.set_loading(*show);
                self.finished = true;
                None
            },
        }
    }

    /// Restore the pre-execution state. Idempotent.
    pub fn reset(&mut self) {
        self.finished = false;
        match &mut self.kind {
            CommandKind::MoveDirection { started, .. }
            | CommandKind::MoveAlongPath { started, .. } => *started = false,
            CommandKind::Emotion { shown, .. } | CommandKind::Text { shown, .. } => *shown = false,
            CommandKind::Jingle { played, .. } => *played = false,
            CommandKind::Wait { .. } | CommandKind::Loading { .. } => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunQueue;
    use crate::testing::{TestActors, TestStage, TestWorld};
    use skit_grid::GridPos;
    use std::collections::VecDeque;

    fn route(cells: &[(i32, i32)]) -> Path {
        Path::new(cells.iter().map(|&(x, y)| GridPos::new(x, y)).collect())
    }

    fn walk_route() -> Path {
        route(&[(0, 0), (1, 0), (2, 0)])
    }

    #[test]
    fn move_direction_with_zero_steps_is_a_pure_rotation() {
        let mut actors = TestActors::default();
        let id = actors.insert(GridPos::new(3, 3), Direction::Down);
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();
        let mut ctx = ScriptContext::new(&mut actors, &mut stage, &mut world);

        let mut cmd = Command::new(0, CommandKind::MoveDirection {
            facing: Direction::Left,
            speed: 1,
            steps: 0,
            route: None,
            started: false,
        });
        cmd.execute(Some(id), &mut ctx, &QueueStatus::new(&[]));

        assert!(cmd.finished);
        assert_eq!(actors.actor(id).facing, Direction::Left);
        assert_eq!(actors.actor(id).position, GridPos::new(3, 3));
        assert!(actors.actor(id).route.is_none());
    }

    #[test]
    fn move_direction_without_route_finishes_without_moving() {
        let mut actors = TestActors::default();
        let id = actors.insert(GridPos::new(0, 0), Direction::Down);
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();
        let mut ctx = ScriptContext::new(&mut actors, &mut stage, &mut world);

        let mut cmd = Command::new(0, CommandKind::MoveDirection {
            facing: Direction::Right,
            speed: 2,
            steps: 3,
            route: None,
            started: false,
        });
        cmd.execute(Some(id), &mut ctx, &QueueStatus::new(&[]));

        assert!(cmd.finished);
        assert_eq!(actors.actor(id).facing, Direction::Right);
        assert_eq!(actors.actor(id).position, GridPos::new(0, 0));
    }

    #[test]
    fn move_direction_walks_its_route_one_step_per_tick() {
        let mut actors = TestActors::default();
        let id = actors.insert(GridPos::new(0, 0), Direction::Down);
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();

        let mut cmd = Command::new(0, CommandKind::MoveDirection {
            facing: Direction::Right,
            speed: 2,
            steps: 2,
            route: Some(walk_route()),
            started: false,
        });

        cmd.execute(
            Some(id),
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(!cmd.finished);
        assert_eq!(actors.actor(id).speed, 2);
        assert!(actors.actor(id).route.is_some());

        cmd.execute(
            Some(id),
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(!cmd.finished);
        cmd.execute(
            Some(id),
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(cmd.finished);
        assert_eq!(actors.actor(id).position, GridPos::new(2, 0));
        assert_eq!(actors.actor(id).advances, 2);
    }

    #[test]
    fn move_along_path_finishes_at_the_final_waypoint() {
        let mut actors = TestActors::default();
        let id = actors.insert(GridPos::new(0, 0), Direction::Down);
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();
        let mut ctx = ScriptContext::new(&mut actors, &mut stage, &mut world);

        let mut cmd = Command::new(0, CommandKind::MoveAlongPath {
            route: walk_route(),
            speed: 1,
            started: false,
        });

        let mut ticks = 0;
        while !cmd.finished {
            cmd.execute(Some(id), &mut ctx, &QueueStatus::new(&[]));
            ticks += 1;
            assert!(ticks < 10, "command never finished");
        }
        assert_eq!(actors.actor(id).position, GridPos::new(2, 0));
        assert_eq!(actors.actor(id).advances, 2);
    }

    #[test]
    fn wait_holds_until_target_front_line_moves_past_threshold() {
        let mut actors = TestActors::default();
        let target_actor = actors.insert(GridPos::new(0, 0), Direction::Down);
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();
        let mut ctx = ScriptContext::new(&mut actors, &mut stage, &mut world);

        let target = QueueKey::Actor(target_actor);
        let mut cmd = Command::new(0, CommandKind::Wait {
            target: target.clone(),
            past_line: 1,
        });

        let mut runs = vec![RunQueue {
            key: target.clone(),
            commands: VecDeque::from(vec![
                Command::new(1, CommandKind::Loading { show: true }),
                Command::new(2, CommandKind::Loading { show: false }),
            ]),
        }];

        cmd.execute(None, &mut ctx, &QueueStatus::new(&runs));
        assert!(!cmd.finished, "front line 1 is not past 1");

        runs[0].commands.pop_front();
        cmd.execute(None, &mut ctx, &QueueStatus::new(&runs));
        assert!(cmd.finished, "front line 2 is past 1");
    }

    #[test]
    fn wait_releases_when_target_queue_is_empty() {
        let mut actors = TestActors::default();
        let target_actor = actors.insert(GridPos::new(0, 0), Direction::Down);
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();
        let mut ctx = ScriptContext::new(&mut actors, &mut stage, &mut world);

        let target = QueueKey::Actor(target_actor);
        let runs = vec![RunQueue {
            key: target.clone(),
            commands: VecDeque::new(),
        }];

        let mut cmd = Command::new(0, CommandKind::Wait {
            target,
            past_line: 99,
        });
        cmd.execute(None, &mut ctx, &QueueStatus::new(&runs));
        assert!(cmd.finished);
    }

    #[test]
    fn emotion_clears_once_dialogue_closes() {
        let mut actors = TestActors::default();
        let id = actors.insert(GridPos::new(0, 0), Direction::Down);
        let mut stage = TestStage::default();
        stage.dialogue_open = true;
        let mut world = TestWorld::default();

        let mut cmd = Command::new(0, CommandKind::Emotion {
            tag: "surprise".into(),
            shown: false,
        });

        cmd.execute(
            Some(id),
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(!cmd.finished);
        assert!(stage.emotes.contains_key(&id));

        // dialogue still up, indicator stays
        cmd.execute(
            Some(id),
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(!cmd.finished);

        stage.dialogue_open = false;
        cmd.execute(
            Some(id),
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(cmd.finished);
        assert!(!stage.emotes.contains_key(&id));
    }

    #[test]
    fn emotion_finishes_when_indicator_cleared_externally() {
        let mut actors = TestActors::default();
        let id = actors.insert(GridPos::new(0, 0), Direction::Down);
        let mut stage = TestStage::default();
        stage.dialogue_open = true;
        let mut world = TestWorld::default();

        let mut cmd = Command::new(0, CommandKind::Emotion {
            tag: "anger".into(),
            shown: false,
        });
        cmd.execute(
            Some(id),
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        stage.emotes.remove(&id);
        cmd.execute(
            Some(id),
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(cmd.finished);
    }

    #[test]
    fn text_returns_its_effect_exactly_once_when_dialogue_closes() {
        let mut actors = TestActors::default();
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();

        let mut cmd = Command::new(0, CommandKind::Text {
            message: "So long.".into(),
            on_close: Some(ScriptEffect::SkipScene),
            shown: false,
        });

        let first = cmd.execute(
            None,
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(first.is_none());
        assert!(stage.dialogue_open);

        let second = cmd.execute(
            None,
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(second.is_none());
        assert!(!cmd.finished);

        stage.dialogue_open = false;
        let effect = cmd.execute(
            None,
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert_eq!(effect, Some(ScriptEffect::SkipScene));
        assert!(cmd.finished);
        assert_eq!(stage.dialogue_log.len(), 1);
    }

    #[test]
    fn jingle_fires_on_activation_and_finishes_next_tick() {
        let mut actors = TestActors::default();
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();

        let mut cmd = Command::new(0, CommandKind::Jingle {
            cue: "fanfare".into(),
            played: false,
        });
        cmd.execute(
            None,
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(!cmd.finished);
        assert_eq!(stage.jingles, vec!["fanfare".to_string()]);

        cmd.execute(
            None,
            &mut ScriptContext::new(&mut actors, &mut stage, &mut world),
            &QueueStatus::new(&[]),
        );
        assert!(cmd.finished);
        // no second play
        assert_eq!(stage.jingles.len(), 1);
    }

    #[test]
    fn loading_toggle_is_single_tick() {
        let mut actors = TestActors::default();
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();
        let mut ctx = ScriptContext::new(&mut actors, &mut stage, &mut world);

        let mut cmd = Command::new(0, CommandKind::Loading { show: true });
        cmd.execute(None, &mut ctx, &QueueStatus::new(&[]));
        assert!(cmd.finished);
        assert!(stage.loading);
    }

    #[test]
    fn reset_restores_the_freshly_constructed_state() {
        let mut actors = TestActors::default();
        let id = actors.insert(GridPos::new(0, 0), Direction::Down);
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();
        let mut ctx = ScriptContext::new(&mut actors, &mut stage, &mut world);

        let build: Vec<fn() -> CommandKind> = vec![
            || CommandKind::MoveDirection {
                facing: Direction::Up,
                speed: 1,
                steps: 2,
                route: Some(Path::new(vec![
                    GridPos::new(0, 0),
                    GridPos::new(0, -1),
                    GridPos::new(0, -2),
                ])),
                started: false,
            },
            || CommandKind::MoveAlongPath {
                route: Path::new(vec![GridPos::new(0, 0), GridPos::new(1, 0)]),
                speed: 1,
                started: false,
            },
            || CommandKind::Emotion {
                tag: "joy".into(),
                shown: false,
            },
            || CommandKind::Text {
                message: "hello".into(),
                on_close: Some(ScriptEffect::SetFlag {
                    flag: "met".into(),
                    value: true,
                }),
                shown: false,
            },
            || CommandKind::Jingle {
                cue: "bell".into(),
                played: false,
            },
            || CommandKind::Loading { show: false },
        ];

        for make in build {
            let mut cmd = Command::new(3, make());
            cmd.execute(Some(id), &mut ctx, &QueueStatus::new(&[]));
            cmd.execute(Some(id), &mut ctx, &QueueStatus::new(&[]));
            cmd.reset();
            cmd.reset(); // idempotent
            assert_eq!(cmd, Command::new(3, make()));
        }
    }

    #[test]
    fn reset_command_replays_its_first_tick_side_effects() {
        let mut actors = TestActors::default();
        let mut stage = TestStage::default();
        let mut world = TestWorld::default();
        let mut ctx = ScriptContext::new(&mut actors, &mut stage, &mut world);

        let mut cmd = Command::new(0, CommandKind::Jingle {
            cue: "bell".into(),
            played: false,
        });
        cmd.execute(None, &mut ctx, &QueueStatus::new(&[]));
        cmd.reset();
        cmd.execute(None, &mut ctx, &QueueStatus::new(&[]));
        assert_eq!(stage.jingles, vec!["bell".to_string(), "bell".to_string()]);
    }
}
