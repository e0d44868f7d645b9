//! Cue compilation
//!
//! Turns the cue segment into template command queues: one per cast member
//! in declaration order, then the interface queue. Line indices are handed
//! out per queue as commands are pushed, so a waypoint cue that expands
//! into several movement commands consumes several indices.
//!
//! Movement routing runs against a simulated cursor per actor. The cursor
//! starts on the spawn cell, jumps to the last waypoint of each waypoint
//! cue, and follows a relative move only when a route was actually found,
//! mirroring what the actor will do at runtime.

use log::debug;
use skit_grid::{CollisionGrid, GridPos, Pathfinder};

use super::{
    INTERFACE_KEY, Line, ScriptError, bracket_segments, malformed, parse_num, parse_toggle,
};
use crate::actor::{CastMember, Direction};
use crate::command::{Command, CommandKind};
use crate::effect::ScriptEffect;
use crate::script::{CommandQueue, QueueKey};

/// Queue a cue line addresses: its index, plus the cast index when it is
/// an actor queue.
struct Slot {
    queue: usize,
    cast_index: Option<usize>,
}

pub(super) fn build_queues(
    lines: &[Line<'_>],
    cast: &[CastMember],
    grid: &CollisionGrid,
    finder: &Pathfinder,
) -> Result<Vec<CommandQueue>, ScriptError> {
    let mut queues: Vec<CommandQueue> = cast
        .iter()
        .map(|member| CommandQueue {
            key: QueueKey::Actor(member.actor),
            commands: Vec::new(),
        })
        .collect();
    queues.push(CommandQueue {
        key: QueueKey::Interface,
        commands: Vec::new(),
    });
    let mut cursors: Vec<GridPos> = cast.iter().map(|member| member.spawn).collect();

    for line in lines {
        let segments = bracket_segments(line)?;
        if segments.len() < 2 {
            return Err(malformed(line));
        }
        let slot = resolve_slot(cast, segments[0], line)?;
        let (verb, params) = segments[1].split_once('|').ok_or_else(|| malformed(line))?;
        let extras = &segments[2..];

        match verb {
            "path" => {
                let cast_index = require_actor(&slot, verb, line)?;
                let numbers: Vec<i32> = params
                    .split(',')
                    .map(|token| parse_num(line.number, token))
                    .collect::<Result<_, _>>()?;
                if numbers.len() < 4 || numbers.len() % 2 != 0 {
                    return Err(malformed(line));
                }
                let speed = parse_speed(line, extras)?;
                let cells: Vec<GridPos> = numbers
                    .chunks(2)
                    .map(|pair| GridPos::new(pair[0], pair[1]))
                    .collect();
                for pair in cells.windows(2) {
                    let route = finder.find_path(grid, pair[0], pair[1]).ok_or(
                        ScriptError::UnreachableLeg {
                            line: line.number,
                            from: pair[0],
                            to: pair[1],
                        },
                    )?;
                    push_command(&mut queues[slot.queue], CommandKind::MoveAlongPath {
                        route,
                        speed,
                        started: false,
                    });
                }
                if let Some(last) = cells.last() {
                    cursors[cast_index] = *last;
                }
            },
            "up" | "down" | "left" | "right" => {
                let cast_index = require_actor(&slot, verb, line)?;
                let facing =
                    Direction::parse(verb).ok_or_else(|| ScriptError::InvalidDirection {
                        line: line.number,
                        token: verb.to_string(),
                    })?;
                let steps: u32 = parse_num(line.number, params)?;
                let speed = parse_speed(line, extras)?;

                let mut route = None;
                if steps > 0 {
                    let cursor = cursors[cast_index];
                    let (dx, dy) = facing.offset();
                    let goal =
                        GridPos::new(cursor.x + dx * steps as i32, cursor.y + dy * steps as i32);
                    route = finder.find_path(grid, cursor, goal);
                    if route.is_some() {
                        cursors[cast_index] = goal;
                    } else {
                        debug!(
                            "line {}: no route {cursor} -> {goal}; move degrades to a rotation",
                            line.number
                        );
                    }
                }
                push_command(&mut queues[slot.queue], CommandKind::MoveDirection {
                    facing,
                    speed,
                    steps,
                    route,
                    started: false,
                });
            },
            "wait" => {
                require_no_extras(line, extras)?;
                let (target_token, index_token) =
                    params.split_once(',').ok_or_else(|| malformed(line))?;
                let target = if target_token == INTERFACE_KEY {
                    QueueKey::Interface
                } else {
                    cast.iter()
                        .find(|member| member.role == target_token)
                        .map(|member| QueueKey::Actor(member.actor))
                        .ok_or_else(|| ScriptError::UnknownActor {
                            line: line.number,
                            key: target_token.to_string(),
                        })?
                };
                let past_line: usize = parse_num(line.number, index_token)?;
                push_command(&mut queues[slot.queue], CommandKind::Wait {
                    target,
                    past_line,
                });
            },
            "emotion" => {
                require_actor(&slot, verb, line)?;
                require_no_extras(line, extras)?;
                if params.is_empty() {
                    return Err(malformed(line));
                }
                push_command(&mut queues[slot.queue], CommandKind::Emotion {
                    tag: params.to_string(),
                    shown: false,
                });
            },
            "text" => {
                if params.is_empty() {
                    return Err(malformed(line));
                }
                let on_close = parse_effect(line, extras)?;
                push_command(&mut queues[slot.queue], CommandKind::Text {
                    message: params.to_string(),
                    on_close,
                    shown: false,
                });
            },
            "loading" => {
                require_no_extras(line, extras)?;
                let show = parse_toggle(line, params)?;
                push_command(&mut queues[slot.queue], CommandKind::Loading { show });
            },
            "jingle" => {
                require_no_extras(line, extras)?;
                if params.is_empty() {
                    return Err(malformed(line));
                }
                push_command(&mut queues[slot.queue], CommandKind::Jingle {
                    cue: params.to_string(),
                    played: false,
                });
            },
            other => {
                return Err(ScriptError::UnknownVerb {
                    line: line.number,
                    verb: other.to_string(),
                });
            },
        }
    }

    Ok(queues)
}

fn resolve_slot(cast: &[CastMember], key: &str, line: &Line<'_>) -> Result<Slot, ScriptError> {
    if key == INTERFACE_KEY {
        return Ok(Slot {
            queue: cast.len(),
            cast_index: None,
        });
    }
    cast.iter()
        .position(|member| member.role == key)
        .map(|index| Slot {
            queue: index,
            cast_index: Some(index),
        })
        .ok_or_else(|| ScriptError::UnknownActor {
            line: line.number,
            key: key.to_string(),
        })
}

fn require_actor(slot: &Slot, verb: &str, line: &Line<'_>) -> Result<usize, ScriptError> {
    slot.cast_index.ok_or_else(|| ScriptError::NeedsActor {
        line: line.number,
        verb: verb.to_string(),
    })
}

fn require_no_extras(line: &Line<'_>, extras: &[&str]) -> Result<(), ScriptError> {
    if extras.is_empty() {
        Ok(())
    } else {
        Err(malformed(line))
    }
}

fn parse_speed(line: &Line<'_>, extras: &[&str]) -> Result<u32, ScriptError> {
    match extras {
        [] => Ok(1),
        [speed] => parse_num(line.number, speed),
        _ => Err(malformed(line)),
    }
}

/// Parse an optional dialogue-effect extra:
/// `skip`, `flag,<name>,on|off`, or `item,<id>,<count>`.
fn parse_effect(line: &Line<'_>, extras: &[&str]) -> Result<Option<ScriptEffect>, ScriptError> {
    match extras {
        [] => Ok(None),
        [entry] => {
            let fields: Vec<&str> = entry.split(',').collect();
            match fields.as_slice() {
                ["skip"] => Ok(Some(ScriptEffect::SkipScene)),
                ["flag", name, state] if !name.is_empty() => Ok(Some(ScriptEffect::SetFlag {
                    flag: (*name).to_string(),
                    value: parse_toggle(line, state)?,
                })),
                ["item", item, amount] if !item.is_empty() => Ok(Some(ScriptEffect::GiveItem {
                    item: (*item).to_string(),
                    amount: parse_num(line.number, amount)?,
                })),
                _ => Err(ScriptError::InvalidEffect {
                    line: line.number,
                    text: (*entry).to_string(),
                }),
            }
        },
        _ => Err(malformed(line)),
    }
}

fn push_command(queue: &mut CommandQueue, kind: CommandKind) {
    let line = queue.commands.len();
    queue.commands.push(Command::new(line, kind));
}
