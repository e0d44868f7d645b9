//! Script compiler
//!
//! Turns a scene's source text into a [`Script`]. Sources carry three
//! segments: meta lines up front, cue lines after the `@cues` marker, and
//! finale lines after `@finale`. Blank lines and `#` comments are skipped
//! everywhere.
//!
//! Compilation is strict on purpose: any malformed field aborts the whole
//! script with a [`ScriptError`] rather than leaving a half-built table
//! around for the engine to trip over. The engine trusts compiled output
//! completely, so this is the only validation gate.
//!
//! Routing happens here too. Waypoint cues are expanded one leg per
//! consecutive pair through the pathfinder, and relative moves get their
//! route computed against a simulated per-actor cursor that starts at the
//! spawn cell and follows each movement cue.

mod cues;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use log::info;
use skit_grid::{GridPos, Pathfinder};
use thiserror::Error;

use crate::actor::{CastMember, Direction, TimeOfDay};
use crate::host::{ActorDirectory, MapCatalog};
use crate::script::{Finale, Script};

/// Marker opening the cue segment.
pub const CUE_MARKER: &str = "@cues";
/// Marker opening the finale segment.
pub const FINALE_MARKER: &str = "@finale";
/// Reserved queue key for UI-only cues; not a castable role.
pub const INTERFACE_KEY: &str = "ui";

/// Everything that can abort script compilation.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: malformed script line '{text}'")]
    MalformedLine { line: usize, text: String },
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: invalid direction '{token}'")]
    InvalidDirection { line: usize, token: String },
    #[error("line {line}: invalid time of day '{token}'")]
    InvalidTime { line: usize, token: String },
    #[error("line {line}: invalid toggle '{token}' (expected on/off)")]
    InvalidToggle { line: usize, token: String },
    #[error("line {line}: invalid switch '{token}' (expected yes/no)")]
    InvalidYesNo { line: usize, token: String },
    #[error("line {line}: unknown meta key '{key}'")]
    UnknownMetaKey { line: usize, key: String },
    #[error("line {line}: unknown cue verb '{verb}'")]
    UnknownVerb { line: usize, verb: String },
    #[error("line {line}: unknown finale key '{key}'")]
    UnknownFinaleKey { line: usize, key: String },
    #[error("line {line}: unknown actor key '{key}'")]
    UnknownActor { line: usize, key: String },
    #[error("line {line}: verb '{verb}' requires an actor queue")]
    NeedsActor { line: usize, verb: String },
    #[error("line {line}: role '{role}' is reserved")]
    ReservedRole { line: usize, role: String },
    #[error("line {line}: duplicate role '{role}'")]
    DuplicateRole { line: usize, role: String },
    #[error("line {line}: invalid dialogue effect '{text}'")]
    InvalidEffect { line: usize, text: String },
    #[error("line {line}: actor '{role}' could not be spawned")]
    SpawnFailed { line: usize, role: String },
    #[error("line {line}: no route from {from} to {to}")]
    UnreachableLeg { line: usize, from: GridPos, to: GridPos },
    #[error("script declares no map")]
    MissingMap,
    #[error("no collision grid for map '{0}'")]
    UnknownMap(String),
}

/// One significant source line, with its 1-based position for errors.
struct Line<'a> {
    number: usize,
    text: &'a str,
}

/// Compile a scene source into an executable [`Script`].
///
/// Actors are spawned through `directory` as their meta lines are read,
/// and movement cues are routed against the collision grid `maps` reports
/// for the declared map.
///
/// # Errors
/// Any malformed field, unknown reference, or unreachable explicit
/// waypoint leg aborts the whole compilation.
pub fn compile_script(
    source: &str,
    maps: &dyn MapCatalog,
    directory: &mut dyn ActorDirectory,
) -> Result<Script, ScriptError> {
    let (meta_lines, cue_lines, finale_lines) = split_segments(source);

    let meta = parse_meta(&meta_lines, directory)?;
    let map_name = meta.map_name.ok_or(ScriptError::MissingMap)?;
    let grid = maps
        .collision_grid(&map_name)
        .ok_or_else(|| ScriptError::UnknownMap(map_name.clone()))?;

    let finder = Pathfinder::default();
    let queues = cues::build_queues(&cue_lines, &meta.cast, grid, &finder)?;
    let finale = parse_finale(&finale_lines)?;

    let script = Script {
        map_name,
        music: meta.music,
        skippable: meta.skippable,
        cast: meta.cast,
        queues,
        finale,
    };
    info!(
        "script on '{}' compiled: {} cast member(s), {} command(s)",
        script.map_name,
        script.cast.len(),
        script.command_count()
    );
    Ok(script)
}

/// Load and compile a scene from a script file.
///
/// # Errors
/// Bubbles up file IO failures and compilation errors with file context.
pub fn load_script(
    path: &Path,
    maps: &dyn MapCatalog,
    directory: &mut dyn ActorDirectory,
) -> anyhow::Result<Script> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("reading script from '{}'", path.display()))?;
    let script = compile_script(&source, maps, directory)
        .with_context(|| format!("compiling script '{}'", path.display()))?;
    Ok(script)
}

/// Sort the significant lines into their segments.
fn split_segments(source: &str) -> (Vec<Line<'_>>, Vec<Line<'_>>, Vec<Line<'_>>) {
    enum Segment {
        Meta,
        Cues,
        Finale,
    }

    let mut meta = Vec::new();
    let mut cues = Vec::new();
    let mut finale = Vec::new();
    let mut segment = Segment::Meta;
    for (index, raw) in source.lines().enumerate() {
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        match text {
            CUE_MARKER => segment = Segment::Cues,
            FINALE_MARKER => segment = Segment::Finale,
            _ => {
                let line = Line {
                    number: index + 1,
                    text,
                };
                match segment {
                    Segment::Meta => meta.push(line),
                    Segment::Cues => cues.push(line),
                    Segment::Finale => finale.push(line),
                }
            },
        }
    }
    (meta, cues, finale)
}

struct MetaBlock {
    map_name: Option<String>,
    music: Option<String>,
    skippable: bool,
    cast: Vec<CastMember>,
}

fn parse_meta(
    lines: &[Line<'_>],
    directory: &mut dyn ActorDirectory,
) -> Result<MetaBlock, ScriptError> {
    let mut meta = MetaBlock {
        map_name: None,
        music: None,
        skippable: false,
        cast: Vec::new(),
    };

    for line in lines {
        let segments = bracket_segments(line)?;
        let (key, value) = segments[0]
            .split_once('|')
            .ok_or_else(|| malformed(line))?;
        match key {
            "map" => {
                require_segments(line, &segments, 1)?;
                require_value(line, value)?;
                meta.map_name = Some(value.to_string());
            },
            "music" => {
                require_segments(line, &segments, 1)?;
                require_value(line, value)?;
                meta.music = Some(value.to_string());
            },
            "skippable" => {
                require_segments(line, &segments, 1)?;
                meta.skippable = parse_yes_no(line, value)?;
            },
            "actor" => {
                require_segments(line, &segments, 2)?;
                let (role, variant) = match value.split_once(',') {
                    Some((role, variant)) => (role, Some(parse_num::<u32>(line.number, variant)?)),
                    None => (value, None),
                };
                require_value(line, role)?;
                if role == INTERFACE_KEY {
                    return Err(ScriptError::ReservedRole {
                        line: line.number,
                        role: role.to_string(),
                    });
                }
                if meta.cast.iter().any(|member| member.role == role) {
                    return Err(ScriptError::DuplicateRole {
                        line: line.number,
                        role: role.to_string(),
                    });
                }
                let (spawn, facing) = parse_position(line, segments[1])?;
                let actor = directory.spawn(role, variant, spawn, facing).ok_or_else(|| {
                    ScriptError::SpawnFailed {
                        line: line.number,
                        role: role.to_string(),
                    }
                })?;
                meta.cast.push(CastMember {
                    role: role.to_string(),
                    variant,
                    actor,
                    spawn,
                    facing,
                });
            },
            other => {
                return Err(ScriptError::UnknownMetaKey {
                    line: line.number,
                    key: other.to_string(),
                });
            },
        }
    }
    Ok(meta)
}

fn parse_finale(lines: &[Line<'_>]) -> Result<Finale, ScriptError> {
    let mut finale = Finale::default();
    for line in lines {
        let (key, value) = line.text.split_once('|').ok_or_else(|| malformed(line))?;
        match key {
            "next" => finale.next_script = Some(parse_num(line.number, value)?),
            "time" => {
                let time = TimeOfDay::parse(value).ok_or_else(|| ScriptError::InvalidTime {
                    line: line.number,
                    token: value.to_string(),
                })?;
                finale.time = Some(time);
            },
            "map" => {
                require_value(line, value)?;
                finale.map = Some(value.to_string());
            },
            "player" => finale.player = Some(parse_position(line, value)?),
            other => {
                return Err(ScriptError::UnknownFinaleKey {
                    line: line.number,
                    key: other.to_string(),
                });
            },
        }
    }
    Ok(finale)
}

fn malformed(line: &Line<'_>) -> ScriptError {
    ScriptError::MalformedLine {
        line: line.number,
        text: line.text.to_string(),
    }
}

/// Break `[a][b][c]` into its bracketed segments. Anything outside a
/// bracket pair makes the line malformed.
fn bracket_segments<'a>(line: &Line<'a>) -> Result<Vec<&'a str>, ScriptError> {
    let mut segments = Vec::new();
    let mut rest = line.text;
    while !rest.is_empty() {
        let body = rest.strip_prefix('[').ok_or_else(|| malformed(line))?;
        let end = body.find(']').ok_or_else(|| malformed(line))?;
        segments.push(&body[..end]);
        rest = body[end + 1..].trim_start();
    }
    if segments.is_empty() {
        return Err(malformed(line));
    }
    Ok(segments)
}

fn require_segments(line: &Line<'_>, segments: &[&str], count: usize) -> Result<(), ScriptError> {
    if segments.len() == count {
        Ok(())
    } else {
        Err(malformed(line))
    }
}

fn require_value(line: &Line<'_>, value: &str) -> Result<(), ScriptError> {
    if value.is_empty() {
        Err(malformed(line))
    } else {
        Ok(())
    }
}

fn parse_num<T: FromStr>(line: usize, token: &str) -> Result<T, ScriptError> {
    token.trim().parse().map_err(|_| ScriptError::InvalidNumber {
        line,
        token: token.trim().to_string(),
    })
}

/// Parse an `x,y,dir` payload.
fn parse_position(line: &Line<'_>, payload: &str) -> Result<(GridPos, Direction), ScriptError> {
    let fields: Vec<&str> = payload.split(',').collect();
    match fields.as_slice() {
        [x, y, dir] => {
            let x = parse_num(line.number, x)?;
            let y = parse_num(line.number, y)?;
            let facing =
                Direction::parse(dir.trim()).ok_or_else(|| ScriptError::InvalidDirection {
                    line: line.number,
                    token: (*dir).trim().to_string(),
                })?;
            Ok((GridPos::new(x, y), facing))
        },
        _ => Err(malformed(line)),
    }
}

fn parse_toggle(line: &Line<'_>, token: &str) -> Result<bool, ScriptError> {
    match token {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(ScriptError::InvalidToggle {
            line: line.number,
            token: token.to_string(),
        }),
    }
}

fn parse_yes_no(line: &Line<'_>, token: &str) -> Result<bool, ScriptError> {
    match token {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(ScriptError::InvalidYesNo {
            line: line.number,
            token: token.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestCatalog, TestDirectory};
    use skit_grid::CollisionGrid;

    fn meadow() -> TestCatalog {
        TestCatalog::with_map("meadow", CollisionGrid::new(8, 8))
    }

    #[test]
    fn minimal_script_compiles() {
        let source = "\n# a quiet scene\n[map|meadow]\n";
        let script =
            compile_script(source, &meadow(), &mut TestDirectory::default()).expect("compile");
        assert_eq!(script.map_name, "meadow");
        assert!(!script.skippable);
        assert!(script.music.is_none());
        assert!(script.cast.is_empty());
        // just the interface queue, empty
        assert_eq!(script.queues.len(), 1);
        assert_eq!(script.command_count(), 0);
    }

    #[test]
    fn meta_keys_feed_the_script_header() {
        let source = "[map|meadow]\n[music|theme_of_rain]\n[skippable|yes]\n";
        let script =
            compile_script(source, &meadow(), &mut TestDirectory::default()).expect("compile");
        assert_eq!(script.music.as_deref(), Some("theme_of_rain"));
        assert!(script.skippable);
    }

    #[test]
    fn actor_meta_spawns_through_the_directory() {
        let source = "[map|meadow]\n[actor|player][1,2,down]\n[actor|elder,3][4,4,up]\n";
        let mut directory = TestDirectory::default();
        let script = compile_script(source, &meadow(), &mut directory).expect("compile");

        assert_eq!(script.cast.len(), 2);
        assert_eq!(script.cast[1].role, "elder");
        assert_eq!(script.cast[1].variant, Some(3));
        assert_eq!(script.cast[1].facing, Direction::Up);
        assert_eq!(directory.spawned.len(), 2);
        assert_eq!(script.player(), directory.id_for("player"));
        // one queue per cast member plus the interface queue
        assert_eq!(script.queues.len(), 3);
    }

    #[test]
    fn segments_split_on_markers() {
        let (meta, cues, finale) =
            split_segments("[map|m]\n@cues\n[ui][loading|on]\n@finale\ntime|night\n");
        assert_eq!(meta.len(), 1);
        assert_eq!(cues.len(), 1);
        assert_eq!(finale.len(), 1);
        assert_eq!(cues[0].number, 3);
    }

    #[test]
    fn comments_and_blanks_are_skipped_everywhere() {
        let source = "# header\n\n[map|meadow]\n@cues\n# no cues yet\n@finale\n# nothing\n";
        let script =
            compile_script(source, &meadow(), &mut TestDirectory::default()).expect("compile");
        assert_eq!(script.command_count(), 0);
        assert_eq!(script.finale, Finale::default());
    }

    #[test]
    fn bracket_segments_reject_loose_text() {
        let line = Line {
            number: 7,
            text: "[hero] walks away",
        };
        let err = bracket_segments(&line).unwrap_err();
        match err {
            ScriptError::MalformedLine { line, .. } => assert_eq!(line, 7),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_map_aborts_compilation() {
        let err = compile_script("[skippable|no]\n", &meadow(), &mut TestDirectory::default())
            .unwrap_err();
        assert!(matches!(err, ScriptError::MissingMap));
    }

    #[test]
    fn unknown_map_aborts_compilation() {
        let err = compile_script("[map|volcano]\n", &meadow(), &mut TestDirectory::default())
            .unwrap_err();
        match err {
            ScriptError::UnknownMap(name) => assert_eq!(name, "volcano"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn failed_spawn_aborts_compilation() {
        let mut directory = TestDirectory::default();
        directory.deny_role("ghost");
        let err = compile_script(
            "[map|meadow]\n[actor|ghost][0,0,up]\n",
            &meadow(),
            &mut directory,
        )
        .unwrap_err();
        match err {
            ScriptError::SpawnFailed { role, .. } => assert_eq!(role, "ghost"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn finale_lines_fill_the_descriptor() {
        let source = "[map|meadow]\n@finale\nnext|12\ntime|night\nmap|cottage\nplayer|3,1,left\n";
        let script =
            compile_script(source, &meadow(), &mut TestDirectory::default()).expect("compile");
        assert_eq!(script.finale.next_script, Some(12));
        assert_eq!(script.finale.time, Some(TimeOfDay::Night));
        assert_eq!(script.finale.map.as_deref(), Some("cottage"));
        assert_eq!(
            script.finale.player,
            Some((GridPos::new(3, 1), Direction::Left))
        );
    }
}
