//! In-memory collaborators
//!
//! Plain recording implementations of the host traits, used throughout the
//! test suites and handy for downstream smoke tests: every request the
//! engine makes is written down where an assertion can read it, and the
//! polled conditions (dialogue visibility, route progress) are plain
//! fields a test can flip between ticks.

use std::collections::{HashMap, HashSet};

use skit_grid::{CollisionGrid, GridPos, Path};
use uuid::Uuid;

use crate::actor::{Direction, TimeOfDay};
use crate::host::{ActorDirectory, MapCatalog, MovementHost, PresentationHost, WorldHost};

/// One puppet actor driven through [`TestActors`].
#[derive(Debug, Clone, Default)]
pub struct TestActor {
    pub position: GridPos,
    pub facing: Direction,
    pub speed: u32,
    pub route: Option<Path>,
    pub route_step: usize,
    pub advances: u32,
    pub rotations: u32,
}

/// Movement host over a bag of puppet actors.
#[derive(Debug, Default)]
pub struct TestActors {
    pub actors: HashMap<Uuid, TestActor>,
}

impl TestActors {
    pub fn insert(&mut self, position: GridPos, facing: Direction) -> Uuid {
        let id = Uuid::new_v4();
        self.insert_with_id(id, position, facing);
        id
    }

    pub fn insert_with_id(&mut self, id: Uuid, position: GridPos, facing: Direction) {
        self.actors.insert(id, TestActor {
            position,
            facing,
            ..TestActor::default()
        });
    }

    pub fn actor(&self, id: Uuid) -> &TestActor {
        self.actors.get(&id).expect("unknown actor handle")
    }

    fn actor_mut(&mut self, id: Uuid) -> &mut TestActor {
        self.actors.get_mut(&id).expect("unknown actor handle")
    }
}

impl MovementHost for TestActors {
    fn position(&self, actor: Uuid) -> GridPos {
        self.actor(actor).position
    }

    fn set_position(&mut self, actor: Uuid, position: GridPos) {
        self.actor_mut(actor).position = position;
    }

    fn speed(&self, actor: Uuid) -> u32 {
        self.actor(actor).speed
    }

    fn set_speed(&mut self, actor: Uuid, speed: u32) {
        self.actor_mut(actor).speed = speed;
    }

    fn rotate(&mut self, actor: Uuid, facing: Direction) {
        let puppet = self.actor_mut(actor);
        puppet.facing = facing;
        puppet.rotations += 1;
    }

    fn assign_path(&mut self, actor: Uuid, route: Path) {
        let puppet = self.actor_mut(actor);
        puppet.route = Some(route);
        puppet.route_step = 0;
    }

    fn advance_along_path(&mut self, actor: Uuid) {
        let puppet = self.actor_mut(actor);
        if let Some(route) = &puppet.route {
            if route.is_empty() {
                return;
            }
            puppet.route_step = (puppet.route_step + 1).min(route.len() - 1);
            if let Some(cell) = route.get(puppet.route_step) {
                puppet.position = cell;
            }
            puppet.advances += 1;
        }
    }

    fn at_goal(&self, actor: Uuid) -> bool {
        match &self.actor(actor).route {
            Some(route) => route.len() <= 1 || self.actor(actor).route_step == route.len() - 1,
            None => true,
        }
    }
}

/// Recording presentation host.
#[derive(Debug, Default)]
pub struct TestStage {
    pub dialogue_open: bool,
    pub dialogue_log: Vec<(Option<Uuid>, String)>,
    pub loading: bool,
    pub loading_changes: Vec<bool>,
    pub jingles: Vec<String>,
    pub emotes: HashMap<Uuid, String>,
    pub overlay: bool,
    pub overlay_changes: Vec<bool>,
    pub indicator_restores: u32,
    pub time_transitions: Vec<(TimeOfDay, TimeOfDay)>,
}

impl PresentationHost for TestStage {
    fn show_dialogue(&mut self, speaker: Option<Uuid>, message: &str) {
        self.dialogue_open = true;
        self.dialogue_log.push((speaker, message.to_string()));
    }

    fn dialogue_visible(&self) -> bool {
        self.dialogue_open
    }

    fn set_loading(&mut self, show: bool) {
        self.loading = show;
        self.loading_changes.push(show);
    }

    fn play_jingle(&mut self, cue: &str) {
        self.jingles.push(cue.to_string());
    }

    fn show_emote(&mut self, actor: Uuid, tag: &str) {
        self.emotes.insert(actor, tag.to_string());
    }

    fn emote_visible(&self, actor: Uuid) -> bool {
        self.emotes.contains_key(&actor)
    }

    fn clear_emote(&mut self, actor: Uuid) {
        self.emotes.remove(&actor);
    }

    fn set_overlay(&mut self, visible: bool) {
        self.overlay = visible;
        self.overlay_changes.push(visible);
    }

    fn restore_speed_indicator(&mut self) {
        self.indicator_restores += 1;
    }

    fn time_transition(&mut self, from: TimeOfDay, to: TimeOfDay) {
        self.time_transitions.push((from, to));
    }
}

/// Recording world host.
#[derive(Debug, Default)]
pub struct TestWorld {
    pub time: TimeOfDay,
    pub loaded_maps: Vec<String>,
    pub reloads: u32,
    pub theme_requests: u32,
    pub granted_items: Vec<(String, u32)>,
    pub flags: HashMap<String, bool>,
    pub player_releases: u32,
}

impl WorldHost for TestWorld {
    fn time_of_day(&self) -> TimeOfDay {
        self.time
    }

    fn set_time_of_day(&mut self, time: TimeOfDay) {
        self.time = time;
    }

    fn load_map(&mut self, map_name: &str) {
        self.loaded_maps.push(map_name.to_string());
    }

    fn reload_map(&mut self) {
        self.reloads += 1;
    }

    fn play_map_theme(&mut self) {
        self.theme_requests += 1;
    }

    fn give_item(&mut self, item: &str, amount: u32) {
        self.granted_items.push((item.to_string(), amount));
    }

    fn set_flag(&mut self, flag: &str, value: bool) {
        self.flags.insert(flag.to_string(), value);
    }

    fn flag(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }

    fn release_player(&mut self) {
        self.player_releases += 1;
    }
}

/// A spawn the directory performed during compilation.
#[derive(Debug, Clone)]
pub struct SpawnRecord {
    pub role: String,
    pub variant: Option<u32>,
    pub id: Uuid,
    pub spawn: GridPos,
    pub facing: Direction,
}

/// Directory that spawns a fresh handle per role, except roles in `deny`.
#[derive(Debug, Default)]
pub struct TestDirectory {
    pub spawned: Vec<SpawnRecord>,
    pub deny: HashSet<String>,
}

impl TestDirectory {
    pub fn deny_role(&mut self, role: &str) {
        self.deny.insert(role.to_string());
    }

    pub fn id_for(&self, role: &str) -> Option<Uuid> {
        self.spawned
            .iter()
            .find(|record| record.role == role)
            .map(|record| record.id)
    }

    /// Build a movement host with every spawned actor standing on its
    /// spawn cell.
    pub fn stage_actors(&self) -> TestActors {
        let mut actors = TestActors::default();
        for record in &self.spawned {
            actors.insert_with_id(record.id, record.spawn, record.facing);
        }
        actors
    }
}

impl ActorDirectory for TestDirectory {
    fn spawn(
        &mut self,
        role: &str,
        variant: Option<u32>,
        spawn: GridPos,
        facing: Direction,
    ) -> Option<Uuid> {
        if self.deny.contains(role) {
            return None;
        }
        let id = Uuid::new_v4();
        self.spawned.push(SpawnRecord {
            role: role.to_string(),
            variant,
            id,
            spawn,
            facing,
        });
        Some(id)
    }
}

/// Map catalog over an in-memory grid table.
#[derive(Debug, Default)]
pub struct TestCatalog {
    pub grids: HashMap<String, CollisionGrid>,
}

impl TestCatalog {
    pub fn with_map(map_name: &str, grid: CollisionGrid) -> Self {
        let mut catalog = Self::default();
        catalog.insert(map_name, grid);
        catalog
    }

    pub fn insert(&mut self, map_name: &str, grid: CollisionGrid) {
        self.grids.insert(map_name.to_string(), grid);
    }
}

impl MapCatalog for TestCatalog {
    fn collision_grid(&self, map_name: &str) -> Option<&CollisionGrid> {
        self.grids.get(map_name)
    }
}
