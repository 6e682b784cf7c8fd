//! Per-map record of consumed objects and helped NPCs, kept for the whole
//! session.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::document::MapObject;

/// Names of the objects already resolved on one map.
#[derive(Debug, Clone, Default)]
pub struct MapState {
    map_name: String,
    encountered: HashSet<String>,
    helped: HashSet<String>,
    relocations: HashMap<String, (f64, f64)>,
}

impl MapState {
    /// Empty state for `map_name`.
    pub fn new(map_name: impl Into<String>) -> Self {
        Self {
            map_name: map_name.into(),
            encountered: HashSet::new(),
            helped: HashSet::new(),
            relocations: HashMap::new(),
        }
    }

    /// Map this state belongs to.
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    /// Records `name`, ignoring case. Returns `false` if it was already there.
    pub fn add_encountered(&mut self, name: &str) -> bool {
        self.encountered.insert(name.to_lowercase())
    }

    /// Case-insensitive membership test.
    pub fn is_encountered(&self, name: &str) -> bool {
        self.encountered.contains(&name.to_lowercase())
    }

    /// Number of recorded names.
    pub fn len(&self) -> usize {
        self.encountered.len()
    }

    /// `true` when nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.encountered.is_empty()
    }

    /// Recorded names, lower-cased, in no particular order.
    pub fn encountered(&self) -> impl Iterator<Item = &str> {
        self.encountered.iter().map(String::as_str)
    }

    /// Records an NPC as helped, ignoring case.
    pub fn add_helped(&mut self, name: &str) -> bool {
        self.helped.insert(name.to_lowercase())
    }

    /// Case-insensitive helped test.
    pub fn is_helped(&self, name: &str) -> bool {
        self.helped.contains(&name.to_lowercase())
    }

    /// Remembers where an NPC's sprite was moved to.
    pub fn set_relocation(&mut self, name: &str, x: f64, y: f64) {
        self.relocations.insert(name.to_lowercase(), (x, y));
    }

    /// Saved sprite position of `name`.
    pub fn relocation(&self, name: &str) -> Option<(f64, f64)> {
        self.relocations.get(&name.to_lowercase()).copied()
    }

    /// Saved sprite positions, keyed by lower-cased name.
    pub fn relocations(&self) -> impl Iterator<Item = (&str, (f64, f64))> {
        self.relocations.iter().map(|(name, &pos)| (name.as_str(), pos))
    }

    /// Sets `helped` on every object recorded as helped.
    pub fn apply_helped(&self, objects: &mut [MapObject]) {
        for obj in objects.iter_mut().filter(|o| self.is_helped(&o.name)) {
            obj.helped = true;
        }
    }

    /// Drops every object whose name was recorded.
    pub fn retain_unencountered(&self, objects: &mut Vec<MapObject>) {
        let before = objects.len();
        objects.retain(|o| !self.is_encountered(&o.name));
        debug!(
            map = %self.map_name,
            removed = before - objects.len(),
            "encountered_objects_filtered"
        );
    }
}

/// Every map state of the session, keyed by map name.
#[derive(Debug, Default)]
pub struct MapStateRegistry {
    states: HashMap<String, MapState>,
}

impl MapStateRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `map_name`, created empty on first access.
    pub fn get(&mut self, map_name: &str) -> &mut MapState {
        self.states
            .entry(map_name.to_owned())
            .or_insert_with(|| MapState::new(map_name))
    }

    /// State for `map_name` if the map was ever loaded.
    pub fn peek(&self, map_name: &str) -> Option<&MapState> {
        self.states.get(map_name)
    }

    /// Number of maps seen.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// `true` before the first map load.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
