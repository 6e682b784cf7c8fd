//! Session state: the current map plus everything that outlives it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use macroquad::prelude::Image;
use tracing::{error, info};

use crate::actor::Actor;
use crate::animation::AnimationEngine;
use crate::atlas::TileAtlas;
use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::document::{MapDocument, MapObject};
use crate::interaction::{InteractionResolver, InteractionResult};
use crate::loader::load_map_document;
use crate::map_state::{MapState, MapStateRegistry};
use crate::spatial::SceneIndex;

const MAP_EXTENSIONS: [&str; 3] = ["tmx", "json", "tmj"];

/// Path of `map_name` under `root`. Names without a map extension (or with a
/// foreign one, like `town.map`) resolve to the first existing `.tmx` or
/// `.json` sibling.
pub fn resolve_map_path(root: &Path, map_name: &str) -> PathBuf {
    let direct = root.join(map_name);
    let known = direct
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MAP_EXTENSIONS.contains(&e));
    if known {
        return direct;
    }
    MAP_EXTENSIONS
        .iter()
        .map(|ext| direct.with_extension(ext))
        .find(|p| p.is_file())
        .unwrap_or(direct)
}

/// Everything built from one map file.
struct LoadedMap {
    key: String,
    document: MapDocument,
    atlas: TileAtlas,
    scene: SceneIndex,
    animations: AnimationEngine,
    resolver: InteractionResolver,
}

impl LoadedMap {
    fn open(config: &EngineConfig, states: &mut MapStateRegistry, map_name: &str) -> anyhow::Result<Self> {
        let path = resolve_map_path(&config.asset_root, map_name);
        let key = path
            .strip_prefix(&config.asset_root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();

        let mut document =
            load_map_document(&path).with_context(|| format!("Loading map {}", path.display()))?;
        let map_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let state = states.get(&key);
        let mut animations =
            AnimationEngine::seed(&document.objects, &document.tilesets, state, &config.animation);
        for (name, (x, y)) in state.relocations() {
            animations.relocate(name, x, y);
        }

        let mut objects = std::mem::take(&mut document.objects);
        state.retain_unencountered(&mut objects);
        state.apply_helped(&mut objects);

        let atlas = TileAtlas::load(&document, map_dir);
        let scene = SceneIndex::from_document(&document);
        let resolver = InteractionResolver::new(objects, config.interaction.clone());

        info!(
            map = %key,
            tiles = scene.len(),
            objects = resolver.objects().len(),
            animations = animations.len(),
            encountered = state.len(),
            "map_loaded"
        );

        Ok(LoadedMap {
            key,
            document,
            atlas,
            scene,
            animations,
            resolver,
        })
    }
}

/// The running game world.
pub struct World {
    config: EngineConfig,
    map: LoadedMap,
    states: MapStateRegistry,
    camera: Camera,
    last_safe: Option<(f64, f64)>,
}

impl World {
    /// Loads the first map.
    pub fn load(config: EngineConfig, map_name: &str) -> anyhow::Result<Self> {
        let mut states = MapStateRegistry::new();
        let map = LoadedMap::open(&config, &mut states, map_name)?;
        let camera = Camera::from_config(&config.camera);
        Ok(World {
            config,
            map,
            states,
            camera,
            last_safe: None,
        })
    }

    /// Replaces the current map, reusing its saved state, and moves the actor
    /// to `spawn` if given. On failure the current map stays.
    pub fn load_map(&mut self, map_name: &str, actor: &mut Actor, spawn: Option<(i32, i32)>) -> anyhow::Result<()> {
        let map = LoadedMap::open(&self.config, &mut self.states, map_name)?;
        info!(from = %self.map.key, to = %map.key, spawn = ?spawn, "map_transition");
        self.map = map;

        if let Some((x, y)) = spawn {
            actor.set_position(x as f64, y as f64);
        }
        self.last_safe = Some((actor.x, actor.y));
        self.update_camera(actor);
        Ok(())
    }

    /// Moves the actor and records the spot as safe.
    pub fn place_actor(&mut self, actor: &mut Actor, x: f64, y: f64) {
        actor.set_position(x, y);
        self.last_safe = Some((x, y));
        self.update_camera(actor);
    }

    /// One frame of game logic.
    ///
    /// A wall hit moves the actor back to its last safe position before the
    /// interaction pass runs. A transition loads the destination map; if that
    /// fails the error is returned and the current map stays.
    pub fn tick(&mut self, actor: &mut Actor, now_ms: u64) -> anyhow::Result<InteractionResult> {
        let state = self.states.get(&self.map.key);

        let hit_wall = self.map.resolver.collides_with_wall(&actor.bounds(), state);
        if hit_wall {
            if let Some((x, y)) = self.last_safe {
                actor.set_position(x, y);
            }
        } else {
            self.last_safe = Some((actor.x, actor.y));
        }

        let mut result = self.map.resolver.check(actor, state);
        result.wall_collision |= hit_wall;
        for name in &result.collected {
            self.map.animations.mark_defeated(name);
        }

        if let Some(t) = &result.transition {
            if let Err(err) = self.load_map(&t.destination_map, actor, Some((t.spawn_x, t.spawn_y))) {
                error!(destination = %t.destination_map, error = %err, "map_transition_failed");
                return Err(err);
            }
        }

        self.update_camera(actor);
        let visible = self.camera.visible_bounds();
        self.map.animations.tick(now_ms, &visible);

        Ok(result)
    }

    fn update_camera(&mut self, actor: &Actor) {
        self.camera.update(
            actor.x as f32,
            actor.y as f32,
            self.map.document.pixel_width(),
            self.map.document.pixel_height(),
        );
    }

    /// Records `name` as resolved on the current map; it stops colliding and
    /// drawing, also after the map is reloaded.
    pub fn mark_object_as_encountered(&mut self, name: &str) {
        let state = self.states.get(&self.map.key);
        self.map.resolver.mark_object_as_encountered(name, state);
        self.map.animations.mark_defeated(name);
    }

    /// Releases the enemy, NPC and shop locks.
    pub fn reset_interaction_state(&mut self) {
        self.map.resolver.reset_interaction_state();
    }

    /// Replaces the live object list.
    pub fn update_objects(&mut self, objects: Vec<MapObject>) {
        self.map.resolver.update_objects(objects);
    }

    /// Flags an NPC as helped and optionally moves its sprite. Both are
    /// recorded in the map state and reapplied when the map is reloaded.
    pub fn mark_npc_helped(&mut self, name: &str, relocate_to: Option<(f64, f64)>) -> bool {
        let found = self.map.resolver.mark_helped(name);
        let state = self.states.get(&self.map.key);
        if found {
            state.add_helped(name);
        }
        if let Some((x, y)) = relocate_to {
            if self.map.animations.relocate(name, x, y) {
                state.set_relocation(name, x, y);
            }
        }
        found
    }

    /// Pixels of the frame `name` currently shows.
    pub fn animation_frame(&self, name: &str) -> Option<Image> {
        let tile = self.map.animations.find(name)?.current_tile()?;
        self.map.atlas.tile_image(tile)
    }

    /// Key of the current map in the state registry.
    pub fn map_name(&self) -> &str {
        &self.map.key
    }

    /// Parsed current map; its object list is empty, see [`objects`](Self::objects).
    pub fn document(&self) -> &MapDocument {
        &self.map.document
    }

    /// Live objects of the current map.
    pub fn objects(&self) -> &[MapObject] {
        self.map.resolver.objects()
    }

    /// Collision resolver of the current map.
    pub fn resolver(&self) -> &InteractionResolver {
        &self.map.resolver
    }

    /// Tile atlas of the current map.
    pub fn atlas(&self) -> &TileAtlas {
        &self.map.atlas
    }

    /// Static tiles of the current map.
    pub fn scene(&self) -> &SceneIndex {
        &self.map.scene
    }

    /// Animations of the current map.
    pub fn animations(&self) -> &AnimationEngine {
        &self.map.animations
    }

    /// Camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Camera, for zoom changes.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Saved state of `map_name`, if that map was loaded.
    pub fn map_state(&self, map_name: &str) -> Option<&MapState> {
        self.states.peek(map_name)
    }

    /// Saved state of the current map.
    pub fn current_map_state(&self) -> Option<&MapState> {
        self.states.peek(&self.map.key)
    }

    /// Configuration the world was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
