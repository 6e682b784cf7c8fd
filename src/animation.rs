//! Frame timelines for animated map objects.

use macroquad::prelude::Rect;
use tracing::debug;

use crate::config::AnimationConfig;
use crate::document::{Frame, MapObject, TilesetRef};
use crate::geometry::Aabb;
use crate::interaction::{classify, ObjectType};
use crate::map_state::MapState;
use crate::spatial::GID_MASK;

/// How a sprite is placed relative to its object rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteAnchor {
    /// Scaled to fill the rectangle.
    Stretch,
    /// Native tile size, bottom-left corner on the rectangle's.
    BottomLeft,
}

/// Draw order and placement of one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPolicy {
    /// Higher draws later.
    pub z: u8,
    /// Placement inside the object rectangle.
    pub anchor: SpriteAnchor,
}

/// Render category, fixed when the instance is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Decoration.
    Prop,
    /// Apples and other pickups.
    Collectible,
    /// Shop keepers.
    Shop,
    /// Friendly characters.
    Npc,
    /// Hostile characters.
    Enemy,
}

impl EntityKind {
    /// Kind of an object of the given type.
    pub fn of(kind: &ObjectType) -> Self {
        match kind {
            ObjectType::Enemy => EntityKind::Enemy,
            ObjectType::Npc => EntityKind::Npc,
            ObjectType::Shop => EntityKind::Shop,
            ObjectType::Apple | ObjectType::StudyStud => EntityKind::Collectible,
            _ => EntityKind::Prop,
        }
    }

    /// Render policy of this kind.
    pub const fn policy(self) -> RenderPolicy {
        match self {
            EntityKind::Prop => RenderPolicy { z: 0, anchor: SpriteAnchor::Stretch },
            EntityKind::Collectible => RenderPolicy { z: 1, anchor: SpriteAnchor::Stretch },
            EntityKind::Shop => RenderPolicy { z: 2, anchor: SpriteAnchor::BottomLeft },
            EntityKind::Npc => RenderPolicy { z: 3, anchor: SpriteAnchor::BottomLeft },
            EntityKind::Enemy => RenderPolicy { z: 3, anchor: SpriteAnchor::BottomLeft },
        }
    }

    /// Character kinds get a sprite-strip animation even without a tileset
    /// animation.
    pub fn is_character(self) -> bool {
        matches!(self, EntityKind::Enemy | EntityKind::Npc | EntityKind::Shop)
    }
}

/// One independent frame timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationInstance {
    /// Name of the object it was seeded from.
    pub name: String,
    /// Render category.
    pub kind: EntityKind,
    /// Frames with global tile ids.
    pub frames: Vec<Frame>,
    /// Index into `frames`.
    pub current: usize,
    /// Time of the last frame change.
    pub last_advance_ms: u64,
    /// World rectangle, copied from the object when seeded.
    pub bounds: Aabb,
    /// Defeated instances neither advance nor draw.
    pub defeated: bool,
}

impl AnimationInstance {
    /// Instance on its first frame.
    pub fn new(name: impl Into<String>, kind: EntityKind, frames: Vec<Frame>, bounds: Aabb) -> Self {
        Self {
            name: name.into(),
            kind,
            frames,
            current: 0,
            last_advance_ms: 0,
            bounds,
            defeated: false,
        }
    }

    /// Moves to the next frame once the current one has been shown for its
    /// duration. Calling again with the same `now_ms` changes nothing.
    pub fn advance(&mut self, now_ms: u64) {
        let Some(frame) = self.frames.get(self.current) else {
            return;
        };
        // Zero-length frames still last a millisecond.
        let duration = frame.duration_ms.max(1);
        if now_ms.saturating_sub(self.last_advance_ms) >= duration {
            self.current = (self.current + 1) % self.frames.len();
            self.last_advance_ms = now_ms;
        }
    }

    /// Global id of the frame on screen, `None` without frames.
    pub fn current_tile(&self) -> Option<u32> {
        self.frames.get(self.current).map(|f| f.tile_id)
    }

    /// Destination rectangle for a tile of the given size.
    pub fn dest_rect(&self, tile_w: f32, tile_h: f32) -> Rect {
        let r = self.bounds.to_rect();
        match self.kind.policy().anchor {
            SpriteAnchor::Stretch => r,
            SpriteAnchor::BottomLeft => Rect::new(r.x, r.y + r.h - tile_h, tile_w, tile_h),
        }
    }
}

fn tileset_for_gid(tilesets: &[TilesetRef], gid: u32) -> Option<&TilesetRef> {
    tilesets
        .iter()
        .take_while(|t| t.first_gid <= gid)
        .find(|t| t.contains(gid))
}

/// Frames of a sprite strip: the first tiles of the tileset, fixed duration.
pub fn sprite_strip(tileset: &TilesetRef, config: &AnimationConfig) -> Vec<Frame> {
    let len = config.strip_max_frames.min(tileset.tile_count);
    (0..len)
        .map(|i| Frame {
            tile_id: tileset.first_gid + i,
            duration_ms: config.strip_frame_ms,
        })
        .collect()
}

/// Every animation instance of the current map.
#[derive(Debug, Default)]
pub struct AnimationEngine {
    instances: Vec<AnimationInstance>,
}

impl AnimationEngine {
    /// Builds one instance per animatable object.
    ///
    /// Objects whose tile has a tileset animation play it. Characters and
    /// objects listed as perpetual play a sprite strip of their tileset.
    /// Objects already encountered get an instance that starts defeated.
    pub fn seed(
        objects: &[MapObject],
        tilesets: &[TilesetRef],
        state: &MapState,
        config: &AnimationConfig,
    ) -> Self {
        let mut instances = Vec::new();

        for obj in objects {
            let gid = obj.gid & GID_MASK;
            if gid == 0 {
                continue;
            }
            let Some(ts) = tileset_for_gid(tilesets, gid) else {
                continue;
            };

            let kind = EntityKind::of(&classify(obj));
            let frames = match ts.animation_for_gid(gid) {
                Some(def) => def.to_global(ts.first_gid),
                None if kind.is_character() || config.is_perpetual(obj.base_name()) => {
                    sprite_strip(ts, config)
                }
                None => continue,
            };
            if frames.is_empty() {
                continue;
            }

            let mut inst = AnimationInstance::new(obj.name.clone(), kind, frames, obj.bounds());
            inst.defeated = obj.defeated || state.is_encountered(&obj.name);
            debug!(
                object = %obj.name,
                gid,
                kind = ?kind,
                frames = inst.frames.len(),
                defeated = inst.defeated,
                "animation_seeded"
            );
            instances.push(inst);
        }

        AnimationEngine { instances }
    }

    /// Engine over prepared instances.
    pub fn from_instances(instances: Vec<AnimationInstance>) -> Self {
        AnimationEngine { instances }
    }

    /// Advances every live instance that overlaps `visible`.
    pub fn tick(&mut self, now_ms: u64, visible: &Aabb) {
        for inst in self.instances.iter_mut() {
            if !inst.defeated && inst.bounds.intersects(visible) {
                inst.advance(now_ms);
            }
        }
    }

    /// Instance by object name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&AnimationInstance> {
        self.instances
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut AnimationInstance> {
        self.instances
            .iter_mut()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Stops drawing and advancing `name`. Returns `false` if unknown.
    pub fn mark_defeated(&mut self, name: &str) -> bool {
        match self.find_mut(name) {
            Some(inst) => {
                inst.defeated = true;
                true
            }
            None => false,
        }
    }

    /// Moves `name` so its top-left corner is at `(x, y)`.
    pub fn relocate(&mut self, name: &str, x: f64, y: f64) -> bool {
        match self.find_mut(name) {
            Some(inst) => {
                inst.bounds.x = x;
                inst.bounds.y = y;
                true
            }
            None => false,
        }
    }

    /// Live instances, lowest z first, seed order within a z.
    pub fn draw_order(&self) -> Vec<&AnimationInstance> {
        let mut live: Vec<_> = self.instances.iter().filter(|i| !i.defeated).collect();
        live.sort_by_key(|i| i.kind.policy().z);
        live
    }

    /// All instances, defeated ones included.
    pub fn iter(&self) -> impl Iterator<Item = &AnimationInstance> {
        self.instances.iter()
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// `true` when nothing animates.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AnimationDef, Properties, PropertyValue};

    fn frames(ids: &[u32], ms: u64) -> Vec<Frame> {
        ids.iter()
            .map(|&tile_id| Frame {
                tile_id,
                duration_ms: ms,
            })
            .collect()
    }

    fn critters() -> TilesetRef {
        let mut ts = TilesetRef {
            name: "critters".into(),
            first_gid: 10,
            tile_count: 20,
            columns: 4,
            tile_w: 16,
            tile_h: 16,
            ..Default::default()
        };
        ts.animations.insert(
            2,
            AnimationDef {
                frames: frames(&[2, 3], 150),
            },
        );
        ts
    }

    fn object(name: &str, gid: u32, kind: Option<&str>) -> MapObject {
        let mut properties = Properties::new();
        if let Some(k) = kind {
            properties.push("type", None, PropertyValue::String(k.into()));
        }
        MapObject {
            name: name.into(),
            gid,
            x: 0.0,
            y: 0.0,
            width: 16.0,
            height: 16.0,
            properties,
            ..Default::default()
        }
    }

    #[test]
    fn advance_waits_for_frame_duration() {
        let mut a = AnimationInstance::new("a", EntityKind::Prop, frames(&[1, 2, 3], 100), Aabb::default());
        a.advance(99);
        assert_eq!(a.current_tile(), Some(1));
        a.advance(100);
        assert_eq!(a.current_tile(), Some(2));
        a.advance(100);
        assert_eq!(a.current_tile(), Some(2));
        a.advance(200);
        a.advance(300);
        assert_eq!(a.current_tile(), Some(1));
    }

    #[test]
    fn empty_instance_has_no_tile() {
        let mut a = AnimationInstance::new("a", EntityKind::Prop, Vec::new(), Aabb::default());
        a.advance(1_000);
        assert_eq!(a.current_tile(), None);
    }

    #[test]
    fn seed_uses_tileset_animation_then_sprite_strip() {
        let objects = [
            object("torch", 12, None),
            object("goblin", 15, Some("enemy")),
            object("rock", 15, None),
            object("butterfly", 16, None),
        ];
        let mut config = AnimationConfig::default();
        config.perpetual.push("Butterfly".into());

        let engine = AnimationEngine::seed(&objects, &[critters()], &MapState::new("m"), &config);

        assert_eq!(engine.len(), 3);
        let torch = engine.find("TORCH").expect("torch");
        assert_eq!(torch.frames, frames(&[12, 13], 150));
        assert_eq!(torch.kind, EntityKind::Prop);

        let goblin = engine.find("goblin").expect("goblin");
        assert_eq!(goblin.kind, EntityKind::Enemy);
        assert_eq!(goblin.frames.len(), 16);
        assert_eq!(goblin.frames[0], Frame { tile_id: 10, duration_ms: 300 });

        assert!(engine.find("rock").is_none());
        assert!(engine.find("butterfly").is_some());
    }

    #[test]
    fn encountered_objects_seed_defeated() {
        let mut state = MapState::new("m");
        state.add_encountered("goblin");
        let engine = AnimationEngine::seed(
            &[object("goblin", 15, Some("enemy"))],
            &[critters()],
            &state,
            &AnimationConfig::default(),
        );
        assert!(engine.find("goblin").expect("goblin").defeated);
        assert!(engine.draw_order().is_empty());
    }

    #[test]
    fn tick_only_advances_visible_live_instances() {
        let f = frames(&[1, 2], 10);
        let mut near = AnimationInstance::new("near", EntityKind::Prop, f.clone(), Aabb::new(0.0, 0.0, 16.0, 16.0));
        let far = AnimationInstance::new("far", EntityKind::Prop, f.clone(), Aabb::new(500.0, 0.0, 16.0, 16.0));
        let mut dead = AnimationInstance::new("dead", EntityKind::Prop, f, Aabb::new(0.0, 0.0, 16.0, 16.0));
        dead.defeated = true;
        near.current = 0;

        let mut engine = AnimationEngine::from_instances(vec![near, far, dead]);
        engine.tick(10, &Aabb::new(0.0, 0.0, 100.0, 100.0));

        assert_eq!(engine.find("near").and_then(|i| i.current_tile()), Some(2));
        assert_eq!(engine.find("far").and_then(|i| i.current_tile()), Some(1));
        assert_eq!(engine.find("dead").and_then(|i| i.current_tile()), Some(1));
    }

    #[test]
    fn draw_order_follows_kind_z() {
        let f = frames(&[1], 10);
        let engine = AnimationEngine::from_instances(vec![
            AnimationInstance::new("enemy", EntityKind::Enemy, f.clone(), Aabb::default()),
            AnimationInstance::new("prop", EntityKind::Prop, f.clone(), Aabb::default()),
            AnimationInstance::new("apple", EntityKind::Collectible, f, Aabb::default()),
        ]);
        let names: Vec<_> = engine.draw_order().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["prop", "apple", "enemy"]);
    }

    #[test]
    fn relocate_and_anchor() {
        let mut engine = AnimationEngine::from_instances(vec![AnimationInstance::new(
            "elder",
            EntityKind::Npc,
            frames(&[1], 10),
            Aabb::new(0.0, 0.0, 32.0, 48.0),
        )]);
        assert!(engine.relocate("Elder", 100.0, 50.0));
        assert!(!engine.relocate("nobody", 0.0, 0.0));

        let elder = engine.find("elder").expect("elder");
        assert_eq!(elder.dest_rect(16.0, 16.0), Rect::new(100.0, 82.0, 16.0, 16.0));
    }
}
