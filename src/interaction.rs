//! Actor versus map object collision and dispatch.

use tracing::{debug, info, warn};

use crate::actor::Actor;
use crate::config::InteractionConfig;
use crate::document::{MapObject, PropertyValue};
use crate::geometry::Aabb;
use crate::map_state::MapState;

/// Item added to the inventory by a `study_stud` pickup.
pub const STUDY_STUD_ITEM: &str = "study_stud";

/// What an object is, decided from its properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectType {
    /// Blocks movement.
    Wall,
    /// Starts a fight.
    Enemy,
    /// Starts a conversation.
    Npc,
    /// Opens a shop.
    Shop,
    /// Moves the actor to another map.
    Transition,
    /// Heals on pickup.
    Apple,
    /// Inventory pickup.
    StudyStud,
    /// Typed, but nothing reacts to it.
    Other(String),
    /// No type information.
    Unknown,
}

impl ObjectType {
    /// Maps a type name, ignoring case.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "wall" => ObjectType::Wall,
            "enemy" => ObjectType::Enemy,
            "npc" => ObjectType::Npc,
            "shop" => ObjectType::Shop,
            "transition" => ObjectType::Transition,
            "apple" => ObjectType::Apple,
            "study_stud" => ObjectType::StudyStud,
            other => ObjectType::Other(other.to_owned()),
        }
    }

    /// Walls, enemies, NPCs, shops, transitions and pickups.
    pub fn is_interactive(&self) -> bool {
        !matches!(self, ObjectType::Other(_) | ObjectType::Unknown)
    }
}

/// Classifies by the first `is_<type>` property set to true or the first
/// `type` property, whichever comes first. Untyped objects named `wall` are
/// walls.
pub fn classify(obj: &MapObject) -> ObjectType {
    for p in obj.properties.iter() {
        if p.name.eq_ignore_ascii_case("type") {
            if let PropertyValue::String(s) = &p.value {
                return ObjectType::from_name(s);
            }
            continue;
        }
        let lower = p.name.to_ascii_lowercase();
        if let Some(kind) = lower.strip_prefix("is_") {
            if p.value.as_bool() == Some(true) {
                return ObjectType::from_name(kind);
            }
        }
    }

    if obj.base_name().eq_ignore_ascii_case("wall") {
        ObjectType::Wall
    } else {
        ObjectType::Unknown
    }
}

/// Destination of a transition object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Map name, resolved by the caller.
    pub destination_map: String,
    /// Spawn x in world pixels.
    pub spawn_x: i32,
    /// Spawn y in world pixels.
    pub spawn_y: i32,
}

impl Transition {
    /// Reads `destinationMap`, `spawnX` and `spawnY`. Spawn coordinates that
    /// are missing or not numeric become 0.
    pub fn from_object(obj: &MapObject) -> Option<Self> {
        let props = &obj.properties;
        let destination_map = props.get("destinationMap").and_then(|v| match v {
            PropertyValue::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        });
        let Some(destination_map) = destination_map else {
            warn!(object = %obj.name, "transition_without_destination");
            return None;
        };
        Some(Transition {
            destination_map,
            spawn_x: props.get_i32("spawnX").unwrap_or(0),
            spawn_y: props.get_i32("spawnY").unwrap_or(0),
        })
    }
}

/// Everything one collision pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionResult {
    /// The actor overlaps a wall.
    pub wall_collision: bool,
    /// Enemy encountered in this pass.
    pub enemy: Option<String>,
    /// NPC encountered in this pass.
    pub npc: Option<String>,
    /// Shop encountered in this pass.
    pub shop: Option<String>,
    /// First transition touched.
    pub transition: Option<Transition>,
    /// Names of the objects picked up, in object order.
    pub collected: Vec<String>,
}

impl InteractionResult {
    /// Nothing happened.
    pub fn is_empty(&self) -> bool {
        *self == InteractionResult::default()
    }
}

/// Collision box of an object: the full rectangle for walls, a shrunk
/// centred box for everything else.
pub fn hitbox(obj: &MapObject, kind: &ObjectType, shrink: f64) -> Aabb {
    match kind {
        ObjectType::Wall => obj.bounds(),
        _ => obj.bounds().shrunk(shrink),
    }
}

/// Owns the live object list of the current map and runs the collision pass.
#[derive(Debug, Default)]
pub struct InteractionResolver {
    objects: Vec<MapObject>,
    config: InteractionConfig,
    enemy_locked: bool,
    npc_locked: bool,
    shop_locked: bool,
    last_enemy: Option<String>,
    last_npc: Option<String>,
    last_shop: Option<String>,
}

impl InteractionResolver {
    /// Resolver over `objects`, all locks released.
    pub fn new(objects: Vec<MapObject>, config: InteractionConfig) -> Self {
        Self {
            objects,
            config,
            ..Default::default()
        }
    }

    /// `true` if the actor overlaps any live wall.
    pub fn collides_with_wall(&self, actor: &Aabb, state: &MapState) -> bool {
        self.objects.iter().any(|obj| {
            !obj.defeated
                && classify(obj) == ObjectType::Wall
                && !state.is_encountered(&obj.name)
                && obj.bounds().intersects(actor)
        })
    }

    /// One collision pass. Pickups change the actor and `state` and leave the
    /// live list; encounters are reported once until
    /// [`reset_interaction_state`](Self::reset_interaction_state).
    pub fn check(&mut self, actor: &mut Actor, state: &mut MapState) -> InteractionResult {
        let actor_box = actor.bounds();
        let mut result = InteractionResult::default();
        let mut consumed = Vec::new();

        for (i, obj) in self.objects.iter().enumerate() {
            if obj.defeated || state.is_encountered(&obj.name) {
                continue;
            }
            let kind = classify(obj);
            if !kind.is_interactive() || !hitbox(obj, &kind, self.config.hitbox_shrink).intersects(&actor_box) {
                continue;
            }

            match kind {
                ObjectType::Wall => result.wall_collision = true,
                ObjectType::Enemy if !self.enemy_locked => {
                    self.enemy_locked = true;
                    self.last_enemy = Some(obj.name.clone());
                    result.enemy = Some(obj.name.clone());
                    info!(enemy = %obj.name, "enemy_encountered");
                }
                ObjectType::Npc if !self.npc_locked => {
                    self.npc_locked = true;
                    self.last_npc = Some(obj.name.clone());
                    result.npc = Some(obj.name.clone());
                    info!(npc = %obj.name, helped = obj.helped, "npc_encountered");
                }
                ObjectType::Shop if !self.shop_locked => {
                    self.shop_locked = true;
                    self.last_shop = Some(obj.name.clone());
                    result.shop = Some(obj.name.clone());
                    info!(shop = %obj.name, "shop_encountered");
                }
                ObjectType::Transition if result.transition.is_none() => {
                    result.transition = Transition::from_object(obj);
                }
                ObjectType::Apple => {
                    let heal = obj
                        .properties
                        .get_i32("heal")
                        .unwrap_or(self.config.apple_heal);
                    actor.add_health(heal);
                    state.add_encountered(&obj.name);
                    result.collected.push(obj.name.clone());
                    consumed.push(i);
                    debug!(object = %obj.name, heal, health = actor.health, "apple_collected");
                }
                ObjectType::StudyStud => {
                    actor.add_item(STUDY_STUD_ITEM, 1);
                    state.add_encountered(&obj.name);
                    result.collected.push(obj.name.clone());
                    consumed.push(i);
                    debug!(object = %obj.name, "study_stud_collected");
                }
                _ => {}
            }
        }

        for i in consumed.into_iter().rev() {
            self.objects.remove(i);
        }

        result
    }

    /// Records `name` as resolved and removes it from the live list.
    pub fn mark_object_as_encountered(&mut self, name: &str, state: &mut MapState) {
        state.add_encountered(name);
        self.objects.retain(|o| !o.name.eq_ignore_ascii_case(name));
        debug!(object = %name, map = %state.map_name(), "object_encountered");
    }

    /// Flags an NPC as helped. Returns `false` if no such object is live.
    pub fn mark_helped(&mut self, name: &str) -> bool {
        match self
            .objects
            .iter_mut()
            .find(|o| o.name.eq_ignore_ascii_case(name))
        {
            Some(obj) => {
                obj.helped = true;
                true
            }
            None => false,
        }
    }

    /// Releases the enemy, NPC and shop locks.
    pub fn reset_interaction_state(&mut self) {
        self.enemy_locked = false;
        self.npc_locked = false;
        self.shop_locked = false;
    }

    /// Replaces the live object list. Locks are kept.
    pub fn update_objects(&mut self, objects: Vec<MapObject>) {
        self.objects = objects;
    }

    /// Live objects.
    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    /// Most recent enemy encounter.
    pub fn last_enemy(&self) -> Option<&str> {
        self.last_enemy.as_deref()
    }

    /// Most recent NPC encounter.
    pub fn last_npc(&self) -> Option<&str> {
        self.last_npc.as_deref()
    }

    /// Most recent shop encounter.
    pub fn last_shop(&self) -> Option<&str> {
        self.last_shop.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Properties;

    fn object(name: &str, x: f64, y: f64, size: f64, props: &[(&str, PropertyValue)]) -> MapObject {
        let mut properties = Properties::new();
        for (k, v) in props {
            properties.push(*k, None, v.clone());
        }
        MapObject {
            name: name.into(),
            x,
            y,
            width: size,
            height: size,
            properties,
            ..Default::default()
        }
    }

    fn typed(name: &str, kind: &str, x: f64, y: f64, size: f64) -> MapObject {
        object(name, x, y, size, &[("type", PropertyValue::String(kind.into()))])
    }

    #[test]
    fn classify_prefers_first_matching_property() {
        let o = object(
            "thing",
            0.0,
            0.0,
            8.0,
            &[
                ("is_enemy", PropertyValue::Bool(false)),
                ("is_npc", PropertyValue::String("true".into())),
                ("type", PropertyValue::String("shop".into())),
            ],
        );
        assert_eq!(classify(&o), ObjectType::Npc);
        assert_eq!(classify(&object("Wall_3", 0.0, 0.0, 8.0, &[])), ObjectType::Wall);
        assert_eq!(classify(&object("rock", 0.0, 0.0, 8.0, &[])), ObjectType::Unknown);
        assert_eq!(
            classify(&typed("sign", "Sign", 0.0, 0.0, 8.0)),
            ObjectType::Other("sign".into())
        );
    }

    #[test]
    fn wall_overlap_sets_only_the_wall_flag() {
        let mut r = InteractionResolver::new(
            vec![typed("wall", "wall", 32.0, 32.0, 64.0)],
            InteractionConfig::default(),
        );
        let mut actor = Actor::new(40.0, 40.0, 32.0, 32.0);
        let mut state = MapState::new("m");

        let result = r.check(&mut actor, &mut state);
        assert!(result.wall_collision);
        assert_eq!(
            InteractionResult {
                wall_collision: false,
                ..result
            },
            InteractionResult::default()
        );
        assert!(r.collides_with_wall(&actor.bounds(), &state));
    }

    #[test]
    fn non_wall_objects_use_the_shrunk_hitbox() {
        // 64x64 enemy at 0,0 collides through 24..40 on both axes.
        let mut r = InteractionResolver::new(
            vec![typed("goblin", "enemy", 0.0, 0.0, 64.0)],
            InteractionConfig::default(),
        );
        let mut state = MapState::new("m");

        let mut edge = Actor::new(0.0, 0.0, 20.0, 20.0);
        assert!(r.check(&mut edge, &mut state).enemy.is_none());

        let mut centre = Actor::new(30.0, 30.0, 4.0, 4.0);
        assert_eq!(r.check(&mut centre, &mut state).enemy.as_deref(), Some("goblin"));
    }

    #[test]
    fn apple_heals_and_leaves_the_map() {
        let mut r = InteractionResolver::new(
            vec![typed("apple", "apple", 0.0, 0.0, 16.0), typed("apple_1", "apple", 200.0, 0.0, 16.0)],
            InteractionConfig::default(),
        );
        let mut actor = Actor::new(4.0, 4.0, 8.0, 8.0);
        actor.health = 50;
        let mut state = MapState::new("m");

        let result = r.check(&mut actor, &mut state);
        assert_eq!(result.collected, ["apple"]);
        assert_eq!(actor.health, 60);
        assert!(state.is_encountered("APPLE"));
        assert_eq!(r.objects().len(), 1);
        assert_eq!(r.objects()[0].name, "apple_1");

        // Nothing left to pick up at this spot.
        assert!(r.check(&mut actor, &mut state).is_empty());
        assert_eq!(actor.health, 60);
    }

    #[test]
    fn apple_heal_property_overrides_default_and_caps() {
        let mut apple = typed("apple", "apple", 0.0, 0.0, 16.0);
        apple.properties.push("heal", Some("int".into()), PropertyValue::I64(25));
        let mut r = InteractionResolver::new(vec![apple], InteractionConfig::default());
        let mut actor = Actor::new(4.0, 4.0, 8.0, 8.0);
        actor.health = 90;
        let mut state = MapState::new("m");

        r.check(&mut actor, &mut state);
        assert_eq!(actor.health, 100);
    }

    #[test]
    fn study_stud_goes_to_inventory() {
        let mut r = InteractionResolver::new(
            vec![typed("stud", "study_stud", 0.0, 0.0, 16.0)],
            InteractionConfig::default(),
        );
        let mut actor = Actor::new(4.0, 4.0, 8.0, 8.0);
        let mut state = MapState::new("m");

        let result = r.check(&mut actor, &mut state);
        assert_eq!(result.collected, ["stud"]);
        assert_eq!(actor.item_count(STUDY_STUD_ITEM), 1);
        assert!(r.objects().is_empty());
    }

    #[test]
    fn encounters_stay_locked_until_reset() {
        let mut r = InteractionResolver::new(
            vec![
                typed("goblin", "enemy", 0.0, 0.0, 16.0),
                typed("baker", "shop", 0.0, 0.0, 16.0),
            ],
            InteractionConfig::default(),
        );
        let mut actor = Actor::new(4.0, 4.0, 8.0, 8.0);
        let mut state = MapState::new("m");

        let first = r.check(&mut actor, &mut state);
        assert_eq!(first.enemy.as_deref(), Some("goblin"));
        assert_eq!(first.shop.as_deref(), Some("baker"));

        let second = r.check(&mut actor, &mut state);
        assert!(second.enemy.is_none() && second.shop.is_none());
        assert_eq!(r.last_enemy(), Some("goblin"));
        assert_eq!(r.last_shop(), Some("baker"));

        r.reset_interaction_state();
        assert_eq!(r.check(&mut actor, &mut state).enemy.as_deref(), Some("goblin"));
    }

    #[test]
    fn encountered_objects_are_skipped() {
        let mut r = InteractionResolver::new(
            vec![typed("goblin", "enemy", 0.0, 0.0, 16.0)],
            InteractionConfig::default(),
        );
        let mut actor = Actor::new(4.0, 4.0, 8.0, 8.0);
        let mut state = MapState::new("m");

        r.mark_object_as_encountered("Goblin", &mut state);
        assert!(r.objects().is_empty());
        assert!(state.is_encountered("goblin"));
        assert!(r.check(&mut actor, &mut state).is_empty());
    }

    #[test]
    fn transition_reads_destination_and_spawn() {
        let door = object(
            "door",
            0.0,
            0.0,
            16.0,
            &[
                ("type", PropertyValue::String("transition".into())),
                ("DestinationMap", PropertyValue::String("town.map".into())),
                ("spawnx", PropertyValue::I64(10)),
                ("spawnY", PropertyValue::String("abc".into())),
            ],
        );
        let mut r = InteractionResolver::new(vec![door], InteractionConfig::default());
        let mut actor = Actor::new(4.0, 4.0, 8.0, 8.0);
        let mut state = MapState::new("m");

        let result = r.check(&mut actor, &mut state);
        assert_eq!(
            result.transition,
            Some(Transition {
                destination_map: "town.map".into(),
                spawn_x: 10,
                spawn_y: 0,
            })
        );
    }

    #[test]
    fn transition_without_destination_is_ignored() {
        let mut r = InteractionResolver::new(
            vec![typed("door", "transition", 0.0, 0.0, 16.0)],
            InteractionConfig::default(),
        );
        let mut actor = Actor::new(4.0, 4.0, 8.0, 8.0);
        let mut state = MapState::new("m");
        assert!(r.check(&mut actor, &mut state).transition.is_none());
    }

    #[test]
    fn mark_helped_flags_live_npc() {
        let mut r = InteractionResolver::new(
            vec![typed("elder", "npc", 0.0, 0.0, 16.0)],
            InteractionConfig::default(),
        );
        assert!(r.mark_helped("ELDER"));
        assert!(r.objects()[0].helped);
        assert!(!r.mark_helped("nobody"));
    }
}
