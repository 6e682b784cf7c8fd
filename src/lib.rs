#![warn(missing_docs)]

//! Tile-map RPG engine on Macroquad: Tiled TMX/JSON loading, tile atlas,
//! per-object animations, a clamped follow camera and actor/object
//! interactions with per-map state that survives reloads.

pub mod actor;
pub mod animation;
pub mod atlas;
pub mod camera;
pub mod config;
pub mod document;
mod error;
pub mod geometry;
pub mod interaction;
pub mod loader;
pub mod map_state;
pub mod render;
#[allow(missing_docs)]
pub mod spatial;
pub mod world;

pub use actor::{Actor, Item};
pub use animation::{AnimationEngine, AnimationInstance, EntityKind, RenderPolicy, SpriteAnchor};
pub use atlas::{TileAtlas, TileRegion};
pub use camera::Camera;
pub use config::EngineConfig;
pub use document::{Layer, MapDocument, MapObject, Properties, PropertyValue, TilesetRef};
pub use error::MapError;
pub use geometry::Aabb;
pub use interaction::{classify, InteractionResolver, InteractionResult, ObjectType, Transition};
pub use loader::load_map_document;
pub use map_state::{MapState, MapStateRegistry};
pub use render::{build_draw_list, DrawCommand, Renderer};
pub use world::World;
