//! Format-agnostic map model produced by the loaders.

use std::collections::BTreeMap;
use std::path::PathBuf;

use macroquad::prelude::*;

use crate::geometry::Aabb;
use crate::spatial::GID_MASK;

/// Highest global tile id a map may use. Loaders reject tilesets past it so
/// gid lookup tables stay small.
pub const MAX_GID: u32 = 1 << 24;

/// Canonical, format-agnostic map. Immutable once parsed, apart from the
/// object list which the engine consumes.
#[derive(Debug, Clone, Default)]
pub struct MapDocument {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Tile width in pixels.
    pub tile_w: u32,
    /// Tile height in pixels.
    pub tile_h: u32,
    /// Map level properties.
    pub properties: Properties,
    /// Tilesets sorted by `first_gid`, ranges never overlap.
    pub tilesets: Vec<TilesetRef>,
    /// Tile layers in draw order.
    pub layers: Vec<Layer>,
    /// Objects of every object group, in document order, names unique.
    pub objects: Vec<MapObject>,
}

impl MapDocument {
    /// Map width in pixels.
    pub fn pixel_width(&self) -> f32 {
        self.width.saturating_mul(self.tile_w) as f32
    }

    /// Map height in pixels.
    pub fn pixel_height(&self) -> f32 {
        self.height.saturating_mul(self.tile_h) as f32
    }

    /// Highest gid covered by any tileset, 0 when there are none.
    pub fn max_gid(&self) -> u32 {
        self.tilesets.iter().map(TilesetRef::last_gid).max().unwrap_or(0)
    }

    /// Range scan over the sorted tilesets.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<&TilesetRef> {
        let gid = gid & GID_MASK;
        self.tilesets
            .iter()
            .take_while(|t| t.first_gid <= gid)
            .find(|t| t.contains(gid))
    }

    /// Looks up a layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Looks up an object by its unique name, ignoring case.
    pub fn object(&self, name: &str) -> Option<&MapObject> {
        self.objects
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }
}

/// One full-map grid of tile ids.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer id from the document, 0 when absent.
    pub id: u32,
    /// Layer name.
    pub name: String,
    /// Width in tiles.
    pub width: usize,
    /// Height in tiles.
    pub height: usize,
    /// Row-major raw gids (flip flags included), 0 = empty.
    pub data: Vec<u32>,
    /// Hidden layers are kept but not drawn.
    pub visible: bool,
    /// Layer opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// World offset for this layer.
    pub offset: Vec2,
    /// Layer properties.
    pub properties: Properties,
}

impl Layer {
    /// Raw tile id at `(x, y)`, `None` outside the layer.
    pub fn tile_id_at(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }
}

/// One frame of a tile animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Tile id (local inside a tileset definition, global inside an instance).
    pub tile_id: u32,
    /// Time the frame stays on screen.
    pub duration_ms: u64,
}

/// Ordered frame list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationDef {
    /// Frames in play order.
    pub frames: Vec<Frame>,
}

impl AnimationDef {
    /// Rebases local tile ids onto the tileset's gid range.
    pub fn to_global(&self, first_gid: u32) -> Vec<Frame> {
        self.frames
            .iter()
            .map(|f| Frame {
                tile_id: f.tile_id + first_gid,
                duration_ms: f.duration_ms,
            })
            .collect()
    }
}

/// A tileset as referenced by one map: a contiguous gid range over one image.
#[derive(Debug, Clone, Default)]
pub struct TilesetRef {
    /// Global id of the first tile.
    pub first_gid: u32,
    /// Tileset name (the `name` attribute, else the file stem).
    pub name: String,
    /// Tileset file the map references, empty for embedded tilesets.
    pub source: String,
    /// Image path, relative to the map's directory.
    pub image: PathBuf,
    /// Declared image size, when the document states it.
    pub image_size: Option<(u32, u32)>,
    /// Tile width in pixels.
    pub tile_w: u32,
    /// Tile height in pixels.
    pub tile_h: u32,
    /// Number of tiles.
    pub tile_count: u32,
    /// Tiles per image row.
    pub columns: u32,
    /// Pixels between tiles.
    pub spacing: u32,
    /// Pixels around the tile grid.
    pub margin: u32,
    /// Tileset properties.
    pub properties: Properties,
    /// Per-tile properties keyed by local id.
    pub tile_properties: BTreeMap<u32, Properties>,
    /// Tile animations keyed by local id.
    pub animations: BTreeMap<u32, AnimationDef>,
}

impl TilesetRef {
    /// Last gid of the range (inclusive); `first_gid - 1` for an empty set.
    pub fn last_gid(&self) -> u32 {
        self.first_gid.saturating_add(self.tile_count).saturating_sub(1)
    }

    /// `first_gid <= gid < first_gid + tile_count`.
    pub fn contains(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid - self.first_gid < self.tile_count
    }

    /// Animation attached to the tile `gid` refers to, if any.
    pub fn animation_for_gid(&self, gid: u32) -> Option<&AnimationDef> {
        let gid = gid & GID_MASK;
        if !self.contains(gid) {
            return None;
        }
        self.animations
            .get(&(gid - self.first_gid))
            .filter(|a| !a.frames.is_empty())
    }
}

/// A positioned, named entity of an object group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapObject {
    /// Object id.
    pub id: u32,
    /// Name, unique within the map.
    pub name: String,
    /// Tiled class (`class`, or legacy `type` attribute).
    pub class_name: String,
    /// Tile gid, 0 for non-tile objects.
    pub gid: u32,
    /// Left edge in pixels.
    pub x: f64,
    /// Top edge in pixels.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
    /// Visibility flag from the document.
    pub visible: bool,
    /// Properties in document order.
    pub properties: Properties,
    /// Name of the object group the object belongs to.
    pub layer_name: String,
    /// Set once an enemy represented by this object has been beaten.
    pub defeated: bool,
    /// Set once an NPC represented by this object has been helped.
    pub helped: bool,
}

impl MapObject {
    /// Full collision rectangle.
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width, self.height)
    }

    /// Whether the object is drawn from a tile.
    pub fn is_tile(&self) -> bool {
        self.gid & GID_MASK != 0
    }

    /// Name without the `_<n>` suffix added during de-duplication.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

/// Strips a trailing `_<digits>` suffix.
pub fn base_name(name: &str) -> &str {
    match name.rsplit_once('_') {
        Some((base, n)) if !base.is_empty() && !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => name,
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `bool`
    Bool(bool),
    /// `int` and `object`
    I64(i64),
    /// `float`
    F32(f32),
    /// `string`, `file`, `color`, `class` and untyped values
    String(String),
}

impl PropertyValue {
    /// Boolean view; accepts the strings `"true"` / `"false"` too, since
    /// untyped TMX properties arrive as strings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            PropertyValue::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Integer view; numeric strings are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::I64(v) => Some(*v),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Float view; integers widen.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PropertyValue::F32(v) => Some(*v),
            PropertyValue::I64(v) => Some(*v as f32),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// One name/type/value triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name as written in the document.
    pub name: String,
    /// Declared type, `None` when the document omitted it.
    pub kind: Option<String>,
    /// Converted value.
    pub value: PropertyValue,
}

/// Ordered property bag. Lookups are first-match-wins and ignore case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<Property>);

impl Properties {
    /// Empty bag.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a property, keeping document order.
    pub fn push(&mut self, name: impl Into<String>, kind: Option<String>, value: PropertyValue) {
        self.0.push(Property {
            name: name.into(),
            kind,
            value,
        });
    }

    /// Properties in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.iter()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First value whose name matches.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value)
    }

    /// See [`PropertyValue::as_bool`].
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(PropertyValue::as_bool)
    }

    /// See [`PropertyValue::as_i64`].
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropertyValue::as_i64)
    }

    /// Integer that fits in `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    /// See [`PropertyValue::as_f32`].
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(PropertyValue::as_f32)
    }

    /// See [`PropertyValue::as_str`].
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropertyValue::as_str)
    }
}

impl FromIterator<Property> for Properties {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
