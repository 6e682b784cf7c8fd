use macroquad::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::document::MapDocument;

pub const CHUNK_SIZE: i32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

pub type LayerIdx = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

pub const FLIP_H: u32 = 0x8000_0000; // bit 31
pub const FLIP_V: u32 = 0x4000_0000; // bit 30
pub const FLIP_D: u32 = 0x2000_0000; // bit 29
pub const GID_MASK: u32 = 0x1FFF_FFFF;

impl TileId {
    #[inline] pub fn raw(self) -> u32 { self.0 }
    #[inline] pub fn clean(self) -> u32 { self.0 & GID_MASK }
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }
}

#[inline]
pub fn world_to_chunk(p: Vec2) -> ChunkCoord {
    ChunkCoord {
        x: (p.x as i32).div_euclid(CHUNK_SIZE),
        y: (p.y as i32).div_euclid(CHUNK_SIZE),
    }
}

#[inline]
pub fn rel(p: Vec2) -> Vec2 {
    vec2(
        (p.x as i32).rem_euclid(CHUNK_SIZE) as f32,
        (p.y as i32).rem_euclid(CHUNK_SIZE) as f32,
    )
}

/// A static tile placed in a chunk.
#[derive(Debug, Clone)]
pub struct TileRec {
    pub id: TileId,
    pub rel_pos: Vec2,
}

/// Tiles of one chunk, grouped per layer. Layers iterate in draw order.
#[derive(Debug, Default)]
pub struct SceneChunk {
    pub layers: BTreeMap<LayerIdx, Vec<TileRec>>,
}

/// Chunked index of every static tile of a map.
#[derive(Debug, Default)]
pub struct SceneIndex {
    pub buckets: HashMap<ChunkCoord, SceneChunk>,
    /// Opacity per layer index, `1.0` when unknown.
    pub layer_opacity: Vec<f32>,
    pub tile_w: u32,
    pub tile_h: u32,
    tile_count: usize,
}

impl SceneIndex {
    pub fn new(tile_w: u32, tile_h: u32) -> Self {
        SceneIndex {
            tile_w,
            tile_h,
            ..Default::default()
        }
    }

    /// Indexes every non-empty cell of the visible layers.
    pub fn from_document(doc: &MapDocument) -> Self {
        let mut index = SceneIndex::new(doc.tile_w, doc.tile_h);
        let tw = doc.tile_w as f32;
        let th = doc.tile_h as f32;

        for (lz, layer) in doc.layers.iter().enumerate() {
            index.layer_opacity.push(layer.opacity);
            if !layer.visible || layer.width == 0 {
                continue;
            }

            for (idx, gid) in layer.data.iter().enumerate() {
                if gid & GID_MASK == 0 {
                    continue;
                }
                let col = idx % layer.width;
                let row = idx / layer.width;
                let world = vec2(col as f32 * tw, row as f32 * th) + layer.offset;
                index.add_tile(TileId(*gid), lz as LayerIdx, world);
            }
        }
        index
    }

    pub fn add_tile(&mut self, id: TileId, layer: LayerIdx, world: Vec2) {
        let cc = world_to_chunk(world);
        self.buckets
            .entry(cc)
            .or_default()
            .layers
            .entry(layer)
            .or_default()
            .push(TileRec {
                id,
                rel_pos: rel(world),
            });
        self.tile_count += 1;
    }

    /// Number of indexed tiles.
    pub fn len(&self) -> usize {
        self.tile_count
    }

    pub fn is_empty(&self) -> bool {
        self.tile_count == 0
    }

    pub fn opacity(&self, layer: LayerIdx) -> f32 {
        self.layer_opacity.get(layer as usize).copied().unwrap_or(1.0)
    }
}
