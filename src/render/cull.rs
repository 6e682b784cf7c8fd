use crate::spatial::{ChunkCoord, LayerIdx, SceneIndex, TileRec, CHUNK_SIZE};
use macroquad::prelude::*;
use std::collections::BTreeMap;

const CULL_MARGIN_CHUNKS: i32 = 1;

/// One chunk inside the view.
pub struct LocalChunkView<'g> {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// Tiles per layer.
    pub layers: &'g BTreeMap<LayerIdx, Vec<TileRec>>,
}

/// Chunks inside the view.
pub struct LocalView<'g> {
    /// Row-major.
    pub chunks: Vec<LocalChunkView<'g>>,
}

impl LocalView<'_> {
    /// Distinct layer indices present in the view, ascending.
    pub fn layer_indices(&self) -> Vec<LayerIdx> {
        let mut out: Vec<LayerIdx> = self
            .chunks
            .iter()
            .flat_map(|c| c.layers.keys().copied())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Chunks overlapping `[view_min, view_max]`, padded by one chunk, in
/// row-major order.
pub fn query_visible_rect<'g>(g: &'g SceneIndex, view_min: Vec2, view_max: Vec2) -> LocalView<'g> {
    let mut cx_min = (view_min.x as i32).div_euclid(CHUNK_SIZE);
    let mut cy_min = (view_min.y as i32).div_euclid(CHUNK_SIZE);
    let mut cx_max = (view_max.x as i32).div_euclid(CHUNK_SIZE);
    let mut cy_max = (view_max.y as i32).div_euclid(CHUNK_SIZE);

    if cx_min > cx_max {
        std::mem::swap(&mut cx_min, &mut cx_max);
    }
    if cy_min > cy_max {
        std::mem::swap(&mut cy_min, &mut cy_max);
    }

    //pad by one chunk
    cx_min -= CULL_MARGIN_CHUNKS;
    cy_min -= CULL_MARGIN_CHUNKS;
    cx_max += CULL_MARGIN_CHUNKS;
    cy_max += CULL_MARGIN_CHUNKS;

    let mut chunks = Vec::new();
    for (&coord, bucket) in &g.buckets {
        if coord.x >= cx_min && coord.x <= cx_max && coord.y >= cy_min && coord.y <= cy_max {
            chunks.push(LocalChunkView {
                coord,
                layers: &bucket.layers,
            })
        }
    }
    chunks.sort_by_key(|c| (c.coord.y, c.coord.x));

    LocalView { chunks }
}

/// Same as [`query_visible_rect`] for a camera rectangle.
pub fn query_visible_bounds(g: &SceneIndex, bounds: Rect) -> LocalView<'_> {
    query_visible_rect(g, bounds.point(), bounds.point() + bounds.size())
}
