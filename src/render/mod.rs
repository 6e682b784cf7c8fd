//! Draw list construction and execution.

pub mod cull;

use std::collections::HashMap;

use macroquad::prelude::*;

use crate::animation::AnimationEngine;
use crate::atlas::TileAtlas;
use crate::document::MapObject;
use crate::geometry::Aabb;
use crate::spatial::{LayerIdx, SceneIndex, TileId, CHUNK_SIZE};
use crate::world::World;
use cull::query_visible_bounds;

/// Pass a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawLayer {
    /// Static tile of the given tile layer.
    Tiles(LayerIdx),
    /// Tile object without an animation.
    Object,
    /// Animated entity with its kind's z order.
    Entity(u8),
}

/// One textured quad.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Pass.
    pub layer: DrawLayer,
    /// Index into the atlas tilesets.
    pub tileset_index: usize,
    /// Source rectangle in the tileset image.
    pub src: Rect,
    /// Destination rectangle in world pixels.
    pub dest: Rect,
    /// Mirror horizontally.
    pub flip_x: bool,
    /// Mirror vertically.
    pub flip_y: bool,
    /// Tint, alpha carries layer opacity.
    pub tint: Color,
}

/// Everything inside `visible`: static layers in layer order, then plain
/// tile objects, then live animated entities by z.
pub fn build_draw_list(
    scene: &SceneIndex,
    atlas: &TileAtlas,
    animations: &AnimationEngine,
    objects: &[MapObject],
    visible: Rect,
) -> Vec<DrawCommand> {
    let mut out = Vec::new();
    let bounds = Aabb::from_rect(visible);

    let view = query_visible_bounds(scene, visible);
    let map_tile_h = scene.tile_h as f32;
    for lid in view.layer_indices() {
        let tint = Color::new(1.0, 1.0, 1.0, scene.opacity(lid));
        for chunk in &view.chunks {
            let Some(tiles) = chunk.layers.get(&lid) else {
                continue;
            };
            let origin = vec2((chunk.coord.x * CHUNK_SIZE) as f32, (chunk.coord.y * CHUNK_SIZE) as f32);
            for rec in tiles {
                let Some(region) = atlas.region(rec.id.raw()) else {
                    continue;
                };
                let pos = origin + rec.rel_pos;
                // Tiles taller than the grid grow upwards.
                let dest = Rect::new(pos.x, pos.y + map_tile_h - region.src.h, region.src.w, region.src.h);
                if !dest.overlaps(&visible) {
                    continue;
                }
                out.push(command(DrawLayer::Tiles(lid), region.tileset, region.src, dest, rec.id, tint));
            }
        }
    }

    for obj in objects {
        if obj.gid == 0 || !obj.visible || obj.defeated || animations.find(&obj.name).is_some() {
            continue;
        }
        if !obj.bounds().intersects(&bounds) {
            continue;
        }
        let Some(region) = atlas.region(obj.gid) else {
            continue;
        };
        out.push(command(DrawLayer::Object, region.tileset, region.src, obj.bounds().to_rect(), TileId(obj.gid), WHITE));
    }

    for inst in animations.draw_order() {
        if !inst.bounds.intersects(&bounds) {
            continue;
        }
        let Some(region) = inst.current_tile().and_then(|t| atlas.region(t)) else {
            continue;
        };
        let dest = inst.dest_rect(region.src.w, region.src.h);
        out.push(command(
            DrawLayer::Entity(inst.kind.policy().z),
            region.tileset,
            region.src,
            dest,
            TileId(0),
            WHITE,
        ));
    }

    out
}

fn command(layer: DrawLayer, tileset_index: usize, src: Rect, dest: Rect, id: TileId, tint: Color) -> DrawCommand {
    DrawCommand {
        layer,
        tileset_index,
        src,
        dest,
        flip_x: id.flip_h(),
        flip_y: id.flip_v(),
        tint,
    }
}

/// Owns GPU textures for the current map's tilesets.
#[derive(Default)]
pub struct Renderer {
    map_name: String,
    textures: HashMap<usize, Texture2D>,
}

impl Renderer {
    /// Renderer with an empty texture cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn texture(&mut self, atlas: &TileAtlas, tileset_index: usize) -> Option<&Texture2D> {
        if !self.textures.contains_key(&tileset_index) {
            let image = atlas.tilesets().get(tileset_index)?.image.as_ref()?;
            let tex = Texture2D::from_image(image);
            tex.set_filter(FilterMode::Nearest);
            self.textures.insert(tileset_index, tex);
        }
        self.textures.get(&tileset_index)
    }

    fn sync_map(&mut self, world: &World) {
        if self.map_name != world.map_name() {
            self.textures.clear();
            self.map_name = world.map_name().to_owned();
        }
    }

    /// Draws the visible part of the map through the world camera, then
    /// restores the default camera.
    pub fn draw(&mut self, world: &World) {
        self.sync_map(world);

        let camera = world.camera();
        set_camera(&camera.to_camera2d());

        let commands = build_draw_list(
            world.scene(),
            world.atlas(),
            world.animations(),
            world.objects(),
            camera.visible_rect(),
        );
        for cmd in &commands {
            let Some(tex) = self.texture(world.atlas(), cmd.tileset_index) else {
                continue;
            };
            draw_texture_ex(
                tex,
                cmd.dest.x,
                cmd.dest.y,
                cmd.tint,
                DrawTextureParams {
                    dest_size: Some(cmd.dest.size()),
                    source: Some(cmd.src),
                    flip_x: cmd.flip_x,
                    flip_y: cmd.flip_y,
                    ..Default::default()
                },
            );
        }

        set_default_camera();
    }

    /// Draws the current frame of the animation `name` with its top-left
    /// corner at screen position `(x, y)`, at the object's size. Returns
    /// `false` when there is nothing to draw.
    pub fn draw_animation_at(&mut self, world: &World, name: &str, x: f32, y: f32) -> bool {
        self.sync_map(world);

        let Some(inst) = world.animations().find(name) else {
            return false;
        };
        let Some(region) = inst.current_tile().and_then(|t| world.atlas().region(t)) else {
            return false;
        };
        let size = vec2(inst.bounds.w as f32, inst.bounds.h as f32);
        let Some(tex) = self.texture(world.atlas(), region.tileset) else {
            return false;
        };
        draw_texture_ex(
            tex,
            x,
            y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(size),
                source: Some(region.src),
                ..Default::default()
            },
        );
        true
    }
}
