//! Tileset images sliced into per-gid source rectangles.

use std::path::Path;

use macroquad::prelude::*;
use tracing::{debug, warn};

use crate::document::{MapDocument, TilesetRef, MAX_GID};
use crate::spatial::GID_MASK;

const NO_TILESET: u16 = u16::MAX;

/// One tileset as seen by the renderer.
pub struct AtlasTileset {
    /// Tileset name.
    pub name: String,
    /// First global id.
    pub first_gid: u32,
    /// Number of tiles.
    pub tile_count: u32,
    /// Tile width in pixels.
    pub tile_w: u32,
    /// Tile height in pixels.
    pub tile_h: u32,
    /// Decoded image, `None` when it could not be loaded.
    pub image: Option<Image>,
}

/// Where a gid lives: tileset index plus source rectangle in its image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRegion {
    /// Index into [`TileAtlas::tilesets`].
    pub tileset: usize,
    /// Source rectangle in pixels.
    pub src: Rect,
}

/// Resolves global tile ids to tilesets and image regions.
pub struct TileAtlas {
    tilesets: Vec<AtlasTileset>,
    gid_lut: Vec<u16>,
    regions: Vec<Option<Rect>>,
}

impl TileAtlas {
    /// Reads every tileset image relative to `base_dir`.
    ///
    /// An image that is missing or does not decode is logged and its tileset
    /// contributes no regions.
    pub fn load(doc: &MapDocument, base_dir: &Path) -> Self {
        let images = doc
            .tilesets
            .iter()
            .map(|ts| {
                let path = base_dir.join(&ts.image);
                let bytes = match std::fs::read(&path) {
                    Ok(b) => b,
                    Err(err) => {
                        warn!(tileset = %ts.name, path = %path.display(), error = %err, "tileset_image_missing");
                        return None;
                    }
                };
                match Image::from_file_with_format(&bytes, None) {
                    Ok(img) => Some(img),
                    Err(err) => {
                        warn!(tileset = %ts.name, path = %path.display(), error = %err, "tileset_image_undecodable");
                        None
                    }
                }
            })
            .collect();
        Self::from_images(&doc.tilesets, images)
    }

    /// Builds the atlas from already decoded images, one per tileset in the
    /// same order. Tilesets must be sorted by `first_gid`; a tileset reaching
    /// past [`MAX_GID`] is kept for its index but resolves no gids.
    pub fn from_images(tilesets: &[TilesetRef], images: Vec<Option<Image>>) -> Self {
        let max_gid = tilesets
            .iter()
            .map(TilesetRef::last_gid)
            .filter(|&last| last <= MAX_GID)
            .max()
            .unwrap_or(0);

        let mut gid_lut = vec![NO_TILESET; (max_gid + 1) as usize];
        let mut regions = vec![None; (max_gid + 1) as usize];
        let mut out = Vec::with_capacity(tilesets.len());

        let mut images = images.into_iter();
        for (i, ts) in tilesets.iter().enumerate() {
            let image = images.next().flatten();

            if ts.last_gid() > MAX_GID {
                warn!(tileset = %ts.name, first_gid = ts.first_gid, tiles = ts.tile_count, "tileset_gid_range_too_large");
            } else if ts.tile_count > 0 {
                for gid in ts.first_gid..=ts.last_gid() {
                    gid_lut[gid as usize] = i as u16;
                }
                if let Some(img) = &image {
                    let sliced = slice_tileset(ts, img, &mut regions);
                    debug!(tileset = %ts.name, tiles = sliced, "tileset_sliced");
                }
            }

            out.push(AtlasTileset {
                name: ts.name.clone(),
                first_gid: ts.first_gid,
                tile_count: ts.tile_count,
                tile_w: ts.tile_w,
                tile_h: ts.tile_h,
                image,
            });
        }

        TileAtlas {
            tilesets: out,
            gid_lut,
            regions,
        }
    }

    /// All tilesets in `first_gid` order.
    pub fn tilesets(&self) -> &[AtlasTileset] {
        &self.tilesets
    }

    /// The tileset whose range contains `gid` (flip bits ignored).
    #[inline]
    pub fn tileset_for_gid(&self, gid: u32) -> Option<(usize, &AtlasTileset)> {
        let clean = (gid & GID_MASK) as usize;
        match self.gid_lut.get(clean) {
            Some(&idx) if idx != NO_TILESET => Some((idx as usize, &self.tilesets[idx as usize])),
            _ => None,
        }
    }

    /// Tileset and source rectangle of `gid`, `None` for empty or unknown
    /// tiles and for tiles whose image did not load.
    pub fn region(&self, gid: u32) -> Option<TileRegion> {
        let clean = (gid & GID_MASK) as usize;
        let src = (*self.regions.get(clean)?)?;
        let (tileset, _) = self.tileset_for_gid(gid)?;
        Some(TileRegion { tileset, src })
    }

    /// Copy of the tile's pixels.
    pub fn tile_image(&self, gid: u32) -> Option<Image> {
        let region = self.region(gid)?;
        let image = self.tilesets[region.tileset].image.as_ref()?;
        Some(image.sub_image(region.src))
    }
}

fn slice_tileset(ts: &TilesetRef, img: &Image, regions: &mut [Option<Rect>]) -> u32 {
    if ts.columns == 0 {
        warn!(tileset = %ts.name, "tileset_without_columns");
        return 0;
    }

    let (img_w, img_h) = (img.width as u32, img.height as u32);
    let mut sliced = 0;
    for local in 0..ts.tile_count {
        let col = local % ts.columns;
        let row = local / ts.columns;
        let sx = ts.margin.saturating_add(col.saturating_mul(ts.tile_w.saturating_add(ts.spacing)));
        let sy = ts.margin.saturating_add(row.saturating_mul(ts.tile_h.saturating_add(ts.spacing)));

        if sx.saturating_add(ts.tile_w) > img_w || sy.saturating_add(ts.tile_h) > img_h {
            warn!(
                tileset = %ts.name,
                tile = local,
                image_width = img_w,
                image_height = img_h,
                "tile_outside_image"
            );
            continue;
        }

        regions[(ts.first_gid + local) as usize] =
            Some(Rect::new(sx as f32, sy as f32, ts.tile_w as f32, ts.tile_h as f32));
        sliced += 1;
    }
    sliced
}
