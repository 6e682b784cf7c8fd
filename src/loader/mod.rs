//! Map document loaders.
//!
//! Both Tiled formats decode into the same [`MapDocument`]; everything that
//! does not depend on the syntax (object naming, gid validation, tileset
//! ordering) lives here.

pub mod json_loader;
pub mod tmx_loader;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{info, trace};

use crate::document::{MapDocument, MapObject, Properties, MAX_GID};
use crate::error::MapError;
use crate::spatial::GID_MASK;

/// Name given to objects the document left unnamed.
pub const UNNAMED_OBJECT: &str = "Unnamed_Object";

/// Loads a `.tmx` or `.json` map together with its tilesets.
pub fn load_map_document(path: impl AsRef<Path>) -> Result<MapDocument, MapError> {
    let p = path.as_ref();
    let doc = match p.extension().and_then(|e| e.to_str()) {
        Some("tmx") => tmx_loader::decode_tmx_file(p)?,
        Some("json") | Some("tmj") => json_loader::decode_json_file(p)?,
        _ => return Err(MapError::UnsupportedFormat(p.display().to_string())),
    };
    info!(
        path = %p.display(),
        width = doc.width,
        height = doc.height,
        layers = doc.layers.len(),
        tilesets = doc.tilesets.len(),
        objects = doc.objects.len(),
        "map_document_loaded"
    );
    Ok(doc)
}

pub(crate) fn read_text(path: &Path) -> Result<String, MapError> {
    std::fs::read_to_string(path).map_err(|source| MapError::from_io(path.to_path_buf(), source))
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"))
}

/// Object fields as read from either format, before naming and filtering.
pub(crate) struct RawObject {
    pub id: u32,
    pub name: String,
    pub class_name: String,
    pub gid: Option<u32>,
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub visible: bool,
    pub properties: Properties,
}

/// Collects objects across object groups, giving each a unique name.
#[derive(Default)]
pub(crate) struct ObjectCollector {
    // Both keyed by lower-cased names: map state compares names ignoring case.
    name_counts: HashMap<String, u32>,
    issued: HashSet<String>,
    objects: Vec<MapObject>,
}

impl ObjectCollector {
    /// First occurrence keeps `base`, later ones get `_1`, `_2`, ...
    /// skipping any suffix already taken, case-insensitively.
    pub fn unique_name(&mut self, base: &str) -> String {
        let base = if base.is_empty() { UNNAMED_OBJECT } else { base };
        let count = self.name_counts.entry(base.to_lowercase()).or_insert(0);
        loop {
            let name = if *count == 0 {
                base.to_owned()
            } else {
                format!("{base}_{count}")
            };
            *count += 1;
            if self.issued.insert(name.to_lowercase()) {
                return name;
            }
        }
    }

    pub fn push(&mut self, layer_name: &str, raw: RawObject) {
        // Names are handed out before the geometry check so that suffixes
        // only depend on document order.
        let name = self.unique_name(&raw.name);

        let (Some(width), Some(height)) = (raw.width, raw.height) else {
            trace!(object = %name, id = raw.id, "object_without_size_dropped");
            return;
        };

        let gid = raw.gid.unwrap_or(0);
        // Tiled anchors tile objects at their bottom-left corner.
        let y = if gid & GID_MASK != 0 { raw.y - height } else { raw.y };

        self.objects.push(MapObject {
            id: raw.id,
            name,
            class_name: raw.class_name,
            gid,
            x: raw.x,
            y,
            width,
            height,
            visible: raw.visible,
            properties: raw.properties,
            layer_name: layer_name.to_owned(),
            defeated: false,
            helped: false,
        });
    }

    pub fn finish(self) -> Vec<MapObject> {
        self.objects
    }
}

/// Sorts tilesets, rejects overlapping ranges and gids no tileset covers.
pub(crate) fn finish_document(doc: &mut MapDocument) -> Result<(), MapError> {
    for ts in &doc.tilesets {
        if ts.first_gid > MAX_GID {
            return Err(MapError::invalid("tileset", "firstgid", &ts.first_gid.to_string()));
        }
        let in_range = ts
            .first_gid
            .checked_add(ts.tile_count)
            .is_some_and(|end| end <= MAX_GID + 1);
        if !in_range {
            return Err(MapError::invalid("tileset", "tilecount", &ts.tile_count.to_string()));
        }
    }

    doc.tilesets.sort_by_key(|t| t.first_gid);

    for pair in doc.tilesets.windows(2) {
        if pair[0].tile_count > 0 && pair[1].first_gid <= pair[0].last_gid() {
            return Err(MapError::OverlappingTilesets {
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
            });
        }
    }

    let max_gid = doc.max_gid();

    for layer in &doc.layers {
        let Some(expected) = layer.width.checked_mul(layer.height) else {
            return Err(MapError::invalid("layer", "width", &layer.width.to_string()));
        };
        if layer.data.len() != expected {
            return Err(MapError::InvalidLayerSize {
                layer: layer.name.clone(),
                expected,
                actual: layer.data.len(),
            });
        }
        if let Some(gid) = layer
            .data
            .iter()
            .map(|raw| raw & GID_MASK)
            .find(|&gid| gid != 0 && gid > max_gid)
        {
            return Err(MapError::InvalidTileGid {
                layer: layer.name.clone(),
                gid,
                max_gid,
            });
        }
    }

    for obj in &doc.objects {
        let gid = obj.gid & GID_MASK;
        if gid != 0 && gid > max_gid {
            return Err(MapError::InvalidObjectGid {
                layer: obj.layer_name.clone(),
                object_id: obj.id,
                gid,
                max_gid,
            });
        }
    }

    Ok(())
}
