// src/loader/json_loader.rs
use std::path::{Path, PathBuf};

use macroquad::prelude::*;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::{finish_document, parent_dir, read_text, ObjectCollector, RawObject};
use crate::document::{AnimationDef, Frame, Layer, MapDocument, Properties, PropertyValue, TilesetRef};
use crate::error::MapError;

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    data: Vec<u32>,
    #[serde(default)]
    width: Option<usize>, // required for tile layers only
    #[serde(default)]
    height: Option<usize>,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default = "one")]
    opacity: f32,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>, // "tilelayer" expected here
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    objects: Vec<JsonObject>,
    #[serde(default)]
    layers: Vec<JsonLayer>, // children of "group" layers
}

fn default_true() -> bool {
    true
}
fn one() -> f32 {
    1.0
}

#[derive(Deserialize)]
struct JsonTilesetRef {
    firstgid: u32,
    source: String,
}

#[derive(Deserialize)]
struct JsonMap {
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    layers: Vec<JsonLayer>,
    tilesets: Vec<JsonTilesetRef>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct ExternalTileset {
    #[serde(default)]
    name: String,
    tilewidth: u32,
    tileheight: u32,
    tilecount: u32,
    columns: u32,
    image: String,
    #[serde(default)]
    imagewidth: Option<u32>,
    #[serde(default)]
    imageheight: Option<u32>,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    tiles: Vec<JsonTile>,
}

#[derive(Deserialize)]
struct JsonProperty {
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    value: JsonValue,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    gid: Option<u32>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonFrame {
    tileid: u32,
    duration: u64,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    animation: Vec<JsonFrame>,
}

fn json_property_to_value(prop: JsonProperty) -> Result<Option<(String, Option<String>, PropertyValue)>, MapError> {
    let JsonProperty { name, kind, value } = prop;

    let parsed = match kind.as_deref() {
        Some("bool") => value.as_bool().map(PropertyValue::Bool),
        Some("int") | Some("object") => value.as_i64().map(PropertyValue::I64),
        Some("float") => value.as_f64().map(|n| PropertyValue::F32(n as f32)),
        Some("string") | Some("file") | Some("color") | Some("class") => {
            value.as_str().map(|s| PropertyValue::String(s.to_owned()))
        }
        Some(other) => {
            return Err(MapError::UnsupportedPropertyType {
                name,
                kind: other.to_owned(),
            });
        }
        None => {
            if let Some(v) = value.as_bool() {
                Some(PropertyValue::Bool(v))
            } else if let Some(v) = value.as_i64() {
                Some(PropertyValue::I64(v))
            } else if let Some(v) = value.as_f64() {
                Some(PropertyValue::F32(v as f32))
            } else {
                value.as_str().map(|s| PropertyValue::String(s.to_owned()))
            }
        }
    };

    if parsed.is_none() {
        warn!(property = %name, kind = ?kind, value = %value, "property_value_dropped");
    }

    Ok(parsed.map(|value| (name, kind, value)))
}

fn properties_from_json(props: Vec<JsonProperty>) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    for p in props {
        if let Some((name, kind, value)) = json_property_to_value(p)? {
            out.push(name, kind, value);
        }
    }
    Ok(out)
}

fn object_to_raw(obj: JsonObject) -> Result<RawObject, MapError> {
    let class_name = if !obj.class.is_empty() {
        obj.class
    } else {
        obj.kind
    };

    Ok(RawObject {
        id: obj.id,
        name: obj.name,
        class_name,
        gid: obj.gid,
        x: obj.x,
        y: obj.y,
        width: obj.width,
        height: obj.height,
        visible: obj.visible,
        properties: properties_from_json(obj.properties)?,
    })
}

fn decode_external_tileset(map_dir: &Path, r: &JsonTilesetRef) -> Result<TilesetRef, MapError> {
    if !(r.source.ends_with(".json") || r.source.ends_with(".tsj")) {
        return Err(MapError::UnsupportedFormat(format!(
            "External tileset must be JSON: {}",
            r.source
        )));
    }
    let ts_path = map_dir.join(&r.source);
    let ext_txt = read_text(&ts_path)?;
    let ext: ExternalTileset = serde_json::from_str(&ext_txt).map_err(|source| MapError::Json {
        path: ts_path.clone(),
        source,
    })?;

    let mut tile_properties = std::collections::BTreeMap::new();
    let mut animations = std::collections::BTreeMap::new();
    for tile in ext.tiles {
        let props = properties_from_json(tile.properties)?;
        if !props.is_empty() {
            tile_properties.insert(tile.id, props);
        }
        if !tile.animation.is_empty() {
            let frames = tile
                .animation
                .into_iter()
                .map(|f| Frame {
                    tile_id: f.tileid,
                    duration_ms: f.duration,
                })
                .collect();
            animations.insert(tile.id, AnimationDef { frames });
        }
    }

    // Image is relative to the tileset file; re-anchor it on the map dir.
    let ts_dir = Path::new(&r.source).parent().map(Path::to_path_buf).unwrap_or_default();
    let name = if ext.name.is_empty() {
        ts_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_owned()
    } else {
        ext.name
    };

    debug!(tileset = %name, first_gid = r.firstgid, tiles = ext.tilecount, "tileset_parsed");

    Ok(TilesetRef {
        first_gid: r.firstgid,
        name,
        source: r.source.clone(),
        image: ts_dir.join(ext.image),
        image_size: ext.imagewidth.zip(ext.imageheight),
        tile_w: ext.tilewidth,
        tile_h: ext.tileheight,
        tile_count: ext.tilecount,
        columns: ext.columns,
        spacing: ext.spacing,
        margin: ext.margin,
        properties: properties_from_json(ext.properties)?,
        tile_properties,
        animations,
    })
}

fn collect_layers(
    layers: Vec<JsonLayer>,
    out: &mut Vec<Layer>,
    objects: &mut ObjectCollector,
) -> Result<(), MapError> {
    for l in layers {
        match l.kind.as_deref().unwrap_or("tilelayer") {
            "tilelayer" => {
                if let Some(encoding) = l.encoding.filter(|e| e != "csv") {
                    return Err(MapError::UnsupportedEncoding {
                        layer: l.name,
                        encoding,
                    });
                }
                let width = l.width.ok_or_else(|| MapError::missing("layer", "width"))?;
                let height = l.height.ok_or_else(|| MapError::missing("layer", "height"))?;
                out.push(Layer {
                    id: l.id,
                    properties: properties_from_json(l.properties)?,
                    name: l.name,
                    width,
                    height,
                    data: l.data,
                    visible: l.visible,
                    opacity: l.opacity,
                    offset: vec2(l.offsetx, l.offsety),
                });
            }
            "objectgroup" => {
                for obj in l.objects {
                    objects.push(&l.name, object_to_raw(obj)?);
                }
            }
            "group" => collect_layers(l.layers, out, objects)?,
            other => debug!(layer = %l.name, kind = other, "layer_kind_ignored"),
        }
    }
    Ok(())
}

/// Parses a Tiled JSON map and its external JSON tilesets.
pub fn decode_json_file(path: &Path) -> Result<MapDocument, MapError> {
    let txt = read_text(path)?;
    let j: JsonMap = serde_json::from_str(&txt).map_err(|source| MapError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let map_dir: PathBuf = parent_dir(path);

    let tilesets = j
        .tilesets
        .iter()
        .map(|r| decode_external_tileset(&map_dir, r))
        .collect::<Result<Vec<_>, _>>()?;

    let mut layers = Vec::with_capacity(j.layers.len());
    let mut objects = ObjectCollector::default();
    collect_layers(j.layers, &mut layers, &mut objects)?;

    let mut doc = MapDocument {
        width: j.width,
        height: j.height,
        tile_w: j.tilewidth,
        tile_h: j.tileheight,
        properties: properties_from_json(j.properties)?,
        tilesets,
        layers,
        objects: objects.finish(),
    };
    finish_document(&mut doc)?;
    Ok(doc)
}
