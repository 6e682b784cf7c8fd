// src/loader/tmx_loader.rs
use std::path::{Path, PathBuf};
use std::str::FromStr;

use macroquad::prelude::*;
use roxmltree::{Document, Node};
use tracing::{debug, warn};

use super::{finish_document, parent_dir, read_text, ObjectCollector, RawObject};
use crate::document::{AnimationDef, Frame, Layer, MapDocument, Properties, PropertyValue, TilesetRef};
use crate::error::MapError;

/// Parses a `.tmx` file and every external `.tsx` tileset it references.
pub fn decode_tmx_file(path: &Path) -> Result<MapDocument, MapError> {
    let txt = read_text(path)?;
    decode_tmx_str(&txt, path)
}

/// Parses TMX text. `path` names the document in errors and anchors
/// relative tileset / image paths.
pub fn decode_tmx_str(txt: &str, path: &Path) -> Result<MapDocument, MapError> {
    let xml = Document::parse(txt).map_err(|source| MapError::Xml {
        path: path.to_path_buf(),
        source,
    })?;
    let map_dir = parent_dir(path);

    let root = xml.root_element();
    if !root.has_tag_name("map") {
        return Err(MapError::UnsupportedFormat(format!(
            "{}: root element must be <map>",
            path.display()
        )));
    }

    let mut doc = MapDocument {
        width: required(root, "width")?,
        height: required(root, "height")?,
        tile_w: required(root, "tilewidth")?,
        tile_h: required(root, "tileheight")?,
        properties: parse_properties(root)?,
        ..Default::default()
    };

    for node in root.children().filter(|n| n.has_tag_name("tileset")) {
        doc.tilesets.push(parse_tileset_ref(node, &map_dir)?);
    }

    for node in root.descendants().filter(|n| n.has_tag_name("layer")) {
        doc.layers.push(parse_layer(node)?);
    }

    let mut objects = ObjectCollector::default();
    for group in root
        .descendants()
        .filter(|n| n.has_tag_name("objectgroup") && !inside_tileset(*n))
    {
        let group_name = group.attribute("name").unwrap_or_default();
        for obj in group.children().filter(|n| n.has_tag_name("object")) {
            objects.push(group_name, parse_object(obj)?);
        }
    }
    doc.objects = objects.finish();

    finish_document(&mut doc)?;
    Ok(doc)
}

/// Parses a standalone `.tsx` tileset. Image paths stay relative to the
/// tileset's own directory.
pub fn decode_tsx_file(path: &Path, first_gid: u32) -> Result<TilesetRef, MapError> {
    let txt = read_text(path)?;
    let xml = Document::parse(&txt).map_err(|source| MapError::Xml {
        path: path.to_path_buf(),
        source,
    })?;
    let root = xml.root_element();
    if !root.has_tag_name("tileset") {
        return Err(MapError::UnsupportedFormat(format!(
            "{}: root element must be <tileset>",
            path.display()
        )));
    }
    let mut ts = parse_tileset_body(root)?;
    ts.first_gid = first_gid;
    if ts.name.is_empty() {
        ts.name = file_stem(path);
    }
    Ok(ts)
}

fn parse_tileset_ref(node: Node<'_, '_>, map_dir: &Path) -> Result<TilesetRef, MapError> {
    let first_gid: u32 = required(node, "firstgid")?;

    let Some(source) = node.attribute("source") else {
        // Embedded tileset: everything is inline.
        let mut ts = parse_tileset_body(node)?;
        ts.first_gid = first_gid;
        return Ok(ts);
    };

    if !source.ends_with(".tsx") {
        return Err(MapError::UnsupportedFormat(format!(
            "external tileset must be TSX: {source}"
        )));
    }

    let mut ts = decode_tsx_file(&map_dir.join(source), first_gid)?;
    // Re-anchor the image on the map directory.
    let tsx_dir = Path::new(source).parent().map(Path::to_path_buf).unwrap_or_default();
    ts.image = tsx_dir.join(&ts.image);
    ts.source = source.to_owned();
    debug!(tileset = %ts.name, first_gid, tiles = ts.tile_count, "tileset_parsed");
    Ok(ts)
}

fn parse_tileset_body(node: Node<'_, '_>) -> Result<TilesetRef, MapError> {
    let mut ts = TilesetRef {
        name: node.attribute("name").unwrap_or_default().to_owned(),
        tile_w: required(node, "tilewidth")?,
        tile_h: required(node, "tileheight")?,
        tile_count: required(node, "tilecount")?,
        columns: required(node, "columns")?,
        spacing: optional(node, "spacing")?.unwrap_or(0),
        margin: optional(node, "margin")?.unwrap_or(0),
        properties: parse_properties(node)?,
        ..Default::default()
    };

    if let Some(image) = node.children().find(|n| n.has_tag_name("image")) {
        let source = image
            .attribute("source")
            .ok_or_else(|| MapError::missing("image", "source"))?;
        ts.image = PathBuf::from(source);
        ts.image_size = match (optional(image, "width")?, optional(image, "height")?) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };
    }

    for tile in node.children().filter(|n| n.has_tag_name("tile")) {
        let id: u32 = required(tile, "id")?;

        let props = parse_properties(tile)?;
        if !props.is_empty() {
            ts.tile_properties.insert(id, props);
        }

        if let Some(anim) = tile.children().find(|n| n.has_tag_name("animation")) {
            let frames = anim
                .children()
                .filter(|n| n.has_tag_name("frame"))
                .map(|f| {
                    Ok(Frame {
                        tile_id: required(f, "tileid")?,
                        duration_ms: required(f, "duration")?,
                    })
                })
                .collect::<Result<Vec<_>, MapError>>()?;
            ts.animations.insert(id, AnimationDef { frames });
        }
    }

    Ok(ts)
}

fn parse_layer(node: Node<'_, '_>) -> Result<Layer, MapError> {
    let name = node.attribute("name").unwrap_or_default().to_owned();
    let width: usize = required(node, "width")?;
    let height: usize = required(node, "height")?;

    let data = match node.children().find(|n| n.has_tag_name("data")) {
        Some(data) => match data.attribute("encoding") {
            Some("csv") => parse_csv(&name, data.text().unwrap_or_default())?,
            Some(other) => {
                return Err(MapError::UnsupportedEncoding {
                    layer: name,
                    encoding: other.to_owned(),
                })
            }
            // Legacy XML layout: one <tile gid=".."/> per cell.
            None => data
                .children()
                .filter(|n| n.has_tag_name("tile"))
                .map(|t| optional(t, "gid").map(|g| g.unwrap_or(0)))
                .collect::<Result<Vec<u32>, _>>()?,
        },
        None => Vec::new(),
    };

    Ok(Layer {
        id: optional(node, "id")?.unwrap_or(0),
        name,
        width,
        height,
        data,
        visible: optional::<u8>(node, "visible")?.map_or(true, |v| v != 0),
        opacity: optional(node, "opacity")?.unwrap_or(1.0),
        offset: vec2(
            optional(node, "offsetx")?.unwrap_or(0.0),
            optional(node, "offsety")?.unwrap_or(0.0),
        ),
        properties: parse_properties(node)?,
    })
}

/// Splits CSV layer data into raw gids.
pub fn parse_csv(layer: &str, text: &str) -> Result<Vec<u32>, MapError> {
    let text = text.trim().trim_end_matches(',');
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(str::trim)
        .map(|entry| {
            entry.parse::<u32>().map_err(|_| MapError::InvalidTileData {
                layer: layer.to_owned(),
                value: entry.to_owned(),
            })
        })
        .collect()
}

fn parse_object(node: Node<'_, '_>) -> Result<RawObject, MapError> {
    let class_name = node
        .attribute("class")
        .or_else(|| node.attribute("type"))
        .unwrap_or_default();

    Ok(RawObject {
        id: optional(node, "id")?.unwrap_or(0),
        name: node.attribute("name").unwrap_or_default().to_owned(),
        class_name: class_name.to_owned(),
        gid: optional(node, "gid")?,
        x: optional(node, "x")?.unwrap_or(0.0),
        y: optional(node, "y")?.unwrap_or(0.0),
        width: optional(node, "width")?,
        height: optional(node, "height")?,
        visible: optional::<u8>(node, "visible")?.map_or(true, |v| v != 0),
        properties: parse_properties(node)?,
    })
}

/// Reads the `<properties>` child of `node`, in document order.
fn parse_properties(node: Node<'_, '_>) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    let Some(props) = node.children().find(|n| n.has_tag_name("properties")) else {
        return Ok(out);
    };

    for p in props.children().filter(|n| n.has_tag_name("property")) {
        let name = p.attribute("name").unwrap_or_default();
        let kind = p.attribute("type").filter(|k| !k.is_empty());
        // Multi-line strings are stored as element text.
        let raw = p.attribute("value").or_else(|| p.text()).unwrap_or_default();
        if let Some(value) = convert_property(name, kind, raw)? {
            out.push(name, kind.map(str::to_owned), value);
        }
    }
    Ok(out)
}

fn convert_property(name: &str, kind: Option<&str>, raw: &str) -> Result<Option<PropertyValue>, MapError> {
    let parsed = match kind {
        None | Some("string") | Some("file") | Some("color") | Some("class") => {
            Some(PropertyValue::String(raw.to_owned()))
        }
        Some("bool") => raw.parse().ok().map(PropertyValue::Bool),
        Some("int") | Some("object") => raw.parse().ok().map(PropertyValue::I64),
        Some("float") => raw.parse().ok().map(PropertyValue::F32),
        Some(other) => {
            return Err(MapError::UnsupportedPropertyType {
                name: name.to_owned(),
                kind: other.to_owned(),
            })
        }
    };
    if parsed.is_none() {
        warn!(property = name, kind = ?kind, value = raw, "property_value_dropped");
    }
    Ok(parsed)
}

fn inside_tileset(node: Node<'_, '_>) -> bool {
    node.ancestors().skip(1).any(|a| a.has_tag_name("tileset"))
}

fn required<T: FromStr>(node: Node<'_, '_>, attr: &str) -> Result<T, MapError> {
    let element = node.tag_name().name();
    let raw = node
        .attribute(attr)
        .ok_or_else(|| MapError::missing(element, attr))?;
    raw.trim()
        .parse()
        .map_err(|_| MapError::invalid(element, attr, raw))
}

fn optional<T: FromStr>(node: Node<'_, '_>, attr: &str) -> Result<Option<T>, MapError> {
    node.attribute(attr)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| MapError::invalid(node.tag_name().name(), attr, raw))
        })
        .transpose()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="critters" tilewidth="16" tileheight="16" tilecount="8" columns="4">
 <image source="critters.png" width="64" height="32"/>
 <tile id="2">
  <properties><property name="solid" type="bool" value="true"/></properties>
  <animation>
   <frame tileid="2" duration="200"/>
   <frame tileid="3" duration="150"/>
  </animation>
 </tile>
</tileset>
"#;

    const TMX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="3" height="2" tilewidth="16" tileheight="16">
 <properties><property name="music" value="town.wav"/></properties>
 <tileset firstgid="1" source="sets/critters.tsx"/>
 <layer id="1" name="ground" width="3" height="2">
  <data encoding="csv">
1,2,3,
4,5,0
</data>
 </layer>
 <objectgroup id="2" name="things">
  <object id="1" name="gnome" gid="3" x="16" y="32" width="16" height="16">
   <properties>
    <property name="is_enemy" type="bool" value="true"/>
    <property name="hp" type="int" value="12"/>
   </properties>
  </object>
  <object id="2" name="gnome" x="0" y="0" width="8" height="8"/>
  <object id="3" name="marker" x="4" y="4"/>
 </objectgroup>
</map>
"#;

    fn write_fixture(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir.join("sets")).expect("create sets dir");
        fs::write(dir.join("sets/critters.tsx"), TSX).expect("write tsx");
        let map = dir.join("town.tmx");
        fs::write(&map, TMX).expect("write tmx");
        map
    }

    #[test]
    fn parses_map_layers_tilesets_and_objects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let map = write_fixture(dir.path());

        let doc = decode_tmx_file(&map).expect("decode");
        assert_eq!((doc.width, doc.height, doc.tile_w, doc.tile_h), (3, 2, 16, 16));
        assert_eq!(doc.properties.get_string("music"), Some("town.wav"));

        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.layers[0].data, vec![1, 2, 3, 4, 5, 0]);

        let ts = &doc.tilesets[0];
        assert_eq!(ts.name, "critters");
        assert_eq!(ts.image, Path::new("sets").join("critters.png"));
        assert_eq!(ts.image_size, Some((64, 32)));
        assert_eq!(ts.tile_properties[&2].get_bool("solid"), Some(true));
        assert_eq!(
            ts.animations[&2].frames,
            vec![
                Frame { tile_id: 2, duration_ms: 200 },
                Frame { tile_id: 3, duration_ms: 150 }
            ]
        );

        let names: Vec<_> = doc.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["gnome", "gnome_1"]);
        let gnome = &doc.objects[0];
        assert_eq!(gnome.layer_name, "things");
        assert_eq!(gnome.y, 16.0);
        assert_eq!(gnome.properties.get_bool("is_enemy"), Some(true));
        assert_eq!(gnome.properties.get_i64("hp"), Some(12));
    }

    #[test]
    fn csv_round_trips_through_tile_id_at() {
        let data: Vec<u32> = (0..12).map(|i| (i * 7) % 5).collect();
        let csv = data.iter().map(u32::to_string).collect::<Vec<_>>().join(",\n");
        let parsed = parse_csv("l", &csv).expect("csv");
        let layer = Layer {
            id: 0,
            name: "l".into(),
            width: 4,
            height: 3,
            data: parsed,
            visible: true,
            opacity: 1.0,
            offset: Vec2::ZERO,
            properties: Properties::new(),
        };
        let mut read_back = Vec::new();
        for y in 0..3 {
            for x in 0..4 {
                read_back.push(layer.tile_id_at(x, y).expect("in bounds"));
            }
        }
        assert_eq!(read_back, data);
    }

    #[test]
    fn rejects_non_numeric_csv_entry() {
        let err = parse_csv("ground", "1,2,x").unwrap_err();
        assert!(matches!(err, MapError::InvalidTileData { ref value, .. } if value == "x"));
    }

    #[test]
    fn missing_map_attribute_is_reported_by_name() {
        let tmx = r#"<map width="3" tilewidth="16" tileheight="16"></map>"#;
        let err = decode_tmx_str(tmx, Path::new("m.tmx")).unwrap_err();
        assert!(matches!(
            err,
            MapError::MissingAttribute { ref element, ref attribute } if element == "map" && attribute == "height"
        ));
    }

    #[test]
    fn non_numeric_map_attribute_is_rejected() {
        let tmx = r#"<map width="three" height="2" tilewidth="16" tileheight="16"></map>"#;
        let err = decode_tmx_str(tmx, Path::new("m.tmx")).unwrap_err();
        assert!(matches!(err, MapError::InvalidAttribute { ref value, .. } if value == "three"));
    }

    #[test]
    fn missing_tileset_file_is_resource_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let map = dir.path().join("m.tmx");
        fs::write(
            &map,
            r#"<map width="1" height="1" tilewidth="16" tileheight="16"><tileset firstgid="1" source="nope.tsx"/></map>"#,
        )
        .expect("write");
        let err = decode_tmx_file(&map).unwrap_err();
        assert!(matches!(err, MapError::ResourceNotFound { .. }));
    }

    #[test]
    fn base64_layers_are_unsupported() {
        let tmx = r#"<map width="1" height="1" tilewidth="16" tileheight="16">
            <layer name="g" width="1" height="1"><data encoding="base64">AQAAAA==</data></layer></map>"#;
        let err = decode_tmx_str(tmx, Path::new("m.tmx")).unwrap_err();
        assert!(matches!(err, MapError::UnsupportedEncoding { .. }));
    }

    #[test]
    fn embedded_tileset_collision_groups_are_not_map_objects() {
        let tmx = r#"<map width="1" height="1" tilewidth="16" tileheight="16">
            <tileset firstgid="1" name="inline" tilewidth="16" tileheight="16" tilecount="1" columns="1">
              <image source="t.png" width="16" height="16"/>
              <tile id="0"><objectgroup><object id="9" name="shape" x="0" y="0" width="4" height="4"/></objectgroup></tile>
            </tileset>
            <layer name="g" width="1" height="1"><data encoding="csv">1</data></layer>
            <objectgroup name="objs"><object id="1" name="wall" x="0" y="0" width="16" height="16"/></objectgroup>
            </map>"#;
        let doc = decode_tmx_str(tmx, Path::new("m.tmx")).expect("decode");
        assert_eq!(doc.tilesets[0].name, "inline");
        assert_eq!(doc.objects.len(), 1);
        assert_eq!(doc.objects[0].name, "wall");
    }

    #[test]
    fn unknown_property_type_is_an_error() {
        let tmx = r#"<map width="1" height="1" tilewidth="16" tileheight="16">
            <properties><property name="mystery" type="vector" value="1,2"/></properties></map>"#;
        let err = decode_tmx_str(tmx, Path::new("m.tmx")).unwrap_err();
        assert!(matches!(err, MapError::UnsupportedPropertyType { .. }));
    }
}
