// tests/common/mod.rs
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use macroquad::prelude::{Image, WHITE};
use macroquad_tiled_rpg::EngineConfig;

pub const CRITTERS_TSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="critters" tilewidth="16" tileheight="16" tilecount="16" columns="4">
 <image source="critters.png" width="64" height="64"/>
 <tile id="0">
  <animation>
   <frame tileid="0" duration="200"/>
   <frame tileid="1" duration="200"/>
  </animation>
 </tile>
</tileset>
"#;

/// 20x20 map: a wall block, an apple, a goblin and a door to town.
pub const FOREST_TMX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="20" height="20" tilewidth="16" tileheight="16">
 <tileset firstgid="1" source="critters.tsx"/>
 <layer id="1" name="ground" width="20" height="20">
  <data encoding="csv">
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,
5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,0
</data>
 </layer>
 <objectgroup id="2" name="objects">
  <object id="1" name="wall" x="32" y="32" width="64" height="64"/>
  <object id="2" name="apple" x="200" y="200" width="16" height="16">
   <properties><property name="type" value="apple"/></properties>
  </object>
  <object id="3" name="goblin" gid="2" x="250" y="116" width="16" height="16">
   <properties><property name="is_enemy" type="bool" value="true"/></properties>
  </object>
  <object id="4" name="door" x="300" y="0" width="16" height="16">
   <properties>
    <property name="type" value="transition"/>
    <property name="destinationMap" value="town.map"/>
    <property name="spawnX" type="int" value="10"/>
    <property name="spawnY" type="int" value="20"/>
   </properties>
  </object>
  <object id="5" name="torch" gid="1" x="120" y="16" width="16" height="16"/>
 </objectgroup>
</map>
"#;

/// 10x10 map with a door back to the forest.
pub const TOWN_TMX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="10" height="10" tilewidth="16" tileheight="16">
 <tileset firstgid="1" source="critters.tsx"/>
 <layer id="1" name="ground" width="10" height="10">
  <data encoding="csv">
6,6,6,6,6,6,6,6,6,6,
6,6,6,6,6,6,6,6,6,6,
6,6,6,6,6,6,6,6,6,6,
6,6,6,6,6,6,6,6,6,6,
6,6,6,6,6,6,6,6,6,6,
6,6,6,6,6,6,6,6,6,6,
6,6,6,6,6,6,6,6,6,6,
6,6,6,6,6,6,6,6,6,6,
6,6,6,6,6,6,6,6,6,6,
6,6,6,6,6,6,6,6,6,6
</data>
 </layer>
 <objectgroup id="2" name="objects">
  <object id="1" name="door" x="0" y="0" width="16" height="16">
   <properties>
    <property name="type" value="transition"/>
    <property name="destinationMap" value="forest.tmx"/>
    <property name="spawnX" type="int" value="150"/>
    <property name="spawnY" type="int" value="150"/>
   </properties>
  </object>
 </objectgroup>
</map>
"#;

/// Writes both maps, the tileset and its image into `dir`.
pub fn write_world(dir: &Path) -> PathBuf {
    fs::write(dir.join("critters.tsx"), CRITTERS_TSX).expect("write tsx");
    fs::write(dir.join("forest.tmx"), FOREST_TMX).expect("write forest");
    fs::write(dir.join("town.tmx"), TOWN_TMX).expect("write town");
    let png = dir.join("critters.png");
    Image::gen_image_color(64, 64, WHITE).export_png(png.to_str().expect("utf-8 temp path"));
    dir.join("forest.tmx")
}

pub fn config(dir: &Path) -> EngineConfig {
    EngineConfig {
        asset_root: dir.to_path_buf(),
        ..Default::default()
    }
}
