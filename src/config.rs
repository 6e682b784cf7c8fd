//! Engine tunables.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Top-level engine configuration. Every field has a default, so a partial
/// JSON file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory map names are resolved against.
    pub asset_root: PathBuf,
    /// Viewport and zoom.
    pub camera: CameraConfig,
    /// Collision tuning.
    pub interaction: InteractionConfig,
    /// Sprite-strip animation tuning.
    pub animation: AnimationConfig,
}

/// Camera settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Viewport width in screen pixels.
    pub viewport_width: f32,
    /// Viewport height in screen pixels.
    pub viewport_height: f32,
    /// World-to-screen scale, must be positive.
    pub zoom: f32,
}

/// Collision settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Non-wall objects collide through a centred box whose sides are the
    /// object's divided by this factor.
    pub hitbox_shrink: f64,
    /// Health restored by an apple without a `heal` property.
    pub apple_heal: i32,
}

/// Animation settings for objects without a tileset animation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Duration of each sprite-strip frame.
    pub strip_frame_ms: u64,
    /// Upper bound on sprite-strip length.
    pub strip_max_frames: u32,
    /// Base object names that always animate, compared ignoring case.
    pub perpetual: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            asset_root: PathBuf::from("assets"),
            camera: CameraConfig::default(),
            interaction: InteractionConfig::default(),
            animation: AnimationConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            viewport_width: 700.0,
            viewport_height: 700.0,
            zoom: 3.0,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            hitbox_shrink: 4.0,
            apple_heal: 10,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            strip_frame_ms: 300,
            strip_max_frames: 16,
            perpetual: Vec::new(),
        }
    }
}

impl AnimationConfig {
    /// Whether `base_name` is listed in `perpetual`.
    pub fn is_perpetual(&self, base_name: &str) -> bool {
        self.perpetual
            .iter()
            .any(|p| p.eq_ignore_ascii_case(base_name))
    }
}

impl EngineConfig {
    /// Reads a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        serde_json::from_str(&txt).with_context(|| format!("Parsing config file {}", path.display()))
    }
}
