use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Scene built when the surface is first created.
    pub initial_scene: String,
    pub clear_color: [f32; 4],
    /// Directory textures are loaded from.
    pub assets_dir: PathBuf,
    pub camera: CameraConfig,
    pub bloom: BloomConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            initial_scene: "cosmic-battle".to_string(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            assets_dir: PathBuf::from("assets"),
            camera: CameraConfig::default(),
            bloom: BloomConfig::default(),
        }
    }
}

impl RendererConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub center: [f32; 3],
    pub up: [f32; 3],
    /// Eye distance at the far end of the zoom loop.
    pub zoom_far: f32,
    pub zoom_near: f32,
    /// Seconds for one far-near-far cycle.
    pub zoom_period: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, 6.0],
            center: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            zoom_far: 20.0,
            zoom_near: 10.0,
            zoom_period: 30.0,
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    pub enabled: bool,
    /// Luminance above which pixels contribute to the glow.
    pub threshold: f32,
    pub intensity: f32,
    /// The bright pass and blur run at 1/downsample of the screen size.
    pub downsample: u32,
    /// Horizontal+vertical blur cycles.
    pub blur_iterations: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.7,
            intensity: 0.8,
            downsample: 4,
            blur_iterations: 2,
        }
    }
}
