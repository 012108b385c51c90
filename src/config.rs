use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::{DEFAULT_FAR, DEFAULT_NEAR};
use crate::cli::Cli;
use crate::controls::Controls;
use crate::geometry::ShapeKind;
use crate::renderer::DEFAULT_CLEAR_COLOR;
use crate::texture::TextureAsset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Fire Viewer".to_string(),
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    /// Draw order
    pub shapes: Vec<ShapeKind>,
    pub center: [f32; 3],
    pub radius: f32,
    pub clear_color: [f32; 4],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            shapes: vec![ShapeKind::Icosphere],
            center: [0.0; 3],
            radius: 1.0,
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

impl SceneConfig {
    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.center)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 5.0],
            target: [0.0; 3],
            fov_y_degrees: 45.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextureConfig {
    pub directory: PathBuf,
    /// File names, bound to units 0, 1, ... in order
    pub units: Vec<String>,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("texture"),
            units: vec!["fire.jpeg".to_string(), "gradient2.png".to_string()],
        }
    }
}

/// Everything the viewer reads at startup
///
/// Precedence: built-in defaults, then the JSON file, then command-line flags.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub controls: Controls,
    pub scene: SceneConfig,
    pub camera: CameraConfig,
    pub textures: TextureConfig,
    pub hide_ui: bool,
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if cli.no_ui {
            self.hide_ui = true;
        }
        if let Some(level) = cli.tessellations {
            self.controls.tessellations = level;
        }
        if let Some(speed) = cli.speed {
            self.controls.speed = speed;
        }
        if let Some(height) = cli.fire_height {
            self.controls.fire_height = height;
        }
        if let Some(shading) = cli.shader {
            self.controls.shading = shading;
        }
        if !cli.shapes.is_empty() {
            self.scene.shapes = cli.shapes.clone();
        }
        if let Some(width) = cli.width {
            self.window.width = width;
        }
        if let Some(height) = cli.height {
            self.window.height = height;
        }
        if let Some(dir) = &cli.texture_dir {
            self.textures.directory = dir.clone();
        }
    }

    pub fn texture_assets(&self) -> Vec<TextureAsset> {
        self.textures
            .units
            .iter()
            .enumerate()
            .map(|(unit, name)| TextureAsset {
                unit: unit as u32,
                path: self.textures.directory.join(name),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::Shading;
    use clap::Parser;

    #[test]
    fn empty_file_yields_defaults() {
        let config: ViewerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.scene.shapes, vec![ShapeKind::Icosphere]);
        assert_eq!(config.camera.position, [0.0, 0.0, 5.0]);
    }

    #[test]
    fn file_values_override_defaults() {
        let config: ViewerConfig = serde_json::from_str(
            r#"{
                "window": { "width": 1280 },
                "controls": { "tessellations": 3 },
                "scene": { "shapes": ["cube", "square"], "radius": 2.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.controls.tessellations, 3);
        assert_eq!(config.scene.shapes, vec![ShapeKind::Cube, ShapeKind::Square]);
        assert_eq!(config.scene.radius, 2.0);
    }

    #[test]
    fn cli_overrides_file() {
        let mut config = ViewerConfig::default();
        config.controls.speed = 3.0;
        let cli = Cli::parse_from(["fire-viewer", "--speed", "7", "--shader", "lambert", "--no-ui"]);
        config.apply_cli(&cli);
        assert_eq!(config.controls.speed, 7.0);
        assert_eq!(config.controls.shading, Shading::Lambert);
        assert!(config.hide_ui);
    }

    #[test]
    fn texture_units_follow_list_order() {
        let config = ViewerConfig::default();
        let assets = config.texture_assets();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].unit, 0);
        assert_eq!(assets[0].path, PathBuf::from("texture/fire.jpeg"));
        assert_eq!(assets[1].unit, 1);
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = ViewerConfig::load(Path::new("no/such/viewer.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("viewer.json"));
    }
}
