use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context as _;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::render::shader_types::PushConstants;
use crate::scenes::SceneKind;
use crate::vulkan::window_settings::PresentMode;

/// Settings read from `config.json`. Missing fields fall back to their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub scene: SceneKind,
    pub present_mode: PresentMode,
    pub max_frames_in_flight: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub min_bounces: u32,
    pub max_bounces: u32,
    pub lens_aperture: f32,
    pub lens_focal_length: f32,
    /// Vertical field of view in degrees
    pub field_of_view: f32,
    pub camera_speed: f32,
    /// Radians per pixel of mouse movement
    pub mouse_sensitivity: f32,
    pub assets_path: PathBuf,
    /// Seed of the randomly placed spheres in the book scenes
    pub random_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scene: SceneKind::default(),
            present_mode: PresentMode::Fifo,
            max_frames_in_flight: 2,
            window_width: 1280,
            window_height: 720,
            min_bounces: 3,
            max_bounces: 64,
            lens_aperture: 0.0,
            lens_focal_length: 800.0,
            field_of_view: 45.0,
            camera_speed: 5.0,
            mouse_sensitivity: 0.005,
            assets_path: PathBuf::from("assets"),
            random_seed: 42,
        }
    }
}

impl Config {
    pub fn from_str(value: &str) -> anyhow::Result<Self> {
        serde_json::from_str(value).context("Could not parse config")
    }

    pub fn push_constants(&self) -> PushConstants {
        PushConstants {
            min_bounces: self.min_bounces,
            max_bounces: self.max_bounces.max(self.min_bounces),
            lens_aperture: self.lens_aperture,
            lens_focal_length: self.lens_focal_length,
        }
    }

    /// At least one frame is always in flight
    pub fn frames_in_flight(&self) -> usize {
        self.max_frames_in_flight.max(1) as usize
    }
}

pub struct ConfigFileLoader {
    pub path: PathBuf,
    config: Option<Config>,
}

impl ConfigFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: None,
        }
    }

    /// Reads the config file. A missing file is replaced by the defaults, which are written
    /// back so they can be edited.
    pub fn load_config(&mut self) -> anyhow::Result<&Config> {
        let config = match std::fs::read_to_string(&self.path) {
            Ok(content) => Config::from_str(&content)
                .with_context(|| format!("Invalid config file {:?}", self.path))?,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                warn!("No config file at {:?}, writing the defaults", self.path);
                self.config = Some(Config::default());
                self.save_config()?;
                Config::default()
            }
            Err(error) => {
                return Err(error).with_context(|| format!("Could not read {:?}", self.path))
            }
        };
        info!("Loaded config from {:?}", self.path);
        Ok(self.config.insert(config))
    }

    pub fn save_config(&self) -> anyhow::Result<()> {
        if let Some(config) = &self.config {
            let content = serde_json::to_string_pretty(config)?;
            std::fs::write(&self.path, content)
                .with_context(|| format!("Could not write {:?}", self.path))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = Config::from_str(r#"{ "max_bounces": 8, "scene": "CornellBoxWithSmoke" }"#)
            .unwrap();
        assert_eq!(config.max_bounces, 8);
        assert_eq!(config.scene, SceneKind::CornellBoxWithSmoke);
        assert_eq!(config.min_bounces, 3);
        assert_eq!(config.max_frames_in_flight, 2);
        assert_eq!(config.lens_focal_length, 800.0);
    }

    #[test]
    fn push_constants_never_have_fewer_max_than_min_bounces() {
        let config = Config {
            min_bounces: 10,
            max_bounces: 4,
            ..Config::default()
        };
        let push_constants = config.push_constants();
        assert_eq!(push_constants.min_bounces, 10);
        assert_eq!(push_constants.max_bounces, 10);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(Config::from_str("{ \"max_bounces\": \"many\" }").is_err());
    }

    #[test]
    fn missing_file_writes_defaults() {
        let path = std::env::temp_dir().join(format!(
            "round-tracer-config-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let mut loader = ConfigFileLoader::new(&path);
        assert_eq!(loader.load_config().unwrap(), &Config::default());

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(Config::from_str(&written).unwrap(), Config::default());
        std::fs::remove_file(&path).unwrap();
    }
}
