//! Engine configuration.
//!
//! [`EngineConfig`] is loaded once at startup (usually from a JSON file) and
//! handed to [`Engine::new`](crate::engine::Engine::new) by value. The engine
//! only ever exposes it as `&EngineConfig`, so it cannot change after
//! construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::vector2::Vector2;

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("invalid config {path}: {source}")]
    Json {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A value is outside its valid range.
    #[error("invalid config value for {field}: {value}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// The rejected value, formatted.
        value: String,
    },
}

/// Immutable startup configuration.
///
/// Every field has a default, so a configuration file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root of the data directory (`actors/`, `maps/`, `textures/`, `scripts/`).
    pub data_dir: PathBuf,
    /// Window title. The FPS counter is appended to it.
    pub title: String,
    /// Window position on screen, in pixels.
    pub window_position: Vector2,
    /// Window size, in pixels.
    pub window_size: Vector2,
    /// Open the window fullscreen.
    pub fullscreen: bool,
    /// Ask the render backend for vertical sync. When the backend reports
    /// vsync active the engine ticks once per update with the wall-clock delta.
    pub vsync: bool,
    /// Fixed-step tick rate used when vsync is not active.
    pub frames_per_second: f64,
    /// Gravity in pixels per second squared.
    pub gravity: Vector2,
    /// Enables debug-only input bindings (physics overlay toggle).
    pub debug: bool,
    /// Map loaded right after construction. Empty means no map.
    pub default_map: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            title: "Sable Engine".to_owned(),
            window_position: Vector2::new(0.0, 0.0),
            window_size: Vector2::new(1920.0, 1080.0),
            fullscreen: false,
            vsync: false,
            frames_per_second: 60.0,
            gravity: Vector2::new(0.0, 200.0),
            debug: false,
            default_map: String::new(),
        }
    }
}

impl EngineConfig {
    /// Read a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frames_per_second > 0.0 && self.frames_per_second.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "frames_per_second",
                value: self.frames_per_second.to_string(),
            });
        }
        Ok(())
    }

    /// Duration of one fixed-step tick, in seconds.
    pub fn frame_period(&self) -> f64 {
        1.0 / self.frames_per_second
    }

    /// Path of an actor template.
    pub fn actor_path(&self, name: &str) -> PathBuf {
        self.data_dir.join("actors").join(format!("{name}.json"))
    }

    /// Path of a map template.
    pub fn map_path(&self, name: &str) -> PathBuf {
        self.data_dir.join("maps").join(format!("{name}.json"))
    }

    /// Path of a sprite texture.
    pub fn texture_path(&self, name: &str) -> PathBuf {
        self.data_dir.join("textures").join(format!("{name}.png"))
    }

    /// Directory searched for script modules.
    pub fn scripts_dir(&self) -> PathBuf {
        self.data_dir.join("scripts")
    }
}
