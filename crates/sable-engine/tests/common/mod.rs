//! Shared fixtures: a throwaway data directory and a headless engine.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use sable_engine::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// A data directory in a temp dir, with the standard layout.
pub struct DataDir {
    dir: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["actors", "maps", "textures", "scripts"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a blank `width` x `height` PNG texture.
    pub fn texture(&self, name: &str, width: u32, height: u32) -> &Self {
        let path = self.path().join("textures").join(format!("{name}.png"));
        image::RgbaImage::new(width, height).save(path).unwrap();
        self
    }

    pub fn actor(&self, name: &str, template: Value) -> &Self {
        self.write("actors", name, &template.to_string())
    }

    pub fn map(&self, name: &str, template: Value) -> &Self {
        self.write("maps", name, &template.to_string())
    }

    pub fn write(&self, dir: &str, name: &str, text: &str) -> &Self {
        let path = self.path().join(dir).join(format!("{name}.json"));
        fs::write(path, text).unwrap();
        self
    }

    /// Fixed-step config at 60 FPS with no gravity.
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            data_dir: self.path().to_owned(),
            title: "Test".to_owned(),
            gravity: Vector2::ZERO,
            ..EngineConfig::default()
        }
    }
}

pub const PERIOD: f64 = 1.0 / 60.0;

pub fn engine(config: EngineConfig) -> (Engine<NativeHost>, HeadlessController) {
    engine_with(config, |_| NativeHost::new())
}

/// Build a headless engine; `make_host` may capture the shared world.
pub fn engine_with(
    config: EngineConfig,
    make_host: impl FnOnce(&SharedWorld) -> NativeHost,
) -> (Engine<NativeHost>, HeadlessController) {
    let (backend, controller) = HeadlessBackend::new(false);
    let engine = Engine::new(config, Box::new(backend), |world| Ok(make_host(world))).unwrap();
    (engine, controller)
}

/// A dynamic 32x32 box with a sprite.
pub fn ball_template() -> Value {
    serde_json::json!({
        "sprite": { "filename": "ball" },
        "physics": {
            "type": "dynamic",
            "shape": { "type": "box", "width": 32.0, "height": 32.0 }
        }
    })
}

pub fn close(a: Vector2, b: Vector2) -> bool {
    (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
}
