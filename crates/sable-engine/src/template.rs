//! Declarative actor and map templates.
//!
//! Actor templates live in `<data>/actors/<name>.json`:
//!
//! ```json
//! {
//!   "sprite":  { "filename": "ball", "origin": { "x": 8, "y": 8 } },
//!   "script":  { "module": "ball", "class": "Ball", "update": "update", "init": "init" },
//!   "physics": { "type": "dynamic",
//!                "shape": { "type": "box", "width": 16, "height": 16 } }
//! }
//! ```
//!
//! Every section is optional. `physics.shape` may also be an array of shape
//! objects, added as fixtures in order. Maps live in `<data>/maps/<name>.json`
//! and are an ordered list of `{ "filename", "position", "rotation" }`.
//!
//! The reader only checks structure. Semantic checks (body type, supported
//! shapes) happen when a template is turned into physics data, so an actor
//! with a bad physics section fails while it is being added.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::physics::BodyType;
use crate::vector2::Vector2;

/// Errors raised while reading or interpreting a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid JSON or does not match the template schema.
    #[error("invalid template {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// `physics.type` is not `"dynamic"` or `"static"`.
    #[error("invalid physics type '{0}' (expected \"dynamic\" or \"static\")")]
    InvalidBodyType(String),

    /// `physics.shape.type` names an unsupported shape.
    #[error("unsupported physics shape '{0}'")]
    InvalidShape(String),

    /// A shape is missing a field its type requires.
    #[error("physics shape '{shape}' is missing '{field}'")]
    MissingField { shape: String, field: &'static str },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, TemplateError> {
    let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| TemplateError::Json {
        path: path.to_owned(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Actor templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActorTemplate {
    #[serde(default)]
    pub sprite: Option<SpriteTemplate>,
    #[serde(default)]
    pub script: Option<ScriptTemplate>,
    #[serde(default)]
    pub physics: Option<PhysicsTemplate>,
}

impl ActorTemplate {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        read_json(path)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpriteTemplate {
    /// Texture name, resolved to `<data>/textures/<filename>.png`.
    pub filename: String,
    /// Local origin in texture pixels. Defaults to the texture center.
    #[serde(default)]
    pub origin: Option<Vector2>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptTemplate {
    pub module: String,
    /// Class to instantiate. Empty means module-level functions.
    pub class: String,
    #[serde(default)]
    pub update: Option<String>,
    #[serde(default)]
    pub init: Option<String>,
}

impl ScriptTemplate {
    /// The class name, or `None` for a module-level script.
    pub fn class(&self) -> Option<&str> {
        (!self.class.is_empty()).then_some(self.class.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhysicsTemplate {
    #[serde(rename = "type")]
    pub body_type: String,
    #[serde(rename = "shape")]
    shapes: Shapes,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum Shapes {
    One(ShapeTemplate),
    Many(Vec<ShapeTemplate>),
}

impl PhysicsTemplate {
    /// The body type. Only the exact strings `"dynamic"` and `"static"` are
    /// accepted.
    pub fn body_type(&self) -> Result<BodyType, TemplateError> {
        match self.body_type.as_str() {
            "dynamic" => Ok(BodyType::Dynamic),
            "static" => Ok(BodyType::Static),
            other => Err(TemplateError::InvalidBodyType(other.to_owned())),
        }
    }

    /// Shapes in declaration order.
    pub fn shapes(&self) -> &[ShapeTemplate] {
        match &self.shapes {
            Shapes::One(shape) => std::slice::from_ref(shape),
            Shapes::Many(shapes) => shapes,
        }
    }
}

fn default_density() -> f64 {
    1.0
}

fn default_friction() -> f64 {
    0.8
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShapeTemplate {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default = "default_density")]
    pub density: f64,
    #[serde(default = "default_friction")]
    pub friction: f64,
}

/// A validated fixture description, sizes in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fixture {
    Box {
        size: Vector2,
        density: f64,
        friction: f64,
    },
}

impl ShapeTemplate {
    /// Validate the shape. Only boxes are supported.
    pub fn fixture(&self) -> Result<Fixture, TemplateError> {
        match self.kind.as_str() {
            "box" => {
                let width = self.width.ok_or_else(|| self.missing("width"))?;
                let height = self.height.ok_or_else(|| self.missing("height"))?;
                Ok(Fixture::Box {
                    size: Vector2::new(width, height),
                    density: self.density,
                    friction: self.friction,
                })
            }
            other => Err(TemplateError::InvalidShape(other.to_owned())),
        }
    }

    fn missing(&self, field: &'static str) -> TemplateError {
        TemplateError::MissingField {
            shape: self.kind.clone(),
            field,
        }
    }
}

// ---------------------------------------------------------------------------
// Map templates
// ---------------------------------------------------------------------------

/// One actor placement in a map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapEntry {
    /// Actor template name.
    pub filename: String,
    pub position: Vector2,
    /// Degrees, applied after the position.
    #[serde(default)]
    pub rotation: f64,
}

/// Ordered actor placements.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct MapTemplate {
    pub entries: Vec<MapEntry>,
}

impl MapTemplate {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        read_json(path)
    }
}
