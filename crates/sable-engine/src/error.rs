//! Top-level engine error.

use crate::config::ConfigError;
use crate::graphics::GraphicsError;
use crate::input::InputError;
use crate::script::ScriptError;
use crate::template::TemplateError;

/// Any error that aborts an engine operation (construction, map load, actor
/// creation, or a frame).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Graphics(#[from] GraphicsError),

    #[error(transparent)]
    Input(#[from] InputError),
}
