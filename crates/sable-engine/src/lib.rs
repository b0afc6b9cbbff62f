//! Sable Engine -- a small real-time 2D game engine.
//!
//! Actors are described declaratively (JSON templates under a data
//! directory) and composed from optional components: a sprite owned by
//! [`Graphics`](graphics::Graphics), a rigid body owned by
//! [`Physics`](physics::Physics), and a behavior script owned by the
//! [`ScriptEngine`](script::ScriptEngine). The [`Engine`](engine::Engine)
//! ties them together in a fixed-step (or vsync-paced) frame loop.
//!
//! # Quick Start
//!
//! ```
//! use sable_engine::prelude::*;
//!
//! let (backend, controller) = HeadlessBackend::new(false);
//! let mut engine = Engine::new(EngineConfig::default(), Box::new(backend), |_world| {
//!     Ok(NativeHost::new())
//! })
//! .unwrap();
//!
//! assert!(engine.update_with_delta(1.0 / 60.0).unwrap());
//! assert_eq!(controller.frames_presented(), 1);
//!
//! controller.request_close();
//! assert!(!engine.update_with_delta(1.0 / 60.0).unwrap());
//! ```

#![deny(unsafe_code)]

pub mod actor;
pub mod arena;
pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod graphics;
pub mod input;
pub mod logging;
pub mod physics;
pub mod script;
pub mod template;
pub mod vector2;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use crate::actor::{Actor, ActorId};
    pub use crate::arena::{Arena, ArenaKey};
    pub use crate::camera::Camera;
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::engine::{Engine, FrameScheduler, SharedWorld, TimestepMode, World};
    pub use crate::error::EngineError;
    pub use crate::graphics::{
        Graphics, GraphicsError, HeadlessBackend, HeadlessController, RenderBackend, Sprite,
        SpriteId,
    };
    pub use crate::input::{Input, InputError, Key, KeyboardState, KEYBOARD_OFFSET};
    pub use crate::logging::{init_logging, log_message, LogLevel};
    pub use crate::physics::{BodyId, BodyType, Physics, PIXELS_PER_METER};
    pub use crate::script::{
        NativeClass, NativeHost, NativeModule, NativeObject, Script, ScriptData, ScriptEngine,
        ScriptError, ScriptHost, ScriptId, ScriptValue, TraceFrame,
    };
    pub use crate::template::TemplateError;
    pub use crate::vector2::Vector2;
}
