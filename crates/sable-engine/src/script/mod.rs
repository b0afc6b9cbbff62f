//! Per-actor behavior scripts.
//!
//! A [`Script`] binds one actor to a module in the scripting host, and
//! optionally to an instance of a class from that module. Script methods are
//! reached through symbolic keys (`"update"`, `"init"`, ...) registered with
//! [`Script::add_method`]; calling a key that was never registered does
//! nothing, which is how actors opt out of a callback.
//!
//! The host itself sits behind the [`ScriptHost`] trait. The engine ships
//! [`NativeHost`] (Rust closures); the `sable-python` crate provides the
//! CPython host. Host objects are held as `H::Handle` values whose `Drop`
//! releases them, so every exit path (including errors during construction)
//! gives the references back.
//!
//! Arguments cross the boundary as [`ScriptValue`]s and are marshalled by the
//! host in one place.

mod engine;
mod native;

use std::collections::HashMap;
use std::fmt;

use crate::actor::ActorId;
use crate::arena_key;

pub use engine::ScriptEngine;
pub use native::{NativeClass, NativeFn, NativeHandle, NativeHost, NativeModule, NativeObject};

/// Module that backs the engine-level script. It has no class.
pub const ENGINE_MODULE: &str = "sable";

/// Key under which every script registers its data setter.
pub const SET_DATA_KEY: &str = "set_data";

/// Script-side name of the data setter.
pub const SET_DATA_METHOD: &str = "_set_data";

arena_key! {
    /// Handle to a script owned by a [`ScriptEngine`].
    pub struct ScriptId;
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Opaque data a script uses to reach back into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptData {
    /// The engine itself (bound to the engine-level script).
    Engine,
    /// The actor that owns the script.
    Actor(ActorId),
}

/// An argument passed to a script method.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Data(ScriptData),
}

/// One frame of a script traceback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File \"{}\", line {}, in {}", self.file, self.line, self.function)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the scripting layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    /// The host could not import the module.
    #[error("unable to import script module '{module}': {message}")]
    ModuleNotFound {
        module: String,
        /// Host-provided reason.
        message: String,
    },

    /// The module has no attribute with the class name.
    #[error("unable to find class '{class}' in module '{module}'")]
    ClassNotFound { module: String, class: String },

    /// Calling the class raised an error.
    #[error("unable to instantiate '{class}': {message}")]
    Instantiation { class: String, message: String },

    /// The method key was registered before.
    #[error("method key '{key}' is already registered")]
    MethodExists { key: String },

    /// The instance (or module) has no attribute with the method name.
    #[error("unable to find script method '{name}'")]
    MethodNotFound { name: String },

    /// The host was initialized twice.
    #[error("script host is already initialized")]
    AlreadyInitialized,

    /// The script id does not resolve (the script engine was reset).
    #[error("no script with id {0}")]
    UnknownScript(ScriptId),

    /// Script code raised an error.
    #[error("{message}")]
    Runtime {
        message: String,
        /// Innermost frame last.
        traceback: Vec<TraceFrame>,
    },
}

impl ScriptError {
    /// Log the message and each traceback frame at error level.
    pub fn log(&self) {
        tracing::error!("{self}");
        if let ScriptError::Runtime { traceback, .. } = self {
            for frame in traceback {
                tracing::error!("  {frame}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptHost
// ---------------------------------------------------------------------------

/// An embedded scripting runtime.
///
/// Implementations hold process-wide state between [`initialize`] and
/// [`finalize`]; [`ScriptEngine`] calls each exactly once.
///
/// [`initialize`]: ScriptHost::initialize
/// [`finalize`]: ScriptHost::finalize
pub trait ScriptHost {
    /// A reference to a host object. Dropping it releases the reference.
    type Handle: Clone;

    /// Bring the runtime up. A second call without a [`finalize`](Self::finalize)
    /// in between fails with [`ScriptError::AlreadyInitialized`].
    fn initialize(&mut self) -> Result<(), ScriptError>;

    /// Tear the runtime down. All handles must be dropped first.
    fn finalize(&mut self);

    /// Import a module by name. Fails with [`ScriptError::ModuleNotFound`].
    fn import_module(&mut self, name: &str) -> Result<Self::Handle, ScriptError>;

    /// Look up an attribute; `None` if it does not exist.
    fn get_attr(&mut self, target: &Self::Handle, name: &str) -> Option<Self::Handle>;

    /// Call a class object with no arguments.
    fn instantiate(&mut self, class: &Self::Handle) -> Result<Self::Handle, ScriptError>;

    /// Call a callable, discarding its result. Script errors come back as
    /// [`ScriptError::Runtime`].
    fn call(&mut self, callable: &Self::Handle, args: &[ScriptValue]) -> Result<(), ScriptError>;
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// A module (and optional class instance) bound to one actor or the engine.
pub struct Script<H: ScriptHost> {
    module_name: String,
    class_name: Option<String>,
    module: H::Handle,
    instance: Option<H::Handle>,
    methods: HashMap<String, H::Handle>,
}

impl<H: ScriptHost> Script<H> {
    /// Import `module`, instantiate `class` if given, and hand `data` to the
    /// script through its `_set_data` method.
    ///
    /// Either everything succeeds or the partially built script is dropped,
    /// releasing whatever it had acquired.
    pub fn new(
        host: &mut H,
        module: &str,
        class: Option<&str>,
        data: ScriptData,
    ) -> Result<Self, ScriptError> {
        let module_handle = host.import_module(module)?;

        let instance = match class {
            Some(class) => {
                let class_handle = host.get_attr(&module_handle, class).ok_or_else(|| {
                    ScriptError::ClassNotFound {
                        module: module.to_owned(),
                        class: class.to_owned(),
                    }
                })?;
                let instance = host.instantiate(&class_handle).map_err(|err| {
                    err.log();
                    ScriptError::Instantiation {
                        class: class.to_owned(),
                        message: err.to_string(),
                    }
                })?;
                Some(instance)
            }
            None => None,
        };

        let mut script = Self {
            module_name: module.to_owned(),
            class_name: class.map(str::to_owned),
            module: module_handle,
            instance,
            methods: HashMap::new(),
        };
        script.add_method(host, SET_DATA_KEY, SET_DATA_METHOD)?;
        script.call(host, SET_DATA_KEY, &[ScriptValue::Data(data)])?;

        tracing::debug!(module, class = ?class, ?data, "script created");
        Ok(script)
    }

    /// Bind `key` to the callable `name` on the instance (or on the module
    /// when there is no class).
    pub fn add_method(&mut self, host: &mut H, key: &str, name: &str) -> Result<(), ScriptError> {
        if self.methods.contains_key(key) {
            return Err(ScriptError::MethodExists { key: key.to_owned() });
        }
        let target = self.instance.as_ref().unwrap_or(&self.module);
        let callable = host
            .get_attr(target, name)
            .ok_or_else(|| ScriptError::MethodNotFound { name: name.to_owned() })?;
        self.methods.insert(key.to_owned(), callable);
        Ok(())
    }

    /// Invoke the method bound to `key`. Unregistered keys are a no-op.
    ///
    /// A script error is logged with its traceback and returned.
    pub fn call(&self, host: &mut H, key: &str, args: &[ScriptValue]) -> Result<(), ScriptError> {
        let Some(callable) = self.methods.get(key) else {
            return Ok(());
        };
        host.call(callable, args).inspect_err(|err| {
            tracing::error!(module = %self.module_name, key, "script method failed");
            err.log();
        })
    }

    /// Returns `true` if `key` has a bound method.
    pub fn has_method(&self, key: &str) -> bool {
        self.methods.contains_key(key)
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
