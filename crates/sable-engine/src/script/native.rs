//! Script host backed by Rust closures.
//!
//! Modules, classes and methods are registered up front; a class is a
//! factory closure producing a [`NativeObject`] whose methods capture any
//! per-instance state. Every module and object answers `_set_data` with a
//! no-op unless it registers its own.

use std::collections::HashMap;
use std::rc::Rc;

use super::{ScriptError, ScriptHost, ScriptValue, TraceFrame, ENGINE_MODULE, SET_DATA_METHOD};

/// A native script function. An `Err` becomes a [`ScriptError::Runtime`].
pub type NativeFn = Rc<dyn Fn(&[ScriptValue]) -> Result<(), String>>;

type Factory = Rc<dyn Fn() -> Result<NativeObject, String>>;

fn no_op() -> NativeFn {
    Rc::new(|_| Ok(()))
}

fn runtime_error(owner: &str, function: &str, message: String) -> ScriptError {
    ScriptError::Runtime {
        message,
        traceback: vec![TraceFrame {
            file: owner.to_owned(),
            line: 0,
            function: function.to_owned(),
        }],
    }
}

// ---------------------------------------------------------------------------
// Registration types
// ---------------------------------------------------------------------------

/// A named set of functions and classes.
pub struct NativeModule {
    name: String,
    functions: HashMap<String, NativeFn>,
    classes: HashMap<String, Rc<NativeClass>>,
}

impl NativeModule {
    pub fn new(name: impl Into<String>) -> Self {
        let mut functions = HashMap::new();
        functions.insert(SET_DATA_METHOD.to_owned(), no_op());
        Self {
            name: name.into(),
            functions,
            classes: HashMap::new(),
        }
    }

    pub fn with_function(
        mut self,
        name: &str,
        function: impl Fn(&[ScriptValue]) -> Result<(), String> + 'static,
    ) -> Self {
        self.functions.insert(name.to_owned(), Rc::new(function));
        self
    }

    pub fn with_class(mut self, name: &str, mut class: NativeClass) -> Self {
        class.name = name.to_owned();
        self.classes.insert(name.to_owned(), Rc::new(class));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A constructor for [`NativeObject`]s.
pub struct NativeClass {
    name: String,
    factory: Factory,
}

impl NativeClass {
    /// `factory` runs once per instantiation; an `Err` fails construction.
    pub fn new(factory: impl Fn() -> Result<NativeObject, String> + 'static) -> Self {
        Self {
            name: String::new(),
            factory: Rc::new(factory),
        }
    }
}

/// An instance: a table of bound methods.
pub struct NativeObject {
    class: String,
    methods: HashMap<String, NativeFn>,
}

impl NativeObject {
    pub fn new() -> Self {
        let mut methods = HashMap::new();
        methods.insert(SET_DATA_METHOD.to_owned(), no_op());
        Self {
            class: String::new(),
            methods,
        }
    }

    pub fn with_method(
        mut self,
        name: &str,
        method: impl Fn(&[ScriptValue]) -> Result<(), String> + 'static,
    ) -> Self {
        self.methods.insert(name.to_owned(), Rc::new(method));
        self
    }
}

impl Default for NativeObject {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference to a native host object.
#[derive(Clone)]
pub enum NativeHandle {
    Module(Rc<NativeModule>),
    Class(Rc<NativeClass>),
    Object(Rc<NativeObject>),
    Function {
        /// Module or class the function was looked up on.
        owner: String,
        name: String,
        function: NativeFn,
    },
}

// ---------------------------------------------------------------------------
// NativeHost
// ---------------------------------------------------------------------------

/// In-process script host. Starts with an empty engine module registered.
pub struct NativeHost {
    modules: HashMap<String, Rc<NativeModule>>,
    initialized: bool,
}

impl NativeHost {
    pub fn new() -> Self {
        let mut host = Self {
            modules: HashMap::new(),
            initialized: false,
        };
        host.add_module(NativeModule::new(ENGINE_MODULE));
        host
    }

    /// Register a module, replacing one with the same name.
    pub fn add_module(&mut self, module: NativeModule) {
        self.modules.insert(module.name.clone(), Rc::new(module));
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptHost for NativeHost {
    type Handle = NativeHandle;

    fn initialize(&mut self) -> Result<(), ScriptError> {
        if self.initialized {
            return Err(ScriptError::AlreadyInitialized);
        }
        self.initialized = true;
        tracing::info!(modules = self.modules.len(), "native script host initialized");
        Ok(())
    }

    fn finalize(&mut self) {
        self.initialized = false;
        tracing::info!("native script host finalized");
    }

    fn import_module(&mut self, name: &str) -> Result<NativeHandle, ScriptError> {
        self.modules
            .get(name)
            .map(|module| NativeHandle::Module(Rc::clone(module)))
            .ok_or_else(|| ScriptError::ModuleNotFound {
                module: name.to_owned(),
                message: "no native module with that name".to_owned(),
            })
    }

    fn get_attr(&mut self, target: &NativeHandle, name: &str) -> Option<NativeHandle> {
        match target {
            NativeHandle::Module(module) => {
                if let Some(function) = module.functions.get(name) {
                    return Some(NativeHandle::Function {
                        owner: module.name.clone(),
                        name: name.to_owned(),
                        function: Rc::clone(function),
                    });
                }
                module
                    .classes
                    .get(name)
                    .map(|class| NativeHandle::Class(Rc::clone(class)))
            }
            NativeHandle::Object(object) => {
                object.methods.get(name).map(|method| NativeHandle::Function {
                    owner: object.class.clone(),
                    name: name.to_owned(),
                    function: Rc::clone(method),
                })
            }
            NativeHandle::Class(_) | NativeHandle::Function { .. } => None,
        }
    }

    fn instantiate(&mut self, class: &NativeHandle) -> Result<NativeHandle, ScriptError> {
        let NativeHandle::Class(class) = class else {
            return Err(runtime_error("<native>", "__init__", "object is not a class".to_owned()));
        };
        let mut object =
            (class.factory)().map_err(|message| runtime_error(&class.name, "__init__", message))?;
        object.class = class.name.clone();
        Ok(NativeHandle::Object(Rc::new(object)))
    }

    fn call(&mut self, callable: &NativeHandle, args: &[ScriptValue]) -> Result<(), ScriptError> {
        match callable {
            NativeHandle::Function { owner, name, function } => {
                function(args).map_err(|message| runtime_error(owner, name, message))
            }
            _ => Err(runtime_error("<native>", "<call>", "object is not callable".to_owned())),
        }
    }
}
