//! Embedded CPython implementation of [`ScriptHost`].

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use pyo3::prelude::*;
use pyo3::types::{PyList, PyModule, PyTuple};
use pyo3::IntoPyObject;
use sable_engine::engine::SharedWorld;
use sable_engine::script::{ScriptError, ScriptHost, ScriptValue, TraceFrame, ENGINE_MODULE};

use crate::bridge::{self, PyData};

/// Set while a host is initialized. The interpreter is process-wide, so only
/// one host may drive it at a time.
static HOST_ACTIVE: AtomicBool = AtomicBool::new(false);

/// A Python object owned by the engine.
///
/// `Py<T>` is only cloneable with the GIL held, so handles share one
/// reference.
#[derive(Clone)]
pub struct PyHandle(Rc<Py<PyAny>>);

impl PyHandle {
    fn new(object: Bound<'_, PyAny>) -> Self {
        Self(Rc::new(object.unbind()))
    }

    pub fn bind<'py>(&self, py: Python<'py>) -> &Bound<'py, PyAny> {
        self.0.bind(py)
    }
}

/// Script host backed by the embedded interpreter.
pub struct PythonHost {
    world: SharedWorld,
    scripts_dir: PathBuf,
    initialized: bool,
}

impl PythonHost {
    /// `world` is handed to the `sable` module on initialization; scripts
    /// are imported from `scripts_dir`.
    pub fn new(world: &SharedWorld, scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            world: Rc::clone(world),
            scripts_dir: scripts_dir.into(),
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn setup(&self, py: Python<'_>) -> PyResult<()> {
        let sys = py.import("sys")?;
        let path = sys.getattr("path")?.downcast_into::<PyList>()?;
        path.insert(0, self.scripts_dir.to_string_lossy().as_ref())?;

        let module = PyModule::new(py, ENGINE_MODULE)?;
        bridge::init_module(&module)?;
        sys.getattr("modules")?.set_item(ENGINE_MODULE, module)?;
        Ok(())
    }
}

impl ScriptHost for PythonHost {
    type Handle = PyHandle;

    fn initialize(&mut self) -> Result<(), ScriptError> {
        if HOST_ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(ScriptError::AlreadyInitialized);
        }
        let result = Python::with_gil(|py| self.setup(py).map_err(|err| runtime_error(py, err)));
        if let Err(err) = result {
            HOST_ACTIVE.store(false, Ordering::SeqCst);
            return Err(err);
        }
        bridge::bind_world(Rc::clone(&self.world));
        self.initialized = true;
        tracing::info!(
            scripts_dir = %self.scripts_dir.display(),
            "python script host initialized"
        );
        Ok(())
    }

    /// Releases the world and the single-instance guard. The interpreter
    /// itself stays up until the process exits.
    fn finalize(&mut self) {
        if !self.initialized {
            return;
        }
        bridge::unbind_world();
        self.initialized = false;
        HOST_ACTIVE.store(false, Ordering::SeqCst);
        tracing::info!("python script host finalized");
    }

    fn import_module(&mut self, name: &str) -> Result<PyHandle, ScriptError> {
        Python::with_gil(|py| {
            py.import(name)
                .map(|module| PyHandle::new(module.into_any()))
                .map_err(|err| ScriptError::ModuleNotFound {
                    module: name.to_owned(),
                    message: err.to_string(),
                })
        })
    }

    fn get_attr(&mut self, target: &PyHandle, name: &str) -> Option<PyHandle> {
        Python::with_gil(|py| target.bind(py).getattr(name).ok().map(PyHandle::new))
    }

    fn instantiate(&mut self, class: &PyHandle) -> Result<PyHandle, ScriptError> {
        Python::with_gil(|py| {
            class
                .bind(py)
                .call0()
                .map(PyHandle::new)
                .map_err(|err| runtime_error(py, err))
        })
    }

    fn call(&mut self, callable: &PyHandle, args: &[ScriptValue]) -> Result<(), ScriptError> {
        Python::with_gil(|py| {
            let args = args
                .iter()
                .map(|value| to_python(py, value))
                .collect::<PyResult<Vec<_>>>()
                .and_then(|args| PyTuple::new(py, args))
                .map_err(|err| runtime_error(py, err))?;
            callable
                .bind(py)
                .call1(args)
                .map(drop)
                .map_err(|err| runtime_error(py, err))
        })
    }
}

impl Drop for PythonHost {
    fn drop(&mut self) {
        self.finalize();
    }
}

// ---------------------------------------------------------------------------
// Marshalling
// ---------------------------------------------------------------------------

fn to_python<'py>(py: Python<'py>, value: &ScriptValue) -> PyResult<Bound<'py, PyAny>> {
    Ok(match value {
        ScriptValue::Int(v) => (*v).into_pyobject(py)?.into_any(),
        ScriptValue::Float(v) => (*v).into_pyobject(py)?.into_any(),
        ScriptValue::Str(v) => v.as_str().into_pyobject(py)?.into_any(),
        ScriptValue::Bool(v) => (*v).into_pyobject(py)?.to_owned().into_any(),
        ScriptValue::Data(data) => Bound::new(py, PyData::from(*data))?.into_any(),
    })
}

/// Convert a raised exception, keeping its traceback outermost frame first.
fn runtime_error(py: Python<'_>, err: PyErr) -> ScriptError {
    let mut traceback = Vec::new();
    let mut current = err.traceback(py).map(|tb| tb.into_any());
    while let Some(tb) = current {
        match trace_frame(&tb) {
            Ok(frame) => traceback.push(frame),
            Err(e) => tracing::debug!(error = %e, "unreadable traceback frame"),
        }
        current = tb.getattr("tb_next").ok().filter(|next| !next.is_none());
    }
    ScriptError::Runtime {
        message: err.to_string(),
        traceback,
    }
}

fn trace_frame(tb: &Bound<'_, PyAny>) -> PyResult<TraceFrame> {
    let code = tb.getattr("tb_frame")?.getattr("f_code")?;
    Ok(TraceFrame {
        file: code.getattr("co_filename")?.extract()?,
        line: tb.getattr("tb_lineno")?.extract()?,
        function: code.getattr("co_name")?.extract()?,
    })
}
