//! The `sable` Python module: what actor scripts can see of the engine.
//!
//! | Python                                   | Engine                          |
//! |------------------------------------------|---------------------------------|
//! | `register_button(name, codes)`           | `Input::register_button`        |
//! | `button_down/pressed/released(name)`     | `Input` queries                 |
//! | `log_debug/info/warning/error(msg)`, `log` | `logging::log_message`        |
//! | `set_camera(actor, offset, lerp_speed)`  | `World::track_actor`            |
//! | `Actor`                                  | per-actor handle operations     |
//! | `Vector2`, `Keyboard`                    | value types and key codes       |
//!
//! The world is bound by [`PythonHost`](crate::PythonHost) on
//! initialization; bridge calls made before the engine script receives its
//! data raise `RuntimeError`.

use std::cell::{Cell, RefCell};

use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyTypeError, PyZeroDivisionError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule, PyTuple};
use sable_engine::actor::ActorId;
use sable_engine::engine::{SharedWorld, World};
use sable_engine::input::{InputError, Key, KEYBOARD_OFFSET};
use sable_engine::logging::{log_message, LogLevel};
use sable_engine::script::ScriptData;
use sable_engine::vector2::Vector2;

thread_local! {
    static WORLD: RefCell<Option<SharedWorld>> = const { RefCell::new(None) };
    static ENGINE_BOUND: Cell<bool> = const { Cell::new(false) };
}

pub(crate) fn bind_world(world: SharedWorld) {
    WORLD.with(|slot| *slot.borrow_mut() = Some(world));
}

pub(crate) fn unbind_world() {
    WORLD.with(|slot| slot.borrow_mut().take());
    ENGINE_BOUND.with(|bound| bound.set(false));
}

fn with_world<T>(f: impl FnOnce(&mut World) -> PyResult<T>) -> PyResult<T> {
    if !ENGINE_BOUND.with(Cell::get) {
        return Err(PyRuntimeError::new_err("sable engine is not bound"));
    }
    let world = WORLD
        .with(|slot| slot.borrow().clone())
        .ok_or_else(|| PyRuntimeError::new_err("sable engine is not bound"))?;
    let mut world = world
        .try_borrow_mut()
        .map_err(|_| PyRuntimeError::new_err("engine state is in use"))?;
    f(&mut world)
}

fn input_error(err: InputError) -> PyErr {
    PyKeyError::new_err(err.to_string())
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// Opaque engine or actor reference passed to `_set_data`.
#[pyclass(name = "_Data", module = "sable", frozen)]
#[derive(Debug, Clone, Copy)]
pub struct PyData(ScriptData);

impl From<ScriptData> for PyData {
    fn from(data: ScriptData) -> Self {
        Self(data)
    }
}

#[pymethods]
impl PyData {
    fn __repr__(&self) -> String {
        match self.0 {
            ScriptData::Engine => "<sable engine>".to_owned(),
            ScriptData::Actor(id) => format!("<sable actor {id}>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Vector2
// ---------------------------------------------------------------------------

#[pyclass(name = "Vector2", module = "sable", eq)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PyVector2 {
    #[pyo3(get, set)]
    x: f64,
    #[pyo3(get, set)]
    y: f64,
}

impl From<Vector2> for PyVector2 {
    fn from(v: Vector2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<PyVector2> for Vector2 {
    fn from(v: PyVector2) -> Self {
        Vector2::new(v.x, v.y)
    }
}

#[pymethods]
impl PyVector2 {
    #[new]
    #[pyo3(signature = (x=0.0, y=0.0))]
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn length(&self) -> f64 {
        Vector2::from(*self).length()
    }

    fn normalize(&self) -> Self {
        Vector2::from(*self).normalize().into()
    }

    fn __add__(&self, other: Self) -> Self {
        (Vector2::from(*self) + Vector2::from(other)).into()
    }

    fn __sub__(&self, other: Self) -> Self {
        (Vector2::from(*self) - Vector2::from(other)).into()
    }

    fn __mul__(&self, scalar: f64) -> Self {
        (Vector2::from(*self) * scalar).into()
    }

    fn __rmul__(&self, scalar: f64) -> Self {
        self.__mul__(scalar)
    }

    fn __truediv__(&self, scalar: f64) -> PyResult<Self> {
        if scalar == 0.0 {
            return Err(PyZeroDivisionError::new_err("Vector2 division by zero"));
        }
        Ok((Vector2::from(*self) / scalar).into())
    }

    fn __neg__(&self) -> Self {
        (-Vector2::from(*self)).into()
    }

    fn __repr__(&self) -> String {
        format!("Vector2({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Base class for actor scripts. The engine binds the owning actor through
/// `_set_data` right after construction.
#[pyclass(name = "Actor", module = "sable", subclass)]
#[derive(Debug, Default)]
pub struct PyActor {
    actor: Option<ActorId>,
}

impl PyActor {
    fn id(&self) -> PyResult<ActorId> {
        self.actor
            .ok_or_else(|| PyRuntimeError::new_err("actor script is not bound to an actor"))
    }
}

#[pymethods]
impl PyActor {
    #[new]
    #[pyo3(signature = (*_args, **_kwargs))]
    fn new(_args: &Bound<'_, PyTuple>, _kwargs: Option<&Bound<'_, PyDict>>) -> Self {
        Self::default()
    }

    #[pyo3(name = "_set_data")]
    fn set_data(&mut self, data: PyRef<'_, PyData>) -> PyResult<()> {
        match data.0 {
            ScriptData::Actor(id) => {
                self.actor = Some(id);
                Ok(())
            }
            ScriptData::Engine => Err(PyTypeError::new_err("expected actor data")),
        }
    }

    #[pyo3(name = "_get_data")]
    fn get_data(&self) -> PyResult<PyData> {
        Ok(PyData(ScriptData::Actor(self.id()?)))
    }

    fn set_position(&self, position: PyVector2) -> PyResult<()> {
        let id = self.id()?;
        with_world(|world| {
            world.set_actor_position(id, position.into());
            Ok(())
        })
    }

    fn get_position(&self) -> PyResult<PyVector2> {
        let id = self.id()?;
        with_world(|world| Ok(world.actor_position(id).into()))
    }

    fn set_rotation(&self, degrees: f64) -> PyResult<()> {
        let id = self.id()?;
        with_world(|world| {
            world.set_actor_rotation(id, degrees);
            Ok(())
        })
    }

    fn get_velocity(&self) -> PyResult<PyVector2> {
        let id = self.id()?;
        with_world(|world| Ok(world.actor_velocity(id).into()))
    }

    fn apply_force(&self, force: PyVector2) -> PyResult<()> {
        let id = self.id()?;
        with_world(|world| {
            world.apply_actor_force(id, force.into());
            Ok(())
        })
    }

    fn apply_impulse(&self, impulse: PyVector2) -> PyResult<()> {
        let id = self.id()?;
        with_world(|world| {
            world.apply_actor_impulse(id, impulse.into());
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Module functions
// ---------------------------------------------------------------------------

/// Receives the engine data when the engine script is bound.
#[pyfunction]
#[pyo3(name = "_set_data")]
fn set_data(data: PyRef<'_, PyData>) -> PyResult<()> {
    match data.0 {
        ScriptData::Engine => {
            ENGINE_BOUND.with(|bound| bound.set(true));
            tracing::debug!("sable module bound to engine");
            Ok(())
        }
        ScriptData::Actor(_) => Err(PyTypeError::new_err("expected engine data")),
    }
}

#[pyfunction]
fn register_button(name: &str, codes: Vec<usize>) -> PyResult<()> {
    with_world(|world| {
        world.input.register_button(name, codes);
        Ok(())
    })
}

#[pyfunction]
fn button_down(name: &str) -> PyResult<bool> {
    with_world(|world| world.input.button_down(name).map_err(input_error))
}

#[pyfunction]
fn button_pressed(name: &str) -> PyResult<bool> {
    with_world(|world| world.input.button_pressed(name).map_err(input_error))
}

#[pyfunction]
fn button_released(name: &str) -> PyResult<bool> {
    with_world(|world| world.input.button_released(name).map_err(input_error))
}

#[pyfunction]
fn log_debug(message: &str) {
    log_message(LogLevel::Debug, message);
}

#[pyfunction]
fn log_info(message: &str) {
    log_message(LogLevel::Info, message);
}

#[pyfunction]
fn log_warning(message: &str) {
    log_message(LogLevel::Warn, message);
}

#[pyfunction]
fn log_error(message: &str) {
    log_message(LogLevel::Error, message);
}

/// Alias of `log_info`.
#[pyfunction]
fn log(message: &str) {
    log_message(LogLevel::Info, message);
}

/// Make the camera follow `actor`, displaced by `offset` pixels.
#[pyfunction]
#[pyo3(signature = (actor, offset=None, lerp_speed=0.0))]
fn set_camera(actor: PyRef<'_, PyActor>, offset: Option<PyVector2>, lerp_speed: f64) -> PyResult<()> {
    let id = actor.id()?;
    let offset = offset.map_or(Vector2::ZERO, Vector2::from);
    with_world(|world| {
        world.track_actor(id, offset, lerp_speed);
        Ok(())
    })
}

/// `Keyboard.<NAME>` constants holding each key's raw code.
fn keyboard_class<'py>(py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
    let attrs = PyDict::new(py);
    for key in Key::ALL {
        attrs.set_item(key.name(), key.code())?;
    }
    py.import("builtins")?
        .getattr("type")?
        .call1(("Keyboard", PyTuple::empty(py), attrs))
}

/// Populate `m` with the bridge functions and classes.
pub fn init_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(set_data, m)?)?;
    m.add_function(wrap_pyfunction!(register_button, m)?)?;
    m.add_function(wrap_pyfunction!(button_down, m)?)?;
    m.add_function(wrap_pyfunction!(button_pressed, m)?)?;
    m.add_function(wrap_pyfunction!(button_released, m)?)?;
    m.add_function(wrap_pyfunction!(log_debug, m)?)?;
    m.add_function(wrap_pyfunction!(log_info, m)?)?;
    m.add_function(wrap_pyfunction!(log_warning, m)?)?;
    m.add_function(wrap_pyfunction!(log_error, m)?)?;
    m.add_function(wrap_pyfunction!(log, m)?)?;
    m.add_function(wrap_pyfunction!(set_camera, m)?)?;
    m.add_class::<PyData>()?;
    m.add_class::<PyVector2>()?;
    m.add_class::<PyActor>()?;
    m.add("Keyboard", keyboard_class(m.py())?)?;
    m.add("KEYBOARD_OFFSET", KEYBOARD_OFFSET)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    fn run(code: &CStr) -> PyResult<()> {
        Python::with_gil(|py| {
            let module = PyModule::new(py, "sable")?;
            init_module(&module)?;
            let globals = PyDict::new(py);
            globals.set_item("sable", module)?;
            py.run(code, Some(&globals), None)
        })
    }

    #[test]
    fn vector2_arithmetic() {
        run(c"
v = sable.Vector2(3, 4)
assert v.length() == 5.0
assert v + sable.Vector2(1, 1) == sable.Vector2(4, 5)
assert v - v == sable.Vector2()
assert 2 * v == v * 2 == sable.Vector2(6, 8)
assert -v == sable.Vector2(-3, -4)
assert (v / 2).x == 1.5
n = v.normalize()
assert abs(n.length() - 1.0) < 1e-9
try:
    v / 0
    raise AssertionError('expected ZeroDivisionError')
except ZeroDivisionError:
    pass
")
        .unwrap();
    }

    #[test]
    fn keyboard_constants_use_raw_codes() {
        run(c"
assert sable.Keyboard.A == sable.KEYBOARD_OFFSET
assert sable.Keyboard.SPACE > sable.Keyboard.A
assert sable.Keyboard.NUM_0 == sable.KEYBOARD_OFFSET + 26
")
        .unwrap();
    }

    #[test]
    fn unbound_calls_raise() {
        run(c"
try:
    sable.button_down('jump')
    raise AssertionError('expected RuntimeError')
except RuntimeError:
    pass

a = sable.Actor()
try:
    a.get_position()
    raise AssertionError('expected RuntimeError')
except RuntimeError:
    pass
")
        .unwrap();
    }

    #[test]
    fn actor_subclasses_accept_constructor_arguments() {
        run(c"
class Player(sable.Actor):
    def __init__(self, speed=1):
        super().__init__()
        self.speed = speed

p = Player(speed=3)
assert p.speed == 3
assert isinstance(p, sable.Actor)
")
        .unwrap();
    }
}
