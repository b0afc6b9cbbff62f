//! CPython scripting for the Sable Engine.
//!
//! [`PythonHost`] embeds the interpreter behind the engine's
//! [`ScriptHost`](sable_engine::script::ScriptHost) trait. Actor scripts are
//! plain Python modules found under `<data>/scripts`; they reach the engine
//! through the built-in `sable` module (see [`bridge`]).
//!
//! ```python
//! import sable
//!
//! class Player(sable.Actor):
//!     def init(self):
//!         sable.register_button("jump", [sable.Keyboard.SPACE])
//!         sable.set_camera(self, sable.Vector2(0, -40))
//!
//!     def update(self, dt):
//!         if sable.button_pressed("jump"):
//!             self.apply_impulse(sable.Vector2(0, -5))
//! ```

#![deny(unsafe_code)]

pub mod bridge;
mod host;

pub use host::{PyHandle, PythonHost};
