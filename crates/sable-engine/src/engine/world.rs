use std::cell::RefCell;
use std::rc::Rc;

use crate::actor::{Actor, ActorId};
use crate::arena::Arena;
use crate::camera::Camera;
use crate::graphics::Graphics;
use crate::input::Input;
use crate::physics::Physics;
use crate::vector2::Vector2;

/// The world as scripts see it, shared between the engine and the scripting
/// bridge.
///
/// The engine never holds a borrow while scripts run, so bridge functions
/// may `borrow_mut` freely from inside a script call.
pub type SharedWorld = Rc<RefCell<World>>;

/// Subsystems that script code can reach: input, actors and their
/// components, and the camera.
pub struct World {
    pub input: Input,
    pub actors: Arena<ActorId, Actor>,
    pub physics: Physics,
    pub graphics: Graphics,
    pub camera: Camera,
}

impl World {
    pub fn new(graphics: Graphics, gravity: Vector2) -> Self {
        Self {
            input: Input::new(),
            actors: Arena::new(),
            physics: Physics::new(gravity),
            graphics,
            camera: Camera::new(),
        }
    }

    pub fn into_shared(self) -> SharedWorld {
        Rc::new(RefCell::new(self))
    }

    fn actor(&self, id: ActorId) -> Option<&Actor> {
        let actor = self.actors.get(id);
        if actor.is_none() {
            tracing::warn!(actor = %id, "actor handle no longer exists");
        }
        actor
    }

    // -- actor operations by handle ----------------------------------------
    //
    // A stale handle behaves like an actor with no components.

    pub fn actor_position(&self, id: ActorId) -> Vector2 {
        self.actor(id)
            .map_or(Vector2::ZERO, |actor| actor.position(self.graphics.sprites(), &self.physics))
    }

    pub fn set_actor_position(&mut self, id: ActorId, position: Vector2) {
        if let Some(actor) = self.actors.get(id) {
            actor.set_position(self.graphics.sprites_mut(), &mut self.physics, position);
        } else {
            tracing::warn!(actor = %id, "actor handle no longer exists");
        }
    }

    pub fn set_actor_rotation(&mut self, id: ActorId, degrees: f64) {
        if let Some(actor) = self.actors.get(id) {
            actor.set_rotation(self.graphics.sprites_mut(), &mut self.physics, degrees);
        } else {
            tracing::warn!(actor = %id, "actor handle no longer exists");
        }
    }

    pub fn actor_velocity(&self, id: ActorId) -> Vector2 {
        self.actor(id)
            .map_or(Vector2::ZERO, |actor| actor.velocity(&self.physics))
    }

    pub fn apply_actor_force(&mut self, id: ActorId, force: Vector2) {
        if let Some(actor) = self.actors.get(id) {
            actor.apply_force(&mut self.physics, force);
        } else {
            tracing::warn!(actor = %id, "actor handle no longer exists");
        }
    }

    pub fn apply_actor_impulse(&mut self, id: ActorId, impulse: Vector2) {
        if let Some(actor) = self.actors.get(id) {
            actor.apply_impulse(&mut self.physics, impulse);
        } else {
            tracing::warn!(actor = %id, "actor handle no longer exists");
        }
    }

    /// Point the camera at an actor.
    pub fn track_actor(&mut self, id: ActorId, offset: Vector2, lerp_speed: f64) {
        self.camera.track(id, offset, lerp_speed);
    }
}
