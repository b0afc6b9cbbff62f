//! Physics body records and the borrowed views used to operate on them.
//!
//! [`Physics`](super::Physics) owns one [`PhysicsBody`] per rigid body in its
//! arena. The record itself only names the rapier handle and the body type;
//! all reads and writes go through [`BodyRef`] and [`BodyMut`], which borrow
//! the rapier sets for the duration of the call and convert between pixel
//! space and physics space.

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use super::{METERS_PER_PIXEL, PIXELS_PER_METER};
use crate::arena_key;
use crate::vector2::Vector2;

arena_key! {
    /// Handle to a body owned by [`Physics`](super::Physics).
    pub struct BodyId;
}

/// How the solver treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    /// Immovable (walls, floors).
    Static,
    /// Fully simulated: gravity, forces, collisions.
    Dynamic,
}

/// One rigid body in the physics world.
#[derive(Debug, Clone)]
pub struct PhysicsBody {
    pub(super) handle: RigidBodyHandle,
    pub(super) body_type: BodyType,
}

impl PhysicsBody {
    /// The body type chosen at creation.
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }
}

fn to_physics(v: Vector2) -> Vector<Real> {
    (v * METERS_PER_PIXEL).into()
}

fn to_pixels(v: &Vector<Real>) -> Vector2 {
    Vector2::from(*v) * PIXELS_PER_METER
}

// ---------------------------------------------------------------------------
// BodyRef
// ---------------------------------------------------------------------------

/// Read-only view of a body.
#[derive(Clone, Copy)]
pub struct BodyRef<'w> {
    pub(super) rigid_body: &'w RigidBody,
    pub(super) colliders: &'w ColliderSet,
    pub(super) body_type: BodyType,
}

impl<'w> BodyRef<'w> {
    /// Body type chosen at creation.
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Position of the body origin, in pixels.
    pub fn position(&self) -> Vector2 {
        to_pixels(self.rigid_body.translation())
    }

    /// Rotation in degrees.
    pub fn rotation(&self) -> f64 {
        (self.rigid_body.rotation().angle() as f64).to_degrees()
    }

    /// Linear velocity, in pixels per second.
    pub fn velocity(&self) -> Vector2 {
        to_pixels(self.rigid_body.linvel())
    }

    /// Fixtures attached to this body, in attachment order.
    pub fn fixtures(&self) -> Vec<&'w Collider> {
        let colliders = self.colliders;
        self.rigid_body
            .colliders()
            .iter()
            .filter_map(|handle| colliders.get(*handle))
            .collect()
    }

    /// Mass in kilograms, derived from fixture densities.
    pub fn mass(&self) -> f64 {
        self.rigid_body.mass() as f64
    }
}

// ---------------------------------------------------------------------------
// BodyMut
// ---------------------------------------------------------------------------

/// Mutable view of a body.
pub struct BodyMut<'w> {
    pub(super) handle: RigidBodyHandle,
    pub(super) body_type: BodyType,
    pub(super) bodies: &'w mut RigidBodySet,
    pub(super) colliders: &'w mut ColliderSet,
}

impl<'w> BodyMut<'w> {
    /// Downgrade to a read-only view.
    pub fn view(&self) -> BodyRef<'_> {
        BodyRef {
            rigid_body: &self.bodies[self.handle],
            colliders: &*self.colliders,
            body_type: self.body_type,
        }
    }

    /// Attach a box fixture. `size` is the full width and height in pixels.
    pub fn add_box(&mut self, size: Vector2, density: f64, friction: f64) {
        let half = size * METERS_PER_PIXEL / 2.0;
        let collider = ColliderBuilder::cuboid(half.x as Real, half.y as Real)
            .density(density as Real)
            .friction(friction as Real)
            .build();
        self.colliders
            .insert_with_parent(collider, self.handle, self.bodies);
    }

    /// Attach a circle fixture. `radius` is in pixels.
    pub fn add_circle(&mut self, radius: f64, density: f64, friction: f64) {
        let collider = ColliderBuilder::ball((radius * METERS_PER_PIXEL) as Real)
            .density(density as Real)
            .friction(friction as Real)
            .build();
        self.colliders
            .insert_with_parent(collider, self.handle, self.bodies);
    }

    /// Teleport the body. Velocity is left untouched.
    pub fn set_position(&mut self, position: Vector2) {
        self.bodies[self.handle].set_translation(to_physics(position), true);
    }

    /// Set the rotation, in degrees.
    pub fn set_rotation(&mut self, degrees: f64) {
        let angle = degrees.to_radians() as Real;
        self.bodies[self.handle].set_rotation(Rotation::new(angle), true);
    }

    /// Set the linear velocity, in pixels per second.
    pub fn set_velocity(&mut self, velocity: Vector2) {
        self.bodies[self.handle].set_linvel(to_physics(velocity), true);
    }

    /// Apply an impulse (N·s) at the center of mass.
    pub fn apply_impulse(&mut self, impulse: Vector2) {
        self.bodies[self.handle].apply_impulse(impulse.into(), true);
    }

    /// Apply a force (N) at the center of mass for the next step.
    pub fn apply_force(&mut self, force: Vector2) {
        self.bodies[self.handle].add_force(force.into(), true);
    }

    pub fn position(&self) -> Vector2 {
        self.view().position()
    }

    pub fn rotation(&self) -> f64 {
        self.view().rotation()
    }

    pub fn velocity(&self) -> Vector2 {
        self.view().velocity()
    }
}
