//! rapier2d physics world.
//!
//! [`Physics`] owns the rapier simulation state and an arena of
//! [`PhysicsBody`] records. The rest of the engine works in pixels; bodies are
//! stored in meters and converted with [`PIXELS_PER_METER`].
//!
//! # Stepping
//!
//! [`Physics::update`] steps the world exactly once with the caller's delta.
//! The engine's fixed-step scheduler is what makes the rate constant; Physics
//! does not accumulate time itself. Solver iteration counts are fixed
//! ([`VELOCITY_ITERATIONS`], [`POSITION_ITERATIONS`]). Forces added with
//! [`BodyMut::apply_force`] last for one step only.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Combined with a fixed
//! timestep and arena-ordered bodies, identical inputs give identical
//! results on the same platform.

mod body;

use std::num::NonZeroUsize;

use rapier2d::prelude::*;

use crate::arena::Arena;
use crate::vector2::Vector2;

pub use body::{BodyId, BodyMut, BodyRef, BodyType, PhysicsBody};

/// Render-space pixels per physics-space meter.
pub const PIXELS_PER_METER: f64 = 16.0;

/// Physics-space meters per render-space pixel.
pub const METERS_PER_PIXEL: f64 = 1.0 / PIXELS_PER_METER;

/// Velocity solver iterations per step.
pub const VELOCITY_ITERATIONS: usize = 8;

/// Position correction (stabilization) iterations per step.
pub const POSITION_ITERATIONS: usize = 3;

const SOLVER_ITERATIONS: NonZeroUsize = match NonZeroUsize::new(VELOCITY_ITERATIONS) {
    Some(n) => n,
    None => panic!("VELOCITY_ITERATIONS must be non-zero"),
};

/// Outline color for dynamic bodies.
const COLOR_DYNAMIC: [f32; 4] = [0.2, 1.0, 0.2, 1.0];

/// Outline color for static bodies.
const COLOR_STATIC: [f32; 4] = [0.267, 0.533, 1.0, 1.0];

/// Color for anything else rapier draws (axes, contacts).
const COLOR_OTHER: [f32; 4] = [1.0, 0.6, 0.2, 1.0];

// ---------------------------------------------------------------------------
// DebugLine
// ---------------------------------------------------------------------------

/// A colored line segment in pixel space, produced for the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    /// Segment start, in pixels.
    pub start: Vector2,
    /// Segment end, in pixels.
    pub end: Vector2,
    /// RGBA color (each channel 0.0..1.0).
    pub color: [f32; 4],
}

/// Collects rapier's debug lines, recolored by body type.
struct LineCollector<'a> {
    bodies: &'a RigidBodySet,
    lines: Vec<DebugLine>,
}

impl DebugRenderBackend for LineCollector<'_> {
    fn draw_line(
        &mut self,
        object: DebugRenderObject,
        a: Point<Real>,
        b: Point<Real>,
        _color: [f32; 4],
    ) {
        let color = match object {
            DebugRenderObject::Collider(_, collider) => {
                match collider.parent().and_then(|h| self.bodies.get(h)) {
                    Some(rb) if rb.is_dynamic() => COLOR_DYNAMIC,
                    _ => COLOR_STATIC,
                }
            }
            _ => COLOR_OTHER,
        };
        self.lines.push(DebugLine {
            start: Vector2::new(a.x as f64, a.y as f64) * PIXELS_PER_METER,
            end: Vector2::new(b.x as f64, b.y as f64) * PIXELS_PER_METER,
            color,
        });
    }
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

/// Owns the rapier world and every body in it.
///
/// Bodies are addressed by [`BodyId`]. [`reset`](Self::reset) destroys all
/// of them; ids issued before the reset resolve to `None` afterwards.
pub struct Physics {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    debug_pipeline: DebugRenderPipeline,
    bodies: Arena<BodyId, PhysicsBody>,
}

impl Physics {
    /// Create an empty world. `gravity` is in pixels per second squared.
    pub fn new(gravity: Vector2) -> Self {
        let mut integration_params = IntegrationParameters::default();
        integration_params.num_solver_iterations = SOLVER_ITERATIONS;
        integration_params.num_internal_stabilization_iterations = POSITION_ITERATIONS;

        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: (gravity * METERS_PER_PIXEL).into(),
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            debug_pipeline: DebugRenderPipeline::new(
                DebugRenderStyle::default(),
                DebugRenderMode::COLLIDER_SHAPES,
            ),
            bodies: Arena::new(),
        }
    }

    /// Step the simulation once by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        self.integration_params.dt = dt as Real;

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None, // query pipeline (unused)
            &(),  // physics hooks
            &(),  // event handler
        );

        // rapier keeps user forces across steps; clear them so a force
        // applied by a script affects exactly one step.
        for body in self.bodies.values() {
            if let Some(rb) = self.rigid_body_set.get_mut(body.handle) {
                rb.reset_forces(false);
            }
        }
    }

    /// Create a body with no fixtures at the origin.
    pub fn add_body(&mut self, body_type: BodyType) -> BodyId {
        let rb = match body_type {
            BodyType::Dynamic => RigidBodyBuilder::dynamic().build(),
            BodyType::Static => RigidBodyBuilder::fixed().build(),
        };
        let handle = self.rigid_body_set.insert(rb);
        let id = self.bodies.insert(PhysicsBody { handle, body_type });
        tracing::debug!(body = %id, ?body_type, "physics body created");
        id
    }

    /// Read-only view of a body, or `None` for a stale id.
    pub fn body(&self, id: BodyId) -> Option<BodyRef<'_>> {
        let body = self.bodies.get(id)?;
        let rigid_body = self.rigid_body_set.get(body.handle)?;
        Some(BodyRef {
            rigid_body,
            colliders: &self.collider_set,
            body_type: body.body_type,
        })
    }

    /// Mutable view of a body, or `None` for a stale id.
    pub fn body_mut(&mut self, id: BodyId) -> Option<BodyMut<'_>> {
        let body = self.bodies.get(id)?;
        if !self.rigid_body_set.contains(body.handle) {
            return None;
        }
        Some(BodyMut {
            handle: body.handle,
            body_type: body.body_type,
            bodies: &mut self.rigid_body_set,
            colliders: &mut self.collider_set,
        })
    }

    /// Destroy one body and its fixtures. Returns `false` for a stale id.
    pub fn remove_body(&mut self, id: BodyId) -> bool {
        let Some(body) = self.bodies.remove(id) else {
            return false;
        };
        self.rigid_body_set.remove(
            body.handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    /// Destroy every body and collider.
    pub fn reset(&mut self) {
        for body in self.bodies.values() {
            self.rigid_body_set.remove(
                body.handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true, // remove attached colliders
            );
        }
        let removed = self.bodies.len();
        self.bodies.clear();
        tracing::debug!(removed, "physics world reset");
    }

    /// Collider outlines for the debug overlay, in pixels.
    pub fn debug_lines(&mut self) -> Vec<DebugLine> {
        let mut collector = LineCollector {
            bodies: &self.rigid_body_set,
            lines: Vec::new(),
        };
        self.debug_pipeline.render(
            &mut collector,
            &self.rigid_body_set,
            &self.collider_set,
            &self.impulse_joint_set,
            &self.multibody_joint_set,
            &self.narrow_phase,
        );
        collector.lines
    }

    // -- accessors ----------------------------------------------------------

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of colliders across all bodies.
    pub fn fixture_count(&self) -> usize {
        self.collider_set.len()
    }

    /// Gravity in pixels per second squared.
    pub fn gravity(&self) -> Vector2 {
        Vector2::from(self.gravity) * PIXELS_PER_METER
    }

    /// Iterate `(id, record)` pairs in creation order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &PhysicsBody)> {
        self.bodies.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
