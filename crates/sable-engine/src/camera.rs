//! View tracking.

use crate::actor::{Actor, ActorId};
use crate::arena::Arena;
use crate::graphics::Graphics;
use crate::physics::Physics;
use crate::vector2::Vector2;

/// Keeps the view centered on one actor.
///
/// `lerp_speed` is accepted and stored, but the camera always snaps to the
/// target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Camera {
    target: Option<ActorId>,
    offset: Vector2,
    lerp_speed: f64,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow `target`, keeping it `offset` pixels away from the view center.
    pub fn track(&mut self, target: ActorId, offset: Vector2, lerp_speed: f64) {
        tracing::debug!(%target, %offset, lerp_speed, "camera tracking");
        self.target = Some(target);
        self.offset = offset;
        self.lerp_speed = lerp_speed;
    }

    /// Stop tracking.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Recenter the view on the target. No-op without a target.
    pub fn update(&self, graphics: &mut Graphics, actors: &Arena<ActorId, Actor>, physics: &Physics) {
        let Some(target) = self.target else {
            return;
        };
        let Some(actor) = actors.get(target) else {
            tracing::warn!(%target, "camera target no longer exists");
            return;
        };
        let center = actor.position(graphics.sprites(), physics) + self.offset;
        graphics.set_view_center(center);
    }

    // -- accessors ----------------------------------------------------------

    pub fn target(&self) -> Option<ActorId> {
        self.target
    }

    pub fn offset(&self) -> Vector2 {
        self.offset
    }

    pub fn lerp_speed(&self) -> f64 {
        self.lerp_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::HeadlessBackend;

    #[test]
    fn untracked_camera_leaves_view_alone() {
        let (backend, controller) = HeadlessBackend::new(false);
        let mut graphics = Graphics::new("Test", Box::new(backend));
        let physics = Physics::new(Vector2::ZERO);
        let actors = Arena::new();
        Camera::new().update(&mut graphics, &actors, &physics);
        assert_eq!(controller.view_center(), Vector2::ZERO);
    }

    #[test]
    fn snaps_to_target_plus_offset() {
        let (backend, controller) = HeadlessBackend::new(false);
        let mut graphics = Graphics::new("Test", Box::new(backend));
        let mut physics = Physics::new(Vector2::ZERO);
        let body = physics.add_body(crate::physics::BodyType::Static);
        physics
            .body_mut(body)
            .unwrap()
            .set_position(Vector2::new(160.0, 32.0));
        let mut actors = Arena::new();
        let id = actors.insert(Actor {
            body: Some(body),
            ..Actor::new("player")
        });

        let mut camera = Camera::new();
        camera.track(id, Vector2::new(0.0, -50.0), 0.5);
        camera.update(&mut graphics, &actors, &physics);

        let center = controller.view_center();
        assert!((center.x - 160.0).abs() < 1e-4 && (center.y + 18.0).abs() < 1e-4, "{center}");
        assert_eq!(camera.lerp_speed(), 0.5);
    }

    #[test]
    fn reset_forgets_target() {
        let mut camera = Camera::new();
        camera.track(ActorId::from_raw(0), Vector2::new(1.0, 1.0), 2.0);
        camera.reset();
        assert_eq!(camera, Camera::new());
    }

    #[test]
    fn stale_target_is_ignored() {
        let (backend, controller) = HeadlessBackend::new(false);
        let mut graphics = Graphics::new("Test", Box::new(backend));
        let physics = Physics::new(Vector2::ZERO);
        let mut actors: Arena<ActorId, Actor> = Arena::new();
        let id = actors.insert(Actor::new("gone"));
        actors.clear();

        let mut camera = Camera::new();
        camera.track(id, Vector2::ZERO, 0.0);
        camera.update(&mut graphics, &actors, &physics);
        assert_eq!(controller.view_center(), Vector2::ZERO);
    }
}
