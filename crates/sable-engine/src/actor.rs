//! Actors: composition records over subsystem-owned components.
//!
//! An [`Actor`] holds at most one handle per capability slot:
//!
//! | slot    | handle       | owner                                     |
//! |---------|--------------|-------------------------------------------|
//! | visual  | [`SpriteId`] | [`Graphics`](crate::graphics::Graphics)   |
//! | physics | [`BodyId`]   | [`Physics`]                               |
//! | script  | [`ScriptId`] | [`ScriptEngine`](crate::script::ScriptEngine) |
//!
//! Any combination is valid: sprite-only decoration, physics-only colliders,
//! script-only controllers. Operations that need a missing component log a
//! warning and do nothing (or return zero) instead of failing. A handle that
//! no longer resolves (its owner was reset) counts as missing.

use crate::arena_key;
use crate::graphics::{SpriteId, SpritePool};
use crate::physics::{BodyId, BodyType, Physics};
use crate::script::ScriptId;
use crate::vector2::Vector2;

arena_key! {
    /// Handle to an actor in the engine's registry.
    pub struct ActorId;
}

/// One entity in the world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actor {
    /// Template the actor was created from.
    pub name: String,
    pub sprite: Option<SpriteId>,
    pub body: Option<BodyId>,
    pub script: Option<ScriptId>,
}

impl Actor {
    /// An actor with no components.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn has_sprite(&self) -> bool {
        self.sprite.is_some()
    }

    pub fn has_physics(&self) -> bool {
        self.body.is_some()
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    /// Returns `true` if the actor has a dynamic body and a sprite, i.e. its
    /// sprite pose is driven by physics.
    pub fn is_dynamic_visual(&self, physics: &Physics) -> bool {
        self.sprite.is_some()
            && self
                .body
                .and_then(|id| physics.body(id))
                .is_some_and(|body| body.body_type() == BodyType::Dynamic)
    }

    /// Move every positional component to `position` (pixels).
    ///
    /// The body is teleported; its velocity is kept.
    pub fn set_position(&self, sprites: &mut SpritePool, physics: &mut Physics, position: Vector2) {
        let mut moved = false;
        if let Some(sprite) = self.sprite.and_then(|id| sprites.get_mut(id)) {
            sprite.position = position;
            moved = true;
        }
        if let Some(mut body) = self.body.and_then(|id| physics.body_mut(id)) {
            body.set_position(position);
            moved = true;
        }
        if !moved {
            tracing::warn!(actor = %self.name, "set_position on actor without sprite or physics");
        }
    }

    /// Position in pixels: the sprite's if there is one, else the body's.
    pub fn position(&self, sprites: &SpritePool, physics: &Physics) -> Vector2 {
        if let Some(sprite) = self.sprite.and_then(|id| sprites.get(id)) {
            return sprite.position;
        }
        if let Some(body) = self.body.and_then(|id| physics.body(id)) {
            return body.position();
        }
        tracing::warn!(actor = %self.name, "get_position on actor without sprite or physics");
        Vector2::ZERO
    }

    /// Rotate every positional component, in degrees.
    pub fn set_rotation(&self, sprites: &mut SpritePool, physics: &mut Physics, degrees: f64) {
        let mut rotated = false;
        if let Some(sprite) = self.sprite.and_then(|id| sprites.get_mut(id)) {
            sprite.rotation = degrees;
            rotated = true;
        }
        if let Some(mut body) = self.body.and_then(|id| physics.body_mut(id)) {
            body.set_rotation(degrees);
            rotated = true;
        }
        if !rotated {
            tracing::warn!(actor = %self.name, "set_rotation on actor without sprite or physics");
        }
    }

    /// Body velocity in pixels per second, or zero without physics.
    pub fn velocity(&self, physics: &Physics) -> Vector2 {
        match self.body.and_then(|id| physics.body(id)) {
            Some(body) => body.velocity(),
            None => {
                tracing::warn!(actor = %self.name, "get_velocity on actor without physics");
                Vector2::ZERO
            }
        }
    }

    pub fn apply_impulse(&self, physics: &mut Physics, impulse: Vector2) {
        match self.body.and_then(|id| physics.body_mut(id)) {
            Some(mut body) => body.apply_impulse(impulse),
            None => tracing::warn!(actor = %self.name, "apply_impulse on actor without physics"),
        }
    }

    pub fn apply_force(&self, physics: &mut Physics, force: Vector2) {
        match self.body.and_then(|id| physics.body_mut(id)) {
            Some(mut body) => body.apply_force(force),
            None => tracing::warn!(actor = %self.name, "apply_force on actor without physics"),
        }
    }

    /// Copy the body's position and rotation onto the sprite.
    pub fn update_graphics_with_physics(&self, sprites: &mut SpritePool, physics: &Physics) {
        let sprite = self.sprite.and_then(|id| sprites.get_mut(id));
        let body = self.body.and_then(|id| physics.body(id));
        match (sprite, body) {
            (Some(sprite), Some(body)) => {
                sprite.position = body.position();
                sprite.rotation = body.rotation();
            }
            _ => tracing::warn!(
                actor = %self.name,
                "update_graphics_with_physics needs both a sprite and physics"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
