//! The frame loop and composition root.
//!
//! [`Engine`] owns every subsystem: the [`World`] (input, actors, physics,
//! graphics, camera) behind a shared handle, and the [`ScriptEngine`] beside
//! it. It loads actors and maps from templates and runs the per-frame update.
//!
//! # Tick order
//!
//! Each tick runs, in order:
//!
//! 1. `Graphics::clear`; a closed window ends the loop.
//! 2. Input snapshot from the backend keyboard.
//! 3. Script `update(dt)` for every actor script.
//! 4. `Physics::update(dt)`.
//! 5. Sprite pose copied from physics for every dynamic actor with a sprite.
//! 6. Camera recentered on its target.
//! 7. Physics overlay toggled (debug builds of the config only).
//! 8. `Input::update`, so the next tick's edges compare against this one.
//! 9. Sprites rendered, overlay rendered if on, frame presented.
//!
//! How many ticks an [`Engine::update`] runs is decided by the
//! [`FrameScheduler`].

mod scheduler;
mod world;

use std::cell::{Ref, RefMut};
use std::rc::Rc;
use std::time::Instant;

use crate::actor::{Actor, ActorId};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::graphics::{Graphics, RenderBackend};
use crate::input::Key;
use crate::physics::BodyType;
use crate::script::{ScriptData, ScriptEngine, ScriptError, ScriptHost};
use crate::template::{ActorTemplate, Fixture, MapTemplate, ShapeTemplate, TemplateError};

pub use scheduler::{FrameScheduler, SchedulerDiagnostics, TimestepMode};
pub use world::{SharedWorld, World};

/// Button that toggles the physics overlay when `config.debug` is set.
pub const DEBUG_PHYSICS_BUTTON: &str = "_debug_physics";

/// Key bound to [`DEBUG_PHYSICS_BUTTON`].
pub const DEBUG_PHYSICS_KEY: Key = Key::F1;

/// The game engine.
pub struct Engine<H: ScriptHost> {
    scripts: ScriptEngine<H>,
    world: SharedWorld,
    config: EngineConfig,
    /// Actors whose sprite follows a dynamic body, in creation order.
    dynamic_actors: Vec<ActorId>,
    scheduler: FrameScheduler,
    clock: Instant,
    debug_physics: bool,
    closed: bool,
}

impl<H: ScriptHost> Engine<H> {
    /// Build the engine and, if `config.default_map` is set, load it.
    ///
    /// `make_host` receives the shared world so a host can expose it to
    /// script code before any script runs. The timestep mode is fixed here:
    /// vsync if the backend reports it, fixed-step otherwise.
    pub fn new<F>(
        config: EngineConfig,
        backend: Box<dyn RenderBackend>,
        make_host: F,
    ) -> Result<Self, EngineError>
    where
        F: FnOnce(&SharedWorld) -> Result<H, ScriptError>,
    {
        config.validate()?;

        let graphics = Graphics::new(&config.title, backend);
        let mode = if graphics.vsync() {
            TimestepMode::Vsync
        } else {
            TimestepMode::Fixed {
                period: config.frame_period(),
            }
        };

        let mut world = World::new(graphics, config.gravity);
        if config.debug {
            world
                .input
                .register_keys(DEBUG_PHYSICS_BUTTON, &[DEBUG_PHYSICS_KEY]);
        }
        let world = world.into_shared();

        let host = make_host(&world)?;
        let scripts = ScriptEngine::new(host)?;

        tracing::info!(
            title = %config.title,
            data_dir = %config.data_dir.display(),
            ?mode,
            "engine initialized"
        );

        let mut engine = Self {
            scripts,
            world,
            config,
            dynamic_actors: Vec::new(),
            scheduler: FrameScheduler::new(mode),
            clock: Instant::now(),
            debug_physics: false,
            closed: false,
        };

        if !engine.config.default_map.is_empty() {
            let map = engine.config.default_map.clone();
            engine.load_map(&map)?;
        }
        Ok(engine)
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    /// Run this frame's ticks using the wall-clock time since the last call.
    ///
    /// Returns `Ok(false)` once the window has closed; keep calling while it
    /// returns `Ok(true)`.
    pub fn update(&mut self) -> Result<bool, EngineError> {
        let now = Instant::now();
        let delta = now.duration_since(self.clock).as_secs_f64();
        self.clock = now;
        self.update_with_delta(delta)
    }

    /// [`update`](Self::update) with an explicit wall-clock delta in seconds.
    pub fn update_with_delta(&mut self, delta: f64) -> Result<bool, EngineError> {
        if self.closed {
            return Ok(false);
        }
        self.scheduler.begin_frame(delta);
        while let Some(dt) = self.scheduler.next_tick() {
            let started = Instant::now();
            let open = self.tick(dt)?;
            self.scheduler.record_tick_time(started.elapsed());
            if !open {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn tick(&mut self, dt: f64) -> Result<bool, EngineError> {
        {
            let mut guard = self.world.borrow_mut();
            let world = &mut *guard;
            if !world.graphics.clear() {
                self.closed = true;
                return Ok(false);
            }
            world.input.refresh(world.graphics.keyboard());
        }

        self.scripts.update(dt)?;

        let mut guard = self.world.borrow_mut();
        let world = &mut *guard;

        world.physics.update(dt);
        for id in &self.dynamic_actors {
            if let Some(actor) = world.actors.get(*id) {
                actor.update_graphics_with_physics(world.graphics.sprites_mut(), &world.physics);
            }
        }

        world
            .camera
            .update(&mut world.graphics, &world.actors, &world.physics);

        if self.config.debug && world.input.button_pressed(DEBUG_PHYSICS_BUTTON)? {
            self.debug_physics = !self.debug_physics;
            tracing::info!(enabled = self.debug_physics, "physics overlay toggled");
        }

        world.input.update();

        world.graphics.render();
        if self.debug_physics {
            let lines = world.physics.debug_lines();
            world.graphics.render_debug(&lines);
        }
        world.graphics.present();
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Actors and maps
    // -----------------------------------------------------------------------

    /// Create an actor from `<data>/actors/<name>.json`.
    ///
    /// Either the actor is fully built and registered, or nothing is: any
    /// component created before a failure is released again.
    pub fn add_actor(&mut self, name: &str) -> Result<ActorId, EngineError> {
        let template = ActorTemplate::load(&self.config.actor_path(name))?;
        let physics = match &template.physics {
            Some(physics) => {
                let fixtures = physics
                    .shapes()
                    .iter()
                    .map(ShapeTemplate::fixture)
                    .collect::<Result<Vec<_>, TemplateError>>()?;
                Some((physics.body_type()?, fixtures))
            }
            None => None,
        };

        let id = self.world.borrow_mut().actors.insert(Actor::new(name));
        if let Err(err) = self.attach_components(id, &template, physics) {
            tracing::error!(actor = name, error = %err, "actor creation failed");
            self.discard_actor(id);
            return Err(err);
        }

        let world = self.world.borrow();
        if let Some(actor) = world.actors.get(id) {
            if actor.is_dynamic_visual(&world.physics) {
                self.dynamic_actors.push(id);
            }
            tracing::debug!(
                actor = name,
                %id,
                sprite = actor.has_sprite(),
                physics = actor.has_physics(),
                script = actor.has_script(),
                "actor added"
            );
        }
        Ok(id)
    }

    fn attach_components(
        &mut self,
        id: ActorId,
        template: &ActorTemplate,
        physics: Option<(BodyType, Vec<Fixture>)>,
    ) -> Result<(), EngineError> {
        {
            let mut guard = self.world.borrow_mut();
            let world = &mut *guard;
            let Some(actor) = world.actors.get_mut(id) else {
                return Ok(());
            };

            if let Some(sprite) = &template.sprite {
                let path = self.config.texture_path(&sprite.filename);
                let sprite_id = world.graphics.add_sprite(&path)?;
                actor.sprite = Some(sprite_id);
                if let Some(created) = world.graphics.sprite_mut(sprite_id) {
                    created.origin = sprite.origin.unwrap_or(created.texture.size / 2.0);
                }
            }

            if let Some((body_type, fixtures)) = physics {
                let body_id = world.physics.add_body(body_type);
                actor.body = Some(body_id);
                if let Some(mut body) = world.physics.body_mut(body_id) {
                    for fixture in fixtures {
                        match fixture {
                            Fixture::Box {
                                size,
                                density,
                                friction,
                            } => body.add_box(size, density, friction),
                        }
                    }
                }
            }
        }

        // Scripts last: their constructors may call back into the world and
        // should see a complete actor.
        if let Some(script) = &template.script {
            let script_id =
                self.scripts
                    .add_script(&script.module, script.class(), ScriptData::Actor(id))?;
            if let Some(actor) = self.world.borrow_mut().actors.get_mut(id) {
                actor.script = Some(script_id);
            }
            if let Some(update) = &script.update {
                self.scripts.add_method(script_id, "update", update)?;
            }
            if let Some(init) = &script.init {
                self.scripts.add_method(script_id, "init", init)?;
            }
        }
        Ok(())
    }

    fn discard_actor(&mut self, id: ActorId) {
        let actor = {
            let mut guard = self.world.borrow_mut();
            let world = &mut *guard;
            let Some(actor) = world.actors.remove(id) else {
                return;
            };
            if let Some(sprite) = actor.sprite {
                world.graphics.sprites_mut().remove(sprite);
            }
            if let Some(body) = actor.body {
                world.physics.remove_body(body);
            }
            actor
        };
        if let Some(script) = actor.script {
            self.scripts.remove_script(script);
        }
    }

    /// Replace the world with the actors of `<data>/maps/<name>.json`.
    ///
    /// Everything from the previous map is torn down first. Actors are created
    /// in file order and placed (position, then rotation) as they are
    /// created; `init` runs on every script only after all of them exist.
    pub fn load_map(&mut self, name: &str) -> Result<(), EngineError> {
        let map = MapTemplate::load(&self.config.map_path(name))?;
        self.reset();

        for entry in &map.entries {
            let id = self.add_actor(&entry.filename)?;
            let mut guard = self.world.borrow_mut();
            let world = &mut *guard;
            if let Some(actor) = world.actors.get(id) {
                actor.set_position(world.graphics.sprites_mut(), &mut world.physics, entry.position);
                actor.set_rotation(world.graphics.sprites_mut(), &mut world.physics, entry.rotation);
            }
        }

        self.scripts.init()?;
        tracing::info!(map = name, actors = map.entries.len(), "map loaded");
        Ok(())
    }

    /// Tear down every actor and its components. Buttons stay registered.
    pub fn reset(&mut self) {
        self.scripts.reset();
        let mut world = self.world.borrow_mut();
        world.physics.reset();
        world.graphics.reset();
        self.dynamic_actors.clear();
        world.actors.clear();
        world.camera.reset();
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> Ref<'_, World> {
        self.world.borrow()
    }

    pub fn world_mut(&self) -> RefMut<'_, World> {
        self.world.borrow_mut()
    }

    /// A new handle to the shared world.
    pub fn shared_world(&self) -> SharedWorld {
        Rc::clone(&self.world)
    }

    pub fn scripts(&self) -> &ScriptEngine<H> {
        &self.scripts
    }

    pub fn scripts_mut(&mut self) -> &mut ScriptEngine<H> {
        &mut self.scripts
    }

    /// Actors synced from physics each tick.
    pub fn dynamic_actors(&self) -> &[ActorId] {
        &self.dynamic_actors
    }

    /// Whether the physics overlay is drawn.
    pub fn debug_physics(&self) -> bool {
        self.debug_physics
    }

    pub fn set_debug_physics(&mut self, enabled: bool) {
        self.debug_physics = enabled;
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Returns `true` once the window has closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
