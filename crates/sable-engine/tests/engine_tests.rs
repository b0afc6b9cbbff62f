//! End-to-end tests for the engine frame loop, actor creation and map
//! loading, run against the headless backend and the native script host.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::{ball_template, close, engine, engine_with, DataDir, PERIOD};
use sable_engine::prelude::*;
use serde_json::json;

type Log = Rc<RefCell<Vec<String>>>;

fn actor_ids(engine: &Engine<NativeHost>) -> Vec<ActorId> {
    engine.world().actors.iter().map(|(id, _)| id).collect()
}

fn single_ball_map(data: &DataDir) {
    data.texture("ball", 32, 32)
        .actor("ball", ball_template())
        .map(
            "level",
            json!([{ "filename": "ball", "position": { "x": 100.0, "y": 50.0 } }]),
        );
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

#[test]
fn close_request_ends_the_loop() {
    let data = DataDir::new();
    let (mut engine, controller) = engine(data.config());

    assert!(engine.update_with_delta(PERIOD).unwrap());
    controller.request_close();
    assert!(!engine.update_with_delta(PERIOD).unwrap());
    assert!(engine.is_closed());

    let presented = controller.frames_presented();
    assert!(!engine.update_with_delta(PERIOD).unwrap());
    assert_eq!(controller.frames_presented(), presented, "no frames after close");
}

#[test]
fn fixed_step_runs_whole_periods_only() {
    let data = DataDir::new();
    let (mut engine, controller) = engine(data.config());

    engine.update_with_delta(PERIOD * 0.5).unwrap();
    assert_eq!(controller.frames_presented(), 0, "half a period is not a tick");

    engine.update_with_delta(PERIOD * 0.5).unwrap();
    assert_eq!(controller.frames_presented(), 1);
}

#[test]
fn falling_behind_skips_frames_instead_of_catching_up() {
    let data = DataDir::new();
    let (mut engine, controller) = engine(data.config());

    engine.update_with_delta(PERIOD * 3.5).unwrap();

    assert_eq!(controller.frames_presented(), 1);
    let diagnostics = engine.scheduler().diagnostics();
    assert_eq!(diagnostics.ticks, 1);
    assert_eq!(diagnostics.skip_events, 1);
    assert_eq!(diagnostics.last_skipped, 2);
    assert!(engine.scheduler().elapsed() < PERIOD);
}

#[test]
fn non_finite_delta_runs_no_ticks() {
    let data = DataDir::new();
    let (mut engine, controller) = engine(data.config());

    assert!(engine.update_with_delta(f64::INFINITY).unwrap());
    assert!(engine.update_with_delta(f64::NAN).unwrap());
    assert_eq!(controller.frames_presented(), 0);
    assert_eq!(engine.scheduler().elapsed(), 0.0);

    engine.update_with_delta(PERIOD).unwrap();
    assert_eq!(controller.frames_presented(), 1);
}

#[test]
fn vsync_runs_one_tick_with_wall_delta() {
    let data = DataDir::new();
    let log: Log = Rc::default();
    let recorded = Rc::clone(&log);
    data.actor(
        "timer",
        json!({ "script": { "module": "timer", "class": "", "update": "tick" } }),
    );

    let (backend, controller) = HeadlessBackend::new(true);
    let mut engine = Engine::new(data.config(), Box::new(backend), move |_| {
        let mut host = NativeHost::new();
        host.add_module(NativeModule::new("timer").with_function("tick", move |args| {
            recorded.borrow_mut().push(format!("{:?}", args));
            Ok(())
        }));
        Ok(host)
    })
    .unwrap();
    engine.add_actor("timer").unwrap();

    engine.update_with_delta(0.25).unwrap();
    assert_eq!(engine.scheduler().mode(), TimestepMode::Vsync);
    assert_eq!(controller.frames_presented(), 1);
    assert_eq!(*log.borrow(), vec![format!("{:?}", [ScriptValue::Float(0.25)])]);
}

#[test]
fn fixed_step_simulation_is_deterministic() {
    let run = || {
        let data = DataDir::new();
        single_ball_map(&data);
        let mut config = data.config();
        config.gravity = Vector2::new(0.0, 200.0);
        let (mut engine, _controller) = engine(config);
        engine.load_map("level").unwrap();
        let id = actor_ids(&engine)[0];
        let mut trace = Vec::new();
        for delta in [0.01, 0.02, 0.005, 0.04, 0.017, 0.016] {
            engine.update_with_delta(delta).unwrap();
            trace.push(engine.world().actor_position(id));
        }
        trace
    };

    let first = run();
    assert_eq!(first, run());
    assert!(first.last().unwrap().y > 50.0, "gravity pulls the ball down");
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

#[test]
fn actor_without_components_is_harmless() {
    let data = DataDir::new();
    data.actor("empty", json!({}));
    let (mut engine, controller) = engine(data.config());

    let id = engine.add_actor("empty").unwrap();
    engine.world_mut().set_actor_position(id, Vector2::new(5.0, 5.0));
    engine.world_mut().apply_actor_impulse(id, Vector2::new(1.0, 0.0));
    engine.update_with_delta(PERIOD).unwrap();

    let world = engine.world();
    assert_eq!(world.actor_position(id), Vector2::ZERO);
    assert_eq!(world.actor_velocity(id), Vector2::ZERO);
    assert!(controller.last_frame_sprites().is_empty());
    assert!(engine.dynamic_actors().is_empty());
}

#[test]
fn position_prefers_sprite_over_body() {
    let data = DataDir::new();
    data.texture("crate", 16, 16).actor(
        "crate",
        json!({
            "sprite": { "filename": "crate" },
            "physics": {
                "type": "static",
                "shape": { "type": "box", "width": 16.0, "height": 16.0 }
            }
        }),
    );
    let (mut engine, _controller) = engine(data.config());
    let id = engine.add_actor("crate").unwrap();

    let mut world = engine.world_mut();
    world.set_actor_position(id, Vector2::new(10.0, 10.0));
    let sprite = world.actors.get(id).unwrap().sprite.unwrap();
    world.graphics.sprite_mut(sprite).unwrap().position = Vector2::new(99.0, 1.0);

    assert_eq!(world.actor_position(id), Vector2::new(99.0, 1.0));
}

#[test]
fn dynamic_sprites_follow_their_bodies() {
    let data = DataDir::new();
    single_ball_map(&data);
    data.texture("wall", 8, 8).actor(
        "wall",
        json!({
            "sprite": { "filename": "wall" },
            "physics": { "type": "static", "shape": [{ "type": "box", "width": 8.0, "height": 8.0 }] }
        }),
    );
    let mut config = data.config();
    config.gravity = Vector2::new(0.0, 200.0);
    let (mut engine, controller) = engine(config);

    engine.load_map("level").unwrap();
    let wall = engine.add_actor("wall").unwrap();
    let ball = actor_ids(&engine)
        .into_iter()
        .find(|id| *id != wall)
        .unwrap();
    assert_eq!(engine.dynamic_actors(), &[ball]);

    for _ in 0..10 {
        engine.update_with_delta(PERIOD).unwrap();
    }

    let world = engine.world();
    let actor = world.actors.get(ball).unwrap();
    let body = world.physics.body(actor.body.unwrap()).unwrap();
    let sprite = world.graphics.sprite(actor.sprite.unwrap()).unwrap();
    assert!(close(sprite.position, body.position()));
    assert!(body.position().y > 50.0);
    assert_eq!(controller.last_frame_sprites().len(), 2);
}

#[test]
fn map_entries_are_placed_and_rotated() {
    let data = DataDir::new();
    data.texture("ball", 32, 32).actor("ball", ball_template()).map(
        "level",
        json!([{ "filename": "ball", "position": { "x": 64.0, "y": 32.0 }, "rotation": 45.0 }]),
    );
    let (mut engine, _controller) = engine(data.config());
    engine.load_map("level").unwrap();

    let id = actor_ids(&engine)[0];
    let world = engine.world();
    let actor = world.actors.get(id).unwrap();
    let body = world.physics.body(actor.body.unwrap()).unwrap();
    assert!(close(body.position(), Vector2::new(64.0, 32.0)));
    assert!((body.rotation() - 45.0).abs() < 1e-3);
    let sprite = world.graphics.sprite(actor.sprite.unwrap()).unwrap();
    assert!((sprite.rotation - 45.0).abs() < 1e-3);
}

#[test]
fn reloading_a_map_rebuilds_the_same_world() {
    let data = walker_data();
    data.texture("ball", 32, 32)
        .actor("ball", ball_template())
        .actor("flag", json!({ "sprite": { "filename": "ball" } }))
        .map(
            "level",
            json!([
                { "filename": "ball", "position": { "x": 0.0, "y": 0.0 } },
                { "filename": "walker", "position": { "x": 32.0, "y": 8.0 } },
                { "filename": "flag", "position": { "x": -16.0, "y": 4.0 } },
                { "filename": "ball", "position": { "x": 64.0, "y": 0.0 } }
            ]),
        );
    let log: Log = Rc::default();
    let (mut engine, controller) = engine_with(data.config(), |world| walker_host(world, &log));

    let layout = |engine: &Engine<NativeHost>| {
        let world = engine.world();
        world
            .actors
            .iter()
            .map(|(id, actor)| {
                let composition = (actor.has_sprite(), actor.has_physics(), actor.has_script());
                (world.actor_position(id), composition)
            })
            .collect::<Vec<_>>()
    };

    engine.load_map("level").unwrap();
    let first = layout(&engine);
    engine.update_with_delta(PERIOD).unwrap();
    engine.load_map("level").unwrap();
    let second = layout(&engine);

    assert_eq!(first.len(), 4);
    assert_eq!(
        first.iter().map(|(_, composition)| *composition).collect::<Vec<_>>(),
        [(true, true, false), (false, false, true), (true, false, false), (true, true, false)]
    );
    assert_eq!(first, second);

    let world = engine.world();
    assert_eq!(world.physics.body_count(), 2);
    assert_eq!(world.graphics.sprites().len(), 3);
    assert_eq!(engine.dynamic_actors().len(), 2);
    assert_eq!(controller.textures_loaded(), 1, "textures are cached");
}

#[test]
fn default_map_loads_at_startup() {
    let data = DataDir::new();
    single_ball_map(&data);
    let mut config = data.config();
    config.default_map = "level".to_owned();

    let (engine, _controller) = engine(config);
    assert_eq!(engine.world().actors.len(), 1);
}

#[test]
fn missing_map_leaves_world_untouched() {
    let data = DataDir::new();
    single_ball_map(&data);
    let (mut engine, _controller) = engine(data.config());
    engine.load_map("level").unwrap();

    let err = engine.load_map("nowhere").unwrap_err();
    assert!(matches!(err, EngineError::Template(TemplateError::Io { .. })));
    assert_eq!(engine.world().actors.len(), 1);
}

// ---------------------------------------------------------------------------
// Rejected templates leave nothing behind
// ---------------------------------------------------------------------------

fn assert_nothing_created(engine: &Engine<NativeHost>) {
    let world = engine.world();
    assert!(world.actors.is_empty());
    assert_eq!(world.physics.body_count(), 0);
    assert!(world.graphics.sprites().is_empty());
    assert!(engine.scripts().is_empty());
    assert!(engine.dynamic_actors().is_empty());
}

#[test]
fn kinematic_body_is_rejected() {
    let data = DataDir::new();
    data.texture("ball", 32, 32).actor(
        "ghost",
        json!({
            "sprite": { "filename": "ball" },
            "physics": { "type": "kinematic", "shape": { "type": "box", "width": 1.0, "height": 1.0 } }
        }),
    );
    let (mut engine, _controller) = engine(data.config());

    let err = engine.add_actor("ghost").unwrap_err();
    assert!(
        matches!(err, EngineError::Template(TemplateError::InvalidBodyType(ref t)) if t == "kinematic"),
        "got {err:?}"
    );
    assert_nothing_created(&engine);
}

#[test]
fn polygon_shape_is_rejected() {
    let data = DataDir::new();
    data.actor(
        "spike",
        json!({
            "physics": { "type": "static", "shape": [
                { "type": "box", "width": 4.0, "height": 4.0 },
                { "type": "polygon" }
            ] }
        }),
    );
    let (mut engine, _controller) = engine(data.config());

    let err = engine.add_actor("spike").unwrap_err();
    assert!(matches!(err, EngineError::Template(TemplateError::InvalidShape(ref s)) if s == "polygon"));
    assert_nothing_created(&engine);
}

#[test]
fn failed_script_releases_sprite_and_body() {
    let data = DataDir::new();
    data.texture("ball", 32, 32).actor(
        "broken",
        json!({
            "sprite": { "filename": "ball" },
            "physics": { "type": "dynamic", "shape": { "type": "box", "width": 4.0, "height": 4.0 } },
            "script": { "module": "missing", "class": "Nope" }
        }),
    );
    let (mut engine, _controller) = engine(data.config());

    let err = engine.add_actor("broken").unwrap_err();
    assert!(matches!(err, EngineError::Script(ScriptError::ModuleNotFound { .. })));
    assert_nothing_created(&engine);
}

#[test]
fn missing_texture_is_a_graphics_error() {
    let data = DataDir::new();
    data.actor("ghost", json!({ "sprite": { "filename": "nothing" } }));
    let (mut engine, _controller) = engine(data.config());

    let err = engine.add_actor("ghost").unwrap_err();
    assert!(matches!(err, EngineError::Graphics(GraphicsError::Texture { .. })));
    assert_nothing_created(&engine);
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// Module `walker` with class `Walker`: records `_set_data`, `init` and
/// `update` calls along with the number of live actors.
fn walker_host(world: &SharedWorld, log: &Log) -> NativeHost {
    let world = Rc::clone(world);
    let log = Rc::clone(log);
    let class = NativeClass::new(move || {
        let actor = Rc::new(Cell::new(None));
        let (set_actor, init_actor) = (Rc::clone(&actor), Rc::clone(&actor));
        let (init_world, init_log) = (Rc::clone(&world), Rc::clone(&log));
        let update_log = Rc::clone(&log);
        Ok(NativeObject::new()
            .with_method("_set_data", move |args| match args {
                [ScriptValue::Data(ScriptData::Actor(id))] => {
                    set_actor.set(Some(*id));
                    Ok(())
                }
                other => Err(format!("unexpected data {other:?}")),
            })
            .with_method("start", move |_| {
                let id = init_actor.get().ok_or("no actor bound")?;
                let count = init_world.borrow().actors.len();
                init_log.borrow_mut().push(format!("init {id} sees {count}"));
                Ok(())
            })
            .with_method("step", move |args| {
                update_log.borrow_mut().push(format!("update {args:?}"));
                Ok(())
            }))
    });
    let mut host = NativeHost::new();
    host.add_module(NativeModule::new("walker").with_class("Walker", class));
    host
}

fn walker_data() -> DataDir {
    let data = DataDir::new();
    data.actor(
        "walker",
        json!({ "script": { "module": "walker", "class": "Walker", "init": "start", "update": "step" } }),
    )
    .map(
        "crowd",
        json!([
            { "filename": "walker", "position": { "x": 0.0, "y": 0.0 } },
            { "filename": "walker", "position": { "x": 1.0, "y": 0.0 } },
            { "filename": "walker", "position": { "x": 2.0, "y": 0.0 } }
        ]),
    );
    data
}

#[test]
fn init_runs_after_every_actor_exists() {
    let data = walker_data();
    let log: Log = Rc::default();
    let (mut engine, _controller) = engine_with(data.config(), |world| walker_host(world, &log));

    engine.load_map("crowd").unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 3);
    assert!(log.iter().all(|line| line.ends_with("sees 3")), "{log:?}");
}

#[test]
fn update_passes_tick_delta_to_every_script() {
    let data = walker_data();
    let log: Log = Rc::default();
    let (mut engine, _controller) = engine_with(data.config(), |world| walker_host(world, &log));
    engine.load_map("crowd").unwrap();
    log.borrow_mut().clear();

    engine.update_with_delta(PERIOD).unwrap();

    let expected = format!("update {:?}", [ScriptValue::Float(PERIOD)]);
    assert_eq!(*log.borrow(), vec![expected; 3]);
}

#[test]
fn unregistered_method_key_is_silent() {
    let data = DataDir::new();
    data.actor("idle", json!({ "script": { "module": "walker", "class": "Walker" } }));
    let log: Log = Rc::default();
    let (mut engine, _controller) = engine_with(data.config(), |world| walker_host(world, &log));

    let id = engine.add_actor("idle").unwrap();
    engine.update_with_delta(PERIOD).unwrap();
    assert!(log.borrow().is_empty());

    let script = engine.world().actors.get(id).unwrap().script.unwrap();
    assert_eq!(engine.scripts_mut().call(script, "jump", &[]), Ok(()));
}

#[test]
fn duplicate_method_key_is_rejected() {
    let data = walker_data();
    let log: Log = Rc::default();
    let (mut engine, _controller) = engine_with(data.config(), |world| walker_host(world, &log));

    let id = engine.add_actor("walker").unwrap();
    let script = engine.world().actors.get(id).unwrap().script.unwrap();
    let err = engine.scripts_mut().add_method(script, "update", "step").unwrap_err();
    assert_eq!(err, ScriptError::MethodExists { key: "update".to_owned() });
}

#[test]
fn script_runtime_error_stops_the_update() {
    let data = DataDir::new();
    data.actor(
        "bomb",
        json!({ "script": { "module": "bomb", "class": "", "update": "explode" } }),
    );
    let (mut engine, _controller) = engine_with(data.config(), |_| {
        let mut host = NativeHost::new();
        host.add_module(
            NativeModule::new("bomb").with_function("explode", |_| Err("boom".to_owned())),
        );
        host
    });
    engine.add_actor("bomb").unwrap();

    let err = engine.update_with_delta(PERIOD).unwrap_err();
    match err {
        EngineError::Script(ScriptError::Runtime { message, traceback }) => {
            assert_eq!(message, "boom");
            assert_eq!(traceback[0].function, "explode");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn engine_script_receives_engine_data() {
    let data = DataDir::new();
    let seen = Rc::new(Cell::new(false));
    let flag = Rc::clone(&seen);
    let (_engine, _controller) = engine_with(data.config(), move |_| {
        let mut host = NativeHost::new();
        host.add_module(NativeModule::new("sable").with_function("_set_data", move |args| {
            flag.set(args == [ScriptValue::Data(ScriptData::Engine)]);
            Ok(())
        }));
        host
    });
    assert!(seen.get());
}

// ---------------------------------------------------------------------------
// Input, camera and the debug overlay
// ---------------------------------------------------------------------------

#[test]
fn scripts_see_press_and_release_edges() {
    let data = DataDir::new();
    data.actor(
        "player",
        json!({ "script": { "module": "player", "class": "", "update": "poll" } }),
    );
    let log: Log = Rc::default();
    let recorded = Rc::clone(&log);
    let (mut engine, controller) = engine_with(data.config(), move |world| {
        let world = Rc::clone(world);
        let mut host = NativeHost::new();
        host.add_module(NativeModule::new("player").with_function("poll", move |_| {
            let world = world.borrow();
            let input = &world.input;
            let state = (
                input.button_down("jump").map_err(|e| e.to_string())?,
                input.button_pressed("jump").map_err(|e| e.to_string())?,
                input.button_released("jump").map_err(|e| e.to_string())?,
            );
            recorded.borrow_mut().push(format!("{state:?}"));
            Ok(())
        }));
        host
    });
    engine
        .world_mut()
        .input
        .register_keys("jump", &[Key::Space, Key::W]);
    engine.add_actor("player").unwrap();

    controller.press(Key::Space);
    engine.update_with_delta(PERIOD).unwrap();
    engine.update_with_delta(PERIOD).unwrap();
    controller.release(Key::Space);
    engine.update_with_delta(PERIOD).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "(true, true, false)".to_owned(),
            "(true, false, false)".to_owned(),
            "(false, false, true)".to_owned(),
        ]
    );
}

#[test]
fn camera_centers_on_tracked_actor() {
    let data = DataDir::new();
    single_ball_map(&data);
    let (mut engine, controller) = engine(data.config());
    engine.load_map("level").unwrap();
    let id = actor_ids(&engine)[0];

    engine
        .world_mut()
        .track_actor(id, Vector2::new(0.0, -20.0), 1.0);
    engine.update_with_delta(PERIOD).unwrap();

    let expected = engine.world().actor_position(id) + Vector2::new(0.0, -20.0);
    assert!(close(controller.view_center(), expected));
}

#[test]
fn camera_resets_with_the_map() {
    let data = DataDir::new();
    single_ball_map(&data);
    let (mut engine, _controller) = engine(data.config());
    engine.load_map("level").unwrap();
    let id = actor_ids(&engine)[0];
    engine.world_mut().track_actor(id, Vector2::ZERO, 1.0);

    engine.load_map("level").unwrap();
    assert_eq!(engine.world().camera.target(), None);
}

#[test]
fn f1_toggles_physics_overlay_in_debug_mode() {
    let data = DataDir::new();
    single_ball_map(&data);
    let mut config = data.config();
    config.debug = true;
    let (mut engine, controller) = engine(config);
    engine.load_map("level").unwrap();

    engine.update_with_delta(PERIOD).unwrap();
    assert!(!engine.debug_physics());
    assert_eq!(controller.last_frame_lines(), 0);

    controller.press(Key::F1);
    engine.update_with_delta(PERIOD).unwrap();
    assert!(engine.debug_physics());
    assert!(controller.last_frame_lines() > 0);

    // Held, not pressed again.
    engine.update_with_delta(PERIOD).unwrap();
    assert!(engine.debug_physics());

    controller.release(Key::F1);
    engine.update_with_delta(PERIOD).unwrap();
    controller.press(Key::F1);
    engine.update_with_delta(PERIOD).unwrap();
    assert!(!engine.debug_physics());
    assert_eq!(controller.last_frame_lines(), 0);
}

#[test]
fn f1_does_nothing_without_debug() {
    let data = DataDir::new();
    let (mut engine, controller) = engine(data.config());

    controller.press(Key::F1);
    engine.update_with_delta(PERIOD).unwrap();
    assert!(!engine.debug_physics());
    assert!(!engine.world().input.is_registered("_debug_physics"));
}
