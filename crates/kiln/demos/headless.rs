//! Headless: a spinning orbit hierarchy driven without a window or GPU.
//!
//! A scripted window feeds key presses, a system spins the sun, and the game
//! stops itself after two simulated seconds. Run with `RUST_LOG=info` to see
//! the engine lifecycle. With `--features physics3d` a crate also falls onto
//! the ground through rapier.

use kiln::prelude::*;

struct Spin {
    speed: f32,
}

impl Component for Spin {}

#[derive(Default)]
struct Orbits {
    planet: Option<Entity>,
    paused: bool,
}

impl Game for Orbits {
    fn on_start(&mut self, ctx: &mut Context) {
        ctx.input.bind_key("pause", KeyCode::KeyP, Trigger::Pressed);
        ctx.input.bind_key("quit", KeyCode::Escape, Trigger::Pressed);

        let (sun, sun_node) = ctx.spawn_node();
        ctx.world.add(sun, Transform::default());
        ctx.world.add(sun, Spin { speed: 1.0 });

        let (planet, planet_node) = ctx.spawn_node();
        ctx.world.add(planet, Transform::from_xyz(5.0, 0.0, 0.0));
        if let Err(err) = ctx.scene.reparent(planet_node, sun_node) {
            log::error!("{err}");
        }

        let (crate_box, _) = ctx.spawn_node();
        ctx.world.add(crate_box, Transform::from_xyz(0.0, 10.0, 0.0));
        ctx.world.add(crate_box, RigidBody::dynamic(Vec3::splat(0.5), 1.0));
        let (ground, _) = ctx.spawn_node();
        ctx.world.add(ground, Transform::default());
        ctx.world.add(ground, RigidBody::fixed(Vec3::new(20.0, 0.1, 20.0)));

        self.planet = Some(planet);
    }

    fn on_fixed_update(&mut self, ctx: &mut Context, dt: f32) {
        if self.paused {
            return;
        }
        for entity in ctx.world.view::<(Spin, Transform)>() {
            let speed = ctx.world.component::<Spin>(entity).speed;
            let transform = ctx.world.component_mut::<Transform>(entity);
            transform.rotation = Quat::from_rotation_y(speed * dt) * transform.rotation;
        }
    }

    fn on_update(&mut self, ctx: &mut Context, _dt: f32) {
        if ctx.input.action_pressed("pause") {
            self.paused = !self.paused;
            log::info!("paused: {}", self.paused);
        }
        if ctx.input.action_pressed("quit") || ctx.time.elapsed_secs() >= 2.0 {
            ctx.request_stop();
        }
    }

    fn on_shutdown(&mut self, ctx: &mut Context) {
        if let Some(planet) = self.planet {
            if let Some(global) = ctx.world.get::<GlobalTransform>(planet) {
                log::info!("planet ended at {:?}", global.translation());
            }
        }
        log::info!(
            "simulated {} frames, {} fixed steps",
            ctx.time.frame_count(),
            ctx.time.fixed_step_count()
        );
    }
}

fn main() {
    env_logger::init();

    let window = HeadlessWindow::new(1280, 720);
    let clock = ManualClock::new();
    #[allow(unused_mut)]
    let mut backends = Backends::headless()
        .window(window.clone())
        .clock(clock.clone());
    #[cfg(feature = "physics3d")]
    {
        backends = backends.physics(RapierPhysics::new());
    }

    let mut engine = Engine::new(backends);
    let config = EngineConfig {
        title: "kiln headless".to_string(),
        ..EngineConfig::default()
    };
    if let Err(err) = engine.start(Orbits::default(), config) {
        eprintln!("failed to start: {err}");
        return;
    }

    let mut frame = 0u32;
    loop {
        match frame {
            30 => window.push_event(Event::KeyDown(KeyCode::KeyP)),
            31 => window.push_event(Event::KeyUp(KeyCode::KeyP)),
            60 => window.push_event(Event::KeyDown(KeyCode::KeyP)),
            _ => {}
        }
        clock.advance(1.0 / 60.0);
        if !engine.tick() {
            break;
        }
        frame += 1;
    }
}
