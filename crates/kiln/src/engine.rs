//! # Engine: State Machine and Frame Loop
//!
//! [`Engine`] owns the world, the scene graph, the system graph, input, and
//! whichever backends the application supplied through [`Backends`]. Any
//! backend may be missing; the matching frame phase is then skipped, so a
//! bare `Engine::new(Backends::headless())` runs simulation only.
//!
//! ## States
//!
//! ```text
//! Uninitialized --start()--> Running --shutdown()--> ShuttingDown --> Uninitialized
//! ```
//!
//! `shutdown` is reached from [`Engine::request_stop`] (checked at the top of
//! the next tick), from window-close detection, or from `Drop`. Whichever
//! comes first calls [`Game::on_shutdown`]; the others find the engine no
//! longer running and do nothing.
//!
//! ## One frame
//!
//! 1. Clamp the frame delta and add it to the fixed-step accumulator.
//! 2. Poll window events: UI layer first, then input, then clear.
//!    A close request shuts down here and skips the rest of the frame.
//! 3. Fixed steps: `on_fixed_update(fixed_dt)` then the system graph
//!    (physics runs here), until the accumulator is drained or capped.
//! 4. `on_update(frame_dt)`.
//! 5. Propagate scene transforms, so render and audio see this frame's
//!    writes.
//! 6. Audio sync.
//! 7. Render: begin frame, draw items, UI draw data, end frame, swap.

use std::time::Duration;

use crate::audio::{AudioBackend, AudioSystem};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::ecs::{SystemGraph, SystemId, World};
use crate::error::EngineError;
use crate::graphics::{FrameInfo, GraphicsDevice};
use crate::input::InputSystem;
use crate::physics::{Physics, PhysicsSystem, PhysicsWorld};
use crate::platform::Window;
use crate::render::{RenderStats, RenderSystem};
use crate::scene::{SceneGraph, propagate_transforms};
use crate::time::{Clock, FixedTimestep, SystemClock, Time};
use crate::ui::UiLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Uninitialized,
    Running,
    ShuttingDown,
}

/// Callbacks implemented by the application.
pub trait Game {
    fn on_start(&mut self, _ctx: &mut Context) {}

    /// Runs once per fixed step, before the system graph. `dt` is always the
    /// configured fixed dt.
    fn on_fixed_update(&mut self, _ctx: &mut Context, _dt: f32) {}

    /// Runs once per frame after the fixed steps, with the clamped frame delta.
    fn on_update(&mut self, _ctx: &mut Context, _dt: f32) {}

    /// Runs exactly once, before any backend is released.
    fn on_shutdown(&mut self, _ctx: &mut Context) {}
}

/// The backends an engine drives. All optional.
#[derive(Default)]
pub struct Backends {
    window: Option<Box<dyn Window>>,
    graphics: Option<Box<dyn GraphicsDevice>>,
    physics: Option<Box<dyn PhysicsWorld>>,
    audio: Option<Box<dyn AudioBackend>>,
    ui: Option<Box<dyn UiLayer>>,
    clock: Option<Box<dyn Clock>>,
}

impl Backends {
    /// No window, no renderer, no physics, no audio.
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn window(mut self, window: impl Window + 'static) -> Self {
        self.window = Some(Box::new(window));
        self
    }

    pub fn graphics(mut self, device: impl GraphicsDevice + 'static) -> Self {
        self.graphics = Some(Box::new(device));
        self
    }

    pub fn physics(mut self, physics: impl PhysicsWorld + 'static) -> Self {
        self.physics = Some(Box::new(physics));
        self
    }

    pub fn audio(mut self, audio: impl AudioBackend + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    pub fn ui(mut self, ui: impl UiLayer + 'static) -> Self {
        self.ui = Some(Box::new(ui));
        self
    }

    /// Frame clock. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }
}

/// Runs one game session. `shutdown` releases every backend, so an engine
/// cannot be started again afterwards; build a new one instead.
pub struct Engine {
    state: EngineState,
    finished: bool,
    config: EngineConfig,
    world: World,
    scene: SceneGraph,
    systems: SystemGraph,
    input: InputSystem,
    time: Time,
    timestep: FixedTimestep,
    clock: Box<dyn Clock>,
    last_time: Option<Duration>,
    stop_requested: bool,
    game: Option<Box<dyn Game>>,

    window: Option<Box<dyn Window>>,
    graphics: Option<Box<dyn GraphicsDevice>>,
    render: Option<RenderSystem>,
    physics: Option<Box<dyn PhysicsWorld>>,
    physics_system: Option<SystemId>,
    audio: Option<Box<dyn AudioBackend>>,
    audio_system: Option<AudioSystem>,
    ui: Option<Box<dyn UiLayer>>,
    last_render: Option<RenderStats>,
}

impl Engine {
    pub fn new(backends: Backends) -> Self {
        let config = EngineConfig::default();
        Self {
            state: EngineState::Uninitialized,
            finished: false,
            world: World::new(),
            scene: SceneGraph::new(),
            systems: SystemGraph::new(),
            input: InputSystem::new(),
            time: Time::new(config.fixed_dt),
            timestep: FixedTimestep::new(
                config.fixed_dt,
                config.max_frame_dt,
                config.max_fixed_steps_per_frame,
            ),
            config,
            clock: backends
                .clock
                .unwrap_or_else(|| Box::new(SystemClock::new())),
            last_time: None,
            stop_requested: false,
            game: None,
            window: backends.window,
            graphics: backends.graphics,
            render: None,
            physics: backends.physics,
            physics_system: None,
            audio: backends.audio,
            audio_system: None,
            ui: backends.ui,
            last_render: None,
        }
    }

    /// Acquire subsystems, transition to `Running`, and call
    /// [`Game::on_start`].
    pub fn start(&mut self, game: impl Game + 'static, config: EngineConfig) -> Result<(), EngineError> {
        if self.state != EngineState::Uninitialized {
            return Err(EngineError::AlreadyRunning);
        }
        if self.finished {
            return Err(EngineError::Finished);
        }
        self.config = config.sanitized();
        let config = &self.config;

        match &self.window {
            Some(window) => {
                let (w, h) = window.framebuffer_size();
                log::info!("window acquired ({w}x{h})");
            }
            None => log::info!("no window, running headless"),
        }

        self.input.update(&[]);

        if let Some(device) = self.graphics.as_deref_mut() {
            let renderer = &config.renderer;
            device.set_generate_mipmaps(renderer.generate_mipmaps);
            device.set_anisotropy(renderer.anisotropy);
            device.set_environment(&renderer.environment);
            device.set_shadow_settings(&renderer.shadows);
            self.render = Some(RenderSystem::new());
        } else {
            log::info!("no graphics device, rendering disabled");
        }

        if let Some(backend) = self.physics.take() {
            self.world.insert_resource(Physics::new(backend));
            if self.physics_system.is_none() {
                self.physics_system = Some(self.systems.add_system(PhysicsSystem));
            }
        }

        if self.audio.is_some() {
            self.audio_system = Some(AudioSystem::new());
        }

        self.time = Time::new(config.fixed_dt);
        self.world.insert_resource(self.time);
        self.timestep = FixedTimestep::new(
            config.fixed_dt,
            config.max_frame_dt,
            config.max_fixed_steps_per_frame,
        );
        self.last_time = Some(self.clock.now());
        self.stop_requested = false;
        self.game = Some(Box::new(game));
        self.state = EngineState::Running;
        log::info!("engine started: {}", self.config.title);

        self.call_game(|game, ctx| game.on_start(ctx));
        Ok(())
    }

    /// Measure the frame delta and advance one frame. Returns `false` once
    /// the engine is no longer running.
    pub fn tick(&mut self) -> bool {
        if self.state != EngineState::Running {
            return false;
        }
        if self.stop_requested {
            self.shutdown();
            return false;
        }
        let now = self.clock.now();
        let frame_dt = self
            .last_time
            .map_or(0.0, |last| now.saturating_sub(last).as_secs_f32());
        self.last_time = Some(now);
        self.advance(frame_dt)
    }

    /// Advance one frame by an explicit delta. [`tick`](Self::tick) calls
    /// this with the clock's delta; event-loop adapters and tests call it
    /// directly.
    pub fn advance(&mut self, frame_dt: f32) -> bool {
        if self.state != EngineState::Running {
            return false;
        }
        let dt = self.timestep.accumulate(frame_dt);
        self.time.begin_frame(dt);
        self.world.insert_resource(self.time);

        if self.pump_events() {
            log::info!("Window close requested");
            self.shutdown();
            return false;
        }

        while self.timestep.next_step() {
            let fixed_dt = self.timestep.fixed_dt();
            self.call_game(|game, ctx| game.on_fixed_update(ctx, fixed_dt));
            self.systems.update(&mut self.world, fixed_dt);
            self.time.record_fixed_step();
            self.world.insert_resource(self.time);
        }
        self.time.set_alpha(self.timestep.alpha());
        self.world.insert_resource(self.time);

        self.call_game(|game, ctx| game.on_update(ctx, dt));
        propagate_transforms(&self.scene, &mut self.world);

        if let (Some(system), Some(backend)) = (self.audio_system.as_mut(), self.audio.as_deref_mut()) {
            system.sync(&mut self.world, backend);
        }

        self.render_frame(dt);
        true
    }

    /// Poll the window and feed UI and input. Returns `true` on close.
    fn pump_events(&mut self) -> bool {
        let Some(window) = self.window.as_deref_mut() else {
            self.input.update(&[]);
            return false;
        };
        window.poll_events();
        let events = window.events();
        if let Some(ui) = self.ui.as_deref_mut() {
            for event in events {
                ui.handle_event(event);
            }
        }
        self.input.update(events);
        window.clear_events();
        window.should_close()
    }

    fn render_frame(&mut self, dt: f32) {
        let (Some(device), Some(render)) = (self.graphics.as_deref_mut(), self.render.as_mut()) else {
            return;
        };
        let (framebuffer_size, content_scale) = match self.window.as_deref() {
            Some(window) => (window.framebuffer_size(), window.content_scale()),
            None => ((self.config.width, self.config.height), 1.0),
        };
        let frame = FrameInfo {
            frame_index: self.time.frame_count(),
            framebuffer_size,
            content_scale,
            dt,
            elapsed: self.time.elapsed_secs(),
        };

        device.begin_frame(&frame);
        self.last_render = Some(render.render(&self.world, &mut *device, framebuffer_size));
        if let Some(ui) = self.ui.as_deref_mut() {
            let data = ui.build_frame(&frame);
            device.submit_ui(&data);
        }
        device.end_frame();

        if !device.presents_itself() {
            if let Some(window) = self.window.as_deref_mut() {
                window.swap_buffers();
            }
        }
    }

    /// Stop at the top of the next [`tick`](Self::tick).
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Call [`Game::on_shutdown`] and release every subsystem in reverse
    /// order of acquisition. Does nothing unless running.
    pub fn shutdown(&mut self) {
        if self.state != EngineState::Running || self.game.is_none() {
            return;
        }
        self.state = EngineState::ShuttingDown;
        log::info!("engine shutting down");
        self.call_game(|game, ctx| game.on_shutdown(ctx));

        if let Some(mut ui) = self.ui.take() {
            ui.shutdown();
        }
        self.render = None;
        self.graphics = None;
        if let (Some(mut system), Some(backend)) = (self.audio_system.take(), self.audio.as_deref_mut()) {
            system.stop_all(backend);
        }
        self.audio = None;
        if let Some(mut physics) = self.world.take_resource::<Physics>() {
            physics.clear();
        }
        self.window = None;

        self.game = None;
        self.finished = true;
        self.state = EngineState::Uninitialized;
        log::info!("engine stopped");
    }

    /// Tick until the engine stops.
    pub fn run(&mut self) {
        while self.tick() {}
    }

    fn call_game(&mut self, f: impl FnOnce(&mut dyn Game, &mut Context<'_>)) {
        let Some(game) = self.game.as_deref_mut() else {
            return;
        };
        let mut ctx = Context::new(
            &mut self.world,
            &mut self.scene,
            &mut self.input,
            self.graphics.as_deref_mut().map(|g| g as &mut dyn GraphicsDevice),
            self.audio.as_deref_mut().map(|a| a as &mut dyn AudioBackend),
            self.time,
            &mut self.stop_requested,
        );
        f(game, &mut ctx);
    }

    // ── Accessors ──

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn system_graph_mut(&mut self) -> &mut SystemGraph {
        &mut self.systems
    }

    /// Id of the built-in physics system, once registered by `start`.
    pub fn physics_system(&self) -> Option<SystemId> {
        self.physics_system
    }

    pub fn input(&self) -> &InputSystem {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputSystem {
        &mut self.input
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn frame_count(&self) -> u64 {
        self.time.frame_count()
    }

    pub fn fixed_step_count(&self) -> u64 {
        self.time.fixed_step_count()
    }

    pub fn render_system_mut(&mut self) -> Option<&mut RenderSystem> {
        self.render.as_mut()
    }

    pub fn last_render_stats(&self) -> Option<RenderStats> {
        self.last_render
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::audio::testing::{AudioCall, RecordingAudio};
    use crate::audio::{AudioSource, ClipHandle};
    use crate::graphics::testing::{Call, RecordingDevice};
    use crate::graphics::{MaterialHandle, MeshHandle};
    use crate::input::Key;
    use crate::math::{GlobalTransform, Transform, Vec3};
    use crate::physics::RigidBody;
    use crate::physics::testing::FakePhysics;
    use crate::platform::{Event, HeadlessWindow};
    use crate::render::MeshRenderer;
    use crate::time::ManualClock;
    use crate::ui::UiDrawData;

    type Hook = Box<dyn FnMut(&mut Context)>;

    #[derive(Default)]
    struct Counts {
        starts: Cell<u32>,
        fixed: RefCell<Vec<f32>>,
        updates: RefCell<Vec<f32>>,
        shutdowns: Cell<u32>,
    }

    struct Scripted {
        counts: Rc<Counts>,
        start_hook: Option<Hook>,
        update_hook: Option<Hook>,
    }

    impl Scripted {
        fn new() -> (Self, Rc<Counts>) {
            let counts = Rc::new(Counts::default());
            let game = Self {
                counts: counts.clone(),
                start_hook: None,
                update_hook: None,
            };
            (game, counts)
        }

        fn on_start_do(mut self, hook: impl FnMut(&mut Context) + 'static) -> Self {
            self.start_hook = Some(Box::new(hook));
            self
        }

        fn on_update_do(mut self, hook: impl FnMut(&mut Context) + 'static) -> Self {
            self.update_hook = Some(Box::new(hook));
            self
        }
    }

    impl Game for Scripted {
        fn on_start(&mut self, ctx: &mut Context) {
            self.counts.starts.set(self.counts.starts.get() + 1);
            if let Some(hook) = &mut self.start_hook {
                hook(ctx);
            }
        }

        fn on_fixed_update(&mut self, _ctx: &mut Context, dt: f32) {
            self.counts.fixed.borrow_mut().push(dt);
        }

        fn on_update(&mut self, ctx: &mut Context, dt: f32) {
            self.counts.updates.borrow_mut().push(dt);
            if let Some(hook) = &mut self.update_hook {
                hook(ctx);
            }
        }

        fn on_shutdown(&mut self, _ctx: &mut Context) {
            self.counts.shutdowns.set(self.counts.shutdowns.get() + 1);
        }
    }

    #[derive(Clone, Default)]
    struct RecordingUi {
        seen: Rc<RefCell<Vec<Event>>>,
        shut_down: Rc<Cell<bool>>,
    }

    impl UiLayer for RecordingUi {
        fn handle_event(&mut self, event: &Event) -> bool {
            self.seen.borrow_mut().push(event.clone());
            false
        }

        fn build_frame(&mut self, _frame: &FrameInfo) -> UiDrawData {
            UiDrawData::default()
        }

        fn shutdown(&mut self) {
            self.shut_down.set(true);
        }
    }

    fn config(fixed_dt: f32, max_frame_dt: f32, max_steps: u32) -> EngineConfig {
        EngineConfig {
            fixed_dt,
            max_frame_dt,
            max_fixed_steps_per_frame: max_steps,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn starts_running_and_calls_on_start() {
        let (game, counts) = Scripted::new();
        let mut engine = Engine::new(Backends::headless());
        assert_eq!(engine.state(), EngineState::Uninitialized);
        engine.start(game, EngineConfig::default()).unwrap();
        assert!(engine.is_running());
        assert_eq!(counts.starts.get(), 1);
        assert!(engine.world().has_resource::<Time>());
    }

    #[test]
    fn start_twice_is_an_error() {
        let mut engine = Engine::new(Backends::headless());
        engine.start(Scripted::new().0, EngineConfig::default()).unwrap();
        assert!(matches!(
            engine.start(Scripted::new().0, EngineConfig::default()),
            Err(EngineError::AlreadyRunning)
        ));
    }

    #[test]
    fn shutdown_runs_exactly_once() {
        let (game, counts) = Scripted::new();
        let mut engine = Engine::new(Backends::headless());
        engine.start(game, EngineConfig::default()).unwrap();

        engine.request_stop();
        assert!(!engine.tick());
        assert!(!engine.tick());
        engine.shutdown();
        assert_eq!(counts.shutdowns.get(), 1);
        assert_eq!(engine.state(), EngineState::Uninitialized);

        drop(engine);
        assert_eq!(counts.shutdowns.get(), 1);
    }

    #[test]
    fn drop_shuts_down() {
        let (game, counts) = Scripted::new();
        let mut engine = Engine::new(Backends::headless());
        engine.start(game, EngineConfig::default()).unwrap();
        drop(engine);
        assert_eq!(counts.shutdowns.get(), 1);
    }

    #[test]
    fn tick_before_start_is_a_noop() {
        let mut engine = Engine::new(Backends::headless());
        assert!(!engine.tick());
        assert!(!engine.advance(0.1));
        engine.shutdown();
        assert_eq!(engine.frame_count(), 0);
    }

    #[test]
    fn stop_requested_from_a_callback_applies_next_tick() {
        let (game, counts) = Scripted::new();
        let game = game.on_update_do(|ctx| ctx.request_stop());
        let mut engine = Engine::new(Backends::headless());
        engine.start(game, EngineConfig::default()).unwrap();

        assert!(engine.advance(0.01));
        assert!(engine.is_running());
        assert!(!engine.tick());
        assert_eq!(counts.shutdowns.get(), 1);
        assert_eq!(counts.updates.borrow().len(), 1);
    }

    #[test]
    fn fixed_steps_follow_the_accumulator() {
        let (game, counts) = Scripted::new();
        let mut engine = Engine::new(Backends::headless());
        engine.start(game, EngineConfig::default()).unwrap();

        let mut per_frame = Vec::new();
        for dt in [0.0167, 0.0167, 0.05] {
            let before = engine.fixed_step_count();
            engine.advance(dt);
            per_frame.push(engine.fixed_step_count() - before);
        }
        assert_eq!(per_frame, vec![1, 1, 3]);
        assert!(counts.fixed.borrow().iter().all(|&dt| dt == 1.0 / 60.0));
        assert_eq!(counts.fixed.borrow().len(), 5);
        assert_eq!(*counts.updates.borrow(), vec![0.0167, 0.0167, 0.05]);
    }

    #[test]
    fn tick_measures_the_clock() {
        let clock = ManualClock::new();
        let (game, counts) = Scripted::new();
        let mut engine = Engine::new(Backends::headless().clock(clock.clone()));
        engine.start(game, config(0.125, 1.0, 0)).unwrap();

        clock.advance(0.5);
        assert!(engine.tick());
        assert_eq!(engine.fixed_step_count(), 4);
        assert_eq!(*counts.updates.borrow(), vec![0.5]);
    }

    #[test]
    fn long_frames_are_clamped_and_capped() {
        let mut engine = Engine::new(Backends::headless());
        engine.start(Scripted::new().0, config(0.125, 0.5, 2)).unwrap();

        engine.advance(10.0);
        assert_eq!(engine.time().delta_secs(), 0.5);
        assert_eq!(engine.fixed_step_count(), 2);

        // The dropped steps are not replayed.
        engine.advance(0.0);
        assert_eq!(engine.fixed_step_count(), 2);
    }

    #[test]
    fn systems_run_once_per_fixed_step() {
        let mut engine = Engine::new(Backends::headless());
        let runs = Rc::new(Cell::new(0u32));
        let r = runs.clone();
        engine
            .system_graph_mut()
            .add_system(move |_world: &mut World, dt: f32| {
                assert_eq!(dt, 0.125);
                r.set(r.get() + 1);
            });
        engine.start(Scripted::new().0, config(0.125, 1.0, 0)).unwrap();

        engine.advance(0.25);
        engine.advance(0.1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn events_reach_ui_then_input() {
        let window = HeadlessWindow::new(640, 480);
        let ui = RecordingUi::default();
        let mut engine = Engine::new(
            Backends::headless()
                .window(window.clone())
                .ui(ui.clone()),
        );
        engine.start(Scripted::new().0, EngineConfig::default()).unwrap();

        window.push_event(Event::KeyDown(Key::KeyW));
        engine.advance(0.01);
        assert_eq!(*ui.seen.borrow(), vec![Event::KeyDown(Key::KeyW)]);
        assert!(engine.input().key_pressed(Key::KeyW));

        engine.advance(0.01);
        assert!(engine.input().key_down(Key::KeyW));
        assert!(!engine.input().key_pressed(Key::KeyW));
    }

    #[test]
    fn window_close_shuts_down_before_the_frame_runs() {
        let window = HeadlessWindow::new(640, 480);
        let (game, counts) = Scripted::new();
        let mut engine = Engine::new(Backends::headless().window(window.clone()));
        engine.start(game, EngineConfig::default()).unwrap();

        window.request_close();
        assert!(!engine.advance(0.1));
        assert!(counts.updates.borrow().is_empty());
        assert!(counts.fixed.borrow().is_empty());
        assert_eq!(counts.shutdowns.get(), 1);
        assert!(!engine.tick());
    }

    #[test]
    fn renders_a_frame_and_swaps() {
        let window = HeadlessWindow::new(800, 600);
        let device = RecordingDevice::default();
        let mut engine = Engine::new(
            Backends::headless()
                .window(window.clone())
                .graphics(device.clone())
                .ui(RecordingUi::default()),
        );
        let game = Scripted::new().0.on_start_do(|ctx| {
            let e = ctx.world.create_entity();
            ctx.world.add(e, Transform::default());
            ctx.world.add(e, MeshRenderer::new(MeshHandle(1), MaterialHandle(1)));
        });
        engine.start(game, EngineConfig::default()).unwrap();

        let calls = device.calls();
        assert_eq!(
            &calls[..2],
            &[Call::Mipmaps(true), Call::Anisotropy(8)]
        );
        assert_eq!(&calls[2..], &[Call::Environment, Call::Shadows]);

        engine.advance(0.01);
        let calls = device.calls();
        let frame = &calls[4..];
        assert_eq!(frame.first(), Some(&Call::BeginFrame(1)));
        assert_eq!(frame.last(), Some(&Call::EndFrame));
        assert!(frame.contains(&Call::Ui(0)));
        assert_eq!(device.submitted().len(), 1);
        assert_eq!(window.swap_count(), 1);
        assert_eq!(engine.last_render_stats().map(|s| s.draw_items), Some(1));
    }

    #[test]
    fn self_presenting_device_skips_swap() {
        let window = HeadlessWindow::new(800, 600);
        let device = RecordingDevice::presenting();
        let mut engine = Engine::new(Backends::headless().window(window.clone()).graphics(device));
        engine.start(Scripted::new().0, EngineConfig::default()).unwrap();
        engine.advance(0.01);
        assert_eq!(window.swap_count(), 0);
    }

    #[test]
    fn headless_runs_simulation_only() {
        let (game, counts) = Scripted::new();
        let mut engine = Engine::new(Backends::headless());
        engine.start(game, EngineConfig::default()).unwrap();
        for _ in 0..10 {
            assert!(engine.advance(1.0 / 60.0));
        }
        assert!(engine.last_render_stats().is_none());
        assert!(engine.render_system_mut().is_none());
        assert_eq!(counts.updates.borrow().len(), 10);
    }

    #[test]
    fn shutdown_releases_backends() {
        let device = RecordingDevice::default();
        let ui = RecordingUi::default();
        let fake = FakePhysics::default();
        let (game, counts) = Scripted::new();
        let mut engine = Engine::new(
            Backends::headless()
                .graphics(device.clone())
                .ui(ui.clone())
                .physics(fake.clone()),
        );
        let game = game.on_start_do(|ctx| {
            let e = ctx.world.create_entity();
            ctx.world.add(e, Transform::default());
            ctx.world.add(e, RigidBody::fixed(Vec3::ONE));
        });
        engine.start(game, EngineConfig::default()).unwrap();
        engine.advance(0.02);
        assert_eq!(fake.bodies.borrow().len(), 1);

        engine.shutdown();
        assert_eq!(counts.shutdowns.get(), 1);
        assert!(ui.shut_down.get());
        assert_eq!(Rc::strong_count(&device.calls), 1);
        assert!(fake.bodies.borrow().is_empty());
        assert!(!engine.world().has_resource::<Physics>());
    }

    #[test]
    fn physics_steps_with_the_fixed_dt() {
        let fake = FakePhysics::default();
        let mut engine = Engine::new(Backends::headless().physics(fake.clone()));
        engine.start(Scripted::new().0, config(0.125, 1.0, 0)).unwrap();
        assert!(engine.physics_system().is_some());

        engine.advance(0.375);
        assert_eq!(*fake.steps.borrow(), vec![0.125, 0.125, 0.125]);
    }

    #[test]
    fn audio_sources_start_after_update() {
        let audio = RecordingAudio::default();
        let mut engine = Engine::new(Backends::headless().audio(audio.clone()));
        let game = Scripted::new().0.on_start_do(|ctx| {
            let e = ctx.world.create_entity();
            ctx.world.add(e, AudioSource::new(ClipHandle(1)).auto_play());
        });
        engine.start(game, EngineConfig::default()).unwrap();
        assert!(audio.calls.borrow().is_empty());

        engine.advance(0.01);
        assert!(matches!(audio.calls.borrow()[0], AudioCall::Play(ClipHandle(1), _)));

        engine.shutdown();
        assert!(audio.playing.borrow().is_empty());
    }

    #[test]
    fn scene_transforms_are_propagated_each_frame() {
        let child = Rc::new(Cell::new(None));
        let slot = child.clone();
        let game = Scripted::new().0.on_start_do(move |ctx| {
            let (parent, parent_node) = ctx.spawn_node();
            let (kid, kid_node) = ctx.spawn_node();
            ctx.world.add(parent, Transform::from_xyz(1.0, 0.0, 0.0));
            ctx.world.add(kid, Transform::from_xyz(0.0, 2.0, 0.0));
            ctx.scene.reparent(kid_node, parent_node).unwrap();
            slot.set(Some(kid));
        });
        let mut engine = Engine::new(Backends::headless());
        engine.start(game, EngineConfig::default()).unwrap();
        engine.advance(0.01);

        let kid = child.get().unwrap();
        let global = engine.world().component::<GlobalTransform>(kid);
        assert_eq!(global.translation(), Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn render_sees_transforms_written_in_on_update() {
        let device = RecordingDevice::default();
        let spawned = Rc::new(Cell::new(None));
        let slot = spawned.clone();
        let game = Scripted::new()
            .0
            .on_start_do(move |ctx| {
                let (entity, node) = ctx.spawn_node();
                ctx.world.add(entity, Transform::default());
                ctx.world.add(entity, MeshRenderer::new(MeshHandle(1), MaterialHandle(1)));
                slot.set(Some((entity, node)));
            })
            .on_update_do({
                let spawned = spawned.clone();
                move |ctx| {
                    if let Some((entity, _)) = spawned.get() {
                        ctx.world.component_mut::<Transform>(entity).translation.x += 1.0;
                    }
                }
            });
        let mut engine = Engine::new(Backends::headless().graphics(device.clone()));
        engine.start(game, EngineConfig::default()).unwrap();

        engine.advance(0.01);
        let drawn = device.submitted();
        assert_eq!(drawn.last().map(|d| d.model.col(3).x), Some(1.0));

        // Out of the scene, the entity is drawn from its local transform.
        let (entity, node) = spawned.get().unwrap();
        engine.scene_mut().destroy_node(node);
        engine.world_mut().component_mut::<Transform>(entity).translation.x = 100.0;
        engine.advance(0.01);
        assert!(!engine.world().has::<GlobalTransform>(entity));
        let drawn = device.submitted();
        assert_eq!(drawn.last().map(|d| d.model.col(3).x), Some(101.0));
    }

    #[test]
    fn default_config_keeps_all_simulated_time() {
        let mut engine = Engine::new(Backends::headless());
        engine.start(Scripted::new().0, EngineConfig::default()).unwrap();
        // floor(0.205 / (1/60)) = 12
        engine.advance(0.205);
        assert_eq!(engine.fixed_step_count(), 12);
    }

    #[test]
    fn restart_after_shutdown_is_an_error() {
        let mut engine = Engine::new(Backends::headless().physics(FakePhysics::default()));
        engine.start(Scripted::new().0, EngineConfig::default()).unwrap();
        engine.shutdown();
        assert!(matches!(
            engine.start(Scripted::new().0, EngineConfig::default()),
            Err(EngineError::Finished)
        ));
        assert!(!engine.is_running());
    }
}
