//! Frame timing, the fixed-step accumulator, and clocks.
//!
//! The [`Time`] resource is updated by the engine at the start of each frame
//! and after every fixed step. Systems and game callbacks read it for frame
//! delta, elapsed time, and interpolation alpha.
//!
//! [`FixedTimestep`] is the accumulator that decouples the simulation rate
//! from the render rate:
//!
//! ```text
//! frame dt:    0.0167   0.0167   0.0500
//! accumulator: 0.0167   0.0167   0.0501    (after adding, carry included)
//! steps:       1        1        3         each exactly fixed_dt = 1/60
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Frame timing resource. Inserted by the engine and updated each frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Time {
    delta: f32,
    elapsed: f64,
    fixed_dt: f32,
    frame_count: u64,
    fixed_step_count: u64,
    alpha: f32,
}

impl Time {
    pub(crate) fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt,
            ..Self::default()
        }
    }

    /// Call at the start of each frame with the clamped frame delta.
    pub(crate) fn begin_frame(&mut self, delta: f32) {
        self.delta = delta;
        self.elapsed += f64::from(delta);
        self.frame_count += 1;
    }

    pub(crate) fn record_fixed_step(&mut self) {
        self.fixed_step_count += 1;
    }

    pub(crate) fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    /// Delta time of the current frame in seconds, after clamping.
    pub fn delta_secs(&self) -> f32 {
        self.delta
    }

    /// Total simulated time since start, in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Number of frames advanced so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Number of fixed steps run so far.
    pub fn fixed_step_count(&self) -> u64 {
        self.fixed_step_count
    }

    /// How far the current frame lies between the last fixed step and the
    /// next, in `[0, 1)`. Use it to interpolate rendered poses.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta > 0.0 {
            1.0 / self.delta
        } else {
            0.0
        }
    }
}

/// Fixed-timestep accumulator.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    fixed_dt: f32,
    max_frame_dt: f32,
    /// Steps allowed per frame. 0 means unlimited.
    max_steps: u32,
    accumulator: f32,
    steps_this_frame: u32,
}

impl FixedTimestep {
    pub fn new(fixed_dt: f32, max_frame_dt: f32, max_steps: u32) -> Self {
        Self {
            fixed_dt,
            max_frame_dt,
            max_steps,
            accumulator: 0.0,
            steps_this_frame: 0,
        }
    }

    /// Add a frame's wall-clock delta. Negative deltas count as zero and large
    /// ones are clamped to `max_frame_dt`. Returns the delta actually added.
    pub fn accumulate(&mut self, frame_dt: f32) -> f32 {
        let dt = frame_dt.clamp(0.0, self.max_frame_dt);
        self.accumulator += dt;
        self.steps_this_frame = 0;
        dt
    }

    /// Consume one fixed step if enough time has accumulated.
    ///
    /// Once the per-frame step cap is hit, whole steps still owed are dropped
    /// and only the fractional carry is kept.
    pub fn next_step(&mut self) -> bool {
        if self.accumulator < self.fixed_dt {
            return false;
        }
        if self.max_steps != 0 && self.steps_this_frame >= self.max_steps {
            let dropped = (self.accumulator / self.fixed_dt).floor();
            log::debug!("fixed step cap of {} reached, dropping {dropped} steps", self.max_steps);
            self.accumulator -= dropped * self.fixed_dt;
            return false;
        }
        self.accumulator -= self.fixed_dt;
        self.steps_this_frame += 1;
        true
    }

    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_dt
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Steps consumed since the last [`accumulate`](Self::accumulate).
    pub fn steps_this_frame(&self) -> u32 {
        self.steps_this_frame
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.steps_this_frame = 0;
    }
}

/// A monotonic time source for the frame loop.
pub trait Clock {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time via [`Instant`].
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one copy and hand the
/// other to the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: f32) {
        self.now.set(self.now.get() + Duration::from_secs_f32(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
