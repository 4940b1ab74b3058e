//! # Kiln: Game Engine Core
//!
//! A small engine core built around a sparse-set ECS, a scene graph, a
//! dependency-ordered system graph, and a fixed-timestep frame loop.
//! Windows, renderers, physics and audio plug in behind traits; any of them
//! can be left out to run headless.
//!
//! Start with `use kiln::prelude::*`, implement [`Game`](engine::Game), and
//! drive an [`Engine`](engine::Engine).

pub mod audio;
pub mod config;
pub mod context;
pub mod ecs;
pub mod engine;
pub mod error;
pub mod graphics;
pub mod input;
pub mod math;
pub mod physics;
pub mod platform;
pub mod prelude;
pub mod render;
pub mod scene;
pub mod time;
pub mod ui;

#[cfg(feature = "audio")]
pub mod audio_kira;

#[cfg(feature = "physics3d")]
pub mod physics_rapier;
