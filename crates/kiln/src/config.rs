//! Engine configuration.
//!
//! Everything is `#[serde(default)]`, so a config file only needs the keys it
//! wants to change:
//!
//! ```json
//! {
//!   "title": "Marble Run",
//!   "fixed_dt": 0.008333,
//!   "renderer": { "shadows": { "resolution": 4096 } }
//! }
//! ```
//!
//! [`Engine::start`](crate::engine::Engine::start) runs the config through
//! [`EngineConfig::sanitized`] before using it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::Vec3;

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Simulation step in seconds.
    pub fixed_dt: f32,
    /// Upper bound on a single frame's delta, in seconds.
    pub max_frame_dt: f32,
    /// Fixed steps allowed per frame. 0 means unlimited, which is safe
    /// because `max_frame_dt` already bounds the work. A nonzero cap below
    /// `max_frame_dt / fixed_dt` drops simulated time on long frames.
    pub max_fixed_steps_per_frame: u32,
    pub renderer: RendererConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "kiln".to_string(),
            width: 1280,
            height: 720,
            fixed_dt: 1.0 / 60.0,
            max_frame_dt: 0.25,
            max_fixed_steps_per_frame: 0,
            renderer: RendererConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A copy with every value forced into its valid range.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let mut out = self.clone();
        if !(out.fixed_dt.is_finite() && out.fixed_dt > 0.0) {
            log::warn!("invalid fixed_dt {}, using {}", out.fixed_dt, defaults.fixed_dt);
            out.fixed_dt = defaults.fixed_dt;
        }
        if !out.max_frame_dt.is_finite() || out.max_frame_dt < out.fixed_dt {
            log::warn!(
                "max_frame_dt {} is below fixed_dt {}, raising it",
                out.max_frame_dt,
                out.fixed_dt
            );
            out.max_frame_dt = out.fixed_dt.max(defaults.max_frame_dt);
        }
        out.width = out.width.max(1);
        out.height = out.height.max(1);
        out.renderer.anisotropy = out.renderer.anisotropy.clamp(1, 16);
        let shadows = &mut out.renderer.shadows;
        shadows.resolution = shadows.resolution.clamp(256, 8192);
        shadows.cascade_count = shadows.cascade_count.clamp(1, 4);
        shadows.max_distance = shadows.max_distance.max(0.0);
        out.renderer.environment.intensity = out.renderer.environment.intensity.max(0.0);
        out
    }
}

/// Settings forwarded to the graphics device at start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub generate_mipmaps: bool,
    /// Anisotropic filtering level, 1..=16.
    pub anisotropy: u8,
    pub environment: EnvironmentSettings,
    pub shadows: ShadowSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            generate_mipmaps: true,
            anisotropy: 8,
            environment: EnvironmentSettings::default(),
            shadows: ShadowSettings::default(),
        }
    }
}

/// Image-based lighting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    /// Environment map the backend should load, if any.
    pub map: Option<PathBuf>,
    pub intensity: f32,
    /// Flat ambient color used when there is no map.
    pub ambient: Vec3,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            map: None,
            intensity: 1.0,
            ambient: Vec3::splat(0.1),
        }
    }
}

/// Directional shadow settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub enabled: bool,
    /// Shadow map size in texels, 256..=8192.
    pub resolution: u32,
    /// Cascades for the directional light, 1..=4.
    pub cascade_count: u32,
    pub max_distance: f32,
    pub bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            resolution: 2048,
            cascade_count: 3,
            max_distance: 100.0,
            bias: 0.005,
        }
    }
}
