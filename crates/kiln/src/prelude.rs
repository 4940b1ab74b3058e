//! Convenience re-exports: `use kiln::prelude::*` for the common items.

// Core
pub use crate::config::{EngineConfig, EnvironmentSettings, RendererConfig, ShadowSettings};
pub use crate::context::Context;
pub use crate::ecs::{Component, Entity, System, SystemGraph, SystemId, World};
pub use crate::engine::{Backends, Engine, EngineState, Game};
pub use crate::error::{BackendError, ComponentError, EngineError};
pub use crate::input::{InputSystem, Key, KeyCode, MouseButton, Trigger};
pub use crate::math::{GlobalTransform, Mat4, Quat, Transform, Vec2, Vec3, Vec4};
pub use crate::platform::{Event, HeadlessWindow, Window};
pub use crate::scene::{NodeId, SceneGraph};
pub use crate::time::{ManualClock, SystemClock, Time};

// Rendering
pub use crate::graphics::{
    GraphicsDevice, MaterialDesc, MaterialHandle, MeshDesc, MeshHandle, RenderTargetHandle,
    TextureHandle,
};
pub use crate::render::{Camera, DirectionalLight, MeshRenderer, PointLight};
pub use crate::ui::{UiDrawData, UiLayer};

// Physics
pub use crate::physics::{
    BodyKind, CharacterController, Collider, Physics, PhysicsWorld, RigidBody, StaticMesh,
};
#[cfg(feature = "physics3d")]
pub use crate::physics_rapier::RapierPhysics;

// Audio
pub use crate::audio::{AudioBackend, AudioListener, AudioSource, ClipHandle, PlayParams};
#[cfg(feature = "audio")]
pub use crate::audio_kira::KiraAudio;
