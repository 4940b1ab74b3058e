//! # Graphics Device: The Renderer Boundary
//!
//! Everything GPU-specific lives behind [`GraphicsDevice`]. The engine hands
//! it plain data once per frame:
//!
//! ```text
//! begin_frame(FrameInfo)
//!   set_camera / set_lights            collected from the World
//!   submit(DrawItem) x N               sorted by (layer, material, mesh)
//!   render_layer(layer, target) x M    layers routed to offscreen targets
//!   submit_ui(UiDrawData)              if a UI layer is attached
//! end_frame()
//! ```
//!
//! Resources are created from descriptors and referenced by small copyable
//! handles. The device owns the GPU objects; destroying a handle twice or
//! using a stale one is the device's problem to ignore or report.

use crate::config::{EnvironmentSettings, ShadowSettings};
use crate::error::BackendError;
use crate::math::{Mat4, Vec3};
use crate::ui::UiDrawData;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

handle!(
    /// A mesh created by [`GraphicsDevice::create_mesh`].
    MeshHandle
);
handle!(
    /// A material created by [`GraphicsDevice::create_material`].
    MaterialHandle
);
handle!(
    /// A texture created by [`GraphicsDevice::create_texture`].
    TextureHandle
);
handle!(
    /// An offscreen target created by [`GraphicsDevice::create_render_target`].
    RenderTargetHandle
);

// ── Descriptors ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default)]
pub struct MeshDesc {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// PBR metallic-roughness material parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub base_color: [f32; 4],
    pub base_color_texture: Option<TextureHandle>,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            metallic: 0.0,
            roughness: 0.5,
            emissive: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8Srgb,
    Rgba8Unorm,
    Rgba16Float,
    Depth32Float,
}

/// Already-decoded pixel data. Image file parsing is left to the caller.
#[derive(Debug, Clone, Default)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub depth: bool,
}

// ── Per-frame data ───────────────────────────────────────────────────────

/// Passed to [`GraphicsDevice::begin_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub frame_index: u64,
    pub framebuffer_size: (u32, u32),
    pub content_scale: f32,
    /// Frame delta in seconds, after clamping.
    pub dt: f32,
    pub elapsed: f64,
}

/// One mesh instance to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    /// World-space model matrix.
    pub model: Mat4,
    pub layer: u32,
    pub cast_shadows: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightData {
    Directional {
        /// Direction the light shines toward, normalized.
        direction: Vec3,
        color: [f32; 3],
        intensity: f32,
        cast_shadows: bool,
    },
    Point {
        position: Vec3,
        color: [f32; 3],
        intensity: f32,
        radius: f32,
    },
}

/// A renderer backend.
pub trait GraphicsDevice {
    fn begin_frame(&mut self, frame: &FrameInfo);
    fn end_frame(&mut self);

    fn create_mesh(&mut self, desc: &MeshDesc) -> Result<MeshHandle, BackendError>;
    fn destroy_mesh(&mut self, mesh: MeshHandle);
    fn create_material(&mut self, desc: &MaterialDesc) -> Result<MaterialHandle, BackendError>;
    fn destroy_material(&mut self, material: MaterialHandle);
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, BackendError>;
    fn destroy_texture(&mut self, texture: TextureHandle);
    fn create_render_target(
        &mut self,
        desc: &RenderTargetDesc,
    ) -> Result<RenderTargetHandle, BackendError>;
    fn destroy_render_target(&mut self, target: RenderTargetHandle);

    /// Queue one draw for the current frame.
    fn submit(&mut self, item: &DrawItem);

    /// Draw the items submitted on `layer` into `target`.
    fn render_layer(&mut self, layer: u32, target: RenderTargetHandle);

    fn set_camera(&mut self, camera: &CameraData);
    fn set_lights(&mut self, lights: &[LightData]);
    fn set_environment(&mut self, environment: &EnvironmentSettings);
    fn set_shadow_settings(&mut self, shadows: &ShadowSettings);
    fn set_anisotropy(&mut self, level: u8);
    fn set_generate_mipmaps(&mut self, enabled: bool);

    fn submit_ui(&mut self, data: &UiDrawData);

    /// True if `end_frame` also presents, so the engine must not swap the
    /// window's buffers itself.
    fn presents_itself(&self) -> bool {
        false
    }
}
