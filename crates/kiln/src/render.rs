//! # Render: Query the ECS and Feed the Graphics Device
//!
//! Each frame the [`RenderSystem`] gathers everything visible in the world
//! and hands it to a [`GraphicsDevice`] as plain data:
//!
//! 1. The first active [`Camera`] becomes [`CameraData`].
//! 2. Every [`DirectionalLight`] and [`PointLight`] becomes [`LightData`].
//! 3. Every [`MeshRenderer`] becomes a [`DrawItem`], sorted by
//!    `(layer, material, mesh)` so the device sees state changes grouped.
//! 4. Layers routed to an offscreen target get a `render_layer` call.
//!
//! World matrices come from [`GlobalTransform`] when the scene graph has
//! computed one, otherwise from the local [`Transform`].

use std::collections::BTreeMap;

use crate::ecs::{Component, Entity, World};
use crate::graphics::{
    CameraData, DrawItem, GraphicsDevice, LightData, MaterialHandle, MeshHandle,
    RenderTargetHandle,
};
use crate::math::{GlobalTransform, Mat4, Transform, Vec3};

/// Draws a mesh with a material at the entity's transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshRenderer {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    /// Layer 0 is the main view.
    pub layer: u32,
    pub cast_shadows: bool,
}

impl MeshRenderer {
    pub fn new(mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self {
            mesh,
            material,
            layer: 0,
            cast_shadows: true,
        }
    }

    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }
}

impl Component for MeshRenderer {}

/// Perspective camera. Pair with a transform for position and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Vertical field of view in degrees. Default: 45.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Only the first active camera is used.
    pub active: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y: 45.0,
            near: 0.1,
            far: 1000.0,
            active: true,
        }
    }
}

impl Component for Camera {}

/// A directional light (like the sun). No position, only direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light is shining *toward*.
    pub direction: Vec3,
    /// Light color (linear RGB).
    pub color: [f32; 3],
    pub intensity: f32,
    pub cast_shadows: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.5, -1.0, -0.5),
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            cast_shadows: true,
        }
    }
}

impl Component for DirectionalLight {}

/// Emits light in all directions from the entity's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Light falls off to zero at this distance.
    pub radius: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            radius: 10.0,
        }
    }
}

impl Component for PointLight {}

/// What one [`RenderSystem::render`] call sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub has_camera: bool,
    pub lights: usize,
    pub draw_items: usize,
    pub layers_rendered: usize,
}

fn world_matrix(world: &World, entity: Entity) -> Option<Mat4> {
    world
        .get::<GlobalTransform>(entity)
        .map(|g| g.matrix)
        .or_else(|| world.get::<Transform>(entity).map(Transform::matrix))
}

#[derive(Debug, Default)]
pub struct RenderSystem {
    layer_targets: BTreeMap<u32, RenderTargetHandle>,
}

impl RenderSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `layer` to an offscreen target. Replaces any previous target.
    pub fn layer_target(&mut self, layer: u32, target: RenderTargetHandle) {
        self.layer_targets.insert(layer, target);
    }

    pub fn clear_layer_target(&mut self, layer: u32) -> Option<RenderTargetHandle> {
        self.layer_targets.remove(&layer)
    }

    /// Collect and submit one frame. Call between the device's
    /// `begin_frame` and `end_frame`.
    pub fn render(
        &mut self,
        world: &World,
        device: &mut dyn GraphicsDevice,
        framebuffer_size: (u32, u32),
    ) -> RenderStats {
        let mut stats = RenderStats::default();

        if let Some(camera) = collect_camera(world, framebuffer_size) {
            device.set_camera(&camera);
            stats.has_camera = true;
        }

        let lights = collect_lights(world);
        device.set_lights(&lights);
        stats.lights = lights.len();

        let items = collect_draw_items(world);
        for item in &items {
            device.submit(item);
        }
        stats.draw_items = items.len();

        for (&layer, &target) in &self.layer_targets {
            device.render_layer(layer, target);
            stats.layers_rendered += 1;
        }

        stats
    }
}

fn collect_camera(world: &World, framebuffer_size: (u32, u32)) -> Option<CameraData> {
    let (width, height) = framebuffer_size;
    let aspect = width as f32 / height.max(1) as f32;

    world.view::<(Camera,)>().into_iter().find_map(|entity| {
        let camera = world.component::<Camera>(entity);
        if !camera.active {
            return None;
        }
        let matrix = world_matrix(world, entity)?;
        Some(CameraData {
            view: matrix.inverse(),
            projection: Mat4::perspective_rh(camera.fov_y.to_radians(), aspect, camera.near, camera.far),
            position: matrix.col(3).truncate(),
            near: camera.near,
            far: camera.far,
        })
    })
}

fn collect_lights(world: &World) -> Vec<LightData> {
    let mut lights: Vec<LightData> = world
        .view::<(DirectionalLight,)>()
        .into_iter()
        .map(|entity| {
            let light = world.component::<DirectionalLight>(entity);
            LightData::Directional {
                direction: light.direction.normalize_or_zero(),
                color: light.color,
                intensity: light.intensity,
                cast_shadows: light.cast_shadows,
            }
        })
        .collect();

    for entity in world.view::<(PointLight,)>() {
        let Some(matrix) = world_matrix(world, entity) else {
            continue;
        };
        let light = world.component::<PointLight>(entity);
        lights.push(LightData::Point {
            position: matrix.col(3).truncate(),
            color: light.color,
            intensity: light.intensity,
            radius: light.radius,
        });
    }
    lights
}

fn collect_draw_items(world: &World) -> Vec<DrawItem> {
    let mut items: Vec<DrawItem> = world
        .view::<(MeshRenderer,)>()
        .into_iter()
        .filter_map(|entity| {
            let renderer = world.component::<MeshRenderer>(entity);
            Some(DrawItem {
                mesh: renderer.mesh,
                material: renderer.material,
                model: world_matrix(world, entity)?,
                layer: renderer.layer,
                cast_shadows: renderer.cast_shadows,
            })
        })
        .collect();
    items.sort_by_key(|item| (item.layer, item.material, item.mesh));
    items
}
