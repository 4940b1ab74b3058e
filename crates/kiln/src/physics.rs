//! # Physics: Components, Backend Trait, and the Sync System
//!
//! Collision math lives in a backend behind [`PhysicsWorld`]. This module
//! keeps ECS components and backend bodies in step.
//!
//! ## Ownership of the pose
//!
//! Once an entity has both a [`Transform`] and a [`RigidBody`], the body
//! decides who writes the pose:
//!
//! | Body kind   | Each fixed step                            | Transform flags                       |
//! |-------------|--------------------------------------------|---------------------------------------|
//! | `Dynamic`   | backend pose is pulled into `Transform`    | `has_physics`, `warn_on_write`        |
//! | `Kinematic` | `Transform` is pushed to the backend       | `has_physics`                         |
//! | `Static`    | nothing; created once at its first pose    | `has_physics`, `warn_on_write`        |
//!
//! The flags are set by the component hooks no matter which of the two
//! components is added first. [`PhysicsSystem`] warns once per entity when
//! game code writes a `warn_on_write` transform between steps, since that
//! write is lost.
//!
//! ## Resource
//!
//! The backend lives in the world as the [`Physics`] resource, so systems and
//! game code reach it the same way. [`PhysicsSystem`] uses the
//! extract/reinsert pattern to hold it and the world at the same time.

use std::collections::{HashMap, HashSet};

use crate::ecs::{Component, Entity, System, World};
use crate::error::{BackendError, ComponentError};
use crate::math::{Quat, Transform, Vec3};

// ── Backend interface ───────────────────────────────────────────────────

/// A body owned by a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    #[default]
    Dynamic,
    /// Moved by game code; pushes other bodies but is not pushed back.
    Kinematic,
    /// Never moves.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl BodyPose {
    pub fn of(transform: &Transform) -> Self {
        Self {
            position: transform.translation,
            rotation: transform.rotation,
        }
    }
}

/// A box-shaped body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub pose: BodyPose,
    pub half_extents: Vec3,
    pub mass: f32,
}

/// An upright capsule driven by a character controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerDesc {
    pub pose: BodyPose,
    pub radius: f32,
    /// Distance between the two hemisphere centers.
    pub height: f32,
}

/// Static triangle-mesh geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticMeshDesc {
    pub pose: BodyPose,
    pub vertices: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyHandle,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// A rigid-body simulation.
pub trait PhysicsWorld {
    /// Advance the simulation by `dt` seconds.
    fn update(&mut self, dt: f32);

    fn create_box_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, BackendError>;
    fn create_player(&mut self, desc: &PlayerDesc) -> Result<BodyHandle, BackendError>;
    fn create_static_mesh(&mut self, desc: &StaticMeshDesc) -> Result<BodyHandle, BackendError>;

    /// Unknown handles are ignored.
    fn destroy_body(&mut self, body: BodyHandle);

    fn body_pose(&self, body: BodyHandle) -> Option<BodyPose>;

    /// Teleport a body. Kinematic bodies interpolate toward it over the next step.
    fn set_body_pose(&mut self, body: BodyHandle, pose: BodyPose);

    /// First hit along `direction` (normalized) within `max_distance`.
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit>;
}

// ── Components ──────────────────────────────────────────────────────────

/// A box rigid body.
///
/// Attach alongside a [`Transform`]; the body is created on the next physics
/// step at the transform's pose.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub kind: BodyKind,
    pub half_extents: Vec3,
    pub mass: f32,
    pub(crate) handle: Option<BodyHandle>,
}

impl RigidBody {
    pub fn dynamic(half_extents: Vec3, mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            half_extents,
            mass,
            handle: None,
        }
    }

    pub fn kinematic(half_extents: Vec3) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            ..Self::dynamic(half_extents, 0.0)
        }
    }

    pub fn fixed(half_extents: Vec3) -> Self {
        Self {
            kind: BodyKind::Static,
            ..Self::dynamic(half_extents, 0.0)
        }
    }

    pub fn is_kinematic(&self) -> bool {
        self.kind == BodyKind::Kinematic
    }

    /// The backend body, once created.
    pub fn handle(&self) -> Option<BodyHandle> {
        self.handle
    }
}

impl Component for RigidBody {
    fn on_add(world: &mut World, entity: Entity) {
        link_transform(world, entity);
    }
}

/// Mark an entity's transform as physics-owned if it also has a body.
///
/// Called from the `on_add` hooks of both [`Transform`] and [`RigidBody`].
pub(crate) fn link_transform(world: &mut World, entity: Entity) {
    let Some(kinematic) = world.get::<RigidBody>(entity).map(RigidBody::is_kinematic) else {
        return;
    };
    if let Some(transform) = world.get_mut::<Transform>(entity) {
        transform.has_physics = true;
        transform.warn_on_write = !kinematic;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Upright capsule.
    Capsule { radius: f32, height: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
}

impl Collider {
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self {
            shape: ColliderShape::Capsule { radius, height },
        }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self {
            shape: ColliderShape::Box { half_extents },
        }
    }

    pub fn ball(radius: f32) -> Self {
        Self {
            shape: ColliderShape::Sphere { radius },
        }
    }

    /// Capsule dimensions that enclose this shape.
    fn capsule_dims(&self) -> (f32, f32) {
        match self.shape {
            ColliderShape::Capsule { radius, height } => (radius, height),
            ColliderShape::Sphere { radius } => (radius, 0.0),
            ColliderShape::Box { half_extents } => {
                let radius = half_extents.x.max(half_extents.z);
                (radius, (2.0 * (half_extents.y - radius)).max(0.0))
            }
        }
    }
}

impl Component for Collider {}

/// Kinematic player body. Requires a [`Collider`] on the same entity, which
/// gives the capsule's size.
///
/// Set `motion` during the frame; the physics system moves the transform by
/// it on the next step and clears it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharacterController {
    pub motion: Vec3,
    pub(crate) handle: Option<BodyHandle>,
}

impl CharacterController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Option<BodyHandle> {
        self.handle
    }
}

impl Component for CharacterController {
    fn validate(world: &World, entity: Entity) -> Result<(), ComponentError> {
        if world.has::<Collider>(entity) {
            Ok(())
        } else {
            Err(ComponentError::MissingRequired {
                component: "CharacterController",
                requires: "Collider",
                entity,
            })
        }
    }
}

/// Static level geometry. Created once at the entity's transform.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
    pub(crate) handle: Option<BodyHandle>,
}

impl StaticMesh {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            indices,
            handle: None,
        }
    }
}

impl Component for StaticMesh {}

// ── Resource ────────────────────────────────────────────────────────────

/// The physics backend plus the entity ↔ body mapping.
pub struct Physics {
    backend: Box<dyn PhysicsWorld>,
    bodies: HashMap<Entity, BodyHandle>,
    owners: HashMap<BodyHandle, Entity>,
    /// Pose each pulled transform was last written with.
    synced: HashMap<Entity, BodyPose>,
    /// Entities already warned about for writing a physics-owned transform.
    warned: HashSet<Entity>,
}

impl Physics {
    pub fn new(backend: Box<dyn PhysicsWorld>) -> Self {
        Self {
            backend,
            bodies: HashMap::new(),
            owners: HashMap::new(),
            synced: HashMap::new(),
            warned: HashSet::new(),
        }
    }

    pub fn backend(&self) -> &dyn PhysicsWorld {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn PhysicsWorld {
        self.backend.as_mut()
    }

    pub fn body_of(&self, entity: Entity) -> Option<BodyHandle> {
        self.bodies.get(&entity).copied()
    }

    pub fn entity_of(&self, body: BodyHandle) -> Option<Entity> {
        self.owners.get(&body).copied()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Cast a ray and report which entity it hit, if the body belongs to one.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<(Option<Entity>, RayHit)> {
        let hit = self
            .backend
            .raycast(origin, direction.normalize_or_zero(), max_distance)?;
        Some((self.entity_of(hit.body), hit))
    }

    fn register(&mut self, entity: Entity, body: BodyHandle) {
        self.bodies.insert(entity, body);
        self.owners.insert(body, entity);
    }

    fn unregister(&mut self, entity: Entity) {
        if let Some(body) = self.bodies.remove(&entity) {
            self.owners.remove(&body);
            self.backend.destroy_body(body);
        }
        self.synced.remove(&entity);
        self.warned.remove(&entity);
    }

    /// Destroy every body. Called by the engine at shutdown.
    pub fn clear(&mut self) {
        for (_, body) in self.bodies.drain() {
            self.backend.destroy_body(body);
        }
        self.owners.clear();
        self.synced.clear();
        self.warned.clear();
    }
}

// ── System ──────────────────────────────────────────────────────────────

/// Keeps backend bodies and ECS components in step, then advances the
/// simulation. Registered in the system graph by the engine, so it runs once
/// per fixed step with the fixed dt.
#[derive(Debug, Default)]
pub struct PhysicsSystem;

impl System for PhysicsSystem {
    fn update(&mut self, world: &mut World, dt: f32) {
        let Some(mut physics) = world.take_resource::<Physics>() else {
            return;
        };

        remove_stale_bodies(world, &mut physics);
        create_new_bodies(world, &mut physics);
        detect_lost_writes(world, &mut physics);
        push_kinematic(world, &mut physics);

        physics.backend.update(dt);

        pull_dynamic(world, &mut physics);
        world.insert_resource(physics);
    }

    fn name(&self) -> &str {
        "PhysicsSystem"
    }
}

/// 1. Drop bodies whose entity died or lost its physics component.
fn remove_stale_bodies(world: &mut World, physics: &mut Physics) {
    let stale: Vec<Entity> = physics
        .bodies
        .keys()
        .copied()
        .filter(|&e| {
            !world.is_alive(e)
                || !(world.has::<RigidBody>(e)
                    || world.has::<CharacterController>(e)
                    || world.has::<StaticMesh>(e))
        })
        .collect();
    for entity in stale {
        log::debug!("destroying physics body of {entity:?}");
        physics.unregister(entity);
        if world.has::<RigidBody>(entity) {
            continue;
        }
        if let Some(transform) = world.get_mut::<Transform>(entity) {
            transform.has_physics = false;
            transform.warn_on_write = false;
        }
    }
}

/// 2. Create bodies for components that don't have one yet.
fn create_new_bodies(world: &mut World, physics: &mut Physics) {
    for entity in world.view::<(RigidBody, Transform)>() {
        if physics.bodies.contains_key(&entity) {
            continue;
        }
        let body = world.component::<RigidBody>(entity);
        let desc = BodyDesc {
            kind: body.kind,
            pose: BodyPose::of(world.component::<Transform>(entity)),
            half_extents: body.half_extents,
            mass: body.mass,
        };
        match physics.backend.create_box_body(&desc) {
            Ok(handle) => {
                physics.register(entity, handle);
                if desc.kind == BodyKind::Static {
                    // Never pulled, so the creation pose is the one to watch.
                    physics.synced.insert(entity, desc.pose);
                }
                world.component_mut::<RigidBody>(entity).handle = Some(handle);
            }
            Err(err) => log::error!("failed to create body for {entity:?}: {err}"),
        }
    }

    for entity in world.view::<(CharacterController, Collider, Transform)>() {
        if physics.bodies.contains_key(&entity) {
            continue;
        }
        let (radius, height) = world.component::<Collider>(entity).capsule_dims();
        let desc = PlayerDesc {
            pose: BodyPose::of(world.component::<Transform>(entity)),
            radius,
            height,
        };
        match physics.backend.create_player(&desc) {
            Ok(handle) => {
                physics.register(entity, handle);
                world.component_mut::<CharacterController>(entity).handle = Some(handle);
            }
            Err(err) => log::error!("failed to create player for {entity:?}: {err}"),
        }
    }

    for entity in world.view::<(StaticMesh, Transform)>() {
        if physics.bodies.contains_key(&entity) {
            continue;
        }
        let mesh = world.component::<StaticMesh>(entity);
        let desc = StaticMeshDesc {
            pose: BodyPose::of(world.component::<Transform>(entity)),
            vertices: mesh.vertices.clone(),
            indices: mesh.indices.clone(),
        };
        match physics.backend.create_static_mesh(&desc) {
            Ok(handle) => {
                physics.register(entity, handle);
                world.component_mut::<StaticMesh>(entity).handle = Some(handle);
            }
            Err(err) => log::error!("failed to create static mesh for {entity:?}: {err}"),
        }
    }
}

/// 3. Warn once per entity when a physics-owned transform was written.
fn detect_lost_writes(world: &World, physics: &mut Physics) {
    let Physics { synced, warned, .. } = physics;
    for (&entity, pose) in synced.iter() {
        let Some(transform) = world.get::<Transform>(entity) else {
            continue;
        };
        if !transform.warn_on_write || warned.contains(&entity) {
            continue;
        }
        let expected = Transform {
            translation: pose.position,
            rotation: pose.rotation,
            ..*transform
        };
        if transform.pose_differs(&expected, 1e-5) {
            log::warn!(
                "{entity:?}: Transform written while owned by a non-kinematic rigid body; \
                 the body ignores the write"
            );
            warned.insert(entity);
        }
    }
}

/// 4. Push transforms of kinematic bodies and character controllers.
fn push_kinematic(world: &mut World, physics: &mut Physics) {
    for entity in world.view::<(RigidBody, Transform)>() {
        if !world.component::<RigidBody>(entity).is_kinematic() {
            continue;
        }
        if let Some(body) = physics.body_of(entity) {
            let pose = BodyPose::of(world.component::<Transform>(entity));
            physics.backend.set_body_pose(body, pose);
        }
    }

    for entity in world.view::<(CharacterController, Transform)>() {
        let Some(body) = physics.body_of(entity) else {
            continue;
        };
        let motion = std::mem::take(&mut world.component_mut::<CharacterController>(entity).motion);
        let transform = world.component_mut::<Transform>(entity);
        transform.translation += motion;
        let pose = BodyPose::of(transform);
        physics.backend.set_body_pose(body, pose);
    }
}

/// 5. Pull simulated poses into dynamic bodies' transforms.
fn pull_dynamic(world: &mut World, physics: &mut Physics) {
    for entity in world.view::<(RigidBody, Transform)>() {
        if world.component::<RigidBody>(entity).kind != BodyKind::Dynamic {
            continue;
        }
        let Some(pose) = physics.body_of(entity).and_then(|b| physics.backend.body_pose(b)) else {
            continue;
        };
        let transform = world.component_mut::<Transform>(entity);
        transform.translation = pose.position;
        transform.rotation = pose.rotation;
        physics.synced.insert(entity, pose);
    }
}
