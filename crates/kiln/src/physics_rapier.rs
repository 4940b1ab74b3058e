//! [`PhysicsWorld`] backed by rapier3d.

use std::collections::HashMap;

use rapier3d::prelude::*;

use crate::error::BackendError;
use crate::math::{Quat, Vec3};
use crate::physics::{
    BodyDesc, BodyHandle, BodyKind, BodyPose, PhysicsWorld, PlayerDesc, RayHit, StaticMeshDesc,
};

fn body_type(kind: BodyKind) -> RigidBodyType {
    match kind {
        BodyKind::Dynamic => RigidBodyType::Dynamic,
        BodyKind::Kinematic => RigidBodyType::KinematicPositionBased,
        BodyKind::Static => RigidBodyType::Fixed,
    }
}

/// Scaled-axis-angle form expected by `RigidBodyBuilder::rotation`.
fn quat_to_scaled_axis(q: Quat) -> Vec3 {
    let (axis, angle) = q.to_axis_angle();
    axis * angle
}

pub struct RapierPhysics {
    gravity: Vec3,
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    handles: HashMap<BodyHandle, RigidBodyHandle>,
    owners: HashMap<RigidBodyHandle, BodyHandle>,
    next_handle: u64,
}

impl std::fmt::Debug for RapierPhysics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierPhysics")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish()
    }
}

impl RapierPhysics {
    /// A world with gravity (0, -9.81, 0).
    pub fn new() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            pipeline: PhysicsPipeline::new(),
            params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            handles: HashMap::new(),
            owners: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    fn insert(&mut self, body: RigidBody, collider: Collider) -> BodyHandle {
        let rb = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, rb, &mut self.bodies);
        self.next_handle += 1;
        let handle = BodyHandle(self.next_handle);
        self.handles.insert(handle, rb);
        self.owners.insert(rb, handle);
        handle
    }

    fn builder(kind: BodyKind, pose: &BodyPose) -> RigidBodyBuilder {
        RigidBodyBuilder::new(body_type(kind))
            .translation(pose.position)
            .rotation(quat_to_scaled_axis(pose.rotation))
    }
}

impl Default for RapierPhysics {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld for RapierPhysics {
    fn update(&mut self, dt: f32) {
        self.params.dt = dt;
        self.pipeline.step(
            self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    fn create_box_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, BackendError> {
        let h = desc.half_extents;
        if h.min_element() <= 0.0 {
            return Err(BackendError::Init(format!("box half extents must be positive, got {h}")));
        }
        let mut collider = ColliderBuilder::cuboid(h.x, h.y, h.z);
        if desc.kind == BodyKind::Dynamic && desc.mass > 0.0 {
            collider = collider.mass(desc.mass);
        }
        let body = Self::builder(desc.kind, &desc.pose).build();
        Ok(self.insert(body, collider.build()))
    }

    fn create_player(&mut self, desc: &PlayerDesc) -> Result<BodyHandle, BackendError> {
        if desc.radius <= 0.0 {
            return Err(BackendError::Init("player radius must be positive".into()));
        }
        let body = Self::builder(BodyKind::Kinematic, &desc.pose).build();
        let collider = ColliderBuilder::capsule_y(desc.height * 0.5, desc.radius).build();
        Ok(self.insert(body, collider))
    }

    fn create_static_mesh(&mut self, desc: &StaticMeshDesc) -> Result<BodyHandle, BackendError> {
        let collider = ColliderBuilder::trimesh(desc.vertices.clone(), desc.indices.clone())
            .map_err(|err| BackendError::Load(format!("invalid static mesh: {err:?}")))?
            .build();
        let body = Self::builder(BodyKind::Static, &desc.pose).build();
        Ok(self.insert(body, collider))
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        let Some(rb) = self.handles.remove(&body) else {
            return;
        };
        self.owners.remove(&rb);
        self.bodies.remove(
            rb,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn body_pose(&self, body: BodyHandle) -> Option<BodyPose> {
        let rb = self.bodies.get(*self.handles.get(&body)?)?;
        Some(BodyPose {
            position: rb.translation(),
            rotation: *rb.rotation(),
        })
    }

    fn set_body_pose(&mut self, body: BodyHandle, pose: BodyPose) {
        let Some(rb) = self.handles.get(&body).and_then(|h| self.bodies.get_mut(*h)) else {
            return;
        };
        let target = Pose::from_parts(pose.position, pose.rotation);
        if rb.is_kinematic() {
            rb.set_next_kinematic_position(target);
        } else {
            rb.set_position(target, true);
        }
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            QueryFilter::default(),
        );
        let ray = Ray::new(origin, direction);
        let (collider, hit) = query.cast_ray_and_get_normal(&ray, max_distance, true)?;
        let body = self
            .colliders
            .get(collider)
            .and_then(|c| c.parent())
            .and_then(|rb| self.owners.get(&rb).copied())?;
        Some(RayHit {
            body,
            point: origin + direction * hit.time_of_impact,
            normal: hit.normal,
            distance: hit.time_of_impact,
        })
    }
}
