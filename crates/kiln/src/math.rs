//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. The [`Transform`] type provides position, rotation,
//! and scale for 3D entities; [`GlobalTransform`] is its world-space result
//! after scene propagation.

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

use crate::ecs::{Component, Entity, World};

/// A 3D transform: position, rotation, and scale.
///
/// The two flags are maintained by the engine. When an entity has both a
/// `Transform` and a [`RigidBody`](crate::physics::RigidBody), physics owns
/// the pose: `has_physics` is set, and `warn_on_write` is set for
/// non-kinematic bodies, whose pose is overwritten every step. Writes to such
/// a transform are reported once by the physics system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub has_physics: bool,
    pub warn_on_write: bool,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
        has_physics: false,
        warn_on_write: false,
    };

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self::from_translation(Vec3::new(x, y, z))
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Create a transform that looks at a target point from the current position.
    ///
    /// Useful for camera placement: `Transform::from_xyz(0, 5, 10).looking_at(Vec3::ZERO, Vec3::Y)`
    /// creates a camera at (0,5,10) looking toward the origin.
    pub fn looking_at(mut self, target: Vec3, up: Vec3) -> Self {
        let look = Mat4::look_at_rh(self.translation, target, up);
        let (_, rotation, _) = look.inverse().to_scale_rotation_translation();
        self.rotation = rotation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Compute the 4x4 model matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Local -Z axis, the direction cameras and lights face.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// True if position or rotation differ from `other` beyond `epsilon`.
    pub fn pose_differs(&self, other: &Transform, epsilon: f32) -> bool {
        !self.translation.abs_diff_eq(other.translation, epsilon)
            || !self.rotation.abs_diff_eq(other.rotation, epsilon)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform {
    fn on_add(world: &mut World, entity: Entity) {
        crate::physics::link_transform(world, entity);
    }
}

/// The world-space transform computed by
/// [`propagate_transforms`](crate::scene::propagate_transforms).
///
/// For scene roots this equals the local [`Transform`]. For children it is
/// `parent_global * child_local`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform {
    pub matrix: Mat4,
}

impl GlobalTransform {
    pub const IDENTITY: Self = Self {
        matrix: Mat4::IDENTITY,
    };

    pub fn translation(&self) -> Vec3 {
        self.matrix.w_axis.truncate()
    }

    pub fn forward(&self) -> Vec3 {
        self.matrix.transform_vector3(Vec3::NEG_Z).normalize_or_zero()
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for GlobalTransform {}
