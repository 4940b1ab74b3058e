//! Context: what game callbacks get to touch.
//!
//! The engine builds a [`Context`] for every [`Game`](crate::engine::Game)
//! callback, borrowing its world, scene, input and backends for the duration
//! of the call.

use crate::audio::AudioBackend;
use crate::ecs::{Entity, World};
use crate::graphics::GraphicsDevice;
use crate::input::InputSystem;
use crate::physics::Physics;
use crate::scene::{NodeId, SceneGraph};
use crate::time::Time;

/// Borrowed engine state for one game callback.
///
/// # Example
///
/// ```ignore
/// fn on_update(&mut self, ctx: &mut Context, dt: f32) {
///     if ctx.input.action_pressed("quit") {
///         ctx.request_stop();
///     }
/// }
/// ```
pub struct Context<'a> {
    pub world: &'a mut World,
    pub scene: &'a mut SceneGraph,
    pub input: &'a mut InputSystem,
    /// `None` when running headless.
    pub graphics: Option<&'a mut dyn GraphicsDevice>,
    pub audio: Option<&'a mut dyn AudioBackend>,
    /// Snapshot taken when the callback started.
    pub time: Time,
    stop_requested: &'a mut bool,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        world: &'a mut World,
        scene: &'a mut SceneGraph,
        input: &'a mut InputSystem,
        graphics: Option<&'a mut dyn GraphicsDevice>,
        audio: Option<&'a mut dyn AudioBackend>,
        time: Time,
        stop_requested: &'a mut bool,
    ) -> Self {
        Self {
            world,
            scene,
            input,
            graphics,
            audio,
            time,
            stop_requested,
        }
    }

    /// Ask the engine to shut down at the top of the next tick.
    pub fn request_stop(&mut self) {
        *self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        *self.stop_requested
    }

    /// The physics resource, if a physics backend was supplied.
    pub fn physics(&mut self) -> Option<&mut Physics> {
        self.world.get_resource_mut::<Physics>()
    }

    /// Create an entity and a root scene node for it.
    pub fn spawn_node(&mut self) -> (Entity, NodeId) {
        let entity = self.world.create_entity();
        let node = self.scene.create_node(entity);
        (entity, node)
    }

    /// Destroy a node, its descendants, and their entities.
    pub fn despawn_recursive(&mut self, node: NodeId) {
        for entity in self.scene.destroy_recursive(node) {
            self.world.destroy_entity(entity);
        }
    }
}
