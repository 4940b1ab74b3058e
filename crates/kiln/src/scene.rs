//! # Scene Graph: Parent/Child Relationships
//!
//! The [`SceneGraph`] is a forest of nodes kept beside the [`World`]. Each
//! node references one entity and knows its parent and ordered children.
//! Entities themselves carry no hierarchy components, so the same entity
//! data works with or without a scene.
//!
//! ```text
//! nodes:     [ n0 root ]──┬──[ n1 ]──[ n3 ]
//!                         └──[ n2 ]
//! free_list: [ 4 ]          recycled ids, reused by create_node
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let car = scene.create_node(car_entity);
//! let wheel = scene.create_node(wheel_entity);
//! scene.reparent(wheel, car)?;
//!
//! // After propagate_transforms, the wheel's GlobalTransform reflects
//! // the combined car + wheel transform.
//! propagate_transforms(&scene, &mut world);
//! ```

use std::collections::{HashSet, VecDeque};

use crate::ecs::{Entity, World};
use crate::error::SceneError;
use crate::math::{GlobalTransform, Mat4, Transform};

/// Index of a node in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// "No node": the parent of every root.
    pub const INVALID: NodeId = NodeId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

#[derive(Debug, Clone)]
struct SceneNode {
    parent: NodeId,
    children: Vec<NodeId>,
    entity: Entity,
    alive: bool,
}

/// A forest of entity-referencing nodes.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    free_list: Vec<u32>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0 as usize).filter(|n| n.alive)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0 as usize).filter(|n| n.alive)
    }

    /// Create a parentless node for `entity`.
    pub fn create_node(&mut self, entity: Entity) -> NodeId {
        let node = SceneNode {
            parent: NodeId::INVALID,
            children: Vec::new(),
            entity,
            alive: true,
        };
        if let Some(index) = self.free_list.pop() {
            self.nodes[index as usize] = node;
            NodeId(index)
        } else {
            self.nodes.push(node);
            NodeId(self.nodes.len() as u32 - 1)
        }
    }

    /// Destroy a node. Its children become roots; they are not destroyed.
    /// Dead ids are ignored.
    pub fn destroy_node(&mut self, id: NodeId) {
        if self.node(id).is_none() {
            return;
        }
        self.detach(id);
        let children = std::mem::take(&mut self.nodes[id.0 as usize].children);
        for child in children {
            if let Some(node) = self.node_mut(child) {
                node.parent = NodeId::INVALID;
            }
        }
        let node = &mut self.nodes[id.0 as usize];
        node.alive = false;
        node.entity = Entity::DANGLING;
        self.free_list.push(id.0);
    }

    /// Destroy a node and its whole subtree. Returns the entities the
    /// destroyed nodes referenced, parents before children, so the caller
    /// can destroy them too.
    pub fn destroy_recursive(&mut self, id: NodeId) -> Vec<Entity> {
        let Some(root) = self.node(id) else {
            return Vec::new();
        };
        let mut entities = vec![root.entity];
        let subtree = self.descendants(id);
        entities.extend(subtree.iter().filter_map(|&n| self.entity(n)));

        self.detach(id);
        for node_id in std::iter::once(id).chain(subtree) {
            let node = &mut self.nodes[node_id.0 as usize];
            node.alive = false;
            node.parent = NodeId::INVALID;
            node.children.clear();
            node.entity = Entity::DANGLING;
            self.free_list.push(node_id.0);
        }
        entities
    }

    /// Remove `id` from its parent's child list and make it a root.
    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes[id.0 as usize].parent;
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != id);
        }
        self.nodes[id.0 as usize].parent = NodeId::INVALID;
    }

    /// Move `child` under `new_parent`, or make it a root when `new_parent`
    /// is [`NodeId::INVALID`] or dead.
    ///
    /// Reparenting under the current parent moves the child to the end of
    /// the child list without duplicating it. Parenting a node under itself
    /// or one of its descendants is rejected and changes nothing.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        if self.node(child).is_none() {
            return Err(SceneError::DeadNode(child));
        }
        if self.node(new_parent).is_some() && self.is_ancestor_or_self(child, new_parent) {
            return Err(SceneError::WouldCycle {
                child,
                parent: new_parent,
            });
        }
        self.detach(child);
        if let Some(parent) = self.node_mut(new_parent) {
            parent.children.push(child);
            self.nodes[child.0 as usize].parent = new_parent;
        }
        Ok(())
    }

    /// True if `ancestor` is `node` or lies on the path from `node` to its root.
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while let Some(n) = self.node(current) {
            if current == ancestor {
                return true;
            }
            current = n.parent;
        }
        false
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Parent of `id`, or `None` for roots and dead nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Children of `id` in insertion order. Empty for dead nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn entity(&self, id: NodeId) -> Option<Entity> {
        self.node(id).map(|n| n.entity)
    }

    /// Live parentless nodes, in id order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive && !n.parent.is_valid())
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    /// Every node below `id`, breadth-first. Does not include `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue: VecDeque<NodeId> = self.children(id).iter().copied().collect();
        while let Some(n) = queue.pop_front() {
            out.push(n);
            queue.extend(self.children(n).iter().copied());
        }
        out
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// First live node referencing `entity`.
    pub fn find_by_entity(&self, entity: Entity) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.alive && n.entity == entity)
            .map(|i| NodeId(i as u32))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
    }
}

/// Propagate local transforms down the scene graph.
///
/// - Roots get `GlobalTransform = Transform.matrix()`.
/// - Children get `GlobalTransform = parent_global * child_local.matrix()`.
/// - Nodes whose entity lacks a `Transform` pass the parent matrix through.
/// - Traversal is BFS to ensure parents are computed before children.
/// - Entities that were not reached this pass lose their `GlobalTransform`,
///   so they fall back to their local `Transform`.
pub fn propagate_transforms(scene: &SceneGraph, world: &mut World) {
    let mut reached = HashSet::new();
    let mut queue: VecDeque<(NodeId, Mat4)> = scene
        .roots()
        .into_iter()
        .map(|root| (root, Mat4::IDENTITY))
        .collect();

    while let Some((id, parent_matrix)) = queue.pop_front() {
        let mut matrix = parent_matrix;
        if let Some(entity) = scene.entity(id).filter(|&e| world.is_alive(e)) {
            if let Some(local) = world.get::<Transform>(entity).map(Transform::matrix) {
                matrix = parent_matrix * local;
                match world.get_mut::<GlobalTransform>(entity) {
                    Some(global) => global.matrix = matrix,
                    None => world.add(entity, GlobalTransform { matrix }),
                }
                reached.insert(entity);
            }
        }
        for &child in scene.children(id) {
            queue.push_back((child, matrix));
        }
    }

    for entity in world.view::<(GlobalTransform,)>() {
        if !reached.contains(&entity) {
            world.remove::<GlobalTransform>(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn graph_with(n: usize) -> (SceneGraph, Vec<NodeId>) {
        let mut scene = SceneGraph::new();
        let ids = (0..n)
            .map(|i| scene.create_node(Entity::from_raw(i as u32, 0)))
            .collect();
        (scene, ids)
    }

    #[test]
    fn new_nodes_are_roots() {
        let (scene, ids) = graph_with(2);
        assert_eq!(scene.roots(), ids);
        assert_eq!(scene.parent(ids[0]), None);
        assert_eq!(scene.node_count(), 2);
    }

    #[test]
    fn reparent_links_both_sides() {
        let (mut scene, ids) = graph_with(3);
        scene.reparent(ids[1], ids[0]).unwrap();
        scene.reparent(ids[2], ids[0]).unwrap();
        assert_eq!(scene.parent(ids[1]), Some(ids[0]));
        assert_eq!(scene.children(ids[0]), &[ids[1], ids[2]]);
        assert_eq!(scene.roots(), vec![ids[0]]);
    }

    #[test]
    fn reparent_to_same_parent_is_idempotent() {
        let (mut scene, ids) = graph_with(2);
        scene.reparent(ids[1], ids[0]).unwrap();
        scene.reparent(ids[1], ids[0]).unwrap();
        assert_eq!(scene.children(ids[0]), &[ids[1]]);
        assert_eq!(scene.parent(ids[1]), Some(ids[0]));
    }

    #[test]
    fn reparent_moves_between_parents() {
        let (mut scene, ids) = graph_with(3);
        scene.reparent(ids[2], ids[0]).unwrap();
        scene.reparent(ids[2], ids[1]).unwrap();
        assert!(scene.children(ids[0]).is_empty());
        assert_eq!(scene.children(ids[1]), &[ids[2]]);
    }

    #[test]
    fn reparent_to_invalid_makes_root() {
        let (mut scene, ids) = graph_with(2);
        scene.reparent(ids[1], ids[0]).unwrap();
        scene.reparent(ids[1], NodeId::INVALID).unwrap();
        assert_eq!(scene.parent(ids[1]), None);
        assert!(scene.children(ids[0]).is_empty());
    }

    #[test]
    fn reparent_under_descendant_is_rejected() {
        let (mut scene, ids) = graph_with(3);
        scene.reparent(ids[1], ids[0]).unwrap();
        scene.reparent(ids[2], ids[1]).unwrap();

        assert_eq!(
            scene.reparent(ids[0], ids[2]),
            Err(SceneError::WouldCycle {
                child: ids[0],
                parent: ids[2]
            })
        );
        assert!(scene.reparent(ids[0], ids[0]).is_err());
        // Unchanged.
        assert_eq!(scene.parent(ids[0]), None);
        assert_eq!(scene.children(ids[1]), &[ids[2]]);
    }

    #[test]
    fn reparent_dead_child_fails() {
        let (mut scene, ids) = graph_with(2);
        scene.destroy_node(ids[1]);
        assert_eq!(scene.reparent(ids[1], ids[0]), Err(SceneError::DeadNode(ids[1])));
    }

    #[test]
    fn destroy_orphans_children() {
        let (mut scene, ids) = graph_with(4);
        scene.reparent(ids[1], ids[0]).unwrap();
        scene.reparent(ids[2], ids[1]).unwrap();
        scene.reparent(ids[3], ids[1]).unwrap();

        scene.destroy_node(ids[1]);
        assert!(!scene.is_alive(ids[1]));
        assert!(scene.children(ids[0]).is_empty());
        assert_eq!(scene.parent(ids[2]), None);
        assert_eq!(scene.parent(ids[3]), None);
        assert!(scene.is_alive(ids[2]));
        assert_eq!(scene.roots(), vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn destroyed_ids_are_recycled() {
        let (mut scene, ids) = graph_with(2);
        scene.destroy_node(ids[0]);
        scene.destroy_node(ids[0]);
        assert_eq!(scene.node_count(), 1);

        let e = Entity::from_raw(9, 0);
        let reused = scene.create_node(e);
        assert_eq!(reused, ids[0]);
        assert_eq!(scene.entity(reused), Some(e));
        assert_eq!(scene.parent(reused), None);
    }

    #[test]
    fn destroy_recursive_tears_down_subtree() {
        let (mut scene, ids) = graph_with(5);
        scene.reparent(ids[1], ids[0]).unwrap();
        scene.reparent(ids[2], ids[1]).unwrap();
        scene.reparent(ids[3], ids[0]).unwrap();

        let entities = scene.destroy_recursive(ids[1]);
        assert_eq!(entities, vec![Entity::from_raw(1, 0), Entity::from_raw(2, 0)]);
        assert!(!scene.is_alive(ids[1]));
        assert!(!scene.is_alive(ids[2]));
        assert_eq!(scene.children(ids[0]), &[ids[3]]);
        assert_eq!(scene.node_count(), 3);
    }

    #[test]
    fn descendants_are_breadth_first() {
        let (mut scene, ids) = graph_with(4);
        scene.reparent(ids[1], ids[0]).unwrap();
        scene.reparent(ids[3], ids[1]).unwrap();
        scene.reparent(ids[2], ids[0]).unwrap();
        assert_eq!(scene.descendants(ids[0]), vec![ids[1], ids[2], ids[3]]);
    }

    #[test]
    fn find_by_entity() {
        let (mut scene, ids) = graph_with(3);
        assert_eq!(scene.find_by_entity(Entity::from_raw(2, 0)), Some(ids[2]));
        scene.destroy_node(ids[2]);
        assert_eq!(scene.find_by_entity(Entity::from_raw(2, 0)), None);
    }

    #[test]
    fn root_gets_global_transform() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let root = world.create_entity();
        world.add(root, Transform::from_xyz(10.0, 20.0, 0.0));
        scene.create_node(root);

        propagate_transforms(&scene, &mut world);

        let gt = world.get::<GlobalTransform>(root).unwrap();
        assert_eq!(gt.matrix, Transform::from_xyz(10.0, 20.0, 0.0).matrix());
    }

    #[test]
    fn deep_hierarchy_propagation() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let mut parent = NodeId::INVALID;
        let mut last = Entity::DANGLING;
        for x in [1.0, 2.0, 3.0] {
            let e = world.create_entity();
            world.add(e, Transform::from_xyz(x, 0.0, 0.0));
            let node = scene.create_node(e);
            scene.reparent(node, parent).unwrap();
            parent = node;
            last = e;
        }

        propagate_transforms(&scene, &mut world);

        let col3 = world.component::<GlobalTransform>(last).matrix.col(3);
        assert!((col3.x - 6.0).abs() < 0.001); // 1 + 2 + 3
    }

    #[test]
    fn parent_moves_child_follows() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let parent = world.create_entity();
        let child = world.create_entity();
        world.add(parent, Transform::default());
        world.add(child, Transform::from_xyz(5.0, 0.0, 0.0));
        let p = scene.create_node(parent);
        let c = scene.create_node(child);
        scene.reparent(c, p).unwrap();
        propagate_transforms(&scene, &mut world);

        world.component_mut::<Transform>(parent).translation = Vec3::new(50.0, 0.0, 0.0);
        propagate_transforms(&scene, &mut world);

        let col3 = world.component::<GlobalTransform>(child).matrix.col(3);
        assert!((col3.x - 55.0).abs() < 0.001);
    }

    #[test]
    fn nodes_without_transform_pass_parent_through() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let root = world.create_entity();
        let group = world.create_entity();
        let leaf = world.create_entity();
        world.add(root, Transform::from_xyz(1.0, 0.0, 0.0));
        world.add(leaf, Transform::from_xyz(0.0, 2.0, 0.0));
        let r = scene.create_node(root);
        let g = scene.create_node(group);
        let l = scene.create_node(leaf);
        scene.reparent(g, r).unwrap();
        scene.reparent(l, g).unwrap();

        propagate_transforms(&scene, &mut world);

        assert!(!world.has::<GlobalTransform>(group));
        let pos = world.component::<GlobalTransform>(leaf).translation();
        assert!(pos.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn entities_leaving_the_scene_drop_their_global() {
        let mut world = World::new();
        let mut scene = SceneGraph::new();
        let parent = world.create_entity();
        let child = world.create_entity();
        world.add(parent, Transform::from_xyz(1.0, 0.0, 0.0));
        world.add(child, Transform::from_xyz(0.0, 2.0, 0.0));
        let p = scene.create_node(parent);
        let c = scene.create_node(child);
        scene.reparent(c, p).unwrap();
        propagate_transforms(&scene, &mut world);
        assert!(world.has::<GlobalTransform>(parent));

        scene.destroy_node(p);
        propagate_transforms(&scene, &mut world);
        assert!(!world.has::<GlobalTransform>(parent));
        // The orphaned child is now a root.
        let pos = world.component::<GlobalTransform>(child).translation();
        assert!(pos.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-6));
    }
}
