//! # System: Functions That Operate on the World
//!
//! A system takes `&mut World` and a timestep and does something with it:
//! walk a view, modify components, read resources. Any
//! `FnMut(&mut World, f32)` is a system, and structs can implement
//! [`System`] when they need state.
//!
//! ## SystemGraph
//!
//! Systems are registered into a [`SystemGraph`] and may declare that they
//! must run after other systems. Each update runs every system exactly once,
//! in an order that honors those edges:
//!
//! ```text
//! add_system(input)        -> 0
//! add_system(physics)      -> 1
//! add_system(animation)    -> 2
//! add_dependency(2, 1)        animation runs after physics
//!
//! order: input, physics, animation
//! ```
//!
//! The order comes from Kahn's algorithm, seeded in insertion order, so
//! systems without edges keep the order they were added in. The result is
//! cached and only recomputed after the graph changes.
//!
//! If the edges form a cycle the graph does not refuse to run: it logs a
//! warning and falls back to plain insertion order.
//! [`SystemGraph::try_execution_order`] reports the cycle instead.

use std::collections::VecDeque;

use super::world::World;
use crate::error::SystemGraphError;

/// A unit of per-tick logic executed on a [`World`].
pub trait System {
    fn update(&mut self, world: &mut World, dt: f32);

    /// Name shown in logs and timings. Defaults to the short type name.
    fn name(&self) -> &str {
        short_system_name(std::any::type_name::<Self>())
    }
}

/// Any `FnMut(&mut World, f32)` is a `System`.
impl<F: FnMut(&mut World, f32)> System for F {
    fn update(&mut self, world: &mut World, dt: f32) {
        (self)(world, dt);
    }
}

/// Identifier returned by [`SystemGraph::add_system`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub u32);

struct Node {
    name: String,
    system: Box<dyn System>,
    /// Systems that must run before this one.
    after: Vec<SystemId>,
}

/// Per-system timing recorded during a single update.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub name: String,
    pub duration_us: f64,
}

/// Systems plus the "runs after" edges between them.
pub struct SystemGraph {
    nodes: Vec<Node>,
    /// Cached execution order as node indices. `None` after any change.
    order: Option<Vec<usize>>,
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl SystemGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            order: None,
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    /// Register a system. Ids increase in insertion order.
    pub fn add_system<S: System + 'static>(&mut self, system: S) -> SystemId {
        self.add_boxed(Box::new(system))
    }

    pub fn add_boxed(&mut self, system: Box<dyn System>) -> SystemId {
        let id = SystemId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: system.name().to_string(),
            system,
            after: Vec::new(),
        });
        self.order = None;
        id
    }

    /// Declare that `system` must run after `depends_on`.
    ///
    /// Adding the same edge twice has no effect.
    pub fn add_dependency(
        &mut self,
        system: SystemId,
        depends_on: SystemId,
    ) -> Result<(), SystemGraphError> {
        self.check(depends_on)?;
        let node = self
            .nodes
            .get_mut(system.0 as usize)
            .ok_or(SystemGraphError::UnknownSystem(system))?;
        if !node.after.contains(&depends_on) {
            node.after.push(depends_on);
            self.order = None;
        }
        Ok(())
    }

    fn check(&self, id: SystemId) -> Result<(), SystemGraphError> {
        if (id.0 as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(SystemGraphError::UnknownSystem(id))
        }
    }

    /// Topological order of every system. Falls back to insertion order if
    /// the dependencies contain a cycle.
    pub fn execution_order(&self) -> Vec<SystemId> {
        self.try_execution_order()
            .unwrap_or_else(|_| (0..self.nodes.len() as u32).map(SystemId).collect())
    }

    /// Topological order of every system, or the set of systems caught in a
    /// dependency cycle.
    pub fn try_execution_order(&self) -> Result<Vec<SystemId>, SystemGraphError> {
        self.topological_sort()
            .map(|order| order.into_iter().map(|i| SystemId(i as u32)).collect())
    }

    /// Kahn's algorithm. Ready nodes are processed first-in first-out, so
    /// unconstrained systems keep their insertion order.
    fn topological_sort(&self) -> Result<Vec<usize>, SystemGraphError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.after {
                in_degree[i] += 1;
                dependents[dep.0 as usize].push(i);
            }
        }

        let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_front() {
            order.push(i);
            for &d in &dependents[i] {
                in_degree[d] -= 1;
                if in_degree[d] == 0 {
                    ready.push_back(d);
                }
            }
        }

        if order.len() == n {
            Ok(order)
        } else {
            let involved = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| SystemId(i as u32))
                .collect();
            Err(SystemGraphError::Cycle { involved })
        }
    }

    fn resolve_order(&mut self) {
        if self.order.is_some() {
            return;
        }
        let order = match self.topological_sort() {
            Ok(order) => order,
            Err(err) => {
                log::warn!("{err}; running systems in insertion order");
                (0..self.nodes.len()).collect()
            }
        };
        self.order = Some(order);
    }

    /// Run every system once, in execution order.
    pub fn update(&mut self, world: &mut World, dt: f32) {
        self.resolve_order();
        let nodes = &mut self.nodes;
        let order = self.order.as_deref().unwrap_or_default();

        #[cfg(feature = "diagnostics")]
        {
            self.timings.clear();
            for &i in order {
                let node = &mut nodes[i];
                let start = std::time::Instant::now();
                node.system.update(world, dt);
                let duration_us = start.elapsed().as_secs_f64() * 1_000_000.0;
                log::trace!("system `{}` took {duration_us:.1}us", node.name);
                self.timings.push(SystemTiming {
                    name: node.name.clone(),
                    duration_us,
                });
            }
        }
        #[cfg(not(feature = "diagnostics"))]
        {
            for &i in order {
                nodes[i].system.update(world, dt);
            }
        }
    }

    pub fn system_name(&self, id: SystemId) -> Option<&str> {
        self.nodes.get(id.0 as usize).map(|n| n.name.as_str())
    }

    /// Timings from the most recent [`update`](Self::update), in execution order.
    #[cfg(feature = "diagnostics")]
    pub fn timings(&self) -> &[SystemTiming] {
        &self.timings
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for SystemGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// last meaningful segment (e.g. `my_game::movement_system` → `movement_system`,
/// `{{closure}}` → `<closure>`).
fn short_system_name(full: &str) -> &str {
    let name = full.rsplit("::").next().unwrap_or(full);
    if name.contains("closure") {
        "<closure>"
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Appends its label to a shared `Vec<&str>` resource when run.
    fn recorder(label: &'static str) -> impl FnMut(&mut World, f32) {
        move |world: &mut World, _dt: f32| world.resource_mut::<Vec<&'static str>>().push(label)
    }

    fn run_log(world: &World) -> Vec<&'static str> {
        world.resource::<Vec<&'static str>>().clone()
    }

    fn dummy_system(_world: &mut World, _dt: f32) {}

    struct Gravity;
    impl System for Gravity {
        fn update(&mut self, _world: &mut World, _dt: f32) {}
    }

    #[test]
    fn unconstrained_systems_keep_insertion_order() {
        let mut graph = SystemGraph::new();
        let a = graph.add_system(dummy_system);
        let b = graph.add_system(dummy_system);
        let c = graph.add_system(dummy_system);
        assert_eq!(graph.execution_order(), vec![a, b, c]);
    }

    #[test]
    fn dependency_reorders() {
        let mut graph = SystemGraph::new();
        let a = graph.add_system(dummy_system);
        let b = graph.add_system(dummy_system);
        let c = graph.add_system(dummy_system);
        graph.add_dependency(b, c).unwrap();
        assert_eq!(graph.execution_order(), vec![a, c, b]);
    }

    #[test]
    fn every_edge_is_honored() {
        let mut graph = SystemGraph::new();
        let ids: Vec<_> = (0..6).map(|_| graph.add_system(dummy_system)).collect();
        let edges = [(0, 5), (1, 0), (2, 1), (2, 4), (3, 2)];
        for (s, d) in edges {
            graph.add_dependency(ids[s], ids[d]).unwrap();
        }
        let order = graph.execution_order();
        assert_eq!(order.len(), 6);
        let pos = |id: SystemId| order.iter().position(|&o| o == id).unwrap();
        for (s, d) in edges {
            assert!(pos(ids[d]) < pos(ids[s]), "{s} must run after {d}");
        }
    }

    #[test]
    fn cycle_falls_back_to_insertion_order() {
        let mut graph = SystemGraph::new();
        let a = graph.add_system(dummy_system);
        let b = graph.add_system(dummy_system);
        let c = graph.add_system(dummy_system);
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, a).unwrap();
        assert_eq!(graph.execution_order(), vec![a, b, c]);
        assert_eq!(
            graph.try_execution_order(),
            Err(SystemGraphError::Cycle { involved: vec![a, b] })
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut graph = SystemGraph::new();
        let a = graph.add_system(dummy_system);
        graph.add_dependency(a, a).unwrap();
        assert!(graph.try_execution_order().is_err());
        assert_eq!(graph.execution_order(), vec![a]);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut graph = SystemGraph::new();
        let a = graph.add_system(dummy_system);
        assert_eq!(
            graph.add_dependency(a, SystemId(7)),
            Err(SystemGraphError::UnknownSystem(SystemId(7)))
        );
        assert_eq!(
            graph.add_dependency(SystemId(9), a),
            Err(SystemGraphError::UnknownSystem(SystemId(9)))
        );
    }

    #[test]
    fn update_runs_each_system_once_in_order() {
        let mut world = World::new();
        world.insert_resource(Vec::<&'static str>::new());

        let mut graph = SystemGraph::new();
        let render = graph.add_system(recorder("render"));
        let physics = graph.add_system(recorder("physics"));
        let input = graph.add_system(recorder("input"));
        graph.add_dependency(physics, input).unwrap();
        graph.add_dependency(render, physics).unwrap();

        graph.update(&mut world, 1.0 / 60.0);
        assert_eq!(run_log(&world), vec!["input", "physics", "render"]);

        graph.update(&mut world, 1.0 / 60.0);
        assert_eq!(run_log(&world).len(), 6);
    }

    #[test]
    fn update_with_cycle_still_runs_everything() {
        let mut world = World::new();
        world.insert_resource(Vec::<&'static str>::new());

        let mut graph = SystemGraph::new();
        let a = graph.add_system(recorder("a"));
        let b = graph.add_system(recorder("b"));
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, a).unwrap();

        graph.update(&mut world, 0.0);
        assert_eq!(run_log(&world), vec!["a", "b"]);
    }

    #[test]
    fn cached_order_refreshes_after_change() {
        let mut world = World::new();
        world.insert_resource(Vec::<&'static str>::new());

        let mut graph = SystemGraph::new();
        let a = graph.add_system(recorder("a"));
        let b = graph.add_system(recorder("b"));
        graph.update(&mut world, 0.0);

        graph.add_dependency(a, b).unwrap();
        graph.update(&mut world, 0.0);
        assert_eq!(run_log(&world), vec!["a", "b", "b", "a"]);
    }

    #[test]
    fn dt_reaches_systems() {
        let mut world = World::new();
        world.insert_resource(0.0f32);
        let mut graph = SystemGraph::new();
        graph.add_system(|world: &mut World, dt: f32| *world.resource_mut::<f32>() += dt);
        graph.update(&mut world, 0.25);
        graph.update(&mut world, 0.25);
        assert_eq!(*world.resource::<f32>(), 0.5);
    }

    #[test]
    fn system_names() {
        let mut graph = SystemGraph::new();
        let f = graph.add_system(dummy_system);
        let c = graph.add_system(|_world: &mut World, _dt: f32| {});
        let s = graph.add_system(Gravity);
        assert_eq!(graph.system_name(f), Some("dummy_system"));
        assert_eq!(graph.system_name(c), Some("<closure>"));
        assert_eq!(graph.system_name(s), Some("Gravity"));
        assert_eq!(graph.system_name(SystemId(42)), None);
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn timings_follow_execution_order() {
        let mut world = World::new();
        let mut graph = SystemGraph::new();
        let first = graph.add_system(Gravity);
        let second = graph.add_system(dummy_system);
        graph.add_dependency(first, second).unwrap();
        graph.update(&mut world, 0.0);
        let names: Vec<_> = graph.timings().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["dummy_system", "Gravity"]);
    }
}
