//! # World: The Central Container
//!
//! The [`World`] owns the [`EntityRegistry`] (the authority on liveness), one
//! [`SparseSet`] per component type, and a small map of resources.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ World                                                    │
//! │                                                          │
//! │  registry:  EntityRegistry       generations + free list │
//! │  storages:  HashMap<ComponentId, Box<dyn ErasedStorage>> │
//! │               created lazily on first write              │
//! │  resources: HashMap<TypeId, Box<dyn Any>>                │
//! │               singletons not tied to an entity           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Entities are keys shared across storages; no storage owns them. Destroying
//! an entity strips it from every storage so recycled indices start clean.
//!
//! ## Views
//!
//! [`World::view`] walks the packed entities of the *first* listed type and
//! keeps the ones that are alive and carry every other listed type. Put the
//! rarest component first. The result is collected, so the world can be
//! mutated freely while looping over it.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::component::{Component, ComponentId, component_id, short_type_name};
use super::entity::{Entity, EntityRegistry};
use super::storage::{ErasedStorage, SparseSet};
use crate::error::ComponentError;

/// The central container for all game state.
pub struct World {
    registry: EntityRegistry,
    storages: HashMap<ComponentId, Box<dyn ErasedStorage>>,
    resources: HashMap<TypeId, Box<dyn Any>>,
}

impl World {
    pub fn new() -> Self {
        Self {
            registry: EntityRegistry::new(),
            storages: HashMap::new(),
            resources: HashMap::new(),
        }
    }

    // ── Entities ─────────────────────────────────────────────────────

    pub fn create_entity(&mut self) -> Entity {
        self.registry.create()
    }

    /// Destroy an entity and drop all of its components.
    ///
    /// Returns `false` if the handle was already dead.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.registry.destroy(entity) {
            return false;
        }
        for storage in self.storages.values_mut() {
            storage.remove_entity(entity);
        }
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.registry.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.registry.alive_count()
    }

    /// Every live entity, in index order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.registry.iter_alive()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Destroy every entity. Storages and resources stay allocated.
    pub fn clear(&mut self) {
        let alive: Vec<_> = self.registry.iter_alive().collect();
        for entity in alive {
            self.registry.destroy(entity);
        }
        for storage in self.storages.values_mut() {
            storage.clear();
        }
    }

    // ── Storages ─────────────────────────────────────────────────────

    /// The storage for `T`, if anything has ever been written to it.
    pub fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.storages
            .get(&component_id::<T>())
            .and_then(|s| s.as_any().downcast_ref::<SparseSet<T>>())
    }

    /// The storage for `T`, created on first use.
    pub fn storage_mut<T: Component>(&mut self) -> &mut SparseSet<T> {
        self.storages
            .entry(component_id::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()))
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
            .unwrap_or_else(|| {
                panic!(
                    "storage for `{}` holds a different type",
                    std::any::type_name::<T>()
                )
            })
    }

    /// Number of materialized component storages.
    pub fn storage_count(&self) -> usize {
        self.storages.len()
    }

    /// Short type names of every component attached to `entity`, sorted.
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .storages
            .values()
            .filter(|s| s.contains_entity(entity))
            .map(|s| short_type_name(s.component_name()))
            .collect();
        names.sort_unstable();
        names
    }

    // ── Components ───────────────────────────────────────────────────

    /// Attach a component, enforcing its declared invariants.
    ///
    /// Runs [`Component::validate`] first, stores the value (overwriting an
    /// existing one), then runs [`Component::on_add`].
    pub fn try_add<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), ComponentError> {
        if !self.registry.is_alive(entity) {
            return Err(ComponentError::DeadEntity {
                component: short_type_name(std::any::type_name::<T>()),
                entity,
            });
        }
        T::validate(self, entity)?;
        self.storage_mut::<T>().insert(entity, component);
        T::on_add(self, entity);
        Ok(())
    }

    /// Attach a component.
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead or the component's validation fails. Use
    /// [`try_add`](Self::try_add) to handle those cases.
    pub fn add<T: Component>(&mut self, entity: Entity, component: T) {
        if let Err(err) = self.try_add(entity, component) {
            panic!("{err}");
        }
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>().is_some_and(|s| s.contains(entity))
    }

    /// Returns `None` if the entity is dead or lacks `T`.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.get(entity)
    }

    /// Returns `None` if the entity is dead or lacks `T`.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storages
            .get_mut(&component_id::<T>())?
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()?
            .get_mut(entity)
    }

    /// Shared access for callers that have already checked [`has`](Self::has).
    ///
    /// # Panics
    ///
    /// Panics if the entity lacks `T`.
    pub fn component<T: Component>(&self, entity: Entity) -> &T {
        self.get::<T>(entity).unwrap_or_else(|| {
            panic!(
                "{entity:?} has no `{}` component",
                short_type_name(std::any::type_name::<T>())
            )
        })
    }

    /// Mutable access for callers that have already checked [`has`](Self::has).
    ///
    /// # Panics
    ///
    /// Panics if the entity lacks `T`.
    pub fn component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.get_mut::<T>(entity).unwrap_or_else(|| {
            panic!(
                "{entity:?} has no `{}` component",
                short_type_name(std::any::type_name::<T>())
            )
        })
    }

    /// Detach and return a component. No-op if absent.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.storages
            .get_mut(&component_id::<T>())?
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()?
            .remove(entity)
    }

    /// Live entities carrying every component in `Q`.
    ///
    /// ```ignore
    /// for entity in world.view::<(Velocity, Transform)>() {
    ///     let v = world.component::<Velocity>(entity).linear;
    ///     world.component_mut::<Transform>(entity).translation += v * dt;
    /// }
    /// ```
    pub fn view<Q: View>(&self) -> Vec<Entity> {
        let mut out = Vec::new();
        Q::collect(self, &mut out);
        out
    }

    // ── Resources ────────────────────────────────────────────────────

    /// Insert a singleton value, replacing any previous one of the same type.
    pub fn insert_resource<T: 'static>(&mut self, value: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// # Panics
    ///
    /// Panics if the resource hasn't been inserted.
    pub fn resource<T: 'static>(&self) -> &T {
        self.get_resource::<T>().unwrap_or_else(|| {
            panic!(
                "Resource `{}` not found. Did you forget to insert it?",
                std::any::type_name::<T>()
            )
        })
    }

    /// # Panics
    ///
    /// Panics if the resource hasn't been inserted.
    pub fn resource_mut<T: 'static>(&mut self) -> &mut T {
        self.get_resource_mut::<T>().unwrap_or_else(|| {
            panic!(
                "Resource `{}` not found. Did you forget to insert it?",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn get_resource<T: 'static>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|r| r.downcast_ref::<T>())
    }

    pub fn get_resource_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|r| r.downcast_mut::<T>())
    }

    pub fn has_resource<T: 'static>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<T>())
    }

    /// Take a resource out of the world.
    ///
    /// Systems use this to hold a resource and the world mutably at the same
    /// time, then put it back with [`insert_resource`](Self::insert_resource).
    pub fn take_resource<T: 'static>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|r| r.downcast::<T>().ok())
            .map(|b| *b)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// ── Views ────────────────────────────────────────────────────────────────

/// A tuple of component types that [`World::view`] can filter on.
pub trait View {
    fn collect(world: &World, out: &mut Vec<Entity>);
}

macro_rules! impl_view {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first: Component $(, $rest: Component)*> View for ($first, $($rest,)*) {
            fn collect(world: &World, out: &mut Vec<Entity>) {
                let Some(driver) = world.storage::<$first>() else {
                    return;
                };
                out.extend(
                    driver
                        .dense_entities()
                        .iter()
                        .copied()
                        .filter(|&e| world.is_alive(e) $(&& world.has::<$rest>(e))*),
                );
            }
        }
    };
}

impl_view!(A);
impl_view!(A, B);
impl_view!(A, B, C);
impl_view!(A, B, C, D);
impl_view!(A, B, C, D, E);
impl_view!(A, B, C, D, E, F);
