//! # Sparse-Set Component Storage
//!
//! One [`SparseSet`] per component type. Three parallel arrays give O(1)
//! insert, remove and lookup plus tightly packed iteration:
//!
//! ```text
//! sparse:     [ 1, X, 0, X, 2 ]     indexed by Entity::index, X = empty
//! dense:      [ e2, e0, e4 ]        entity at each packed slot
//! components: [ c2, c0, c4 ]        parallel to dense
//! ```
//!
//! Invariant: `sparse[e.index] == i` iff `dense[i] == e`. The full handle
//! (index and generation) is compared, so a stale handle never matches a
//! slot that has been reused by a newer generation.
//!
//! Removal swaps the last packed element into the hole. Iteration order is
//! therefore insertion order perturbed by removals, and is not stable.

use std::any::Any;

use super::entity::Entity;

const EMPTY: u32 = u32::MAX;

/// Packed storage for components of type `T`.
pub struct SparseSet<T> {
    sparse: Vec<u32>,
    dense: Vec<Entity>,
    components: Vec<T>,
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            components: Vec::new(),
        }
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let slot = *self.sparse.get(entity.index as usize)?;
        if slot == EMPTY {
            return None;
        }
        let slot = slot as usize;
        (self.dense.get(slot) == Some(&entity)).then_some(slot)
    }

    /// Attach `value` to `entity`. An existing value is overwritten in place
    /// and returned.
    ///
    /// A slot still held by an older generation of the same index is taken
    /// over: the stale entity and its value are replaced, and nothing is
    /// returned for them.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        if let Some(slot) = self.dense_index(entity) {
            return Some(std::mem::replace(&mut self.components[slot], value));
        }
        let index = entity.index as usize;
        if let Some(slot) = self.sparse.get(index).copied().filter(|&s| s != EMPTY) {
            let slot = slot as usize;
            self.dense[slot] = entity;
            self.components[slot] = value;
            return None;
        }
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, EMPTY);
        }
        self.sparse[index] = self.dense.len() as u32;
        self.dense.push(entity);
        self.components.push(value);
        None
    }

    /// Detach and return the component of `entity`, if any.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.dense_index(entity)?;
        let last = self.dense.len() - 1;
        if slot != last {
            let moved = self.dense[last];
            self.sparse[moved.index as usize] = slot as u32;
        }
        self.dense.swap_remove(slot);
        self.sparse[entity.index as usize] = EMPTY;
        Some(self.components.swap_remove(slot))
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|slot| &self.components[slot])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let slot = self.dense_index(entity)?;
        Some(&mut self.components[slot])
    }

    /// Entities in packed order. This is the order views iterate in.
    pub fn dense_entities(&self) -> &[Entity] {
        &self.dense
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.dense.iter().copied().zip(self.components.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.dense.iter().copied().zip(self.components.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.components.clear();
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Object-safe view of a [`SparseSet`] so the [`World`](super::World) can
/// keep storages of unrelated types in one map.
pub trait ErasedStorage: Any {
    /// Drop the entity's component, if present. Returns whether one existed.
    fn remove_entity(&mut self, entity: Entity) -> bool;

    fn contains_entity(&self, entity: Entity) -> bool;

    fn dense_entities(&self) -> &[Entity];

    fn len(&self) -> usize;

    fn clear(&mut self);

    /// Type name of the stored component, for diagnostics.
    fn component_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedStorage for SparseSet<T> {
    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn contains_entity(&self, entity: Entity) -> bool {
        self.contains(entity)
    }

    fn dense_entities(&self) -> &[Entity] {
        SparseSet::dense_entities(self)
    }

    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    fn clear(&mut self) {
        SparseSet::clear(self)
    }

    fn component_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
