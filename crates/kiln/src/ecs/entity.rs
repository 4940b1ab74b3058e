//! # Entity: Generation-Tagged Handles
//!
//! An [`Entity`] carries no data of its own. It is a key shared by every
//! component storage in the [`World`](super::World), and it is only
//! meaningful while the [`EntityRegistry`] agrees that it is alive.
//!
//! ## Generational Indices
//!
//! Indices are recycled, so a bare counter would let a stale handle silently
//! alias a newer entity:
//!
//! ```text
//! 1. create       -> Entity { index: 5, generation: 0 }
//! 2. destroy it   -> generation[5] becomes 1, index 5 goes on the free list
//! 3. create       -> Entity { index: 5, generation: 1 }
//! 4. the old handle still says generation 0, so is_alive() rejects it
//! ```
//!
//! A handle is alive iff `generation[handle.index] == handle.generation`.

use std::fmt;

/// A lightweight handle to an entity in a [`World`](super::World).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    /// Slot index. Reused after the entity is destroyed.
    pub(crate) index: u32,
    /// Incremented every time the slot is released.
    pub(crate) generation: u32,
}

impl Entity {
    /// A handle that is never alive in any registry.
    pub const DANGLING: Entity = Entity {
        index: u32::MAX,
        generation: u32::MAX,
    };

    /// Build a handle from raw parts. Mostly useful for tests and tooling;
    /// the result is only alive if a registry issued the same pair.
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Issues and recycles entity handles.
///
/// ```text
/// generations: [1, 0, 2, 0]   one per slot ever handed out
/// free_list:   [0, 2]         slots waiting for reuse
/// ```
///
/// `create` pops the free list (keeping the already-bumped generation) or
/// appends a fresh slot at generation 0. `destroy` bumps the generation and
/// pushes the slot. Neither ever fails: dead handles are ignored.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a handle that is alive immediately.
    pub fn create(&mut self) -> Entity {
        if let Some(index) = self.free_list.pop() {
            let generation = self.generations[index as usize];
            Entity { index, generation }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            Entity {
                index,
                generation: 0,
            }
        }
    }

    /// Release a handle. Returns `false` (and does nothing) if it was
    /// already dead.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = &mut self.generations[entity.index as usize];
        *slot = slot.wrapping_add(1);
        self.free_list.push(entity.index);
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.generations
            .get(entity.index as usize)
            .is_some_and(|&generation| generation == entity.generation)
    }

    /// Number of live entities.
    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }

    /// Number of slots waiting on the free list.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Number of slots ever allocated.
    pub fn total_slots(&self) -> usize {
        self.generations.len()
    }

    /// Forget every slot. Handles issued before this call may be reissued
    /// with the same generation, so only use it when none are retained.
    pub fn clear(&mut self) {
        self.generations.clear();
        self.free_list.clear();
    }

    /// Every live handle, in index order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        let mut free = vec![false; self.generations.len()];
        for &index in &self.free_list {
            free[index as usize] = true;
        }
        self.generations
            .iter()
            .enumerate()
            .filter(move |(index, _)| !free[*index])
            .map(|(index, &generation)| Entity {
                index: index as u32,
                generation,
            })
    }
}
