//! # Sparse-Set ECS
//!
//! A small Entity Component System. Entities are generation-tagged handles,
//! each component type lives in its own sparse set, and the [`World`] ties
//! them together with lazily created storages and a resource map.
//!
//! ## Module Overview
//!
//! - [`entity`]: Generational entity handles and their registry
//! - [`component`]: The `Component` trait and process-wide component ids
//! - [`storage`]: Sparse-set storage plus its type-erased face
//! - [`world`]: Central container (entities + components + resources + views)
//! - [`system`]: System trait and dependency-ordered system graph

pub mod component;
pub mod entity;
pub mod storage;
pub mod system;
pub mod world;

pub use component::{Component, ComponentId, component_id};
pub use entity::{Entity, EntityRegistry};
pub use storage::{ErasedStorage, SparseSet};
pub use system::{System, SystemGraph, SystemId};
pub use world::{View, World};
