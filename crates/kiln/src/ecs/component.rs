//! # Component: Plain Data With Optional Hooks
//!
//! Any `'static` type becomes a component by implementing [`Component`].
//! Most components are an empty `impl`; two optional hooks cover the cases
//! where adding a component has rules or consequences:
//!
//! - [`Component::validate`] runs *before* insertion and can reject it
//!   (e.g. a character controller that needs a collider sibling).
//! - [`Component::on_add`] runs *after* insertion and can update siblings
//!   (e.g. a transform learning that a rigid body now owns it).
//!
//! ## Component ids
//!
//! Storages are keyed by a [`ComponentId`], a small integer handed out the
//! first time a type is seen, counting up from 1. The counter is
//! process-wide so ids agree across every `World`. Lookups go through a
//! thread-local cache so the shared map is locked once per type per thread.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use super::entity::Entity;
use super::world::World;
use crate::error::ComponentError;

/// Data that can be attached to an [`Entity`].
///
/// ```ignore
/// struct Health(u32);
/// impl Component for Health {}
/// ```
pub trait Component: 'static {
    /// Checked by [`World::try_add`] before the component is stored.
    fn validate(_world: &World, _entity: Entity) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called by [`World::try_add`] after the component is stored.
    fn on_add(_world: &mut World, _entity: Entity) {}
}

/// Process-wide identifier of a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

static NEXT_COMPONENT_ID: AtomicU32 = AtomicU32::new(1);

fn shared_ids() -> &'static Mutex<HashMap<TypeId, ComponentId>> {
    static IDS: OnceLock<Mutex<HashMap<TypeId, ComponentId>>> = OnceLock::new();
    IDS.get_or_init(|| Mutex::new(HashMap::new()))
}

thread_local! {
    static LOCAL_IDS: RefCell<HashMap<TypeId, ComponentId>> = RefCell::new(HashMap::new());
}

/// The [`ComponentId`] of `T`, assigned on first use.
pub fn component_id<T: 'static>() -> ComponentId {
    let type_id = TypeId::of::<T>();
    if let Some(id) = LOCAL_IDS.with(|ids| ids.borrow().get(&type_id).copied()) {
        return id;
    }
    let id = *shared_ids()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(type_id)
        .or_insert_with(|| ComponentId(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed)));
    LOCAL_IDS.with(|ids| ids.borrow_mut().insert(type_id, id));
    id
}

/// `my_game::components::Health` -> `Health`. Generic arguments are kept
/// as written: `alloc::vec::Vec<a::B>` -> `Vec<a::B>`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let path_end = full.find('<').unwrap_or(full.len());
    let start = full[..path_end].rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}
