//! # archetype_ecs
//!
//! Archetype-based Entity-Component-System runtime with columnar storage.
//!
//! ## Design goals
//! - Archetype storage: one contiguous column per component type, entities
//!   grouped by exact component set, for data-parallel iteration.
//! - Generational entity handles with free-list reuse.
//! - Structural changes deferred through a linear command log, so queries
//!   stay valid while systems run.
//! - A versioned binary snapshot of the whole world state.
//!
//! One world is single-threaded; callers may own many independent worlds,
//! one per thread, sharing the process-wide component registry.

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod engine;

pub mod builtin;
pub mod math;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core ECS types

pub use engine::world::World;

pub use engine::entity::{Entity, INVALID_ENTITY};

pub use engine::component::{
    component_id_by_name,
    component_id_of,
    component_name,
    register_named,
    register_named_with,
    Component,
    ComponentBundle,
    ComponentIdList,
};

pub use engine::archetype::{Archetype, TypeSet};

pub use engine::query::QueryTuple;

pub use engine::commands::CommandBuffer;

pub use engine::snapshot::{deserialize, serialize};

pub use engine::prefab::{instantiate, instantiate_with, Prefab, PrefabBundle};

pub use engine::error::{RegistryError, SnapshotError};

pub use engine::types::{ArchetypeID, ComponentID, ComponentMask, COMPONENT_CAP};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used ECS types.
///
/// Import with:
/// ```rust
/// use archetype_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        component_id_of,
        deserialize,
        instantiate,
        instantiate_with,
        register_named,
        serialize,
        CommandBuffer,
        Entity,
        Prefab,
        World,
        INVALID_ENTITY,
    };
}
