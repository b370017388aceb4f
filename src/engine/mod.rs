//! Core ECS engine.
//!
//! This module contains the runtime's building blocks:
//! - Component registry and type-erased lifecycle tables
//! - Entity slot table with generational handles
//! - Archetype column storage and structural migration
//! - Query matching with a generation-tagged cache
//! - Deferred command recording
//! - Snapshot serialization and prefabs
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod component;
pub mod storage;
pub mod entity;
pub mod archetype;
pub mod query;
pub mod commands;
pub mod world;
pub mod snapshot;
pub mod prefab;
