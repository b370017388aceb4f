//! Entity identity and the slot table.
//!
//! ## Entity model
//! An [`Entity`] is a compact, versioned handle: an index into the world's
//! slot arrays plus a generation counter. The generation is incremented when
//! a slot is recycled, so stale handles to a destroyed entity can be detected
//! instead of silently aliasing the new occupant.
//!
//! ## Slot table
//! [`EntityTable`] keeps three dense structures:
//!
//! - `generations[index]`: the generation a live handle must carry,
//! - `records[index]`: which archetype and row hold the entity's data,
//! - `free_list`: recycled indices awaiting reuse.
//!
//! Index 0 is reserved and its generation starts at 1, so the all-zeros
//! handle ([`INVALID_ENTITY`]) can never refer to a live entity.

use bytemuck::{Pod, Zeroable};

use crate::engine::types::ArchetypeID;

/// Opaque, versioned identifier for an entity.
///
/// Two handles are equal only when both index and generation match; a handle
/// whose generation lags the slot's current generation is stale and dead.
///
/// Handles are cheap to copy and hash, and safe to store in components.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Pod, Zeroable)]
pub struct Entity {
    /// Slot index in the world's entity table.
    pub index: u32,
    /// Generation the slot had when this handle was issued.
    pub generation: u32,
}

/// The null entity handle.
///
/// Never refers to a live entity; usable as a sentinel in components.
pub const INVALID_ENTITY: Entity = Entity { index: 0, generation: 0 };

/// Where one entity's component data lives.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct EntityRecord {
    /// Containing archetype, or `None` for a dead slot.
    pub archetype: Option<ArchetypeID>,
    /// Row within the archetype's columns.
    pub row: usize,
}

/// Dense entity slot storage with free-list reuse.
///
/// ## Invariants
/// - `generations.len() == records.len()`.
/// - Free-list entries are pairwise distinct and refer to slots whose record
///   has no archetype.
/// - `generations[e.index] == e.generation` iff the handle `e` is live.
pub(crate) struct EntityTable {
    pub(crate) generations: Vec<u32>,
    pub(crate) records: Vec<EntityRecord>,
    pub(crate) free_list: Vec<u32>,
}

impl EntityTable {
    /// Creates a table with the reserved zero slot.
    pub fn new() -> Self {
        EntityTable {
            generations: vec![1],
            records: vec![EntityRecord::default()],
            free_list: Vec::new(),
        }
    }

    /// Allocates a slot and returns the handle for it.
    ///
    /// Reuses a recycled index when one is available, otherwise extends the
    /// slot arrays. The caller is responsible for installing a record.
    pub fn allocate(&mut self) -> Entity {
        let index = if let Some(index) = self.free_list.pop() {
            index
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.records.push(EntityRecord::default());
            index
        };
        Entity {
            index,
            generation: self.generations[index as usize],
        }
    }

    /// Invalidates all outstanding handles for `index` and recycles it.
    ///
    /// The caller must have cleared the record beforehand.
    pub fn release(&mut self, index: u32) {
        debug_assert!(self.records[index as usize].archetype.is_none());
        self.generations[index as usize] = self.generations[index as usize].wrapping_add(1);
        self.free_list.push(index);
    }

    /// Returns `true` if `e` refers to a live entity.
    #[inline]
    pub fn alive(&self, e: Entity) -> bool {
        let index = e.index as usize;
        index < self.generations.len()
            && self.generations[index] == e.generation
            && self.records[index].archetype.is_some()
    }

    #[inline]
    pub fn record(&self, index: u32) -> &EntityRecord {
        &self.records[index as usize]
    }

    #[inline]
    pub fn record_mut(&mut self, index: u32) -> &mut EntityRecord {
        &mut self.records[index as usize]
    }

    /// Number of slots ever allocated, including dead ones.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.generations.len()
    }
}
