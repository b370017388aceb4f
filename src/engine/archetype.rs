//! Archetype storage.
//!
//! An archetype stores every entity that has exactly one set of component
//! types, column-oriented: one contiguous array per component type, all
//! columns row-aligned with the entity list. Iteration over an archetype is
//! a linear walk of dense arrays.
//!
//! ## Memory layout
//! Each archetype owns a single backing block, subdivided into one region
//! per column at offsets aligned to at least [`BLOCK_ALIGN`]. Growth
//! reallocates the whole block: a new block is allocated and every column's
//! live elements are relocated into their new region before the old block is
//! freed. No pointer into column data survives a growth.
//!
//! ## Invariants
//! - Every column's live count equals the entity-row-list length between
//!   observable operations (checked by the debug parity assertion).
//! - Columns appear in component-ID-sorted order, matching the type set.
//! - The 256-bit mask and the column list describe the same ID set.
//! - Archetypes never move and never die once created; everything may hold
//!   their ID for the world's lifetime.

use std::alloc::{self, handle_alloc_error, Layout};
use std::collections::HashMap;
use std::ptr;

use crate::engine::component::component_info;
use crate::engine::entity::{Entity, INVALID_ENTITY};
use crate::engine::storage::ComponentColumn;
use crate::engine::types::{
    align_up, ArchetypeID, ComponentID, ComponentMask, BLOCK_ALIGN, CHUNK_BYTES,
    MIN_ARCHETYPE_ROWS,
};

/// A sorted set of component IDs identifying one archetype.
///
/// The empty set is the archetype of entities with no components. Equality
/// is element-wise; the set doubles as the hash key for archetype lookup.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct TypeSet(Vec<ComponentID>);

impl TypeSet {
    /// Builds a type set from IDs in any order. Duplicates collapse.
    pub fn new(mut ids: Vec<ComponentID>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        TypeSet(ids)
    }

    /// The component IDs, sorted ascending.
    #[inline]
    pub fn ids(&self) -> &[ComponentID] {
        &self.0
    }

    /// Number of component IDs in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy of the set with `id` inserted.
    pub fn with(&self, id: ComponentID) -> TypeSet {
        let mut ids = self.0.clone();
        if let Err(pos) = ids.binary_search(&id) {
            ids.insert(pos, id);
        }
        TypeSet(ids)
    }

    /// Returns a copy of the set with `id` removed.
    pub fn without(&self, id: ComponentID) -> TypeSet {
        let mut ids = self.0.clone();
        if let Ok(pos) = ids.binary_search(&id) {
            ids.remove(pos);
        }
        TypeSet(ids)
    }
}

/// Cached structural transitions out of one archetype.
///
/// Maps "add component X" / "remove component X" to the destination
/// archetype, so repeated migrations skip the type-set recomputation and
/// hash lookup. Append-only and valid for the world's lifetime.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchetypeEdge {
    /// Archetype reached by adding the component.
    pub add_target: Option<ArchetypeID>,
    /// Archetype reached by removing the component.
    pub remove_target: Option<ArchetypeID>,
}

/// Column-oriented storage for all entities sharing one component set.
pub struct Archetype {
    pub(crate) type_set: TypeSet,
    pub(crate) mask: ComponentMask,
    pub(crate) columns: Vec<(ComponentID, ComponentColumn)>,
    pub(crate) entities: Vec<Entity>,
    pub(crate) edges: HashMap<ComponentID, ArchetypeEdge>,
    block: *mut u8,
    block_layout: Layout,
    capacity: usize,
}

impl Archetype {
    /// Creates an empty archetype for `type_set`.
    ///
    /// Every ID in the set must already be registered; the columns take
    /// their geometry and lifecycle functions from the registry.
    ///
    /// ## Panics
    /// Panics if an ID has never been assigned to a type.
    pub(crate) fn new(type_set: TypeSet) -> Self {
        let mut mask = ComponentMask::EMPTY;
        let mut columns = Vec::with_capacity(type_set.len());
        for &cid in type_set.ids() {
            let info = component_info(cid).expect("archetype references unregistered component id");
            mask.set(cid);
            columns.push((cid, ComponentColumn::new(info.size, info.align, info.ops)));
        }
        Archetype {
            type_set,
            mask,
            columns,
            entities: Vec::new(),
            edges: HashMap::new(),
            block: ptr::null_mut(),
            block_layout: Layout::new::<u8>(),
            capacity: 0,
        }
    }

    /// Number of entities stored in this archetype.
    #[inline]
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// The sorted component-ID set of this archetype.
    #[inline]
    pub fn type_set(&self) -> &TypeSet {
        &self.type_set
    }

    /// The component mask of this archetype.
    #[inline]
    pub fn mask(&self) -> &ComponentMask {
        &self.mask
    }

    /// Entity handle stored at `row`.
    #[inline]
    pub fn entity_at(&self, row: usize) -> Entity {
        self.entities[row]
    }

    /// Returns `true` if the archetype stores component `id`.
    #[inline]
    pub fn has_component(&self, id: ComponentID) -> bool {
        self.mask.has(id)
    }

    /// Returns the column for `id`, if present.
    #[inline]
    pub(crate) fn find_column(&self, id: ComponentID) -> Option<&ComponentColumn> {
        self.columns
            .binary_search_by_key(&id, |(cid, _)| *cid)
            .ok()
            .map(|pos| &self.columns[pos].1)
    }

    /// Mutable access to the column for `id`, if present.
    #[inline]
    pub(crate) fn find_column_mut(&mut self, id: ComponentID) -> Option<&mut ComponentColumn> {
        self.columns
            .binary_search_by_key(&id, |(cid, _)| *cid)
            .ok()
            .map(move |pos| &mut self.columns[pos].1)
    }

    /// Verifies that every column's live count matches the entity list.
    ///
    /// Debug builds only; release builds compile this to nothing.
    #[inline]
    pub(crate) fn assert_parity(&self) {
        #[cfg(debug_assertions)]
        for (cid, col) in &self.columns {
            debug_assert_eq!(
                col.count(),
                self.entities.len(),
                "entity-column parity violated for component {cid}"
            );
        }
    }

    /// Appends an entity to the row list, growing the block if needed.
    ///
    /// Columns are left one element short: the caller must push one value
    /// into each column before the next observable operation.
    pub(crate) fn push_entity(&mut self, e: Entity) {
        self.ensure_capacity(self.count() + 1);
        self.entities.push(e);
    }

    /// Removes the entity at `row`, destroying its component values.
    ///
    /// The last row is moved into the hole. Returns the entity that moved,
    /// or [`INVALID_ENTITY`] when `row` was the last row. O(columns).
    pub(crate) fn swap_remove(&mut self, row: usize) -> Entity {
        let swapped = self.take_row(row);
        for (_, col) in &mut self.columns {
            unsafe { col.swap_remove(row) };
        }
        self.assert_parity();
        swapped
    }

    /// Back-fills `row` after its values were migrated to another archetype.
    ///
    /// Migrated columns only relocate the last row into the hole; the one
    /// column named by `drop_only` (a component being removed, present in
    /// the source but not the destination) still owns its value and is
    /// destroyed properly.
    pub(crate) fn swap_remove_migrated(
        &mut self,
        row: usize,
        drop_only: Option<ComponentID>,
    ) -> Entity {
        let swapped = self.take_row(row);
        for (cid, col) in &mut self.columns {
            unsafe {
                if drop_only == Some(*cid) {
                    col.swap_remove(row);
                } else {
                    col.swap_remove_moved(row);
                }
            }
        }
        self.assert_parity();
        swapped
    }

    fn take_row(&mut self, row: usize) -> Entity {
        let swapped = if row + 1 < self.entities.len() {
            let last = *self.entities.last().expect("swap_remove on empty archetype");
            self.entities[row] = last;
            last
        } else {
            INVALID_ENTITY
        };
        self.entities.pop();
        swapped
    }

    /// Grows the backing block to hold at least `needed` rows.
    ///
    /// No-op while `capacity >= needed`. The first growth seeds capacity to
    /// `CHUNK_BYTES / row_bytes` (floored at [`MIN_ARCHETYPE_ROWS`]); later
    /// growths double. Every column's live elements are relocated into the
    /// new block before the old one is freed.
    ///
    /// Any raw pointer into column data is invalid after this returns with a
    /// larger capacity.
    pub(crate) fn ensure_capacity(&mut self, needed: usize) {
        if self.capacity >= needed {
            return;
        }
        // The empty archetype stores only entity handles.
        if self.columns.is_empty() {
            self.capacity = needed;
            return;
        }

        let mut new_cap = if self.capacity == 0 {
            let row_bytes: usize = self.columns.iter().map(|(_, c)| c.elem_size).sum();
            let seed = if row_bytes > 0 { CHUNK_BYTES / row_bytes } else { 64 };
            seed.max(MIN_ARCHETYPE_ROWS)
        } else {
            self.capacity * 2
        };
        if new_cap < needed {
            new_cap = needed;
        }

        let block_align = self
            .columns
            .iter()
            .map(|(_, c)| c.align)
            .max()
            .unwrap_or(1)
            .max(BLOCK_ALIGN);
        let total = self.block_size_for(new_cap);
        let layout = Layout::from_size_align(total, block_align)
            .expect("archetype block layout overflow");

        let new_block = unsafe { alloc::alloc(layout) };
        if new_block.is_null() {
            handle_alloc_error(layout);
        }

        let mut offset = 0usize;
        for (_, col) in &mut self.columns {
            offset = align_up(offset, col.align.max(BLOCK_ALIGN));
            let new_data = unsafe { new_block.add(offset) };
            if !col.data.is_null() && col.count > 0 {
                unsafe { ptr::copy_nonoverlapping(col.data, new_data, col.count * col.elem_size) };
            }
            col.data = new_data;
            col.capacity = new_cap;
            offset += new_cap * col.elem_size;
        }

        if !self.block.is_null() {
            unsafe { alloc::dealloc(self.block, self.block_layout) };
        }
        self.block = new_block;
        self.block_layout = layout;
        self.capacity = new_cap;
    }

    fn block_size_for(&self, cap: usize) -> usize {
        let mut offset = 0usize;
        for (_, col) in &self.columns {
            offset = align_up(offset, col.align.max(BLOCK_ALIGN));
            offset += cap * col.elem_size;
        }
        offset
    }

    /// Edge-cache entry for `id`, if one has been recorded.
    #[inline]
    pub(crate) fn edge(&self, id: ComponentID) -> Option<&ArchetypeEdge> {
        self.edges.get(&id)
    }

    /// Edge-cache entry for `id`, created on first use.
    #[inline]
    pub(crate) fn edge_mut(&mut self, id: ComponentID) -> &mut ArchetypeEdge {
        self.edges.entry(id).or_default()
    }
}

impl Drop for Archetype {
    fn drop(&mut self) {
        for (_, col) in &mut self.columns {
            unsafe { col.drop_all() };
        }
        if !self.block.is_null() {
            unsafe { alloc::dealloc(self.block, self.block_layout) };
        }
    }
}
