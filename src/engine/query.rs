//! Query matching and the archetype-list cache.
//!
//! A query names the component types a row must have (include terms) and may
//! name types it must not have (exclude terms). Matching is three word-wise
//! mask operations per archetype; the archetype list for each distinct
//! (include, exclude) pair is cached and reused until the archetype set
//! grows.
//!
//! ## Safety by discipline
//! Iteration hands the callback mutable component references manufactured
//! from column base pointers. The API enforces access correctness by
//! construction and by the world's iteration guard, not by the borrow
//! checker: callbacks must not request the same component of the same entity
//! through another path while they hold the yielded references.

use std::collections::HashMap;

use crate::engine::archetype::Archetype;
use crate::engine::component::{component_id_of, Component, ComponentIdList};
use crate::engine::types::{ArchetypeID, ComponentID, ComponentMask, MAX_QUERY_TERMS};

/// A tuple of component types iterable by the world's `each` family.
///
/// Implemented for tuples of one through eight components. The callback
/// receives one mutable reference per tuple element, in declaration order.
pub trait QueryTuple: ComponentIdList {
    /// Per-archetype column base pointers.
    type Ptrs: Copy;
    /// The references handed to the callback for one row.
    type Refs<'a>;

    /// Resolves the typed base pointer of each queried column.
    ///
    /// The archetype must contain every component of the tuple; matched
    /// archetypes always do.
    fn base_ptrs(arch: &Archetype) -> Self::Ptrs;

    /// Produces the row references for `row`.
    ///
    /// ## Safety
    /// `row` must be below the archetype's count at the time the pointers
    /// were resolved, and no structural change may have occurred since.
    unsafe fn row_refs<'a>(ptrs: Self::Ptrs, row: usize) -> Self::Refs<'a>;
}

macro_rules! impl_query_tuple {
    ($(($T:ident, $idx:tt)),+) => {
        impl<$($T: Component),+> QueryTuple for ($($T,)+) {
            type Ptrs = ($(*mut $T,)+);
            type Refs<'a> = ($(&'a mut $T,)+);

            fn base_ptrs(arch: &Archetype) -> Self::Ptrs {
                ($(
                    arch.find_column(component_id_of::<$T>())
                        .expect("queried component missing from matched archetype")
                        .typed_ptr::<$T>(),
                )+)
            }

            unsafe fn row_refs<'a>(ptrs: Self::Ptrs, row: usize) -> Self::Refs<'a> {
                ($( unsafe { &mut *ptrs.$idx.add(row) }, )+)
            }
        }
    };
}

impl_query_tuple!((A, 0));
impl_query_tuple!((A, 0), (B, 1));
impl_query_tuple!((A, 0), (B, 1), (C, 2));
impl_query_tuple!((A, 0), (B, 1), (C, 2), (D, 3));
impl_query_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_query_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_query_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_query_tuple!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));

/// Cache key: sorted include and exclude ID lists in fixed arrays.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct QueryKey {
    include: [ComponentID; MAX_QUERY_TERMS],
    exclude: [ComponentID; MAX_QUERY_TERMS],
    n_include: u8,
    n_exclude: u8,
}

impl QueryKey {
    fn new(include: &[ComponentID], exclude: &[ComponentID]) -> Self {
        assert!(include.len() <= MAX_QUERY_TERMS, "query exceeds max include terms");
        assert!(exclude.len() <= MAX_QUERY_TERMS, "query exceeds max exclude terms");

        let mut key = QueryKey {
            include: [0; MAX_QUERY_TERMS],
            exclude: [0; MAX_QUERY_TERMS],
            n_include: include.len() as u8,
            n_exclude: exclude.len() as u8,
        };
        key.include[..include.len()].copy_from_slice(include);
        key.include[..include.len()].sort_unstable();
        key.exclude[..exclude.len()].copy_from_slice(exclude);
        key.exclude[..exclude.len()].sort_unstable();
        key
    }
}

struct CacheEntry {
    archetypes: Vec<ArchetypeID>,
    /// Archetype-set generation this entry was built at.
    generation: u64,
}

/// Cached archetype lists per (include, exclude) query shape.
///
/// Entries are tagged with the archetype-set generation observed when built;
/// a mismatch forces a rescan of every archetype. Existing archetypes never
/// change their component set, so an entry built at generation `G` stays
/// exact until a new archetype appears. The cache never evicts.
pub(crate) struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        QueryCache { entries: HashMap::new() }
    }

    /// Returns the archetypes matching the query, rebuilding the cached list
    /// when the archetype set has grown since it was last built.
    pub fn matching(
        &mut self,
        include: &[ComponentID],
        exclude: &[ComponentID],
        generation: u64,
        archetypes: &[Archetype],
    ) -> &[ArchetypeID] {
        let key = QueryKey::new(include, exclude);
        let entry = self.entries.entry(key).or_insert(CacheEntry {
            archetypes: Vec::new(),
            generation: u64::MAX,
        });

        if entry.generation != generation {
            entry.archetypes.clear();
            let include_mask = ComponentMask::from_ids(include);
            let exclude_mask = ComponentMask::from_ids(exclude);
            for (id, arch) in archetypes.iter().enumerate() {
                if arch.mask().contains_all(&include_mask)
                    && arch.mask().is_disjoint(&exclude_mask)
                {
                    entry.archetypes.push(id as ArchetypeID);
                }
            }
            entry.generation = generation;
        }

        &entry.archetypes
    }
}
