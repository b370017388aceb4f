//! Core ECS types, identifiers, and bit-level layouts.
//!
//! This module defines the fundamental identifiers, capacity constants, and
//! the component bitmask shared by every subsystem: entity management,
//! archetype storage, queries, and the snapshot codec.
//!
//! ## Design
//!
//! - Components are identified by small, dense numeric IDs assigned at first
//!   observation of a type.
//! - Archetype membership tests use a fixed-size 256-bit mask, so presence
//!   checks and query matching are a handful of word operations.
//! - Archetype storage grows from a chunk-sized seed and doubles thereafter.

/// Unique identifier for a component type.
///
/// IDs are dense: the first component type observed in a process gets 0, the
/// next 1, and so on, up to [`COMPONENT_CAP`].
pub type ComponentID = u32;

/// Identifier for an archetype within one world.
///
/// Archetype IDs index into the world's archetype list and stay valid for the
/// world's lifetime; archetypes are never removed.
pub type ArchetypeID = u32;

/// Maximum number of distinct component types per process.
///
/// Exceeding this is a programmer error and panics at registration.
pub const COMPONENT_CAP: usize = 256;

/// Number of `u64` words in a [`ComponentMask`].
pub const MASK_WORDS: usize = COMPONENT_CAP / 64;

/// Target byte size for the first storage block of an archetype.
///
/// The initial row capacity is seeded to `CHUNK_BYTES / row_bytes`, floored
/// at [`MIN_ARCHETYPE_ROWS`], and doubles on every growth after that.
pub const CHUNK_BYTES: usize = 16_384;

/// Lower bound on the seeded row capacity of an archetype block.
pub const MIN_ARCHETYPE_ROWS: usize = 16;

/// Minimum alignment of an archetype's backing block and of every column
/// region within it.
pub const BLOCK_ALIGN: usize = 16;

/// Maximum number of include terms and of exclude terms in one query.
pub const MAX_QUERY_TERMS: usize = 16;

/// Fixed-size bitset over component IDs.
///
/// ## Purpose
/// Every archetype carries one mask describing exactly the component IDs it
/// stores. Query matching reduces to word-wise AND/compare over these masks.
///
/// ## Invariants
/// An archetype's mask and its column list always describe the same ID set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ComponentMask {
    words: [u64; MASK_WORDS],
}

impl ComponentMask {
    /// The empty mask.
    pub const EMPTY: ComponentMask = ComponentMask { words: [0; MASK_WORDS] };

    /// Builds a mask from a list of component IDs.
    pub fn from_ids(ids: &[ComponentID]) -> Self {
        let mut mask = Self::EMPTY;
        for &id in ids {
            mask.set(id);
        }
        mask
    }

    /// Sets the bit for `id`.
    ///
    /// ## Panics
    /// Panics if `id` is outside [`COMPONENT_CAP`].
    #[inline]
    pub fn set(&mut self, id: ComponentID) {
        self.words[(id as usize) / 64] |= 1u64 << ((id as usize) % 64);
    }

    /// Clears the bit for `id`.
    #[inline]
    pub fn clear(&mut self, id: ComponentID) {
        self.words[(id as usize) / 64] &= !(1u64 << ((id as usize) % 64));
    }

    /// Returns `true` if the bit for `id` is set.
    #[inline]
    pub fn has(&self, id: ComponentID) -> bool {
        (self.words[(id as usize) / 64] >> ((id as usize) % 64)) & 1 == 1
    }

    /// Returns `true` if every bit of `other` is also set in `self`.
    #[inline]
    pub fn contains_all(&self, other: &ComponentMask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(word, need)| word & need == *need)
    }

    /// Returns `true` if `self` and `other` share no set bits.
    #[inline]
    pub fn is_disjoint(&self, other: &ComponentMask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }
}

/// Rounds `offset` up to the next multiple of `align`.
///
/// `align` must be a power of two.
#[inline]
pub(crate) const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}
