//! Type-erased column storage.
//!
//! A [`ComponentColumn`] is one component type's contiguous array within an
//! archetype's backing block. The column does not own its byte region; the
//! archetype's block allocation does. Columns only track the region pointer,
//! element geometry, live count, and the lifecycle function table.
//!
//! ## Unsafe code
//! Every mutation here is raw pointer arithmetic plus a call through the
//! component's [`ColumnOps`]. Callers uphold:
//!
//! - `data` points at a region with room for `capacity` elements,
//! - rows `0..count` are initialized, rows `count..capacity` are not,
//! - the archetype keeps `count` equal across all of its columns between
//!   observable operations.

use std::mem::{size_of, ManuallyDrop};

use crate::engine::component::{ColumnOps, Component};

/// One component type's column inside an archetype.
///
/// ## Invariants
/// - `count <= capacity`.
/// - Elements `0..count` are initialized.
/// - `data` is aligned for the element type whenever `capacity > 0`.
pub struct ComponentColumn {
    pub(crate) data: *mut u8,
    pub(crate) elem_size: usize,
    pub(crate) align: usize,
    pub(crate) count: usize,
    pub(crate) capacity: usize,
    pub(crate) ops: ColumnOps,
}

impl ComponentColumn {
    pub(crate) fn new(elem_size: usize, align: usize, ops: ColumnOps) -> Self {
        ComponentColumn {
            data: std::ptr::null_mut(),
            elem_size,
            align,
            count: 0,
            capacity: 0,
            ops,
        }
    }

    /// Number of live elements.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Size of one element in bytes.
    #[inline]
    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    /// Pointer to the element at `row`.
    ///
    /// ## Safety
    /// `row` must be within the column's capacity. The returned pointer is
    /// invalidated by any operation that may grow the archetype.
    #[inline]
    pub(crate) unsafe fn get(&self, row: usize) -> *mut u8 {
        unsafe { self.data.add(row * self.elem_size) }
    }

    /// Typed base pointer of the column.
    #[inline]
    pub(crate) fn typed_ptr<T: Component>(&self) -> *mut T {
        self.data as *mut T
    }

    /// Moves one element from `src` into the next free row.
    ///
    /// The source bytes are relocated; the caller forfeits them and must not
    /// drop the original.
    ///
    /// ## Safety
    /// `src` must point at a valid element of this column's type, and the
    /// column must have spare capacity (the archetype grows before pushing).
    pub(crate) unsafe fn push_raw(&mut self, src: *mut u8) {
        debug_assert!(self.count < self.capacity, "column push without capacity");
        unsafe { (self.ops.move_fn)(self.get(self.count), src) };
        self.count += 1;
    }

    /// Moves `value` into the next free row.
    ///
    /// ## Safety
    /// Same capacity requirement as `push_raw`; `T` must be the column's
    /// element type.
    pub(crate) unsafe fn push_value<T: Component>(&mut self, value: T) {
        debug_assert_eq!(self.elem_size, size_of::<T>(), "column element type mismatch");
        let mut value = ManuallyDrop::new(value);
        unsafe { self.push_raw(&mut *value as *mut T as *mut u8) };
    }

    /// Drops the element at `row` and back-fills the hole from the last row.
    ///
    /// ## Safety
    /// `row < count`.
    pub(crate) unsafe fn swap_remove(&mut self, row: usize) {
        debug_assert!(row < self.count);
        unsafe {
            (self.ops.drop_fn)(self.get(row));
            if row + 1 < self.count {
                (self.ops.move_fn)(self.get(row), self.get(self.count - 1));
            }
        }
        self.count -= 1;
    }

    /// Back-fills `row` from the last row without dropping it first.
    ///
    /// For rows whose value has already been moved out during an archetype
    /// migration: the slot holds dead bytes, and dropping them would double
    /// a drop that the destination column now owns.
    ///
    /// ## Safety
    /// `row < count`, and the element at `row` must have been moved out.
    pub(crate) unsafe fn swap_remove_moved(&mut self, row: usize) {
        debug_assert!(row < self.count);
        unsafe {
            if row + 1 < self.count {
                (self.ops.move_fn)(self.get(row), self.get(self.count - 1));
            }
        }
        self.count -= 1;
    }

    /// Drops every live element and resets the count.
    ///
    /// ## Safety
    /// Rows `0..count` must be initialized.
    pub(crate) unsafe fn drop_all(&mut self) {
        for row in 0..self.count {
            unsafe { (self.ops.drop_fn)(self.get(row)) };
        }
        self.count = 0;
    }
}
