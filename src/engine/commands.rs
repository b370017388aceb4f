//! Deferred structural commands.
//!
//! Structural changes (create, destroy, add, remove) invalidate row indices
//! and column pointers, so they are forbidden while a query iterates. The
//! [`CommandBuffer`] records them instead: a single linear byte log of
//! packed records, flushed into the world once iteration has finished.
//!
//! ## Record layout
//! Each record is a command header placed at its natural alignment, followed
//! for `Add` by the component value padded to 16-byte alignment, and for
//! `CreateWith` by a run of (sub-entry header, value bytes) pairs.
//! Recording costs one amortized-growth buffer and no per-command boxing.
//!
//! ## Payload ownership
//! Once recorded, a component value belongs to the buffer until flush moves
//! it into the world. The world's type-erased add either consumes the bytes
//! completely or leaves them untouched; when it declines (dead target), the
//! flush loop destroys the payload itself. Dropping an unflushed buffer
//! destroys every recorded payload.

use std::mem::{align_of, size_of, ManuallyDrop};
use std::ptr;

use crate::engine::component::{
    component_id_of, ColumnOps, Component, ComponentBundle, DropFn, MoveFn,
};
use crate::engine::entity::{Entity, INVALID_ENTITY};
use crate::engine::types::{align_up, ComponentID};
use crate::engine::world::{RawComponent, World};

/// Alignment every value payload is padded to.
///
/// Components with stricter alignment cannot be recorded; the typed record
/// methods reject them up front.
pub(crate) const PAYLOAD_ALIGN: usize = 16;

/// 16-byte-aligned growable byte buffer.
///
/// `Vec<u8>` guarantees nothing about its base alignment, so the log backs
/// onto 16-byte slabs and tracks its byte length separately. Offsets stay
/// stable across growth; pointers are re-derived from the base on use.
#[derive(Default)]
pub(crate) struct AlignedBuf {
    slabs: Vec<Slab>,
    len: usize,
}

#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct Slab([u8; 16]);

impl AlignedBuf {
    pub fn new() -> Self {
        AlignedBuf { slabs: Vec::new(), len: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.slabs.as_ptr() as *mut u8
    }

    /// Reserves `size` bytes at the next offset aligned to `align` and
    /// returns a pointer to them. `align` must not exceed 16.
    pub fn alloc(&mut self, size: usize, align: usize) -> *mut u8 {
        debug_assert!(align <= PAYLOAD_ALIGN && align.is_power_of_two());
        let offset = align_up(self.len, align);
        let end = offset + size;
        let slabs_needed = align_up(end, 16) / 16;
        if self.slabs.len() < slabs_needed {
            self.slabs.resize(slabs_needed, Slab([0; 16]));
        }
        self.len = end;
        unsafe { self.base().add(offset) }
    }

    /// Forgets the contents without touching them.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
enum CmdTag {
    Destroy,
    Add,
    Remove,
    CreateWith,
}

#[repr(C)]
struct CmdHeader {
    entity: Entity,
    cid: ComponentID,
    /// Value byte count for `Add`; sub-entry count for `CreateWith`.
    payload: usize,
    move_fn: Option<MoveFn>,
    drop_fn: Option<DropFn>,
    tag: CmdTag,
}

#[repr(C)]
struct SubEntry {
    cid: ComponentID,
    elem_size: usize,
    move_fn: MoveFn,
    drop_fn: DropFn,
}

/// Linear log of deferred structural commands.
///
/// Commands execute in FIFO order on [`flush`](CommandBuffer::flush).
/// Preconditions are silent during flush: destroying a dead entity or
/// removing an absent component is a no-op, never a panic.
#[derive(Default)]
pub struct CommandBuffer {
    buf: AlignedBuf,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        CommandBuffer { buf: AlignedBuf::new() }
    }

    /// Returns `true` if no commands are recorded.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Queues `e` for destruction.
    pub fn destroy(&mut self, e: Entity) {
        self.write_header(CmdTag::Destroy, e, 0, 0, None, None);
    }

    /// Queues adding (or assigning) component `value` on `e`.
    ///
    /// The value is moved into the log and belongs to it until flush.
    ///
    /// ## Panics
    /// Panics if `T`'s alignment exceeds 16 bytes.
    pub fn add<T: Component>(&mut self, e: Entity, value: T) {
        assert!(
            align_of::<T>() <= PAYLOAD_ALIGN,
            "component alignment exceeds command payload alignment"
        );
        let cid = component_id_of::<T>();
        let ops = ColumnOps::of::<T>();
        self.write_header(
            CmdTag::Add,
            e,
            cid,
            size_of::<T>(),
            Some(ops.move_fn),
            Some(ops.drop_fn),
        );
        let dst = self.buf.alloc(size_of::<T>(), PAYLOAD_ALIGN);
        let mut value = ManuallyDrop::new(value);
        unsafe { ptr::copy_nonoverlapping(&mut *value as *mut T as *const u8, dst, size_of::<T>()) };
    }

    /// Queues removing component `T` from `e`.
    pub fn remove<T: Component>(&mut self, e: Entity) {
        self.write_header(CmdTag::Remove, e, component_id_of::<T>(), 0, None, None);
    }

    /// Queues creating an entity with the components of `bundle`.
    pub fn create_with<B: ComponentBundle>(&mut self, bundle: B) {
        let count = B::component_ids().len();
        assert!(count > 0, "create_with requires at least one component");
        self.write_header(CmdTag::CreateWith, INVALID_ENTITY, 0, count, None, None);
        bundle.record(self);
    }

    /// Writes one create-with sub-entry. Used by bundle impls.
    pub(crate) fn push_component<T: Component>(&mut self, value: T) {
        assert!(
            align_of::<T>() <= PAYLOAD_ALIGN,
            "component alignment exceeds command payload alignment"
        );
        let ops = ColumnOps::of::<T>();
        let sub = SubEntry {
            cid: component_id_of::<T>(),
            elem_size: size_of::<T>(),
            move_fn: ops.move_fn,
            drop_fn: ops.drop_fn,
        };
        let dst = self.buf.alloc(size_of::<SubEntry>(), align_of::<SubEntry>());
        unsafe { ptr::write(dst as *mut SubEntry, sub) };
        let dst = self.buf.alloc(size_of::<T>(), PAYLOAD_ALIGN);
        let mut value = ManuallyDrop::new(value);
        unsafe { ptr::copy_nonoverlapping(&mut *value as *mut T as *const u8, dst, size_of::<T>()) };
    }

    fn write_header(
        &mut self,
        tag: CmdTag,
        entity: Entity,
        cid: ComponentID,
        payload: usize,
        move_fn: Option<MoveFn>,
        drop_fn: Option<DropFn>,
    ) {
        let dst = self.buf.alloc(size_of::<CmdHeader>(), align_of::<CmdHeader>());
        let header = CmdHeader { entity, cid, payload, move_fn, drop_fn, tag };
        unsafe { ptr::write(dst as *mut CmdHeader, header) };
    }

    /// Executes every queued command against `world`, in FIFO order.
    ///
    /// The log contents are taken first, so commands recorded re-entrantly
    /// during the flush land in the emptied buffer instead of the one being
    /// walked.
    pub fn flush(&mut self, world: &mut World) {
        if self.buf.is_empty() {
            return;
        }
        let mut local = std::mem::take(&mut self.buf);
        let base = local.base();
        let len = local.len();
        let mut pos = 0usize;

        while pos < len {
            pos = align_up(pos, align_of::<CmdHeader>());
            if pos + size_of::<CmdHeader>() > len {
                break;
            }
            let header = unsafe { ptr::read(base.add(pos) as *const CmdHeader) };
            pos += size_of::<CmdHeader>();

            match header.tag {
                CmdTag::Destroy => world.destroy(header.entity),
                CmdTag::Remove => world.remove_raw(header.entity, header.cid),
                CmdTag::Add => {
                    pos = align_up(pos, PAYLOAD_ALIGN);
                    let data = unsafe { base.add(pos) };
                    let move_fn = header.move_fn.expect("add command without move function");
                    let consumed = world.add_raw(header.entity, header.cid, data, move_fn);
                    if !consumed {
                        let drop_fn = header.drop_fn.expect("add command without drop function");
                        unsafe { drop_fn(data) };
                    }
                    pos += header.payload;
                }
                CmdTag::CreateWith => {
                    let count = header.payload;
                    let mut parts = Vec::with_capacity(count);
                    for _ in 0..count {
                        pos = align_up(pos, align_of::<SubEntry>());
                        let sub = unsafe { ptr::read(base.add(pos) as *const SubEntry) };
                        pos += size_of::<SubEntry>();
                        pos = align_up(pos, PAYLOAD_ALIGN);
                        parts.push(RawComponent {
                            cid: sub.cid,
                            data: unsafe { base.add(pos) },
                        });
                        pos += sub.elem_size;
                    }
                    world.create_with_raw(&parts);
                }
            }
        }

        // Every payload was moved into the world or destroyed above.
        local.clear();
    }

    /// Destroys every recorded payload without executing anything.
    fn destroy_unflushed(&mut self) {
        let base = self.buf.base();
        let len = self.buf.len();
        let mut pos = 0usize;

        while pos < len {
            pos = align_up(pos, align_of::<CmdHeader>());
            if pos + size_of::<CmdHeader>() > len {
                break;
            }
            let header = unsafe { ptr::read(base.add(pos) as *const CmdHeader) };
            pos += size_of::<CmdHeader>();

            match header.tag {
                CmdTag::Destroy | CmdTag::Remove => {}
                CmdTag::Add => {
                    pos = align_up(pos, PAYLOAD_ALIGN);
                    if let Some(drop_fn) = header.drop_fn {
                        unsafe { drop_fn(base.add(pos)) };
                    }
                    pos += header.payload;
                }
                CmdTag::CreateWith => {
                    for _ in 0..header.payload {
                        pos = align_up(pos, align_of::<SubEntry>());
                        let sub = unsafe { ptr::read(base.add(pos) as *const SubEntry) };
                        pos += size_of::<SubEntry>();
                        pos = align_up(pos, PAYLOAD_ALIGN);
                        unsafe { (sub.drop_fn)(base.add(pos)) };
                        pos += sub.elem_size;
                    }
                }
            }
        }
        self.buf.clear();
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            self.destroy_unflushed();
        }
    }
}
