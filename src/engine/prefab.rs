//! Reusable component bundles for repeated instantiation.
//!
//! A [`Prefab`] owns default values for a set of components in one packed
//! buffer, together with per-component lifecycle function pointers. Each
//! [`instantiate`] stamps a fresh entity out of those defaults; the override
//! variant substitutes or extends them with caller-supplied values.
//!
//! Prefab components must be `Clone`: instantiation clones the stored
//! default rather than consuming it.

use std::mem::{align_of, size_of};
use std::ptr;

use crate::engine::archetype::TypeSet;
use crate::engine::commands::{AlignedBuf, PAYLOAD_ALIGN};
use crate::engine::component::{component_id_of, ColumnOps, Component, ComponentBundle};
use crate::engine::entity::{Entity, EntityRecord};
use crate::engine::types::ComponentID;
use crate::engine::world::World;

/// Clone-constructs one element from `src` into the uninitialized `dst`.
type CloneFn = unsafe fn(dst: *mut u8, src: *const u8);

unsafe fn clone_stub<T: Clone>(dst: *mut u8, src: *const u8) {
    let value = unsafe { (*(src as *const T)).clone() };
    unsafe { ptr::write(dst as *mut T, value) };
}

struct PrefabEntry {
    cid: ComponentID,
    elem_size: usize,
    offset: usize,
    ops: ColumnOps,
    clone_fn: CloneFn,
}

/// An owned, copyable bundle of default component values.
pub struct Prefab {
    entries: Vec<PrefabEntry>,
    buf: AlignedBuf,
}

impl Prefab {
    /// Builds a prefab from a tuple of component values.
    ///
    /// ## Panics
    /// Panics on an empty bundle.
    pub fn new<B: PrefabBundle>(bundle: B) -> Self {
        assert!(
            !B::component_ids().is_empty(),
            "prefab requires at least one component"
        );
        let mut prefab = Prefab { entries: Vec::new(), buf: AlignedBuf::new() };
        bundle.record_defaults(&mut prefab);
        prefab
    }

    /// Number of components stored in the prefab.
    pub fn component_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the prefab stores a default for `T`.
    pub fn has<T: Component>(&self) -> bool {
        let cid = component_id_of::<T>();
        self.entries.iter().any(|entry| entry.cid == cid)
    }

    /// Stores `value` as the default for its component type.
    pub(crate) fn push_default<T: Component + Clone>(&mut self, value: T) {
        assert!(
            align_of::<T>() <= PAYLOAD_ALIGN,
            "component alignment exceeds prefab buffer alignment"
        );
        let dst = self.buf.alloc(size_of::<T>(), PAYLOAD_ALIGN);
        let offset = unsafe { dst.offset_from(self.buf.base()) } as usize;
        unsafe { ptr::write(dst as *mut T, value) };
        self.entries.push(PrefabEntry {
            cid: component_id_of::<T>(),
            elem_size: size_of::<T>(),
            offset,
            ops: ColumnOps::of::<T>(),
            clone_fn: clone_stub::<T>,
        });
    }

    fn type_set(&self) -> TypeSet {
        TypeSet::new(self.entries.iter().map(|entry| entry.cid).collect())
    }
}

impl Clone for Prefab {
    fn clone(&self) -> Self {
        let mut buf = AlignedBuf::new();
        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let dst = buf.alloc(entry.elem_size, PAYLOAD_ALIGN);
            debug_assert_eq!(
                unsafe { dst.offset_from(buf.base()) } as usize,
                entry.offset
            );
            unsafe { (entry.clone_fn)(dst, self.buf.base().add(entry.offset)) };
            entries.push(PrefabEntry {
                cid: entry.cid,
                elem_size: entry.elem_size,
                offset: entry.offset,
                ops: entry.ops,
                clone_fn: entry.clone_fn,
            });
        }
        Prefab { entries, buf }
    }
}

impl Drop for Prefab {
    fn drop(&mut self) {
        for entry in &self.entries {
            unsafe { (entry.ops.drop_fn)(self.buf.base().add(entry.offset)) };
        }
    }
}

/// A tuple of `Clone` component values usable as prefab defaults.
pub trait PrefabBundle: ComponentBundle {
    /// Stores each component value as a prefab default.
    fn record_defaults(self, prefab: &mut Prefab);
}

macro_rules! impl_prefab_bundle {
    ($(($T:ident, $idx:tt)),+) => {
        impl<$($T: Component + Clone),+> PrefabBundle for ($($T,)+) {
            fn record_defaults(self, prefab: &mut Prefab) {
                $( prefab.push_default::<$T>(self.$idx); )+
            }
        }
    };
}

impl_prefab_bundle!((A, 0));
impl_prefab_bundle!((A, 0), (B, 1));
impl_prefab_bundle!((A, 0), (B, 1), (C, 2));
impl_prefab_bundle!((A, 0), (B, 1), (C, 2), (D, 3));
impl_prefab_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_prefab_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_prefab_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_prefab_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));

/// Creates an entity from the prefab's default component values.
///
/// The entity lands in the archetype matching the prefab's component set;
/// each default is clone-constructed into its column and on-add hooks fire
/// per component.
///
/// ## Panics
/// Panics if called during iteration.
pub fn instantiate(world: &mut World, prefab: &Prefab) -> Entity {
    world.assert_structural();
    assert!(prefab.component_count() > 0, "instantiate: empty prefab");

    let aid = world.get_or_create_archetype(prefab.type_set());
    let e = world.entities.allocate();

    let arch = &mut world.archetypes[aid as usize];
    let row = arch.count();
    arch.push_entity(e);
    for entry in &prefab.entries {
        let col = arch
            .find_column_mut(entry.cid)
            .expect("prefab archetype missing column");
        unsafe {
            let dst = col.get(col.count());
            (entry.clone_fn)(dst, prefab.buf.base().add(entry.offset));
            col.count += 1;
        }
    }
    arch.assert_parity();

    *world.entities.record_mut(e.index) = EntityRecord { archetype: Some(aid), row };
    for entry in &prefab.entries {
        world.fire_on_add(entry.cid, e);
    }
    e
}

/// Creates an entity from the prefab with some components overridden.
///
/// The entity's component set is the union of the prefab's and the
/// overrides'. Non-overridden defaults are cloned; override values are
/// moved. On-add fires for every component of the union.
///
/// ## Panics
/// Panics if called during iteration.
pub fn instantiate_with<B: ComponentBundle>(
    world: &mut World,
    prefab: &Prefab,
    overrides: B,
) -> Entity {
    world.assert_structural();
    assert!(prefab.component_count() > 0, "instantiate: empty prefab");

    let override_ids = B::component_ids();
    let mut ids: Vec<ComponentID> = prefab.entries.iter().map(|entry| entry.cid).collect();
    ids.extend_from_slice(&override_ids);
    let ts = TypeSet::new(ids);

    let aid = world.get_or_create_archetype(ts.clone());
    let e = world.entities.allocate();

    let arch = &mut world.archetypes[aid as usize];
    let row = arch.count();
    arch.push_entity(e);

    for entry in &prefab.entries {
        if override_ids.contains(&entry.cid) {
            continue;
        }
        let col = arch
            .find_column_mut(entry.cid)
            .expect("prefab archetype missing column");
        unsafe {
            let dst = col.get(col.count());
            (entry.clone_fn)(dst, prefab.buf.base().add(entry.offset));
            col.count += 1;
        }
    }
    overrides.write_columns(arch);
    arch.assert_parity();

    *world.entities.record_mut(e.index) = EntityRecord { archetype: Some(aid), row };
    for &cid in ts.ids() {
        world.fire_on_add(cid, e);
    }
    e
}
