//! Component registry.
//!
//! This module provides the process-wide registry that assigns dense
//! [`ComponentID`] values to Rust component types and records, per type, the
//! type-erased lifecycle functions ([`ColumnOps`]) that archetype columns and
//! the command buffer need.
//!
//! ## Purpose
//! The registry decouples component identity (`TypeId`, name, size,
//! alignment) from runtime storage. Once a type has been observed, archetype
//! migration, command-buffer flush, and snapshot restore can all create and
//! manipulate columns for it without the concrete type in scope; the
//! function pointers captured at first observation are the hinge that makes
//! those paths type-erased.
//!
//! ## Design
//! - A component type is registered the first time [`component_id_of`] sees
//!   it and is assigned the next dense ID, up to [`COMPONENT_CAP`].
//! - The registry stores a [`ComponentInfo`] per ID: size, alignment, type
//!   name, and the [`ColumnOps`] function-pointer table.
//! - Stable names for snapshot compatibility are attached separately via
//!   [`register_named`] / [`register_named_with`]; registration is
//!   idempotent and conflicts are reported as [`RegistryError`].
//!
//! ## Invariants
//! - `ComponentID` values are unique and stable for the lifetime of the
//!   process.
//! - Every assigned ID has a complete `ComponentInfo`.
//! - A stable name maps to exactly one ID and an ID to at most one name.
//!
//! ## Concurrency
//! The registry is guarded by an `RwLock` so that independent worlds on
//! different threads share one ID space.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::io;
use std::mem::{align_of, size_of};
use std::ptr;
use std::sync::{OnceLock, RwLock};

use bytemuck::Pod;

use crate::engine::archetype::Archetype;
use crate::engine::commands::CommandBuffer;
use crate::engine::error::RegistryError;
use crate::engine::types::{ComponentID, COMPONENT_CAP};

/// Marker for types usable as components.
///
/// Blanket-implemented for every `'static` type; component values are owned
/// by the world, so no further bounds are needed.
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

/// Relocates one element from `src` to `dst`.
///
/// The source slot is logically dead afterwards and must not be dropped.
pub type MoveFn = unsafe fn(dst: *mut u8, src: *mut u8);

/// Drops one element in place.
pub type DropFn = unsafe fn(ptr: *mut u8);

/// Swaps two elements in place.
pub type SwapFn = unsafe fn(a: *mut u8, b: *mut u8);

/// Writes one element to a byte stream.
pub type SerializeFn = unsafe fn(elem: *const u8, out: &mut dyn io::Write) -> io::Result<()>;

/// Reads one element from a byte stream into an uninitialized slot.
pub type DeserializeFn = unsafe fn(elem: *mut u8, input: &mut dyn io::Read) -> io::Result<()>;

/// Type-erased lifecycle table for one component type.
///
/// Captured by monomorphized stubs the first time a type is observed; from
/// then on columns can be created and manipulated without the type in scope.
#[derive(Clone, Copy)]
pub struct ColumnOps {
    /// Bitwise relocation of one element.
    pub move_fn: MoveFn,
    /// In-place destructor.
    pub drop_fn: DropFn,
    /// In-place swap of two elements.
    pub swap_fn: SwapFn,
    /// Per-element writer, present once the type is registered by name.
    pub serialize_fn: Option<SerializeFn>,
    /// Per-element reader, present once the type is registered by name.
    pub deserialize_fn: Option<DeserializeFn>,
}

unsafe fn move_stub<T>(dst: *mut u8, src: *mut u8) {
    unsafe { ptr::write(dst as *mut T, ptr::read(src as *const T)) }
}

unsafe fn drop_stub<T>(p: *mut u8) {
    unsafe { ptr::drop_in_place(p as *mut T) }
}

unsafe fn swap_stub<T>(a: *mut u8, b: *mut u8) {
    unsafe { ptr::swap(a as *mut T, b as *mut T) }
}

unsafe fn pod_serialize_stub<T: Pod>(elem: *const u8, out: &mut dyn io::Write) -> io::Result<()> {
    let value = unsafe { &*(elem as *const T) };
    out.write_all(bytemuck::bytes_of(value))
}

unsafe fn pod_deserialize_stub<T: Pod>(elem: *mut u8, input: &mut dyn io::Read) -> io::Result<()> {
    let mut value = T::zeroed();
    input.read_exact(bytemuck::bytes_of_mut(&mut value))?;
    unsafe { ptr::write(elem as *mut T, value) };
    Ok(())
}

impl ColumnOps {
    /// Builds the lifecycle table for `T` without serializers.
    pub(crate) fn of<T: Component>() -> Self {
        ColumnOps {
            move_fn: move_stub::<T>,
            drop_fn: drop_stub::<T>,
            swap_fn: swap_stub::<T>,
            serialize_fn: None,
            deserialize_fn: None,
        }
    }
}

/// Metadata recorded for one registered component type.
#[derive(Clone, Copy)]
pub struct ComponentInfo {
    /// Runtime `TypeId` of the component type.
    pub type_id: TypeId,
    /// Rust type name, for diagnostics.
    pub type_name: &'static str,
    /// Size of one element in bytes. Always nonzero.
    pub size: usize,
    /// Alignment of one element in bytes.
    pub align: usize,
    /// Type-erased lifecycle functions.
    pub ops: ColumnOps,
}

struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentID>,
    infos: Vec<ComponentInfo>,
    ids_by_name: HashMap<String, ComponentID>,
    names_by_id: HashMap<ComponentID, String>,
}

static REGISTRY: OnceLock<RwLock<ComponentRegistry>> = OnceLock::new();

fn registry() -> &'static RwLock<ComponentRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(ComponentRegistry {
            by_type: HashMap::new(),
            infos: Vec::new(),
            ids_by_name: HashMap::new(),
            names_by_id: HashMap::new(),
        })
    })
}

/// Returns the dense ID for component type `T`, assigning one on first call.
///
/// ## Behavior
/// - The first observation of a type records its size, alignment, and
///   lifecycle function table, so later type-erased paths (migration,
///   command flush, snapshot restore) can operate on it.
/// - ID assignment is process-local: IDs are stable within one run but not
///   across runs or across processes.
///
/// ## Panics
/// - When [`COMPONENT_CAP`] distinct component types already exist.
/// - When `T` is zero-sized; columns address nonzero element sizes.
pub fn component_id_of<T: Component>() -> ComponentID {
    let type_id = TypeId::of::<T>();
    {
        let reg = registry().read().expect("component registry poisoned");
        if let Some(&id) = reg.by_type.get(&type_id) {
            return id;
        }
    }

    let mut reg = registry().write().expect("component registry poisoned");
    if let Some(&id) = reg.by_type.get(&type_id) {
        return id;
    }

    assert!(
        size_of::<T>() > 0,
        "zero-sized type {} cannot be a component",
        type_name::<T>()
    );
    assert!(
        reg.infos.len() < COMPONENT_CAP,
        "component capacity exceeded ({} distinct component types)",
        COMPONENT_CAP
    );

    let id = reg.infos.len() as ComponentID;
    reg.by_type.insert(type_id, id);
    reg.infos.push(ComponentInfo {
        type_id,
        type_name: type_name::<T>(),
        size: size_of::<T>(),
        align: align_of::<T>(),
        ops: ColumnOps::of::<T>(),
    });
    id
}

fn register_named_inner<T: Component>(
    name: &str,
    ser: SerializeFn,
    deser: DeserializeFn,
) -> Result<(), RegistryError> {
    let id = component_id_of::<T>();
    let mut reg = registry().write().expect("component registry poisoned");

    if let Some(&existing) = reg.ids_by_name.get(name) {
        if existing != id {
            return Err(RegistryError::NameConflict {
                name: name.to_string(),
                existing,
                requested: id,
            });
        }
        return Ok(());
    }
    if let Some(existing) = reg.names_by_id.get(&id) {
        if existing != name {
            return Err(RegistryError::TypeAlreadyNamed {
                existing: existing.clone(),
                requested: name.to_string(),
                id,
            });
        }
        return Ok(());
    }

    reg.ids_by_name.insert(name.to_string(), id);
    reg.names_by_id.insert(id, name.to_string());
    let info = &mut reg.infos[id as usize];
    info.ops.serialize_fn = Some(ser);
    info.ops.deserialize_fn = Some(deser);
    Ok(())
}

/// Registers a stable name for `T` with byte-copy serializers.
///
/// ## Purpose
/// Snapshot streams identify component types by stable name, not by dense
/// ID, so two processes can exchange snapshots as long as both register the
/// same names. `T: Pod` supplies the default serializers: the element's raw
/// bytes, written and read verbatim.
///
/// ## Errors
/// Fails with [`RegistryError`] when `name` is already bound to a different
/// type, or `T` is already registered under a different name. Re-registering
/// the same pair is a no-op.
pub fn register_named<T: Component + Pod>(name: &str) -> Result<(), RegistryError> {
    register_named_inner::<T>(name, pod_serialize_stub::<T>, pod_deserialize_stub::<T>)
}

/// Registers a stable name for `T` with caller-supplied serializers.
///
/// For component types that are not plain bytes. The deserializer must fully
/// initialize the element slot it is handed.
///
/// ## Errors
/// Same conflict rules as [`register_named`].
pub fn register_named_with<T: Component>(
    name: &str,
    ser: SerializeFn,
    deser: DeserializeFn,
) -> Result<(), RegistryError> {
    register_named_inner::<T>(name, ser, deser)
}

/// Returns the component ID registered under `name`, if any.
pub fn component_id_by_name(name: &str) -> Option<ComponentID> {
    let reg = registry().read().expect("component registry poisoned");
    reg.ids_by_name.get(name).copied()
}

/// Returns the stable name registered for `id`, if any.
pub fn component_name(id: ComponentID) -> Option<String> {
    let reg = registry().read().expect("component registry poisoned");
    reg.names_by_id.get(&id).cloned()
}

/// Returns the recorded metadata for `id`, if the ID has been assigned.
pub fn component_info(id: ComponentID) -> Option<ComponentInfo> {
    let reg = registry().read().expect("component registry poisoned");
    reg.infos.get(id as usize).copied()
}

/// A list of component types identified by their dense IDs.
///
/// Implemented for tuples of up to eight components and for the empty tuple;
/// used both for bundles and for query include/exclude terms.
pub trait ComponentIdList {
    /// The component IDs of the list, in declaration order.
    fn component_ids() -> Vec<ComponentID>;
}

impl ComponentIdList for () {
    fn component_ids() -> Vec<ComponentID> {
        Vec::new()
    }
}

/// A tuple of component values that can be written into an archetype row or
/// recorded into a command buffer.
///
/// The declaration order of the tuple is observable: on-add hooks fire in
/// that order.
pub trait ComponentBundle: ComponentIdList {
    /// Pushes each component value into its column of `arch`.
    ///
    /// The archetype must contain a column for every component of the bundle
    /// and must have capacity for one more row in each.
    fn write_columns(self, arch: &mut Archetype);

    /// Records each component value as a create-with sub-entry.
    fn record(self, buf: &mut CommandBuffer);
}

macro_rules! impl_component_bundle {
    ($(($T:ident, $idx:tt)),+) => {
        impl<$($T: Component),+> ComponentIdList for ($($T,)+) {
            fn component_ids() -> Vec<ComponentID> {
                vec![$(component_id_of::<$T>()),+]
            }
        }

        impl<$($T: Component),+> ComponentBundle for ($($T,)+) {
            fn write_columns(self, arch: &mut Archetype) {
                $(
                    {
                        let cid = component_id_of::<$T>();
                        let col = arch
                            .find_column_mut(cid)
                            .expect("bundle component missing from archetype");
                        unsafe { col.push_value(self.$idx) };
                    }
                )+
            }

            fn record(self, buf: &mut CommandBuffer) {
                $( buf.push_component::<$T>(self.$idx); )+
            }
        }
    };
}

impl_component_bundle!((A, 0));
impl_component_bundle!((A, 0), (B, 1));
impl_component_bundle!((A, 0), (B, 1), (C, 2));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));
