//! The world: owner of every archetype, entity slot, resource, hook list,
//! and the deferred command log.
//!
//! ## Responsibilities
//! - Creating and destroying entities.
//! - Structural migration: moving an entity's row between archetypes when a
//!   component is added or removed, with an edge cache amortizing the
//!   destination lookup.
//! - Query iteration over cached archetype lists.
//! - Global per-type resources and on-add / on-remove observers.
//! - An in-place permutation sort of one component column and all of its
//!   sibling columns.
//!
//! ## Concurrency model
//! A world is single-threaded and non-reentrant; every operation is
//! synchronous. Callers may own many independent worlds, one per thread.
//! The component registry is process-wide, so worlds agree on IDs.
//!
//! ## Iteration guard
//! An `iterating` counter is incremented on entry to every `each` variant
//! and decremented on every exit path. Structural operations assert that it
//! is zero. The `&mut self` receivers already make the violation
//! unrepresentable from safe code; the counter backs the same rule on the
//! type-erased paths and documents the contract. The intended pattern during
//! iteration is to record into [`deferred`](World::deferred) and flush once
//! the iterator has returned. Nested `each` calls are permitted.
//!
//! ## Reference validity
//! A component reference obtained from `get` or an `each` callback is valid
//! only until the next structural change on the world; growth reallocates
//! column storage. The API enforces this with borrowing where it can and by
//! documented discipline on the query path.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::archetype::{Archetype, TypeSet};
use crate::engine::commands::CommandBuffer;
use crate::engine::component::{
    component_id_of, Component, ComponentBundle, ComponentIdList, MoveFn,
};
use crate::engine::entity::{Entity, EntityRecord, EntityTable, INVALID_ENTITY};
use crate::engine::query::{QueryCache, QueryTuple};
use crate::engine::types::{ArchetypeID, ComponentID, ComponentMask};

type HookFn = dyn Fn(&mut World, Entity, *mut u8);

/// One component value plus its column, passed through type-erased creation.
pub(crate) struct RawComponent {
    pub cid: ComponentID,
    pub data: *mut u8,
}

struct ErasedResource {
    data: *mut u8,
    drop_fn: unsafe fn(*mut u8),
}

impl Drop for ErasedResource {
    fn drop(&mut self) {
        unsafe { (self.drop_fn)(self.data) };
    }
}

unsafe fn drop_resource<T>(p: *mut u8) {
    drop(unsafe { Box::from_raw(p as *mut T) });
}

struct IterGuard<'a>(&'a Cell<u32>);

impl<'a> IterGuard<'a> {
    fn enter(counter: &'a Cell<u32>) -> Self {
        counter.set(counter.get() + 1);
        IterGuard(counter)
    }
}

impl Drop for IterGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// The central container of the entity-component-system.
///
/// Owns all storage; see the module documentation for the concurrency and
/// reference-validity contracts.
pub struct World {
    pub(crate) entities: EntityTable,
    pub(crate) archetypes: Vec<Archetype>,
    pub(crate) archetype_ids: HashMap<TypeSet, ArchetypeID>,
    pub(crate) archetype_generation: u64,
    resources: HashMap<ComponentID, ErasedResource>,
    on_add_hooks: HashMap<ComponentID, Vec<Rc<HookFn>>>,
    on_remove_hooks: HashMap<ComponentID, Vec<Rc<HookFn>>>,
    deferred: RefCell<CommandBuffer>,
    query_cache: RefCell<QueryCache>,
    iterating: Cell<u32>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty world.
    pub fn new() -> Self {
        World {
            entities: EntityTable::new(),
            archetypes: Vec::new(),
            archetype_ids: HashMap::new(),
            archetype_generation: 0,
            resources: HashMap::new(),
            on_add_hooks: HashMap::new(),
            on_remove_hooks: HashMap::new(),
            deferred: RefCell::new(CommandBuffer::new()),
            query_cache: RefCell::new(QueryCache::new()),
            iterating: Cell::new(0),
        }
    }

    #[inline]
    pub(crate) fn assert_structural(&self) {
        assert_eq!(self.iterating.get(), 0, "structural change during iteration");
    }

    // -- Entity creation --

    /// Creates a new entity with no components.
    ///
    /// ## Panics
    /// Panics if called during iteration.
    pub fn create(&mut self) -> Entity {
        self.assert_structural();
        let e = self.entities.allocate();
        let aid = self.get_or_create_archetype(TypeSet::default());
        let arch = &mut self.archetypes[aid as usize];
        let row = arch.count();
        arch.push_entity(e);
        *self.entities.record_mut(e.index) = EntityRecord { archetype: Some(aid), row };
        e
    }

    /// Creates a new entity with the given component values.
    ///
    /// The entity is placed directly into the archetype matching the
    /// bundle's type set; on-add hooks fire after the record is installed,
    /// in bundle declaration order, so `get` works inside a hook.
    ///
    /// ## Panics
    /// Panics if called during iteration.
    pub fn create_with<B: ComponentBundle>(&mut self, bundle: B) -> Entity {
        self.assert_structural();
        let ids = B::component_ids();
        let aid = self.get_or_create_archetype(TypeSet::new(ids.clone()));
        let e = self.entities.allocate();

        let arch = &mut self.archetypes[aid as usize];
        let row = arch.count();
        arch.push_entity(e);
        bundle.write_columns(arch);
        arch.assert_parity();

        *self.entities.record_mut(e.index) = EntityRecord { archetype: Some(aid), row };
        for cid in ids {
            self.fire_on_add(cid, e);
        }
        e
    }

    // -- Entity destruction --

    /// Destroys an entity and releases its components.
    ///
    /// On-remove hooks fire for every component before the data is
    /// destroyed. Destroying a dead entity is a no-op. The freed index is
    /// recycled with its generation bumped, so outstanding handles go stale.
    ///
    /// ## Panics
    /// Panics if called during iteration.
    pub fn destroy(&mut self, e: Entity) {
        self.assert_structural();
        if !self.alive(e) {
            return;
        }

        let aid = self.entities.record(e.index).archetype.expect("live entity without archetype");
        let cids: Vec<ComponentID> = self.archetypes[aid as usize].type_set().ids().to_vec();
        for cid in cids {
            self.fire_on_remove(cid, e);
        }
        // A hook may have destroyed or migrated the entity itself.
        if !self.alive(e) {
            return;
        }
        let rec = *self.entities.record(e.index);
        let aid = rec.archetype.expect("live entity without archetype");
        let row = rec.row;
        let swapped = self.archetypes[aid as usize].swap_remove(row);
        if swapped != INVALID_ENTITY {
            self.entities.record_mut(swapped.index).row = row;
        }
        *self.entities.record_mut(e.index) = EntityRecord::default();
        self.entities.release(e.index);
    }

    /// Destroys every entity that has component `T`.
    ///
    /// Returns the number of entities destroyed. Rows are destroyed
    /// back-to-front within each matching archetype, so swap-remove never
    /// moves a row that has not been visited yet.
    ///
    /// ## Panics
    /// Panics if called during iteration.
    pub fn destroy_all<T: Component>(&mut self) -> usize {
        self.assert_structural();
        let cid = component_id_of::<T>();
        let matches: Vec<ArchetypeID> = (0..self.archetypes.len() as ArchetypeID)
            .filter(|&aid| self.archetypes[aid as usize].has_component(cid))
            .collect();

        let mut destroyed = 0;
        for aid in matches {
            while self.archetypes[aid as usize].count() > 0 {
                let row = self.archetypes[aid as usize].count() - 1;
                let e = self.archetypes[aid as usize].entity_at(row);

                let cids: Vec<ComponentID> =
                    self.archetypes[aid as usize].type_set().ids().to_vec();
                for hook_cid in cids {
                    self.fire_on_remove(hook_cid, e);
                }
                if !self.alive(e) {
                    destroyed += 1;
                    continue;
                }

                let rec = *self.entities.record(e.index);
                let cur = rec.archetype.expect("live entity without archetype");
                let swapped = self.archetypes[cur as usize].swap_remove(rec.row);
                if swapped != INVALID_ENTITY {
                    self.entities.record_mut(swapped.index).row = rec.row;
                }
                *self.entities.record_mut(e.index) = EntityRecord::default();
                self.entities.release(e.index);
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Returns `true` if `e` refers to a live entity.
    pub fn alive(&self, e: Entity) -> bool {
        self.entities.alive(e)
    }

    // -- Utility queries --

    /// Total number of live entities.
    pub fn len(&self) -> usize {
        self.archetypes.iter().map(|a| a.count()).sum()
    }

    /// Returns `true` when no entities are alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entities that have every component of `Q`.
    pub fn count<Q: ComponentIdList>(&self) -> usize {
        let include = ComponentMask::from_ids(&Q::component_ids());
        self.archetypes
            .iter()
            .filter(|a| a.mask().contains_all(&include))
            .map(|a| a.count())
            .sum()
    }

    /// Invokes `f` on the single entity matching `Q`.
    ///
    /// ## Panics
    /// Panics when zero or more than one entity matches.
    pub fn single<'w, Q: QueryTuple, F>(&'w self, mut f: F)
    where
        F: FnMut(Entity, Q::Refs<'w>),
    {
        let mut found = 0usize;
        self.each::<Q, _>(|e, refs| {
            found += 1;
            assert!(found <= 1, "single matched more than one entity");
            f(e, refs);
        });
        assert_eq!(found, 1, "single matched zero entities");
    }

    // -- Deferred commands --

    /// The world-owned command buffer for deferred structural changes.
    ///
    /// Record into it during iteration, then call
    /// [`flush_deferred`](World::flush_deferred) once iteration returns.
    pub fn deferred(&self) -> std::cell::RefMut<'_, CommandBuffer> {
        self.deferred.borrow_mut()
    }

    /// Executes all queued deferred commands.
    ///
    /// Commands recorded re-entrantly while flushing (for example from a
    /// hook) land in a fresh buffer and are not executed by this call.
    ///
    /// ## Panics
    /// Panics if called during iteration.
    pub fn flush_deferred(&mut self) {
        self.assert_structural();
        let mut buf = {
            let mut deferred = self.deferred.borrow_mut();
            std::mem::take(&mut *deferred)
        };
        buf.flush(self);
    }

    // -- Resources --

    /// Creates or replaces the global resource of type `T`.
    ///
    /// Resources are unique per type; they share the component ID numbering
    /// but live in a separate namespace from entity components.
    pub fn set_resource<T: Component>(&mut self, value: T) {
        let cid = component_id_of::<T>();
        let data = Box::into_raw(Box::new(value)) as *mut u8;
        self.resources.insert(cid, ErasedResource { data, drop_fn: drop_resource::<T> });
    }

    /// Returns the resource of type `T`.
    ///
    /// ## Panics
    /// Panics when the resource does not exist.
    pub fn resource<T: Component>(&self) -> &T {
        self.try_resource::<T>().expect("resource not found")
    }

    /// Returns the resource of type `T` mutably.
    ///
    /// ## Panics
    /// Panics when the resource does not exist.
    pub fn resource_mut<T: Component>(&mut self) -> &mut T {
        self.try_resource_mut::<T>().expect("resource not found")
    }

    /// Returns the resource of type `T`, if present.
    pub fn try_resource<T: Component>(&self) -> Option<&T> {
        self.resources
            .get(&component_id_of::<T>())
            .map(|r| unsafe { &*(r.data as *const T) })
    }

    /// Returns the resource of type `T` mutably, if present.
    pub fn try_resource_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&component_id_of::<T>())
            .map(|r| unsafe { &mut *(r.data as *mut T) })
    }

    /// Returns `true` if a resource of type `T` exists.
    pub fn has_resource<T: Component>(&self) -> bool {
        self.resources.contains_key(&component_id_of::<T>())
    }

    /// Removes and drops the resource of type `T`, if present.
    pub fn remove_resource<T: Component>(&mut self) {
        self.resources.remove(&component_id_of::<T>());
    }

    // -- Observers --

    /// Registers a callback fired whenever component `T` is added.
    ///
    /// The hook observes a fully materialized entity: the record is updated
    /// before the hook runs, so `get` works inside it. Hooks run in
    /// registration order and may structurally change entities other than
    /// the one they were invoked for.
    pub fn on_add<T: Component>(&mut self, f: impl Fn(&mut World, Entity, &mut T) + 'static) {
        let cid = component_id_of::<T>();
        self.on_add_hooks.entry(cid).or_default().push(Rc::new(
            move |world, e, ptr| f(world, e, unsafe { &mut *(ptr as *mut T) }),
        ));
    }

    /// Registers a callback fired whenever component `T` is removed.
    ///
    /// The hook runs before the component data is destroyed; the reference
    /// is valid for the duration of the callback.
    pub fn on_remove<T: Component>(&mut self, f: impl Fn(&mut World, Entity, &mut T) + 'static) {
        let cid = component_id_of::<T>();
        self.on_remove_hooks.entry(cid).or_default().push(Rc::new(
            move |world, e, ptr| f(world, e, unsafe { &mut *(ptr as *mut T) }),
        ));
    }

    pub(crate) fn fire_on_add(&mut self, cid: ComponentID, e: Entity) {
        let hooks = match self.on_add_hooks.get(&cid) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return,
        };
        for hook in hooks {
            let Some(ptr) = self.component_ptr(cid, e) else { return };
            hook(self, e, ptr);
        }
    }

    pub(crate) fn fire_on_remove(&mut self, cid: ComponentID, e: Entity) {
        let hooks = match self.on_remove_hooks.get(&cid) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return,
        };
        for hook in hooks {
            let Some(ptr) = self.component_ptr(cid, e) else { return };
            hook(self, e, ptr);
        }
    }

    /// Pointer to `e`'s value of component `cid`, resolved fresh.
    fn component_ptr(&self, cid: ComponentID, e: Entity) -> Option<*mut u8> {
        if !self.alive(e) {
            return None;
        }
        let rec = self.entities.record(e.index);
        let arch = &self.archetypes[rec.archetype? as usize];
        let col = arch.find_column(cid)?;
        Some(unsafe { col.get(rec.row) })
    }

    // -- Component access --

    /// Returns `true` if `e` is alive and has component `T`.
    pub fn has<T: Component>(&self, e: Entity) -> bool {
        if !self.alive(e) {
            return false;
        }
        let rec = self.entities.record(e.index);
        self.archetypes[rec.archetype.expect("live entity without archetype") as usize]
            .has_component(component_id_of::<T>())
    }

    /// Returns a reference to `e`'s component `T`.
    ///
    /// ## Panics
    /// Panics when `e` is dead or does not have `T`.
    pub fn get<T: Component>(&self, e: Entity) -> &T {
        assert!(self.alive(e), "get on dead entity");
        let ptr = self
            .component_ptr(component_id_of::<T>(), e)
            .expect("get on entity missing component");
        unsafe { &*(ptr as *const T) }
    }

    /// Returns a mutable reference to `e`'s component `T`.
    ///
    /// ## Panics
    /// Panics when `e` is dead or does not have `T`.
    pub fn get_mut<T: Component>(&mut self, e: Entity) -> &mut T {
        assert!(self.alive(e), "get on dead entity");
        let ptr = self
            .component_ptr(component_id_of::<T>(), e)
            .expect("get on entity missing component");
        unsafe { &mut *(ptr as *mut T) }
    }

    /// Returns a reference to `e`'s component `T`, if present.
    pub fn try_get<T: Component>(&self, e: Entity) -> Option<&T> {
        let ptr = self.component_ptr(component_id_of::<T>(), e)?;
        Some(unsafe { &*(ptr as *const T) })
    }

    /// Returns a mutable reference to `e`'s component `T`, if present.
    pub fn try_get_mut<T: Component>(&mut self, e: Entity) -> Option<&mut T> {
        let ptr = self.component_ptr(component_id_of::<T>(), e)?;
        Some(unsafe { &mut *(ptr as *mut T) })
    }

    // -- Add / remove (archetype migration) --

    /// Adds or assigns component `value` on `e`.
    ///
    /// When `e` already has `T`, the existing value is assigned over; no
    /// migration happens and no on-add hook fires. Otherwise the entity
    /// migrates along the cached add edge to the archetype including `T`,
    /// the value is pushed, and on-add fires. No-op on a dead entity.
    ///
    /// ## Panics
    /// Panics if called during iteration.
    pub fn add<T: Component>(&mut self, e: Entity, value: T) {
        self.assert_structural();
        if !self.alive(e) {
            return;
        }
        let cid = component_id_of::<T>();
        let rec = *self.entities.record(e.index);
        let old = rec.archetype.expect("live entity without archetype");

        if self.archetypes[old as usize].has_component(cid) {
            let col = self.archetypes[old as usize]
                .find_column_mut(cid)
                .expect("mask and columns out of sync");
            unsafe { *(col.get(rec.row) as *mut T) = value };
            return;
        }

        let new = self.find_add_target(old, cid);
        self.migrate_entity(e, old, new, rec.row, None);

        let arch = &mut self.archetypes[new as usize];
        let col = arch.find_column_mut(cid).expect("add target missing new column");
        unsafe { col.push_value(value) };
        arch.assert_parity();

        self.fire_on_add(cid, e);
    }

    /// Removes component `T` from `e`.
    ///
    /// The on-remove hook fires before the data is destroyed, then the
    /// entity migrates along the cached remove edge. Removing an absent
    /// component or from a dead entity is a no-op. An entity whose last
    /// component is removed stays alive in the empty archetype.
    ///
    /// ## Panics
    /// Panics if called during iteration.
    pub fn remove<T: Component>(&mut self, e: Entity) {
        self.assert_structural();
        self.remove_raw(e, component_id_of::<T>());
    }

    // -- Type-erased structural operations (command flush) --

    /// Type-erased add. Returns `true` when the payload at `data` was
    /// consumed (moved into the world), `false` when it was left untouched.
    ///
    /// Either outcome is total: the payload is never partially consumed.
    pub(crate) fn add_raw(
        &mut self,
        e: Entity,
        cid: ComponentID,
        data: *mut u8,
        move_fn: MoveFn,
    ) -> bool {
        self.assert_structural();
        if !self.alive(e) {
            return false;
        }
        let rec = *self.entities.record(e.index);
        let old = rec.archetype.expect("live entity without archetype");

        if self.archetypes[old as usize].has_component(cid) {
            let col = self.archetypes[old as usize]
                .find_column_mut(cid)
                .expect("mask and columns out of sync");
            unsafe {
                let slot = col.get(rec.row);
                (col.ops.drop_fn)(slot);
                move_fn(slot, data);
            }
            return true;
        }

        let new = self.find_add_target(old, cid);
        self.migrate_entity(e, old, new, rec.row, None);

        let arch = &mut self.archetypes[new as usize];
        let col = arch.find_column_mut(cid).expect("add target missing new column");
        unsafe { col.push_raw(data) };
        arch.assert_parity();

        self.fire_on_add(cid, e);
        true
    }

    /// Type-erased remove; silent no-op on dead entities and absent
    /// components.
    pub(crate) fn remove_raw(&mut self, e: Entity, cid: ComponentID) {
        self.assert_structural();
        if !self.alive(e) {
            return;
        }
        let rec = *self.entities.record(e.index);
        let old = rec.archetype.expect("live entity without archetype");
        if !self.archetypes[old as usize].has_component(cid) {
            return;
        }

        self.fire_on_remove(cid, e);
        // A hook may have destroyed, migrated, or already stripped the
        // component; re-validate before touching storage.
        if !self.alive(e) {
            return;
        }
        let rec = *self.entities.record(e.index);
        let old = rec.archetype.expect("live entity without archetype");
        if !self.archetypes[old as usize].has_component(cid) {
            return;
        }

        let new = self.find_remove_target(old, cid);
        self.migrate_entity(e, old, new, rec.row, Some(cid));
    }

    /// Type-erased creation with component payloads in parallel arrays.
    ///
    /// Every payload is consumed.
    pub(crate) fn create_with_raw(&mut self, parts: &[RawComponent]) -> Entity {
        self.assert_structural();
        let ts = TypeSet::new(parts.iter().map(|p| p.cid).collect());
        let aid = self.get_or_create_archetype(ts);
        let e = self.entities.allocate();

        let arch = &mut self.archetypes[aid as usize];
        let row = arch.count();
        arch.push_entity(e);
        for part in parts {
            let col = arch
                .find_column_mut(part.cid)
                .expect("created archetype missing bundle column");
            unsafe { col.push_raw(part.data) };
        }
        arch.assert_parity();

        *self.entities.record_mut(e.index) = EntityRecord { archetype: Some(aid), row };
        for part in parts {
            self.fire_on_add(part.cid, e);
        }
        e
    }

    // -- Query iteration --

    /// Iterates every entity that has all components of `Q`.
    ///
    /// Within one archetype rows are visited in storage order; across
    /// archetypes the order is unspecified. Storage order is stable between
    /// calls until the next structural change.
    pub fn each<'w, Q: QueryTuple, F>(&'w self, f: F)
    where
        F: FnMut(Entity, Q::Refs<'w>),
    {
        self.each_inner::<Q, F>(&[], f);
    }

    /// Iterates entities that have all of `Q` and none of `X`.
    pub fn each_without<'w, Q: QueryTuple, X: ComponentIdList, F>(&'w self, f: F)
    where
        F: FnMut(Entity, Q::Refs<'w>),
    {
        self.each_inner::<Q, F>(&X::component_ids(), f);
    }

    /// Like [`each`](World::each), omitting the entity argument.
    pub fn each_no_entity<'w, Q: QueryTuple, F>(&'w self, mut f: F)
    where
        F: FnMut(Q::Refs<'w>),
    {
        self.each_inner::<Q, _>(&[], move |_, refs| f(refs));
    }

    /// Like [`each_without`](World::each_without), omitting the entity
    /// argument.
    pub fn each_no_entity_without<'w, Q: QueryTuple, X: ComponentIdList, F>(&'w self, mut f: F)
    where
        F: FnMut(Q::Refs<'w>),
    {
        self.each_inner::<Q, _>(&X::component_ids(), move |_, refs| f(refs));
    }

    fn each_inner<'w, Q: QueryTuple, F>(&'w self, exclude: &[ComponentID], mut f: F)
    where
        F: FnMut(Entity, Q::Refs<'w>),
    {
        let _guard = IterGuard::enter(&self.iterating);
        let include = Q::component_ids();
        let matches: Vec<ArchetypeID> = {
            let mut cache = self.query_cache.borrow_mut();
            cache
                .matching(&include, exclude, self.archetype_generation, &self.archetypes)
                .to_vec()
        };

        for aid in matches {
            let arch = &self.archetypes[aid as usize];
            let n = arch.count();
            if n == 0 {
                continue;
            }
            let ptrs = Q::base_ptrs(arch);
            for row in 0..n {
                let e = arch.entity_at(row);
                f(e, unsafe { Q::row_refs(ptrs, row) });
            }
        }
    }

    // -- Sorting --

    /// Sorts every archetype containing `T` by `cmp` over its `T` column.
    ///
    /// Rearranges the entity row list and every sibling column in place via
    /// a permutation cycle-chase, then rewrites the affected records. The
    /// underlying permutation sort is stable. Handles remain valid; only row
    /// positions change.
    ///
    /// ## Panics
    /// Panics if called during iteration.
    pub fn sort<T: Component, F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.assert_structural();
        let cid = component_id_of::<T>();

        for aid in 0..self.archetypes.len() {
            if !self.archetypes[aid].has_component(cid) {
                continue;
            }
            let n = self.archetypes[aid].count();
            if n <= 1 {
                continue;
            }

            let arch = &mut self.archetypes[aid];
            let base: *const T = arch
                .find_column(cid)
                .expect("mask and columns out of sync")
                .typed_ptr::<T>();

            // Gather permutation: perm[i] is the source row for position i.
            let mut perm: Vec<usize> = (0..n).collect();
            perm.sort_by(|&a, &b| unsafe { cmp(&*base.add(a), &*base.add(b)) });

            // Invert to a scatter permutation: inv[i] is the destination of
            // row i. Cycle-chasing swaps touch each element once per column.
            let mut inv = vec![0usize; n];
            for (i, &src) in perm.iter().enumerate() {
                inv[src] = i;
            }
            for i in 0..n {
                while inv[i] != i {
                    let j = inv[i];
                    arch.entities.swap(i, j);
                    for (_, col) in &mut arch.columns {
                        unsafe { (col.ops.swap_fn)(col.get(i), col.get(j)) };
                    }
                    inv.swap(i, j);
                }
            }

            let entities = &self.archetypes[aid].entities;
            for (row, e) in entities.iter().enumerate() {
                self.entities.records[e.index as usize].row = row;
            }
        }
    }

    // -- Archetype management --

    /// Looks up the archetype for `ts`, creating it on first reference.
    ///
    /// Creation bumps the archetype-set generation, invalidating cached
    /// query results. Archetypes live for the world's lifetime.
    pub(crate) fn get_or_create_archetype(&mut self, ts: TypeSet) -> ArchetypeID {
        if let Some(&aid) = self.archetype_ids.get(&ts) {
            return aid;
        }
        let aid = self.archetypes.len() as ArchetypeID;
        let arch = Archetype::new(ts.clone());
        self.archetype_ids.insert(ts, aid);
        self.archetypes.push(arch);
        self.archetype_generation += 1;
        aid
    }

    fn find_add_target(&mut self, src: ArchetypeID, cid: ComponentID) -> ArchetypeID {
        if let Some(edge) = self.archetypes[src as usize].edge(cid) {
            if let Some(target) = edge.add_target {
                return target;
            }
        }
        let ts = self.archetypes[src as usize].type_set().with(cid);
        let target = self.get_or_create_archetype(ts);
        self.archetypes[src as usize].edge_mut(cid).add_target = Some(target);
        target
    }

    fn find_remove_target(&mut self, src: ArchetypeID, cid: ComponentID) -> ArchetypeID {
        if let Some(edge) = self.archetypes[src as usize].edge(cid) {
            if let Some(target) = edge.remove_target {
                return target;
            }
        }
        let ts = self.archetypes[src as usize].type_set().without(cid);
        let target = self.get_or_create_archetype(ts);
        self.archetypes[src as usize].edge_mut(cid).remove_target = Some(target);
        target
    }

    /// Moves `e`'s row from `old` to `new`, relocating every column present
    /// in both. `drop_only` names a column being removed: it exists only in
    /// the source and its value is destroyed rather than moved.
    ///
    /// The caller pushes any newly added component afterwards.
    fn migrate_entity(
        &mut self,
        e: Entity,
        old: ArchetypeID,
        new: ArchetypeID,
        old_row: usize,
        drop_only: Option<ComponentID>,
    ) {
        let (new_row, swapped) = {
            let (old_arch, new_arch) = self.archetype_pair_mut(old, new);
            new_arch.ensure_capacity(new_arch.count() + 1);

            for (cid, new_col) in new_arch.columns.iter_mut() {
                if let Some(old_col) = old_arch.find_column_mut(*cid) {
                    unsafe { new_col.push_raw(old_col.get(old_row)) };
                }
            }
            new_arch.push_entity(e);
            let new_row = new_arch.count() - 1;
            let swapped = old_arch.swap_remove_migrated(old_row, drop_only);
            (new_row, swapped)
        };

        if swapped != INVALID_ENTITY {
            self.entities.record_mut(swapped.index).row = old_row;
        }
        *self.entities.record_mut(e.index) = EntityRecord { archetype: Some(new), row: new_row };
    }

    /// Mutable access to two distinct archetypes at once.
    fn archetype_pair_mut(
        &mut self,
        a: ArchetypeID,
        b: ArchetypeID,
    ) -> (&mut Archetype, &mut Archetype) {
        assert_ne!(a, b, "source and destination archetype must differ");
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.archetypes.split_at_mut(high as usize);
        let low_ref = &mut head[low as usize];
        let high_ref = &mut tail[0];
        if a < b {
            (low_ref, high_ref)
        } else {
            (high_ref, low_ref)
        }
    }
}
