//! Parent/child bookkeeping components and operations.
//!
//! The core knows nothing about hierarchies; these are ordinary components
//! maintained by the free functions below, which keep the two sides of the
//! relationship consistent: a child's [`Parent`] always appears in the
//! parent's [`Children`] list and vice versa.

use crate::engine::entity::{Entity, INVALID_ENTITY};
use crate::engine::world::World;

/// Component linking an entity to its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parent {
    /// The parent entity.
    pub entity: Entity,
}

impl Default for Parent {
    fn default() -> Self {
        Parent { entity: INVALID_ENTITY }
    }
}

/// Component listing an entity's children.
#[derive(Clone, Debug, Default)]
pub struct Children {
    /// Child entities, in attachment order.
    pub entities: Vec<Entity>,
}

/// Makes `child` a child of `parent`.
///
/// If `child` already has a parent it is unlinked from that parent's
/// [`Children`] first. A [`Children`] component is created on `parent` on
/// demand. No-op when either entity is dead.
///
/// ## Panics
/// Panics when `child == parent`.
pub fn set_parent(world: &mut World, child: Entity, parent: Entity) {
    assert_ne!(child, parent, "cannot parent entity to itself");
    if !world.alive(child) || !world.alive(parent) {
        return;
    }

    if let Some(&Parent { entity: old_parent }) = world.try_get::<Parent>(child) {
        if world.alive(old_parent) {
            if let Some(kids) = world.try_get_mut::<Children>(old_parent) {
                kids.entities.retain(|&e| e != child);
            }
        }
    }

    world.add(child, Parent { entity: parent });

    if !world.has::<Children>(parent) {
        world.add(parent, Children::default());
    }
    world
        .get_mut::<Children>(parent)
        .entities
        .push(child);
}

/// Unlinks `child` from its parent.
///
/// Removes the [`Parent`] component and the entry in the parent's
/// [`Children`] list. No-op when `child` is dead or has no parent.
pub fn remove_parent(world: &mut World, child: Entity) {
    if !world.alive(child) {
        return;
    }
    let Some(&Parent { entity: parent }) = world.try_get::<Parent>(child) else {
        return;
    };

    if world.alive(parent) {
        if let Some(kids) = world.try_get_mut::<Children>(parent) {
            kids.entities.retain(|&e| e != child);
        }
    }
    world.remove::<Parent>(child);
}

/// Destroys `root` and every descendant.
///
/// The root is unlinked from its parent first, so no dead handle lingers in
/// a surviving [`Children`] list. Descendants are collected breadth-first
/// and destroyed leaves-first.
pub fn destroy_recursive(world: &mut World, root: Entity) {
    if !world.alive(root) {
        return;
    }
    remove_parent(world, root);

    let mut to_destroy = vec![root];
    let mut cursor = 0;
    while cursor < to_destroy.len() {
        let e = to_destroy[cursor];
        cursor += 1;
        if let Some(kids) = world.try_get::<Children>(e) {
            for &child in &kids.entities {
                if world.alive(child) {
                    to_destroy.push(child);
                }
            }
        }
    }

    for &e in to_destroy.iter().rev() {
        world.destroy(e);
    }
}
