//! Local/world transform components and hierarchy propagation.

use std::collections::VecDeque;

use bytemuck::{Pod, Zeroable};

use crate::builtin::hierarchy::{Children, Parent};
use crate::engine::entity::Entity;
use crate::engine::world::World;
use crate::math::{Mat4, Quat, Vec3};

/// An entity's transform relative to its parent.
///
/// Stored as position, rotation, and scale; composition into a matrix
/// happens during propagation. For an entity with no parent this is the
/// world transform.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LocalTransform {
    /// Position relative to the parent.
    pub position: Vec3,
    /// Rotation relative to the parent.
    pub rotation: Quat,
    /// Scale relative to the parent.
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        LocalTransform {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// An entity's absolute transform in world space.
///
/// Written by [`propagate_transforms`]; read by rendering and physics.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Default, Pod, Zeroable)]
pub struct WorldTransform {
    /// The composed world-space matrix.
    pub matrix: Mat4,
}

/// Recomputes every [`WorldTransform`] from the transform hierarchy.
///
/// Breadth-first from the roots (entities with transforms but no
/// [`Parent`]): a root's world matrix is its composed local transform, a
/// child's is `parent_world * compose(local)`. Entities missing any of the
/// involved components are skipped.
pub fn propagate_transforms(world: &mut World) {
    let mut queue: VecDeque<Entity> = VecDeque::new();

    world.each_without::<(LocalTransform, WorldTransform), (Parent,), _>(|e, (local, wt)| {
        wt.matrix = Mat4::compose(local.position, local.rotation, local.scale);
        if let Some(children) = world.try_get::<Children>(e) {
            queue.extend(children.entities.iter().copied());
        }
    });

    while let Some(e) = queue.pop_front() {
        let Some(&Parent { entity: parent }) = world.try_get::<Parent>(e) else {
            continue;
        };
        let Some(parent_matrix) = world.try_get::<WorldTransform>(parent).map(|wt| wt.matrix)
        else {
            continue;
        };
        let Some(local) = world.try_get::<LocalTransform>(e).copied() else {
            continue;
        };

        let local_matrix = Mat4::compose(local.position, local.rotation, local.scale);
        if let Some(wt) = world.try_get_mut::<WorldTransform>(e) {
            wt.matrix = Mat4::multiply(&parent_matrix, &local_matrix);
        }

        if let Some(children) = world.try_get::<Children>(e) {
            queue.extend(children.entities.iter().copied());
        }
    }
}
