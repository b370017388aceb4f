use archetype_ecs::builtin::hierarchy::{
    destroy_recursive, remove_parent, set_parent, Children, Parent,
};
use archetype_ecs::builtin::transform::{propagate_transforms, LocalTransform, WorldTransform};
use archetype_ecs::math::Vec3;
use archetype_ecs::prelude::*;

fn spawn_node(world: &mut World, position: Vec3) -> Entity {
    world.create_with((
        LocalTransform { position, ..LocalTransform::default() },
        WorldTransform::default(),
    ))
}

#[test]
fn three_level_chain_accumulates_translation() {
    let mut world = World::new();
    let root = spawn_node(&mut world, Vec3::new(10.0, 0.0, 0.0));
    let child = spawn_node(&mut world, Vec3::new(0.0, 5.0, 0.0));
    let grandchild = spawn_node(&mut world, Vec3::new(0.0, 0.0, 3.0));

    set_parent(&mut world, child, root);
    set_parent(&mut world, grandchild, child);

    propagate_transforms(&mut world);

    let translation = world.get::<WorldTransform>(grandchild).matrix.translation_of();
    assert_eq!(translation, Vec3::new(10.0, 5.0, 3.0));

    let child_translation = world.get::<WorldTransform>(child).matrix.translation_of();
    assert_eq!(child_translation, Vec3::new(10.0, 5.0, 0.0));
}

#[test]
fn set_parent_links_both_sides() {
    let mut world = World::new();
    let parent = spawn_node(&mut world, Vec3::ZERO);
    let child = spawn_node(&mut world, Vec3::ZERO);

    set_parent(&mut world, child, parent);

    assert_eq!(world.get::<Parent>(child).entity, parent);
    assert_eq!(world.get::<Children>(parent).entities, vec![child]);
}

#[test]
fn reparenting_unlinks_from_the_old_parent() {
    let mut world = World::new();
    let first = spawn_node(&mut world, Vec3::ZERO);
    let second = spawn_node(&mut world, Vec3::ZERO);
    let child = spawn_node(&mut world, Vec3::ZERO);

    set_parent(&mut world, child, first);
    set_parent(&mut world, child, second);

    assert_eq!(world.get::<Parent>(child).entity, second);
    assert!(world.get::<Children>(first).entities.is_empty());
    assert_eq!(world.get::<Children>(second).entities, vec![child]);
}

#[test]
fn remove_parent_clears_both_sides() {
    let mut world = World::new();
    let parent = spawn_node(&mut world, Vec3::ZERO);
    let child = spawn_node(&mut world, Vec3::ZERO);

    set_parent(&mut world, child, parent);
    remove_parent(&mut world, child);

    assert!(!world.has::<Parent>(child));
    assert!(world.get::<Children>(parent).entities.is_empty());
}

#[test]
fn destroy_recursive_takes_the_whole_subtree() {
    let mut world = World::new();
    let root = spawn_node(&mut world, Vec3::ZERO);
    let child = spawn_node(&mut world, Vec3::ZERO);
    let grandchild = spawn_node(&mut world, Vec3::ZERO);
    let bystander = spawn_node(&mut world, Vec3::ZERO);

    set_parent(&mut world, child, root);
    set_parent(&mut world, grandchild, child);

    destroy_recursive(&mut world, root);

    assert!(!world.alive(root));
    assert!(!world.alive(child));
    assert!(!world.alive(grandchild));
    assert!(world.alive(bystander));
}

#[test]
fn destroy_recursive_unlinks_from_surviving_parent() {
    let mut world = World::new();
    let parent = spawn_node(&mut world, Vec3::ZERO);
    let doomed = spawn_node(&mut world, Vec3::ZERO);
    let sibling = spawn_node(&mut world, Vec3::ZERO);

    set_parent(&mut world, doomed, parent);
    set_parent(&mut world, sibling, parent);

    destroy_recursive(&mut world, doomed);

    assert!(world.alive(parent));
    // No dead handle lingers in the parent's child list.
    assert_eq!(world.get::<Children>(parent).entities, vec![sibling]);
}

#[test]
fn roots_compose_their_local_transform_only() {
    let mut world = World::new();
    let root = spawn_node(&mut world, Vec3::new(2.0, 4.0, 6.0));

    propagate_transforms(&mut world);

    let translation = world.get::<WorldTransform>(root).matrix.translation_of();
    assert_eq!(translation, Vec3::new(2.0, 4.0, 6.0));
}

#[test]
fn scaled_parent_scales_child_translation() {
    let mut world = World::new();
    let root = world.create_with((
        LocalTransform {
            position: Vec3::ZERO,
            scale: Vec3::new(2.0, 2.0, 2.0),
            ..LocalTransform::default()
        },
        WorldTransform::default(),
    ));
    let child = spawn_node(&mut world, Vec3::new(1.0, 0.0, 0.0));

    set_parent(&mut world, child, root);
    propagate_transforms(&mut world);

    let translation = world.get::<WorldTransform>(child).matrix.translation_of();
    assert_eq!(translation, Vec3::new(2.0, 0.0, 0.0));
}
