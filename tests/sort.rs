use archetype_ecs::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Depth {
    z: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Label(u32);

#[test]
fn sort_orders_rows_by_comparator() {
    let mut world = World::new();
    let values = [3, 1, 4, 1, 5, 9, 2, 6, 5, 3];
    let entities: Vec<Entity> = values
        .iter()
        .map(|&z| world.create_with((Depth { z },)))
        .collect();

    world.sort::<Depth, _>(|a, b| a.z.cmp(&b.z));

    let mut seen = Vec::new();
    world.each::<(Depth,), _>(|_, (depth,)| seen.push(depth.z));
    assert_eq!(seen, vec![1, 1, 2, 3, 3, 4, 5, 5, 6, 9]);

    // Handles still resolve to their original values.
    for (&z, &e) in values.iter().zip(entities.iter()) {
        assert_eq!(world.get::<Depth>(e).z, z);
    }
}

#[test]
fn sort_carries_sibling_columns_along() {
    let mut world = World::new();
    for (i, &z) in [30, 10, 20, 50, 40].iter().enumerate() {
        world.create_with((Depth { z }, Label(i as u32)));
    }

    world.sort::<Depth, _>(|a, b| a.z.cmp(&b.z));

    let mut rows = Vec::new();
    world.each::<(Depth, Label), _>(|_, (depth, label)| rows.push((depth.z, label.0)));
    assert_eq!(rows, vec![(10, 1), (20, 2), (30, 0), (40, 3), (50, 4)]);
}

#[test]
fn sort_spans_every_matching_archetype() {
    let mut world = World::new();
    world.create_with((Depth { z: 2 },));
    world.create_with((Depth { z: 1 },));
    world.create_with((Depth { z: 4 }, Label(0)));
    world.create_with((Depth { z: 3 }, Label(1)));

    world.sort::<Depth, _>(|a, b| a.z.cmp(&b.z));

    // Each archetype is sorted internally.
    let mut plain = Vec::new();
    world.each_without::<(Depth,), (Label,), _>(|_, (depth,)| plain.push(depth.z));
    assert_eq!(plain, vec![1, 2]);

    let mut labeled = Vec::new();
    world.each::<(Depth, Label), _>(|_, (depth, _)| labeled.push(depth.z));
    assert_eq!(labeled, vec![3, 4]);
}

#[test]
fn sort_then_destroy_uses_updated_rows() {
    let mut world = World::new();
    let a = world.create_with((Depth { z: 5 },));
    let b = world.create_with((Depth { z: 1 },));
    let c = world.create_with((Depth { z: 3 },));

    world.sort::<Depth, _>(|x, y| x.z.cmp(&y.z));
    // Rows moved; records must have been rewritten for destroy to hit the
    // right row.
    world.destroy(c);

    assert!(world.alive(a));
    assert!(world.alive(b));
    let mut seen = Vec::new();
    world.each::<(Depth,), _>(|_, (depth,)| seen.push(depth.z));
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 5]);
}

#[test]
fn sort_is_stable_for_equal_keys() {
    let mut world = World::new();
    for i in 0..6 {
        world.create_with((Depth { z: i % 2 }, Label(i as u32)));
    }

    world.sort::<Depth, _>(|a, b| a.z.cmp(&b.z));

    let mut labels = Vec::new();
    world.each::<(Depth, Label), _>(|_, (_, label)| labels.push(label.0));
    // Equal keys keep their relative order.
    assert_eq!(labels, vec![0, 2, 4, 1, 3, 5]);
}

#[test]
fn sort_of_empty_and_singleton_archetypes_is_noop() {
    let mut world = World::new();
    world.sort::<Depth, _>(|a, b| a.z.cmp(&b.z));

    let e = world.create_with((Depth { z: 7 },));
    world.sort::<Depth, _>(|a, b| a.z.cmp(&b.z));
    assert_eq!(world.get::<Depth>(e).z, 7);
}
