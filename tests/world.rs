use std::cell::Cell;
use std::rc::Rc;

use archetype_ecs::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct A(u32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct B(u32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct C(u32);

#[test]
fn create_and_destroy_roundtrip() {
    let mut world = World::new();
    let e = world.create_with((Position { x: 1.0, y: 2.0 }, Velocity { dx: 0.5, dy: 0.0 }));

    assert!(world.alive(e));
    assert_eq!(*world.get::<Position>(e), Position { x: 1.0, y: 2.0 });
    assert_eq!(*world.get::<Velocity>(e), Velocity { dx: 0.5, dy: 0.0 });
    assert_eq!(world.len(), 1);

    world.destroy(e);
    assert!(!world.alive(e));
    assert_eq!(world.len(), 0);

    // Destroying again is a no-op.
    world.destroy(e);
    assert_eq!(world.len(), 0);
}

#[test]
fn invalid_entity_is_never_alive() {
    let world = World::new();
    assert!(!world.alive(INVALID_ENTITY));
}

#[test]
fn recycled_index_bumps_generation_once() {
    let mut world = World::new();
    let first = world.create_with((A(1),));
    world.destroy(first);

    let second = world.create_with((A(2),));
    assert_eq!(second.index, first.index);
    assert_eq!(second.generation, first.generation + 1);
    assert!(!world.alive(first));
    assert!(world.alive(second));
    assert_eq!(world.get::<A>(second).0, 2);
}

#[test]
fn create_yields_component_less_entity() {
    let mut world = World::new();
    let e = world.create();
    assert!(world.alive(e));
    assert!(!world.has::<A>(e));
    assert_eq!(world.len(), 1);
}

#[test]
fn add_then_get_and_remove_then_missing() {
    let mut world = World::new();
    let e = world.create_with((A(7),));

    world.add(e, B(9));
    assert_eq!(world.get::<A>(e).0, 7);
    assert_eq!(world.get::<B>(e).0, 9);

    world.remove::<B>(e);
    assert!(!world.has::<B>(e));
    assert!(world.has::<A>(e));
    assert_eq!(world.get::<A>(e).0, 7);
}

#[test]
fn add_existing_component_assigns_in_place() {
    let counter = Rc::new(Cell::new(0));
    let mut world = World::new();
    {
        let counter = counter.clone();
        world.on_add::<A>(move |_, _, _| counter.set(counter.get() + 1));
    }

    let e = world.create_with((A(1),));
    assert_eq!(counter.get(), 1);

    world.add(e, A(2));
    assert_eq!(world.get::<A>(e).0, 2);
    // Assignment does not migrate and does not fire on-add again.
    assert_eq!(counter.get(), 1);
}

#[test]
fn removing_last_component_keeps_entity_alive() {
    let mut world = World::new();
    let e = world.create_with((A(3),));
    world.remove::<A>(e);
    assert!(world.alive(e));
    assert!(!world.has::<A>(e));
}

#[test]
fn removing_absent_component_is_noop() {
    let mut world = World::new();
    let e = world.create_with((A(3),));
    world.remove::<B>(e);
    assert!(world.alive(e));
    assert_eq!(world.get::<A>(e).0, 3);
}

#[test]
fn try_get_never_panics() {
    let mut world = World::new();
    let e = world.create_with((A(1),));
    assert!(world.try_get::<B>(e).is_none());
    world.destroy(e);
    assert!(world.try_get::<A>(e).is_none());
}

#[test]
#[should_panic(expected = "get on dead entity")]
fn get_on_dead_entity_panics() {
    let mut world = World::new();
    let e = world.create_with((A(1),));
    world.destroy(e);
    let _ = world.get::<A>(e);
}

#[test]
#[should_panic(expected = "missing component")]
fn get_missing_component_panics() {
    let mut world = World::new();
    let e = world.create_with((A(1),));
    let _ = world.get::<B>(e);
}

#[test]
fn destroy_one_of_three_leaves_the_others() {
    let mut world = World::new();
    let e1 = world.create_with((Position { x: 1.0, y: 0.0 },));
    let e2 = world.create_with((Position { x: 2.0, y: 0.0 },));
    let e3 = world.create_with((Position { x: 3.0, y: 0.0 },));

    world.destroy(e1);

    let mut xs = Vec::new();
    world.each::<(Position,), _>(|_, (pos,)| xs.push(pos.x));
    xs.sort_by(f32::total_cmp);
    assert_eq!(xs, vec![2.0, 3.0]);

    assert!(!world.alive(e1));
    assert!(world.alive(e2));
    assert!(world.alive(e3));
    // The swapped survivor still reads back its own data.
    assert_eq!(world.get::<Position>(e3).x, 3.0);
}

#[test]
fn add_remove_sequence_fires_each_hook_once() {
    let add_a = Rc::new(Cell::new(0));
    let add_b = Rc::new(Cell::new(0));
    let add_c = Rc::new(Cell::new(0));
    let rem_b = Rc::new(Cell::new(0));
    let rem_c = Rc::new(Cell::new(0));

    let mut world = World::new();
    {
        let n = add_a.clone();
        world.on_add::<A>(move |_, _, _| n.set(n.get() + 1));
        let n = add_b.clone();
        world.on_add::<B>(move |_, _, _| n.set(n.get() + 1));
        let n = add_c.clone();
        world.on_add::<C>(move |_, _, _| n.set(n.get() + 1));
        let n = rem_b.clone();
        world.on_remove::<B>(move |_, _, _| n.set(n.get() + 1));
        let n = rem_c.clone();
        world.on_remove::<C>(move |_, _, _| n.set(n.get() + 1));
    }

    let e = world.create_with((A(0),));
    world.add(e, B(0));
    assert!(world.has::<A>(e));
    world.add(e, C(0));
    assert!(world.has::<A>(e));
    world.remove::<C>(e);
    assert!(world.has::<A>(e));
    world.remove::<B>(e);
    assert!(world.has::<A>(e));

    assert!(!world.has::<B>(e));
    assert!(!world.has::<C>(e));
    assert_eq!(add_a.get(), 1);
    assert_eq!(add_b.get(), 1);
    assert_eq!(add_c.get(), 1);
    assert_eq!(rem_b.get(), 1);
    assert_eq!(rem_c.get(), 1);
}

#[test]
fn on_add_hook_sees_materialized_entity() {
    let seen = Rc::new(Cell::new(None));
    let mut world = World::new();
    {
        let seen = seen.clone();
        world.on_add::<Position>(move |world, e, pos| {
            // The record is installed before the hook fires.
            assert!(world.alive(e));
            assert_eq!(world.get::<Position>(e).x, pos.x);
            seen.set(Some(pos.x));
        });
    }

    world.create_with((Position { x: 4.0, y: 0.0 },));
    assert_eq!(seen.get(), Some(4.0));
}

#[test]
fn on_remove_fires_before_data_is_destroyed() {
    let observed = Rc::new(Cell::new(0));
    let mut world = World::new();
    {
        let observed = observed.clone();
        world.on_remove::<A>(move |_, _, a| observed.set(a.0));
    }

    let e = world.create_with((A(42),));
    world.destroy(e);
    assert_eq!(observed.get(), 42);
}

#[test]
fn destroy_all_removes_every_match() {
    let mut world = World::new();
    for i in 0..10 {
        world.create_with((A(i), B(i)));
    }
    for i in 0..5 {
        world.create_with((B(i),));
    }

    let destroyed = world.destroy_all::<A>();
    assert_eq!(destroyed, 10);
    assert_eq!(world.count::<(A,)>(), 0);
    assert_eq!(world.count::<(B,)>(), 5);
}

#[test]
fn dropped_components_run_destructors() {
    struct Tracked(Rc<Cell<u32>>);
    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    let drops = Rc::new(Cell::new(0));
    {
        let mut world = World::new();
        let e1 = world.create_with((Tracked(drops.clone()),));
        let _e2 = world.create_with((Tracked(drops.clone()),));

        world.destroy(e1);
        assert_eq!(drops.get(), 1);
        // e2 dies with the world.
    }
    assert_eq!(drops.get(), 2);
}

#[test]
fn migration_preserves_sibling_values() {
    let mut world = World::new();
    let mut entities = Vec::new();
    for i in 0..32 {
        entities.push(world.create_with((A(i), Position { x: i as f32, y: 0.0 })));
    }

    // Push half of them through two migrations.
    for (i, &e) in entities.iter().enumerate().filter(|(i, _)| i % 2 == 0) {
        world.add(e, B(i as u32 * 10));
        world.remove::<B>(e);
    }

    for (i, &e) in entities.iter().enumerate() {
        assert_eq!(world.get::<A>(e).0, i as u32);
        assert_eq!(world.get::<Position>(e).x, i as f32);
    }
}

#[test]
fn resources_are_singletons_per_type() {
    struct Gravity(f32);

    let mut world = World::new();
    assert!(!world.has_resource::<Gravity>());
    assert!(world.try_resource::<Gravity>().is_none());

    world.set_resource(Gravity(-9.81));
    assert!(world.has_resource::<Gravity>());
    assert_eq!(world.resource::<Gravity>().0, -9.81);

    world.set_resource(Gravity(-1.62));
    assert_eq!(world.resource::<Gravity>().0, -1.62);

    world.resource_mut::<Gravity>().0 = 0.0;
    assert_eq!(world.resource::<Gravity>().0, 0.0);

    world.remove_resource::<Gravity>();
    assert!(!world.has_resource::<Gravity>());
}

#[test]
fn hooks_may_mutate_other_entities() {
    let mut world = World::new();
    let target = world.create_with((A(0),));

    {
        world.on_add::<B>(move |world, _, b| {
            world.get_mut::<A>(target).0 = b.0;
        });
    }

    let other = world.create_with((A(5),));
    world.add(other, B(99));
    assert_eq!(world.get::<A>(target).0, 99);
}
