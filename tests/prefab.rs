use std::cell::Cell;
use std::rc::Rc;

use archetype_ecs::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Health(u32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Armor(u32);

#[test]
fn instantiate_stamps_the_defaults() {
    let mut world = World::new();
    let prefab = Prefab::new((Position { x: 1.0, y: 2.0 }, Health(100)));

    let a = instantiate(&mut world, &prefab);
    let b = instantiate(&mut world, &prefab);

    assert_eq!(world.count::<(Position, Health)>(), 2);
    assert_eq!(*world.get::<Position>(a), Position { x: 1.0, y: 2.0 });
    assert_eq!(world.get::<Health>(b).0, 100);

    // Instances are independent copies.
    world.get_mut::<Health>(a).0 = 1;
    assert_eq!(world.get::<Health>(b).0, 100);
}

#[test]
fn overrides_replace_defaults() {
    let mut world = World::new();
    let prefab = Prefab::new((Position { x: 0.0, y: 0.0 }, Health(100)));

    let e = instantiate_with(&mut world, &prefab, (Health(25),));

    assert_eq!(world.get::<Health>(e).0, 25);
    assert_eq!(*world.get::<Position>(e), Position { x: 0.0, y: 0.0 });
}

#[test]
fn overrides_may_add_new_components() {
    let mut world = World::new();
    let prefab = Prefab::new((Health(100),));

    let e = instantiate_with(&mut world, &prefab, (Armor(7),));

    assert_eq!(world.get::<Health>(e).0, 100);
    assert_eq!(world.get::<Armor>(e).0, 7);
    assert_eq!(world.count::<(Health, Armor)>(), 1);
}

#[test]
fn prefab_reports_its_components() {
    let prefab = Prefab::new((Position { x: 0.0, y: 0.0 }, Health(1)));
    assert_eq!(prefab.component_count(), 2);
    assert!(prefab.has::<Position>());
    assert!(prefab.has::<Health>());
    assert!(!prefab.has::<Armor>());
}

#[test]
fn instantiate_fires_on_add_per_component() {
    let added = Rc::new(Cell::new(0));
    let mut world = World::new();
    {
        let n = added.clone();
        world.on_add::<Health>(move |_, _, _| n.set(n.get() + 1));
        let n = added.clone();
        world.on_add::<Position>(move |_, _, _| n.set(n.get() + 1));
    }

    let prefab = Prefab::new((Position { x: 0.0, y: 0.0 }, Health(1)));
    instantiate(&mut world, &prefab);
    assert_eq!(added.get(), 2);

    instantiate_with(&mut world, &prefab, (Health(2),));
    assert_eq!(added.get(), 4);
}

#[test]
fn cloned_prefab_is_deep() {
    #[derive(Clone, Debug, PartialEq)]
    struct Name(String);

    let mut world = World::new();
    let original = Prefab::new((Name("goblin".to_string()), Health(10)));
    let copy = original.clone();
    drop(original);

    let e = instantiate(&mut world, &copy);
    assert_eq!(world.get::<Name>(e).0, "goblin");
}

#[test]
fn prefab_drop_releases_owned_values() {
    struct Tracked(Rc<Cell<u32>>);
    impl Clone for Tracked {
        fn clone(&self) -> Self {
            Tracked(self.0.clone())
        }
    }
    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    let drops = Rc::new(Cell::new(0));
    {
        let _prefab = Prefab::new((Tracked(drops.clone()), Health(1)));
    }
    assert_eq!(drops.get(), 1);
}
