use archetype_ecs::prelude::*;

pub const SMALL: usize = 10_000;
pub const MEDIUM: usize = 100_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Clone, Copy)]
pub struct Mass(pub f32);

pub fn populate(world: &mut World, n: usize) {
    for i in 0..n {
        let f = i as f32;
        if i % 2 == 0 {
            world.create_with((Position { x: f, y: f }, Velocity { dx: 1.0, dy: 0.5 }));
        } else {
            world.create_with((
                Position { x: f, y: f },
                Velocity { dx: 1.0, dy: 0.5 },
                Mass(f + 1.0),
            ));
        }
    }
}
