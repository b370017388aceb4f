use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

use archetype_ecs::prelude::*;

fn iterate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    group.bench_function("integrate_position_100k", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                populate(&mut world, MEDIUM);
                world
            },
            |world| {
                world.each_no_entity::<(Position, Velocity), _>(|(pos, vel)| {
                    pos.x += vel.dx;
                    pos.y += vel.dy;
                });
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("sum_mass_100k", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                populate(&mut world, MEDIUM);
                world
            },
            |world| {
                let mut total = 0.0f32;
                world.each_no_entity::<(Mass,), _>(|(mass,)| total += mass.0);
                black_box(total);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
