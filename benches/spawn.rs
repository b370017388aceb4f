use criterion::*;
use std::hint::black_box;

use archetype_ecs::prelude::*;

mod common;
use common::*;

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for &(label, n) in &[("spawn_10k", SMALL), ("spawn_100k", MEDIUM)] {
        group.bench_function(label, |b| {
            b.iter_batched(
                World::new,
                |mut world| {
                    populate(&mut world, n);
                    black_box(world);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.bench_function("spawn_destroy_churn_10k", |b| {
        b.iter_batched(
            World::new,
            |mut world| {
                let entities: Vec<Entity> = (0..SMALL)
                    .map(|i| {
                        world.create_with((Position { x: i as f32, y: 0.0 },))
                    })
                    .collect();
                for e in entities {
                    world.destroy(e);
                }
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
