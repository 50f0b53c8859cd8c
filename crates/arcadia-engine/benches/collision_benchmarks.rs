//! Broad- and narrow-phase cost per step.
//!
//! Each iteration runs one PHYSICS sweep (integration plus grid rebuild) and
//! one COLLISION sweep over a field of drifting enemies and bullets, the same
//! pair of systems the scheduler runs every fixed step.
//!
//! Run with: `cargo bench --bench collision_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use arcadia_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Deterministic scatter over a 1200x800 arena without pulling in an RNG.
fn scatter(i: usize) -> (f32, f32) {
    let x = (i * 7919 % 1200) as f32;
    let y = (i * 104_729 % 800) as f32;
    (x, y)
}

/// `count` entities, three enemies for every bullet, each with a small
/// velocity so the grid is rebuilt from moving positions.
fn populate(count: usize) -> WorldState {
    let mut world = WorldState::new(&EngineConfig::default());
    for i in 0..count {
        let (x, y) = scatter(i);
        let (vx, vy) = ((i % 5) as f32 - 2.0, (i % 3) as f32 - 1.0);
        if i % 4 == 0 {
            world.registry.spawn(
                &[Tag::Bullet],
                [
                    Transform::at(x, y).into(),
                    Velocity::new(vx * 60.0, vy * 60.0).into(),
                    Collider::new(3.0, layers::BULLET, layers::ENEMY).into(),
                ],
            );
        } else {
            world.registry.spawn(
                &[Tag::Enemy],
                [
                    Transform::at(x, y).into(),
                    Velocity::new(vx * 10.0, vy * 10.0).into(),
                    Collider::new(12.0, layers::ENEMY, layers::BULLET | layers::PLAYER).into(),
                ],
            );
        }
    }
    world
}

fn step_info() -> StepInfo {
    StepInfo {
        delta: 1.0 / 60.0,
        time: 0.0,
        step: 0,
    }
}

/// Counts pairs instead of applying damage so the population stays fixed.
fn counting_resolver() -> impl CombatResolver {
    let mut pairs = 0u64;
    move |a: EntityId, b: EntityId, _: &mut WorldState| -> Result<(), SystemError> {
        pairs += 1;
        black_box((a, b, pairs));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_grid_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_rebuild");
    for &count in &[100usize, 500, 1000] {
        let mut world = populate(count);
        let mut motion = MotionSystem::new();
        let info = step_info();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                motion.run(&mut world, &info).expect("motion never fails here");
                black_box(world.grid.len())
            });
        });
    }
    group.finish();
}

fn bench_physics_and_collision(c: &mut Criterion) {
    let mut group = c.benchmark_group("physics_and_collision");
    for &count in &[100usize, 500, 1000] {
        let mut world = populate(count);
        let mut motion = MotionSystem::new();
        let mut collision = CollisionSystem::new(counting_resolver(), 0.0);
        let info = step_info();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                motion.run(&mut world, &info).expect("motion never fails here");
                collision.run(&mut world, &info).expect("resolver never fails");
                black_box(collision.last_hits().len())
            });
        });
    }
    group.finish();
}

fn bench_grid_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_query");
    let mut grid = SpatialGrid::new(64.0);
    for i in 0..2000usize {
        let (x, y) = scatter(i);
        grid.insert(EntityId::new(i as u32, 0), x, y);
    }
    let mut out = Vec::new();
    for &radius in &[16.0f32, 64.0, 256.0] {
        group.bench_with_input(BenchmarkId::from_parameter(radius), &radius, |b, &r| {
            b.iter(|| {
                grid.query_into(black_box(600.0), black_box(400.0), r, &mut out);
                black_box(out.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_grid_rebuild, bench_physics_and_collision, bench_grid_query);
criterion_main!(benches);
