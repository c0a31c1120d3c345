//! Simulation benchmarks for sahara_core.
//!
//! Run with: `cargo bench -p sahara_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::collections::HashSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sahara_core::config::GameConfig;
use sahara_core::hex::HexCoord;
use sahara_core::pathfinding::find_path;
use sahara_core::world::GameData;

/// Concentric rings with one gap each, so A* has to wind outward.
fn ringed_obstacles() -> HashSet<HexCoord> {
    let mut obstacles = HashSet::new();
    for radius in [3u32, 6, 9] {
        for hex in HexCoord::ORIGIN.within(radius) {
            if HexCoord::ORIGIN.distance(hex) == radius && hex.q != radius as i32 {
                obstacles.insert(hex);
            }
        }
    }
    obstacles
}

pub fn pathfinding_benchmark(c: &mut Criterion) {
    let obstacles = ringed_obstacles();
    let empty = HashSet::new();

    c.bench_function("find_path_open_20", |b| {
        b.iter(|| find_path(black_box(HexCoord::new(-10, 0)), black_box(HexCoord::new(10, 0)), &empty))
    });

    c.bench_function("find_path_rings", |b| {
        b.iter(|| find_path(black_box(HexCoord::ORIGIN), black_box(HexCoord::new(-12, 4)), &obstacles))
    });
}

pub fn tick_benchmark(c: &mut Criterion) {
    c.bench_function("world_tick_1s", |b| {
        let mut world = GameData::new(GameConfig::default());
        b.iter(|| world.tick(black_box(1.0)))
    });

    c.bench_function("world_tick_day_lump", |b| {
        let mut world = GameData::new(GameConfig::default());
        b.iter(|| world.tick(black_box(86_400.0)))
    });
}

criterion_group!(benches, pathfinding_benchmark, tick_benchmark);
criterion_main!(benches);
