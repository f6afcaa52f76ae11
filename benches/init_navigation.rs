//! Measure building the navigation state of every layer from terrain
//!
//! World is 10 sectors by 10 sectors
//!

use bevy::prelude::*;
use bevy_flowfield_nav::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Create the terrain before benchmarking, scattered with lakes and ridges
fn prepare_terrain(sector_columns: u32, sector_rows: u32) -> TerrainMap {
	let mut terrain = TerrainMap::new(sector_columns, sector_rows);
	let columns = terrain.get_tile_columns();
	let rows = terrain.get_tile_rows();
	for column in (10..columns - 10).step_by(45) {
		for row in (10..rows - 10).step_by(37) {
			terrain.fill((column, row), (column + 6, row + 4), Tile::flat(-1));
			terrain.fill((column + 12, row), (column + 12, row + 8), Tile::unpathable(0));
		}
	}
	terrain
}

/// Build a [NavigationEngine]
fn init(terrain: &TerrainMap) {
	let _ = NavigationEngine::new(terrain, 1.0, Vec2::ZERO, FieldCacheConfig::default());
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("data_initialisation");
	group.significance_level(0.05).sample_size(10);
	let terrain = prepare_terrain(10, 10);
	group.bench_function("init_navigation", |b| b.iter(|| init(black_box(&terrain))));
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
