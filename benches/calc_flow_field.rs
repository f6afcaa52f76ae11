//! Measure building the flow fields of a single sector, towards a tile, a
//! portal and the enemies scattered around it
//!

use bevy::prelude::*;
use bevy_flowfield_nav::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Create the layer of a 3x3 sector map with a wall across the middle sector
fn prepare_layer() -> LayerSectors {
	let mut terrain = TerrainMap::new(3, 3);
	terrain.fill((40, 36), (40, 60), Tile::unpathable(0));
	let map_dimensions = MapDimensions::new(3, 3, 1.0, Vec2::ZERO);
	let mut layer_sectors = LayerSectors::new(NavLayer::Ground1x1, &terrain, map_dimensions);
	let mut field_cache = FieldCache::new(FieldCacheConfig::default());
	layer_sectors.rebuild(&mut field_cache);
	layer_sectors
}

/// Build a field towards a cell in the middle sector
fn calc_tile(layer_sectors: &LayerSectors, diplomacy: &Diplomacy) {
	let sector = layer_sectors.get_sector(&SectorID::new(1, 1));
	let _ = build_tile_flow_field(sector, FieldCell::new(60, 10), None, diplomacy);
}

/// Build a field towards the first portal of the middle sector
fn calc_portal(layer_sectors: &LayerSectors, diplomacy: &Diplomacy) {
	let sector_id = SectorID::new(1, 1);
	let portal = layer_sectors.get_portal(&sector_id, 0);
	let seeds = portal.get_cells();
	let _ = build_portal_flow_field(layer_sectors, sector_id, portal.get_side(), &seeds, None, diplomacy);
}

/// Build the oversized field leading towards enemies around the middle sector
fn calc_seek(input: &SeekFieldInput) {
	let _ = input.compute();
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(100);
	let layer_sectors = prepare_layer();
	let diplomacy = Diplomacy::default();
	let sector_id = SectorID::new(1, 1);
	let input = SeekFieldInput::new(
		FlowFieldID::new(NavLayer::Ground1x1, sector_id, None, FieldTargetKey::Enemies { faction: 0 }),
		snapshot_seek_costs(&layer_sectors, sector_id, None, &diplomacy),
		get_seek_seeds(sector_id, &[(40, 40), (150, 90), (100, 150)]),
	);
	group.bench_function("calc_flow_tile", |b| {
		b.iter(|| calc_tile(black_box(&layer_sectors), black_box(&diplomacy)))
	});
	group.bench_function("calc_flow_portal", |b| {
		b.iter(|| calc_portal(black_box(&layer_sectors), black_box(&diplomacy)))
	});
	group.bench_function("calc_flow_seek", |b| b.iter(|| calc_seek(black_box(&input))));
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
