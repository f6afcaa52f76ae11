//! Drive the [NavigationEngine] through the situations a game puts it in,
//! open ground, corridors closed off by blockers and walled off regions
//!

use bevy::prelude::*;
use bevy_flowfield_nav::prelude::*;

/// Engine over a flat map with 1 world unit per cell
fn flat_engine(columns: u32, rows: u32) -> NavigationEngine {
	NavigationEngine::new(
		&TerrainMap::new(columns, rows),
		1.0,
		Vec2::ZERO,
		FieldCacheConfig::default(),
	)
}

/// Three sectors in a row joined by a single gap four cells tall in each of
/// the two shared boundaries
fn gapped_corridor() -> NavigationEngine {
	let mut terrain = TerrainMap::new(3, 1);
	for wall_column in [31, 63] {
		terrain.fill((wall_column, 0), (wall_column, 14), Tile::unpathable(0));
		terrain.fill((wall_column, 17), (wall_column, 31), Tile::unpathable(0));
	}
	NavigationEngine::new(&terrain, 1.0, Vec2::ZERO, FieldCacheConfig::default())
}

/// Blocker sitting over the gap between the first and second sectors
fn gap_blocker() -> Footprint {
	Footprint::OrientedBox {
		centre: Vec2::new(64.0, 32.0),
		half_extents: Vec2::new(1.0, 2.0),
		axis: Vec2::X,
	}
}

#[test]
fn open_map_leads_towards_shared_border() {
	let mut engine = flat_engine(2, 2);
	let source = Vec2::new(32.5, 32.5);
	let target = Vec2::new(96.5, 96.5);
	let destination = engine
		.request_path(source, target, NavLayer::Ground1x1)
		.unwrap();
	let source_sector = SectorID::new(0, 0);
	let ids = engine.debug_flow_field_ids(destination, source_sector);
	assert_eq!(1, ids.len());
	let FieldTargetKey::Portal { side, .. } = ids[0].get_target() else {
		panic!("Source sector should be guided by a portal field");
	};
	assert!(*side == Ordinal::East || *side == Ordinal::South);
	let flow_field = engine.debug_flow_field(&ids[0]).unwrap();
	let direction = flow_field.get_direction(FieldCell::new(32, 32));
	assert!(direction == Ordinal::East || direction == Ordinal::South);
	// nothing stands between source and target so the unit heads straight there
	let velocity = engine.desired_velocity(destination, source);
	assert!((velocity - Vec2::new(1.0, 1.0).normalize()).length() < 0.001);
}

#[test]
fn blocked_gap_fails_then_reopens() {
	let mut engine = gapped_corridor();
	let source = Vec2::new(10.5, 10.5);
	let target = Vec2::new(150.5, 50.5);
	assert!(engine.request_path(source, target, NavLayer::Ground1x1).is_some());

	engine.add_blocker(&gap_blocker(), 0);
	engine.update();
	let sector = engine
		.get_layer_sectors(NavLayer::Ground1x1)
		.get_sector(&SectorID::new(1, 0));
	let west = sector
		.get_portals()
		.iter()
		.position(|p| p.get_side() == Ordinal::West)
		.unwrap();
	for edge in sector.get_portals()[west].get_edges().iter() {
		assert_eq!(EdgeState::Blocked, edge.get_state());
	}
	assert!(engine.request_path(source, target, NavLayer::Ground1x1).is_none());

	engine.remove_blocker(&gap_blocker(), 0);
	engine.update();
	let sector = engine
		.get_layer_sectors(NavLayer::Ground1x1)
		.get_sector(&SectorID::new(1, 0));
	for edge in sector.get_portals()[west].get_edges().iter() {
		assert_eq!(EdgeState::Active, edge.get_state());
	}
	assert!(engine.request_path(source, target, NavLayer::Ground1x1).is_some());
}

#[test]
fn blocked_gap_drops_cached_fields_of_route() {
	let mut engine = gapped_corridor();
	let destination = engine
		.request_path(Vec2::new(10.5, 10.5), Vec2::new(150.5, 50.5), NavLayer::Ground1x1)
		.unwrap();
	assert!(!engine.debug_flow_field_ids(destination, SectorID::new(0, 0)).is_empty());
	engine.add_blocker(&gap_blocker(), 0);
	engine.update();
	assert!(engine.debug_flow_field_ids(destination, SectorID::new(0, 0)).is_empty());
	assert!(engine.debug_los_field(destination, SectorID::new(0, 0)).is_none());
}

#[test]
fn walled_off_request_caches_nothing() {
	let mut terrain = TerrainMap::new(2, 1);
	terrain.fill((40, 0), (40, 31), Tile::unpathable(0));
	let mut engine = NavigationEngine::new(&terrain, 1.0, Vec2::ZERO, FieldCacheConfig::default());
	let before = engine.get_cache_stats();
	let result = engine.request_path(Vec2::new(10.5, 10.5), Vec2::new(120.5, 10.5), NavLayer::Ground1x1);
	assert!(result.is_none());
	let after = engine.get_cache_stats();
	assert_eq!(before.flow.get_inserts(), after.flow.get_inserts());
	assert_eq!(before.los.get_inserts(), after.los.get_inserts());
	assert_eq!(before.mapping.get_inserts(), after.mapping.get_inserts());
	assert!(!engine.locations_reachable(Vec2::new(10.5, 10.5), Vec2::new(120.5, 10.5), NavLayer::Ground1x1));
}

#[test]
fn single_sector_map_has_no_portals() {
	let mut engine = flat_engine(1, 1);
	for layer in NavLayer::ALL {
		assert!(engine.debug_portals(layer, SectorID::new(0, 0)).is_empty());
	}
	let destination = engine.request_path(Vec2::new(3.5, 3.5), Vec2::new(60.5, 60.5), NavLayer::Ground1x1);
	assert!(destination.is_some());
}

#[test]
fn following_the_flow_reaches_sight_of_the_target() {
	let mut engine = gapped_corridor();
	let target = Vec2::new(150.5, 50.5);
	let destination = engine
		.request_path(Vec2::new(10.5, 10.5), target, NavLayer::Ground1x1)
		.unwrap();
	let mut cell = (10, 10);
	let mut reached = false;
	for _ in 0..2000 {
		let position = Vec2::new(cell.0 as f32 + 0.5, cell.1 as f32 + 0.5);
		if engine.has_dest_los(destination, position) {
			reached = true;
			break;
		}
		let velocity = engine.desired_velocity(destination, position);
		assert_ne!(Vec2::ZERO, velocity, "stalled at {:?}", cell);
		let step = |v: f32| {
			if v > 0.3 {
				1
			} else if v < -0.3 {
				-1
			} else {
				0
			}
		};
		cell = (cell.0 + step(velocity.x), cell.1 + step(velocity.y));
		assert!(engine.is_pathable(Vec2::new(cell.0 as f32 + 0.5, cell.1 as f32 + 0.5), NavLayer::Ground1x1));
	}
	assert!(reached);
}

#[test]
fn repeat_request_is_served_from_cache() {
	let mut engine = flat_engine(3, 3);
	let source = Vec2::new(5.5, 5.5);
	let target = Vec2::new(180.5, 170.5);
	let first = engine.request_path(source, target, NavLayer::Ground3x3);
	let inserts = engine.get_cache_stats().flow.get_inserts();
	let second = engine.request_path(source, target, NavLayer::Ground3x3);
	assert_eq!(first, second);
	assert_eq!(inserts, engine.get_cache_stats().flow.get_inserts());
}

#[test]
fn evicted_flow_is_rebuilt_on_query() {
	let mut engine = NavigationEngine::new(
		&TerrainMap::new(3, 1),
		1.0,
		Vec2::ZERO,
		FieldCacheConfig::new(64, 1, 64, 64),
	);
	// hides the west of the middle sector from the target
	let wall = Footprint::OrientedBox {
		centre: Vec2::new(100.5, 20.0),
		half_extents: Vec2::new(0.4, 20.0),
		axis: Vec2::X,
	};
	engine.cutout_static_object(&wall);
	let destination = engine
		.request_path(Vec2::new(10.5, 10.5), Vec2::new(170.5, 10.5), NavLayer::Ground1x1)
		.unwrap();
	// the field of the first sector is built last and is the only one kept
	assert_eq!(1, engine.get_cache_stats().flow.get_len());
	let inserts = engine.get_cache_stats().flow.get_inserts();
	let position = Vec2::new(90.5, 10.5);
	assert!(!engine.has_dest_los(destination, position));
	let velocity = engine.desired_velocity(destination, position);
	assert_ne!(Vec2::ZERO, velocity);
	assert_eq!(inserts + 1, engine.get_cache_stats().flow.get_inserts());
}

#[test]
fn partly_blocked_border_reseeds_neighbouring_portal_field() {
	let mut engine = flat_engine(2, 1);
	let source = Vec2::new(10.5, 32.5);
	let target = Vec2::new(100.5, 32.5);
	let west = SectorID::new(0, 0);
	let destination = engine.request_path(source, target, NavLayer::Ground1x1).unwrap();
	let ids = engine.debug_flow_field_ids(destination, west);
	let before = engine.debug_flow_field(&ids[0]).unwrap();
	assert!(is_portal_goal(before.get_field_cell_value(FieldCell::new(63, 5))));
	// the eastern side of the top half of the border fills up
	engine.add_blocker(
		&Footprint::OrientedBox {
			centre: Vec2::new(64.5, 16.0),
			half_extents: Vec2::new(0.4, 16.0),
			axis: Vec2::X,
		},
		0,
	);
	engine.update();
	let again = engine.request_path(source, target, NavLayer::Ground1x1).unwrap();
	assert_eq!(destination, again);
	let ids = engine.debug_flow_field_ids(again, west);
	assert!(!ids.is_empty());
	for id in ids {
		let cached = engine.debug_flow_field(&id).unwrap();
		let fresh = build_flow_field(
			engine.get_layer_sectors(NavLayer::Ground1x1),
			engine.get_diplomacy(),
			&id,
		)
		.unwrap();
		assert_eq!(fresh, cached);
		assert!(!is_portal_goal(cached.get_field_cell_value(FieldCell::new(63, 5))));
		assert!(is_portal_goal(cached.get_field_cell_value(FieldCell::new(63, 40))));
	}
}
