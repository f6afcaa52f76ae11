//! Synthesis of the [FlowField]s the cache stores. Every [FlowFieldID] fully
//! describes its field so a field that was evicted can be rebuilt from the ID
//! alone.
//!
//! A tile field is seeded at the destination cell. When blockers cover the
//! destination the seeds become the closest unblocked cells so that units get
//! as near as they can:
//!
//! ```text
//!  _______________
//! |  |s |s |s |  |
//! |  |s |b |s |  |    b - blocked destination
//! |  |s |s |s |  |    s - seeds
//! ```
//!
//! A portal field is seeded along the portal segment, from the cells on the
//! local island the route approaches on whose mirrored cell in the next sector
//! lies on the island the route continues on.
//!
//! Enemy-seek and entity-surround fields work on an oversized grid of
//! `SEEK_FIELD_SIZE` cells a side centred on the sector so that targets just
//! beyond the sector still pull on it:
//!
//! ```text
//!  ______________________
//! |                      |
//! |     ____________     |
//! |    |            |    |
//! |    |   sector   |    |
//! |    |____________|    |
//! |                      |
//! |______________________|
//!   <-32->          <-32->
//! ```
//!

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::prelude::*;

/// Cells along a side of an enemy-seek or entity-surround integration grid
pub const SEEK_FIELD_SIZE: usize = FIELD_RESOLUTION * 2;
/// Column and row of the sector's top-left cell within the seek grid
pub const SEEK_FIELD_OFFSET: usize = FIELD_RESOLUTION / 2;

/// Cells of a sector which a unit of `attacking_faction` can stand on and
/// which are closest to `target`. The target itself when it is open
pub fn find_open_seed_cells(
	sector: &SectorNav,
	target: FieldCell,
	attacking_faction: Option<u8>,
	diplomacy: &Diplomacy,
) -> Vec<FieldCell> {
	let is_open = |cell: FieldCell| {
		sector.is_passable(cell) && !sector.is_blocked_for(cell, attacking_faction, diplomacy)
	};
	if is_open(target) {
		return vec![target];
	}
	let mut visited = [[false; FIELD_RESOLUTION]; FIELD_RESOLUTION];
	visited[target.get_column()][target.get_row()] = true;
	let mut ring = vec![target];
	while !ring.is_empty() {
		let mut next_ring = Vec::new();
		for cell in ring.iter() {
			for ordinal in Ordinal::FLOW_PRIORITY {
				let Some(neighbour) = cell.get_neighbour(ordinal) else {
					continue;
				};
				let (c, r) = neighbour.get_column_row();
				if !visited[c][r] {
					visited[c][r] = true;
					next_ring.push(neighbour);
				}
			}
		}
		let seeds: Vec<FieldCell> = next_ring.iter().filter(|c| is_open(**c)).copied().collect();
		if !seeds.is_empty() {
			return seeds;
		}
		ring = next_ring;
	}
	trace!("No open cell in the sector of {:?}", target);
	vec![target]
}

/// Integrate the effective cost of a sector from `seeds` and derive its flow
fn integrate_sector(
	sector: &SectorNav,
	seeds: &[FieldCell],
	attacking_faction: Option<u8>,
	diplomacy: &Diplomacy,
) -> FlowField {
	let seeds: Vec<(usize, usize)> = seeds.iter().map(|c| c.get_column_row()).collect();
	let mut integration_field = IntegrationField::default();
	integration_field.calculate_field(&seeds, |c, r| {
		sector.get_effective_cost(FieldCell::new(c, r), attacking_faction, diplomacy)
	});
	let mut flow_field = FlowField::default();
	flow_field.calculate(&integration_field, (0, 0));
	flow_field
}

/// [FlowField] of a sector leading to the `target` cell, or as close to it as
/// blockers allow
pub fn build_tile_flow_field(
	sector: &SectorNav,
	target: FieldCell,
	attacking_faction: Option<u8>,
	diplomacy: &Diplomacy,
) -> FlowField {
	let seeds = find_open_seed_cells(sector, target, attacking_faction, diplomacy);
	integrate_sector(sector, &seeds, attacking_faction, diplomacy)
}

/// Cells of the portal segment `endpoints` on the `side` boundary which lead
/// from local island `port_island` onto `next_island` of the adjoining
/// sector. When no cell qualifies any open cell of the segment is used
#[allow(clippy::too_many_arguments)]
pub fn get_portal_seed_cells(
	layer_sectors: &LayerSectors,
	sector_id: SectorID,
	side: Ordinal,
	endpoints: &[FieldCell; 2],
	port_island: u16,
	next_island: u16,
	attacking_faction: Option<u8>,
	diplomacy: &Diplomacy,
) -> Vec<FieldCell> {
	let sector = layer_sectors.get_sector(&sector_id);
	let cells = endpoints[0].get_cells_between_points(&endpoints[1]);
	let seeds: Vec<FieldCell> = cells
		.iter()
		.filter(|cell| {
			sector.get_local_island(**cell) == port_island
				&& layer_sectors.get_mirrored_local_island(&sector_id, **cell, side) == next_island
		})
		.copied()
		.collect();
	if !seeds.is_empty() {
		return seeds;
	}
	cells
		.into_iter()
		.filter(|cell| sector.is_passable(*cell) && !sector.is_blocked_for(*cell, attacking_faction, diplomacy))
		.collect()
}

/// [FlowField] of a sector leading out through a portal, the portal cells
/// themselves point across the boundary
pub fn build_portal_flow_field(
	layer_sectors: &LayerSectors,
	sector_id: SectorID,
	side: Ordinal,
	seeds: &[FieldCell],
	attacking_faction: Option<u8>,
	diplomacy: &Diplomacy,
) -> FlowField {
	let sector = layer_sectors.get_sector(&sector_id);
	let mut flow_field = integrate_sector(sector, seeds, attacking_faction, diplomacy);
	flow_field.force_portal_goals(seeds, side);
	flow_field
}

/// Rebuild a tile or portal [FlowField] from its ID. Enemy-seek and
/// entity-surround fields depend on entity positions so [None] is returned
pub fn build_flow_field(
	layer_sectors: &LayerSectors,
	diplomacy: &Diplomacy,
	id: &FlowFieldID,
) -> Option<FlowField> {
	let sector_id = id.get_sector();
	let attacking_faction = id.get_attacking_faction();
	match id.get_target() {
		FieldTargetKey::Tile(target) => Some(build_tile_flow_field(
			layer_sectors.get_sector(&sector_id),
			*target,
			attacking_faction,
			diplomacy,
		)),
		FieldTargetKey::Portal {
			side,
			endpoints,
			port_island,
			next_island,
		} => {
			let seeds = get_portal_seed_cells(
				layer_sectors,
				sector_id,
				*side,
				endpoints,
				*port_island,
				*next_island,
				attacking_faction,
				diplomacy,
			);
			Some(build_portal_flow_field(
				layer_sectors,
				sector_id,
				*side,
				&seeds,
				attacking_faction,
				diplomacy,
			))
		}
		FieldTargetKey::Enemies { .. } | FieldTargetKey::Entity { .. } => None,
	}
}

/// Map-wide cell of the top-left corner of the seek grid of a sector
fn get_seek_grid_origin(sector_id: SectorID) -> (i32, i32) {
	(
		sector_id.get_column() as i32 * FIELD_RESOLUTION as i32 - SEEK_FIELD_OFFSET as i32,
		sector_id.get_row() as i32 * FIELD_RESOLUTION as i32 - SEEK_FIELD_OFFSET as i32,
	)
}

/// Owned copy of the effective cost around a sector laid out column by
/// column, cells beyond the map are impassable
pub fn snapshot_seek_costs(
	layer_sectors: &LayerSectors,
	sector_id: SectorID,
	attacking_faction: Option<u8>,
	diplomacy: &Diplomacy,
) -> Vec<u8> {
	let map_dimensions = layer_sectors.get_map_dimensions();
	let origin = get_seek_grid_origin(sector_id);
	let mut costs = vec![COST_IMPASSABLE; SEEK_FIELD_SIZE * SEEK_FIELD_SIZE];
	for column in 0..SEEK_FIELD_SIZE {
		for row in 0..SEEK_FIELD_SIZE {
			let global = (origin.0 + column as i32, origin.1 + row as i32);
			if let Some((s, cell)) = map_dimensions.get_sector_and_field_cell_from_global(global) {
				costs[column * SEEK_FIELD_SIZE + row] = layer_sectors
					.get_sector(&s)
					.get_effective_cost(cell, attacking_faction, diplomacy);
			}
		}
	}
	costs
}

/// Seek grid cells of a set of map-wide cells, dropping any outside the grid
pub fn get_seek_seeds(sector_id: SectorID, globals: &[(i32, i32)]) -> Vec<(usize, usize)> {
	let origin = get_seek_grid_origin(sector_id);
	let mut seeds = Vec::new();
	for global in globals {
		let c = global.0 - origin.0;
		let r = global.1 - origin.1;
		if c >= 0 && r >= 0 && c < SEEK_FIELD_SIZE as i32 && r < SEEK_FIELD_SIZE as i32 {
			let seed = (c as usize, r as usize);
			if !seeds.contains(&seed) {
				seeds.push(seed);
			}
		}
	}
	seeds
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn blocked_destination_seeds_ring() {
		let mut sector = SectorNav::new(CostField::default());
		sector.increment_blocker(FieldCell::new(10, 10), 0);
		let seeds = find_open_seed_cells(&sector, FieldCell::new(10, 10), None, &Diplomacy::default());
		assert_eq!(8, seeds.len());
		assert!(seeds.iter().all(|c| c.get_chebyshev_distance(&FieldCell::new(10, 10)) == 1));
	}
	#[test]
	fn attacker_ignores_enemy_blocker() {
		let mut sector = SectorNav::new(CostField::default());
		sector.increment_blocker(FieldCell::new(10, 10), 1);
		let mut diplomacy = Diplomacy::default();
		diplomacy.set_relation(0, 1, true);
		let seeds = find_open_seed_cells(&sector, FieldCell::new(10, 10), Some(0), &diplomacy);
		assert_eq!(vec![FieldCell::new(10, 10)], seeds);
	}
	#[test]
	fn tile_field_points_at_target() {
		let sector = SectorNav::new(CostField::default());
		let field = build_tile_flow_field(&sector, FieldCell::new(20, 5), None, &Diplomacy::default());
		assert_eq!(Ordinal::East, field.get_direction(FieldCell::new(10, 5)));
		assert_eq!(Ordinal::North, field.get_direction(FieldCell::new(20, 30)));
		assert!(is_goal(field.get_field_cell_value(FieldCell::new(20, 5))));
	}
	#[test]
	fn seek_seeds_clip_to_grid() {
		let sector_id = SectorID::new(1, 1);
		// the seek grid of sector (1, 1) spans global cells 32..160
		let seeds = get_seek_seeds(sector_id, &[(32, 32), (31, 40), (159, 159), (160, 0), (32, 32)]);
		assert_eq!(vec![(0, 0), (127, 127)], seeds);
	}
	#[test]
	fn seek_costs_beyond_map_impassable() {
		let terrain = TerrainMap::new(1, 1);
		let map_dimensions = MapDimensions::new(1, 1, 1.0, Vec2::ZERO);
		let layer_sectors = LayerSectors::new(NavLayer::Air1x1, &terrain, map_dimensions);
		let costs = snapshot_seek_costs(&layer_sectors, SectorID::new(0, 0), None, &Diplomacy::default());
		assert_eq!(COST_IMPASSABLE, costs[0]);
		let inside = SEEK_FIELD_OFFSET * SEEK_FIELD_SIZE + SEEK_FIELD_OFFSET;
		assert_eq!(1, costs[inside]);
	}
}
