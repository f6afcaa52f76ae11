//! Connectivity of the map is summarised with two flavours of island IDs.
//!
//! Global islands label every passable cell of a layer so that two cells
//! share an ID when a unit could walk between them if no blockers existed.
//! Requests between different global islands are rejected straight away.
//!
//! Local islands label the cells of a single sector which can reach each other
//! without leaving it, treating both impassable and blocked cells as walls.
//! They decide which portal edges are active and which side of a portal a
//! route continues on:
//!
//! ```text
//!  _____________________
//! |0 |0 |x |1 |1 |1 |1 |
//! |0 |0 |x |1 |b |b |b |
//! |0 |0 |x |1 |b |2 |2 |
//! |0 |0 |x |1 |b |2 |2 |
//! ```
//!

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::prelude::*;

/// Label every passable cell of the layer with its map-wide island, a flood
/// fill over orthogonal neighbours which ignores blockers. Returns the number
/// of islands found
pub fn calculate_global_islands(layer_sectors: &mut LayerSectors) -> usize {
	let map_dimensions = *layer_sectors.get_map_dimensions();
	for sector_id in map_dimensions.iter_sectors() {
		let sector = layer_sectors.get_sector_mut(&sector_id);
		for column in 0..FIELD_RESOLUTION {
			for row in 0..FIELD_RESOLUTION {
				sector.set_global_island(ISLAND_NONE, FieldCell::new(column, row));
			}
		}
	}
	let mut next_id: u16 = 0;
	let mut queue = VecDeque::new();
	for sector_id in map_dimensions.iter_sectors() {
		for column in 0..FIELD_RESOLUTION {
			for row in 0..FIELD_RESOLUTION {
				let cell = FieldCell::new(column, row);
				let sector = layer_sectors.get_sector(&sector_id);
				if !sector.is_passable(cell) || sector.get_global_island(cell) != ISLAND_NONE {
					continue;
				}
				if next_id == ISLAND_NONE {
					panic!("A layer cannot hold more than {} islands", ISLAND_NONE);
				}
				layer_sectors.get_sector_mut(&sector_id).set_global_island(next_id, cell);
				queue.push_back(map_dimensions.get_global_cell(sector_id, cell));
				while let Some((c, r)) = queue.pop_front() {
					for ordinal in Ordinal::ORTHOGONAL {
						let (dc, dr) = ordinal.get_offset();
						let Some((n_sector, n_cell)) =
							map_dimensions.get_sector_and_field_cell_from_global((c + dc, r + dr))
						else {
							continue;
						};
						let neighbour = layer_sectors.get_sector_mut(&n_sector);
						if neighbour.is_passable(n_cell) && neighbour.get_global_island(n_cell) == ISLAND_NONE {
							neighbour.set_global_island(next_id, n_cell);
							queue.push_back((c + dc, r + dr));
						}
					}
				}
				next_id += 1;
			}
		}
	}
	debug!(
		"{:?} has {} global islands",
		layer_sectors.get_layer(),
		next_id
	);
	next_id as usize
}

/// Label the cells of a sector with their local island, cells which are
/// impassable or blocked get [ISLAND_NONE]. Returns the number of islands
pub fn calculate_local_islands(sector: &mut SectorNav) -> usize {
	let mut islands = [[ISLAND_NONE; FIELD_RESOLUTION]; FIELD_RESOLUTION];
	let mut next_id: u16 = 0;
	let mut queue = VecDeque::new();
	let is_open = |cell: FieldCell| sector.is_passable(cell) && !sector.is_blocked(cell);
	for column in 0..FIELD_RESOLUTION {
		for row in 0..FIELD_RESOLUTION {
			let cell = FieldCell::new(column, row);
			if islands[column][row] != ISLAND_NONE || !is_open(cell) {
				continue;
			}
			islands[column][row] = next_id;
			queue.push_back(cell);
			while let Some(current) = queue.pop_front() {
				for neighbour in current.get_orthogonal_neighbours() {
					let (c, r) = neighbour.get_column_row();
					if islands[c][r] == ISLAND_NONE && is_open(neighbour) {
						islands[c][r] = next_id;
						queue.push_back(neighbour);
					}
				}
			}
			next_id += 1;
		}
	}
	*sector.get_local_islands_mut() = islands;
	next_id as usize
}

/// Find the closest cell to `field_cell` (itself included) which lies on a
/// local island, searching outward ring by ring through any cell
pub fn find_nearest_island_cell(sector: &SectorNav, field_cell: FieldCell) -> Option<FieldCell> {
	if sector.get_local_island(field_cell) != ISLAND_NONE {
		return Some(field_cell);
	}
	let mut visited = [[false; FIELD_RESOLUTION]; FIELD_RESOLUTION];
	let mut queue = VecDeque::new();
	visited[field_cell.get_column()][field_cell.get_row()] = true;
	queue.push_back(field_cell);
	while let Some(current) = queue.pop_front() {
		for ordinal in Ordinal::FLOW_PRIORITY {
			let Some(neighbour) = current.get_neighbour(ordinal) else {
				continue;
			};
			let (c, r) = neighbour.get_column_row();
			if visited[c][r] {
				continue;
			}
			if sector.get_local_island(neighbour) != ISLAND_NONE {
				return Some(neighbour);
			}
			visited[c][r] = true;
			queue.push_back(neighbour);
		}
	}
	None
}
