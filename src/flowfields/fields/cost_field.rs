//! The CostField contains a 2D array of 8-bit values. The values correspond to the cost of that
//! cell in the array. A value of 1 is the default, a value of 255 is a special case that idicates
//! that the field cell is strictly forbidden from being used in a pathing calculation (effectively
//! saying there is a wall or cliff/impassable terrain there). Any other value indicates a harder
//! cost of movement.
//!
//! Every Sector of every [NavLayer] has a [CostField] built from the terrain. Each terrain tile
//! covers a `2x2` block of cells, the block takes the tile's sub-cell pattern and then the two
//! cells along any side where the tile's corner heights disagree with its neighbour (a cliff)
//! are marked impassable:
//!
//! ```text
//!  tile A (height 0)   tile B (height 2)
//!  ___________________________________
//! |     |     |     |     |
//! |  1  | 255 | 255 |  1  |
//! |_____|_____|_____|_____|
//! |     |     |     |     |
//! |  1  | 255 | 255 |  1  |
//! |_____|_____|_____|_____|
//! ```
//!

use crate::prelude::*;

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CostField([[u8; FIELD_RESOLUTION]; FIELD_RESOLUTION]);

impl Default for CostField {
	fn default() -> Self {
		CostField([[1; FIELD_RESOLUTION]; FIELD_RESOLUTION])
	}
}

impl Field<u8> for CostField {
	/// Get a reference to the field array
	fn get(&self) -> &[[u8; FIELD_RESOLUTION]; FIELD_RESOLUTION] {
		&self.0
	}
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, field_cell: FieldCell) -> u8 {
		if field_cell.get_column() >= self.0.len() || field_cell.get_row() >= self.0[0].len() {
			panic!("Cannot get a CostField value, index out of bounds. Asked for column {}, row {}, field column length is {}, field row length is {}", field_cell.get_column(), field_cell.get_row(), self.0.len(), self.0[0].len())
		}
		self.0[field_cell.get_column()][field_cell.get_row()]
	}
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: u8, field_cell: FieldCell) {
		if field_cell.get_column() >= self.0.len() || field_cell.get_row() >= self.0[0].len() {
			panic!("Cannot set a CostField value, index out of bounds. Asked for column {}, row {}, field column length is {}, field row length is {}", field_cell.get_column(), field_cell.get_row(), self.0.len(), self.0[0].len())
		}
		self.0[field_cell.get_column()][field_cell.get_row()] = value;
	}
}

impl CostField {
	/// A field where every cell holds `cost`
	pub fn new_with_cost(cost: u8) -> Self {
		CostField([[cost; FIELD_RESOLUTION]; FIELD_RESOLUTION])
	}
	/// Whether a cell may be traversed at all
	pub fn is_passable(&self, field_cell: FieldCell) -> bool {
		self.get_field_cell_value(field_cell) != COST_IMPASSABLE
	}
	/// Build the cost of a sector for a locomotion `domain` from the terrain
	pub fn from_terrain(terrain: &TerrainMap, sector_id: SectorID, domain: NavDomain) -> Self {
		if domain == NavDomain::Air {
			return CostField::default();
		}
		let mut field = CostField::new_with_cost(COST_IMPASSABLE);
		let tile_col_origin = sector_id.get_column() as i32 * TILES_PER_SECTOR as i32;
		let tile_row_origin = sector_id.get_row() as i32 * TILES_PER_SECTOR as i32;
		for tc in 0..TILES_PER_SECTOR {
			for tr in 0..TILES_PER_SECTOR {
				let global_col = tile_col_origin + tc as i32;
				let global_row = tile_row_origin + tr as i32;
				let Some(tile) = terrain.get_tile(global_col, global_row) else {
					continue;
				};
				let mut pattern = match domain {
					NavDomain::Ground if tile.is_water() => [[false; CELLS_PER_TILE]; CELLS_PER_TILE],
					NavDomain::Ground => tile.get_sub_cell_pattern(),
					NavDomain::Water if tile.is_water() => [[true; CELLS_PER_TILE]; CELLS_PER_TILE],
					_ => [[false; CELLS_PER_TILE]; CELLS_PER_TILE],
				};
				if domain == NavDomain::Ground {
					mark_cliff_edges(terrain, tile, (global_col, global_row), &mut pattern);
				}
				for (sc, column) in pattern.iter().enumerate() {
					for (sr, passable) in column.iter().enumerate() {
						if *passable {
							let cell = FieldCell::new(
								tc * CELLS_PER_TILE + sc,
								tr * CELLS_PER_TILE + sr,
							);
							field.set_field_cell_value(1, cell);
						}
					}
				}
			}
		}
		field
	}
	/// Tests whether two cells can reach each other through cardinal moves over passable cells of this field
	pub fn is_cell_pair_reachable(&self, source: FieldCell, target: FieldCell) -> bool {
		if !self.is_passable(source) || !self.is_passable(target) {
			return false;
		}
		if source == target {
			return true;
		}
		let mut visited = [[false; FIELD_RESOLUTION]; FIELD_RESOLUTION];
		let mut queue = std::collections::VecDeque::new();
		visited[source.get_column()][source.get_row()] = true;
		queue.push_back(source);
		while let Some(cell) = queue.pop_front() {
			for n in cell.get_orthogonal_neighbours() {
				if n == target {
					return true;
				}
				if !visited[n.get_column()][n.get_row()] && self.is_passable(n) {
					visited[n.get_column()][n.get_row()] = true;
					queue.push_back(n);
				}
			}
		}
		false
	}
	/// From a `ron` file generate the [CostField]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String) -> Self {
		let file = std::fs::File::open(path).expect("Failed opening CostField file");
		let field: CostField = match ron::de::from_reader(file) {
			Ok(field) => field,
			Err(e) => panic!("Failed deserializing CostField: {}", e),
		};
		field
	}
}

/// Blank the sub-cells of a tile along any side whose corner heights differ from the adjoining tile
fn mark_cliff_edges(
	terrain: &TerrainMap,
	tile: &Tile,
	global_tile: (i32, i32),
	pattern: &mut [[bool; CELLS_PER_TILE]; CELLS_PER_TILE],
) {
	let last = CELLS_PER_TILE - 1;
	for side in Ordinal::ORTHOGONAL {
		let (dc, dr) = side.get_offset();
		let Some(neighbour) = terrain.get_tile(global_tile.0 + dc, global_tile.1 + dr) else {
			continue;
		};
		let ours = tile.get_side_heights(side);
		let theirs = neighbour.get_side_heights(side.inverse());
		if ours == theirs {
			continue;
		}
		for i in 0..CELLS_PER_TILE {
			let (c, r) = match side {
				Ordinal::North => (i, 0),
				Ordinal::East => (last, i),
				Ordinal::South => (i, last),
				_ => (0, i),
			};
			pattern[c][r] = false;
		}
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn get_cost_field_value() {
		let mut cost_field = CostField::default();
		let field_cell = FieldCell::new(9, 9);
		cost_field.set_field_cell_value(255, field_cell);
		let result = cost_field.get_field_cell_value(field_cell);
		let actual: u8 = 255;
		assert_eq!(actual, result);
	}
	#[test]
	fn flat_terrain_is_open() {
		let terrain = TerrainMap::new(1, 1);
		let result = CostField::from_terrain(&terrain, SectorID::new(0, 0), NavDomain::Ground);
		assert_eq!(CostField::default(), result);
	}
	#[test]
	fn cliff_between_tiles() {
		// a raised plateau in the east half of tile row 0
		let mut terrain = TerrainMap::new(1, 1);
		terrain.fill((16, 0), (31, 0), Tile::flat(2));
		let result = CostField::from_terrain(&terrain, SectorID::new(0, 0), NavDomain::Ground);
		// west tile's eastern cells
		assert_eq!(255, result.get_field_cell_value(FieldCell::new(31, 0)));
		assert_eq!(255, result.get_field_cell_value(FieldCell::new(31, 1)));
		// east tile's western cells
		assert_eq!(255, result.get_field_cell_value(FieldCell::new(32, 0)));
		// the plateau's southern edge drops to the tiles below
		assert_eq!(255, result.get_field_cell_value(FieldCell::new(40, 1)));
		assert_eq!(1, result.get_field_cell_value(FieldCell::new(40, 0)));
		assert_eq!(1, result.get_field_cell_value(FieldCell::new(10, 0)));
	}
	#[test]
	fn ramp_joins_levels() {
		// ramp rising west to east between height 0 and height 1
		let mut terrain = TerrainMap::new(1, 1);
		terrain.fill((11, 0), (31, 31), Tile::flat(1));
		terrain.fill((10, 0), (10, 31), Tile::new(TileKind::RampWE, true, 0, 1));
		let result = CostField::from_terrain(&terrain, SectorID::new(0, 0), NavDomain::Ground);
		assert_eq!(1, result.get_field_cell_value(FieldCell::new(19, 10)));
		assert_eq!(1, result.get_field_cell_value(FieldCell::new(20, 10)));
		assert_eq!(1, result.get_field_cell_value(FieldCell::new(21, 10)));
		assert_eq!(1, result.get_field_cell_value(FieldCell::new(22, 10)));
	}
	#[test]
	fn water_layers() {
		let mut terrain = TerrainMap::new(1, 1);
		terrain.fill((0, 0), (3, 3), Tile::flat(-2));
		let ground = CostField::from_terrain(&terrain, SectorID::new(0, 0), NavDomain::Ground);
		let water = CostField::from_terrain(&terrain, SectorID::new(0, 0), NavDomain::Water);
		let air = CostField::from_terrain(&terrain, SectorID::new(0, 0), NavDomain::Air);
		assert_eq!(255, ground.get_field_cell_value(FieldCell::new(2, 2)));
		assert_eq!(1, water.get_field_cell_value(FieldCell::new(2, 2)));
		assert_eq!(255, water.get_field_cell_value(FieldCell::new(20, 20)));
		assert_eq!(1, air.get_field_cell_value(FieldCell::new(2, 2)));
	}
	#[test]
	fn reachable_pair() {
		//  _____________________________
		// |__|__|__|__|__|x_|__|__|__|__|
		// |S_|__|__|__|__|x_|__|__|T_|__|
		// |__|__|__|__|__|x_|__|__|__|__|
		let mut cost_field = CostField::default();
		for row in 0..FIELD_RESOLUTION {
			cost_field.set_field_cell_value(255, FieldCell::new(5, row));
		}
		assert!(!cost_field.is_cell_pair_reachable(FieldCell::new(0, 1), FieldCell::new(8, 1)));
		cost_field.set_field_cell_value(1, FieldCell::new(5, 40));
		assert!(cost_field.is_cell_pair_reachable(FieldCell::new(0, 1), FieldCell::new(8, 1)));
	}
}
