//! Terrain tiles are the coarse input to navigation. Each tile covers a
//! `2x2` block of [FieldCell]s and carries a kind, a base height and for
//! sloped kinds a ramp height.
//!
//! ```text
//!   NW______NE
//!    |  0 | 1 |
//!    |____|___|      each tile maps to four sub-cells, corner kinds
//!    |  2 | 3 |      lose the sub-cell beneath their odd corner
//!    |____|___|
//!   SW        SE
//! ```
//!
//! Tiles are stored in a single row-major array spanning the whole map,
//! `TILES_PER_SECTOR` tiles to a sector side.
//!

use crate::prelude::*;

/// Shape of a terrain tile
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
	#[default]
	Flat,
	/// Rises from the southern edge up to the northern edge
	RampSN,
	/// Rises from the northern edge up to the southern edge
	RampNS,
	/// Rises from the eastern edge up to the western edge
	RampEW,
	/// Rises from the western edge up to the eastern edge
	RampWE,
	/// Every corner is raised apart from the south-west
	CornerConcaveSW,
	/// Every corner is raised apart from the south-east
	CornerConcaveSE,
	/// Every corner is raised apart from the north-west
	CornerConcaveNW,
	/// Every corner is raised apart from the north-east
	CornerConcaveNE,
	/// Only the south-west corner is raised
	CornerConvexSW,
	/// Only the south-east corner is raised
	CornerConvexSE,
	/// Only the north-west corner is raised
	CornerConvexNW,
	/// Only the north-east corner is raised
	CornerConvexNE,
}

impl TileKind {
	/// For corner kinds the sub-cell `(column, row)` within the `2x2` block lying under the odd corner
	fn get_odd_sub_cell(&self) -> Option<(usize, usize)> {
		match self {
			TileKind::CornerConcaveSW | TileKind::CornerConvexSW => Some((0, 1)),
			TileKind::CornerConcaveSE | TileKind::CornerConvexSE => Some((1, 1)),
			TileKind::CornerConcaveNW | TileKind::CornerConvexNW => Some((0, 0)),
			TileKind::CornerConcaveNE | TileKind::CornerConvexNE => Some((1, 0)),
			_ => None,
		}
	}
}

/// A single terrain tile
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
	/// Shape
	kind: TileKind,
	/// Whether units may ever stand on the tile
	pathable: bool,
	/// Height of the lowest corner
	base_height: i32,
	/// Height difference between the raised and lowered corners of a sloped tile
	ramp_height: i32,
}

impl Default for Tile {
	fn default() -> Self {
		Tile {
			kind: TileKind::Flat,
			pathable: true,
			base_height: 0,
			ramp_height: 0,
		}
	}
}

impl Tile {
	/// Create a new [Tile]
	pub fn new(kind: TileKind, pathable: bool, base_height: i32, ramp_height: i32) -> Self {
		Tile {
			kind,
			pathable,
			base_height,
			ramp_height,
		}
	}
	/// A flat pathable tile at `height`
	pub fn flat(height: i32) -> Self {
		Tile::new(TileKind::Flat, true, height, 0)
	}
	/// A flat tile units may never occupy
	pub fn unpathable(height: i32) -> Self {
		Tile::new(TileKind::Flat, false, height, 0)
	}
	pub fn get_kind(&self) -> TileKind {
		self.kind
	}
	pub fn is_pathable(&self) -> bool {
		self.pathable
	}
	pub fn get_base_height(&self) -> i32 {
		self.base_height
	}
	pub fn get_ramp_height(&self) -> i32 {
		self.ramp_height
	}
	/// Heights of the `[north-west, north-east, south-east, south-west]` corners
	pub fn get_corner_heights(&self) -> [i32; 4] {
		let lo = self.base_height;
		let hi = self.base_height + self.ramp_height;
		match self.kind {
			TileKind::Flat => [lo, lo, lo, lo],
			TileKind::RampSN => [hi, hi, lo, lo],
			TileKind::RampNS => [lo, lo, hi, hi],
			TileKind::RampEW => [hi, lo, lo, hi],
			TileKind::RampWE => [lo, hi, hi, lo],
			TileKind::CornerConcaveSW => [hi, hi, hi, lo],
			TileKind::CornerConcaveSE => [hi, hi, lo, hi],
			TileKind::CornerConcaveNW => [lo, hi, hi, hi],
			TileKind::CornerConcaveNE => [hi, lo, hi, hi],
			TileKind::CornerConvexSW => [lo, lo, lo, hi],
			TileKind::CornerConvexSE => [lo, lo, hi, lo],
			TileKind::CornerConvexNW => [hi, lo, lo, lo],
			TileKind::CornerConvexNE => [lo, hi, lo, lo],
		}
	}
	/// Heights of the two corners along a side, ordered west-to-east or north-to-south
	pub fn get_side_heights(&self, side: Ordinal) -> (i32, i32) {
		let [nw, ne, se, sw] = self.get_corner_heights();
		match side {
			Ordinal::North => (nw, ne),
			Ordinal::East => (ne, se),
			Ordinal::South => (sw, se),
			Ordinal::West => (nw, sw),
			_ => panic!("A tile side must be orthogonal, got {:?}", side),
		}
	}
	/// A tile with every corner below sea level
	pub fn is_water(&self) -> bool {
		self.get_corner_heights().iter().all(|h| *h < 0)
	}
	/// Pathability of the four sub-cells `[[col0_row0, col0_row1], [col1_row0, col1_row1]]` ignoring neighbouring tiles
	pub fn get_sub_cell_pattern(&self) -> [[bool; CELLS_PER_TILE]; CELLS_PER_TILE] {
		if !self.pathable {
			return [[false; CELLS_PER_TILE]; CELLS_PER_TILE];
		}
		if self.kind != TileKind::Flat && self.ramp_height > 1 {
			return [[false; CELLS_PER_TILE]; CELLS_PER_TILE];
		}
		let mut pattern = [[true; CELLS_PER_TILE]; CELLS_PER_TILE];
		if let Some((c, r)) = self.kind.get_odd_sub_cell() {
			pattern[c][r] = false;
		}
		pattern
	}
}

/// Row-major grid of [Tile]s covering every sector of a map
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone)]
pub struct TerrainMap {
	/// Number of sectors along the x axis
	sector_columns: u32,
	/// Number of sectors along the y axis
	sector_rows: u32,
	/// Tiles indexed `row * tile_columns + column`
	tiles: Vec<Tile>,
}

impl TerrainMap {
	/// A terrain of flat pathable tiles at height zero
	pub fn new(sector_columns: u32, sector_rows: u32) -> Self {
		let count = (sector_columns as usize * TILES_PER_SECTOR)
			* (sector_rows as usize * TILES_PER_SECTOR);
		TerrainMap {
			sector_columns,
			sector_rows,
			tiles: vec![Tile::default(); count],
		}
	}
	pub fn get_sector_columns(&self) -> u32 {
		self.sector_columns
	}
	pub fn get_sector_rows(&self) -> u32 {
		self.sector_rows
	}
	/// Number of tiles along the x axis
	pub fn get_tile_columns(&self) -> usize {
		self.sector_columns as usize * TILES_PER_SECTOR
	}
	/// Number of tiles along the y axis
	pub fn get_tile_rows(&self) -> usize {
		self.sector_rows as usize * TILES_PER_SECTOR
	}
	/// Get the tile at a global tile coordinate, [None] if outside the map
	pub fn get_tile(&self, column: i32, row: i32) -> Option<&Tile> {
		if column < 0
			|| row < 0
			|| column as usize >= self.get_tile_columns()
			|| row as usize >= self.get_tile_rows()
		{
			return None;
		}
		self.tiles
			.get(row as usize * self.get_tile_columns() + column as usize)
	}
	/// Replace the tile at a global tile coordinate
	pub fn set_tile(&mut self, column: usize, row: usize, tile: Tile) {
		if column >= self.get_tile_columns() || row >= self.get_tile_rows() {
			panic!(
				"Tile ({}, {}) is outside of a terrain of {}x{} tiles",
				column,
				row,
				self.get_tile_columns(),
				self.get_tile_rows()
			);
		}
		let columns = self.get_tile_columns();
		self.tiles[row * columns + column] = tile;
	}
	/// Fill an inclusive rectangle of tiles
	pub fn fill(&mut self, min: (usize, usize), max: (usize, usize), tile: Tile) {
		for column in min.0..=max.0 {
			for row in min.1..=max.1 {
				self.set_tile(column, row, tile);
			}
		}
	}
	/// From a `ron` file generate the [TerrainMap]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String) -> Self {
		let file = std::fs::File::open(path).expect("Failed opening TerrainMap file");
		let terrain: TerrainMap = match ron::de::from_reader(file) {
			Ok(terrain) => terrain,
			Err(e) => panic!("Failed deserializing TerrainMap: {}", e),
		};
		let expected = terrain.get_tile_columns() * terrain.get_tile_rows();
		if terrain.tiles.len() != expected {
			panic!(
				"TerrainMap has {} tiles, {} sectors by {} requires {}",
				terrain.tiles.len(),
				terrain.sector_columns,
				terrain.sector_rows,
				expected
			);
		}
		terrain
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn ramp_corner_heights() {
		let tile = Tile::new(TileKind::RampSN, true, 2, 1);
		assert_eq!([3, 3, 2, 2], tile.get_corner_heights());
		assert_eq!((3, 3), tile.get_side_heights(Ordinal::North));
		assert_eq!((2, 2), tile.get_side_heights(Ordinal::South));
	}
	#[test]
	fn steep_ramp_is_impassable() {
		let tile = Tile::new(TileKind::RampWE, true, 0, 2);
		assert_eq!([[false; 2]; 2], tile.get_sub_cell_pattern());
	}
	#[test]
	fn corner_loses_one_sub_cell() {
		let tile = Tile::new(TileKind::CornerConvexNE, true, 0, 1);
		let actual = [[true, true], [false, true]];
		assert_eq!(actual, tile.get_sub_cell_pattern());
	}
	#[test]
	fn water_tile() {
		assert!(Tile::flat(-1).is_water());
		assert!(!Tile::new(TileKind::RampNS, true, -1, 1).is_water());
	}
	#[test]
	fn terrain_bounds() {
		let terrain = TerrainMap::new(2, 1);
		assert_eq!(64, terrain.get_tile_columns());
		assert_eq!(32, terrain.get_tile_rows());
		assert!(terrain.get_tile(63, 31).is_some());
		assert!(terrain.get_tile(64, 0).is_none());
		assert!(terrain.get_tile(-1, 0).is_none());
	}
}
