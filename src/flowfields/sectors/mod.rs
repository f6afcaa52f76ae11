//! A map is split into a series of `MxN` sectors composed of various fields
//! used for path calculation
//!
//! ```text
//!  origin
//!    x______________________________________ +x (columns, east)
//!    |            |            |            |
//!    |   (0, 0)   |   (1, 0)   |   (2, 0)   |
//!    |____________|____________|____________|
//!    |            |            |            |
//!    |   (0, 1)   |   (1, 1)   |   (2, 1)   |
//!    |____________|____________|____________|
//!   +y (rows, south)
//! ```
//!
//! Every sector holds `FIELD_RESOLUTION x FIELD_RESOLUTION` field cells, a
//! cell is `cell_size` world units wide.
//!

pub mod layer_sectors;
pub mod sector_nav;

use crate::prelude::*;
use bevy::prelude::*;

/// Unique ID of a sector
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct SectorID((u32, u32));

impl SectorID {
	/// Create a new instance of [SectorID]
	pub fn new(column: u32, row: u32) -> Self {
		SectorID((column, row))
	}
	/// Get the sector `(column, row)` tuple
	pub fn get(&self) -> (u32, u32) {
		self.0
	}
	/// Get the sector column
	pub fn get_column(&self) -> u32 {
		self.0 .0
	}
	/// Get the sector row
	pub fn get_row(&self) -> u32 {
		self.0 .1
	}
}

/// The dimensions of the world
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapDimensions {
	/// Number of sectors along the x axis
	sector_columns: u32,
	/// Number of sectors along the y axis
	sector_rows: u32,
	/// World units spanned by a single field cell
	cell_size: f32,
	/// World position of the top-left corner of sector `(0, 0)`
	origin: Vec2,
}

impl MapDimensions {
	/// Create a new instance of [MapDimensions]. Destination handles pack
	/// sector coordinates into 8 bits so a map may not exceed 256 sectors a side
	pub fn new(sector_columns: u32, sector_rows: u32, cell_size: f32, origin: Vec2) -> Self {
		if sector_columns == 0 || sector_rows == 0 {
			panic!(
				"Map dimensions `({}, {})` cannot support sectors, a map needs at least one sector",
				sector_columns, sector_rows
			);
		}
		if sector_columns > 256 || sector_rows > 256 {
			panic!(
				"Map dimensions `({}, {})` exceed the 256 sector limit along an axis",
				sector_columns, sector_rows
			);
		}
		if cell_size <= 0.0 {
			panic!("Cell size must be positive, got {}", cell_size);
		}
		MapDimensions {
			sector_columns,
			sector_rows,
			cell_size,
			origin,
		}
	}
	pub fn get_sector_columns(&self) -> u32 {
		self.sector_columns
	}
	pub fn get_sector_rows(&self) -> u32 {
		self.sector_rows
	}
	pub fn get_cell_size(&self) -> f32 {
		self.cell_size
	}
	pub fn get_origin(&self) -> Vec2 {
		self.origin
	}
	/// Total number of sectors
	pub fn get_sector_count(&self) -> usize {
		(self.sector_columns * self.sector_rows) as usize
	}
	/// Number of field cells along the x axis of the whole map
	pub fn get_cell_columns(&self) -> i32 {
		self.sector_columns as i32 * FIELD_RESOLUTION as i32
	}
	/// Number of field cells along the y axis of the whole map
	pub fn get_cell_rows(&self) -> i32 {
		self.sector_rows as i32 * FIELD_RESOLUTION as i32
	}
	/// Length of the diagonal of a sector in field cells
	pub fn get_sector_diagonal(&self) -> f32 {
		FIELD_RESOLUTION as f32 * std::f32::consts::SQRT_2
	}
	/// Index of a sector within flat per-layer storage
	pub fn get_sector_index(&self, sector_id: &SectorID) -> usize {
		if !self.contains_sector(sector_id) {
			panic!(
				"{:?} is outside of a map of {}x{} sectors",
				sector_id, self.sector_columns, self.sector_rows
			);
		}
		(sector_id.get_row() * self.sector_columns + sector_id.get_column()) as usize
	}
	/// Inverse of [MapDimensions::get_sector_index]
	pub fn get_sector_from_index(&self, index: usize) -> SectorID {
		let column = index as u32 % self.sector_columns;
		let row = index as u32 / self.sector_columns;
		SectorID::new(column, row)
	}
	/// Whether the sector lies within the map
	pub fn contains_sector(&self, sector_id: &SectorID) -> bool {
		sector_id.get_column() < self.sector_columns && sector_id.get_row() < self.sector_rows
	}
	/// Iterate over every sector of the map in index order
	pub fn iter_sectors(&self) -> impl Iterator<Item = SectorID> + '_ {
		(0..self.get_sector_count()).map(|i| self.get_sector_from_index(i))
	}
	/// Convert a sector and field cell into a map-wide `(column, row)` cell coordinate
	pub fn get_global_cell(&self, sector_id: SectorID, field_cell: FieldCell) -> (i32, i32) {
		(
			(sector_id.get_column() as usize * FIELD_RESOLUTION + field_cell.get_column()) as i32,
			(sector_id.get_row() as usize * FIELD_RESOLUTION + field_cell.get_row()) as i32,
		)
	}
	/// Convert a map-wide cell coordinate into its sector and field cell, [None] if outside the map
	pub fn get_sector_and_field_cell_from_global(
		&self,
		global: (i32, i32),
	) -> Option<(SectorID, FieldCell)> {
		if global.0 < 0
			|| global.1 < 0
			|| global.0 >= self.get_cell_columns()
			|| global.1 >= self.get_cell_rows()
		{
			return None;
		}
		let res = FIELD_RESOLUTION as i32;
		Some((
			SectorID::new((global.0 / res) as u32, (global.1 / res) as u32),
			FieldCell::new((global.0 % res) as usize, (global.1 % res) as usize),
		))
	}
	/// From a world position get the map-wide cell coordinate, which may lie outside the map
	pub fn get_global_cell_from_xy(&self, position: Vec2) -> (i32, i32) {
		let local = (position - self.origin) / self.cell_size;
		(local.x.floor() as i32, local.y.floor() as i32)
	}
	/// From a world position get the sector and field cell it resides in
	pub fn get_sector_and_field_cell_from_xy(
		&self,
		position: Vec2,
	) -> Option<(SectorID, FieldCell)> {
		let global = self.get_global_cell_from_xy(position);
		let result = self.get_sector_and_field_cell_from_global(global);
		if result.is_none() {
			error!("Position is out of bounds of MapDimensions, x {}, y {}, cannot calculate SectorID. Is the actor outside of the map or trying to request route outside of it?", position.x, position.y);
		}
		result
	}
	/// World position of the centre of a map-wide cell coordinate
	pub fn get_xy_from_global(&self, global: (i32, i32)) -> Vec2 {
		self.origin
			+ Vec2::new(
				(global.0 as f32 + 0.5) * self.cell_size,
				(global.1 as f32 + 0.5) * self.cell_size,
			)
	}
	/// From a field cell within a sector retrieve the world position of its centre
	pub fn get_xy_from_field_sector(&self, sector_id: SectorID, field_cell: FieldCell) -> Vec2 {
		self.get_xy_from_global(self.get_global_cell(sector_id, field_cell))
	}
	/// From an [Ordinal] get the ID of a neighbouring sector. Returns [None]
	/// if the sector would be out of bounds
	pub fn get_sector_id_from_ordinal(
		&self,
		ordinal: Ordinal,
		sector_id: &SectorID,
	) -> Option<SectorID> {
		let (dc, dr) = ordinal.get_offset();
		let column = sector_id.get_column() as i64 + dc as i64;
		let row = sector_id.get_row() as i64 + dr as i64;
		if column < 0
			|| row < 0
			|| column >= self.sector_columns as i64
			|| row >= self.sector_rows as i64
			|| ordinal == Ordinal::Zero
		{
			None
		} else {
			Some(SectorID::new(column as u32, row as u32))
		}
	}
	/// A sector has up to four orthogonal neighbours. Based on the ID of the sector retrieve
	/// the IDs of neighbouring sectors and the [Ordinal] direction they are found in
	pub fn get_ordinal_and_ids_of_neighbouring_sectors(
		&self,
		sector_id: &SectorID,
	) -> Vec<(Ordinal, SectorID)> {
		let mut neighbours = Vec::new();
		for ordinal in Ordinal::ORTHOGONAL {
			if let Some(id) = self.get_sector_id_from_ordinal(ordinal, sector_id) {
				neighbours.push((ordinal, id));
			}
		}
		neighbours
	}
	/// The up to eight sectors surrounding `sector_id`, including diagonals
	pub fn get_ids_of_surrounding_sectors(&self, sector_id: &SectorID) -> Vec<SectorID> {
		let mut neighbours = Vec::new();
		for ordinal in [
			Ordinal::North,
			Ordinal::NorthEast,
			Ordinal::East,
			Ordinal::SouthEast,
			Ordinal::South,
			Ordinal::SouthWest,
			Ordinal::West,
			Ordinal::NorthWest,
		] {
			if let Some(id) = self.get_sector_id_from_ordinal(ordinal, sector_id) {
				neighbours.push(id);
			}
		}
		neighbours
	}
	/// Number of shared sector boundaries, `rows * (columns - 1) + columns * (rows - 1)`
	pub fn get_sector_link_count(&self) -> usize {
		let c = self.sector_columns as usize;
		let r = self.sector_rows as usize;
		r * (c - 1) + c * (r - 1)
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn sector_from_xy() {
		let map_dimensions = MapDimensions::new(3, 2, 0.5, Vec2::new(-48.0, -32.0));
		let position = Vec2::new(0.1, 0.1);
		let result = map_dimensions.get_sector_and_field_cell_from_xy(position);
		let actual = Some((SectorID::new(1, 1), FieldCell::new(32, 0)));
		assert_eq!(actual, result);
	}
	#[test]
	fn sector_from_xy_out_of_bounds() {
		let map_dimensions = MapDimensions::new(3, 2, 0.5, Vec2::ZERO);
		let position = Vec2::new(-0.1, 1.0);
		let result = map_dimensions.get_sector_and_field_cell_from_xy(position);
		assert!(result.is_none());
	}
	#[test]
	fn xy_from_field_sector() {
		let map_dimensions = MapDimensions::new(2, 2, 1.0, Vec2::ZERO);
		let result = map_dimensions.get_xy_from_field_sector(SectorID::new(1, 0), FieldCell::new(0, 3));
		let actual = Vec2::new(64.5, 3.5);
		assert_eq!(actual, result);
	}
	#[test]
	fn neighbours_of_corner_sector() {
		let map_dimensions = MapDimensions::new(3, 3, 1.0, Vec2::ZERO);
		let result = map_dimensions.get_ordinal_and_ids_of_neighbouring_sectors(&SectorID::new(0, 0));
		let actual = vec![(Ordinal::East, SectorID::new(1, 0)), (Ordinal::South, SectorID::new(0, 1))];
		assert_eq!(actual, result);
	}
	#[test]
	fn surrounding_of_centre_sector() {
		let map_dimensions = MapDimensions::new(3, 3, 1.0, Vec2::ZERO);
		let result = map_dimensions.get_ids_of_surrounding_sectors(&SectorID::new(1, 1));
		assert_eq!(8, result.len());
	}
	#[test]
	fn link_count() {
		let map_dimensions = MapDimensions::new(4, 3, 1.0, Vec2::ZERO);
		assert_eq!(17, map_dimensions.get_sector_link_count());
		let single = MapDimensions::new(1, 1, 1.0, Vec2::ZERO);
		assert_eq!(0, single.get_sector_link_count());
	}
	#[test]
	fn index_round_trip() {
		let map_dimensions = MapDimensions::new(5, 4, 1.0, Vec2::ZERO);
		for sector in map_dimensions.iter_sectors() {
			let index = map_dimensions.get_sector_index(&sector);
			assert_eq!(sector, map_dimensions.get_sector_from_index(index));
		}
	}
	#[test]
	#[should_panic]
	fn empty_map() {
		MapDimensions::new(0, 3, 1.0, Vec2::ZERO);
	}
}
