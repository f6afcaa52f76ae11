//! The kinds of fields used by the algorithm and the identities under which
//! they get cached
//!

pub mod cost_field;
pub mod flow_field;
pub mod integration_field;
pub mod los_field;

use crate::prelude::*;

/// Defines required access to field arrays
pub trait Field<T> {
	/// Get a reference to the field array
	fn get(&self) -> &[[T; FIELD_RESOLUTION]; FIELD_RESOLUTION];
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, field_cell: FieldCell) -> T;
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: T, field_cell: FieldCell);
}

/// ID of a cell within a field
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct FieldCell((usize, usize));

impl FieldCell {
	/// Create a new instance of [FieldCell]
	pub fn new(column: usize, row: usize) -> Self {
		FieldCell((column, row))
	}
	/// Get the `(column, row)` tuple
	pub fn get_column_row(&self) -> (usize, usize) {
		self.0
	}
	/// Get the column
	pub fn get_column(&self) -> usize {
		self.0 .0
	}
	/// Get the row
	pub fn get_row(&self) -> usize {
		self.0 .1
	}
	/// The neighbouring cell in the direction of `ordinal`, [None] if it would fall outside the field
	pub fn get_neighbour(&self, ordinal: Ordinal) -> Option<FieldCell> {
		let (dc, dr) = ordinal.get_offset();
		let column = self.get_column() as i32 + dc;
		let row = self.get_row() as i32 + dr;
		if column < 0
			|| row < 0
			|| column >= FIELD_RESOLUTION as i32
			|| row >= FIELD_RESOLUTION as i32
		{
			None
		} else {
			Some(FieldCell::new(column as usize, row as usize))
		}
	}
	/// Cardinal neighbours in `N, E, S, W` order that lie within the field
	pub fn get_orthogonal_neighbours(&self) -> Vec<FieldCell> {
		Ordinal::ORTHOGONAL
			.iter()
			.filter_map(|o| self.get_neighbour(*o))
			.collect()
	}
	/// Whether the cell sits along the `side` boundary of its sector
	pub fn is_on_boundary(&self, side: Ordinal) -> bool {
		match side {
			Ordinal::North => self.get_row() == 0,
			Ordinal::East => self.get_column() == FIELD_RESOLUTION - 1,
			Ordinal::South => self.get_row() == FIELD_RESOLUTION - 1,
			Ordinal::West => self.get_column() == 0,
			_ => false,
		}
	}
	/// For a cell on the `side` boundary of a sector get the cell it touches in the neighbouring sector
	pub fn get_mirrored_boundary_cell(&self, side: Ordinal) -> FieldCell {
		match side {
			Ordinal::North | Ordinal::South => {
				FieldCell::new(self.get_column(), FIELD_RESOLUTION - 1 - self.get_row())
			}
			Ordinal::East | Ordinal::West => {
				FieldCell::new(FIELD_RESOLUTION - 1 - self.get_column(), self.get_row())
			}
			_ => panic!("Boundaries only exist on orthogonal sides, got {:?}", side),
		}
	}
	/// Chebyshev distance between two cells
	pub fn get_chebyshev_distance(&self, other: &FieldCell) -> usize {
		self.get_column()
			.abs_diff(other.get_column())
			.max(self.get_row().abs_diff(other.get_row()))
	}
	/// Using the Bresenham line algorithm get a list of [FieldCell] that lie along a line between two points
	pub fn get_cells_between_points(&self, target: &FieldCell) -> Vec<FieldCell> {
		get_global_cells_between_points(
			(self.get_column() as i32, self.get_row() as i32),
			(target.get_column() as i32, target.get_row() as i32),
		)
		.into_iter()
		.map(|(c, r)| FieldCell::new(c as usize, r as usize))
		.collect()
	}
}

/// Using the Bresenham line algorithm get the `(column, row)` coordinates
/// lying along a line from `source` to `target`, coordinates may be negative
/// so this works across sector boundaries in map-wide cell space
pub fn get_global_cells_between_points(source: (i32, i32), target: (i32, i32)) -> Vec<(i32, i32)> {
	let (source_col, source_row) = source;
	let (target_col, target_row) = target;
	// optimise for orthognal line (horizontal or vertical)
	if source_col == target_col {
		let mut cells: Vec<(i32, i32)> = (source_row.min(target_row)..=source_row.max(target_row))
			.map(|row| (source_col, row))
			.collect();
		if source_row > target_row {
			cells.reverse();
		}
		cells
	} else if source_row == target_row {
		let mut cells: Vec<(i32, i32)> = (source_col.min(target_col)..=source_col.max(target_col))
			.map(|col| (col, source_row))
			.collect();
		if source_col > target_col {
			cells.reverse();
		}
		cells
	} else if (target_row - source_row).abs() < (target_col - source_col).abs() {
		if source_col > target_col {
			let mut cells = walk_bresenham_shallow(target_col, target_row, source_col, source_row);
			// ensure list points in the direction of source to target
			cells.reverse();
			cells
		} else {
			walk_bresenham_shallow(source_col, source_row, target_col, target_row)
		}
	} else if source_row > target_row {
		let mut cells = walk_bresenham_steep(target_col, target_row, source_col, source_row);
		cells.reverse();
		cells
	} else {
		walk_bresenham_steep(source_col, source_row, target_col, target_row)
	}
}
/// When finding a shallow raster representation of a line we step through the x-dimension and increment y based on an error bound which indicates which cells lie on the line
fn walk_bresenham_shallow(col_0: i32, row_0: i32, col_1: i32, row_1: i32) -> Vec<(i32, i32)> {
	let mut cells = Vec::new();

	let delta_col = col_1 - col_0;
	let mut delta_row = row_1 - row_0;

	let mut row_increment = 1;
	if delta_row < 0 {
		row_increment = -1;
		delta_row *= -1;
	}
	let mut difference = 2 * delta_row - delta_col;
	let mut row = row_0;

	for col in col_0..=col_1 {
		cells.push((col, row));
		if difference > 0 {
			row += row_increment;
			difference += 2 * (delta_row - delta_col);
		} else {
			difference += 2 * delta_row;
		}
	}
	cells
}
/// When finding a steep raster representation of a line we step through the y-dimension and increment x based on an error bound which indicates which cells lie on the line
fn walk_bresenham_steep(col_0: i32, row_0: i32, col_1: i32, row_1: i32) -> Vec<(i32, i32)> {
	let mut cells = Vec::new();

	let mut delta_col = col_1 - col_0;
	let delta_row = row_1 - row_0;

	let mut col_increment = 1;
	if delta_col < 0 {
		col_increment = -1;
		delta_col *= -1;
	}
	let mut difference = 2 * delta_col - delta_row;
	let mut col = col_0;

	for row in row_0..=row_1 {
		cells.push((col, row));
		if difference > 0 {
			col += col_increment;
			difference += 2 * (delta_col - delta_row);
		} else {
			difference += 2 * delta_col;
		}
	}
	cells
}

/// Bits available to each packed component of a [DestinationID]
const DEST_BITS_LAYER: u64 = 4;
/// Presence flag and 4-bit faction of an attacking request
const DEST_BITS_FACTION: u64 = 5;
/// Width of a packed coordinate
const DEST_BITS_COORD: u64 = 8;

/// Handle identifying one pathing goal, many sectors' sub-fields are cached under it.
///
/// Packs, from the least significant bit: cell row, cell column, sector row,
/// sector column (8 bits each), the attacking faction with a presence bit
/// (5 bits) and the [NavLayer] (4 bits)
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct DestinationID(u64);

impl DestinationID {
	/// Create a new [DestinationID]
	pub fn new(
		layer: NavLayer,
		attacking_faction: Option<u8>,
		sector_id: SectorID,
		field_cell: FieldCell,
	) -> Self {
		let faction = match attacking_faction {
			Some(f) => {
				if f as usize >= MAX_FACTIONS {
					panic!("Faction {} exceeds the limit of {}", f, MAX_FACTIONS);
				}
				0b1_0000 | f as u64
			}
			None => 0,
		};
		let mut id = layer.get_index() as u64;
		id = (id << DEST_BITS_FACTION) | faction;
		id = (id << DEST_BITS_COORD) | sector_id.get_column() as u64;
		id = (id << DEST_BITS_COORD) | sector_id.get_row() as u64;
		id = (id << DEST_BITS_COORD) | field_cell.get_column() as u64;
		id = (id << DEST_BITS_COORD) | field_cell.get_row() as u64;
		DestinationID(id)
	}
	/// The raw packed value
	pub fn get(&self) -> u64 {
		self.0
	}
	/// Extract `bits` bits lying `shift` bits up from the least significant
	fn unpack(&self, shift: u64, bits: u64) -> u64 {
		(self.0 >> shift) & ((1 << bits) - 1)
	}
	pub fn get_layer(&self) -> NavLayer {
		let index = self.unpack(DEST_BITS_COORD * 4 + DEST_BITS_FACTION, DEST_BITS_LAYER);
		NavLayer::from_index(index as usize)
			.unwrap_or_else(|| panic!("DestinationID {} holds an invalid layer", self.0))
	}
	/// The faction the path was requested on behalf of when attacking
	pub fn get_faction(&self) -> Option<u8> {
		let packed = self.unpack(DEST_BITS_COORD * 4, DEST_BITS_FACTION);
		if packed & 0b1_0000 != 0 {
			Some((packed & 0b1111) as u8)
		} else {
			None
		}
	}
	pub fn get_sector(&self) -> SectorID {
		SectorID::new(
			self.unpack(DEST_BITS_COORD * 3, DEST_BITS_COORD) as u32,
			self.unpack(DEST_BITS_COORD * 2, DEST_BITS_COORD) as u32,
		)
	}
	pub fn get_field_cell(&self) -> FieldCell {
		FieldCell::new(
			self.unpack(DEST_BITS_COORD, DEST_BITS_COORD) as usize,
			self.unpack(0, DEST_BITS_COORD) as usize,
		)
	}
}

/// Describes what a [FlowField] steers towards
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum FieldTargetKey {
	/// A single destination cell within the sector
	Tile(FieldCell),
	/// A portal segment on the `side` boundary, seeded from the cells on
	/// local island `port_island` whose mirrored cell lies on `next_island`
	Portal {
		side: Ordinal,
		endpoints: [FieldCell; 2],
		port_island: u16,
		next_island: u16,
	},
	/// Every live entity hostile to `faction`
	Enemies { faction: u8 },
	/// The cells surrounding one specific entity
	Entity { uid: u32 },
}

/// Content-addressed identity of a [FlowField] so that identical sub-fields
/// required by different paths are shared
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct FlowFieldID {
	/// Layer the field was computed on
	layer: NavLayer,
	/// Sector the field covers
	sector: SectorID,
	/// Faction whose enemies' blockers were treated as passable
	attacking_faction: Option<u8>,
	/// The goal of the field
	target: FieldTargetKey,
}

impl FlowFieldID {
	/// Create a new [FlowFieldID]
	pub fn new(
		layer: NavLayer,
		sector: SectorID,
		attacking_faction: Option<u8>,
		target: FieldTargetKey,
	) -> Self {
		FlowFieldID {
			layer,
			sector,
			attacking_faction,
			target,
		}
	}
	pub fn get_layer(&self) -> NavLayer {
		self.layer
	}
	pub fn get_sector(&self) -> SectorID {
		self.sector
	}
	pub fn get_attacking_faction(&self) -> Option<u8> {
		self.attacking_faction
	}
	pub fn get_target(&self) -> &FieldTargetKey {
		&self.target
	}
	/// Enemy-seek and entity-surround fields are expensive enough to build off the main thread
	pub fn is_async_kind(&self) -> bool {
		matches!(
			self.target,
			FieldTargetKey::Enemies { .. } | FieldTargetKey::Entity { .. }
		)
	}
}
