//! A [FlowField] is a 2D array of 8-bit values. The low 4 bits encode a
//! direction of movement and the high bits are flags identifying goals and
//! pathable cells. A steering pipeline/character controller should read and
//! interpret a [FlowField] to provide movement.
//!
//! ```text
//!  high nibble           low nibble
//!  _______________       _______________
//! |PG |G  |   |P  |     |W  |S  |E  |N  |
//! |___|___|___|___|     |___|___|___|___|
//! ```
//!
//! Diagonals combine their two orthogonal bits, `NorthEast = N | E`.
//!
//! A field is derived from an [IntegrationField] by pointing every cell at
//! its cheapest neighbour. Ties are broken by a fixed priority of
//! `N, S, E, W, NW, NE, SW, SE` and a diagonal is only a candidate when both
//! orthogonal cells flanking it were reached by the wavefront.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Bit to indicate a northerly direction
const BITS_NORTH: u8 = 0b0000_0001;
/// Bit to indicate an easterly direction
const BITS_EAST: u8 = 0b0000_0010;
/// Bit to indicate a southerly direction
const BITS_SOUTH: u8 = 0b0000_0100;
/// Bit to indicate a westerly direction
const BITS_WEST: u8 = 0b0000_1000;
/// Bit to indicate a north-easterly direction
const BITS_NORTH_EAST: u8 = 0b0000_0011;
/// Bit to indicate a south-easterly direction
const BITS_SOUTH_EAST: u8 = 0b0000_0110;
/// Bit to indicate south-westerly direction
const BITS_SOUTH_WEST: u8 = 0b0000_1100;
/// Bit to indicate a north-westerly direction
const BITS_NORTH_WEST: u8 = 0b0000_1001;
/// Bit to indicate no direction
const BITS_ZERO: u8 = 0b0000_0000;
/// Mask of the direction bits
const BITS_DIRECTION: u8 = 0b0000_1111;
/// Flags a pathable field cell
const BITS_PATHABLE: u8 = 0b0001_0000;
/// Flags a field cell as being the goal
const BITS_GOAL: u8 = 0b0100_0000;
/// Flags a field cell as being a portal to another sector
const BITS_PORTAL_GOAL: u8 = 0b1000_0000;

/// Convert an [Ordinal] to a bit representation
pub fn convert_ordinal_to_bits_dir(ordinal: Ordinal) -> u8 {
	match ordinal {
		Ordinal::North => BITS_NORTH,
		Ordinal::East => BITS_EAST,
		Ordinal::South => BITS_SOUTH,
		Ordinal::West => BITS_WEST,
		Ordinal::NorthEast => BITS_NORTH_EAST,
		Ordinal::SouthEast => BITS_SOUTH_EAST,
		Ordinal::SouthWest => BITS_SOUTH_WEST,
		Ordinal::NorthWest => BITS_NORTH_WEST,
		Ordinal::Zero => BITS_ZERO,
	}
}

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FlowField([[u8; FIELD_RESOLUTION]; FIELD_RESOLUTION]);

impl Default for FlowField {
	fn default() -> Self {
		FlowField([[BITS_ZERO; FIELD_RESOLUTION]; FIELD_RESOLUTION])
	}
}

impl Field<u8> for FlowField {
	/// Get a reference to the field array
	fn get(&self) -> &[[u8; FIELD_RESOLUTION]; FIELD_RESOLUTION] {
		&self.0
	}
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, field_cell: FieldCell) -> u8 {
		if field_cell.get_column() >= self.0.len() || field_cell.get_row() >= self.0[0].len() {
			panic!("Cannot get a FlowField value, index out of bounds. Asked for column {}, row {}, field column length is {}, field row length is {}", field_cell.get_column(), field_cell.get_row(), self.0.len(), self.0[0].len())
		}
		self.0[field_cell.get_column()][field_cell.get_row()]
	}
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: u8, field_cell: FieldCell) {
		if field_cell.get_column() >= self.0.len() || field_cell.get_row() >= self.0[0].len() {
			panic!("Cannot set a FlowField value, index out of bounds. Asked for column {}, row {}, field column length is {}, field row length is {}", field_cell.get_column(), field_cell.get_row(), self.0.len(), self.0[0].len())
		}
		self.0[field_cell.get_column()][field_cell.get_row()] = value;
	}
}

impl FlowField {
	/// Calculate the [FlowField] from an [IntegrationField]. The field may be
	/// oversized, `offset` is the `(column, row)` of this sector's top-left
	/// cell within it
	pub fn calculate(&mut self, integration_field: &IntegrationField, offset: (usize, usize)) {
		for column in 0..FIELD_RESOLUTION {
			for row in 0..FIELD_RESOLUTION {
				let field_cell = FieldCell::new(column, row);
				let (ic, ir) = (column + offset.0, row + offset.1);
				let current_cost = integration_field.get_cost(ic, ir);
				if !current_cost.is_finite() {
					self.set_field_cell_value(BITS_ZERO, field_cell);
				} else if current_cost == 0.0 {
					self.set_field_cell_value(BITS_GOAL | BITS_PATHABLE, field_cell);
				} else {
					let ordinal = find_cheapest_neighbour(integration_field, ic, ir, current_cost);
					let value = BITS_PATHABLE | convert_ordinal_to_bits_dir(ordinal);
					self.set_field_cell_value(value, field_cell);
				}
			}
		}
	}
	/// Portal goals sit at zero integration cost so have no meaningful
	/// neighbour to point at, instead point them across the boundary towards
	/// the next sector
	pub fn force_portal_goals(&mut self, goals: &[FieldCell], side: Ordinal) {
		let value = BITS_PORTAL_GOAL | BITS_PATHABLE | convert_ordinal_to_bits_dir(side);
		for goal in goals {
			self.set_field_cell_value(value, *goal);
		}
	}
	/// Direction of travel at a cell
	pub fn get_direction(&self, field_cell: FieldCell) -> Ordinal {
		get_ordinal_from_bits(self.get_field_cell_value(field_cell))
	}
	/// Unit vector of travel at a cell, [Vec2::ZERO] when there is no direction
	pub fn get_direction_vec2(&self, field_cell: FieldCell) -> Vec2 {
		self.get_direction(field_cell).to_vec2()
	}
}

/// Compare the costs of the neighbours of a cell and find the cheapest in priority order
fn find_cheapest_neighbour(
	integration_field: &IntegrationField,
	column: usize,
	row: usize,
	current_cost: f32,
) -> Ordinal {
	let mut cheapest_value = current_cost;
	let mut cheapest_ord = Ordinal::Zero;
	for ordinal in Ordinal::FLOW_PRIORITY {
		let Some(cost) = integration_field.get_neighbour_cost(column, row, ordinal) else {
			continue;
		};
		if let Some((a, b)) = ordinal.get_flanks() {
			let flanks_reached = [a, b].iter().all(|flank| {
				integration_field
					.get_neighbour_cost(column, row, *flank)
					.is_some_and(|c| c.is_finite())
			});
			if !flanks_reached {
				continue;
			}
		}
		if cost < cheapest_value {
			cheapest_value = cost;
			cheapest_ord = ordinal;
		}
	}
	cheapest_ord
}

/// Whether the cell is pathable
pub fn is_pathable(cell_value: u8) -> bool {
	cell_value & BITS_PATHABLE == BITS_PATHABLE
}
/// Whether the cell is a goal
pub fn is_goal(cell_value: u8) -> bool {
	cell_value & BITS_GOAL == BITS_GOAL
}
/// Whether the cell is a portal goal leading into another sector
pub fn is_portal_goal(cell_value: u8) -> bool {
	cell_value & BITS_PORTAL_GOAL == BITS_PORTAL_GOAL
}
/// Read the direction bits of a cell value
pub fn get_ordinal_from_bits(cell_value: u8) -> Ordinal {
	match cell_value & BITS_DIRECTION {
		BITS_NORTH => Ordinal::North,
		BITS_EAST => Ordinal::East,
		BITS_SOUTH => Ordinal::South,
		BITS_WEST => Ordinal::West,
		BITS_NORTH_EAST => Ordinal::NorthEast,
		BITS_SOUTH_EAST => Ordinal::SouthEast,
		BITS_SOUTH_WEST => Ordinal::SouthWest,
		BITS_NORTH_WEST => Ordinal::NorthWest,
		_ => Ordinal::Zero,
	}
}
