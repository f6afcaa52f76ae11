//! A [LosField] marks which cells of a sector have an unobstructed straight
//! line to a destination cell. An actor standing on a visible cell can ignore
//! its [FlowField] and steer directly at the destination.
//!
//! The field is built with a wavefront expanding from the destination over
//! terrain. Whenever the wave runs into an impassable cell which forms a
//! corner of an obstacle, a "shadow" ray is cast from the corner directly away
//! from the destination. Cells along the ray are wavefront-blocked and the
//! wave cannot expand through them, so the region behind the obstacle is never
//! reached:
//!
//! ```text
//!  ___________________________
//! |  |  |  |  |  |  |  |  |  |
//! |__|__|__|__|__|__|__|__|__|
//! |  |  |T |  |  |x |b |b |b |
//! |__|__|__|__|__|__|__|__|__|
//! |  |  |  |  |  |  |  |  |  |
//! |__|__|__|__|__|__|__|__|__|
//! ```
//!
//! Cells beside a ray are also treated as not visible to allow for actors
//! being wider than a line.
//!
//! Sectors further away than the destination sector are stitched from the
//! field of the next sector along the path: its border is copied across,
//! visible border cells seed the wavefront and blocked border cells continue
//! their rays.
//!

use std::{cmp::Ordering, collections::BinaryHeap};

use crate::prelude::*;

/// Flags a cell as having line of sight to the target
const BITS_VISIBLE: u8 = 0b0000_0001;
/// Flags a cell as lying along a shadow ray
const BITS_WAVEFRONT_BLOCKED: u8 = 0b0000_0010;

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct LosField([[u8; FIELD_RESOLUTION]; FIELD_RESOLUTION]);

impl Default for LosField {
	fn default() -> Self {
		LosField([[0; FIELD_RESOLUTION]; FIELD_RESOLUTION])
	}
}

impl Field<u8> for LosField {
	/// Get a reference to the field array
	fn get(&self) -> &[[u8; FIELD_RESOLUTION]; FIELD_RESOLUTION] {
		&self.0
	}
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, field_cell: FieldCell) -> u8 {
		if field_cell.get_column() >= self.0.len() || field_cell.get_row() >= self.0[0].len() {
			panic!("Cannot get a LosField value, index out of bounds. Asked for column {}, row {}, field column length is {}, field row length is {}", field_cell.get_column(), field_cell.get_row(), self.0.len(), self.0[0].len())
		}
		self.0[field_cell.get_column()][field_cell.get_row()]
	}
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: u8, field_cell: FieldCell) {
		if field_cell.get_column() >= self.0.len() || field_cell.get_row() >= self.0[0].len() {
			panic!("Cannot set a LosField value, index out of bounds. Asked for column {}, row {}, field column length is {}, field row length is {}", field_cell.get_column(), field_cell.get_row(), self.0.len(), self.0[0].len())
		}
		self.0[field_cell.get_column()][field_cell.get_row()] = value;
	}
}

impl LosField {
	/// Whether the cell can see the target
	pub fn is_visible(&self, field_cell: FieldCell) -> bool {
		self.get_field_cell_value(field_cell) & BITS_VISIBLE == BITS_VISIBLE
	}
	/// Whether the cell lies in the shadow of an obstacle corner
	pub fn is_wavefront_blocked(&self, field_cell: FieldCell) -> bool {
		self.get_field_cell_value(field_cell) & BITS_WAVEFRONT_BLOCKED == BITS_WAVEFRONT_BLOCKED
	}
	/// Build the field of the sector containing the target cell
	pub fn calculate_destination(cost_field: &CostField, sector_id: SectorID, target: FieldCell) -> Self {
		let origin = get_sector_global_origin(sector_id);
		let target_global = (
			origin.0 + target.get_column() as i32,
			origin.1 + target.get_row() as i32,
		);
		let mut wave = LosWave::new(cost_field, origin, target_global);
		wave.seed(target);
		wave.propagate();
		wave.into_field(Some(target))
	}
	/// Build the field of a sector from the already computed field of the
	/// adjacent `successor` sector which lies towards the target in direction `side`
	pub fn calculate_from_successor(
		cost_field: &CostField,
		sector_id: SectorID,
		target_global: (i32, i32),
		successor: &LosField,
		side: Ordinal,
	) -> Self {
		let origin = get_sector_global_origin(sector_id);
		let mut wave = LosWave::new(cost_field, origin, target_global);
		let border = get_boundary_cells(side);
		// rays first so seeds can't claim a shadowed cell
		for cell in border.iter() {
			let mirrored = successor.get_field_cell_value(cell.get_mirrored_boundary_cell(side));
			if mirrored & BITS_WAVEFRONT_BLOCKED == BITS_WAVEFRONT_BLOCKED {
				wave.cast_ray(*cell);
			}
		}
		for cell in border.iter() {
			let mirrored = successor.get_field_cell_value(cell.get_mirrored_boundary_cell(side));
			if mirrored & BITS_VISIBLE == BITS_VISIBLE
				&& cost_field.is_passable(*cell)
				&& !wave.is_blocked(*cell)
			{
				wave.seed(*cell);
			}
		}
		wave.propagate();
		wave.into_field(None)
	}
}

/// Map-wide cell coordinate of the top-left cell of a sector
fn get_sector_global_origin(sector_id: SectorID) -> (i32, i32) {
	(
		sector_id.get_column() as i32 * FIELD_RESOLUTION as i32,
		sector_id.get_row() as i32 * FIELD_RESOLUTION as i32,
	)
}

/// Cells along the `side` boundary of a sector
fn get_boundary_cells(side: Ordinal) -> Vec<FieldCell> {
	let last = FIELD_RESOLUTION - 1;
	(0..FIELD_RESOLUTION)
		.map(|i| match side {
			Ordinal::North => FieldCell::new(i, 0),
			Ordinal::East => FieldCell::new(last, i),
			Ordinal::South => FieldCell::new(i, last),
			Ordinal::West => FieldCell::new(0, i),
			_ => panic!("Sectors only share orthogonal boundaries, got {:?}", side),
		})
		.collect()
}

/// Entry of the wavefront ordered by distance from the target
#[derive(Clone, Copy, Debug)]
struct WaveCell {
	/// Straight line distance to the target
	distance: f32,
	/// Cell within the sector
	cell: FieldCell,
}

impl PartialEq for WaveCell {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for WaveCell {}

impl Ord for WaveCell {
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.distance
			.total_cmp(&self.distance)
			.then_with(|| other.cell.cmp(&self.cell))
	}
}

impl PartialOrd for WaveCell {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Working state of a single [LosField] calculation
struct LosWave<'a> {
	/// Terrain of the sector, blockers are ignored
	cost_field: &'a CostField,
	/// Map-wide coordinate of the sector's top-left cell
	origin: (i32, i32),
	/// Map-wide coordinate of the target
	target: (i32, i32),
	/// Cells the wave has reached
	reached: [[bool; FIELD_RESOLUTION]; FIELD_RESOLUTION],
	/// Cells lying along a shadow ray
	blocked: [[bool; FIELD_RESOLUTION]; FIELD_RESOLUTION],
	/// Impassable cells already tested for being a corner
	inspected: [[bool; FIELD_RESOLUTION]; FIELD_RESOLUTION],
	/// Every cell marked by a ray, in the order they were cast
	rays: Vec<FieldCell>,
	/// Frontier of the wave
	queue: BinaryHeap<WaveCell>,
}

impl<'a> LosWave<'a> {
	fn new(cost_field: &'a CostField, origin: (i32, i32), target: (i32, i32)) -> Self {
		LosWave {
			cost_field,
			origin,
			target,
			reached: [[false; FIELD_RESOLUTION]; FIELD_RESOLUTION],
			blocked: [[false; FIELD_RESOLUTION]; FIELD_RESOLUTION],
			inspected: [[false; FIELD_RESOLUTION]; FIELD_RESOLUTION],
			rays: Vec::new(),
			queue: BinaryHeap::new(),
		}
	}
	fn to_global(&self, cell: FieldCell) -> (i32, i32) {
		(
			self.origin.0 + cell.get_column() as i32,
			self.origin.1 + cell.get_row() as i32,
		)
	}
	fn to_local(&self, global: (i32, i32)) -> Option<FieldCell> {
		let c = global.0 - self.origin.0;
		let r = global.1 - self.origin.1;
		if c < 0 || r < 0 || c >= FIELD_RESOLUTION as i32 || r >= FIELD_RESOLUTION as i32 {
			None
		} else {
			Some(FieldCell::new(c as usize, r as usize))
		}
	}
	fn distance(&self, cell: FieldCell) -> f32 {
		let (c, r) = self.to_global(cell);
		let dc = (c - self.target.0) as f32;
		let dr = (r - self.target.1) as f32;
		(dc * dc + dr * dr).sqrt()
	}
	fn is_blocked(&self, cell: FieldCell) -> bool {
		self.blocked[cell.get_column()][cell.get_row()]
	}
	fn seed(&mut self, cell: FieldCell) {
		self.reached[cell.get_column()][cell.get_row()] = true;
		self.queue.push(WaveCell {
			distance: self.distance(cell),
			cell,
		});
	}
	/// An impassable cell is a corner when exactly one of its neighbours along
	/// an axis is impassable, or when it stands alone. Cells beyond the sector
	/// are treated as open
	fn is_corner(&self, cell: FieldCell) -> bool {
		let impassable = |ordinal: Ordinal| match cell.get_neighbour(ordinal) {
			Some(n) => !self.cost_field.is_passable(n),
			None => false,
		};
		let north = impassable(Ordinal::North);
		let south = impassable(Ordinal::South);
		let east = impassable(Ordinal::East);
		let west = impassable(Ordinal::West);
		(east ^ west) || (north ^ south) || !(north || south || east || west)
	}
	/// Mark the cells from `start` directly away from the target until the
	/// edge of the sector. Diagonal steps of the line gain an extra cell so the
	/// ray cannot be slipped through orthogonally
	fn cast_ray(&mut self, start: FieldCell) {
		let from = self.to_global(start);
		let delta = (from.0 - self.target.0, from.1 - self.target.1);
		self.mark_blocked(start);
		if delta == (0, 0) {
			return;
		}
		let steps = 2 * FIELD_RESOLUTION as i32 / delta.0.abs().max(delta.1.abs()) + 1;
		let end = (from.0 + delta.0 * steps, from.1 + delta.1 * steps);
		let line = get_global_cells_between_points(from, end);
		let mut previous = from;
		for global in line.into_iter().skip(1) {
			if global.0 != previous.0 && global.1 != previous.1 {
				if let Some(fill) = self.to_local((global.0, previous.1)) {
					self.mark_blocked(fill);
				}
			}
			match self.to_local(global) {
				Some(cell) => self.mark_blocked(cell),
				None => break,
			}
			previous = global;
		}
	}
	fn mark_blocked(&mut self, cell: FieldCell) {
		if !self.blocked[cell.get_column()][cell.get_row()] {
			self.blocked[cell.get_column()][cell.get_row()] = true;
			self.rays.push(cell);
		}
	}
	/// Expand the wave over passable cells nearest the target first
	fn propagate(&mut self) {
		while let Some(WaveCell { cell, .. }) = self.queue.pop() {
			for neighbour in cell.get_orthogonal_neighbours() {
				let (c, r) = neighbour.get_column_row();
				if self.reached[c][r] || self.blocked[c][r] {
					continue;
				}
				if !self.cost_field.is_passable(neighbour) {
					if !self.inspected[c][r] {
						self.inspected[c][r] = true;
						if self.is_corner(neighbour) {
							self.cast_ray(neighbour);
						}
					}
					continue;
				}
				self.seed(neighbour);
			}
		}
	}
	/// Resolve visibility, the `target` cell always sees itself
	fn into_field(self, target: Option<FieldCell>) -> LosField {
		let mut field = LosField::default();
		for column in 0..FIELD_RESOLUTION {
			for row in 0..FIELD_RESOLUTION {
				let mut value = 0;
				if self.reached[column][row] && !self.blocked[column][row] {
					value |= BITS_VISIBLE;
				}
				if self.blocked[column][row] {
					value |= BITS_WAVEFRONT_BLOCKED;
				}
				field.set_field_cell_value(value, FieldCell::new(column, row));
			}
		}
		for ray_cell in self.rays.iter() {
			if !self.cost_field.is_passable(*ray_cell) {
				continue;
			}
			for ordinal in Ordinal::FLOW_PRIORITY {
				if let Some(n) = ray_cell.get_neighbour(ordinal) {
					let value = field.get_field_cell_value(n);
					field.set_field_cell_value(value & !BITS_VISIBLE, n);
				}
			}
		}
		if let Some(t) = target {
			let value = field.get_field_cell_value(t);
			field.set_field_cell_value(value | BITS_VISIBLE, t);
		}
		field
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn open_sector_fully_visible() {
		let cost_field = CostField::default();
		let los = LosField::calculate_destination(&cost_field, SectorID::new(0, 0), FieldCell::new(10, 10));
		for column in 0..FIELD_RESOLUTION {
			for row in 0..FIELD_RESOLUTION {
				assert!(los.is_visible(FieldCell::new(column, row)));
			}
		}
	}
	#[test]
	fn pillar_casts_shadow() {
		//  ________________________
		// |__|__|__|__|__|__|__|__|
		// |T_|__|__|x_|b_|b_|b_|b_|
		// |__|__|__|__|__|__|__|__|
		let mut cost_field = CostField::default();
		cost_field.set_field_cell_value(255, FieldCell::new(10, 10));
		let los = LosField::calculate_destination(&cost_field, SectorID::new(0, 0), FieldCell::new(5, 10));
		assert!(!los.is_visible(FieldCell::new(20, 10)));
		assert!(los.is_wavefront_blocked(FieldCell::new(20, 10)));
		// padding beside the ray
		assert!(!los.is_visible(FieldCell::new(20, 9)));
		assert!(los.is_visible(FieldCell::new(20, 20)));
		assert!(los.is_visible(FieldCell::new(9, 10)));
		assert!(los.is_visible(FieldCell::new(5, 10)));
	}
	#[test]
	fn wall_hides_far_side() {
		let mut cost_field = CostField::default();
		for row in 0..=40 {
			cost_field.set_field_cell_value(255, FieldCell::new(20, row));
		}
		let los = LosField::calculate_destination(&cost_field, SectorID::new(0, 0), FieldCell::new(5, 5));
		assert!(!los.is_visible(FieldCell::new(30, 10)));
		assert!(!los.is_visible(FieldCell::new(50, 30)));
		assert!(los.is_visible(FieldCell::new(25, 60)));
		assert!(los.is_visible(FieldCell::new(10, 30)));
	}
	#[test]
	fn stitched_shadow_continues() {
		// target in sector (1, 0) with a pillar between it and sector (0, 0)
		let mut destination_cost = CostField::default();
		destination_cost.set_field_cell_value(255, FieldCell::new(2, 5));
		let destination = LosField::calculate_destination(
			&destination_cost,
			SectorID::new(1, 0),
			FieldCell::new(5, 5),
		);
		assert!(destination.is_wavefront_blocked(FieldCell::new(0, 5)));
		let stitched = LosField::calculate_from_successor(
			&CostField::default(),
			SectorID::new(0, 0),
			(69, 5),
			&destination,
			Ordinal::East,
		);
		assert!(stitched.is_wavefront_blocked(FieldCell::new(63, 5)));
		assert!(!stitched.is_visible(FieldCell::new(30, 5)));
		assert!(stitched.is_visible(FieldCell::new(30, 20)));
		assert!(stitched.is_visible(FieldCell::new(63, 30)));
	}
	#[test]
	fn stitched_from_unseen_border_is_dark() {
		let successor = LosField::default();
		let stitched = LosField::calculate_from_successor(
			&CostField::default(),
			SectorID::new(0, 0),
			(100, 10),
			&successor,
			Ordinal::East,
		);
		assert!(!stitched.is_visible(FieldCell::new(63, 10)));
		assert!(!stitched.is_visible(FieldCell::new(0, 0)));
	}
}
