//! The IntegrationField contains a 2D array of `f32` values and it uses a cost lookup to
//! produce a cumulative cost of reaching the goal/target.
//!
//! When a field is calculated every cell is reset to `f32::INFINITY` and the cells of the goals
//! (seeds) are set to `0`. A multi-source wavefront then expands from the seeds:
//!
//! 1. The cheapest cell on the frontier is popped
//! 2. Its 8 neighbours are inspected, a diagonal neighbour is only considered when both
//! orthogonal cells flanking the move are passable so the wave never cuts a corner
//! 3. The neighbour's cost is added to the popped cell's integration cost (scaled by `√2`
//! for diagonals) and if it improves on the neighbour's value the neighbour joins the frontier
//!
//! With a uniform cost of `1` this produces an octagonal pattern around a single seed:
//!
//! ```text
//!  _______________________________
//! |     |     |     |     |     |
//! | 2.8 | 2.4 |  2  | 2.4 | 2.8 |
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! | 2.4 | 1.4 |  1  | 1.4 | 2.4 |
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |  2  |  1  |  0  |  1  |  2  |
//! |_____|_____|_____|_____|_____|
//! ```
//!
//! Cells with an impassable cost (`255`) are never entered so the wave flows around those areas.
//!
//! Fields are usually the size of a sector but enemy and entity targets use an oversized field
//! centred on the sector so that targets just beyond its boundary still pull on it.
//!

use std::{cmp::Ordering, collections::BinaryHeap};

use crate::prelude::*;

/// Entry of the wavefront frontier
#[derive(Clone, Copy, Debug)]
struct Frontier {
	/// Integration cost of reaching the cell
	cost: f32,
	/// `(column, row)` of the cell
	cell: (usize, usize),
}

impl PartialEq for Frontier {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for Frontier {}

impl Ord for Frontier {
	fn cmp(&self, other: &Self) -> Ordering {
		// reversed to turn the max-heap into a min-heap, ties broken on position for determinism
		other
			.cost
			.total_cmp(&self.cost)
			.then_with(|| other.cell.cmp(&self.cell))
	}
}

impl PartialOrd for Frontier {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct IntegrationField {
	/// Number of columns
	columns: usize,
	/// Number of rows
	rows: usize,
	/// Costs indexed `column * rows + row`
	costs: Vec<f32>,
}

impl Default for IntegrationField {
	fn default() -> Self {
		IntegrationField::new(FIELD_RESOLUTION, FIELD_RESOLUTION)
	}
}

impl IntegrationField {
	/// Creates a new [IntegrationField] where all cells are unreached
	pub fn new(columns: usize, rows: usize) -> Self {
		IntegrationField {
			columns,
			rows,
			costs: vec![f32::INFINITY; columns * rows],
		}
	}
	pub fn get_columns(&self) -> usize {
		self.columns
	}
	pub fn get_rows(&self) -> usize {
		self.rows
	}
	/// Retrieve a cell value
	pub fn get_cost(&self, column: usize, row: usize) -> f32 {
		if column >= self.columns || row >= self.rows {
			panic!("Cannot get a IntegrationField value, index out of bounds. Asked for column {}, row {}, field column length is {}, field row length is {}", column, row, self.columns, self.rows)
		}
		self.costs[column * self.rows + row]
	}
	/// Set a cell to a value
	pub fn set_cost(&mut self, value: f32, column: usize, row: usize) {
		if column >= self.columns || row >= self.rows {
			panic!("Cannot set a IntegrationField value, index out of bounds. Asked for column {}, row {}, field column length is {}, field row length is {}", column, row, self.columns, self.rows)
		}
		self.costs[column * self.rows + row] = value;
	}
	/// Cost of the neighbour of `(column, row)` in direction `ordinal`, [None] outside the field
	pub fn get_neighbour_cost(&self, column: usize, row: usize, ordinal: Ordinal) -> Option<f32> {
		let (dc, dr) = ordinal.get_offset();
		let c = column as i32 + dc;
		let r = row as i32 + dr;
		if c < 0 || r < 0 || c >= self.columns as i32 || r >= self.rows as i32 {
			None
		} else {
			Some(self.get_cost(c as usize, r as usize))
		}
	}
	/// Reset all the cells to unreached
	pub fn reset(&mut self) {
		self.costs.iter_mut().for_each(|c| *c = f32::INFINITY);
	}
	/// Whether the wavefront reached the cell
	pub fn is_reached(&self, column: usize, row: usize) -> bool {
		self.get_cost(column, row).is_finite()
	}
	/// From a list of `seeds` (the actual end target goal or portal cells to the next sector
	/// towards the goal) iterate over successive neighbouring cells and calculate the field
	/// values from the `cost` lookup. The lookup returns [COST_IMPASSABLE] for any cell that
	/// must not be entered. Cells left unreached keep whatever value they already held so a
	/// field may be extended with further seeds
	pub fn calculate_field<F>(&mut self, seeds: &[(usize, usize)], cost: F)
	where
		F: Fn(usize, usize) -> u8,
	{
		let mut queue = BinaryHeap::new();
		for seed in seeds.iter() {
			self.set_cost(0.0, seed.0, seed.1);
			queue.push(Frontier {
				cost: 0.0,
				cell: *seed,
			});
		}
		while let Some(Frontier { cost: current, cell }) = queue.pop() {
			if current > self.get_cost(cell.0, cell.1) {
				// a cheaper route to this cell has already been expanded
				continue;
			}
			for ordinal in Ordinal::FLOW_PRIORITY {
				let Some(next) = self.step(cell, ordinal) else {
					continue;
				};
				let next_cost = cost(next.0, next.1);
				if next_cost == COST_IMPASSABLE {
					continue;
				}
				if let Some((a, b)) = ordinal.get_flanks() {
					let blocked_flank = [a, b].iter().any(|flank| match self.step(cell, *flank) {
						Some(f) => cost(f.0, f.1) == COST_IMPASSABLE,
						None => true,
					});
					if blocked_flank {
						continue;
					}
				}
				let step_cost = if ordinal.is_diagonal() {
					next_cost as f32 * std::f32::consts::SQRT_2
				} else {
					next_cost as f32
				};
				let int_cost = current + step_cost;
				// don't overwrite an int cell with a better cost
				if int_cost < self.get_cost(next.0, next.1) {
					self.set_cost(int_cost, next.0, next.1);
					queue.push(Frontier {
						cost: int_cost,
						cell: next,
					});
				}
			}
		}
	}
	/// The cell one step from `cell` in `ordinal`, [None] outside the field
	fn step(&self, cell: (usize, usize), ordinal: Ordinal) -> Option<(usize, usize)> {
		let (dc, dr) = ordinal.get_offset();
		let c = cell.0 as i32 + dc;
		let r = cell.1 as i32 + dr;
		if c < 0 || r < 0 || c >= self.columns as i32 || r >= self.rows as i32 {
			None
		} else {
			Some((c as usize, r as usize))
		}
	}
}
