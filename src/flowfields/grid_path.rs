//! A* search across the [FieldCell]s of a single sector. Used to find the
//! true walking cost between two portals of the same sector, the results are
//! memoised by the [FieldCache] as the same pairs are asked for every time a
//! sector's portals are rebuilt.
//!
//! Movement is 8-connected with diagonals costing `√2` times the cost of the
//! cell being entered. A diagonal step is only allowed when both orthogonal
//! cells it passes between are passable.
//!

use std::{cmp::Ordering, collections::BinaryHeap};

use crate::prelude::*;

/// The cells walked from a start to a finish within a sector and what it cost
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct GridPath {
	/// Ordered from start to finish inclusive
	cells: Vec<FieldCell>,
	/// Sum of the step costs
	cost: f32,
}

impl GridPath {
	pub fn get_cells(&self) -> &Vec<FieldCell> {
		&self.cells
	}
	pub fn get_cost(&self) -> f32 {
		self.cost
	}
}

/// Identifies a memoised [GridPath]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct GridPathKey {
	pub layer: NavLayer,
	pub sector: SectorID,
	pub start: FieldCell,
	pub finish: FieldCell,
}

/// Frontier entry ranked by estimated total cost
#[derive(Clone, Copy, Debug)]
struct Node {
	/// `g + h`
	estimate: f32,
	/// Cost from the start
	cost: f32,
	cell: FieldCell,
}

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for Node {}

impl Ord for Node {
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.estimate
			.total_cmp(&self.estimate)
			.then_with(|| self.cost.total_cmp(&other.cost))
			.then_with(|| other.cell.cmp(&self.cell))
	}
}

impl PartialOrd for Node {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Octile distance between two cells
fn octile(a: FieldCell, b: FieldCell) -> f32 {
	let dc = a.get_column().abs_diff(b.get_column()) as f32;
	let dr = a.get_row().abs_diff(b.get_row()) as f32;
	dc.max(dr) - dc.min(dr) + std::f32::consts::SQRT_2 * dc.min(dr)
}

/// Find the cheapest route between two cells of a [CostField], [None] if
/// either end is impassable or they are not connected
pub fn find_grid_path(cost_field: &CostField, start: FieldCell, finish: FieldCell) -> Option<GridPath> {
	if !cost_field.is_passable(start) || !cost_field.is_passable(finish) {
		return None;
	}
	let mut best = [[f32::INFINITY; FIELD_RESOLUTION]; FIELD_RESOLUTION];
	let mut came_from: [[Option<FieldCell>; FIELD_RESOLUTION]; FIELD_RESOLUTION] =
		[[None; FIELD_RESOLUTION]; FIELD_RESOLUTION];
	let mut open = BinaryHeap::new();
	best[start.get_column()][start.get_row()] = 0.0;
	open.push(Node {
		estimate: octile(start, finish),
		cost: 0.0,
		cell: start,
	});
	while let Some(Node { cost, cell, .. }) = open.pop() {
		if cell == finish {
			let mut cells = vec![finish];
			let mut current = finish;
			while let Some(previous) = came_from[current.get_column()][current.get_row()] {
				cells.push(previous);
				current = previous;
			}
			cells.reverse();
			return Some(GridPath { cells, cost });
		}
		if cost > best[cell.get_column()][cell.get_row()] {
			continue;
		}
		for ordinal in Ordinal::FLOW_PRIORITY {
			let Some(next) = cell.get_neighbour(ordinal) else {
				continue;
			};
			if !cost_field.is_passable(next) {
				continue;
			}
			if let Some((a, b)) = ordinal.get_flanks() {
				let flanks_open = [a, b].iter().all(|flank| {
					cell.get_neighbour(*flank)
						.is_some_and(|f| cost_field.is_passable(f))
				});
				if !flanks_open {
					continue;
				}
			}
			let mut step = cost_field.get_field_cell_value(next) as f32;
			if ordinal.is_diagonal() {
				step *= std::f32::consts::SQRT_2;
			}
			let next_cost = cost + step;
			if next_cost < best[next.get_column()][next.get_row()] {
				best[next.get_column()][next.get_row()] = next_cost;
				came_from[next.get_column()][next.get_row()] = Some(cell);
				open.push(Node {
					estimate: next_cost + octile(next, finish),
					cost: next_cost,
					cell: next,
				});
			}
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn straight_line() {
		let cost_field = CostField::default();
		let result = find_grid_path(&cost_field, FieldCell::new(0, 5), FieldCell::new(10, 5)).unwrap();
		assert_eq!(10.0, result.get_cost());
		assert_eq!(11, result.get_cells().len());
		assert_eq!(FieldCell::new(0, 5), result.get_cells()[0]);
		assert_eq!(FieldCell::new(10, 5), *result.get_cells().last().unwrap());
	}
	#[test]
	fn diagonal_line() {
		let cost_field = CostField::default();
		let result = find_grid_path(&cost_field, FieldCell::new(0, 0), FieldCell::new(3, 3)).unwrap();
		assert!((result.get_cost() - 3.0 * std::f32::consts::SQRT_2).abs() < 1e-4);
	}
	#[test]
	fn around_a_wall() {
		//  _______________
		// |S_|__|x_|__|F_|
		// |__|__|x_|__|__|
		// |__|__|__|__|__|
		let mut cost_field = CostField::default();
		for row in 0..10 {
			cost_field.set_field_cell_value(255, FieldCell::new(2, row));
		}
		let result = find_grid_path(&cost_field, FieldCell::new(0, 0), FieldCell::new(4, 0)).unwrap();
		assert!(result.get_cost() > 4.0);
		assert!(result
			.get_cells()
			.iter()
			.all(|c| cost_field.is_passable(*c)));
	}
	#[test]
	fn no_route() {
		let mut cost_field = CostField::default();
		for row in 0..FIELD_RESOLUTION {
			cost_field.set_field_cell_value(255, FieldCell::new(2, row));
		}
		let result = find_grid_path(&cost_field, FieldCell::new(0, 0), FieldCell::new(4, 0));
		assert!(result.is_none());
	}
	#[test]
	fn impassable_end() {
		let mut cost_field = CostField::default();
		cost_field.set_field_cell_value(255, FieldCell::new(4, 0));
		let result = find_grid_path(&cost_field, FieldCell::new(0, 0), FieldCell::new(4, 0));
		assert!(result.is_none());
	}
}
