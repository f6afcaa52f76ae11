//! Stationary actors and static objects occupy cells of the map. Their
//! [Footprint] is rasterized onto the cells of each [NavLayer], grown by the
//! footprint radius of the layer so that wider units keep their distance.
//!
//! ```text
//!  Ground1x1          Ground3x3
//!  ______________     ______________
//! |__|__|__|__|__|   |__|b_|b_|b_|__|
//! |__|__|b_|__|__|   |b_|b_|b_|b_|b_|
//! |__|b_|b_|b_|__|   |b_|b_|b_|b_|b_|
//! |__|__|b_|__|__|   |b_|b_|b_|b_|b_|
//! |__|__|__|__|__|   |__|b_|b_|b_|__|
//! ```
//!

use crate::prelude::*;
use bevy::prelude::*;

/// The shape an occupant covers in world space
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Footprint {
	Circle {
		centre: Vec2,
		radius: f32,
	},
	/// A rotated rectangle, `axis` is the direction of the box's local x axis
	OrientedBox {
		centre: Vec2,
		half_extents: Vec2,
		axis: Vec2,
	},
}

impl Footprint {
	pub fn get_centre(&self) -> Vec2 {
		match self {
			Footprint::Circle { centre, .. } => *centre,
			Footprint::OrientedBox { centre, .. } => *centre,
		}
	}
	/// Whether a world point lies within the shape grown by `dilation` world units
	fn contains(&self, point: Vec2, dilation: f32) -> bool {
		match self {
			Footprint::Circle { centre, radius } => point.distance(*centre) <= radius + dilation,
			Footprint::OrientedBox {
				centre,
				half_extents,
				axis,
			} => {
				let x_axis = axis.normalize_or(Vec2::X);
				let y_axis = x_axis.perp();
				let local = point - *centre;
				local.dot(x_axis).abs() <= half_extents.x + dilation
					&& local.dot(y_axis).abs() <= half_extents.y + dilation
			}
		}
	}
	/// Radius of a circle enclosing the shape
	fn get_bounding_radius(&self) -> f32 {
		match self {
			Footprint::Circle { radius, .. } => *radius,
			Footprint::OrientedBox { half_extents, .. } => half_extents.length(),
		}
	}
	/// Map-wide cells whose centres lie within the footprint once it has been
	/// grown by `dilation_cells` cells. The cell under the centre is always
	/// included and cells outside of the map are discarded
	pub fn rasterize(&self, map_dimensions: &MapDimensions, dilation_cells: usize) -> Vec<(i32, i32)> {
		let cell_size = map_dimensions.get_cell_size();
		let dilation = dilation_cells as f32 * cell_size;
		let reach = self.get_bounding_radius() + dilation + cell_size;
		let centre = self.get_centre();
		let min = map_dimensions.get_global_cell_from_xy(centre - Vec2::splat(reach));
		let max = map_dimensions.get_global_cell_from_xy(centre + Vec2::splat(reach));
		let in_map = |c: i32, r: i32| {
			c >= 0 && r >= 0 && c < map_dimensions.get_cell_columns() && r < map_dimensions.get_cell_rows()
		};
		let mut cells = Vec::new();
		for column in min.0..=max.0 {
			for row in min.1..=max.1 {
				if !in_map(column, row) {
					continue;
				}
				let point = map_dimensions.get_xy_from_global((column, row));
				if self.contains(point, dilation) {
					cells.push((column, row));
				}
			}
		}
		let centre_cell = map_dimensions.get_global_cell_from_xy(centre);
		if in_map(centre_cell.0, centre_cell.1) && !cells.contains(&centre_cell) {
			cells.push(centre_cell);
		}
		// the centre cell alone is grown into a square when the shape is smaller than a cell
		if dilation_cells > 0 {
			let d = dilation_cells as i32;
			for column in centre_cell.0 - d..=centre_cell.0 + d {
				for row in centre_cell.1 - d..=centre_cell.1 + d {
					if in_map(column, row) && !cells.contains(&(column, row)) {
						cells.push((column, row));
					}
				}
			}
		}
		cells
	}
}

/// Which factions are hostile to each other, relations are symmetric
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diplomacy([u16; MAX_FACTIONS]);

impl Diplomacy {
	/// Declare whether factions `a` and `b` are enemies
	pub fn set_relation(&mut self, a: u8, b: u8, enemies: bool) {
		if a as usize >= MAX_FACTIONS || b as usize >= MAX_FACTIONS {
			panic!("Factions {} and {} must be below {}", a, b, MAX_FACTIONS);
		}
		if enemies {
			self.0[a as usize] |= 1 << b;
			self.0[b as usize] |= 1 << a;
		} else {
			self.0[a as usize] &= !(1 << b);
			self.0[b as usize] &= !(1 << a);
		}
	}
	pub fn are_enemies(&self, a: u8, b: u8) -> bool {
		if a as usize >= MAX_FACTIONS || b as usize >= MAX_FACTIONS {
			return false;
		}
		self.0[a as usize] & (1 << b) != 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn circle_covers_centre() {
		let map_dimensions = MapDimensions::new(1, 1, 1.0, Vec2::ZERO);
		let footprint = Footprint::Circle {
			centre: Vec2::new(10.2, 10.7),
			radius: 0.1,
		};
		let result = footprint.rasterize(&map_dimensions, 0);
		assert_eq!(vec![(10, 10)], result);
	}
	#[test]
	fn circle_dilated() {
		let map_dimensions = MapDimensions::new(1, 1, 1.0, Vec2::ZERO);
		let footprint = Footprint::Circle {
			centre: Vec2::new(10.5, 10.5),
			radius: 0.1,
		};
		let result = footprint.rasterize(&map_dimensions, 1);
		assert_eq!(9, result.len());
		assert!(result.contains(&(9, 9)));
		assert!(result.contains(&(11, 11)));
	}
	#[test]
	fn circle_clipped_by_map() {
		let map_dimensions = MapDimensions::new(1, 1, 1.0, Vec2::ZERO);
		let footprint = Footprint::Circle {
			centre: Vec2::new(0.5, 0.5),
			radius: 2.0,
		};
		let result = footprint.rasterize(&map_dimensions, 0);
		assert!(result.iter().all(|(c, r)| *c >= 0 && *r >= 0));
		assert!(result.contains(&(2, 0)));
		assert!(!result.contains(&(2, 2)));
	}
	#[test]
	fn rotated_box() {
		let map_dimensions = MapDimensions::new(1, 1, 1.0, Vec2::ZERO);
		// a long thin box along the diagonal
		let footprint = Footprint::OrientedBox {
			centre: Vec2::new(20.5, 20.5),
			half_extents: Vec2::new(5.0, 0.5),
			axis: Vec2::new(1.0, 1.0),
		};
		let result = footprint.rasterize(&map_dimensions, 0);
		assert!(result.contains(&(23, 23)));
		assert!(result.contains(&(17, 17)));
		assert!(!result.contains(&(23, 17)));
	}
	#[test]
	fn diplomacy_is_symmetric() {
		let mut diplomacy = Diplomacy::default();
		diplomacy.set_relation(1, 4, true);
		assert!(diplomacy.are_enemies(4, 1));
		assert!(!diplomacy.are_enemies(1, 2));
		diplomacy.set_relation(4, 1, false);
		assert!(!diplomacy.are_enemies(1, 4));
	}
}
