//! Useful structures and tools used by the fields
//!

use bevy::prelude::*;

/// Defines the dimensions of all field arrays, a sector is `FIELD_RESOLUTION x FIELD_RESOLUTION` [crate::prelude::FieldCell]s
pub const FIELD_RESOLUTION: usize = 64;
/// Number of terrain tiles along one side of a sector
pub const TILES_PER_SECTOR: usize = 32;
/// Each terrain tile covers a `CELLS_PER_TILE x CELLS_PER_TILE` block of field cells
pub const CELLS_PER_TILE: usize = FIELD_RESOLUTION / TILES_PER_SECTOR;
/// Cost value marking a field cell as forbidden
pub const COST_IMPASSABLE: u8 = 255;
/// Upper bound of portals any sector may own
pub const MAX_PORTALS_PER_SECTOR: usize = 64;
/// Number of factions tracked by blocker occupancy
pub const MAX_FACTIONS: usize = 16;
/// Sentinel island ID for impassable (or, for local islands, blocked) cells
pub const ISLAND_NONE: u16 = u16::MAX;
/// Maximum number of async field jobs queued between two joins
pub const MAX_ASYNC_FIELD_JOBS: usize = 1024;

/// Convenience way of accessing the 4 sides of a sector and the 8 directions
/// of movement in a [crate::prelude::FlowField]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum Ordinal {
	North,
	East,
	South,
	West,
	NorthEast,
	SouthEast,
	SouthWest,
	NorthWest,
	/// Special case, used to indicate a cell without a direction
	Zero,
}

impl Ordinal {
	/// Orthogonal directions in the order used when scanning sector boundaries
	pub const ORTHOGONAL: [Ordinal; 4] = [
		Ordinal::North,
		Ordinal::East,
		Ordinal::South,
		Ordinal::West,
	];
	/// Candidate directions in tie-break priority order when converting an
	/// integration field into flow directions
	pub const FLOW_PRIORITY: [Ordinal; 8] = [
		Ordinal::North,
		Ordinal::South,
		Ordinal::East,
		Ordinal::West,
		Ordinal::NorthWest,
		Ordinal::NorthEast,
		Ordinal::SouthWest,
		Ordinal::SouthEast,
	];
	/// `(column, row)` step taken when moving in this direction, north is a decreasing row
	pub fn get_offset(&self) -> (i32, i32) {
		match self {
			Ordinal::North => (0, -1),
			Ordinal::East => (1, 0),
			Ordinal::South => (0, 1),
			Ordinal::West => (-1, 0),
			Ordinal::NorthEast => (1, -1),
			Ordinal::SouthEast => (1, 1),
			Ordinal::SouthWest => (-1, 1),
			Ordinal::NorthWest => (-1, -1),
			Ordinal::Zero => (0, 0),
		}
	}
	/// Whether the direction is one of the four diagonals
	pub fn is_diagonal(&self) -> bool {
		matches!(
			self,
			Ordinal::NorthEast | Ordinal::SouthEast | Ordinal::SouthWest | Ordinal::NorthWest
		)
	}
	/// The two orthogonal directions flanking a diagonal, e.g `NorthEast` is flanked by `North` and `East`
	pub fn get_flanks(&self) -> Option<(Ordinal, Ordinal)> {
		match self {
			Ordinal::NorthEast => Some((Ordinal::North, Ordinal::East)),
			Ordinal::SouthEast => Some((Ordinal::South, Ordinal::East)),
			Ordinal::SouthWest => Some((Ordinal::South, Ordinal::West)),
			Ordinal::NorthWest => Some((Ordinal::North, Ordinal::West)),
			_ => None,
		}
	}
	/// Returns the opposite [Ordinal] of the current
	pub fn inverse(&self) -> Ordinal {
		match self {
			Ordinal::North => Ordinal::South,
			Ordinal::East => Ordinal::West,
			Ordinal::South => Ordinal::North,
			Ordinal::West => Ordinal::East,
			Ordinal::NorthEast => Ordinal::SouthWest,
			Ordinal::SouthEast => Ordinal::NorthWest,
			Ordinal::SouthWest => Ordinal::NorthEast,
			Ordinal::NorthWest => Ordinal::SouthEast,
			Ordinal::Zero => Ordinal::Zero,
		}
	}
	/// Unit vector of the direction in world space where north points along `-y`
	pub fn to_vec2(&self) -> Vec2 {
		let (c, r) = self.get_offset();
		Vec2::new(c as f32, r as f32).normalize_or_zero()
	}
	/// For two cells next to each other it can be useful to find the [Ordinal] pointing from the `source` to the `target`
	pub fn cell_to_cell_direction(target: (usize, usize), source: (usize, usize)) -> Self {
		let direction = (
			target.0 as i32 - source.0 as i32,
			target.1 as i32 - source.1 as i32,
		);
		match direction {
			(0, -1) => Ordinal::North,
			(1, -1) => Ordinal::NorthEast,
			(1, 0) => Ordinal::East,
			(1, 1) => Ordinal::SouthEast,
			(0, 1) => Ordinal::South,
			(-1, 1) => Ordinal::SouthWest,
			(-1, 0) => Ordinal::West,
			(-1, -1) => Ordinal::NorthWest,
			_ => panic!(
				"Cell {:?} is not orthogonally or diagonally adjacent to {:?}",
				target, source
			),
		}
	}
	/// For two sectors next to each other find the [Ordinal] from the `source` to the `target`. Returns [None] if the sectors are not orthogonally adjacent
	pub fn sector_to_sector_direction(target: (u32, u32), source: (u32, u32)) -> Option<Self> {
		let direction = (
			target.0 as i32 - source.0 as i32,
			target.1 as i32 - source.1 as i32,
		);
		match direction {
			(0, -1) => Some(Ordinal::North),
			(1, 0) => Some(Ordinal::East),
			(0, 1) => Some(Ordinal::South),
			(-1, 0) => Some(Ordinal::West),
			_ => {
				error!(
					"Sector {:?} is not orthogonally adjacent to {:?}",
					target, source
				);
				None
			}
		}
	}
}

/// Independent navigation views of the same terrain, distinguished by
/// locomotion domain and the footprint of the units using them
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum NavLayer {
	Ground1x1,
	Ground3x3,
	Ground5x5,
	Ground7x7,
	Water1x1,
	Air1x1,
}

impl NavLayer {
	/// Every layer in index order
	pub const ALL: [NavLayer; 6] = [
		NavLayer::Ground1x1,
		NavLayer::Ground3x3,
		NavLayer::Ground5x5,
		NavLayer::Ground7x7,
		NavLayer::Water1x1,
		NavLayer::Air1x1,
	];
	/// Number of layers
	pub const COUNT: usize = 6;
	/// Position of the layer within [NavLayer::ALL]
	pub fn get_index(&self) -> usize {
		*self as usize
	}
	/// Inverse of [NavLayer::get_index]
	pub fn from_index(index: usize) -> Option<NavLayer> {
		NavLayer::ALL.get(index).copied()
	}
	/// Number of field cells a unit on this layer extends beyond its centre cell
	pub fn get_footprint_radius(&self) -> usize {
		match self {
			NavLayer::Ground1x1 => 0,
			NavLayer::Ground3x3 => 1,
			NavLayer::Ground5x5 => 2,
			NavLayer::Ground7x7 => 3,
			NavLayer::Water1x1 => 0,
			NavLayer::Air1x1 => 0,
		}
	}
	/// Locomotion domain of the layer
	pub fn get_domain(&self) -> NavDomain {
		match self {
			NavLayer::Ground1x1 | NavLayer::Ground3x3 | NavLayer::Ground5x5 | NavLayer::Ground7x7 => {
				NavDomain::Ground
			}
			NavLayer::Water1x1 => NavDomain::Water,
			NavLayer::Air1x1 => NavDomain::Air,
		}
	}
}

/// How units of a [NavLayer] get around
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NavDomain {
	/// Dry, pathable terrain without cliffs
	Ground,
	/// Submerged terrain only
	Water,
	/// Anywhere on the map
	Air,
}
