//! When an agent needs to path to another sector the route is first found at
//! the level of portals. The graph is implicit in the [Portal]s of each
//! sector: a node is a portal paired with the local island it is approached
//! on, so the same portal reached from either side of a line of blockers is
//! treated as two distinct places.
//!
//! From a node there are two kinds of move:
//!
//! * along an active [PortalEdge] to another portal of the same sector that
//! touches the same local island, costing the edge plus a per-hop penalty the
//! length of a sector diagonal (favouring fewer portal hops)
//! * across the boundary into the twin portal, entering each local island the
//! crossing cells lead onto, at a cost of `1`
//!
//! ```text
//!  sector (0, 0)   sector (1, 0)   sector (2, 0)
//!  _____________   _____________   _____________
//! |             | |             | |             |
//! |  S ------> P1-P2 -------> P3-P4 ----> T     |
//! |_____________| |_____________| |_____________|
//! ```
//!
//! The search is Dijkstra (no heuristic) and finishes on the first pop of the
//! target node. The result is the list of boundary crossings, each of which
//! becomes a portal [FlowField] of the sector it leaves.
//!

use std::{
	cmp::Ordering,
	collections::{BinaryHeap, HashMap, HashSet},
};

use bevy::prelude::*;

use crate::prelude::*;

/// Cost of stepping from a portal into its twin
const PORTAL_CROSSING_COST: f32 = 1.0;

/// One boundary crossing of a route
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortalHop {
	/// Sector being left
	sector: SectorID,
	/// Portal of `sector` the route leaves through
	portal: usize,
	/// Local island of `sector` the route approaches the portal on
	port_island: u16,
	/// Local island of the next sector the route arrives on
	next_island: u16,
}

impl PortalHop {
	pub fn get_sector(&self) -> SectorID {
		self.sector
	}
	pub fn get_portal(&self) -> usize {
		self.portal
	}
	pub fn get_port_island(&self) -> u16 {
		self.port_island
	}
	pub fn get_next_island(&self) -> u16 {
		self.next_island
	}
}

/// The portal a search is trying to reach. When `island` is [None] arriving
/// at the portal on any local island will do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortalTarget {
	pub sector: SectorID,
	pub portal: usize,
	pub island: Option<u16>,
}

/// A portal approached on a local island
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct SearchNode {
	sector: SectorID,
	portal: usize,
	island: u16,
}

#[derive(Clone, Copy, Debug)]
struct Frontier {
	cost: f32,
	node: SearchNode,
}

impl PartialEq for Frontier {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for Frontier {}

impl Ord for Frontier {
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.cost
			.total_cmp(&self.cost)
			.then_with(|| other.node.cmp(&self.node))
	}
}

impl PartialOrd for Frontier {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Portals of `sector_id` the route may start from, paired with the local
/// island they are approached on and the travel cost from `source_cell`.
/// With no `source_island` every island of every portal is a candidate
fn get_start_nodes(
	layer_sectors: &LayerSectors,
	sector_id: SectorID,
	source_cell: FieldCell,
	source_island: Option<u16>,
) -> Vec<(SearchNode, f32)> {
	let sector = layer_sectors.get_sector(&sector_id);
	let mut starts = Vec::new();
	for portal in 0..sector.get_portals().len() {
		let travel = sector.get_travel_cost(portal, source_cell);
		if !travel.is_finite() {
			continue;
		}
		let islands = match source_island {
			Some(island) if sector.does_portal_touch_island(portal, island) => vec![island],
			Some(_) => continue,
			None => sector.get_portal_islands(portal),
		};
		for island in islands {
			starts.push((
				SearchNode {
					sector: sector_id,
					portal,
					island,
				},
				travel,
			));
		}
	}
	starts
}

/// Component IDs of the portals a search from `source_cell` could start on
pub fn get_start_components(
	layer_sectors: &LayerSectors,
	sector_id: SectorID,
	source_cell: FieldCell,
	source_island: Option<u16>,
) -> HashSet<u32> {
	get_start_nodes(layer_sectors, sector_id, source_cell, source_island)
		.iter()
		.map(|(node, _)| {
			layer_sectors
				.get_portal(&node.sector, node.portal)
				.get_component_id()
		})
		.collect()
}

/// Moves available from a node and what they cost
fn get_neighbours(layer_sectors: &LayerSectors, node: &SearchNode, hop_penalty: f32) -> Vec<(SearchNode, f32)> {
	let sector = layer_sectors.get_sector(&node.sector);
	let portal = &sector.get_portals()[node.portal];
	let mut neighbours = Vec::new();
	for edge in portal.get_edges().iter().filter(|e| e.is_active()) {
		if sector.does_portal_touch_island(edge.get_target(), node.island) {
			neighbours.push((
				SearchNode {
					sector: node.sector,
					portal: edge.get_target(),
					island: node.island,
				},
				edge.get_cost() + hop_penalty,
			));
		}
	}
	let (twin_sector, twin_portal) = portal.get_connected();
	let mut arrivals = Vec::new();
	for cell in portal.get_cells() {
		if sector.get_local_island(cell) != node.island {
			continue;
		}
		let next = layer_sectors.get_mirrored_local_island(&node.sector, cell, portal.get_side());
		if next != ISLAND_NONE && !arrivals.contains(&next) {
			arrivals.push(next);
		}
	}
	for island in arrivals {
		neighbours.push((
			SearchNode {
				sector: twin_sector,
				portal: twin_portal,
				island,
			},
			PORTAL_CROSSING_COST,
		));
	}
	neighbours
}

/// Search the portal graph of a layer for a route from a cell of
/// `source_sector` to the `target` portal. The route is returned as the
/// ordered list of boundary crossings, an empty list means the target portal
/// can be reached without leaving the source sector
pub fn find_portal_route(
	layer_sectors: &LayerSectors,
	source_sector: SectorID,
	source_cell: FieldCell,
	source_island: Option<u16>,
	target: PortalTarget,
) -> Option<Vec<PortalHop>> {
	let starts = get_start_nodes(layer_sectors, source_sector, source_cell, source_island);
	let target_component = layer_sectors
		.get_portal(&target.sector, target.portal)
		.get_component_id();
	let reachable = starts.iter().any(|(node, _)| {
		layer_sectors
			.get_portal(&node.sector, node.portal)
			.get_component_id()
			== target_component
	});
	if !reachable {
		trace!("Portal target {:?} is in a different component", target);
		return None;
	}
	let is_target = |node: &SearchNode| {
		node.sector == target.sector
			&& node.portal == target.portal
			&& target.island.is_none_or(|island| island == node.island)
	};
	let hop_penalty = layer_sectors.get_map_dimensions().get_sector_diagonal();
	let mut best: HashMap<SearchNode, f32> = HashMap::new();
	let mut came_from: HashMap<SearchNode, SearchNode> = HashMap::new();
	let mut queue = BinaryHeap::new();
	for (node, cost) in starts {
		if cost < *best.get(&node).unwrap_or(&f32::INFINITY) {
			best.insert(node, cost);
			queue.push(Frontier { cost, node });
		}
	}
	while let Some(Frontier { cost, node }) = queue.pop() {
		if cost > *best.get(&node).unwrap_or(&f32::INFINITY) {
			continue;
		}
		if is_target(&node) {
			let mut route = Vec::new();
			let mut current = node;
			while let Some(previous) = came_from.get(&current) {
				if previous.sector != current.sector {
					route.push(PortalHop {
						sector: previous.sector,
						portal: previous.portal,
						port_island: previous.island,
						next_island: current.island,
					});
				}
				current = *previous;
			}
			route.reverse();
			return Some(route);
		}
		for (next, step) in get_neighbours(layer_sectors, &node, hop_penalty) {
			let next_cost = cost + step;
			if next_cost < *best.get(&next).unwrap_or(&f32::INFINITY) {
				best.insert(next, next_cost);
				came_from.insert(next, node);
				queue.push(Frontier {
					cost: next_cost,
					node: next,
				});
			}
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	/// Three sectors in a row divided by walls with a single gap in each
	fn gapped_corridor() -> (LayerSectors, FieldCache) {
		let terrain = TerrainMap::new(3, 1);
		let map_dimensions = MapDimensions::new(3, 1, 1.0, Vec2::ZERO);
		let mut layer_sectors = LayerSectors::new(NavLayer::Ground1x1, &terrain, map_dimensions);
		for sector in 0..2 {
			let sector_id = SectorID::new(sector, 0);
			for row in 0..FIELD_RESOLUTION {
				if !(30..34).contains(&row) {
					layer_sectors
						.get_sector_mut(&sector_id)
						.add_cutout(FieldCell::new(FIELD_RESOLUTION - 1, row));
				}
			}
		}
		let mut field_cache = FieldCache::new(FieldCacheConfig::default());
		layer_sectors.rebuild(&mut field_cache);
		(layer_sectors, field_cache)
	}
	#[test]
	fn route_across_two_boundaries() {
		let (layer_sectors, _) = gapped_corridor();
		let target = PortalTarget {
			sector: SectorID::new(2, 0),
			portal: 0,
			island: Some(0),
		};
		let route = find_portal_route(
			&layer_sectors,
			SectorID::new(0, 0),
			FieldCell::new(5, 5),
			Some(0),
			target,
		)
		.unwrap();
		assert_eq!(2, route.len());
		assert_eq!(SectorID::new(0, 0), route[0].get_sector());
		assert_eq!(SectorID::new(1, 0), route[1].get_sector());
	}
	#[test]
	fn blocked_middle_sector_splits_components() {
		let (mut layer_sectors, _) = gapped_corridor();
		let middle = SectorID::new(1, 0);
		for row in 0..FIELD_RESOLUTION {
			layer_sectors
				.get_sector_mut(&middle)
				.increment_blocker(FieldCell::new(20, row), 0);
		}
		calculate_local_islands(layer_sectors.get_sector_mut(&middle));
		assert!(update_edge_states(layer_sectors.get_sector_mut(&middle)));
		calculate_portal_components(&mut layer_sectors);
		let target = PortalTarget {
			sector: SectorID::new(2, 0),
			portal: 0,
			island: None,
		};
		let route = find_portal_route(
			&layer_sectors,
			SectorID::new(0, 0),
			FieldCell::new(5, 5),
			Some(0),
			target,
		);
		assert!(route.is_none());
	}
	#[test]
	fn target_on_start_portal() {
		let (layer_sectors, _) = gapped_corridor();
		let target = PortalTarget {
			sector: SectorID::new(0, 0),
			portal: 0,
			island: None,
		};
		let route = find_portal_route(
			&layer_sectors,
			SectorID::new(0, 0),
			FieldCell::new(5, 5),
			Some(0),
			target,
		)
		.unwrap();
		assert!(route.is_empty());
	}
}
