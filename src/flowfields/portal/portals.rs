//! A Portal indicates a pathable window from one sector into another. Each
//! side of a sector can have multiple portals if a side is 'split' due to an
//! impassable value in either of the two neighbouring [CostField]s. A side that
//! sits along the edge of the map itself cannot have a portal. For example
//! here is the boundary between two sectors where the labelled cells `P` form
//! two portals, each paired with its twin in the other sector:
//!
//! ```text
//!    sector (0, 0)        sector (1, 0)
//!  ____________________ ____________________
//! |     |     |     |     |     |     |
//! |  1  |  1  |  P  |  P  |  1  |  1  |
//! |_____|_____|_____|_____|_____|_____|
//! |     |     |     |     |     |     |
//! |  1  |  1  |  P  |  P  |  1  |  1  |
//! |_____|_____|_____|_____|_____|_____|
//! |     |     |     |     |     |     |
//! |  1  |  1  |  1  | 255 |  1  |  1  |
//! |_____|_____|_____|_____|_____|_____|
//! |     |     |     |     |     |     |
//! |  1  |  1  |  P  |  P  |  1  |  1  |
//! |_____|_____|_____|_____|_____|_____|
//! ```
//!
//! Within a sector every pair of portals which can reach each other over the
//! terrain is joined by a [PortalEdge] whose cost is the A* walking distance
//! between their midpoints. Edges are flagged [EdgeState::Blocked] when
//! blockers split the two portals onto different local islands.
//!

use std::collections::HashMap;

use bevy::prelude::*;

use crate::prelude::*;

/// Whether a [PortalEdge] can currently be walked
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeState {
	Active,
	Blocked,
}

/// A route between two portals of the same sector
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PortalEdge {
	/// Index of the portal at the other end within the same sector
	target: usize,
	/// Walking cost between the portal midpoints
	cost: f32,
	state: EdgeState,
}

impl PortalEdge {
	pub fn new(target: usize, cost: f32) -> Self {
		PortalEdge {
			target,
			cost,
			state: EdgeState::Blocked,
		}
	}
	pub fn get_target(&self) -> usize {
		self.target
	}
	pub fn get_cost(&self) -> f32 {
		self.cost
	}
	pub fn get_state(&self) -> EdgeState {
		self.state
	}
	pub fn set_state(&mut self, state: EdgeState) {
		self.state = state;
	}
	pub fn is_active(&self) -> bool {
		self.state == EdgeState::Active
	}
}

/// A contiguous run of boundary cells passable on both sides of a sector boundary
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Portal {
	/// Boundary of the sector the portal lies along
	side: Ordinal,
	/// First and last cell of the run, ordered by increasing column or row
	endpoints: [FieldCell; 2],
	/// The twin portal in the neighbouring sector and its index there
	connected: (SectorID, usize),
	/// Routes to the other portals of this sector
	edges: Vec<PortalEdge>,
	/// Connected component of the portal graph
	component_id: u32,
}

impl Portal {
	pub fn new(side: Ordinal, endpoints: [FieldCell; 2], connected: (SectorID, usize)) -> Self {
		for endpoint in endpoints.iter() {
			if !endpoint.is_on_boundary(side) {
				panic!(
					"Portal endpoint {:?} does not lie on the {:?} boundary",
					endpoint, side
				);
			}
		}
		Portal {
			side,
			endpoints,
			connected,
			edges: Vec::new(),
			component_id: 0,
		}
	}
	pub fn get_side(&self) -> Ordinal {
		self.side
	}
	pub fn get_endpoints(&self) -> &[FieldCell; 2] {
		&self.endpoints
	}
	pub fn get_connected(&self) -> (SectorID, usize) {
		self.connected
	}
	pub fn get_edges(&self) -> &Vec<PortalEdge> {
		&self.edges
	}
	pub fn get_edges_mut(&mut self) -> &mut Vec<PortalEdge> {
		&mut self.edges
	}
	pub fn set_edges(&mut self, edges: Vec<PortalEdge>) {
		self.edges = edges;
	}
	pub fn get_component_id(&self) -> u32 {
		self.component_id
	}
	pub fn set_component_id(&mut self, id: u32) {
		self.component_id = id;
	}
	/// Every cell of the portal from the first endpoint to the last
	pub fn get_cells(&self) -> Vec<FieldCell> {
		let [first, last] = self.endpoints;
		match self.side {
			Ordinal::North | Ordinal::South => (first.get_column()..=last.get_column())
				.map(|c| FieldCell::new(c, first.get_row()))
				.collect(),
			_ => (first.get_row()..=last.get_row())
				.map(|r| FieldCell::new(first.get_column(), r))
				.collect(),
		}
	}
	/// The most central cell of the portal
	pub fn get_midpoint(&self) -> FieldCell {
		let cells = self.get_cells();
		cells[cells.len() / 2]
	}
	/// Number of cells spanned
	pub fn get_length(&self) -> usize {
		let [first, last] = self.endpoints;
		first.get_chebyshev_distance(&last) + 1
	}
}

/// Walk along the boundary `side` of a sector and its neighbour and find the
/// runs of `(first, last)` boundary indices which are passable on both sides
fn scan_boundary(cost_field: &CostField, adjoining_cost_field: &CostField, side: Ordinal) -> Vec<(usize, usize)> {
	let mut runs = Vec::new();
	let mut open: Option<usize> = None;
	for i in 0..FIELD_RESOLUTION {
		let cell = get_boundary_cell(side, i);
		let adjoining = cell.get_mirrored_boundary_cell(side);
		if cost_field.is_passable(cell) && adjoining_cost_field.is_passable(adjoining) {
			if open.is_none() {
				open = Some(i);
			}
		} else if let Some(start) = open.take() {
			runs.push((start, i - 1));
		}
	}
	// the side may end on a pathable cell
	if let Some(start) = open {
		runs.push((start, FIELD_RESOLUTION - 1));
	}
	runs
}

/// The `i`th cell along the `side` boundary of a sector
fn get_boundary_cell(side: Ordinal, i: usize) -> FieldCell {
	match side {
		Ordinal::North => FieldCell::new(i, 0),
		Ordinal::East => FieldCell::new(FIELD_RESOLUTION - 1, i),
		Ordinal::South => FieldCell::new(i, FIELD_RESOLUTION - 1),
		Ordinal::West => FieldCell::new(0, i),
		_ => panic!("Portals only exist on orthogonal sides, got {:?}", side),
	}
}

/// Rebuild the portals of every sector of a layer. Each shared boundary is
/// visited once (from the sector to its east and south) and both sides of
/// every portal are created together
pub fn build_portals(layer_sectors: &mut LayerSectors) {
	let map_dimensions = *layer_sectors.get_map_dimensions();
	for sector_id in map_dimensions.iter_sectors() {
		layer_sectors.get_sector_mut(&sector_id).clear_portals();
	}
	let mut links = 0;
	for sector_id in map_dimensions.iter_sectors() {
		for side in [Ordinal::East, Ordinal::South] {
			let Some(adjoining_id) = map_dimensions.get_sector_id_from_ordinal(side, &sector_id) else {
				continue;
			};
			links += 1;
			let runs = scan_boundary(
				layer_sectors.get_sector(&sector_id).get_cost_base(),
				layer_sectors.get_sector(&adjoining_id).get_cost_base(),
				side,
			);
			for (first, last) in runs {
				let endpoints = [get_boundary_cell(side, first), get_boundary_cell(side, last)];
				let mirrored = [
					endpoints[0].get_mirrored_boundary_cell(side),
					endpoints[1].get_mirrored_boundary_cell(side),
				];
				let index = layer_sectors.get_sector(&sector_id).get_portals().len();
				let adjoining_index = layer_sectors.get_sector(&adjoining_id).get_portals().len();
				layer_sectors
					.get_sector_mut(&sector_id)
					.push_portal(Portal::new(side, endpoints, (adjoining_id, adjoining_index)));
				layer_sectors
					.get_sector_mut(&adjoining_id)
					.push_portal(Portal::new(side.inverse(), mirrored, (sector_id, index)));
			}
		}
	}
	assert_eq!(
		links,
		map_dimensions.get_sector_link_count(),
		"Every shared sector boundary must be scanned exactly once"
	);
}

/// Join every pair of portals in a sector which can walk to one another with
/// a [PortalEdge], the walks are memoised in the `field_cache`
pub fn build_portal_edges(layer_sectors: &mut LayerSectors, sector_id: SectorID, field_cache: &mut FieldCache) {
	let layer = layer_sectors.get_layer();
	let sector = layer_sectors.get_sector_mut(&sector_id);
	let midpoints: Vec<FieldCell> = sector.get_portals().iter().map(|p| p.get_midpoint()).collect();
	let mut edges: Vec<Vec<PortalEdge>> = vec![Vec::new(); midpoints.len()];
	for i in 0..midpoints.len() {
		for j in (i + 1)..midpoints.len() {
			let key = GridPathKey {
				layer,
				sector: sector_id,
				start: midpoints[i],
				finish: midpoints[j],
			};
			let path = match field_cache.get_grid_path(&key) {
				Some(path) => Some(path),
				None => {
					let path = find_grid_path(sector.get_cost_base(), midpoints[i], midpoints[j]);
					if let Some(p) = &path {
						field_cache.insert_grid_path(key, p.clone());
					}
					path
				}
			};
			if let Some(path) = path {
				edges[i].push(PortalEdge::new(j, path.get_cost()));
				edges[j].push(PortalEdge::new(i, path.get_cost()));
			}
		}
	}
	for (portal, portal_edges) in sector.get_portals_mut().iter_mut().zip(edges) {
		portal.set_edges(portal_edges);
	}
}

/// Set each edge [EdgeState::Active] when its two portals share a local
/// island on their unblocked cells. Returns whether any edge changed state
pub fn update_edge_states(sector: &mut SectorNav) -> bool {
	let islands: Vec<Vec<u16>> = (0..sector.get_portals().len())
		.map(|i| sector.get_portal_islands(i))
		.collect();
	let mut flipped = false;
	for (i, portal) in sector.get_portals_mut().iter_mut().enumerate() {
		for edge in portal.get_edges_mut().iter_mut() {
			let shared = islands[i]
				.iter()
				.any(|island| islands[edge.get_target()].contains(island));
			let state = if shared {
				EdgeState::Active
			} else {
				EdgeState::Blocked
			};
			if edge.get_state() != state {
				edge.set_state(state);
				flipped = true;
			}
		}
	}
	flipped
}

/// Fill the travel cost table of every portal in a sector, the cost of
/// walking from the portal to each cell over terrain
pub fn calculate_travel_costs(sector: &mut SectorNav) {
	let mut tables = Vec::with_capacity(sector.get_portals().len());
	for portal in sector.get_portals().iter() {
		let seeds: Vec<(usize, usize)> = portal
			.get_cells()
			.iter()
			.filter(|c| sector.is_passable(**c))
			.map(|c| c.get_column_row())
			.collect();
		let mut field = IntegrationField::default();
		let cost_base = sector.get_cost_base();
		field.calculate_field(&seeds, |c, r| cost_base.get_field_cell_value(FieldCell::new(c, r)));
		tables.push(field);
	}
	sector.set_travel_costs(tables);
}

/// Label the connected components of the portal graph of a layer. Portals
/// are joined to their twins and across [EdgeState::Active] edges. Returns
/// the number of components
pub fn calculate_portal_components(layer_sectors: &mut LayerSectors) -> u32 {
	let map_dimensions = *layer_sectors.get_map_dimensions();
	let mut labels: HashMap<(SectorID, usize), u32> = HashMap::new();
	let mut next_id = 0;
	for sector_id in map_dimensions.iter_sectors() {
		for portal in 0..layer_sectors.get_sector(&sector_id).get_portals().len() {
			if labels.contains_key(&(sector_id, portal)) {
				continue;
			}
			let mut stack = vec![(sector_id, portal)];
			labels.insert((sector_id, portal), next_id);
			while let Some((s, p)) = stack.pop() {
				let node = &layer_sectors.get_sector(&s).get_portals()[p];
				let mut neighbours = vec![node.get_connected()];
				for edge in node.get_edges().iter().filter(|e| e.is_active()) {
					neighbours.push((s, edge.get_target()));
				}
				for neighbour in neighbours {
					if let std::collections::hash_map::Entry::Vacant(e) = labels.entry(neighbour) {
						e.insert(next_id);
						stack.push(neighbour);
					}
				}
			}
			next_id += 1;
		}
	}
	for ((sector_id, portal), id) in labels {
		layer_sectors.get_sector_mut(&sector_id).get_portals_mut()[portal].set_component_id(id);
	}
	debug!(
		"{:?} portal graph has {} components",
		layer_sectors.get_layer(),
		next_id
	);
	next_id
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn scan_open_boundary() {
		let result = scan_boundary(&CostField::default(), &CostField::default(), Ordinal::East);
		assert_eq!(vec![(0, 63)], result);
	}
	#[test]
	fn scan_split_boundary() {
		let mut cost_field = CostField::default();
		cost_field.set_field_cell_value(255, FieldCell::new(63, 10));
		let mut adjoining = CostField::default();
		adjoining.set_field_cell_value(255, FieldCell::new(0, 20));
		adjoining.set_field_cell_value(255, FieldCell::new(0, 63));
		let result = scan_boundary(&cost_field, &adjoining, Ordinal::East);
		assert_eq!(vec![(0, 9), (11, 19), (21, 62)], result);
	}
	#[test]
	fn portal_cells() {
		let portal = Portal::new(
			Ordinal::South,
			[FieldCell::new(4, 63), FieldCell::new(8, 63)],
			(SectorID::new(0, 1), 0),
		);
		assert_eq!(5, portal.get_cells().len());
		assert_eq!(5, portal.get_length());
		assert_eq!(FieldCell::new(6, 63), portal.get_midpoint());
	}
	#[test]
	#[should_panic]
	fn portal_off_boundary() {
		Portal::new(
			Ordinal::North,
			[FieldCell::new(4, 3), FieldCell::new(8, 3)],
			(SectorID::new(0, 0), 0),
		);
	}
	#[test]
	fn twins_link_up() {
		let terrain = TerrainMap::new(2, 2);
		let map_dimensions = MapDimensions::new(2, 2, 1.0, Vec2::ZERO);
		let mut layer_sectors = LayerSectors::new(NavLayer::Ground1x1, &terrain, map_dimensions);
		build_portals(&mut layer_sectors);
		for sector_id in map_dimensions.iter_sectors() {
			let sector = layer_sectors.get_sector(&sector_id);
			assert_eq!(2, sector.get_portals().len());
			for (index, portal) in sector.get_portals().iter().enumerate() {
				let (twin_sector, twin_index) = portal.get_connected();
				let twin = &layer_sectors.get_sector(&twin_sector).get_portals()[twin_index];
				assert_eq!((sector_id, index), twin.get_connected());
				assert_eq!(portal.get_side().inverse(), twin.get_side());
			}
		}
	}
	#[test]
	fn edges_follow_islands() {
		let mut sector = SectorNav::new(CostField::default());
		let a = sector.push_portal(Portal::new(
			Ordinal::West,
			[FieldCell::new(0, 10), FieldCell::new(0, 12)],
			(SectorID::new(0, 0), 0),
		));
		let b = sector.push_portal(Portal::new(
			Ordinal::East,
			[FieldCell::new(63, 10), FieldCell::new(63, 12)],
			(SectorID::new(2, 0), 0),
		));
		sector.get_portals_mut()[a].set_edges(vec![PortalEdge::new(b, 63.0)]);
		sector.get_portals_mut()[b].set_edges(vec![PortalEdge::new(a, 63.0)]);
		calculate_local_islands(&mut sector);
		assert!(update_edge_states(&mut sector));
		assert!(sector.get_portals()[a].get_edges()[0].is_active());
		// idempotent when nothing changed
		assert!(!update_edge_states(&mut sector));
		for row in 0..FIELD_RESOLUTION {
			sector.increment_blocker(FieldCell::new(30, row), 0);
		}
		calculate_local_islands(&mut sector);
		assert!(update_edge_states(&mut sector));
		assert_eq!(EdgeState::Blocked, sector.get_portals()[b].get_edges()[0].get_state());
	}
	#[test]
	fn travel_costs_from_portal() {
		let mut sector = SectorNav::new(CostField::default());
		sector.push_portal(Portal::new(
			Ordinal::North,
			[FieldCell::new(0, 0), FieldCell::new(63, 0)],
			(SectorID::new(0, 0), 0),
		));
		calculate_travel_costs(&mut sector);
		assert_eq!(0.0, sector.get_travel_cost(0, FieldCell::new(5, 0)));
		assert_eq!(10.0, sector.get_travel_cost(0, FieldCell::new(5, 10)));
	}
}
