//! Turning a request to path from one cell to another into cached fields.
//!
//! ```text
//!  different global islands ──────────────────────────────> fail
//!  same sector and local island (or only blockers apart) ─> dest tile field
//!  nearest destination portal ──> portal route ──> portal field per hop
//!        │ none                       │ none
//!        v                            v
//!  same sector ? ok : fail      retry on a portal the source
//!                               can reach ──> same sector ? ok : fail
//! ```
//!
//! Fields are staged while the request is worked out and only written to the
//! [FieldCache] once it succeeds, a hopeless request leaves the cache as it was.
//!
//! The portal route is walked backwards from the destination so that each
//! [LosField] can be stitched from the sector after it.
//!

use std::collections::HashMap;

use bevy::prelude::*;

use crate::prelude::*;

/// Fields produced by a request waiting to be committed
#[derive(Default)]
struct StagedFields {
	los: HashMap<DestinationSectorKey, LosField>,
	flows: Vec<(FlowFieldID, FlowField)>,
	mappings: Vec<(DestinationSectorKey, FlowFieldID)>,
}

impl StagedFields {
	fn has_flow(&self, field_cache: &FieldCache, id: &FlowFieldID) -> bool {
		field_cache.contains_flow(id) || self.flows.iter().any(|(staged, _)| staged == id)
	}
	fn get_los<'a>(&'a self, field_cache: &'a FieldCache, key: &DestinationSectorKey) -> Option<&'a LosField> {
		self.los.get(key).or_else(|| field_cache.peek_los(key))
	}
	fn commit(self, field_cache: &mut FieldCache) {
		for (key, field) in self.los {
			field_cache.insert_los(key, field);
		}
		for (id, field) in self.flows {
			field_cache.insert_flow(id, field);
		}
		for (key, id) in self.mappings {
			field_cache.insert_mapping(key, id);
		}
	}
}

/// Local island a cell is on, or that of the closest cell on an island
fn get_anchor(sector: &SectorNav, field_cell: FieldCell) -> Option<(FieldCell, u16)> {
	let cell = find_nearest_island_cell(sector, field_cell)?;
	Some((cell, sector.get_local_island(cell)))
}

/// The portal of the destination sector a route should arrive through,
/// preferring those which reach the destination island past blockers
fn find_destination_portal(layer_sectors: &LayerSectors, sector_id: SectorID, target: FieldCell) -> Option<PortalTarget> {
	let sector = layer_sectors.get_sector(&sector_id);
	let cheapest = |island: Option<u16>, cell: FieldCell| {
		(0..sector.get_portals().len())
			.filter(|p| island.is_none_or(|i| sector.does_portal_touch_island(*p, i)))
			.map(|p| (p, sector.get_travel_cost(p, cell)))
			.filter(|(_, cost)| cost.is_finite())
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(p, _)| p)
	};
	if let Some((cell, island)) = get_anchor(sector, target) {
		if let Some(portal) = cheapest(Some(island), cell) {
			return Some(PortalTarget {
				sector: sector_id,
				portal,
				island: Some(island),
			});
		}
	}
	cheapest(None, target).map(|portal| PortalTarget {
		sector: sector_id,
		portal,
		island: None,
	})
}

/// A portal of the destination sector in one of the portal graph components
/// the source can start from, the one closest to the destination
fn find_source_reachable_portal(
	layer_sectors: &LayerSectors,
	source_sector: SectorID,
	source_cell: FieldCell,
	source_island: Option<u16>,
	target_sector: SectorID,
	target: FieldCell,
) -> Option<PortalTarget> {
	let components = get_start_components(layer_sectors, source_sector, source_cell, source_island);
	let sector = layer_sectors.get_sector(&target_sector);
	(0..sector.get_portals().len())
		.filter(|p| components.contains(&sector.get_portals()[*p].get_component_id()))
		.map(|p| (p, sector.get_travel_cost(p, target)))
		.filter(|(_, cost)| cost.is_finite())
		.min_by(|a, b| a.1.total_cmp(&b.1))
		.map(|(portal, _)| PortalTarget {
			sector: target_sector,
			portal,
			island: None,
		})
}

/// Work out and cache the fields guiding units of a layer from `source` to
/// `target`, both given as `(sector, cell)`. Returns the handle the fields
/// are cached under or [None] when no route exists
pub fn request_path(
	layer_sectors: &LayerSectors,
	field_cache: &mut FieldCache,
	diplomacy: &Diplomacy,
	source: (SectorID, FieldCell),
	target: (SectorID, FieldCell),
	attacking_faction: Option<u8>,
) -> Option<DestinationID> {
	let layer = layer_sectors.get_layer();
	let (source_sector, source_cell) = source;
	let (target_sector, target_cell) = target;
	let source_global = layer_sectors.get_sector(&source_sector).get_global_island(source_cell);
	let target_global = layer_sectors.get_sector(&target_sector).get_global_island(target_cell);
	if source_global == ISLAND_NONE || source_global != target_global {
		debug!(
			"{:?} request from {:?} {:?} to {:?} {:?} crosses global islands",
			layer, source_sector, source_cell, target_sector, target_cell
		);
		return None;
	}
	let destination = DestinationID::new(layer, attacking_faction, target_sector, target_cell);
	let mut staged = StagedFields::default();
	// the field of the destination sector and the root of the LOS chain
	let tile_id = FlowFieldID::new(
		layer,
		target_sector,
		attacking_faction,
		FieldTargetKey::Tile(target_cell),
	);
	let target_nav = layer_sectors.get_sector(&target_sector);
	if !field_cache.contains_flow(&tile_id) {
		let field = build_tile_flow_field(target_nav, target_cell, attacking_faction, diplomacy);
		staged.flows.push((tile_id, field));
	}
	staged.mappings.push(((destination, target_sector), tile_id));
	let root_key = (destination, target_sector);
	if field_cache.peek_los(&root_key).is_none() {
		let los = LosField::calculate_destination(target_nav.get_cost_base(), target_sector, target_cell);
		staged.los.insert(root_key, los);
	}
	let same_sector = source_sector == target_sector;
	if same_sector {
		let source_island = target_nav.get_local_island(source_cell);
		if source_island != ISLAND_NONE && source_island == target_nav.get_local_island(target_cell) {
			trace!("{:?} shares a local island with its source", destination);
			staged.commit(field_cache);
			return Some(destination);
		}
		if target_nav.get_cost_base().is_cell_pair_reachable(source_cell, target_cell) {
			trace!("{:?} is only separated from its source by blockers", destination);
			staged.commit(field_cache);
			return Some(destination);
		}
	}
	let Some(portal_target) = find_destination_portal(layer_sectors, target_sector, target_cell) else {
		if same_sector {
			staged.commit(field_cache);
			return Some(destination);
		}
		debug!("{:?} has no portal reaching it", destination);
		return None;
	};
	let source_nav = layer_sectors.get_sector(&source_sector);
	let (anchor_cell, source_island) = match get_anchor(source_nav, source_cell) {
		Some((cell, island)) => (cell, Some(island)),
		None => (source_cell, None),
	};
	let route = find_portal_route(layer_sectors, source_sector, anchor_cell, source_island, portal_target)
		.or_else(|| {
			let retry = find_source_reachable_portal(
				layer_sectors,
				source_sector,
				anchor_cell,
				source_island,
				target_sector,
				target_cell,
			)?;
			trace!("Retrying {:?} towards {:?}", destination, retry);
			find_portal_route(layer_sectors, source_sector, anchor_cell, source_island, retry)
		});
	let Some(route) = route else {
		if same_sector {
			staged.commit(field_cache);
			return Some(destination);
		}
		debug!("No portal route from {:?} to {:?}", source_sector, destination);
		return None;
	};
	let target_point = layer_sectors
		.get_map_dimensions()
		.get_global_cell(target_sector, target_cell);
	for hop in route.iter().rev() {
		let sector_id = hop.get_sector();
		let portal = layer_sectors.get_portal(&sector_id, hop.get_portal());
		let side = portal.get_side();
		let endpoints = *portal.get_endpoints();
		let id = FlowFieldID::new(
			layer,
			sector_id,
			attacking_faction,
			FieldTargetKey::Portal {
				side,
				endpoints,
				port_island: hop.get_port_island(),
				next_island: hop.get_next_island(),
			},
		);
		if !staged.has_flow(field_cache, &id) {
			let seeds = get_portal_seed_cells(
				layer_sectors,
				sector_id,
				side,
				&endpoints,
				hop.get_port_island(),
				hop.get_next_island(),
				attacking_faction,
				diplomacy,
			);
			let field = build_portal_flow_field(layer_sectors, sector_id, side, &seeds, attacking_faction, diplomacy);
			staged.flows.push((id, field));
		}
		staged.mappings.push(((destination, sector_id), id));
		let key = (destination, sector_id);
		if staged.get_los(field_cache, &key).is_some() {
			continue;
		}
		let successor_key = (destination, portal.get_connected().0);
		let Some(successor) = staged.get_los(field_cache, &successor_key) else {
			trace!("No LOS to stitch {:?} from", key);
			continue;
		};
		let los = LosField::calculate_from_successor(
			layer_sectors.get_sector(&sector_id).get_cost_base(),
			sector_id,
			target_point,
			successor,
			side,
		);
		staged.los.insert(key, los);
	}
	debug!(
		"{:?} routed through {} portals from {:?}",
		destination,
		route.len(),
		source_sector
	);
	staged.commit(field_cache);
	Some(destination)
}

#[cfg(test)]
mod tests {
	use super::*;
	fn open_layer(columns: u32, rows: u32) -> LayerSectors {
		let terrain = TerrainMap::new(columns, rows);
		let map_dimensions = MapDimensions::new(columns, rows, 1.0, Vec2::ZERO);
		let mut layer_sectors = LayerSectors::new(NavLayer::Ground1x1, &terrain, map_dimensions);
		let mut field_cache = FieldCache::new(FieldCacheConfig::default());
		layer_sectors.rebuild(&mut field_cache);
		layer_sectors
	}
	#[test]
	fn same_sector_needs_one_field() {
		let layer_sectors = open_layer(1, 1);
		let mut field_cache = FieldCache::new(FieldCacheConfig::default());
		let sector = SectorID::new(0, 0);
		let destination = request_path(
			&layer_sectors,
			&mut field_cache,
			&Diplomacy::default(),
			(sector, FieldCell::new(2, 2)),
			(sector, FieldCell::new(50, 50)),
			None,
		)
		.unwrap();
		let stats = field_cache.get_stats();
		assert_eq!(1, stats.flow.get_len());
		assert_eq!(1, stats.los.get_len());
		assert_eq!(1, field_cache.get_mapping(&(destination, sector)).unwrap().len());
	}
	#[test]
	fn route_east_builds_portal_field() {
		let layer_sectors = open_layer(2, 1);
		let mut field_cache = FieldCache::new(FieldCacheConfig::default());
		let source = SectorID::new(0, 0);
		let target = SectorID::new(1, 0);
		let destination = request_path(
			&layer_sectors,
			&mut field_cache,
			&Diplomacy::default(),
			(source, FieldCell::new(10, 32)),
			(target, FieldCell::new(40, 32)),
			None,
		)
		.unwrap();
		let ids = field_cache.get_mapping(&(destination, source)).unwrap().clone();
		assert_eq!(1, ids.len());
		let flow = field_cache.get_flow(&ids[0]).unwrap();
		assert_eq!(Ordinal::East, flow.get_direction(FieldCell::new(10, 32)));
		// the open map gives the source sector full sight of the destination
		let los = field_cache.peek_los(&(destination, source)).unwrap();
		assert!(los.is_visible(FieldCell::new(10, 32)));
	}
	#[test]
	fn repeat_request_reuses_fields() {
		let layer_sectors = open_layer(2, 2);
		let mut field_cache = FieldCache::new(FieldCacheConfig::default());
		let source = (SectorID::new(0, 0), FieldCell::new(32, 32));
		let target = (SectorID::new(1, 1), FieldCell::new(32, 32));
		let first = request_path(&layer_sectors, &mut field_cache, &Diplomacy::default(), source, target, None);
		let inserts = field_cache.get_stats().flow.get_inserts();
		let second = request_path(&layer_sectors, &mut field_cache, &Diplomacy::default(), source, target, None);
		assert_eq!(first, second);
		assert_eq!(inserts, field_cache.get_stats().flow.get_inserts());
	}
	#[test]
	fn walled_off_request_writes_nothing() {
		let terrain = TerrainMap::new(2, 1);
		let map_dimensions = MapDimensions::new(2, 1, 1.0, Vec2::ZERO);
		let mut layer_sectors = LayerSectors::new(NavLayer::Ground1x1, &terrain, map_dimensions);
		for row in 0..FIELD_RESOLUTION {
			layer_sectors
				.get_sector_mut(&SectorID::new(0, 0))
				.add_cutout(FieldCell::new(40, row));
		}
		let mut field_cache = FieldCache::new(FieldCacheConfig::default());
		layer_sectors.rebuild(&mut field_cache);
		let before = field_cache.get_stats();
		let result = request_path(
			&layer_sectors,
			&mut field_cache,
			&Diplomacy::default(),
			(SectorID::new(0, 0), FieldCell::new(10, 10)),
			(SectorID::new(1, 0), FieldCell::new(10, 10)),
			None,
		);
		assert!(result.is_none());
		let after = field_cache.get_stats();
		assert_eq!(before.flow.get_inserts(), after.flow.get_inserts());
		assert_eq!(before.los.get_inserts(), after.los.get_inserts());
		assert_eq!(before.mapping.get_inserts(), after.mapping.get_inserts());
	}
}
