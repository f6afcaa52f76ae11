//! Queries units make of the [NavigationEngine] each tick.
//!
//! A destination query first consults the [LosField] of the unit's sector, a
//! unit with sight of the destination steers straight at it. Otherwise the
//! [FlowField]s the destination uses in that sector are tried in turn and the
//! first with a direction at the unit's cell wins. Anything missing from the
//! cache is rebuilt on demand so a query never fails because of eviction.
//!

use bevy::prelude::*;

use crate::prelude::*;

/// How far from a position to look for an open cell before giving up
const CLOSEST_SEARCH_RADIUS: i32 = FIELD_RESOLUTION as i32;

/// Map-wide cells at Chebyshev distance `radius` from `centre`
fn get_ring(centre: (i32, i32), radius: i32) -> Vec<(i32, i32)> {
	if radius == 0 {
		return vec![centre];
	}
	let mut ring = Vec::with_capacity(8 * radius as usize);
	for column in centre.0 - radius..=centre.0 + radius {
		ring.push((column, centre.1 - radius));
		ring.push((column, centre.1 + radius));
	}
	for row in centre.1 - radius + 1..centre.1 + radius {
		ring.push((centre.0 - radius, row));
		ring.push((centre.0 + radius, row));
	}
	ring
}

impl NavigationEngine {
	/// Search outward ring by ring for the map-wide cell closest to `start`
	/// satisfying `accept`
	fn find_closest_global<F>(&self, start: (i32, i32), max_radius: i32, accept: F) -> Option<(i32, i32)>
	where
		F: Fn((i32, i32)) -> bool,
	{
		for radius in 0..=max_radius {
			let best = get_ring(start, radius)
				.into_iter()
				.filter(|g| {
					self.map_dimensions.get_sector_and_field_cell_from_global(*g).is_some() && accept(*g)
				})
				.min_by_key(|g| {
					let dc = g.0 - start.0;
					let dr = g.1 - start.1;
					dc * dc + dr * dr
				});
			if best.is_some() {
				return best;
			}
		}
		None
	}
	/// Closest passable map-wide cell to `global` on a layer, optionally also
	/// free of blockers
	pub(crate) fn find_closest_pathable_global(
		&self,
		global: (i32, i32),
		layer: NavLayer,
		require_unblocked: bool,
	) -> Option<(i32, i32)> {
		if self.map_dimensions.get_sector_and_field_cell_from_global(global).is_none() {
			error!("Cell {:?} is outside of the map", global);
			return None;
		}
		let layer_sectors = self.get_layer_sectors(layer);
		self.find_closest_global(global, CLOSEST_SEARCH_RADIUS, |g| {
			let Some((sector_id, field_cell)) = self.map_dimensions.get_sector_and_field_cell_from_global(g) else {
				return false;
			};
			let sector = layer_sectors.get_sector(&sector_id);
			sector.is_passable(field_cell) && (!require_unblocked || !sector.is_blocked(field_cell))
		})
	}
	/// Unit vector a unit at `position` should move along to reach the
	/// destination, [Vec2::ZERO] when there is no way forward
	pub fn desired_velocity(&mut self, destination: DestinationID, position: Vec2) -> Vec2 {
		let Some((sector_id, field_cell)) = self.map_dimensions.get_sector_and_field_cell_from_xy(position) else {
			return Vec2::ZERO;
		};
		let target = self
			.map_dimensions
			.get_xy_from_field_sector(destination.get_sector(), destination.get_field_cell());
		let key = (destination, sector_id);
		if self
			.field_cache
			.get_los(&key)
			.is_some_and(|los| los.is_visible(field_cell))
		{
			return (target - position).normalize_or_zero();
		}
		let ids = match self.field_cache.get_mapping(&key) {
			Some(ids) => ids.clone(),
			None => {
				trace!("{:?} has no fields at {:?}, requesting again", destination, sector_id);
				let layer = destination.get_layer();
				if self
					.request_path_inner(position, target, layer, destination.get_faction())
					.is_none()
				{
					return Vec2::ZERO;
				}
				match self.field_cache.get_mapping(&key) {
					Some(ids) => ids.clone(),
					None => return Vec2::ZERO,
				}
			}
		};
		for id in ids.iter() {
			let ordinal = self.get_flow_direction(id, field_cell);
			if ordinal != Ordinal::Zero {
				return ordinal.to_vec2();
			}
		}
		Vec2::ZERO
	}
	/// Direction of a cached tile or portal field, rebuilding it when evicted
	fn get_flow_direction(&mut self, id: &FlowFieldID, field_cell: FieldCell) -> Ordinal {
		if let Some(flow_field) = self.field_cache.get_flow(id) {
			return flow_field.get_direction(field_cell);
		}
		let Some(flow_field) = build_flow_field(&self.layers[id.get_layer().get_index()], &self.diplomacy, id)
		else {
			return Ordinal::Zero;
		};
		trace!("Rebuilt evicted {:?}", id);
		let ordinal = flow_field.get_direction(field_cell);
		self.field_cache.insert_flow(*id, flow_field);
		ordinal
	}
	/// World space rectangle covered by the seek grid of a sector
	fn get_seek_rect(&self, sector_id: SectorID) -> (Vec2, Vec2) {
		let cell_size = self.map_dimensions.get_cell_size();
		let corner = Vec2::new(
			(sector_id.get_column() as f32 * FIELD_RESOLUTION as f32) - SEEK_FIELD_OFFSET as f32,
			(sector_id.get_row() as f32 * FIELD_RESOLUTION as f32) - SEEK_FIELD_OFFSET as f32,
		);
		let min = self.map_dimensions.get_origin() + corner * cell_size;
		(min, min + Vec2::splat(SEEK_FIELD_SIZE as f32 * cell_size))
	}
	/// Direction of a seek field. A missing field is handed to the async
	/// scheduler and [Ordinal::Zero] returned until it lands in the cache, if
	/// the scheduler turned it away it is built inline on the next query
	fn get_seek_direction<F>(&mut self, id: FlowFieldID, field_cell: FieldCell, snapshot: F) -> Ordinal
	where
		F: FnOnce(&Self) -> SeekFieldInput,
	{
		if let Some(flow_field) = self.field_cache.get_flow(&id) {
			return flow_field.get_direction(field_cell);
		}
		if self.async_fields.is_in_flight(&id) {
			return Ordinal::Zero;
		}
		let input = snapshot(self);
		if self.deferred_fields.remove(&id) {
			let flow_field = input.compute();
			let ordinal = flow_field.get_direction(field_cell);
			self.field_cache.insert_flow(id, flow_field);
			return ordinal;
		}
		if !self.async_fields.submit(input) {
			self.deferred_fields.insert(id);
		}
		Ordinal::Zero
	}
	/// Unit vector leading a unit of `faction` towards the nearest of its enemies
	pub fn desired_enemy_seek_velocity<E: NavEntities + ?Sized>(
		&mut self,
		position: Vec2,
		layer: NavLayer,
		faction: u8,
		entities: &E,
	) -> Vec2 {
		let Some((sector_id, field_cell)) = self.map_dimensions.get_sector_and_field_cell_from_xy(position) else {
			return Vec2::ZERO;
		};
		let id = FlowFieldID::new(layer, sector_id, Some(faction), FieldTargetKey::Enemies { faction });
		let ordinal = self.get_seek_direction(id, field_cell, |engine| {
			let (min, max) = engine.get_seek_rect(sector_id);
			let targets: Vec<(i32, i32)> = entities
				.entities_in_rect(min, max)
				.iter()
				.filter(|e| engine.diplomacy.are_enemies(faction, e.faction))
				.map(|e| engine.map_dimensions.get_global_cell_from_xy(e.position))
				.collect();
			SeekFieldInput::new(
				id,
				snapshot_seek_costs(engine.get_layer_sectors(layer), sector_id, Some(faction), &engine.diplomacy),
				get_seek_seeds(sector_id, &targets),
			)
		});
		ordinal.to_vec2()
	}
	/// Unit vector leading a unit towards the cells surrounding the entity `target_uid`
	pub fn desired_surround_velocity<E: NavEntities + ?Sized>(
		&mut self,
		position: Vec2,
		layer: NavLayer,
		target_uid: u32,
		entities: &E,
	) -> Vec2 {
		let Some((sector_id, field_cell)) = self.map_dimensions.get_sector_and_field_cell_from_xy(position) else {
			return Vec2::ZERO;
		};
		let Some(target) = entities.get_entity(target_uid) else {
			trace!("Entity {} to surround no longer exists", target_uid);
			return Vec2::ZERO;
		};
		let id = FlowFieldID::new(layer, sector_id, None, FieldTargetKey::Entity { uid: target_uid });
		let ordinal = self.get_seek_direction(id, field_cell, |engine| {
			let layer_sectors = engine.get_layer_sectors(layer);
			let centre = engine.map_dimensions.get_global_cell_from_xy(target.position);
			let reach = (target.radius / engine.map_dimensions.get_cell_size()).ceil() as i32 + 1;
			let ring: Vec<(i32, i32)> = get_ring(centre, reach)
				.into_iter()
				.filter(|g| layer_sectors.get_cost_base_global(*g) != COST_IMPASSABLE)
				.collect();
			SeekFieldInput::new(
				id,
				snapshot_seek_costs(layer_sectors, sector_id, None, &engine.diplomacy),
				get_seek_seeds(sector_id, &ring),
			)
		});
		ordinal.to_vec2()
	}
	/// Whether nothing impassable lies on the straight line between two cells
	fn has_line_of_sight(&self, layer: NavLayer, from: (i32, i32), to: (i32, i32)) -> bool {
		let layer_sectors = self.get_layer_sectors(layer);
		get_global_cells_between_points(from, to)
			.iter()
			.all(|g| layer_sectors.get_cost_base_global(*g) != COST_IMPASSABLE)
	}
	/// Whether a unit at `position` can see the destination
	pub fn has_dest_los(&mut self, destination: DestinationID, position: Vec2) -> bool {
		let Some((sector_id, field_cell)) = self.map_dimensions.get_sector_and_field_cell_from_xy(position) else {
			return false;
		};
		if let Some(los) = self.field_cache.get_los(&(destination, sector_id)) {
			return los.is_visible(field_cell);
		}
		let from = self.map_dimensions.get_global_cell(sector_id, field_cell);
		let to = self
			.map_dimensions
			.get_global_cell(destination.get_sector(), destination.get_field_cell());
		self.has_line_of_sight(destination.get_layer(), from, to)
	}
	/// Whether a unit at `position` can see the entity `target_uid`
	pub fn has_entity_los<E: NavEntities + ?Sized>(
		&self,
		position: Vec2,
		target_uid: u32,
		layer: NavLayer,
		entities: &E,
	) -> bool {
		let Some(target) = entities.get_entity(target_uid) else {
			return false;
		};
		let from = self.map_dimensions.get_global_cell_from_xy(position);
		let to = self.map_dimensions.get_global_cell_from_xy(target.position);
		self.has_line_of_sight(layer, from, to)
	}
	/// Whether the terrain at `position` can be walked on by the layer
	pub fn is_pathable(&self, position: Vec2, layer: NavLayer) -> bool {
		match self.map_dimensions.get_sector_and_field_cell_from_xy(position) {
			Some((sector_id, field_cell)) => self
				.get_layer_sectors(layer)
				.get_sector(&sector_id)
				.is_passable(field_cell),
			None => false,
		}
	}
	/// Whether a dynamic blocker covers `position` on the layer
	pub fn is_blocked(&self, position: Vec2, layer: NavLayer) -> bool {
		match self.map_dimensions.get_sector_and_field_cell_from_xy(position) {
			Some((sector_id, field_cell)) => self
				.get_layer_sectors(layer)
				.get_sector(&sector_id)
				.is_blocked(field_cell),
			None => false,
		}
	}
	/// Global island of a position, [ISLAND_NONE] when impassable or beyond the map
	fn get_global_island(&self, position: Vec2, layer: NavLayer) -> u16 {
		match self.map_dimensions.get_sector_and_field_cell_from_xy(position) {
			Some((sector_id, field_cell)) => self
				.get_layer_sectors(layer)
				.get_sector(&sector_id)
				.get_global_island(field_cell),
			None => ISLAND_NONE,
		}
	}
	/// Whether a unit could walk between two positions if no blockers existed
	pub fn locations_reachable(&self, a: Vec2, b: Vec2, layer: NavLayer) -> bool {
		let island = self.get_global_island(a, layer);
		island != ISLAND_NONE && island == self.get_global_island(b, layer)
	}
	/// The closest position to `position` a unit can stand on, `position`
	/// itself when it already can
	pub fn closest_pathable(&self, position: Vec2, layer: NavLayer) -> Option<Vec2> {
		let global = self.map_dimensions.get_global_cell_from_xy(position);
		let closest = self.find_closest_pathable_global(global, layer, true)?;
		if closest == global {
			Some(position)
		} else {
			Some(self.map_dimensions.get_xy_from_global(closest))
		}
	}
	/// The closest position to `target` a unit at `source` can reach,
	/// `target` itself when it is reachable
	pub fn closest_reachable_dest(&self, source: Vec2, target: Vec2, layer: NavLayer) -> Option<Vec2> {
		let source_global = self.map_dimensions.get_global_cell_from_xy(source);
		let source_global = self.find_closest_pathable_global(source_global, layer, false)?;
		let layer_sectors = self.get_layer_sectors(layer);
		let island = layer_sectors.get_global_island_global(source_global);
		if island == ISLAND_NONE {
			return None;
		}
		let target_global = self.map_dimensions.get_global_cell_from_xy(target);
		if layer_sectors.get_global_island_global(target_global) == island {
			return Some(target);
		}
		let max_radius = self
			.map_dimensions
			.get_cell_columns()
			.max(self.map_dimensions.get_cell_rows());
		self.find_closest_global(target_global, max_radius, |g| {
			layer_sectors.get_global_island_global(g) == island
		})
		.map(|g| self.map_dimensions.get_xy_from_global(g))
	}
	/// Snapshot of the cost of a sector with blockers folded in
	pub fn debug_cost_field(&self, layer: NavLayer, sector_id: SectorID) -> CostField {
		self.get_layer_sectors(layer)
			.get_sector(&sector_id)
			.get_effective_cost_field(None, &self.diplomacy)
	}
	/// Snapshot of the local islands of a sector
	pub fn debug_island_field(&self, layer: NavLayer, sector_id: SectorID) -> [[u16; FIELD_RESOLUTION]; FIELD_RESOLUTION] {
		*self.get_layer_sectors(layer).get_sector(&sector_id).get_local_islands()
	}
	/// Snapshot of the portals of a sector
	pub fn debug_portals(&self, layer: NavLayer, sector_id: SectorID) -> Vec<Portal> {
		self.get_layer_sectors(layer).get_sector(&sector_id).get_portals().clone()
	}
	/// IDs of the [FlowField]s a destination uses in a sector
	pub fn debug_flow_field_ids(&self, destination: DestinationID, sector_id: SectorID) -> Vec<FlowFieldID> {
		self.field_cache
			.peek_mapping(&(destination, sector_id))
			.cloned()
			.unwrap_or_default()
	}
	/// Copy of a cached [FlowField]
	pub fn debug_flow_field(&self, id: &FlowFieldID) -> Option<FlowField> {
		self.field_cache.peek_flow(id).cloned()
	}
	/// Copy of the cached [LosField] of a destination in a sector
	pub fn debug_los_field(&self, destination: DestinationID, sector_id: SectorID) -> Option<LosField> {
		self.field_cache.peek_los(&(destination, sector_id)).cloned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	fn engine(columns: u32, rows: u32) -> NavigationEngine {
		NavigationEngine::new(
			&TerrainMap::new(columns, rows),
			1.0,
			Vec2::ZERO,
			FieldCacheConfig::default(),
		)
	}
	#[test]
	fn ring_cells() {
		assert_eq!(vec![(3, 3)], get_ring((3, 3), 0));
		let ring = get_ring((3, 3), 2);
		assert_eq!(16, ring.len());
		assert!(ring.iter().all(|(c, r)| (c - 3).abs().max((r - 3).abs()) == 2));
	}
	#[test]
	fn velocity_in_sight_points_at_target() {
		let mut engine = engine(1, 1);
		let destination = engine
			.request_path(Vec2::new(5.5, 5.5), Vec2::new(5.5, 40.5), NavLayer::Ground1x1)
			.unwrap();
		let velocity = engine.desired_velocity(destination, Vec2::new(5.5, 5.5));
		assert!((velocity - Vec2::new(0.0, 1.0)).length() < 1e-5);
	}
	#[test]
	fn velocity_follows_flow_around_wall() {
		let mut engine = engine(1, 1);
		// a wall between the unit and the target, open at its southern end
		engine.cutout_static_object(&Footprint::OrientedBox {
			centre: Vec2::new(30.0, 20.0),
			half_extents: Vec2::new(1.0, 20.0),
			axis: Vec2::X,
		});
		let destination = engine
			.request_path(Vec2::new(20.5, 10.5), Vec2::new(40.5, 10.5), NavLayer::Ground1x1)
			.unwrap();
		assert!(!engine.has_dest_los(destination, Vec2::new(20.5, 10.5)));
		let velocity = engine.desired_velocity(destination, Vec2::new(20.5, 10.5));
		// heading round the southern end of the wall
		assert!(velocity.y > 0.0);
	}
	#[test]
	fn evicted_field_is_rebuilt() {
		let mut engine = engine(1, 1);
		let destination = engine
			.request_path(Vec2::new(5.5, 5.5), Vec2::new(60.5, 40.5), NavLayer::Ground1x1)
			.unwrap();
		engine.clear_cache();
		let velocity = engine.desired_velocity(destination, Vec2::new(5.5, 5.5));
		assert_ne!(Vec2::ZERO, velocity);
		assert!(engine.get_cache_stats().flow.get_len() > 0);
	}
	#[test]
	fn enemy_seek_arrives_after_join() {
		let mut engine = engine(2, 1);
		engine.set_diplomacy(0, 1, true);
		let entities = vec![NavEntity {
			uid: 1,
			faction: 1,
			position: Vec2::new(70.5, 20.5),
			radius: 0.5,
		}];
		let position = Vec2::new(20.5, 20.5);
		let first = engine.desired_enemy_seek_velocity(position, NavLayer::Ground1x1, 0, entities.as_slice());
		assert_eq!(Vec2::ZERO, first);
		assert_eq!(1, engine.await_async_fields());
		let second = engine.desired_enemy_seek_velocity(position, NavLayer::Ground1x1, 0, entities.as_slice());
		assert_eq!(Vec2::new(1.0, 0.0), second);
	}
	#[test]
	fn surround_leads_to_entity() {
		let mut engine = engine(1, 1);
		let entities = vec![NavEntity {
			uid: 7,
			faction: 2,
			position: Vec2::new(40.5, 50.5),
			radius: 1.0,
		}];
		let position = Vec2::new(40.5, 10.5);
		engine.desired_surround_velocity(position, NavLayer::Ground1x1, 7, entities.as_slice());
		engine.await_async_fields();
		let velocity = engine.desired_surround_velocity(position, NavLayer::Ground1x1, 7, entities.as_slice());
		assert_eq!(Vec2::new(0.0, 1.0), velocity);
		assert_eq!(
			Vec2::ZERO,
			engine.desired_surround_velocity(position, NavLayer::Ground1x1, 8, entities.as_slice())
		);
	}
	#[test]
	fn entity_los_blocked_by_cutout() {
		let mut engine = engine(1, 1);
		let entities = vec![NavEntity {
			uid: 1,
			faction: 0,
			position: Vec2::new(50.5, 10.5),
			radius: 0.5,
		}];
		assert!(engine.has_entity_los(Vec2::new(10.5, 10.5), 1, NavLayer::Ground1x1, entities.as_slice()));
		engine.cutout_static_object(&Footprint::Circle {
			centre: Vec2::new(30.5, 10.5),
			radius: 1.0,
		});
		assert!(!engine.has_entity_los(Vec2::new(10.5, 10.5), 1, NavLayer::Ground1x1, entities.as_slice()));
	}
	#[test]
	fn pathability_queries() {
		let mut engine = engine(1, 1);
		let blocker = Footprint::Circle {
			centre: Vec2::new(10.5, 10.5),
			radius: 0.4,
		};
		engine.add_blocker(&blocker, 0);
		assert!(engine.is_pathable(Vec2::new(10.5, 10.5), NavLayer::Ground1x1));
		assert!(engine.is_blocked(Vec2::new(10.5, 10.5), NavLayer::Ground1x1));
		let closest = engine.closest_pathable(Vec2::new(10.5, 10.5), NavLayer::Ground1x1).unwrap();
		assert_eq!(1.0, closest.distance(Vec2::new(10.5, 10.5)));
		assert!(!engine.is_pathable(Vec2::new(-5.0, 10.0), NavLayer::Ground1x1));
	}
	#[test]
	fn closest_reachable_across_wall() {
		let mut engine = engine(1, 1);
		engine.cutout_static_object(&Footprint::OrientedBox {
			centre: Vec2::new(32.0, 32.0),
			half_extents: Vec2::new(1.0, 40.0),
			axis: Vec2::X,
		});
		let source = Vec2::new(10.5, 10.5);
		let target = Vec2::new(50.5, 10.5);
		assert!(!engine.locations_reachable(source, target, NavLayer::Ground1x1));
		let closest = engine.closest_reachable_dest(source, target, NavLayer::Ground1x1).unwrap();
		assert!(closest.x < 32.0);
		assert!(engine.locations_reachable(source, closest, NavLayer::Ground1x1));
		assert_eq!(Some(source), engine.closest_reachable_dest(source, source, NavLayer::Ground1x1));
	}
}
