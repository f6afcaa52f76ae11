//! The [NavigationEngine] owns the navigation state of every [NavLayer], the
//! [FieldCache] of fields computed from it and the async job batch.
//!
//! Mutations of blockers only mark the sectors they touch as dirty, the work
//! of bringing islands, portal edges and the cache up to date happens in
//! [NavigationEngine::update] which is expected once per tick:
//!
//! ```text
//!  add_blocker ──┐
//!  remove_blocker┴─> dirty sectors ─> update ─> local islands
//!                                              edge states ─> components
//!                                              cache invalidation
//! ```
//!
//! Static cutouts change the terrain itself so they rebuild the layer straight away.
//!

pub mod async_fields;
pub mod entities;
pub mod field_builder;
pub mod field_cache;
pub mod lru;
pub mod orchestrator;
pub mod queries;

use std::collections::{BTreeSet, HashSet};

use bevy::prelude::*;

use crate::prelude::*;

/// Navigation state of every layer along with the cache of fields computed
/// from it. Inserted into the world by the host once the terrain is known
#[derive(Resource)]
pub struct NavigationEngine {
	/// Size of the map
	map_dimensions: MapDimensions,
	/// Navigation state of each layer in [NavLayer::ALL] order
	layers: Vec<LayerSectors>,
	/// Every computed field
	field_cache: FieldCache,
	/// Seek fields being computed off the main thread
	async_fields: AsyncFieldScheduler,
	/// Per layer, sectors whose blockers changed since the last update
	dirty_sectors: Vec<BTreeSet<SectorID>>,
	/// Seek fields whose async job was dropped, built inline when next needed
	deferred_fields: HashSet<FlowFieldID>,
	/// Which factions are hostile to one another
	diplomacy: Diplomacy,
}

impl NavigationEngine {
	/// Build the navigation state of every layer from the terrain. `cell_size`
	/// is the world size of a field cell and `origin` the world position of
	/// the top-left corner of the map
	pub fn new(terrain: &TerrainMap, cell_size: f32, origin: Vec2, config: FieldCacheConfig) -> Self {
		let map_dimensions = MapDimensions::new(
			terrain.get_sector_columns(),
			terrain.get_sector_rows(),
			cell_size,
			origin,
		);
		let mut field_cache = FieldCache::new(config);
		let layers = NavLayer::ALL
			.iter()
			.map(|layer| {
				let mut layer_sectors = LayerSectors::new(*layer, terrain, map_dimensions);
				layer_sectors.rebuild(&mut field_cache);
				layer_sectors
			})
			.collect();
		info!(
			"Navigation initialised for a map of {}x{} sectors",
			map_dimensions.get_sector_columns(),
			map_dimensions.get_sector_rows()
		);
		NavigationEngine {
			map_dimensions,
			layers,
			field_cache,
			async_fields: AsyncFieldScheduler::default(),
			dirty_sectors: vec![BTreeSet::new(); NavLayer::COUNT],
			deferred_fields: HashSet::new(),
			diplomacy: Diplomacy::default(),
		}
	}
	/// Size of the map and the world space conversions
	pub fn get_map_dimensions(&self) -> &MapDimensions {
		&self.map_dimensions
	}
	/// Navigation state of a single layer
	pub fn get_layer_sectors(&self, layer: NavLayer) -> &LayerSectors {
		&self.layers[layer.get_index()]
	}
	/// Every field computed so far
	pub fn get_field_cache(&self) -> &FieldCache {
		&self.field_cache
	}
	/// Which factions are hostile to one another
	pub fn get_diplomacy(&self) -> &Diplomacy {
		&self.diplomacy
	}
	/// Declare whether two factions are enemies. Cached fields built for
	/// attacking factions are dropped as their costs depended on the old relation
	pub fn set_diplomacy(&mut self, a: u8, b: u8, enemies: bool) {
		if self.diplomacy.are_enemies(a, b) == enemies {
			return;
		}
		self.diplomacy.set_relation(a, b, enemies);
		self.field_cache.clear();
		self.deferred_fields.clear();
	}
	/// Counters of the field caches
	pub fn get_cache_stats(&self) -> FieldCacheStats {
		self.field_cache.get_stats()
	}
	/// Drop every cached field
	pub fn clear_cache(&mut self) {
		self.field_cache.clear();
		self.deferred_fields.clear();
	}
	/// Sectors awaiting an update on a layer
	pub fn get_dirty_sectors(&self, layer: NavLayer) -> &BTreeSet<SectorID> {
		&self.dirty_sectors[layer.get_index()]
	}
	/// Cells of each layer covered by a footprint
	fn rasterize_per_layer(&self, footprint: &Footprint) -> Vec<(NavLayer, Vec<(SectorID, FieldCell)>)> {
		NavLayer::ALL
			.iter()
			.map(|layer| {
				let cells = footprint
					.rasterize(&self.map_dimensions, layer.get_footprint_radius())
					.into_iter()
					.filter_map(|global| self.map_dimensions.get_sector_and_field_cell_from_global(global))
					.collect();
				(*layer, cells)
			})
			.collect()
	}
	/// Place a dynamic blocker of `faction` on every layer
	pub fn add_blocker(&mut self, footprint: &Footprint, faction: u8) {
		for (layer, cells) in self.rasterize_per_layer(footprint) {
			let index = layer.get_index();
			for (sector_id, field_cell) in cells {
				self.layers[index]
					.get_sector_mut(&sector_id)
					.increment_blocker(field_cell, faction);
				self.dirty_sectors[index].insert(sector_id);
			}
		}
		trace!("Added blocker of faction {} at {:?}", faction, footprint.get_centre());
	}
	/// Remove a dynamic blocker previously added with the same footprint and faction
	pub fn remove_blocker(&mut self, footprint: &Footprint, faction: u8) {
		for (layer, cells) in self.rasterize_per_layer(footprint) {
			let index = layer.get_index();
			for (sector_id, field_cell) in cells {
				self.layers[index]
					.get_sector_mut(&sector_id)
					.decrement_blocker(field_cell, faction);
				self.dirty_sectors[index].insert(sector_id);
			}
		}
		trace!("Removed blocker of faction {} at {:?}", faction, footprint.get_centre());
	}
	/// Make the cells under a footprint permanently impassable on every layer
	pub fn cutout_static_object(&mut self, footprint: &Footprint) {
		self.apply_static_cutout(footprint, true);
	}
	/// Undo [NavigationEngine::cutout_static_object] for the same footprint
	pub fn remove_static_cutout(&mut self, footprint: &Footprint) {
		self.apply_static_cutout(footprint, false);
	}
	/// Add or remove a cutout, drop every field whose route may cross the
	/// affected sectors and rebuild the layers
	fn apply_static_cutout(&mut self, footprint: &Footprint, add: bool) {
		for (layer, cells) in self.rasterize_per_layer(footprint) {
			let index = layer.get_index();
			let mut affected = BTreeSet::new();
			for (sector_id, field_cell) in cells {
				let sector = self.layers[index].get_sector_mut(&sector_id);
				if add {
					sector.add_cutout(field_cell);
				} else {
					sector.remove_cutout(field_cell);
				}
				affected.insert(sector_id);
			}
			if affected.is_empty() {
				continue;
			}
			for sector_id in affected.iter() {
				self.field_cache.invalidate_all_through_sector(layer, *sector_id);
				for neighbour in self.map_dimensions.get_ids_of_surrounding_sectors(sector_id) {
					self.field_cache.invalidate_all_through_sector(layer, neighbour);
				}
			}
			self.layers[index].rebuild(&mut self.field_cache);
			debug!("Static cutout rebuilt {:?} across {} sectors", layer, affected.len());
		}
	}
	/// Bring the local islands, portal edges and the cache of every dirty
	/// sector up to date
	pub fn update(&mut self) {
		if self.dirty_sectors.iter().all(|dirty| dirty.is_empty()) {
			return;
		}
		// seek jobs snapshot the old blockers, land them first so the
		// invalidation below clears them out
		let joined = self.async_fields.await_all(&mut self.field_cache);
		if joined > 0 {
			trace!("Joined {} async fields ahead of a navigation update", joined);
		}
		for layer in NavLayer::ALL {
			let index = layer.get_index();
			let dirty = std::mem::take(&mut self.dirty_sectors[index]);
			if dirty.is_empty() {
				continue;
			}
			let mut flipped = 0;
			for sector_id in dirty.iter() {
				let sector = self.layers[index].get_sector_mut(sector_id);
				let borders_before = get_border_islands(sector);
				calculate_local_islands(sector);
				let borders_after = get_border_islands(sector);
				// portal fields next door are seeded from the islands along this border
				for (side, neighbour) in self
					.map_dimensions
					.get_ordinal_and_ids_of_neighbouring_sectors(sector_id)
				{
					let i = side_index(side);
					if borders_before[i] != borders_after[i] {
						self.field_cache.invalidate_all_at_sector(layer, neighbour);
					}
				}
				let sector = self.layers[index].get_sector_mut(sector_id);
				if update_edge_states(sector) {
					flipped += 1;
					self.field_cache.invalidate_all_through_sector(layer, *sector_id);
				} else {
					self.field_cache.invalidate_all_at_sector(layer, *sector_id);
				}
				self.field_cache
					.invalidate_neighbour_enemy_seek_fields(layer, *sector_id, &self.map_dimensions);
			}
			if flipped > 0 {
				calculate_portal_components(&mut self.layers[index]);
			}
			debug!(
				"Updated {} dirty sectors of {:?}, {} with portal edge changes",
				dirty.len(),
				layer,
				flipped
			);
		}
	}
	/// Request a path between two world positions, the returned handle is
	/// used to query desired velocities. [None] when no route exists
	pub fn request_path(&mut self, source: Vec2, target: Vec2, layer: NavLayer) -> Option<DestinationID> {
		self.request_path_inner(source, target, layer, None)
	}
	/// As [NavigationEngine::request_path] but the blockers of the enemies of
	/// `faction` are treated as passable so the route leads into them
	pub fn request_path_attacking(
		&mut self,
		source: Vec2,
		target: Vec2,
		layer: NavLayer,
		faction: u8,
	) -> Option<DestinationID> {
		self.request_path_inner(source, target, layer, Some(faction))
	}
	fn request_path_inner(
		&mut self,
		source: Vec2,
		target: Vec2,
		layer: NavLayer,
		attacking_faction: Option<u8>,
	) -> Option<DestinationID> {
		let source_global = self.map_dimensions.get_global_cell_from_xy(source);
		// a unit overlapping an impassable cell paths from the nearest open one
		let source_global = self.find_closest_pathable_global(source_global, layer, false)?;
		let source = self.map_dimensions.get_sector_and_field_cell_from_global(source_global)?;
		let target = self.map_dimensions.get_sector_and_field_cell_from_xy(target)?;
		self.request_path_cells(layer, source, target, attacking_faction)
	}
	/// Request a path between two cells
	pub fn request_path_cells(
		&mut self,
		layer: NavLayer,
		source: (SectorID, FieldCell),
		target: (SectorID, FieldCell),
		attacking_faction: Option<u8>,
	) -> Option<DestinationID> {
		request_path(
			&self.layers[layer.get_index()],
			&mut self.field_cache,
			&self.diplomacy,
			source,
			target,
			attacking_faction,
		)
	}
	/// Block until every async field job is finished and commit the results
	pub fn await_async_fields(&mut self) -> usize {
		self.async_fields.await_all(&mut self.field_cache)
	}
}

/// Position of an orthogonal side within [get_border_islands]
fn side_index(side: Ordinal) -> usize {
	match side {
		Ordinal::North => 0,
		Ordinal::East => 1,
		Ordinal::South => 2,
		Ordinal::West => 3,
		_ => panic!("Sectors only share orthogonal boundaries, got {:?}", side),
	}
}

/// Local islands along each boundary of a sector in [Ordinal::ORTHOGONAL] order
fn get_border_islands(sector: &SectorNav) -> [[u16; FIELD_RESOLUTION]; 4] {
	let last = FIELD_RESOLUTION - 1;
	let mut borders = [[ISLAND_NONE; FIELD_RESOLUTION]; 4];
	for i in 0..FIELD_RESOLUTION {
		borders[0][i] = sector.get_local_island(FieldCell::new(i, 0));
		borders[1][i] = sector.get_local_island(FieldCell::new(last, i));
		borders[2][i] = sector.get_local_island(FieldCell::new(i, last));
		borders[3][i] = sector.get_local_island(FieldCell::new(0, i));
	}
	borders
}
