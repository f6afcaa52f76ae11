//! Every field the engine computes is kept in one of four bounded caches:
//!
//! * [LosField]s keyed by destination and sector
//! * [FlowField]s keyed by their content-addressed [FlowFieldID]
//! * the list of [FlowFieldID]s a destination uses in each sector
//! * [GridPath]s between two cells of a sector
//!
//! Alongside them two indices record which destinations and which flow fields
//! have something stored for each sector of a layer so that a change to a
//! sector only visits the entries it affects:
//!
//! ```text
//!  (layer, sector) ──> {DestinationID} ──> LOS / mapping entries
//!  (layer, sector) ──> {FlowFieldID}   ──> flow entries
//! ```
//!
//! The cache never holds a stale entry: every change to blockers or terrain
//! is followed by an invalidation before the next query.
//!

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::prelude::*;

/// Capacities of the caches
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldCacheConfig {
	pub los_capacity: usize,
	pub flow_capacity: usize,
	pub mapping_capacity: usize,
	pub grid_path_capacity: usize,
}

impl Default for FieldCacheConfig {
	fn default() -> Self {
		FieldCacheConfig {
			los_capacity: 1024,
			flow_capacity: 1024,
			mapping_capacity: 4096,
			grid_path_capacity: 2048,
		}
	}
}

impl FieldCacheConfig {
	/// Create a config, every capacity must be non-zero
	pub fn new(los_capacity: usize, flow_capacity: usize, mapping_capacity: usize, grid_path_capacity: usize) -> Self {
		if los_capacity == 0 || flow_capacity == 0 || mapping_capacity == 0 || grid_path_capacity == 0 {
			panic!("FieldCache capacities must be greater than zero");
		}
		FieldCacheConfig {
			los_capacity,
			flow_capacity,
			mapping_capacity,
			grid_path_capacity,
		}
	}
	/// From a `ron` file generate the [FieldCacheConfig]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String) -> Self {
		let file = std::fs::File::open(path).expect("Failed opening FieldCacheConfig file");
		let config: FieldCacheConfig = match ron::de::from_reader(file) {
			Ok(config) => config,
			Err(e) => panic!("Failed deserializing FieldCacheConfig: {}", e),
		};
		FieldCacheConfig::new(
			config.los_capacity,
			config.flow_capacity,
			config.mapping_capacity,
			config.grid_path_capacity,
		)
	}
}

/// Usage counters of one cache
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LruStats {
	hits: u64,
	misses: u64,
	inserts: u64,
	len: usize,
	capacity: usize,
}

impl LruStats {
	pub fn get_hits(&self) -> u64 {
		self.hits
	}
	pub fn get_misses(&self) -> u64 {
		self.misses
	}
	pub fn get_inserts(&self) -> u64 {
		self.inserts
	}
	pub fn get_len(&self) -> usize {
		self.len
	}
	pub fn get_capacity(&self) -> usize {
		self.capacity
	}
	/// Fraction of lookups which found an entry
	pub fn get_hit_rate(&self) -> f32 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f32 / total as f32
		}
	}
	/// Fraction of the capacity in use
	pub fn get_utilisation(&self) -> f32 {
		self.len as f32 / self.capacity as f32
	}
}

/// Snapshot of the counters of every cache
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldCacheStats {
	pub los: LruStats,
	pub flow: LruStats,
	pub mapping: LruStats,
	pub grid_path: LruStats,
}

/// Key of LOS and mapping entries
pub type DestinationSectorKey = (DestinationID, SectorID);

#[derive(Clone, Debug)]
pub struct FieldCache {
	los: Lru<DestinationSectorKey, LosField>,
	flows: Lru<FlowFieldID, FlowField>,
	mappings: Lru<DestinationSectorKey, Vec<FlowFieldID>>,
	grid_paths: Lru<GridPathKey, GridPath>,
	/// Destinations with an LOS or mapping entry in a sector
	destination_index: HashMap<(NavLayer, SectorID), HashSet<DestinationID>>,
	/// Flow fields stored for a sector
	flow_index: HashMap<(NavLayer, SectorID), HashSet<FlowFieldID>>,
	los_stats: LruStats,
	flow_stats: LruStats,
	mapping_stats: LruStats,
	grid_path_stats: LruStats,
}

impl FieldCache {
	pub fn new(config: FieldCacheConfig) -> Self {
		FieldCache {
			los: Lru::new(config.los_capacity),
			flows: Lru::new(config.flow_capacity),
			mappings: Lru::new(config.mapping_capacity),
			grid_paths: Lru::new(config.grid_path_capacity),
			destination_index: HashMap::new(),
			flow_index: HashMap::new(),
			los_stats: LruStats::default(),
			flow_stats: LruStats::default(),
			mapping_stats: LruStats::default(),
			grid_path_stats: LruStats::default(),
		}
	}
	/// Lookup the [LosField] of a destination in a sector
	pub fn get_los(&mut self, key: &DestinationSectorKey) -> Option<&LosField> {
		let found = self.los.get(key);
		record(&mut self.los_stats, found.is_some());
		found
	}
	/// Lookup without touching recency or counters
	pub fn peek_los(&self, key: &DestinationSectorKey) -> Option<&LosField> {
		self.los.peek(key)
	}
	pub fn insert_los(&mut self, key: DestinationSectorKey, field: LosField) {
		self.los_stats.inserts += 1;
		self.index_destination(&key);
		if let Some((evicted, _)) = self.los.put(key, field) {
			trace!("Evicted LosField {:?}", evicted);
			self.unindex_destination(&evicted);
		}
	}
	pub fn get_flow(&mut self, id: &FlowFieldID) -> Option<&FlowField> {
		let found = self.flows.get(id);
		record(&mut self.flow_stats, found.is_some());
		found
	}
	pub fn contains_flow(&self, id: &FlowFieldID) -> bool {
		self.flows.contains(id)
	}
	pub fn peek_flow(&self, id: &FlowFieldID) -> Option<&FlowField> {
		self.flows.peek(id)
	}
	pub fn insert_flow(&mut self, id: FlowFieldID, field: FlowField) {
		self.flow_stats.inserts += 1;
		self.flow_index
			.entry((id.get_layer(), id.get_sector()))
			.or_default()
			.insert(id);
		if let Some((evicted, _)) = self.flows.put(id, field) {
			trace!("Evicted FlowField {:?}", evicted);
			self.unindex_flow(&evicted);
		}
	}
	/// The [FlowFieldID]s a destination uses in a sector
	pub fn get_mapping(&mut self, key: &DestinationSectorKey) -> Option<&Vec<FlowFieldID>> {
		let found = self.mappings.get(key);
		record(&mut self.mapping_stats, found.is_some());
		found
	}
	pub fn peek_mapping(&self, key: &DestinationSectorKey) -> Option<&Vec<FlowFieldID>> {
		self.mappings.peek(key)
	}
	/// Record that a destination uses a [FlowFieldID] in a sector, each id is only listed once
	pub fn insert_mapping(&mut self, key: DestinationSectorKey, id: FlowFieldID) {
		self.index_destination(&key);
		if let Some(ids) = self.mappings.peek_mut(&key) {
			if !ids.contains(&id) {
				ids.push(id);
				self.mapping_stats.inserts += 1;
			}
			return;
		}
		self.mapping_stats.inserts += 1;
		if let Some((evicted, _)) = self.mappings.put(key, vec![id]) {
			trace!("Evicted mapping {:?}", evicted);
			self.unindex_destination(&evicted);
		}
	}
	pub fn get_grid_path(&mut self, key: &GridPathKey) -> Option<GridPath> {
		let found = self.grid_paths.get(key).cloned();
		record(&mut self.grid_path_stats, found.is_some());
		found
	}
	pub fn insert_grid_path(&mut self, key: GridPathKey, path: GridPath) {
		self.grid_path_stats.inserts += 1;
		self.grid_paths.put(key, path);
	}
	/// Drop every entry stored for a sector: its LOS fields, mappings, flow
	/// fields and grid paths. Returns the number of entries removed
	pub fn invalidate_all_at_sector(&mut self, layer: NavLayer, sector_id: SectorID) -> usize {
		let mut removed = 0;
		if let Some(destinations) = self.destination_index.remove(&(layer, sector_id)) {
			for destination in destinations {
				let key = (destination, sector_id);
				removed += self.los.remove(&key).is_some() as usize;
				removed += self.mappings.remove(&key).is_some() as usize;
			}
		}
		if let Some(ids) = self.flow_index.remove(&(layer, sector_id)) {
			for id in ids {
				removed += self.flows.remove(&id).is_some() as usize;
			}
		}
		removed += self
			.grid_paths
			.retain(|key, _| !(key.layer == layer && key.sector == sector_id))
			.len();
		if removed > 0 {
			debug!(
				"Invalidated {} entries at {:?} of {:?}",
				removed, sector_id, layer
			);
		}
		removed
	}
	/// Drop everything stored for every destination which has an entry in
	/// the sector, wherever those entries are, along with the sector's own
	/// entries. Used when a route through the sector may no longer exist
	pub fn invalidate_all_through_sector(&mut self, layer: NavLayer, sector_id: SectorID) -> usize {
		let destinations: HashSet<DestinationID> = self
			.destination_index
			.get(&(layer, sector_id))
			.cloned()
			.unwrap_or_default();
		let mut removed = self.invalidate_all_at_sector(layer, sector_id);
		if destinations.is_empty() {
			return removed;
		}
		let los_keys: Vec<DestinationSectorKey> = self
			.los
			.keys()
			.filter(|(d, _)| destinations.contains(d))
			.copied()
			.collect();
		for key in los_keys {
			self.los.remove(&key);
			self.unindex_destination(&key);
			removed += 1;
		}
		let mapping_keys: Vec<DestinationSectorKey> = self
			.mappings
			.keys()
			.filter(|(d, _)| destinations.contains(d))
			.copied()
			.collect();
		for key in mapping_keys {
			if let Some(ids) = self.mappings.remove(&key) {
				removed += 1;
				for id in ids {
					if self.flows.remove(&id).is_some() {
						self.unindex_flow(&id);
						removed += 1;
					}
				}
			}
			self.unindex_destination(&key);
		}
		debug!(
			"Invalidated {} entries of {} destinations through {:?} of {:?}",
			removed,
			destinations.len(),
			sector_id,
			layer
		);
		removed
	}
	/// Drop the enemy-seek and entity-surround fields of the sectors around
	/// `sector_id` as the occupants of this sector pull on them
	pub fn invalidate_neighbour_enemy_seek_fields(
		&mut self,
		layer: NavLayer,
		sector_id: SectorID,
		map_dimensions: &MapDimensions,
	) -> usize {
		let mut removed = 0;
		for neighbour in map_dimensions.get_ids_of_surrounding_sectors(&sector_id) {
			let Some(ids) = self.flow_index.get_mut(&(layer, neighbour)) else {
				continue;
			};
			let seeking: Vec<FlowFieldID> = ids.iter().filter(|id| id.is_async_kind()).copied().collect();
			for id in seeking {
				ids.remove(&id);
				removed += self.flows.remove(&id).is_some() as usize;
			}
		}
		removed
	}
	/// Forget everything
	pub fn clear(&mut self) {
		self.los.clear();
		self.flows.clear();
		self.mappings.clear();
		self.grid_paths.clear();
		self.destination_index.clear();
		self.flow_index.clear();
	}
	pub fn get_stats(&self) -> FieldCacheStats {
		FieldCacheStats {
			los: LruStats {
				len: self.los.len(),
				capacity: self.los.get_capacity(),
				..self.los_stats
			},
			flow: LruStats {
				len: self.flows.len(),
				capacity: self.flows.get_capacity(),
				..self.flow_stats
			},
			mapping: LruStats {
				len: self.mappings.len(),
				capacity: self.mappings.get_capacity(),
				..self.mapping_stats
			},
			grid_path: LruStats {
				len: self.grid_paths.len(),
				capacity: self.grid_paths.get_capacity(),
				..self.grid_path_stats
			},
		}
	}
	fn index_destination(&mut self, key: &DestinationSectorKey) {
		self.destination_index
			.entry((key.0.get_layer(), key.1))
			.or_default()
			.insert(key.0);
	}
	/// Remove a destination from the sector index once neither its LOS nor mapping remain
	fn unindex_destination(&mut self, key: &DestinationSectorKey) {
		if self.los.contains(key) || self.mappings.contains(key) {
			return;
		}
		let index_key = (key.0.get_layer(), key.1);
		if let Some(destinations) = self.destination_index.get_mut(&index_key) {
			destinations.remove(&key.0);
			if destinations.is_empty() {
				self.destination_index.remove(&index_key);
			}
		}
	}
	fn unindex_flow(&mut self, id: &FlowFieldID) {
		let index_key = (id.get_layer(), id.get_sector());
		if let Some(ids) = self.flow_index.get_mut(&index_key) {
			ids.remove(id);
			if ids.is_empty() {
				self.flow_index.remove(&index_key);
			}
		}
	}
}

/// Count a lookup
fn record(stats: &mut LruStats, hit: bool) {
	if hit {
		stats.hits += 1;
	} else {
		stats.misses += 1;
	}
}
