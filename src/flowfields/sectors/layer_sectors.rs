//! Every [NavLayer] owns a flat array of [SectorNav]s, one per sector of the
//! map, stored in the index order of [MapDimensions::get_sector_index].
//!

use bevy::prelude::*;

use crate::prelude::*;

#[derive(Clone, Debug)]
pub struct LayerSectors {
	/// The layer these sectors describe
	layer: NavLayer,
	/// Size of the map
	map_dimensions: MapDimensions,
	/// Sectors in index order
	sectors: Vec<SectorNav>,
}

impl LayerSectors {
	/// Build the [CostField] of every sector for `layer` from the terrain.
	/// Portals, islands and travel tables are produced by [LayerSectors::rebuild]
	pub fn new(layer: NavLayer, terrain: &TerrainMap, map_dimensions: MapDimensions) -> Self {
		if terrain.get_sector_columns() != map_dimensions.get_sector_columns()
			|| terrain.get_sector_rows() != map_dimensions.get_sector_rows()
		{
			panic!(
				"Terrain of {}x{} sectors doesn't match a map of {}x{} sectors",
				terrain.get_sector_columns(),
				terrain.get_sector_rows(),
				map_dimensions.get_sector_columns(),
				map_dimensions.get_sector_rows()
			);
		}
		let sectors = map_dimensions
			.iter_sectors()
			.map(|sector_id| {
				SectorNav::new(CostField::from_terrain(
					terrain,
					sector_id,
					layer.get_domain(),
				))
			})
			.collect();
		LayerSectors {
			layer,
			map_dimensions,
			sectors,
		}
	}
	pub fn get_layer(&self) -> NavLayer {
		self.layer
	}
	pub fn get_map_dimensions(&self) -> &MapDimensions {
		&self.map_dimensions
	}
	pub fn get_sectors(&self) -> &Vec<SectorNav> {
		&self.sectors
	}
	pub fn get_sector(&self, sector_id: &SectorID) -> &SectorNav {
		&self.sectors[self.map_dimensions.get_sector_index(sector_id)]
	}
	pub fn get_sector_mut(&mut self, sector_id: &SectorID) -> &mut SectorNav {
		let index = self.map_dimensions.get_sector_index(sector_id);
		&mut self.sectors[index]
	}
	/// Portal `index` of a sector
	pub fn get_portal(&self, sector_id: &SectorID, index: usize) -> &Portal {
		&self.get_sector(sector_id).get_portals()[index]
	}
	/// Terrain cost (with cutouts) of a map-wide cell, cells beyond the map are impassable
	pub fn get_cost_base_global(&self, global: (i32, i32)) -> u8 {
		match self.map_dimensions.get_sector_and_field_cell_from_global(global) {
			Some((sector_id, field_cell)) => self
				.get_sector(&sector_id)
				.get_cost_base()
				.get_field_cell_value(field_cell),
			None => COST_IMPASSABLE,
		}
	}
	/// Global island of a map-wide cell, [ISLAND_NONE] beyond the map
	pub fn get_global_island_global(&self, global: (i32, i32)) -> u16 {
		match self.map_dimensions.get_sector_and_field_cell_from_global(global) {
			Some((sector_id, field_cell)) => self.get_sector(&sector_id).get_global_island(field_cell),
			None => ISLAND_NONE,
		}
	}
	/// Local island of the cell across the `side` boundary from `field_cell`,
	/// [ISLAND_NONE] along the edge of the map
	pub fn get_mirrored_local_island(&self, sector_id: &SectorID, field_cell: FieldCell, side: Ordinal) -> u16 {
		match self.map_dimensions.get_sector_id_from_ordinal(side, sector_id) {
			Some(adjoining) => self
				.get_sector(&adjoining)
				.get_local_island(field_cell.get_mirrored_boundary_cell(side)),
			None => ISLAND_NONE,
		}
	}
	/// Rebuild everything derived from the cost fields: portals, global and
	/// local islands, portal edges and their states, travel tables and the
	/// portal graph components
	pub fn rebuild(&mut self, field_cache: &mut FieldCache) {
		build_portals(self);
		calculate_global_islands(self);
		let sector_ids: Vec<SectorID> = self.map_dimensions.iter_sectors().collect();
		for sector_id in sector_ids.iter() {
			calculate_local_islands(self.get_sector_mut(sector_id));
			build_portal_edges(self, *sector_id, field_cache);
			let sector = self.get_sector_mut(sector_id);
			update_edge_states(sector);
			calculate_travel_costs(sector);
		}
		calculate_portal_components(self);
		debug!("Rebuilt {:?} across {} sectors", self.layer, self.sectors.len());
	}
}
