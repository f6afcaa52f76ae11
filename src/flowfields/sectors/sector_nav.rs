//! Everything a single sector of a [NavLayer] knows about itself.
//!
//! The terrain [CostField] never changes after construction. Static object
//! cutouts are folded into `cost_base` which is the field used for portals,
//! global islands and line of sight. Dynamic blockers are reference counted per
//! cell (with a per-faction breakdown so that attacking requests can path
//! through enemies) and feed the local islands.
//!

use std::collections::HashMap;

use crate::prelude::*;

#[derive(Clone, Debug)]
pub struct SectorNav {
	/// Cost of the terrain alone
	terrain_cost: CostField,
	/// Terrain cost with static cutouts made impassable
	cost_base: CostField,
	/// Reference counts of static cutouts per cell
	cutouts: [[u16; FIELD_RESOLUTION]; FIELD_RESOLUTION],
	/// Reference counts of dynamic blockers per cell
	blockers: [[u16; FIELD_RESOLUTION]; FIELD_RESOLUTION],
	/// Blocker counts split by faction, only cells with a blocker are present
	faction_occupancy: HashMap<FieldCell, [u16; MAX_FACTIONS]>,
	/// Map-wide connectivity ignoring blockers
	global_islands: [[u16; FIELD_RESOLUTION]; FIELD_RESOLUTION],
	/// Connectivity within this sector accounting for blockers
	local_islands: [[u16; FIELD_RESOLUTION]; FIELD_RESOLUTION],
	/// Portals along the boundaries of the sector
	portals: Vec<Portal>,
	/// For each portal the travel cost from it to every cell of the sector
	travel_costs: Vec<IntegrationField>,
}

impl SectorNav {
	/// Create a sector from its terrain cost, islands and portals are left
	/// for the builders
	pub fn new(terrain_cost: CostField) -> Self {
		SectorNav {
			cost_base: terrain_cost.clone(),
			terrain_cost,
			cutouts: [[0; FIELD_RESOLUTION]; FIELD_RESOLUTION],
			blockers: [[0; FIELD_RESOLUTION]; FIELD_RESOLUTION],
			faction_occupancy: HashMap::new(),
			global_islands: [[ISLAND_NONE; FIELD_RESOLUTION]; FIELD_RESOLUTION],
			local_islands: [[ISLAND_NONE; FIELD_RESOLUTION]; FIELD_RESOLUTION],
			portals: Vec::new(),
			travel_costs: Vec::new(),
		}
	}
	pub fn get_terrain_cost(&self) -> &CostField {
		&self.terrain_cost
	}
	pub fn get_cost_base(&self) -> &CostField {
		&self.cost_base
	}
	/// Whether the terrain (with cutouts) can be walked at all
	pub fn is_passable(&self, field_cell: FieldCell) -> bool {
		self.cost_base.is_passable(field_cell)
	}
	/// Permanently make a cell impassable, cutouts stack
	pub fn add_cutout(&mut self, field_cell: FieldCell) {
		let (c, r) = field_cell.get_column_row();
		self.cutouts[c][r] = self.cutouts[c][r]
			.checked_add(1)
			.unwrap_or_else(|| panic!("Cutout count overflow at {:?}", field_cell));
		self.cost_base.set_field_cell_value(COST_IMPASSABLE, field_cell);
	}
	/// Remove one cutout from a cell, the terrain cost returns once none remain
	pub fn remove_cutout(&mut self, field_cell: FieldCell) {
		let (c, r) = field_cell.get_column_row();
		self.cutouts[c][r] = self.cutouts[c][r]
			.checked_sub(1)
			.unwrap_or_else(|| panic!("Removing a cutout that doesn't exist at {:?}", field_cell));
		if self.cutouts[c][r] == 0 {
			let terrain = self.terrain_cost.get_field_cell_value(field_cell);
			self.cost_base.set_field_cell_value(terrain, field_cell);
		}
	}
	pub fn get_cutout_count(&self, field_cell: FieldCell) -> u16 {
		self.cutouts[field_cell.get_column()][field_cell.get_row()]
	}
	/// Register a blocker of `faction` on a cell
	pub fn increment_blocker(&mut self, field_cell: FieldCell, faction: u8) {
		if faction as usize >= MAX_FACTIONS {
			panic!("Faction {} exceeds the limit of {}", faction, MAX_FACTIONS);
		}
		let (c, r) = field_cell.get_column_row();
		self.blockers[c][r] = self.blockers[c][r]
			.checked_add(1)
			.unwrap_or_else(|| panic!("Blocker count overflow at {:?}", field_cell));
		let occupancy = self
			.faction_occupancy
			.entry(field_cell)
			.or_insert([0; MAX_FACTIONS]);
		occupancy[faction as usize] += 1;
	}
	/// Remove a blocker of `faction` from a cell
	pub fn decrement_blocker(&mut self, field_cell: FieldCell, faction: u8) {
		let (c, r) = field_cell.get_column_row();
		let Some(occupancy) = self.faction_occupancy.get_mut(&field_cell) else {
			panic!("Removing a blocker from unoccupied {:?}", field_cell);
		};
		if faction as usize >= MAX_FACTIONS || occupancy[faction as usize] == 0 {
			panic!(
				"Removing a blocker of faction {} which doesn't occupy {:?}",
				faction, field_cell
			);
		}
		occupancy[faction as usize] -= 1;
		if occupancy.iter().all(|o| *o == 0) {
			self.faction_occupancy.remove(&field_cell);
		}
		self.blockers[c][r] -= 1;
	}
	pub fn get_blocker_count(&self, field_cell: FieldCell) -> u16 {
		self.blockers[field_cell.get_column()][field_cell.get_row()]
	}
	pub fn is_blocked(&self, field_cell: FieldCell) -> bool {
		self.get_blocker_count(field_cell) > 0
	}
	/// Number of blockers on a cell belonging to enemies of `faction`
	pub fn get_enemy_occupancy(&self, field_cell: FieldCell, faction: u8, diplomacy: &Diplomacy) -> u16 {
		match self.faction_occupancy.get(&field_cell) {
			Some(occupancy) => occupancy
				.iter()
				.enumerate()
				.filter(|(f, _)| diplomacy.are_enemies(faction, *f as u8))
				.map(|(_, count)| *count)
				.sum(),
			None => 0,
		}
	}
	/// Whether blockers stop a unit moving through a cell. An attacking unit
	/// is only stopped by the blockers which aren't its enemies
	pub fn is_blocked_for(
		&self,
		field_cell: FieldCell,
		attacking_faction: Option<u8>,
		diplomacy: &Diplomacy,
	) -> bool {
		let blockers = self.get_blocker_count(field_cell);
		match attacking_faction {
			None => blockers > 0,
			Some(faction) => blockers > self.get_enemy_occupancy(field_cell, faction, diplomacy),
		}
	}
	/// Cost used when integrating towards a target, blocked cells are impassable
	pub fn get_effective_cost(
		&self,
		field_cell: FieldCell,
		attacking_faction: Option<u8>,
		diplomacy: &Diplomacy,
	) -> u8 {
		if self.is_blocked_for(field_cell, attacking_faction, diplomacy) {
			COST_IMPASSABLE
		} else {
			self.cost_base.get_field_cell_value(field_cell)
		}
	}
	/// Snapshot of the effective cost of every cell
	pub fn get_effective_cost_field(&self, attacking_faction: Option<u8>, diplomacy: &Diplomacy) -> CostField {
		let mut field = self.cost_base.clone();
		for (column, rows) in self.blockers.iter().enumerate() {
			for (row, count) in rows.iter().enumerate() {
				if *count > 0 {
					let cell = FieldCell::new(column, row);
					let value = self.get_effective_cost(cell, attacking_faction, diplomacy);
					field.set_field_cell_value(value, cell);
				}
			}
		}
		field
	}
	pub fn get_global_island(&self, field_cell: FieldCell) -> u16 {
		self.global_islands[field_cell.get_column()][field_cell.get_row()]
	}
	pub fn set_global_island(&mut self, value: u16, field_cell: FieldCell) {
		self.global_islands[field_cell.get_column()][field_cell.get_row()] = value;
	}
	pub fn get_global_islands(&self) -> &[[u16; FIELD_RESOLUTION]; FIELD_RESOLUTION] {
		&self.global_islands
	}
	pub fn get_local_island(&self, field_cell: FieldCell) -> u16 {
		self.local_islands[field_cell.get_column()][field_cell.get_row()]
	}
	pub fn get_local_islands(&self) -> &[[u16; FIELD_RESOLUTION]; FIELD_RESOLUTION] {
		&self.local_islands
	}
	pub fn get_local_islands_mut(&mut self) -> &mut [[u16; FIELD_RESOLUTION]; FIELD_RESOLUTION] {
		&mut self.local_islands
	}
	pub fn get_portals(&self) -> &Vec<Portal> {
		&self.portals
	}
	pub fn get_portals_mut(&mut self) -> &mut Vec<Portal> {
		&mut self.portals
	}
	/// Add a portal to the sector returning its index
	pub fn push_portal(&mut self, portal: Portal) -> usize {
		if self.portals.len() >= MAX_PORTALS_PER_SECTOR {
			panic!(
				"A sector cannot hold more than {} portals",
				MAX_PORTALS_PER_SECTOR
			);
		}
		self.portals.push(portal);
		self.portals.len() - 1
	}
	/// Drop all portals and their travel tables
	pub fn clear_portals(&mut self) {
		self.portals.clear();
		self.travel_costs.clear();
	}
	pub fn set_travel_costs(&mut self, travel_costs: Vec<IntegrationField>) {
		self.travel_costs = travel_costs;
	}
	/// Cost of travelling from any cell of portal `portal` to `field_cell`
	/// ignoring blockers, infinite when the portal can't reach it
	pub fn get_travel_cost(&self, portal: usize, field_cell: FieldCell) -> f32 {
		match self.travel_costs.get(portal) {
			Some(field) => field.get_cost(field_cell.get_column(), field_cell.get_row()),
			None => f32::INFINITY,
		}
	}
	/// Distinct local islands found on the unblocked cells of a portal
	pub fn get_portal_islands(&self, portal: usize) -> Vec<u16> {
		let mut islands = Vec::new();
		for cell in self.portals[portal].get_cells() {
			let island = self.get_local_island(cell);
			if island != ISLAND_NONE && !islands.contains(&island) {
				islands.push(island);
			}
		}
		islands
	}
	/// Whether any cell of a portal lies on local island `island`
	pub fn does_portal_touch_island(&self, portal: usize, island: u16) -> bool {
		self.portals[portal]
			.get_cells()
			.iter()
			.any(|c| self.get_local_island(*c) == island)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn blockers_counted_per_faction() {
		let mut sector = SectorNav::new(CostField::default());
		let cell = FieldCell::new(3, 3);
		sector.increment_blocker(cell, 1);
		sector.increment_blocker(cell, 2);
		assert_eq!(2, sector.get_blocker_count(cell));
		let mut diplomacy = Diplomacy::default();
		diplomacy.set_relation(0, 1, true);
		assert_eq!(1, sector.get_enemy_occupancy(cell, 0, &diplomacy));
		// faction 2 is neutral so the cell still blocks an attacker
		assert!(sector.is_blocked_for(cell, Some(0), &diplomacy));
		sector.decrement_blocker(cell, 2);
		assert!(!sector.is_blocked_for(cell, Some(0), &diplomacy));
		assert!(sector.is_blocked_for(cell, None, &diplomacy));
		sector.decrement_blocker(cell, 1);
		assert!(!sector.is_blocked(cell));
	}
	#[test]
	#[should_panic]
	fn blocker_underflow() {
		let mut sector = SectorNav::new(CostField::default());
		sector.decrement_blocker(FieldCell::new(0, 0), 0);
	}
	#[test]
	fn cutouts_stack() {
		let mut terrain = CostField::default();
		terrain.set_field_cell_value(7, FieldCell::new(1, 1));
		let mut sector = SectorNav::new(terrain);
		let cell = FieldCell::new(1, 1);
		sector.add_cutout(cell);
		sector.add_cutout(cell);
		sector.remove_cutout(cell);
		assert!(!sector.is_passable(cell));
		sector.remove_cutout(cell);
		assert_eq!(7, sector.get_cost_base().get_field_cell_value(cell));
	}
	#[test]
	fn effective_cost_of_blocked_cell() {
		let mut sector = SectorNav::new(CostField::default());
		sector.increment_blocker(FieldCell::new(4, 4), 0);
		let field = sector.get_effective_cost_field(None, &Diplomacy::default());
		assert_eq!(255, field.get_field_cell_value(FieldCell::new(4, 4)));
		assert_eq!(1, field.get_field_cell_value(FieldCell::new(4, 5)));
	}
}
