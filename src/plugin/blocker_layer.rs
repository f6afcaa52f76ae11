//! Logic for applying changes to blockers and static cutouts sent as events,
//! islands and the cache catch up in [super::flow_layer::update_navigation]
//!

use crate::prelude::*;
use bevy::prelude::*;

/// What a [EventUpdateBlocker] does with its footprint
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BlockerUpdate {
	/// Place a dynamic blocker belonging to a faction
	AddBlocker { faction: u8 },
	/// Remove a dynamic blocker placed with the same footprint and faction
	RemoveBlocker { faction: u8 },
	/// Make the footprint permanently impassable
	AddCutout,
	/// Undo an [BlockerUpdate::AddCutout] of the same footprint
	RemoveCutout,
}

/// Used to change the blockers or cutouts of the [NavigationEngine]
#[derive(Event, Clone, Copy, Debug)]
pub struct EventUpdateBlocker {
	/// Area affected
	footprint: Footprint,
	/// The change to make
	update: BlockerUpdate,
}

impl EventUpdateBlocker {
	/// Create a new instance of [EventUpdateBlocker]
	pub fn new(footprint: Footprint, update: BlockerUpdate) -> Self {
		EventUpdateBlocker { footprint, update }
	}
	pub fn get_footprint(&self) -> &Footprint {
		&self.footprint
	}
	pub fn get_update(&self) -> BlockerUpdate {
		self.update
	}
}

/// Read [EventUpdateBlocker] and apply them to the [NavigationEngine]
#[cfg(not(tarpaulin_include))]
pub fn process_blocker_updates(
	mut events: EventReader<EventUpdateBlocker>,
	mut engine: ResMut<NavigationEngine>,
) {
	let mut count = 0;
	for event in events.read() {
		let footprint = event.get_footprint();
		match event.get_update() {
			BlockerUpdate::AddBlocker { faction } => engine.add_blocker(footprint, faction),
			BlockerUpdate::RemoveBlocker { faction } => engine.remove_blocker(footprint, faction),
			BlockerUpdate::AddCutout => engine.cutout_static_object(footprint),
			BlockerUpdate::RemoveCutout => engine.remove_static_cutout(footprint),
		}
		count += 1;
	}
	if count > 0 {
		trace!("Applied {} blocker updates", count);
	}
}
