//! Logic relating to path requests and the per tick upkeep of the [NavigationEngine]
//!

use crate::prelude::*;
use bevy::prelude::*;

/// A request to find a path for `requester` from `source` to `target`
#[derive(Event, Clone, Copy, Debug)]
pub struct EventPathRequest {
	/// The entity the path is for
	requester: Entity,
	/// World position to path from
	source: Vec2,
	/// World position to path to
	target: Vec2,
	/// Layer the requester moves on
	layer: NavLayer,
	/// Faction whose enemies the path should lead through
	attacking_faction: Option<u8>,
}

impl EventPathRequest {
	pub fn new(requester: Entity, source: Vec2, target: Vec2, layer: NavLayer) -> Self {
		EventPathRequest {
			requester,
			source,
			target,
			layer,
			attacking_faction: None,
		}
	}
	/// A request whose path leads into the enemies of `faction`
	pub fn new_attacking(requester: Entity, source: Vec2, target: Vec2, layer: NavLayer, faction: u8) -> Self {
		EventPathRequest {
			requester,
			source,
			target,
			layer,
			attacking_faction: Some(faction),
		}
	}
	pub fn get_requester(&self) -> Entity {
		self.requester
	}
	pub fn get_source(&self) -> Vec2 {
		self.source
	}
	pub fn get_target(&self) -> Vec2 {
		self.target
	}
	pub fn get_layer(&self) -> NavLayer {
		self.layer
	}
	pub fn get_attacking_faction(&self) -> Option<u8> {
		self.attacking_faction
	}
}

/// Outcome of an [EventPathRequest], `destination` is [None] when no path exists
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct EventPathResolved {
	pub requester: Entity,
	pub destination: Option<DestinationID>,
}

/// Recompute the islands and portal edges of dirty sectors and invalidate the
/// cache where they changed
#[cfg(not(tarpaulin_include))]
pub fn update_navigation(mut engine: ResMut<NavigationEngine>) {
	engine.update();
}

/// Process [EventPathRequest]s answering each with an [EventPathResolved]
#[cfg(not(tarpaulin_include))]
pub fn process_path_requests(
	mut events: EventReader<EventPathRequest>,
	mut engine: ResMut<NavigationEngine>,
	mut resolved: EventWriter<EventPathResolved>,
) {
	for event in events.read() {
		let destination = match event.get_attacking_faction() {
			Some(faction) => engine.request_path_attacking(
				event.get_source(),
				event.get_target(),
				event.get_layer(),
				faction,
			),
			None => engine.request_path(event.get_source(), event.get_target(), event.get_layer()),
		};
		if destination.is_none() {
			debug!("No path for {:?} to {:?}", event.get_requester(), event.get_target());
		}
		resolved.write(EventPathResolved {
			requester: event.get_requester(),
			destination,
		});
	}
}

/// Commit the enemy-seek and entity-surround fields computed this tick
#[cfg(not(tarpaulin_include))]
pub fn await_async_fields(mut engine: ResMut<NavigationEngine>) {
	engine.await_async_fields();
}
