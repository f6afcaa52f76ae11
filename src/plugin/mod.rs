//! Defines the Bevy [Plugin] for navigation. The [NavigationEngine] resource
//! is built from the terrain by the host and inserted into the world, the
//! plugin then keeps it up to date each tick:
//!
//! ```text
//!  Tidy:       blocker events
//!  Calculate:  update ─> path requests ─> join async fields
//! ```
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod blocker_layer;
pub mod flow_layer;

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	Tidy,
	Calculate,
}

pub struct NavigationPlugin;

impl Plugin for NavigationPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.add_event::<blocker_layer::EventUpdateBlocker>()
			.add_event::<flow_layer::EventPathRequest>()
			.add_event::<flow_layer::EventPathResolved>()
			.configure_sets(Update, (OrderingSet::Tidy, OrderingSet::Calculate).chain())
			.add_systems(
				Update,
				(
					blocker_layer::process_blocker_updates.in_set(OrderingSet::Tidy),
					(
						flow_layer::update_navigation,
						flow_layer::process_path_requests,
						flow_layer::await_async_fields,
					)
						.chain()
						.in_set(OrderingSet::Calculate),
				)
					.run_if(resource_exists::<NavigationEngine>),
			);
	}
}
