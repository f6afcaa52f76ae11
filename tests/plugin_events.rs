//! Run the [NavigationPlugin] inside an [App] and talk to it through events
//!

use bevy::prelude::*;
use bevy_flowfield_nav::prelude::*;

/// App with the plugin and an engine over an open map of 2x2 sectors
fn prepare_app() -> App {
	let mut app = App::new();
	app.add_plugins(NavigationPlugin);
	app.insert_resource(NavigationEngine::new(
		&TerrainMap::new(2, 2),
		1.0,
		Vec2::ZERO,
		FieldCacheConfig::default(),
	));
	app
}

/// Events sent during the last update
fn drain_resolved(app: &App) -> Vec<EventPathResolved> {
	let events = app.world().resource::<Events<EventPathResolved>>();
	events.iter_current_update_events().copied().collect()
}

#[test]
fn path_request_is_answered() {
	let mut app = prepare_app();
	let requester = app.world_mut().spawn_empty().id();
	app.world_mut().send_event(EventPathRequest::new(
		requester,
		Vec2::new(10.5, 10.5),
		Vec2::new(100.5, 100.5),
		NavLayer::Ground1x1,
	));
	app.update();
	let resolved = drain_resolved(&app);
	assert_eq!(1, resolved.len());
	assert_eq!(requester, resolved[0].requester);
	let destination = resolved[0].destination.unwrap();
	let mut engine = app.world_mut().resource_mut::<NavigationEngine>();
	let velocity = engine.desired_velocity(destination, Vec2::new(10.5, 10.5));
	assert_ne!(Vec2::ZERO, velocity);
}

#[test]
fn blocker_event_reaches_engine() {
	let mut app = prepare_app();
	let footprint = Footprint::Circle {
		centre: Vec2::new(40.5, 40.5),
		radius: 2.0,
	};
	app.world_mut().send_event(EventUpdateBlocker::new(
		footprint,
		BlockerUpdate::AddBlocker { faction: 1 },
	));
	app.update();
	let engine = app.world().resource::<NavigationEngine>();
	assert!(engine.is_blocked(Vec2::new(40.5, 40.5), NavLayer::Ground1x1));
	// the same tick's update has already caught the islands up
	assert!(engine.get_dirty_sectors(NavLayer::Ground1x1).is_empty());

	app.world_mut().send_event(EventUpdateBlocker::new(
		footprint,
		BlockerUpdate::RemoveBlocker { faction: 1 },
	));
	app.update();
	let engine = app.world().resource::<NavigationEngine>();
	assert!(!engine.is_blocked(Vec2::new(40.5, 40.5), NavLayer::Ground1x1));
}

#[test]
fn cutout_event_splits_the_map() {
	let mut app = prepare_app();
	let requester = app.world_mut().spawn_empty().id();
	app.world_mut().send_event(EventUpdateBlocker::new(
		Footprint::OrientedBox {
			centre: Vec2::new(64.0, 64.0),
			half_extents: Vec2::new(1.0, 70.0),
			axis: Vec2::X,
		},
		BlockerUpdate::AddCutout,
	));
	app.world_mut().send_event(EventPathRequest::new(
		requester,
		Vec2::new(10.5, 10.5),
		Vec2::new(100.5, 10.5),
		NavLayer::Ground1x1,
	));
	app.update();
	let resolved = drain_resolved(&app);
	assert_eq!(1, resolved.len());
	assert!(resolved[0].destination.is_none());
}

#[test]
fn plugin_idles_without_engine() {
	let mut app = App::new();
	app.add_plugins(NavigationPlugin);
	let requester = app.world_mut().spawn_empty().id();
	app.world_mut().send_event(EventPathRequest::new(
		requester,
		Vec2::ZERO,
		Vec2::ONE,
		NavLayer::Air1x1,
	));
	app.update();
	assert!(drain_resolved(&app).is_empty());
}
