//! The engine knows nothing of the game's entities, enemy-seek and
//! entity-surround queries ask the host for them through [NavEntities].
//!

use bevy::prelude::*;

/// What navigation needs to know about an entity
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavEntity {
	/// Unique ID assigned by the host
	pub uid: u32,
	/// Faction the entity fights for, below [crate::prelude::MAX_FACTIONS]
	pub faction: u8,
	/// World position
	pub position: Vec2,
	/// Selection radius in world units
	pub radius: f32,
}

/// Spatial lookup of entities provided by the host
pub trait NavEntities {
	/// Every entity whose position lies within the world space rectangle
	fn entities_in_rect(&self, min: Vec2, max: Vec2) -> Vec<NavEntity>;
	/// A single entity by its ID
	fn get_entity(&self, uid: u32) -> Option<NavEntity>;
}

impl NavEntities for [NavEntity] {
	fn entities_in_rect(&self, min: Vec2, max: Vec2) -> Vec<NavEntity> {
		self.iter()
			.filter(|e| {
				e.position.x >= min.x && e.position.y >= min.y && e.position.x < max.x && e.position.y < max.y
			})
			.copied()
			.collect()
	}
	fn get_entity(&self, uid: u32) -> Option<NavEntity> {
		self.iter().find(|e| e.uid == uid).copied()
	}
}
