//! Navigation for crowds of units on a tile map, built as a plugin for the
//! Bevy game engine. Movement guidance is computed as per sector flow fields
//! linked by portals, cached and invalidated as blockers come and go
//!

pub mod engine;
pub mod flowfields;
pub mod plugin;

pub mod prelude;
