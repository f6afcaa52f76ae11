//! `use bevy_flowfield_nav::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::flowfields::{
	blockers::*,
	fields::{cost_field::*, flow_field::*, integration_field::*, los_field::*, *},
	grid_path::*,
	islands::*,
	portal::portal_graph::*,
	portal::portals::*,
	sectors::{layer_sectors::*, sector_nav::*, *},
	terrain::*,
	utilities::*,
	*,
};

#[doc(hidden)]
pub use crate::engine::{
	async_fields::*, entities::*, field_builder::*, field_cache::*, lru::*, orchestrator::*, *,
};

#[doc(hidden)]
pub use crate::plugin::{blocker_layer::*, flow_layer::*, *};
