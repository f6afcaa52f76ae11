//! A Portal indicates a pathable window from one Sector to another.
//!
//! [portals] finds the portals along every shared sector boundary and joins the
//! portals of a sector with edges, [portal_graph] searches the resulting graph
//! for a high level route of sector crossings.

pub mod portal_graph;
pub mod portals;
