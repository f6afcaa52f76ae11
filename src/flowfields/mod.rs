//! Flowfields are a means of handling pathfinding for a crowd of actors.
//!
//! [Fixing Pathfinding Once and For All](https://web.archive.org/web/20150905073624/http://www.ai-blog.net/archives/000152.html)
//!
//! [SupCom2- Elijah Emerson](https://www.gameaipro.com/GameAIPro/GameAIPro_Chapter23_Crowd_Pathfinding_and_Steering_Using_Flow_Field_Tiles.pdf)
//!
//! [jdxdev](https://www.jdxdev.com/blog/2020/05/03/flowfields/)
//!
//! [leifnode](https://leifnode.com/2013/12/flow-field-pathfinding/)
//!
//! A map is divided into a series of Sectors with Portals indicating a pathable point from
//! one Sector to a neighbour. Each navigation layer (a locomotion domain and unit footprint)
//! has its own view of every Sector.
//!
//! Sectors are positioned from the top-left corner of the map. The fields of a sector are
//! indexed `[column][row]` from the top-left corner of the sector, a map-wide cell is
//! `sector * FIELD_RESOLUTION + cell`.
//!
//! Definitions:
//!
//! * Sector - a grid area of `64x64` field cells
//!
//! ```text
//!  _____________________________
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! ```
//!
//! * Portal - a pathable window from one Sector to another
//! * Cost field - 8-bit field where a value of 255 represents impassable terrain and range 1 - 254
//! represents the cost of traversing that grid location, 1 being the default and easiest
//! * Island - a label shared by cells which can reach each other, global islands span the map and
//! ignore blockers, local islands stay within a sector and treat blockers as walls
//! * Integration field - uses the cost field as input and stores the calculated cost-to-goal
//! * Flow field - 8-bit field used by actors to flow from one area of space to another. The first 4 bits
//! of the field represent directions of movement and the second 4 bits are flags to indicate whether a
//! field cell is pathable or a goal
//! * LOS field - marks the cells with a straight unobstructed line to the destination so an actor can
//! skip the flow field and move directly towards it
//!

pub mod blockers;
pub mod fields;
pub mod grid_path;
pub mod islands;
pub mod portal;
pub mod sectors;
pub mod terrain;
pub mod utilities;
