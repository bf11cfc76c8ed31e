//! Collision world over axis-aligned cubes. Same design as [`crate::dim2`]
//! with one extra axis.

pub mod geom;
pub mod grid;
pub mod response;
pub mod world;

pub use self::geom::{Collision, Cube};
pub use self::response::{BounceResponse, CrossResponse, Response, SlideResponse, TouchResponse};
pub use self::world::{SegmentHit, World, DEFAULT_CELL_SIZE};
