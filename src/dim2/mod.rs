//! Collision world over axis-aligned rectangles.

pub mod geom;
pub mod grid;
pub mod response;
pub mod world;

pub use self::geom::{Collision, Rect};
pub use self::response::{BounceResponse, CrossResponse, Response, SlideResponse, TouchResponse};
pub use self::world::{SegmentHit, World, DEFAULT_CELL_SIZE};
