//! thud: kinematic collision world for axis-aligned boxes.
//!
//! A uniform-grid broadphase, a swept narrowphase built on the Minkowski
//! difference and a Liang-Barsky segment clip, and an iterative move
//! resolver with pluggable touch/cross/slide/bounce responses. Rectangles
//! live in [`dim2`], cubes in [`dim3`]; the two trees share one design with
//! one extra axis.

pub mod dim2;
pub mod dim3;
pub mod error;
pub mod types;

pub use crate::error::{Result, WorldError};
pub use crate::types::{CollisionFilter, ItemFilter, ItemId, ResponseTag, TagFilter, DELTA};
