//! Error types for world operations.
//!
//! The core never panics: every fallible operation on a world returns
//! [`WorldError`] through the [`Result`] alias.

use thiserror::Error;

use crate::types::{ItemId, ResponseTag};

/// Errors surfaced by a world's fallible operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    /// World creation with a non-positive cell size.
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(i32),
    /// `add` called with a non-positive width/height/depth.
    #[error("box extents must be positive")]
    InvalidExtents,
    /// Operation on an id that is not in the world.
    #[error("unknown item {0}")]
    UnknownItem(ItemId),
    /// A filter produced a tag with no registered filter or response.
    #[error("no filter or response registered for {0}")]
    UnknownTag(ResponseTag),
}

/// Convenient alias for world operations.
pub type Result<T> = std::result::Result<T, WorldError>;
