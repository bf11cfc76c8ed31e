use std::fmt;

/// Floating-point margin of error absorbed by inclusion tests.
pub const DELTA: f64 = 1e-10;

/// Opaque handle to an item stored in a world. Allocated ids are never zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer code selecting the resolution strategy for a collision pair.
///
/// The four built-in codes are stable; user strategies register under any
/// other positive tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResponseTag(pub i32);

impl ResponseTag {
    /// Stop at the contact point.
    pub const TOUCH: ResponseTag = ResponseTag(1);
    /// Pass through, still reporting the contact.
    pub const CROSS: ResponseTag = ResponseTag(2);
    /// Cancel the motion along the contact normal.
    pub const SLIDE: ResponseTag = ResponseTag(3);
    /// Reflect the remaining motion about the contact normal.
    pub const BOUNCE: ResponseTag = ResponseTag(4);
}

impl fmt::Display for ResponseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ResponseTag::TOUCH => write!(f, "touch"),
            ResponseTag::CROSS => write!(f, "cross"),
            ResponseTag::SLIDE => write!(f, "slide"),
            ResponseTag::BOUNCE => write!(f, "bounce"),
            ResponseTag(other) => write!(f, "tag({other})"),
        }
    }
}

/// Pair predicate deciding which response applies between a moving item and
/// an obstacle. `None` means the pair is ignored entirely.
pub trait CollisionFilter {
    fn filter(&self, item: ItemId, other: ItemId) -> Option<ResponseTag>;
}

impl<F> CollisionFilter for F
where
    F: Fn(ItemId, ItemId) -> Option<ResponseTag>,
{
    fn filter(&self, item: ItemId, other: ItemId) -> Option<ResponseTag> {
        self(item, other)
    }
}

/// Filter returning the same tag for every pair. One per built-in response
/// is pre-installed in a new world.
#[derive(Copy, Clone, Debug)]
pub struct TagFilter(pub ResponseTag);

impl CollisionFilter for TagFilter {
    fn filter(&self, _item: ItemId, _other: ItemId) -> Option<ResponseTag> {
        Some(self.0)
    }
}

/// Per-item predicate applied by queries before the geometric test.
pub trait ItemFilter {
    fn filter(&self, item: ItemId) -> bool;
}

impl<F> ItemFilter for F
where
    F: Fn(ItemId) -> bool,
{
    fn filter(&self, item: ItemId) -> bool {
        self(item)
    }
}
