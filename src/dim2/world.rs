//! The collision world: item store, grid index, queries, and the iterative
//! move resolver.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use glam::DVec2;
use log::{debug, trace};

use super::geom::{self, Collision, Rect};
use super::grid::{self, CellRect};
use super::response::{BounceResponse, CrossResponse, Response, SlideResponse, TouchResponse};
use crate::error::{Result, WorldError};
use crate::types::{CollisionFilter, ItemFilter, ItemId, ResponseTag, TagFilter};

/// Cell size used by [`World::default`].
pub const DEFAULT_CELL_SIZE: i32 = 64;

/// Segment query record: entry/exit parameters relative to the query
/// segment, plus the corresponding world coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SegmentHit {
    pub item: ItemId,
    pub ti1: f64,
    pub ti2: f64,
    pub enter: DVec2,
    pub exit: DVec2,
}

struct SegmentInfo {
    item: ItemId,
    ti1: f64,
    ti2: f64,
    weight: f64,
}

/// Wraps the caller's filter and rejects every pair already resolved during
/// the current move, which bounds the resolver's iteration count.
struct VisitedFilter<'a> {
    visited: BTreeSet<ItemId>,
    inner: &'a dyn CollisionFilter,
}

impl CollisionFilter for VisitedFilter<'_> {
    fn filter(&self, item: ItemId, other: ItemId) -> Option<ResponseTag> {
        if self.visited.contains(&other) {
            return None;
        }
        self.inner.filter(item, other)
    }
}

/// Collision world over axis-aligned rectangles.
///
/// Items are boxes addressed by [`ItemId`]. A sparse uniform grid maps cells
/// to the ids overlapping them; moves are resolved one contact at a time
/// through the registered response strategies.
pub struct World {
    cell_size: i32,
    next_id: u32,
    items: BTreeMap<ItemId, Rect>,
    grid: HashMap<(i32, i32), BTreeSet<ItemId>>,
    responses: HashMap<ResponseTag, Box<dyn Response>>,
    filters: HashMap<ResponseTag, Box<dyn CollisionFilter>>,
}

impl Default for World {
    fn default() -> Self {
        Self::with_cell_size(DEFAULT_CELL_SIZE)
    }
}

impl World {
    /// Create a world with the given grid resolution in world units.
    ///
    /// The touch/cross/slide/bounce responses and their tag filters come
    /// pre-installed.
    pub fn new(cell_size: i32) -> Result<Self> {
        if cell_size <= 0 {
            return Err(WorldError::InvalidCellSize(cell_size));
        }
        Ok(Self::with_cell_size(cell_size))
    }

    fn with_cell_size(cell_size: i32) -> Self {
        let mut world = World {
            cell_size,
            next_id: 0,
            items: BTreeMap::new(),
            grid: HashMap::new(),
            responses: HashMap::new(),
            filters: HashMap::new(),
        };
        world.add_filter(ResponseTag::TOUCH, Box::new(TagFilter(ResponseTag::TOUCH)));
        world.add_filter(ResponseTag::CROSS, Box::new(TagFilter(ResponseTag::CROSS)));
        world.add_filter(ResponseTag::SLIDE, Box::new(TagFilter(ResponseTag::SLIDE)));
        world.add_filter(ResponseTag::BOUNCE, Box::new(TagFilter(ResponseTag::BOUNCE)));
        world.add_response(ResponseTag::TOUCH, Box::new(TouchResponse));
        world.add_response(ResponseTag::CROSS, Box::new(CrossResponse));
        world.add_response(ResponseTag::SLIDE, Box::new(SlideResponse));
        world.add_response(ResponseTag::BOUNCE, Box::new(BounceResponse));
        world
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    /// Register a response strategy under `tag`, replacing any previous one.
    pub fn add_response(&mut self, tag: ResponseTag, response: Box<dyn Response>) {
        self.responses.insert(tag, response);
    }

    /// Register a default collision filter under `tag`.
    pub fn add_filter(&mut self, tag: ResponseTag, filter: Box<dyn CollisionFilter>) {
        self.filters.insert(tag, filter);
    }

    // --- Item lifecycle -----------------------------------------------------

    fn allocate_id(&mut self) -> ItemId {
        if self.next_id == u32::MAX {
            self.next_id = 0;
        }
        // linear probe after the counter wraps; O(items) under churn there
        let mut id = self.next_id + 1;
        while self.items.contains_key(&ItemId(id)) {
            id += 1;
        }
        self.next_id = id;
        ItemId(id)
    }

    /// Insert a box and return its handle. Every cell the box overlaps is
    /// indexed.
    pub fn add(&mut self, rect: Rect) -> Result<ItemId> {
        if rect.w <= 0.0 || rect.h <= 0.0 {
            return Err(WorldError::InvalidExtents);
        }
        let item = self.allocate_id();
        self.items.insert(item, rect);
        let cr = grid::to_cell_rect(self.cell_size, &rect);
        for cy in cr.y..cr.y + cr.h {
            for cx in cr.x..cr.x + cr.w {
                self.add_to_cell(item, cx, cy);
            }
        }
        trace!("add {item}: ({}, {}) {}x{}", rect.x, rect.y, rect.w, rect.h);
        Ok(item)
    }

    /// Deindex and erase an item.
    pub fn remove(&mut self, item: ItemId) -> Result<()> {
        let rect = *self.items.get(&item).ok_or(WorldError::UnknownItem(item))?;
        let cr = grid::to_cell_rect(self.cell_size, &rect);
        for cy in cr.y..cr.y + cr.h {
            for cx in cr.x..cr.x + cr.w {
                self.remove_from_cell(item, cx, cy);
            }
        }
        self.items.remove(&item);
        trace!("remove {item}");
        Ok(())
    }

    /// Move and/or resize an item, re-indexing only the cells that changed.
    /// Extents `<= 0` keep the previous value on that axis.
    pub fn update(&mut self, item: ItemId, to: Rect) -> Result<()> {
        let old = *self.items.get(&item).ok_or(WorldError::UnknownItem(item))?;
        let mut to = to;
        if to.w <= 0.0 {
            to.w = old.w;
        }
        if to.h <= 0.0 {
            to.h = old.h;
        }
        if old == to {
            return Ok(());
        }

        let c1 = grid::to_cell_rect(self.cell_size, &old);
        let c2 = grid::to_cell_rect(self.cell_size, &to);
        if c1 != c2 {
            for cy in c1.y..c1.y + c1.h {
                for cx in c1.x..c1.x + c1.w {
                    if !c2.contains(cx, cy) {
                        self.remove_from_cell(item, cx, cy);
                    }
                }
            }
            for cy in c2.y..c2.y + c2.h {
                for cx in c2.x..c2.x + c2.w {
                    if !c1.contains(cx, cy) {
                        self.add_to_cell(item, cx, cy);
                    }
                }
            }
        }
        self.items.insert(item, to);
        Ok(())
    }

    /// Drop all items and reset the id counter.
    pub fn clear(&mut self) {
        debug!("clear ({} items)", self.items.len());
        self.items.clear();
        self.grid.clear();
        self.next_id = 0;
    }

    fn add_to_cell(&mut self, item: ItemId, cx: i32, cy: i32) {
        self.grid.entry((cx, cy)).or_default().insert(item);
    }

    /// Tolerates absent cells and absent ids.
    fn remove_from_cell(&mut self, item: ItemId, cx: i32, cy: i32) -> bool {
        match self.grid.get_mut(&(cx, cy)) {
            Some(cell) => {
                let removed = cell.remove(&item);
                if cell.is_empty() {
                    self.grid.remove(&(cx, cy));
                }
                removed
            }
            None => false,
        }
    }

    // --- Introspection ------------------------------------------------------

    pub fn has_item(&self, item: ItemId) -> bool {
        self.items.contains_key(&item)
    }

    pub fn count_items(&self) -> usize {
        self.items.len()
    }

    /// Number of occupied grid cells.
    pub fn count_cells(&self) -> usize {
        self.grid.len()
    }

    pub fn get_box(&self, item: ItemId) -> Result<Rect> {
        self.items
            .get(&item)
            .copied()
            .ok_or(WorldError::UnknownItem(item))
    }

    /// All items with their boxes, in id order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Rect)> {
        self.items.iter().map(|(id, rect)| (*id, rect))
    }

    pub fn to_cell(&self, p: DVec2) -> (i32, i32) {
        grid::to_cell(self.cell_size, p)
    }

    pub fn to_world(&self, cx: i32, cy: i32) -> DVec2 {
        grid::to_world(self.cell_size, cx, cy)
    }

    // --- Queries ------------------------------------------------------------

    fn items_in_cell_rect(&self, cr: CellRect) -> BTreeSet<ItemId> {
        let mut out = BTreeSet::new();
        for cy in cr.y..cr.y + cr.h {
            for cx in cr.x..cr.x + cr.w {
                if let Some(cell) = self.grid.get(&(cx, cy)) {
                    out.extend(cell.iter().copied());
                }
            }
        }
        out
    }

    /// Ids whose boxes intersect `rect`, in id order.
    pub fn query_rect(&self, rect: &Rect, filter: Option<&dyn ItemFilter>) -> Vec<ItemId> {
        let cr = grid::to_cell_rect(self.cell_size, rect);
        let mut out = Vec::new();
        for item in self.items_in_cell_rect(cr) {
            if let Some(f) = filter {
                if !f.filter(item) {
                    continue;
                }
            }
            let Some(other) = self.items.get(&item) else {
                continue;
            };
            if geom::is_intersecting(rect, other) {
                out.push(item);
            }
        }
        out
    }

    /// Ids whose boxes strictly contain `p`, in id order.
    pub fn query_point(&self, p: DVec2, filter: Option<&dyn ItemFilter>) -> Vec<ItemId> {
        let (cx, cy) = self.to_cell(p);
        let single = CellRect { x: cx, y: cy, w: 1, h: 1 };
        let mut out = Vec::new();
        for item in self.items_in_cell_rect(single) {
            if let Some(f) = filter {
                if !f.filter(item) {
                    continue;
                }
            }
            let Some(rect) = self.items.get(&item) else {
                continue;
            };
            if geom::contains_point(rect, p) {
                out.push(item);
            }
        }
        out
    }

    /// Occupied cells the segment crosses, in path order, deduplicated.
    fn segment_cells(&self, p1: DVec2, p2: DVec2) -> Vec<(i32, i32)> {
        let mut seen = HashSet::new();
        let mut cells = Vec::new();
        grid::traverse(self.cell_size, p1, p2, |cx, cy| {
            if self.grid.contains_key(&(cx, cy)) && seen.insert((cx, cy)) {
                cells.push((cx, cy));
            }
        });
        cells
    }

    fn segment_infos(
        &self,
        p1: DVec2,
        p2: DVec2,
        filter: Option<&dyn ItemFilter>,
    ) -> Vec<SegmentInfo> {
        let mut infos = Vec::new();
        let mut visited = BTreeSet::new();
        for (cx, cy) in self.segment_cells(p1, p2) {
            let Some(cell) = self.grid.get(&(cx, cy)) else {
                continue;
            };
            for &item in cell {
                if !visited.insert(item) {
                    continue;
                }
                if let Some(f) = filter {
                    if !f.filter(item) {
                        continue;
                    }
                }
                let Some(rect) = self.items.get(&item) else {
                    continue;
                };
                let Some(clip) = geom::segment_intersection(rect, p1, p2, 0.0, 1.0) else {
                    continue;
                };
                if (0.0 < clip.ti1 && clip.ti1 < 1.0) || (0.0 < clip.ti2 && clip.ti2 < 1.0) {
                    // sort by the entry parameter of the infinite line, not
                    // of the segment
                    let Some(line) = geom::segment_intersection(
                        rect,
                        p1,
                        p2,
                        f64::NEG_INFINITY,
                        f64::INFINITY,
                    ) else {
                        continue;
                    };
                    infos.push(SegmentInfo {
                        item,
                        ti1: clip.ti1,
                        ti2: clip.ti2,
                        weight: line.ti1.min(line.ti2),
                    });
                }
            }
        }
        infos.sort_by(|a, b| a.weight.total_cmp(&b.weight));
        infos
    }

    /// Ids crossed by the segment, ordered along it.
    pub fn query_segment(
        &self,
        p1: DVec2,
        p2: DVec2,
        filter: Option<&dyn ItemFilter>,
    ) -> Vec<ItemId> {
        self.segment_infos(p1, p2, filter)
            .into_iter()
            .map(|info| info.item)
            .collect()
    }

    /// Like [`World::query_segment`], with entry/exit parameters and world
    /// coordinates per item.
    pub fn query_segment_with_coords(
        &self,
        p1: DVec2,
        p2: DVec2,
        filter: Option<&dyn ItemFilter>,
    ) -> Vec<SegmentHit> {
        let d = p2 - p1;
        self.segment_infos(p1, p2, filter)
            .into_iter()
            .map(|info| SegmentHit {
                item: info.item,
                ti1: info.ti1,
                ti2: info.ti2,
                enter: p1 + d * info.ti1,
                exit: p1 + d * info.ti2,
            })
            .collect()
    }

    // --- Projection and resolution ------------------------------------------

    /// One swept pass of `rect` toward `goal`: every candidate collision the
    /// filter admits, sorted by contact parameter (ties broken by squared
    /// center distance). Does not mutate the world.
    pub fn project(
        &self,
        item: Option<ItemId>,
        rect: &Rect,
        goal: DVec2,
        filter: &dyn CollisionFilter,
    ) -> Vec<Collision> {
        let item_id = item.unwrap_or_default();

        // bounding rect of the whole movement
        let tl = goal.x.min(rect.x);
        let tt = goal.y.min(rect.y);
        let tr = (goal.x + rect.w).max(rect.x + rect.w);
        let tb = (goal.y + rect.h).max(rect.y + rect.h);
        let union = Rect::new(tl, tt, tr - tl, tb - tt);

        let cr = grid::to_cell_rect(self.cell_size, &union);
        let mut collisions = Vec::new();
        for other in self.items_in_cell_rect(cr) {
            if Some(other) == item {
                continue;
            }
            let Some(kind) = filter.filter(item_id, other) else {
                continue;
            };
            let Some(other_rect) = self.items.get(&other) else {
                continue;
            };
            if let Some(mut col) = geom::detect_collision(rect, other_rect, goal) {
                col.item = item_id;
                col.other = other;
                col.kind = kind;
                collisions.push(col);
            }
        }
        collisions.sort_by(|a, b| {
            if a.ti == b.ti {
                // tie-break on squared center distance, measured from a's
                // own rectangle for both operands
                let ad = geom::square_distance(&a.item_rect, &a.other_rect);
                let bd = geom::square_distance(&a.item_rect, &b.other_rect);
                ad.total_cmp(&bd)
            } else {
                a.ti.total_cmp(&b.ti)
            }
        });
        collisions
    }

    /// Resolve a move using the world's default filter for `tag`, without
    /// committing the result.
    pub fn check(
        &self,
        item: ItemId,
        goal: DVec2,
        tag: ResponseTag,
    ) -> Result<(DVec2, Vec<Collision>)> {
        let filter = self
            .filters
            .get(&tag)
            .ok_or(WorldError::UnknownTag(tag))?;
        self.check_inner(item, goal, filter.as_ref())
    }

    /// Resolve a move with a caller-supplied collision filter, no commit.
    pub fn check_filtered(
        &self,
        item: ItemId,
        goal: DVec2,
        filter: &dyn CollisionFilter,
    ) -> Result<(DVec2, Vec<Collision>)> {
        self.check_inner(item, goal, filter)
    }

    fn check_inner(
        &self,
        item: ItemId,
        mut goal: DVec2,
        filter: &dyn CollisionFilter,
    ) -> Result<(DVec2, Vec<Collision>)> {
        let rect = *self.items.get(&item).ok_or(WorldError::UnknownItem(item))?;
        let mut vf = VisitedFilter {
            visited: BTreeSet::from([item]),
            inner: filter,
        };

        let mut trail = Vec::new();
        let mut projected = self.project(Some(item), &rect, goal, &vf);
        while !projected.is_empty() {
            let mut col = projected[0];
            vf.visited.insert(col.other);
            let response = self
                .responses
                .get(&col.kind)
                .ok_or(WorldError::UnknownTag(col.kind))?;
            let (next_goal, residual) = response.respond(self, &mut col, rect, goal, &vf);
            goal = next_goal;
            projected = residual;
            trail.push(col);
        }
        Ok((goal, trail))
    }

    /// Resolve a move and commit the final position. Returns where the item
    /// actually ended up and the trail of collisions resolved on the way.
    pub fn move_item(
        &mut self,
        item: ItemId,
        goal: DVec2,
        tag: ResponseTag,
    ) -> Result<(DVec2, Vec<Collision>)> {
        let (actual, trail) = self.check(item, goal, tag)?;
        self.update(item, Rect::new(actual.x, actual.y, -1.0, -1.0))?;
        trace!("move {item} -> ({}, {}), {} collision(s)", actual.x, actual.y, trail.len());
        Ok((actual, trail))
    }

    /// [`World::move_item`] with a caller-supplied collision filter.
    pub fn move_item_filtered(
        &mut self,
        item: ItemId,
        goal: DVec2,
        filter: &dyn CollisionFilter,
    ) -> Result<(DVec2, Vec<Collision>)> {
        let (actual, trail) = self.check_filtered(item, goal, filter)?;
        self.update(item, Rect::new(actual.x, actual.y, -1.0, -1.0))?;
        trace!("move {item} -> ({}, {}), {} collision(s)", actual.x, actual.y, trail.len());
        Ok((actual, trail))
    }
}
