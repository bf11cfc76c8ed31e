//! The cube collision world: item store, grid index, queries, and the
//! iterative move resolver.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use glam::DVec3;
use log::{debug, trace};

use super::geom::{self, Collision, Cube};
use super::grid::{self, CellCube};
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
    pub enter: DVec3,
    pub exit: DVec3,
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

/// Collision world over axis-aligned cubes.
pub struct World {
    cell_size: i32,
    next_id: u32,
    items: BTreeMap<ItemId, Cube>,
    grid: HashMap<(i32, i32, i32), BTreeSet<ItemId>>,
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
    pub fn add(&mut self, cube: Cube) -> Result<ItemId> {
        if cube.w <= 0.0 || cube.h <= 0.0 || cube.d <= 0.0 {
            return Err(WorldError::InvalidExtents);
        }
        let item = self.allocate_id();
        self.items.insert(item, cube);
        let cc = grid::to_cell_cube(self.cell_size, &cube);
        for cz in cc.z..cc.z + cc.d {
            for cy in cc.y..cc.y + cc.h {
                for cx in cc.x..cc.x + cc.w {
                    self.add_to_cell(item, cx, cy, cz);
                }
            }
        }
        trace!("add {item}: ({}, {}, {}) {}x{}x{}", cube.x, cube.y, cube.z, cube.w, cube.h, cube.d);
        Ok(item)
    }

    /// Deindex and erase an item.
    pub fn remove(&mut self, item: ItemId) -> Result<()> {
        let cube = *self.items.get(&item).ok_or(WorldError::UnknownItem(item))?;
        let cc = grid::to_cell_cube(self.cell_size, &cube);
        for cz in cc.z..cc.z + cc.d {
            for cy in cc.y..cc.y + cc.h {
                for cx in cc.x..cc.x + cc.w {
                    self.remove_from_cell(item, cx, cy, cz);
                }
            }
        }
        self.items.remove(&item);
        trace!("remove {item}");
        Ok(())
    }

    /// Move and/or resize an item, re-indexing only the cells that changed.
    /// Extents `<= 0` keep the previous value on that axis.
    pub fn update(&mut self, item: ItemId, to: Cube) -> Result<()> {
        let old = *self.items.get(&item).ok_or(WorldError::UnknownItem(item))?;
        let mut to = to;
        if to.w <= 0.0 {
            to.w = old.w;
        }
        if to.h <= 0.0 {
            to.h = old.h;
        }
        if to.d <= 0.0 {
            to.d = old.d;
        }
        if old == to {
            return Ok(());
        }

        let c1 = grid::to_cell_cube(self.cell_size, &old);
        let c2 = grid::to_cell_cube(self.cell_size, &to);
        if c1 != c2 {
            for cz in c1.z..c1.z + c1.d {
                for cy in c1.y..c1.y + c1.h {
                    for cx in c1.x..c1.x + c1.w {
                        if !c2.contains(cx, cy, cz) {
                            self.remove_from_cell(item, cx, cy, cz);
                        }
                    }
                }
            }
            for cz in c2.z..c2.z + c2.d {
                for cy in c2.y..c2.y + c2.h {
                    for cx in c2.x..c2.x + c2.w {
                        if !c1.contains(cx, cy, cz) {
                            self.add_to_cell(item, cx, cy, cz);
                        }
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

    fn add_to_cell(&mut self, item: ItemId, cx: i32, cy: i32, cz: i32) {
        self.grid.entry((cx, cy, cz)).or_default().insert(item);
    }

    /// Tolerates absent cells and absent ids.
    fn remove_from_cell(&mut self, item: ItemId, cx: i32, cy: i32, cz: i32) -> bool {
        match self.grid.get_mut(&(cx, cy, cz)) {
            Some(cell) => {
                let removed = cell.remove(&item);
                if cell.is_empty() {
                    self.grid.remove(&(cx, cy, cz));
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

    pub fn get_box(&self, item: ItemId) -> Result<Cube> {
        self.items
            .get(&item)
            .copied()
            .ok_or(WorldError::UnknownItem(item))
    }

    /// All items with their boxes, in id order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Cube)> {
        self.items.iter().map(|(id, cube)| (*id, cube))
    }

    pub fn to_cell(&self, p: DVec3) -> (i32, i32, i32) {
        grid::to_cell(self.cell_size, p)
    }

    pub fn to_world(&self, cx: i32, cy: i32, cz: i32) -> DVec3 {
        grid::to_world(self.cell_size, cx, cy, cz)
    }

    // --- Queries ------------------------------------------------------------

    fn items_in_cell_cube(&self, cc: CellCube) -> BTreeSet<ItemId> {
        let mut out = BTreeSet::new();
        for cz in cc.z..cc.z + cc.d {
            for cy in cc.y..cc.y + cc.h {
                for cx in cc.x..cc.x + cc.w {
                    if let Some(cell) = self.grid.get(&(cx, cy, cz)) {
                        out.extend(cell.iter().copied());
                    }
                }
            }
        }
        out
    }

    /// Ids whose boxes intersect `cube`, in id order.
    pub fn query_cube(&self, cube: &Cube, filter: Option<&dyn ItemFilter>) -> Vec<ItemId> {
        let cc = grid::to_cell_cube(self.cell_size, cube);
        let mut out = Vec::new();
        for item in self.items_in_cell_cube(cc) {
            if let Some(f) = filter {
                if !f.filter(item) {
                    continue;
                }
            }
            let Some(other) = self.items.get(&item) else {
                continue;
            };
            if geom::is_intersecting(cube, other) {
                out.push(item);
            }
        }
        out
    }

    /// Ids whose boxes strictly contain `p`, in id order.
    pub fn query_point(&self, p: DVec3, filter: Option<&dyn ItemFilter>) -> Vec<ItemId> {
        let (cx, cy, cz) = self.to_cell(p);
        let single = CellCube { x: cx, y: cy, z: cz, w: 1, h: 1, d: 1 };
        let mut out = Vec::new();
        for item in self.items_in_cell_cube(single) {
            if let Some(f) = filter {
                if !f.filter(item) {
                    continue;
                }
            }
            let Some(cube) = self.items.get(&item) else {
                continue;
            };
            if geom::contains_point(cube, p) {
                out.push(item);
            }
        }
        out
    }

    /// Occupied cells the segment crosses, in path order, deduplicated.
    fn segment_cells(&self, p1: DVec3, p2: DVec3) -> Vec<(i32, i32, i32)> {
        let mut seen = HashSet::new();
        let mut cells = Vec::new();
        grid::traverse(self.cell_size, p1, p2, |cx, cy, cz| {
            if self.grid.contains_key(&(cx, cy, cz)) && seen.insert((cx, cy, cz)) {
                cells.push((cx, cy, cz));
            }
        });
        cells
    }

    fn segment_infos(
        &self,
        p1: DVec3,
        p2: DVec3,
        filter: Option<&dyn ItemFilter>,
    ) -> Vec<SegmentInfo> {
        let mut infos = Vec::new();
        let mut visited = BTreeSet::new();
        for (cx, cy, cz) in self.segment_cells(p1, p2) {
            let Some(cell) = self.grid.get(&(cx, cy, cz)) else {
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
                let Some(cube) = self.items.get(&item) else {
                    continue;
                };
                let Some(clip) = geom::segment_intersection(cube, p1, p2, 0.0, 1.0) else {
                    continue;
                };
                if (0.0 < clip.ti1 && clip.ti1 < 1.0) || (0.0 < clip.ti2 && clip.ti2 < 1.0) {
                    // sort by the entry parameter of the infinite line, not
                    // of the segment
                    let Some(line) = geom::segment_intersection(
                        cube,
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
        p1: DVec3,
        p2: DVec3,
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
        p1: DVec3,
        p2: DVec3,
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

    /// One swept pass of `cube` toward `goal`: every candidate collision the
    /// filter admits, sorted by contact parameter (ties broken by the stored
    /// squared center distance). Does not mutate the world.
    pub fn project(
        &self,
        item: Option<ItemId>,
        cube: &Cube,
        goal: DVec3,
        filter: &dyn CollisionFilter,
    ) -> Vec<Collision> {
        let item_id = item.unwrap_or_default();

        // bounding cube of the whole movement
        let tl = goal.x.min(cube.x);
        let tt = goal.y.min(cube.y);
        let tf = goal.z.min(cube.z);
        let tr = (goal.x + cube.w).max(cube.x + cube.w);
        let tb = (goal.y + cube.h).max(cube.y + cube.h);
        let tk = (goal.z + cube.d).max(cube.z + cube.d);
        let union = Cube::new(tl, tt, tf, tr - tl, tb - tt, tk - tf);

        let cc = grid::to_cell_cube(self.cell_size, &union);
        let mut collisions = Vec::new();
        for other in self.items_in_cell_cube(cc) {
            if Some(other) == item {
                continue;
            }
            let Some(kind) = filter.filter(item_id, other) else {
                continue;
            };
            let Some(other_cube) = self.items.get(&other) else {
                continue;
            };
            if let Some(mut col) = geom::detect_collision(cube, other_cube, goal) {
                col.item = item_id;
                col.other = other;
                col.kind = kind;
                collisions.push(col);
            }
        }
        collisions.sort_by(|a, b| {
            if a.ti == b.ti {
                a.distance.total_cmp(&b.distance)
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
        goal: DVec3,
        tag: ResponseTag,
    ) -> Result<(DVec3, Vec<Collision>)> {
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
        goal: DVec3,
        filter: &dyn CollisionFilter,
    ) -> Result<(DVec3, Vec<Collision>)> {
        self.check_inner(item, goal, filter)
    }

    fn check_inner(
        &self,
        item: ItemId,
        mut goal: DVec3,
        filter: &dyn CollisionFilter,
    ) -> Result<(DVec3, Vec<Collision>)> {
        let cube = *self.items.get(&item).ok_or(WorldError::UnknownItem(item))?;
        let mut vf = VisitedFilter {
            visited: BTreeSet::from([item]),
            inner: filter,
        };

        let mut trail = Vec::new();
        let mut projected = self.project(Some(item), &cube, goal, &vf);
        while !projected.is_empty() {
            let mut col = projected[0];
            vf.visited.insert(col.other);
            let response = self
                .responses
                .get(&col.kind)
                .ok_or(WorldError::UnknownTag(col.kind))?;
            let (next_goal, residual) = response.respond(self, &mut col, cube, goal, &vf);
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
        goal: DVec3,
        tag: ResponseTag,
    ) -> Result<(DVec3, Vec<Collision>)> {
        let (actual, trail) = self.check(item, goal, tag)?;
        self.update(item, Cube::new(actual.x, actual.y, actual.z, -1.0, -1.0, -1.0))?;
        trace!("move {item} -> ({}, {}, {}), {} collision(s)", actual.x, actual.y, actual.z, trail.len());
        Ok((actual, trail))
    }

    /// [`World::move_item`] with a caller-supplied collision filter.
    pub fn move_item_filtered(
        &mut self,
        item: ItemId,
        goal: DVec3,
        filter: &dyn CollisionFilter,
    ) -> Result<(DVec3, Vec<Collision>)> {
        let (actual, trail) = self.check_filtered(item, goal, filter)?;
        self.update(item, Cube::new(actual.x, actual.y, actual.z, -1.0, -1.0, -1.0))?;
        trace!("move {item} -> ({}, {}, {}), {} collision(s)", actual.x, actual.y, actual.z, trail.len());
        Ok((actual, trail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_indexes_all_overlapped_cells() {
        let mut w = World::new(64).unwrap();
        // straddles eight cells around (64, 64, 64)
        let item = w.add(Cube::new(32.0, 32.0, 32.0, 64.0, 64.0, 64.0)).unwrap();
        assert_eq!(w.count_cells(), 8);
        for cz in 1..=2 {
            for cy in 1..=2 {
                for cx in 1..=2 {
                    assert!(w.grid[&(cx, cy, cz)].contains(&item));
                }
            }
        }
    }

    #[test]
    fn test_add_rejects_bad_extents() {
        let mut w = World::new(64).unwrap();
        assert_eq!(
            w.add(Cube::new(0.0, 0.0, 0.0, 1.0, 1.0, 0.0)).unwrap_err(),
            WorldError::InvalidExtents
        );
    }

    #[test]
    fn test_remove_leaves_no_trace() {
        let mut w = World::new(64).unwrap();
        let a = w.add(Cube::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0)).unwrap();
        w.remove(a).unwrap();
        assert_eq!(w.count_items(), 0);
        assert_eq!(w.count_cells(), 0);
        assert_eq!(w.remove(a).unwrap_err(), WorldError::UnknownItem(a));
    }

    #[test]
    fn test_update_moves_between_cells() {
        let mut w = World::new(64).unwrap();
        let item = w.add(Cube::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0)).unwrap();
        w.update(item, Cube::new(0.0, 0.0, 200.0, -1.0, -1.0, -1.0)).unwrap();
        assert_eq!(
            w.get_box(item).unwrap(),
            Cube::new(0.0, 0.0, 200.0, 10.0, 10.0, 10.0)
        );
        assert!(!w.grid.contains_key(&(1, 1, 1)));
        assert!(w.grid[&(1, 1, 4)].contains(&item));
    }

    #[test]
    fn test_query_cube_and_point() {
        let mut w = World::new(64).unwrap();
        let a = w.add(Cube::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0)).unwrap();
        let b = w.add(Cube::new(0.0, 0.0, 40.0, 10.0, 10.0, 10.0)).unwrap();
        let hits = w.query_cube(&Cube::new(0.0, 0.0, 5.0, 10.0, 10.0, 10.0), None);
        assert_eq!(hits, vec![a]);
        let hits = w.query_cube(&Cube::new(0.0, 0.0, 0.0, 10.0, 10.0, 60.0), None);
        assert_eq!(hits, vec![a, b]);
        assert_eq!(w.query_point(DVec3::new(5.0, 5.0, 45.0), None), vec![b]);
        assert!(w.query_point(DVec3::new(5.0, 5.0, 10.0), None).is_empty());
    }

    #[test]
    fn test_query_segment_sorted_along_line() {
        let mut w = World::new(64).unwrap();
        let far = w.add(Cube::new(0.0, 0.0, 200.0, 10.0, 10.0, 10.0)).unwrap();
        let near = w.add(Cube::new(0.0, 0.0, 50.0, 10.0, 10.0, 10.0)).unwrap();
        let hits = w.query_segment(
            DVec3::new(5.0, 5.0, 0.0),
            DVec3::new(5.0, 5.0, 300.0),
            None,
        );
        assert_eq!(hits, vec![near, far]);
    }

    #[test]
    fn test_query_segment_with_coords_exit_on_z() {
        let mut w = World::new(64).unwrap();
        let item = w.add(Cube::new(0.0, 0.0, 50.0, 10.0, 10.0, 10.0)).unwrap();
        let hits = w.query_segment_with_coords(
            DVec3::new(5.0, 5.0, 0.0),
            DVec3::new(5.0, 5.0, 100.0),
            None,
        );
        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert_eq!(hit.item, item);
        assert!((hit.enter.z - 50.0).abs() < 1e-9);
        assert!((hit.exit.z - 60.0).abs() < 1e-9);
        assert_eq!(hit.enter.x, 5.0);
        assert_eq!(hit.exit.x, 5.0);
    }

    #[test]
    fn test_project_ties_break_on_distance() {
        let mut w = World::new(64).unwrap();
        // both walls are first touched at the same ti; the farther center
        // sorts second
        let far = w.add(Cube::new(20.0, -35.0, 0.0, 10.0, 50.0, 10.0)).unwrap();
        let near = w.add(Cube::new(20.0, 0.0, 0.0, 10.0, 10.0, 10.0)).unwrap();
        let cube = Cube::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let cols = w.project(
            None,
            &cube,
            DVec3::new(50.0, 0.0, 0.0),
            &TagFilter(ResponseTag::TOUCH),
        );
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].other, near);
        assert_eq!(cols[1].other, far);
        assert_eq!(cols[0].ti, cols[1].ti);
        assert!(cols[0].distance < cols[1].distance);
    }

    #[test]
    fn test_move_commits_and_check_does_not() {
        let mut w = World::new(64).unwrap();
        let a = w.add(Cube::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0)).unwrap();
        w.add(Cube::new(20.0, 0.0, 0.0, 10.0, 100.0, 100.0)).unwrap();

        let (actual, cols) = w
            .check(a, DVec3::new(50.0, 0.0, 0.0), ResponseTag::SLIDE)
            .unwrap();
        assert_eq!(actual, DVec3::new(10.0, 0.0, 0.0));
        assert_eq!(cols.len(), 1);
        assert_eq!(w.get_box(a).unwrap().x, 0.0);

        let (actual, _) = w
            .move_item(a, DVec3::new(50.0, 0.0, 0.0), ResponseTag::SLIDE)
            .unwrap();
        assert_eq!(actual, DVec3::new(10.0, 0.0, 0.0));
        assert_eq!(w.get_box(a).unwrap().x, 10.0);
    }

    #[test]
    fn test_move_unknown_item() {
        let mut w = World::new(64).unwrap();
        let missing = ItemId(5);
        assert_eq!(
            w.move_item(missing, DVec3::ZERO, ResponseTag::SLIDE).unwrap_err(),
            WorldError::UnknownItem(missing)
        );
    }
}
