//! The built-in collision response strategies.

use glam::DVec2;

use super::geom::{Collision, Rect};
use super::world::World;
use crate::types::CollisionFilter;

/// One collision-resolution strategy.
///
/// Given the first collision of a projected move, produce the adjusted goal
/// and the remaining collisions from that point on. Strategies read the
/// world (typically by re-entering [`World::project`]) but never mutate it;
/// the resolver owns the commit.
pub trait Response {
    fn respond(
        &self,
        world: &World,
        col: &mut Collision,
        rect: Rect,
        goal: DVec2,
        filter: &dyn CollisionFilter,
    ) -> (DVec2, Vec<Collision>);
}

/// Stop at the contact point.
pub struct TouchResponse;

impl Response for TouchResponse {
    fn respond(
        &self,
        _world: &World,
        col: &mut Collision,
        _rect: Rect,
        _goal: DVec2,
        _filter: &dyn CollisionFilter,
    ) -> (DVec2, Vec<Collision>) {
        (col.touch, Vec::new())
    }
}

/// Pass through, still reporting obstacles behind the crossed one.
pub struct CrossResponse;

impl Response for CrossResponse {
    fn respond(
        &self,
        world: &World,
        col: &mut Collision,
        rect: Rect,
        goal: DVec2,
        filter: &dyn CollisionFilter,
    ) -> (DVec2, Vec<Collision>) {
        let cols = world.project(Some(col.item), &rect, goal, filter);
        (goal, cols)
    }
}

/// Cancel the motion along the contact normal and keep the rest.
pub struct SlideResponse;

impl Response for SlideResponse {
    fn respond(
        &self,
        world: &World,
        col: &mut Collision,
        rect: Rect,
        goal: DVec2,
        filter: &dyn CollisionFilter,
    ) -> (DVec2, Vec<Collision>) {
        let mut slid = col.touch;
        if col.motion != DVec2::ZERO {
            if col.normal.x == 0.0 {
                slid.x = goal.x;
            } else {
                slid.y = goal.y;
            }
        }
        col.response = Some(slid);

        let from = rect.at(col.touch);
        let cols = world.project(Some(col.item), &from, slid, filter);
        (slid, cols)
    }
}

/// Reflect the remaining motion about the contact normal.
pub struct BounceResponse;

impl Response for BounceResponse {
    fn respond(
        &self,
        world: &World,
        col: &mut Collision,
        rect: Rect,
        goal: DVec2,
        filter: &dyn CollisionFilter,
    ) -> (DVec2, Vec<Collision>) {
        let touch = col.touch;
        let mut bounced = touch;
        if col.motion != DVec2::ZERO {
            let mut remaining = goal - touch;
            if col.normal.x == 0.0 {
                remaining.y = -remaining.y;
            } else {
                remaining.x = -remaining.x;
            }
            bounced = touch + remaining;
        }
        col.response = Some(bounced);

        let from = rect.at(touch);
        let cols = world.project(Some(col.item), &from, bounced, filter);
        (bounced, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, ResponseTag, TagFilter};

    fn wall_world() -> (World, ItemId) {
        let mut world = World::new(64).unwrap();
        let item = world.add(Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        world.add(Rect::new(20.0, 0.0, 10.0, 100.0)).unwrap();
        (world, item)
    }

    fn first_collision(world: &World, item: ItemId, goal: DVec2) -> Collision {
        let rect = world.get_box(item).unwrap();
        let cols = world.project(
            Some(item),
            &rect,
            goal,
            &TagFilter(ResponseTag::SLIDE),
        );
        cols[0]
    }

    #[test]
    fn test_touch_stops_at_contact() {
        let (world, item) = wall_world();
        let goal = DVec2::new(50.0, 0.0);
        let mut col = first_collision(&world, item, goal);
        let rect = world.get_box(item).unwrap();
        let (actual, rest) = TouchResponse.respond(
            &world,
            &mut col,
            rect,
            goal,
            &TagFilter(ResponseTag::TOUCH),
        );
        assert_eq!(actual, DVec2::new(10.0, 0.0));
        assert!(rest.is_empty());
        assert!(col.response.is_none());
    }

    #[test]
    fn test_slide_keeps_free_axis() {
        let (world, item) = wall_world();
        let goal = DVec2::new(50.0, 40.0);
        let mut col = first_collision(&world, item, goal);
        let rect = world.get_box(item).unwrap();
        let (actual, _rest) = SlideResponse.respond(
            &world,
            &mut col,
            rect,
            goal,
            &TagFilter(ResponseTag::SLIDE),
        );
        // blocked on x at the wall face, free on y
        assert_eq!(actual.x, 10.0);
        assert_eq!(actual.y, 40.0);
        assert_eq!(col.response, Some(actual));
    }

    #[test]
    fn test_bounce_reflects_remaining_motion() {
        let (world, item) = wall_world();
        let goal = DVec2::new(50.0, 0.0);
        let mut col = first_collision(&world, item, goal);
        let rect = world.get_box(item).unwrap();
        let (actual, _rest) = BounceResponse.respond(
            &world,
            &mut col,
            rect,
            goal,
            &TagFilter(ResponseTag::BOUNCE),
        );
        assert_eq!(actual, DVec2::new(-30.0, 0.0));
        assert_eq!(col.response, Some(actual));
    }

    #[test]
    fn test_bounce_zero_motion_stays_on_touch() {
        let mut world = World::new(64).unwrap();
        let item = world.add(Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        world.add(Rect::new(5.0, 0.0, 10.0, 10.0)).unwrap();
        let goal = DVec2::new(0.0, 0.0);
        let mut col = first_collision(&world, item, goal);
        let rect = world.get_box(item).unwrap();
        let (actual, _rest) = BounceResponse.respond(
            &world,
            &mut col,
            rect,
            goal,
            &TagFilter(ResponseTag::BOUNCE),
        );
        assert_eq!(actual, col.touch);
        // the response vector is written even for a zero displacement
        assert_eq!(col.response, Some(col.touch));
    }

    #[test]
    fn test_cross_reports_obstacles_behind() {
        let mut world = World::new(64).unwrap();
        let item = world.add(Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        world.add(Rect::new(20.0, 0.0, 10.0, 10.0)).unwrap();
        let behind = world.add(Rect::new(40.0, 0.0, 10.0, 10.0)).unwrap();
        let goal = DVec2::new(60.0, 0.0);
        let mut col = first_collision(&world, item, goal);
        let rect = world.get_box(item).unwrap();
        // exclude the crossed obstacle, as the resolver's visited set would
        let crossed = col.other;
        let filter = move |_: ItemId, other: ItemId| {
            if other == crossed {
                None
            } else {
                Some(ResponseTag::CROSS)
            }
        };
        let (actual, rest) = CrossResponse.respond(&world, &mut col, rect, goal, &filter);
        assert_eq!(actual, goal);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].other, behind);
    }
}
