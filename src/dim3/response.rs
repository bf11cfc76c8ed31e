//! The built-in collision response strategies, three-axis form.

use glam::DVec3;

use super::geom::{Collision, Cube};
use super::world::World;
use crate::types::CollisionFilter;

/// One collision-resolution strategy; see the 2D counterpart for the
/// contract. Strategies read the world but never mutate it.
pub trait Response {
    fn respond(
        &self,
        world: &World,
        col: &mut Collision,
        cube: Cube,
        goal: DVec3,
        filter: &dyn CollisionFilter,
    ) -> (DVec3, Vec<Collision>);
}

/// Stop at the contact point.
pub struct TouchResponse;

impl Response for TouchResponse {
    fn respond(
        &self,
        _world: &World,
        col: &mut Collision,
        _cube: Cube,
        _goal: DVec3,
        _filter: &dyn CollisionFilter,
    ) -> (DVec3, Vec<Collision>) {
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
        cube: Cube,
        goal: DVec3,
        filter: &dyn CollisionFilter,
    ) -> (DVec3, Vec<Collision>) {
        let cols = world.project(Some(col.item), &cube, goal, filter);
        (goal, cols)
    }
}

/// Project the motion onto the contact plane.
pub struct SlideResponse;

impl Response for SlideResponse {
    fn respond(
        &self,
        world: &World,
        col: &mut Collision,
        cube: Cube,
        goal: DVec3,
        filter: &dyn CollisionFilter,
    ) -> (DVec3, Vec<Collision>) {
        let mut slid = col.touch;
        if col.motion != DVec3::ZERO {
            if col.normal.x == 0.0 {
                slid.x = goal.x;
            }
            if col.normal.y == 0.0 {
                slid.y = goal.y;
            }
            if col.normal.z == 0.0 {
                slid.z = goal.z;
            }
        }
        col.response = Some(slid);

        let from = cube.at(col.touch);
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
        cube: Cube,
        goal: DVec3,
        filter: &dyn CollisionFilter,
    ) -> (DVec3, Vec<Collision>) {
        let touch = col.touch;
        let mut bounced = touch;
        if col.motion != DVec3::ZERO {
            let mut remaining = goal - touch;
            if col.normal.x != 0.0 {
                remaining.x = -remaining.x;
            }
            if col.normal.y != 0.0 {
                remaining.y = -remaining.y;
            }
            if col.normal.z != 0.0 {
                remaining.z = -remaining.z;
            }
            bounced = touch + remaining;
        }
        col.response = Some(bounced);

        let from = cube.at(touch);
        let cols = world.project(Some(col.item), &from, bounced, filter);
        (bounced, cols)
    }
}
