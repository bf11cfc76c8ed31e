//! Pure geometry kernel over axis-aligned cubes.

use glam::DVec3;

use crate::types::{ItemId, ResponseTag, DELTA};

/// Axis-aligned cube: origin plus strictly positive extents.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Cube {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
    pub h: f64,
    pub d: f64,
}

impl Cube {
    pub fn new(x: f64, y: f64, z: f64, w: f64, h: f64, d: f64) -> Self {
        Self { x, y, z, w, h, d }
    }

    pub fn origin(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    /// Same extents, different origin.
    pub fn at(&self, pos: DVec3) -> Cube {
        Cube {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            w: self.w,
            h: self.h,
            d: self.d,
        }
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn nearest(x: f64, a: f64, b: f64) -> f64 {
    if (a - x).abs() < (b - x).abs() {
        a
    } else {
        b
    }
}

/// Corner of `cube` nearest to `p`, chosen per axis.
pub fn nearest_corner(cube: &Cube, p: DVec3) -> DVec3 {
    DVec3::new(
        nearest(p.x, cube.x, cube.x + cube.w),
        nearest(p.y, cube.y, cube.y + cube.h),
        nearest(p.z, cube.z, cube.z + cube.d),
    )
}

/// Minkowski difference of two cubes, which is another cube.
pub fn minkowski_diff(a: &Cube, b: &Cube) -> Cube {
    Cube {
        x: b.x - a.x - a.w,
        y: b.y - a.y - a.h,
        z: b.z - a.z - a.d,
        w: a.w + b.w,
        h: a.h + b.h,
        d: a.d + b.d,
    }
}

/// Strict containment with a DELTA margin; points on the boundary are out.
pub fn contains_point(cube: &Cube, p: DVec3) -> bool {
    p.x - cube.x > DELTA
        && p.y - cube.y > DELTA
        && p.z - cube.z > DELTA
        && cube.x + cube.w - p.x > DELTA
        && cube.y + cube.h - p.y > DELTA
        && cube.z + cube.d - p.z > DELTA
}

/// Non-strict half-open intersection test.
pub fn is_intersecting(a: &Cube, b: &Cube) -> bool {
    a.x < b.x + b.w
        && b.x < a.x + a.w
        && a.y < b.y + b.h
        && b.y < a.y + a.h
        && a.z < b.z + b.d
        && b.z < a.z + a.d
}

/// Squared distance between the centers of two cubes.
pub fn square_distance(a: &Cube, b: &Cube) -> f64 {
    let dx = a.x - b.x + (a.w - b.w) / 2.0;
    let dy = a.y - b.y + (a.h - b.h) / 2.0;
    let dz = a.z - b.z + (a.d - b.d) / 2.0;
    dx * dx + dy * dy + dz * dz
}

/// Result of clipping a segment against a cube.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Clip {
    pub ti1: f64,
    pub ti2: f64,
    pub normal1: DVec3,
    pub normal2: DVec3,
}

/// Generalized Liang-Barsky clip of the segment `p1..p2` against `cube`.
///
/// The caller seeds the `(ti1, ti2)` interval: `(0, 1)` clips the segment
/// itself, `(-inf, +inf)` the infinite line through it. Entry and exit face
/// normals are only guaranteed accurate with the infinite-line seed.
pub fn segment_intersection(
    cube: &Cube,
    p1: DVec3,
    p2: DVec3,
    ti1: f64,
    ti2: f64,
) -> Option<Clip> {
    let delta = p2 - p1;
    let mut clip = Clip {
        ti1,
        ti2,
        normal1: DVec3::ZERO,
        normal2: DVec3::ZERO,
    };

    // per face: (outward normal, rate of approach, signed distance from p1)
    let faces = [
        (DVec3::new(-1.0, 0.0, 0.0), -delta.x, p1.x - cube.x),
        (DVec3::new(1.0, 0.0, 0.0), delta.x, cube.x + cube.w - p1.x),
        (DVec3::new(0.0, -1.0, 0.0), -delta.y, p1.y - cube.y),
        (DVec3::new(0.0, 1.0, 0.0), delta.y, cube.y + cube.h - p1.y),
        (DVec3::new(0.0, 0.0, -1.0), -delta.z, p1.z - cube.z),
        (DVec3::new(0.0, 0.0, 1.0), delta.z, cube.z + cube.d - p1.z),
    ];
    for (normal, p, q) in faces {
        if p == 0.0 {
            // parallel to this face and outside it
            if q <= 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > clip.ti2 {
                    return None;
                }
                if r > clip.ti1 {
                    clip.ti1 = r;
                    clip.normal1 = normal;
                }
            } else {
                if r < clip.ti1 {
                    return None;
                }
                if r < clip.ti2 {
                    clip.ti2 = r;
                    clip.normal2 = normal;
                }
            }
        }
    }
    Some(clip)
}

/// One projected or resolved contact between a moving item and an obstacle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Collision {
    pub item: ItemId,
    pub other: ItemId,
    /// Response tag the filter assigned to this pair.
    pub kind: ResponseTag,
    /// True if the cubes were already intersecting when the sweep started.
    pub overlaps: bool,
    /// Fraction of the displacement at first contact when sweeping, or the
    /// negative volume of the intersection when already overlapping.
    pub ti: f64,
    /// Squared center-to-center distance; deterministic sort tie-breaker.
    pub distance: f64,
    /// The attempted displacement.
    pub motion: DVec3,
    /// Axis-aligned normal of the obstacle face first contacted.
    pub normal: DVec3,
    /// Position the item legally occupies at first contact.
    pub touch: DVec3,
    /// Adjusted goal written by the slide and bounce strategies.
    pub response: Option<DVec3>,
    pub item_cube: Cube,
    pub other_cube: Cube,
}

/// Swept collision test between `item` moving toward `goal` and `other`.
///
/// Fills the geometric half of the record; the caller assigns ids and the
/// response tag.
pub fn detect_collision(item: &Cube, other: &Cube, goal: DVec3) -> Option<Collision> {
    let delta = goal - item.origin();
    let diff = minkowski_diff(item, other);

    let overlaps;
    let ti;
    let mut normal = DVec3::ZERO;

    if contains_point(&diff, DVec3::ZERO) {
        // item was already intersecting other
        let p = nearest_corner(&diff, DVec3::ZERO);
        // penetration cannot exceed the moving box's extents
        let wi = item.w.min(p.x.abs());
        let hi = item.h.min(p.y.abs());
        let di = item.d.min(p.z.abs());
        ti = -wi * hi * di;
        overlaps = true;
    } else {
        let clip =
            segment_intersection(&diff, DVec3::ZERO, delta, f64::NEG_INFINITY, f64::INFINITY)?;
        // the sweep must enter the shape from the origin forward; a clip
        // interval collapsed to a point is the segment grazing a corner
        if clip.ti1 < 1.0
            && (clip.ti1 - clip.ti2).abs() >= DELTA
            && (0.0 < clip.ti1 + DELTA || (clip.ti1 == 0.0 && clip.ti2 > 0.0))
        {
            ti = clip.ti1;
            normal = clip.normal1;
            overlaps = false;
        } else {
            return None;
        }
    }

    let touch;
    if overlaps {
        if delta == DVec3::ZERO {
            // intersecting and not moving: minimum displacement vector
            let mut p = nearest_corner(&diff, DVec3::ZERO);
            if p.x.abs() <= p.y.abs() && p.x.abs() <= p.z.abs() {
                p.y = 0.0;
                p.z = 0.0;
            } else if p.y.abs() <= p.z.abs() {
                p.x = 0.0;
                p.z = 0.0;
            } else {
                p.x = 0.0;
                p.y = 0.0;
            }
            normal = DVec3::new(sign(p.x), sign(p.y), sign(p.z));
            touch = item.origin() + p;
        } else {
            // intersecting and moving: back out along the displacement
            let clip = segment_intersection(&diff, DVec3::ZERO, delta, f64::NEG_INFINITY, 1.0)?;
            normal = clip.normal1;
            touch = item.origin() + delta * clip.ti1;
        }
    } else {
        touch = item.origin() + delta * ti;
    }

    Some(Collision {
        item: ItemId::default(),
        other: ItemId::default(),
        kind: ResponseTag::SLIDE,
        overlaps,
        ti,
        distance: square_distance(item, other),
        motion: delta,
        normal,
        touch,
        response: None,
        item_cube: *item,
        other_cube: *other,
    })
}
