//! Pure geometry kernel: rectangles, the Minkowski difference, the
//! generalized Liang-Barsky clip, and the swept collision test.

use glam::DVec2;

use crate::types::{ItemId, ResponseTag, DELTA};

/// Axis-aligned rectangle: origin plus strictly positive extents.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn origin(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Same extents, different origin.
    pub fn at(&self, pos: DVec2) -> Rect {
        Rect {
            x: pos.x,
            y: pos.y,
            w: self.w,
            h: self.h,
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

/// Corner of `rect` nearest to `p`, chosen per axis.
pub fn nearest_corner(rect: &Rect, p: DVec2) -> DVec2 {
    DVec2::new(
        nearest(p.x, rect.x, rect.x + rect.w),
        nearest(p.y, rect.y, rect.y + rect.h),
    )
}

/// Minkowski difference of two rects, which is another rect. The origin lies
/// inside the result iff the rects intersect, and sweeping `a` toward a goal
/// reduces to clipping the displacement segment against it.
pub fn minkowski_diff(a: &Rect, b: &Rect) -> Rect {
    Rect {
        x: b.x - a.x - a.w,
        y: b.y - a.y - a.h,
        w: a.w + b.w,
        h: a.h + b.h,
    }
}

/// Strict containment with a DELTA margin; points on the boundary are out.
pub fn contains_point(rect: &Rect, p: DVec2) -> bool {
    p.x - rect.x > DELTA
        && p.y - rect.y > DELTA
        && rect.x + rect.w - p.x > DELTA
        && rect.y + rect.h - p.y > DELTA
}

/// True iff `b` lies fully inside `a`, boundaries included.
pub fn contains_rect(a: &Rect, b: &Rect) -> bool {
    a.x <= b.x && a.y <= b.y && b.x + b.w <= a.x + a.w && b.y + b.h <= a.y + a.h
}

/// Non-strict half-open intersection test.
pub fn is_intersecting(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.w && b.x < a.x + a.w && a.y < b.y + b.h && b.y < a.y + a.h
}

/// Squared distance between the centers of two rects.
pub fn square_distance(a: &Rect, b: &Rect) -> f64 {
    let dx = a.x - b.x + (a.w - b.w) / 2.0;
    let dy = a.y - b.y + (a.h - b.h) / 2.0;
    dx * dx + dy * dy
}

/// Result of clipping a segment against a rect.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Clip {
    pub ti1: f64,
    pub ti2: f64,
    pub normal1: DVec2,
    pub normal2: DVec2,
}

/// Generalized Liang-Barsky clip of the segment `p1..p2` against `rect`.
///
/// The caller seeds the `(ti1, ti2)` interval: `(0, 1)` clips the segment
/// itself, `(-inf, +inf)` the infinite line through it. Entry and exit face
/// normals are only guaranteed accurate with the infinite-line seed.
pub fn segment_intersection(
    rect: &Rect,
    p1: DVec2,
    p2: DVec2,
    ti1: f64,
    ti2: f64,
) -> Option<Clip> {
    let d = p2 - p1;
    let mut clip = Clip {
        ti1,
        ti2,
        normal1: DVec2::ZERO,
        normal2: DVec2::ZERO,
    };

    // per face: (outward normal, rate of approach, signed distance from p1)
    let faces = [
        (DVec2::new(-1.0, 0.0), -d.x, p1.x - rect.x),
        (DVec2::new(1.0, 0.0), d.x, rect.x + rect.w - p1.x),
        (DVec2::new(0.0, -1.0), -d.y, p1.y - rect.y),
        (DVec2::new(0.0, 1.0), d.y, rect.y + rect.h - p1.y),
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
    /// True if the boxes were already intersecting when the sweep started.
    pub overlaps: bool,
    /// Fraction of the displacement at first contact when sweeping, or the
    /// negative area of the intersection when already overlapping.
    pub ti: f64,
    /// The attempted displacement.
    pub motion: DVec2,
    /// Axis-aligned normal of the obstacle face first contacted.
    pub normal: DVec2,
    /// Position the item legally occupies at first contact.
    pub touch: DVec2,
    /// Adjusted goal written by the slide and bounce strategies.
    pub response: Option<DVec2>,
    pub item_rect: Rect,
    pub other_rect: Rect,
}

/// Swept collision test between `item` moving toward `goal` and `other`.
///
/// Fills the geometric half of the record; the caller assigns ids and the
/// response tag.
pub fn detect_collision(item: &Rect, other: &Rect, goal: DVec2) -> Option<Collision> {
    let delta = goal - item.origin();
    let diff = minkowski_diff(item, other);

    let overlaps;
    let ti;
    let mut normal = DVec2::ZERO;

    if contains_point(&diff, DVec2::ZERO) {
        // item was already intersecting other
        let p = nearest_corner(&diff, DVec2::ZERO);
        // penetration cannot exceed the moving box's extents
        let wi = item.w.min(p.x.abs());
        let hi = item.h.min(p.y.abs());
        ti = -wi * hi;
        overlaps = true;
    } else {
        let clip = segment_intersection(&diff, DVec2::ZERO, delta, f64::NEG_INFINITY, f64::INFINITY)?;
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
        if delta == DVec2::ZERO {
            // intersecting and not moving: minimum displacement vector
            let mut p = nearest_corner(&diff, DVec2::ZERO);
            if p.x.abs() < p.y.abs() {
                p.y = 0.0;
            } else {
                p.x = 0.0;
            }
            normal = DVec2::new(sign(p.x), sign(p.y));
            touch = item.origin() + p;
        } else {
            // intersecting and moving: back out along the displacement
            let clip = segment_intersection(&diff, DVec2::ZERO, delta, f64::NEG_INFINITY, 1.0)?;
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
        motion: delta,
        normal,
        touch,
        response: None,
        item_rect: *item,
        other_rect: *other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_corner_per_axis() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(nearest_corner(&r, DVec2::new(1.0, 9.0)), DVec2::new(0.0, 10.0));
        assert_eq!(nearest_corner(&r, DVec2::new(9.0, 1.0)), DVec2::new(10.0, 0.0));
    }

    #[test]
    fn test_minkowski_diff() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 0.0, 10.0, 100.0);
        let d = minkowski_diff(&a, &b);
        assert_eq!(d, Rect::new(10.0, -10.0, 20.0, 110.0));
    }

    #[test]
    fn test_contains_point_is_strict() {
        let r = Rect::new(0.0, 0.0, 4.0, 4.0);
        assert!(contains_point(&r, DVec2::new(2.0, 2.0)));
        // boundary points are out by more than DELTA
        assert!(!contains_point(&r, DVec2::new(0.0, 2.0)));
        assert!(!contains_point(&r, DVec2::new(4.0, 2.0)));
    }

    #[test]
    fn test_contains_rect() {
        let outer = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(contains_rect(&outer, &Rect::new(1.0, 1.0, 8.0, 8.0)));
        assert!(contains_rect(&outer, &outer));
        assert!(!contains_rect(&outer, &Rect::new(5.0, 5.0, 6.0, 6.0)));
    }

    #[test]
    fn test_is_intersecting_half_open() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(is_intersecting(&a, &Rect::new(9.0, 9.0, 2.0, 2.0)));
        // edge-touching rects do not intersect
        assert!(!is_intersecting(&a, &Rect::new(10.0, 0.0, 2.0, 2.0)));
    }

    #[test]
    fn test_segment_clip_entry_exit_and_normals() {
        let r = Rect::new(-1.0, -1.0, 2.0, 2.0);
        let clip = segment_intersection(
            &r,
            DVec2::new(-5.0, 0.0),
            DVec2::new(5.0, 0.0),
            f64::NEG_INFINITY,
            f64::INFINITY,
        )
        .unwrap();
        assert_eq!(clip.ti1, 0.4);
        assert_eq!(clip.ti2, 0.6);
        assert_eq!(clip.normal1, DVec2::new(-1.0, 0.0));
        assert_eq!(clip.normal2, DVec2::new(1.0, 0.0));
    }

    #[test]
    fn test_segment_clip_parallel_outside_misses() {
        let r = Rect::new(-1.0, -1.0, 2.0, 2.0);
        let miss = segment_intersection(
            &r,
            DVec2::new(-5.0, 2.0),
            DVec2::new(5.0, 2.0),
            0.0,
            1.0,
        );
        assert!(miss.is_none());
    }

    #[test]
    fn test_detect_sweep_head_on() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 0.0, 10.0, 100.0);
        let col = detect_collision(&a, &b, DVec2::new(50.0, 0.0)).unwrap();
        assert!(!col.overlaps);
        assert_eq!(col.ti, 0.2);
        assert_eq!(col.normal, DVec2::new(-1.0, 0.0));
        assert_eq!(col.touch, DVec2::new(10.0, 0.0));
    }

    #[test]
    fn test_detect_no_collision_when_paths_clear() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 50.0, 10.0, 10.0);
        assert!(detect_collision(&a, &b, DVec2::new(50.0, 0.0)).is_none());
    }

    #[test]
    fn test_detect_rejects_corner_graze() {
        // path crosses exactly one corner of the minkowski difference:
        // the clip interval collapses to a point and no collision is reported
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(100.0, 100.0, 10.0, 10.0);
        assert!(detect_collision(&a, &b, DVec2::new(180.0, 220.0)).is_none());
    }

    #[test]
    fn test_detect_diagonal_pass_through_collides() {
        // dead-center diagonal: the boxes genuinely overlap mid-path
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(100.0, 100.0, 10.0, 10.0);
        let col = detect_collision(&a, &b, DVec2::new(200.0, 200.0)).unwrap();
        assert!(!col.overlaps);
        assert_eq!(col.ti, 0.45);
    }

    #[test]
    fn test_detect_overlap_stationary_minimum_displacement() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 0.0, 10.0, 10.0);
        let col = detect_collision(&a, &b, DVec2::new(0.0, 0.0)).unwrap();
        assert!(col.overlaps);
        assert!(col.ti < 0.0);
        // x is the shallower axis: push out along it only
        assert_eq!(col.normal, DVec2::new(-1.0, 0.0));
        assert_eq!(col.touch, DVec2::new(-5.0, 0.0));
    }

    #[test]
    fn test_detect_overlap_moving_backs_out() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 0.0, 10.0, 10.0);
        let col = detect_collision(&a, &b, DVec2::new(5.0, 0.0)).unwrap();
        assert!(col.overlaps);
        assert_eq!(col.ti, -50.0);
        assert_eq!(col.normal, DVec2::new(-1.0, 0.0));
        assert_eq!(col.touch, DVec2::new(-5.0, 0.0));
    }

    #[test]
    fn test_square_distance_of_centers() {
        let a = Rect::new(0.0, 0.0, 2.0, 2.0);
        let b = Rect::new(3.0, 4.0, 2.0, 2.0);
        assert_eq!(square_distance(&a, &b), 25.0);
    }
}
