//! Cell math for the uniform grid, and the voxel traversal used by segment
//! queries.

use glam::DVec2;

use super::geom::Rect;

/// Inclusive rectangle of grid cells covered by a box.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CellRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl CellRect {
    pub fn contains(&self, cx: i32, cy: i32) -> bool {
        cx >= self.x && cx < self.x + self.w && cy >= self.y && cy < self.y + self.h
    }
}

/// Cell containing a world coordinate. Cells are one-indexed so that cell
/// `c` covers `[cell_size*(c-1), cell_size*c)`.
pub fn to_cell(cell_size: i32, p: DVec2) -> (i32, i32) {
    let cs = cell_size as f64;
    ((p.x / cs).floor() as i32 + 1, (p.y / cs).floor() as i32 + 1)
}

/// World coordinate of a cell's origin.
pub fn to_world(cell_size: i32, cx: i32, cy: i32) -> DVec2 {
    let cs = cell_size as f64;
    DVec2::new((cx - 1) as f64 * cs, (cy - 1) as f64 * cs)
}

/// Cell rectangle covering a box.
pub fn to_cell_rect(cell_size: i32, rect: &Rect) -> CellRect {
    let cs = cell_size as f64;
    let (cx, cy) = to_cell(cell_size, rect.origin());
    let cr = ((rect.x + rect.w) / cs).ceil() as i32;
    let cb = ((rect.y + rect.h) / cs).ceil() as i32;
    CellRect {
        x: cx,
        y: cy,
        w: cr - cx + 1,
        h: cb - cy + 1,
    }
}

fn init_step(cell_size: i32, ct: i32, t1: f64, t2: f64) -> (i32, f64, f64) {
    let v = t2 - t1;
    let cs = cell_size as f64;
    if v > 0.0 {
        (1, cs / v, ((ct as f64 + v) * cs - t1) / v)
    } else if v < 0.0 {
        (-1, -cs / v, ((ct as f64 + v - 1.0) * cs - t1) / v)
    } else {
        (0, f64::INFINITY, f64::INFINITY)
    }
}

/// Visit every grid cell crossed by the segment `p1..p2`, in path order.
///
/// Amanatides-Woo traversal with two changes: when the segment touches a
/// grid corner both neighbouring cells are emitted, and iteration stops when
/// *next to* the last cell (stepping all the way can loop forever when a
/// boundary parameter compares equal to the final boundary). Cells may be
/// emitted more than once around corners.
pub fn traverse<F: FnMut(i32, i32)>(cell_size: i32, p1: DVec2, p2: DVec2, mut f: F) {
    let (cx1, cy1) = to_cell(cell_size, p1);
    let (cx2, cy2) = to_cell(cell_size, p2);
    let (step_x, dx, mut tx) = init_step(cell_size, cx1, p1.x, p2.x);
    let (step_y, dy, mut ty) = init_step(cell_size, cy1, p1.y, p2.y);
    let (mut cx, mut cy) = (cx1, cy1);

    f(cx, cy);

    while (cx - cx2).abs() + (cy - cy2).abs() > 1 {
        if tx < ty {
            tx += dx;
            cx += step_x;
            f(cx, cy);
        } else {
            // the segment goes through a corner: include both sides
            if tx == ty {
                f(cx + step_x, cy);
            }
            ty += dy;
            cy += step_y;
            f(cx, cy);
        }
    }

    if cx != cx2 || cy != cy2 {
        f(cx2, cy2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(cell_size: i32, p1: DVec2, p2: DVec2) -> Vec<(i32, i32)> {
        let mut cells = Vec::new();
        traverse(cell_size, p1, p2, |cx, cy| cells.push((cx, cy)));
        cells
    }

    #[test]
    fn test_to_cell_one_indexed() {
        assert_eq!(to_cell(64, DVec2::new(0.0, 0.0)), (1, 1));
        assert_eq!(to_cell(64, DVec2::new(63.9, 63.9)), (1, 1));
        assert_eq!(to_cell(64, DVec2::new(64.0, 0.0)), (2, 1));
        assert_eq!(to_cell(64, DVec2::new(-0.1, -0.1)), (0, 0));
    }

    #[test]
    fn test_to_world_inverts_to_cell_origin() {
        assert_eq!(to_world(64, 1, 1), DVec2::new(0.0, 0.0));
        assert_eq!(to_world(64, 3, 2), DVec2::new(128.0, 64.0));
        let (cx, cy) = to_cell(64, to_world(64, -2, 5));
        assert_eq!((cx, cy), (-2, 5));
    }

    #[test]
    fn test_cell_rect_covers_box() {
        // a box reaching exactly a cell boundary does not spill into the next
        let cr = to_cell_rect(64, &Rect::new(0.0, 0.0, 64.0, 64.0));
        assert_eq!(cr, CellRect { x: 1, y: 1, w: 1, h: 1 });
        let cr = to_cell_rect(64, &Rect::new(32.0, 32.0, 64.0, 64.0));
        assert_eq!(cr, CellRect { x: 1, y: 1, w: 2, h: 2 });
    }

    #[test]
    fn test_traverse_straight_line() {
        let cells = collect(1, DVec2::new(0.5, 0.5), DVec2::new(3.5, 0.5));
        assert_eq!(cells.first(), Some(&(1, 1)));
        assert_eq!(cells.last(), Some(&(4, 1)));
        for win in cells.windows(2) {
            assert_eq!(win[1].0 - win[0].0, 1);
            assert_eq!(win[1].1, win[0].1);
        }
    }

    #[test]
    fn test_traverse_single_cell() {
        let cells = collect(8, DVec2::new(1.0, 1.0), DVec2::new(2.0, 2.0));
        assert_eq!(cells, vec![(1, 1)]);
    }

    #[test]
    fn test_traverse_ends_at_target_cell() {
        let cells = collect(1, DVec2::new(0.5, 0.5), DVec2::new(5.5, 3.5));
        assert_eq!(cells.first(), Some(&(1, 1)));
        assert_eq!(cells.last(), Some(&(6, 4)));
    }

    #[test]
    fn test_traverse_corner_touch_visits_both_sides() {
        // exact diagonal through cell corners
        let cells = collect(1, DVec2::new(0.5, 0.5), DVec2::new(4.5, 4.5));
        assert!(cells.contains(&(1, 1)));
        assert!(cells.contains(&(5, 5)));
        // diagonal steps pass corners; the x-side neighbour is emitted too
        assert!(cells.iter().any(|&(cx, cy)| cx == cy + 1 || cy == cx + 1));
    }

    #[test]
    fn test_traverse_negative_direction() {
        let cells = collect(1, DVec2::new(3.5, 0.5), DVec2::new(0.5, 0.5));
        assert_eq!(cells.first(), Some(&(4, 1)));
        assert_eq!(cells.last(), Some(&(1, 1)));
    }

    #[test]
    fn test_traverse_terminates_on_boundary_endpoints() {
        // endpoints sitting exactly on cell boundaries used to hang the
        // textbook loop; the manhattan exit condition must finish
        let cells = collect(1, DVec2::new(0.0, 0.0), DVec2::new(4.0, 0.0));
        assert_eq!(cells.first(), Some(&(1, 1)));
        assert_eq!(cells.last(), Some(&(5, 1)));
        assert!(cells.len() <= 16);
    }
}
