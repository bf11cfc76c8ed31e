//! Cell math for the uniform grid over three axes, and the voxel traversal
//! used by segment queries.

use glam::DVec3;

use super::geom::Cube;

/// Inclusive cube of grid cells covered by a box.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CellCube {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub w: i32,
    pub h: i32,
    pub d: i32,
}

impl CellCube {
    pub fn contains(&self, cx: i32, cy: i32, cz: i32) -> bool {
        cx >= self.x
            && cx < self.x + self.w
            && cy >= self.y
            && cy < self.y + self.h
            && cz >= self.z
            && cz < self.z + self.d
    }
}

/// Cell containing a world coordinate. Cells are one-indexed so that cell
/// `c` covers `[cell_size*(c-1), cell_size*c)`.
pub fn to_cell(cell_size: i32, p: DVec3) -> (i32, i32, i32) {
    let cs = cell_size as f64;
    (
        (p.x / cs).floor() as i32 + 1,
        (p.y / cs).floor() as i32 + 1,
        (p.z / cs).floor() as i32 + 1,
    )
}

/// World coordinate of a cell's origin.
pub fn to_world(cell_size: i32, cx: i32, cy: i32, cz: i32) -> DVec3 {
    let cs = cell_size as f64;
    DVec3::new(
        (cx - 1) as f64 * cs,
        (cy - 1) as f64 * cs,
        (cz - 1) as f64 * cs,
    )
}

/// Cell cube covering a box.
pub fn to_cell_cube(cell_size: i32, cube: &Cube) -> CellCube {
    let cs = cell_size as f64;
    let (cx, cy, cz) = to_cell(cell_size, cube.origin());
    let cr = ((cube.x + cube.w) / cs).ceil() as i32;
    let cb = ((cube.y + cube.h) / cs).ceil() as i32;
    let ck = ((cube.z + cube.d) / cs).ceil() as i32;
    CellCube {
        x: cx,
        y: cy,
        z: cz,
        w: cr - cx + 1,
        h: cb - cy + 1,
        d: ck - cz + 1,
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
/// grid corner all neighbouring cells on the tied axes are emitted, and
/// iteration stops when *next to* the last cell (stepping all the way can
/// loop forever when a boundary parameter compares equal to the final
/// boundary). Cells may be emitted more than once around corners.
pub fn traverse<F: FnMut(i32, i32, i32)>(cell_size: i32, p1: DVec3, p2: DVec3, mut f: F) {
    let (cx1, cy1, cz1) = to_cell(cell_size, p1);
    let (cx2, cy2, cz2) = to_cell(cell_size, p2);
    let (step_x, dx, mut tx) = init_step(cell_size, cx1, p1.x, p2.x);
    let (step_y, dy, mut ty) = init_step(cell_size, cy1, p1.y, p2.y);
    let (step_z, dz, mut tz) = init_step(cell_size, cz1, p1.z, p2.z);
    let (mut cx, mut cy, mut cz) = (cx1, cy1, cz1);

    f(cx, cy, cz);

    while (cx - cx2).abs() + (cy - cy2).abs() + (cz - cz2).abs() > 1 {
        if tx < ty && tx < tz {
            tx += dx;
            cx += step_x;
            f(cx, cy, cz);
        } else if ty < tz {
            // the segment goes through a corner: include both sides
            if tx == ty {
                f(cx + step_x, cy, cz);
            }
            ty += dy;
            cy += step_y;
            f(cx, cy, cz);
        } else {
            if tx == tz {
                f(cx + step_x, cy, cz);
            }
            if ty == tz {
                f(cx, cy + step_y, cz);
            }
            tz += dz;
            cz += step_z;
            f(cx, cy, cz);
        }
    }

    if cx != cx2 || cy != cy2 || cz != cz2 {
        f(cx2, cy2, cz2);
    }
}
