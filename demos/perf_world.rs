use glam::DVec2;
use std::time::Instant;
use thud::dim2::{Rect, World};
use thud::ResponseTag;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn main() {
    let n = 20_000usize;
    let mut world = World::new(32).unwrap();
    let mut seed = 1u32;

    let t0 = Instant::now();
    let mut ids = Vec::with_capacity(n);
    for _ in 0..n {
        let x = (lcg(&mut seed) % 10_000) as f64 - 5_000.0;
        let y = (lcg(&mut seed) % 10_000) as f64 - 5_000.0;
        let w = (lcg(&mut seed) % 24 + 8) as f64;
        let h = (lcg(&mut seed) % 24 + 8) as f64;
        ids.push(world.add(Rect::new(x, y, w, h)).unwrap());
    }
    let t_add = t0.elapsed();

    let t1 = Instant::now();
    let mut collisions = 0usize;
    for &id in ids.iter().take(2_000) {
        let rect = world.get_box(id).unwrap();
        let goal = DVec2::new(rect.x + 40.0, rect.y - 25.0);
        let (_, cols) = world.move_item(id, goal, ResponseTag::SLIDE).unwrap();
        collisions += cols.len();
    }
    let t_move = t1.elapsed();

    let t2 = Instant::now();
    let mut hits = 0usize;
    for i in 0..1_000 {
        let x = (i as f64 * 9.7) % 9_000.0 - 4_500.0;
        hits += world
            .query_rect(&Rect::new(x, -100.0, 200.0, 200.0), None)
            .len();
        hits += world
            .query_segment(DVec2::new(x, -5_000.0), DVec2::new(x + 300.0, 5_000.0), None)
            .len();
    }
    let t_query = t2.elapsed();

    println!(
        "N={} cells={} add={:?} move(2000)={:?} collisions={} query(1000)={:?} hits={}",
        n,
        world.count_cells(),
        t_add,
        t_move,
        collisions,
        t_query,
        hits
    );
}
