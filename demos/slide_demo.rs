use glam::DVec2;
use thud::dim2::{Rect, World};
use thud::ResponseTag;

fn main() {
    let mut world = World::new(64).unwrap();

    let player = world.add(Rect::new(0.0, 0.0, 16.0, 24.0)).unwrap();
    let wall = world.add(Rect::new(40.0, -100.0, 16.0, 300.0)).unwrap();
    let floor = world.add(Rect::new(-200.0, 100.0, 600.0, 16.0)).unwrap();

    println!("player={player} wall={wall} floor={floor}");

    for (tag, name) in [
        (ResponseTag::SLIDE, "slide"),
        (ResponseTag::TOUCH, "touch"),
        (ResponseTag::BOUNCE, "bounce"),
    ] {
        let (actual, cols) = world.check(player, DVec2::new(120.0, 140.0), tag).unwrap();
        println!("{name}: actual=({:.1}, {:.1})", actual.x, actual.y);
        for col in &cols {
            println!(
                "  hit {} at ti={:.3} n=({:.0},{:.0}) touch=({:.1},{:.1})",
                col.other, col.ti, col.normal.x, col.normal.y, col.touch.x, col.touch.y
            );
        }
    }

    let (actual, cols) = world
        .move_item(player, DVec2::new(120.0, 140.0), ResponseTag::SLIDE)
        .unwrap();
    println!(
        "committed slide: ({:.1}, {:.1}) with {} collision(s)",
        actual.x,
        actual.y,
        cols.len()
    );

    let hits = world.query_segment(DVec2::new(-50.0, 50.0), DVec2::new(300.0, 50.0), None);
    println!("segment hits: {hits:?}");
}
