//! Scene builders shared by the physics benchmarks.

use glam::{Quat, Vec2, Vec3};
use rein2d::{PhysicsConfig, PhysicsWorld, RigidBody, Shape};

/// A shape placed at `position` with rotation `angle` about Z.
pub fn placed_box(size: Vec2, position: Vec3, angle: f32) -> Shape {
    let mut shape = Shape::rectangle(size);
    shape.update(position, Quat::from_rotation_z(angle));
    shape
}

/// `n` unit boxes in a loose pile above a static floor, every other box
/// rotated so both face and corner contacts show up.
pub fn setup_pile(n: usize, config: PhysicsConfig) -> PhysicsWorld {
    let mut world = PhysicsWorld::new(config).expect("benchmark config is valid");
    let columns = (n as f32).sqrt().ceil().max(1.0) as usize;

    world.add_body(RigidBody::new_static(
        Shape::rectangle(Vec2::new(columns as f32 * 1.5 + 4.0, 1.0)),
        Vec3::ZERO,
    ));

    for i in 0..n {
        let column = (i % columns) as f32;
        let row = (i / columns) as f32;
        let angle = if i % 2 == 0 { 0.0 } else { 0.3 };
        let body = RigidBody::new_dynamic(
            Shape::rectangle(Vec2::ONE),
            Vec3::new(column * 1.05 - columns as f32 * 0.5, 0.95 + row * 0.95, 0.0),
            1.0,
        )
        .with_orientation(Quat::from_rotation_z(angle));
        world.add_body(body);
    }

    world
}

/// A chain of `n` boxes linked end to end by rods, hanging from a static anchor.
pub fn setup_chain(n: usize) -> PhysicsWorld {
    let mut world = PhysicsWorld::default();
    let mut previous = world.add_body(RigidBody::new_static(
        Shape::rectangle(Vec2::splat(0.5)),
        Vec3::ZERO,
    ));

    for i in 1..=n {
        let position = Vec3::new(i as f32 * 2.0, 0.0, 0.0);
        let link = world.add_body(
            RigidBody::new_dynamic(Shape::rectangle(Vec2::splat(0.5)), position, 1.0)
                .with_frozen_orientation(true),
        );
        let anchor = position - Vec3::X * 2.0;
        if world.add_rod(previous, link, anchor, position).is_ok() {
            previous = link;
        }
    }

    world
}
