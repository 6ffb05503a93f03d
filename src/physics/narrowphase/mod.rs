//! Narrowphase collision detection for convex polygons.
//!
//! Two independent detectors are provided:
//!
//! - [`sat`] - separating axis test with reference/incident edge clipping,
//!   producing up to two contact points.
//! - [`gjk`] - GJK intersection with EPA penetration refinement, producing a
//!   single contact point reconstructed from the closest polytope edge.
//!
//! Both report the collision normal pointing from shape A to shape B, so
//! either can drive the solver and each can check the other.

pub mod gjk;
pub mod sat;

use glam::Vec3;

use super::shape::Shape;

/// Which detector the world runs each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detector {
    /// Separating axis test with edge clipping.
    #[default]
    Sat,
    /// GJK with EPA penetration refinement.
    Gjk,
}

/// Result of a positive narrowphase test between two shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    /// Unit normal from shape A to shape B.
    pub normal: Vec3,
    /// Penetration depth (>= 0).
    pub depth: f32,
    /// Minimum translation vector (`normal * depth`).
    pub mtv: Vec3,
    /// World-space contact points (0, 1 or 2).
    pub points: Vec<Vec3>,
    /// Witness points on A and on B, when the detector tracks them (GJK/EPA).
    pub witnesses: Option<[Vec3; 2]>,
}

impl Collision {
    pub(crate) fn new(normal: Vec3, depth: f32, points: Vec<Vec3>) -> Self {
        Self {
            normal,
            depth,
            mtv: normal * depth,
            points,
            witnesses: None,
        }
    }
}

/// Run the selected detector on two shapes.
pub fn collide(
    detector: Detector,
    shape_a: &Shape,
    shape_b: &Shape,
    epa_max_iterations: usize,
) -> Option<Collision> {
    match detector {
        Detector::Sat => sat::collide(shape_a, shape_b),
        Detector::Gjk => gjk::collide_with(shape_a, shape_b, epa_max_iterations),
    }
}

/// Left-hand perpendicular in the XY plane: (x, y) -> (-y, x).
#[inline]
pub(crate) fn perp(v: Vec3) -> Vec3 {
    Vec3::new(-v.y, v.x, 0.0)
}

/// Planar triple product `(a x b) x c` = `b (a.c) - a (b.c)`.
#[inline]
pub(crate) fn triple_product(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ac = a.x * c.x + a.y * c.y;
    let bc = b.x * c.x + b.y * c.y;
    Vec3::new(b.x * ac - a.x * bc, b.y * ac - a.y * bc, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec2};

    fn boxed(size: Vec2, position: Vec3, angle: f32) -> Shape {
        let mut shape = Shape::rectangle(size);
        shape.update(position, Quat::from_rotation_z(angle));
        shape
    }

    #[test]
    fn test_triple_product_matches_cross() {
        let a = Vec3::new(1.0, 2.0, 0.0);
        let b = Vec3::new(-3.0, 0.5, 0.0);
        let c = Vec3::new(0.25, -1.0, 0.0);
        let expected = a.cross(b).cross(c);
        assert!((triple_product(a, b, c) - expected).length() < 1e-5);
    }

    #[test]
    fn test_detectors_agree_on_separated_boxes() {
        let a = boxed(Vec2::ONE, Vec3::ZERO, 0.0);
        let b = boxed(Vec2::ONE, Vec3::new(3.0, 0.2, 0.0), 0.4);
        assert!(collide(Detector::Sat, &a, &b, 32).is_none());
        assert!(collide(Detector::Gjk, &a, &b, 32).is_none());
    }

    #[test]
    fn test_detectors_agree_on_overlap() {
        let a = boxed(Vec2::new(2.0, 1.0), Vec3::ZERO, 0.0);
        let b = boxed(Vec2::ONE, Vec3::new(1.3, 0.1, 0.0), 0.0);

        let sat = collide(Detector::Sat, &a, &b, 32).expect("SAT should hit");
        let gjk = collide(Detector::Gjk, &a, &b, 32).expect("GJK should hit");

        assert!((sat.depth - 0.2).abs() < 1e-4, "SAT depth = {}", sat.depth);
        assert!((gjk.depth - sat.depth).abs() < 1e-3, "GJK depth = {}", gjk.depth);
        assert!((sat.normal - Vec3::X).length() < 1e-5);
        assert!((gjk.normal - Vec3::X).length() < 1e-3, "GJK normal = {}", gjk.normal);
    }
}
