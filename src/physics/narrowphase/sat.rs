//! Separating Axis Theorem test with edge clipping.
//!
//! Test axes are the outward edge normals of both polygons. Contact points
//! come from clipping the incident edge against the side planes of the
//! reference edge, then dropping points that are not behind its face.

use glam::Vec3;

use super::{perp, Collision};
use crate::physics::shape::Shape;

/// Edge picked for clipping. `max` is the support vertex it was found from.
#[derive(Debug, Clone, Copy)]
pub struct ClippingEdge {
    pub v1: Vec3,
    pub v2: Vec3,
    pub edge: Vec3,
    pub max: Vec3,
}

/// Outward unit normal of every non-degenerate edge (counter-clockwise winding).
pub fn test_axes(shape: &Shape) -> Vec<Vec3> {
    let vertices = shape.world_vertices();
    let n = vertices.len();
    let mut axes = Vec::with_capacity(n);

    for i in 0..n {
        let p1 = vertices[i];
        let p2 = vertices[if i + 1 == n { 0 } else { i + 1 }];
        let edge = p2 - p1;
        let axis = Vec3::new(edge.y, -edge.x, 0.0).normalize_or_zero();
        if axis != Vec3::ZERO {
            axes.push(axis);
        }
    }

    axes
}

/// Project every world vertex on `axis`, returning `(min, max)`.
pub fn project(axis: Vec3, shape: &Shape) -> (f32, f32) {
    shape
        .world_vertices()
        .iter()
        .map(|v| axis.dot(*v))
        .fold((f32::MAX, f32::MIN), |(min, max), d| (min.min(d), max.max(d)))
}

#[inline]
fn overlaps(a: (f32, f32), b: (f32, f32)) -> bool {
    !(b.1 < a.0 || a.1 < b.0)
}

/// Signed distance B must move along the axis to clear A: positive pushes
/// B toward +axis. When one interval contains the other this is the full
/// push-out distance, not the length of the shared span.
#[inline]
fn push_out(a: (f32, f32), b: (f32, f32)) -> f32 {
    let forward = a.1 - b.0;
    let backward = b.1 - a.0;
    if forward <= backward {
        forward
    } else {
        -backward
    }
}

/// SAT test between two convex polygons.
///
/// Returns `None` as soon as one axis separates the projections. Otherwise
/// the axis needing the least push-out becomes the normal, flipped so it
/// points from A to B, and contact points are generated by clipping.
pub fn collide(shape_a: &Shape, shape_b: &Shape) -> Option<Collision> {
    if !shape_a.is_collidable() || !shape_b.is_collidable() {
        return None;
    }

    let mut depth = f32::MAX;
    let mut normal = Vec3::ZERO;

    for axis in test_axes(shape_a).into_iter().chain(test_axes(shape_b)) {
        let projection_a = project(axis, shape_a);
        let projection_b = project(axis, shape_b);

        if !overlaps(projection_a, projection_b) {
            return None;
        }

        let push = push_out(projection_a, projection_b);
        if push.abs() < depth {
            depth = push.abs();
            normal = if push < 0.0 { -axis } else { axis };
        }
    }

    if normal == Vec3::ZERO {
        return None;
    }

    let points = contact_points(shape_a, shape_b, normal);
    Some(Collision::new(normal, depth, points))
}

/// Pick the edge adjacent to the support vertex along `n` that is most
/// perpendicular to `n`.
pub fn best_edge(shape: &Shape, n: Vec3) -> ClippingEdge {
    let vertices = shape.world_vertices();
    let count = vertices.len();
    let index = shape.support_index(n);
    let index_prev = if index == 0 { count - 1 } else { index - 1 };
    let index_next = if index + 1 == count { 0 } else { index + 1 };

    let v = vertices[index];
    let v_next = vertices[index_next];
    let v_prev = vertices[index_prev];

    let l = (v - v_next).normalize_or_zero();
    let r = (v - v_prev).normalize_or_zero();

    if r.dot(n) <= l.dot(n) {
        ClippingEdge {
            v1: v_prev,
            v2: v,
            edge: v - v_prev,
            max: v,
        }
    } else {
        ClippingEdge {
            v1: v,
            v2: v_next,
            edge: v_next - v,
            max: v,
        }
    }
}

/// Keep the parts of segment `v1 v2` with `n . p >= o`.
pub fn clip(v1: Vec3, v2: Vec3, n: Vec3, o: f32) -> Vec<Vec3> {
    let mut points = Vec::with_capacity(2);
    let d1 = n.dot(v1) - o;
    let d2 = n.dot(v2) - o;

    if d1 >= 0.0 {
        points.push(v1);
    }
    if d2 >= 0.0 {
        points.push(v2);
    }

    if d1 * d2 < 0.0 {
        let u = d1 / (d1 - d2);
        points.push(v1 + (v2 - v1) * u);
    }

    points
}

/// Contact points for two overlapping polygons along `normal` (A to B).
pub fn contact_points(shape_a: &Shape, shape_b: &Shape, normal: Vec3) -> Vec<Vec3> {
    let e1 = best_edge(shape_a, normal);
    let e2 = best_edge(shape_b, -normal);

    // The edge more perpendicular to the normal is the reference face.
    let (reference, incident) = if e1.edge.dot(normal).abs() <= e2.edge.dot(normal).abs() {
        (e1, e2)
    } else {
        (e2, e1)
    };

    let ref_dir = reference.edge.normalize_or_zero();
    if ref_dir == Vec3::ZERO {
        return Vec::new();
    }

    let o1 = ref_dir.dot(reference.v1);
    let points = clip(incident.v1, incident.v2, ref_dir, o1);
    if points.len() < 2 {
        return Vec::new();
    }

    let o2 = ref_dir.dot(reference.v2);
    let mut points = clip(points[0], points[1], -ref_dir, -o2);
    if points.len() < 2 {
        return Vec::new();
    }

    // Counter-clockwise winding: the left-hand normal of an edge points into
    // its own polygon, so kept points sit at or past the reference face.
    let ref_normal = perp(ref_dir);
    let max = ref_normal.dot(reference.max);

    points.retain(|p| ref_normal.dot(*p) - max >= 0.0);
    points
}
