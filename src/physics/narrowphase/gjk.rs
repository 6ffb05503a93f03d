//! GJK intersection test with EPA penetration refinement (2D).
//!
//! GJK grows a triangle in the Minkowski difference `A - B` toward the
//! origin. When the triangle encloses the origin, EPA expands it into a
//! polygon until the edge closest to the origin stops moving; that edge gives
//! the normal and depth, and its endpoints' supporting vertices give the
//! contact point.

use glam::Vec3;

use super::{perp, triple_product, Collision};
use crate::physics::shape::Shape;

/// GJK gives up (reports no collision) after this many refinements.
pub const GJK_MAX_ITERATIONS: usize = 50;
/// Default EPA expansion cap.
pub const EPA_MAX_ITERATIONS: usize = 32;
/// EPA stops when a new support point improves the edge distance by less.
pub const EPA_TOLERANCE: f32 = 0.0001;

/// A Minkowski difference point and the shape vertices that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexPoint {
    pub p: Vec3,
    pub sa: Vec3,
    pub sb: Vec3,
}

/// The GJK triangle; `a` is the most recently added point.
#[derive(Debug, Clone, Copy)]
pub struct Simplex {
    pub a: SimplexPoint,
    pub b: SimplexPoint,
    pub c: SimplexPoint,
}

/// Polytope edge closest to the origin. `index` is the second endpoint, so
/// inserting at `index` splits the edge.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub index: usize,
    pub other_index: usize,
    pub normal: Vec3,
    pub dist: f32,
}

/// Support point of `A - B` along `direction`.
#[inline]
pub fn support(shape_a: &Shape, shape_b: &Shape, direction: Vec3) -> SimplexPoint {
    let sa = shape_a.support(direction);
    let sb = shape_b.support(-direction);
    SimplexPoint { p: sa - sb, sa, sb }
}

/// GJK + EPA with the default EPA iteration cap.
pub fn collide(shape_a: &Shape, shape_b: &Shape) -> Option<Collision> {
    collide_with(shape_a, shape_b, EPA_MAX_ITERATIONS)
}

/// GJK + EPA. The normal points from A to B.
pub fn collide_with(
    shape_a: &Shape,
    shape_b: &Shape,
    epa_max_iterations: usize,
) -> Option<Collision> {
    let simplex = intersect(shape_a, shape_b)?;
    epa(&simplex, shape_a, shape_b, epa_max_iterations)
}

/// GJK boolean test with the default iteration cap. Returns the enclosing
/// triangle on intersection.
pub fn intersect(shape_a: &Shape, shape_b: &Shape) -> Option<Simplex> {
    intersect_with(shape_a, shape_b, GJK_MAX_ITERATIONS)
}

/// GJK boolean test. Running out of iterations counts as no collision.
pub fn intersect_with(
    shape_a: &Shape,
    shape_b: &Shape,
    max_iterations: usize,
) -> Option<Simplex> {
    if !shape_a.is_collidable() || !shape_b.is_collidable() {
        return None;
    }

    // Concentric shapes have no center offset to start from.
    let mut first = shape_b.center() - shape_a.center();
    if first.length_squared() == 0.0 {
        first = Vec3::X;
    }
    let mut c = support(shape_a, shape_b, first);

    let mut dir = -c.p;
    if dir.length_squared() == 0.0 {
        dir = perp(first);
    }
    let mut b = support(shape_a, shape_b, dir);
    if b.p.dot(dir) < 0.0 {
        return None;
    }

    let bc = c.p - b.p;
    dir = triple_product(bc, -b.p, bc);

    for _ in 0..max_iterations {
        if dir.length_squared() == 0.0 {
            // Collinear simplex: the origin lies on the line through b and c.
            dir = fallback_direction(c.p - b.p, -b.p);
        }

        let a = support(shape_a, shape_b, dir);
        if a.p.dot(dir) < 0.0 {
            return None;
        }

        let ao = -a.p;
        let ab = b.p - a.p;
        let ac = c.p - a.p;

        let ac_perp = triple_product(ab, ac, ac);
        if ac_perp.dot(ao) >= 0.0 {
            dir = ac_perp;
        } else {
            let ab_perp = triple_product(ac, ab, ab);
            if ab_perp.dot(ao) < 0.0 {
                return Some(Simplex { a, b, c });
            }
            c = b;
            dir = ab_perp;
        }

        b = a;
    }

    tracing::trace!(
        iterations = max_iterations,
        "GJK hit its iteration cap, treating pair as separated"
    );
    None
}

/// Search direction to use when the triple product collapses: the normal of
/// `edge` on the side of `toward`, or +X for a zero-length edge.
pub fn fallback_direction(edge: Vec3, toward: Vec3) -> Vec3 {
    let normal = perp(edge);
    if normal.length_squared() == 0.0 {
        Vec3::X
    } else if normal.dot(toward) < 0.0 {
        -normal
    } else {
        normal
    }
}

/// Edge of the polytope closest to the origin.
///
/// `clockwise` selects which side of each edge is outward. Degenerate
/// (zero-length) edges are skipped.
pub fn closest_edge(polytope: &[SimplexPoint], clockwise: bool) -> Option<Edge> {
    let mut best: Option<Edge> = None;

    for i in 0..polytope.len() {
        let j = if i + 1 == polytope.len() { 0 } else { i + 1 };
        let a = polytope[i].p;
        let e = polytope[j].p - a;

        let outward = if clockwise { perp(e) } else { -perp(e) };
        let n = outward.normalize_or_zero();
        if n == Vec3::ZERO {
            continue;
        }

        let dist = n.dot(a);
        if best.map_or(true, |edge| dist < edge.dist) {
            best = Some(Edge {
                index: j,
                other_index: i,
                normal: n,
                dist,
            });
        }
    }

    best
}

/// Expand the GJK triangle into the penetration normal, depth and contact.
///
/// Running out of iterations returns the last closest edge as an
/// approximation instead of failing.
pub fn epa(
    simplex: &Simplex,
    shape_a: &Shape,
    shape_b: &Shape,
    max_iterations: usize,
) -> Option<Collision> {
    let mut polytope = vec![simplex.c, simplex.b, simplex.a];

    let (p0, p1, p2) = (simplex.c.p, simplex.b.p, simplex.a.p);
    let winding = (p1 - p0).x * (p2 - p1).y - (p1 - p0).y * (p2 - p1).x;
    let clockwise = winding < 0.0;

    let mut edge = closest_edge(&polytope, clockwise)?;

    for _ in 0..max_iterations {
        let new_point = support(shape_a, shape_b, edge.normal);
        let d = new_point.p.dot(edge.normal);

        if d - edge.dist < EPA_TOLERANCE {
            return Some(build_collision(&polytope, &edge, d));
        }

        polytope.insert(edge.index, new_point);
        edge = closest_edge(&polytope, clockwise)?;
    }

    tracing::trace!(
        iterations = max_iterations,
        "EPA did not converge, using last closest edge"
    );
    Some(build_collision(&polytope, &edge, edge.dist))
}

fn build_collision(polytope: &[SimplexPoint], edge: &Edge, depth: f32) -> Collision {
    let [contact_a, contact_b] = contact_from_edge(polytope, edge);
    let midpoint = (contact_a + contact_b) * 0.5;
    let mut collision = Collision::new(edge.normal, depth.max(0.0), vec![midpoint]);
    collision.witnesses = Some([contact_a, contact_b]);
    collision
}

/// Witness points on A and B: barycentric interpolation of the edge's
/// supporting vertices at the point closest to the origin.
pub fn contact_from_edge(polytope: &[SimplexPoint], edge: &Edge) -> [Vec3; 2] {
    let start = polytope[edge.other_index];
    let end = polytope[edge.index];
    let l = end.p - start.p;

    if l == Vec3::ZERO {
        return [start.sa, start.sb];
    }

    let ll = l.dot(l);
    let al = start.p.dot(l);

    let lambda2 = -al / ll;
    let lambda1 = 1.0 - lambda2;

    if lambda1 < 0.0 {
        [end.sa, end.sb]
    } else if lambda2 < 0.0 {
        [start.sa, start.sb]
    } else {
        [
            start.sa * lambda1 + end.sa * lambda2,
            start.sb * lambda1 + end.sb * lambda2,
        ]
    }
}
