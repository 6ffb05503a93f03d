//! Sequential impulse constraint solver.
//!
//! Contacts and joints are solved one after another against the current
//! velocities. The two normal impulses of a two-point manifold are solved
//! together as a 2x2 block so symmetric contacts get symmetric impulses.
//! Impulses are not accumulated or warm-started across steps.

use glam::{Mat3, Vec3};

use super::constraint::{Constraint, DistanceConstraint};
use super::contact::Contact;
use super::rigid_body::RigidBody;
use super::StepContext;

/// Tangential speed below which friction is skipped.
const TANGENT_EPSILON: f32 = 1e-6;
/// Anchor separation below which a distance constraint has no direction.
const DISTANCE_EPSILON: f32 = 1e-6;
/// Largest `k11^2 / det(K)` for which the two-point block is inverted.
const MAX_CONDITION_NUMBER: f32 = 1000.0;

/// `n . ((I * (r x n)) x r)`, the angular share of an effective mass.
#[inline]
fn angular_mass(inverse_inertia: Mat3, r: Vec3, n: Vec3) -> f32 {
    let rn = r.cross(n);
    (inverse_inertia * rn).dot(rn)
}

/// `(I * (r1 x n)) . (r2 x n)`, the angular coupling between two contact points.
#[inline]
fn angular_coupling(inverse_inertia: Mat3, r1: Vec3, r2: Vec3, n: Vec3) -> f32 {
    (inverse_inertia * r1.cross(n)).dot(r2.cross(n))
}

#[inline]
fn effective_mass(body_a: &RigidBody, body_b: &RigidBody, r_a: Vec3, r_b: Vec3, n: Vec3) -> f32 {
    body_a.inverse_mass
        + body_b.inverse_mass
        + angular_mass(body_a.effective_inverse_inertia(), r_a, n)
        + angular_mass(body_b.effective_inverse_inertia(), r_b, n)
}

/// Resolve every contact of one manifold.
///
/// Two-point manifolds get their normal impulses from [`block_impulses`]
/// followed by per-point friction. Single points, and pairs whose block is
/// too ill-conditioned to invert, fall back to [`solve_contact`] per point.
pub fn solve_manifold(
    contacts: &mut [Contact],
    body_a: &mut RigidBody,
    body_b: &mut RigidBody,
) {
    if let [first, second] = &mut *contacts {
        if solve_normal_pair(first, second, body_a, body_b) {
            solve_friction(first, body_a, body_b);
            solve_friction(second, body_a, body_b);
            return;
        }
    }

    for contact in contacts {
        solve_contact(contact, body_a, body_b);
    }
}

/// Resolve one contact: a non-negative normal impulse, then an unclamped
/// friction impulse scaled by `friction_a * friction_b`.
pub fn solve_contact(contact: &mut Contact, body_a: &mut RigidBody, body_b: &mut RigidBody) {
    let (r_a, r_b, n) = (contact.r_a, contact.r_b, contact.normal);

    let normal_mass = effective_mass(body_a, body_b, r_a, r_b, n);
    if normal_mass > 0.0 {
        let vab = body_b.velocity_at(r_b) - body_a.velocity_at(r_a);
        let jn = (-vab.dot(n) + contact.bias).max(0.0) / normal_mass;
        apply_normal(contact, jn, body_a, body_b);
    }

    solve_friction(contact, body_a, body_b);
}

/// Non-negative normal impulses `x` for two coupled contacts.
///
/// `k` is the symmetric effective-mass block and `b` holds each point's
/// `vn - bias`. The result keeps both post-impulse velocities `k x + b`
/// non-negative, trying both points active, then either one alone, then
/// neither.
pub fn block_impulses(k: [[f32; 2]; 2], b: [f32; 2]) -> [f32; 2] {
    let [[k11, k12], [_, k22]] = k;
    let det = k11 * k22 - k12 * k12;

    if det != 0.0 {
        let x1 = -(k22 * b[0] - k12 * b[1]) / det;
        let x2 = -(k11 * b[1] - k12 * b[0]) / det;
        if x1 >= 0.0 && x2 >= 0.0 {
            return [x1, x2];
        }
    }

    if k11 > 0.0 {
        let x1 = -b[0] / k11;
        if x1 >= 0.0 && k12 * x1 + b[1] >= 0.0 {
            return [x1, 0.0];
        }
    }

    if k22 > 0.0 {
        let x2 = -b[1] / k22;
        if x2 >= 0.0 && k12 * x2 + b[0] >= 0.0 {
            return [0.0, x2];
        }
    }

    [0.0, 0.0]
}

/// Solve both normal impulses of a two-point manifold at once. Returns false
/// without touching the bodies when the block is ill-conditioned.
fn solve_normal_pair(
    first: &mut Contact,
    second: &mut Contact,
    body_a: &mut RigidBody,
    body_b: &mut RigidBody,
) -> bool {
    let n = first.normal;
    let inertia_a = body_a.effective_inverse_inertia();
    let inertia_b = body_b.effective_inverse_inertia();
    let linear = body_a.inverse_mass + body_b.inverse_mass;

    let k11 = effective_mass(body_a, body_b, first.r_a, first.r_b, n);
    let k22 = effective_mass(body_a, body_b, second.r_a, second.r_b, n);
    let k12 = linear
        + angular_coupling(inertia_a, first.r_a, second.r_a, n)
        + angular_coupling(inertia_b, first.r_b, second.r_b, n);

    if k11 * k11 >= MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
        return false;
    }

    let vn = |contact: &Contact, a: &RigidBody, b: &RigidBody| {
        (b.velocity_at(contact.r_b) - a.velocity_at(contact.r_a)).dot(n)
    };
    let b = [
        vn(first, body_a, body_b) - first.bias,
        vn(second, body_a, body_b) - second.bias,
    ];

    let [x1, x2] = block_impulses([[k11, k12], [k12, k22]], b);
    apply_normal(first, x1, body_a, body_b);
    apply_normal(second, x2, body_a, body_b);
    true
}

#[inline]
fn apply_normal(
    contact: &mut Contact,
    jn: f32,
    body_a: &mut RigidBody,
    body_b: &mut RigidBody,
) {
    let n = contact.normal;
    body_a.apply_impulse(-n * jn, contact.r_a);
    body_b.apply_impulse(n * jn, contact.r_b);
    contact.normal_impulse += jn;
}

/// Friction along the sliding direction left after the normal impulse.
fn solve_friction(contact: &mut Contact, body_a: &mut RigidBody, body_b: &mut RigidBody) {
    let (r_a, r_b, n) = (contact.r_a, contact.r_b, contact.normal);

    let vab = body_b.velocity_at(r_b) - body_a.velocity_at(r_a);
    let tangent = vab - n * vab.dot(n);
    let tangent_length = tangent.length();
    if tangent_length <= TANGENT_EPSILON {
        return;
    }
    let tangent = tangent / tangent_length;

    let friction_mass = effective_mass(body_a, body_b, r_a, r_b, tangent);
    if friction_mass > 0.0 {
        let mu = body_a.friction * body_b.friction;
        let jt = -vab.dot(tangent) * mu / friction_mass;

        body_a.apply_impulse(-tangent * jt, r_a);
        body_b.apply_impulse(tangent * jt, r_b);
        contact.tangent_impulse += jt;
    }
}

/// Resolve one distance constraint with Baumgarte feedback on the length error.
pub fn solve_distance(
    constraint: &DistanceConstraint,
    body_a: &mut RigidBody,
    body_b: &mut RigidBody,
    ctx: &StepContext,
) {
    let (r_a, r_b) = constraint.world_offsets(body_a, body_b);
    let ab = (body_b.position + r_b) - (body_a.position + r_a);
    let length = ab.length();
    if length <= DISTANCE_EPSILON {
        return;
    }
    let n = ab / length;

    let mass = effective_mass(body_a, body_b, r_a, r_b, n);
    if mass <= 0.0 {
        return;
    }

    let relative_velocity = (body_a.velocity_at(r_a) - body_b.velocity_at(r_b)).dot(n);
    let bias = -(ctx.distance_baumgarte / ctx.dt) * (length - constraint.target_length);
    let j = -(relative_velocity + bias) / mass;

    body_a.apply_impulse(n * j, r_a);
    body_b.apply_impulse(-n * j, r_b);
}

/// Dispatch on the constraint kind.
pub fn solve_constraint(
    constraint: &Constraint,
    body_a: &mut RigidBody,
    body_b: &mut RigidBody,
    ctx: &StepContext,
) {
    match constraint {
        Constraint::Distance(distance) => solve_distance(distance, body_a, body_b, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::contact::Manifold;
    use crate::physics::narrowphase::sat;
    use crate::physics::shape::Shape;
    use crate::physics::{BodyHandle, PhysicsConfig};
    use glam::Vec2;
    use slotmap::SlotMap;

    fn frozen_box(x: f32) -> RigidBody {
        RigidBody::new_dynamic(Shape::rectangle(Vec2::ONE), Vec3::new(x, 0.0, 0.0), 1.0)
            .with_frozen_orientation(true)
    }

    fn solve_pair(bodies: &mut SlotMap<BodyHandle, RigidBody>, a: BodyHandle, b: BodyHandle) {
        let ctx = PhysicsConfig::default().step_context();
        let hit = sat::collide(bodies[a].shape(), bodies[b].shape()).expect("pair overlaps");
        let mut manifold = Manifold::new(a, &bodies[a], b, &bodies[b], hit);
        manifold.prepare(&bodies[a], &bodies[b], &ctx);

        let Some([body_a, body_b]) = bodies.get_disjoint_mut([a, b]) else {
            panic!("handles are distinct");
        };
        solve_manifold(&mut manifold.contacts, body_a, body_b);
    }

    #[test]
    fn test_elastic_head_on_swaps_velocities() {
        let mut bodies = SlotMap::with_key();
        let a = bodies.insert(
            frozen_box(0.0)
                .with_velocity(Vec3::new(10.0, 0.0, 0.0))
                .with_restitution(1.0)
                .with_friction(0.0),
        );
        let b = bodies.insert(frozen_box(0.9995).with_restitution(1.0).with_friction(0.0));

        solve_pair(&mut bodies, a, b);

        assert!(bodies[a].velocity.length() < 1e-3, "A = {}", bodies[a].velocity);
        assert!(
            (bodies[b].velocity - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-3,
            "B = {}",
            bodies[b].velocity
        );
    }

    #[test]
    fn test_elastic_head_on_with_rotation_swaps_without_spin() {
        let mut bodies = SlotMap::with_key();
        let spinning_box = |x: f32| {
            RigidBody::new_dynamic(Shape::rectangle(Vec2::ONE), Vec3::new(x, 0.0, 0.0), 1.0)
                .with_restitution(1.0)
                .with_friction(0.0)
        };
        let a = bodies.insert(spinning_box(0.0).with_velocity(Vec3::new(10.0, 0.0, 0.0)));
        let b = bodies.insert(spinning_box(0.9995));

        solve_pair(&mut bodies, a, b);

        assert!(bodies[a].velocity.length() < 1e-3, "A = {}", bodies[a].velocity);
        assert!(
            (bodies[b].velocity - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-3,
            "B = {}",
            bodies[b].velocity
        );
        assert!(bodies[a].angular_velocity.length() < 1e-3);
        assert!(bodies[b].angular_velocity.length() < 1e-3);
    }

    #[test]
    fn test_block_impulses_both_active() {
        // Two face contacts of unit boxes, 10 units/s of approach plus a
        // matching restitution bias at each point.
        let x = block_impulses([[5.0, -1.0], [-1.0, 5.0]], [-20.0, -20.0]);
        assert!((x[0] - 5.0).abs() < 1e-5 && (x[1] - 5.0).abs() < 1e-5, "x = {x:?}");
    }

    #[test]
    fn test_block_impulses_single_and_none() {
        let k = [[2.0, 1.0], [1.0, 2.0]];

        // Only the first point approaches; pushing it separates the second.
        let x = block_impulses(k, [-4.0, 1.0]);
        assert_eq!(x, [2.0, 0.0]);

        let x = block_impulses(k, [1.0, -4.0]);
        assert_eq!(x, [0.0, 2.0]);

        assert_eq!(block_impulses(k, [1.0, 3.0]), [0.0, 0.0]);
    }

    #[test]
    fn test_normal_impulse_never_pulls() {
        let mut bodies = SlotMap::with_key();
        let a = bodies.insert(frozen_box(0.0).with_velocity(Vec3::new(-5.0, 0.0, 0.0)));
        let b = bodies.insert(frozen_box(0.9995));

        solve_pair(&mut bodies, a, b);

        // Separating already; nothing should drag A back.
        assert_eq!(bodies[a].velocity, Vec3::new(-5.0, 0.0, 0.0));
        assert_eq!(bodies[b].velocity, Vec3::ZERO);
    }

    #[test]
    fn test_static_body_takes_no_impulse() {
        let mut bodies = SlotMap::with_key();
        let wall = bodies.insert(RigidBody::new_static(Shape::rectangle(Vec2::ONE), Vec3::ZERO));
        let ball = bodies.insert(frozen_box(0.9).with_velocity(Vec3::new(-3.0, 1.0, 0.0)));

        solve_pair(&mut bodies, wall, ball);

        assert_eq!(bodies[wall].velocity, Vec3::ZERO);
        assert_eq!(bodies[wall].angular_velocity, Vec3::ZERO);
        assert!(bodies[ball].velocity.x > 0.0, "ball = {}", bodies[ball].velocity);
    }

    #[test]
    fn test_extreme_friction_gains_energy() {
        // Friction is not clamped by the normal impulse, so a product above
        // one overshoots and reverses the sliding velocity with gain.
        let sliding = |mu: f32| {
            let mut bodies = SlotMap::with_key();
            let a = bodies.insert(frozen_box(0.0).with_friction(mu).with_restitution(0.0));
            let b = bodies.insert(
                frozen_box(0.9995)
                    .with_velocity(Vec3::new(0.0, 2.0, 0.0))
                    .with_friction(mu)
                    .with_restitution(0.0),
            );
            solve_pair(&mut bodies, a, b);
            (bodies[b].velocity - bodies[a].velocity).y
        };

        let calm = sliding(0.5);
        assert!(calm.abs() <= 2.0, "moderate friction grew sliding speed to {calm}");

        let wild = sliding(2.0);
        assert!(wild.abs() > 2.0, "expected growth, got {wild}");
    }

    #[test]
    fn test_distance_converges_without_overshoot() {
        let ctx = PhysicsConfig::default()
            .gravity(Vec3::ZERO)
            .damping(1.0)
            .step_context();
        let mut bodies = SlotMap::with_key();
        let a = bodies.insert(frozen_box(0.0));
        let b = bodies.insert(frozen_box(100.0));
        let constraint = DistanceConstraint::new(
            a,
            &bodies[a],
            b,
            &bodies[b],
            100.0,
            bodies[a].position,
            bodies[b].position,
        );
        bodies[b].set_position(Vec3::new(120.0, 0.0, 0.0));

        for _ in 0..300 {
            let Some([body_a, body_b]) = bodies.get_disjoint_mut([a, b]) else {
                panic!("handles are distinct");
            };
            solve_distance(&constraint, body_a, body_b, &ctx);
            for body in [body_a, body_b] {
                crate::physics::rigid_body::integrate_position(body, &ctx);
            }
            let length = constraint.current_length(&bodies[a], &bodies[b]);
            assert!(length > 99.9, "overshot to {length}");
        }

        let length = constraint.current_length(&bodies[a], &bodies[b]);
        assert!((length - 100.0).abs() < 0.01, "length = {length}");
    }

    #[test]
    fn test_distance_skips_coincident_anchors() {
        let ctx = PhysicsConfig::default().step_context();
        let mut bodies = SlotMap::with_key();
        let a = bodies.insert(frozen_box(0.0));
        let b = bodies.insert(frozen_box(0.0));
        let constraint =
            DistanceConstraint::new(a, &bodies[a], b, &bodies[b], 1.0, Vec3::ZERO, Vec3::ZERO);

        let Some([body_a, body_b]) = bodies.get_disjoint_mut([a, b]) else {
            panic!("handles are distinct");
        };
        solve_distance(&constraint, body_a, body_b, &ctx);
        assert_eq!(body_a.velocity, Vec3::ZERO);
        assert_eq!(body_b.velocity, Vec3::ZERO);
    }
}
