//! Contact manifolds and per-point solver state.

use glam::Vec3;

use super::narrowphase::Collision;
use super::rigid_body::RigidBody;
use super::{BodyHandle, StepContext};

/// One contact point's solver state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Contact position in world space.
    pub point: Vec3,
    /// Unit normal from A to B.
    pub normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
    /// Contact offset from A's center of mass.
    pub r_a: Vec3,
    /// Contact offset from B's center of mass.
    pub r_b: Vec3,
    /// Normal impulse applied this step. Reset every step.
    pub normal_impulse: f32,
    /// Friction impulse applied this step. Reset every step.
    pub tangent_impulse: f32,
    /// Velocity bias: stabilization plus restitution.
    pub bias: f32,
}

impl Contact {
    fn new(point: Vec3, r_a: Vec3, r_b: Vec3, collision: &Collision) -> Self {
        Self {
            point,
            normal: collision.normal,
            depth: collision.depth,
            r_a,
            r_b,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            bias: 0.0,
        }
    }

    /// Reset scratch impulses and compute the velocity bias from the current
    /// body velocities.
    pub fn prepare(&mut self, body_a: &RigidBody, body_b: &RigidBody, ctx: &StepContext) {
        self.normal_impulse = 0.0;
        self.tangent_impulse = 0.0;

        // Separation is -depth; only penetration beyond the slop is corrected.
        let penetration = (-self.depth + ctx.contact_slop).min(0.0);
        self.bias = -(ctx.contact_baumgarte / ctx.dt) * penetration;

        let elasticity = body_a.restitution * body_b.restitution;
        let approach = self
            .normal
            .dot(body_a.velocity_at(self.r_a) - body_b.velocity_at(self.r_b));
        self.bias += elasticity * approach;
    }
}

/// Result of one pairwise test, rebuilt every detection pass.
#[derive(Debug, Clone)]
pub struct Manifold {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub collided: bool,
    /// Unit normal from A to B.
    pub normal: Vec3,
    pub depth: f32,
    /// Minimum translation vector (`normal * depth`).
    pub mtv: Vec3,
    /// World-space contact points.
    pub points: Vec<Vec3>,
    /// Witness points on A and on B (GJK/EPA only).
    pub witnesses: Option<[Vec3; 2]>,
    pub contacts: Vec<Contact>,
}

impl Manifold {
    /// Build a manifold and its contacts from a narrowphase result.
    ///
    /// A collision without clipped points still gets one contact acting
    /// through both centers of mass.
    pub fn new(
        handle_a: BodyHandle,
        body_a: &RigidBody,
        handle_b: BodyHandle,
        body_b: &RigidBody,
        collision: Collision,
    ) -> Self {
        let contacts = if collision.points.is_empty() {
            vec![Contact::new(body_a.position, Vec3::ZERO, Vec3::ZERO, &collision)]
        } else {
            collision
                .points
                .iter()
                .map(|p| Contact::new(*p, *p - body_a.position, *p - body_b.position, &collision))
                .collect()
        };

        Self {
            body_a: handle_a,
            body_b: handle_b,
            collided: true,
            normal: collision.normal,
            depth: collision.depth,
            mtv: collision.mtv,
            points: collision.points,
            witnesses: collision.witnesses,
            contacts,
        }
    }

    /// Prepare every contact for this step.
    pub fn prepare(&mut self, body_a: &RigidBody, body_b: &RigidBody, ctx: &StepContext) {
        for contact in &mut self.contacts {
            contact.prepare(body_a, body_b, ctx);
        }
    }
}
