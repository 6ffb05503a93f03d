//! Joint constraints between body pairs.

use glam::Vec3;

use super::rigid_body::RigidBody;
use super::BodyHandle;

/// Keeps the distance between two body-anchored points at a target length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub target_length: f32,
    /// Anchor on A in A's local frame.
    pub local_anchor_a: Vec3,
    /// Anchor on B in B's local frame.
    pub local_anchor_b: Vec3,
}

impl DistanceConstraint {
    /// Build from world-space anchors, captured in each body's current frame.
    pub fn new(
        handle_a: BodyHandle,
        body_a: &RigidBody,
        handle_b: BodyHandle,
        body_b: &RigidBody,
        target_length: f32,
        anchor_a: Vec3,
        anchor_b: Vec3,
    ) -> Self {
        Self {
            body_a: handle_a,
            body_b: handle_b,
            target_length,
            local_anchor_a: body_a.orientation.inverse() * (anchor_a - body_a.position),
            local_anchor_b: body_b.orientation.inverse() * (anchor_b - body_b.position),
        }
    }

    /// Anchor offsets from each center of mass, rotated into world space.
    #[inline]
    pub fn world_offsets(&self, body_a: &RigidBody, body_b: &RigidBody) -> (Vec3, Vec3) {
        (
            body_a.orientation * self.local_anchor_a,
            body_b.orientation * self.local_anchor_b,
        )
    }

    /// World-space anchor positions.
    pub fn world_anchors(&self, body_a: &RigidBody, body_b: &RigidBody) -> (Vec3, Vec3) {
        let (r_a, r_b) = self.world_offsets(body_a, body_b);
        (body_a.position + r_a, body_b.position + r_b)
    }

    /// Current anchor separation.
    pub fn current_length(&self, body_a: &RigidBody, body_b: &RigidBody) -> f32 {
        let (a, b) = self.world_anchors(body_a, body_b);
        (b - a).length()
    }
}

/// Any constraint the world can hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    Distance(DistanceConstraint),
}

impl Constraint {
    /// The two bodies this constraint couples.
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        match self {
            Constraint::Distance(c) => (c.body_a, c.body_b),
        }
    }

    pub fn involves(&self, handle: BodyHandle) -> bool {
        let (a, b) = self.bodies();
        a == handle || b == handle
    }
}
