//! Rigid bodies and semi-implicit Euler integration.

use glam::{Mat3, Quat, Vec3};

use super::shape::Shape;
use super::StepContext;

/// A rigid body owning its collision polygon.
///
/// An `inverse_mass` of zero marks a static (infinite mass) body.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Force applied during the next velocity integration. Not cleared
    /// automatically.
    pub force: Vec3,
    pub orientation: Quat,
    /// Angular velocity; planar rotation lives on the Z component.
    pub angular_velocity: Vec3,
    pub torque: Vec3,
    pub inverse_mass: f32,
    pub inverse_inertia: Mat3,
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f32,
    /// Friction coefficient (>= 0).
    pub friction: f32,
    /// Disables angular integration and rotational solver response.
    pub freeze_orientation: bool,
    shape: Shape,
}

impl RigidBody {
    /// Create a body at `position`. A `mass` of zero (or less) makes it static.
    ///
    /// The inertia tensor uses the box formula over the shape's dimensions
    /// for every shape kind.
    pub fn new(shape: Shape, position: Vec3, velocity: Vec3, mass: f32) -> Self {
        let (inverse_mass, inverse_inertia) = if mass > 0.0 {
            let size = shape.size();
            let xx = size.x * size.x;
            let yy = size.y * size.y;
            let k = mass / 12.0;
            let inverse_inertia = Mat3::from_diagonal(Vec3::new(
                inverse_or_zero(k * yy),
                inverse_or_zero(k * xx),
                inverse_or_zero(k * (xx + yy)),
            ));
            (1.0 / mass, inverse_inertia)
        } else {
            (0.0, Mat3::ZERO)
        };

        let mut body = Self {
            position,
            velocity,
            force: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            angular_velocity: Vec3::ZERO,
            torque: Vec3::ZERO,
            inverse_mass,
            inverse_inertia,
            restitution: 0.3,
            friction: 0.5,
            freeze_orientation: false,
            shape,
        };
        body.sync_shape();
        body
    }

    /// Create a dynamic body at rest.
    pub fn new_dynamic(shape: Shape, position: Vec3, mass: f32) -> Self {
        Self::new(shape, position, Vec3::ZERO, mass)
    }

    /// Create a static body.
    pub fn new_static(shape: Shape, position: Vec3) -> Self {
        Self::new(shape, position, Vec3::ZERO, 0.0)
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    pub fn with_frozen_orientation(mut self, frozen: bool) -> Self {
        self.freeze_orientation = frozen;
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.set_orientation(orientation);
        self
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Teleport the body and refresh its world vertices.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.sync_shape();
    }

    /// Set the orientation (normalized) and refresh world vertices.
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
        self.sync_shape();
    }

    /// Zero the force and torque accumulators.
    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    /// Inverse inertia seen by the solver; zero when orientation is frozen.
    #[inline]
    pub fn effective_inverse_inertia(&self) -> Mat3 {
        if self.freeze_orientation {
            Mat3::ZERO
        } else {
            self.inverse_inertia
        }
    }

    /// Velocity of the material point at offset `r` from the center of mass.
    #[inline]
    pub fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(r)
    }

    /// Apply an impulse at offset `r` from the center of mass.
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vec3, r: Vec3) {
        self.velocity += impulse * self.inverse_mass;
        if !self.freeze_orientation {
            self.angular_velocity += self.inverse_inertia * r.cross(impulse);
        }
    }

    pub(crate) fn sync_shape(&mut self) {
        self.shape.update(self.position, self.orientation);
    }
}

fn inverse_or_zero(value: f32) -> f32 {
    if value > 0.0 {
        1.0 / value
    } else {
        0.0
    }
}

/// Integrate velocities: gravity, then `force * inverse_mass * dt`, then damping.
pub fn integrate_velocity(body: &mut RigidBody, ctx: &StepContext) {
    let dt = ctx.dt;

    if body.inverse_mass > 0.0 {
        body.velocity += ctx.gravity * dt;
    }

    body.velocity += body.force * body.inverse_mass * dt;
    body.velocity *= ctx.damping;

    if !body.freeze_orientation {
        body.angular_velocity += body.inverse_inertia * body.torque * dt;
        body.angular_velocity *= ctx.damping;
    }
}

/// Integrate positions: p += v * dt, q += 0.5 * dt * omega * q, then renormalize.
pub fn integrate_position(body: &mut RigidBody, ctx: &StepContext) {
    let dt = ctx.dt;

    body.position += body.velocity * dt;

    if !body.freeze_orientation {
        let omega = body.angular_velocity;
        let omega_quat = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0);
        let q_dot = omega_quat * body.orientation * (0.5 * dt);
        body.orientation = body.orientation + q_dot;
    }
    body.orientation = body.orientation.normalize();

    body.sync_shape();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsConfig;
    use glam::Vec2;

    fn unit_box() -> Shape {
        Shape::rectangle(Vec2::ONE)
    }

    #[test]
    fn test_free_fall() {
        let ctx = PhysicsConfig::default().damping(1.0).step_context();
        let mut body = RigidBody::new_dynamic(unit_box(), Vec3::new(0.0, 10.0, 0.0), 1.0);

        for _ in 0..60 {
            integrate_velocity(&mut body, &ctx);
            integrate_position(&mut body, &ctx);
        }

        // y = 10 - 0.5 * 9.8 * 1^2 ≈ 5.1, shifted a little by discrete steps
        assert!(
            body.position.y < 5.2 && body.position.y > 4.9,
            "unexpected height after 1s: y = {}",
            body.position.y
        );
        assert!(body.position.x.abs() < 1e-5);
        assert!((body.shape().center() - body.position).length() < 1e-5);
    }

    #[test]
    fn test_static_body_unaffected() {
        let ctx = PhysicsConfig::default().step_context();
        let mut body = RigidBody::new_static(unit_box(), Vec3::ZERO);
        body.force = Vec3::new(100.0, 100.0, 0.0);
        body.torque = Vec3::new(0.0, 0.0, 50.0);

        for _ in 0..60 {
            integrate_velocity(&mut body, &ctx);
            integrate_position(&mut body, &ctx);
        }

        assert_eq!(body.position, Vec3::ZERO);
        assert_eq!(body.velocity, Vec3::ZERO);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_orientation_stays_normalized() {
        let ctx = PhysicsConfig::default().damping(1.0).step_context();
        let mut body = RigidBody::new_dynamic(unit_box(), Vec3::ZERO, 2.0);
        body.torque = Vec3::new(0.0, 0.0, 1.0);

        for _ in 0..2000 {
            integrate_velocity(&mut body, &ctx);
            integrate_position(&mut body, &ctx);
            let len = body.orientation.length();
            assert!((len - 1.0).abs() < 1e-4, "|q| drifted to {len}");
        }
        assert!(body.angular_velocity.z > 0.0);
    }

    #[test]
    fn test_frozen_orientation_ignores_torque() {
        let ctx = PhysicsConfig::default().step_context();
        let mut body =
            RigidBody::new_dynamic(unit_box(), Vec3::ZERO, 1.0).with_frozen_orientation(true);
        body.torque = Vec3::new(0.0, 0.0, 10.0);

        for _ in 0..10 {
            integrate_velocity(&mut body, &ctx);
            integrate_position(&mut body, &ctx);
        }
        assert_eq!(body.angular_velocity, Vec3::ZERO);
        assert_eq!(body.orientation, Quat::IDENTITY);
    }

    #[test]
    fn test_damping_is_uniform() {
        let ctx = PhysicsConfig::default()
            .gravity(Vec3::ZERO)
            .damping(0.5)
            .step_context();
        let mut body = RigidBody::new_dynamic(unit_box(), Vec3::ZERO, 1.0)
            .with_velocity(Vec3::new(4.0, 8.0, 0.0));
        integrate_velocity(&mut body, &ctx);
        assert_eq!(body.velocity, Vec3::new(2.0, 4.0, 0.0));
    }

    #[test]
    fn test_box_inertia() {
        let body = RigidBody::new_dynamic(Shape::rectangle(Vec2::new(2.0, 4.0)), Vec3::ZERO, 3.0);
        // I_zz = m / 12 * (w^2 + h^2) = 3 / 12 * 20 = 5
        assert!((body.inverse_inertia.z_axis.z - 0.2).abs() < 1e-6);
        assert!(body.inverse_mass > 0.0);

        let wall = RigidBody::new_static(Shape::rectangle(Vec2::ONE), Vec3::ZERO);
        assert!(wall.is_static());
        assert_eq!(wall.inverse_inertia, Mat3::ZERO);
    }

    #[test]
    fn test_clear_forces() {
        let mut body = RigidBody::new_dynamic(unit_box(), Vec3::ZERO, 1.0);
        body.force = Vec3::new(10.0, 20.0, 0.0);
        body.torque = Vec3::new(0.0, 0.0, 3.0);
        body.clear_forces();
        assert_eq!(body.force, Vec3::ZERO);
        assert_eq!(body.torque, Vec3::ZERO);
    }
}
