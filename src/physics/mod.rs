//! 2D rigid-body physics with a fixed-timestep loop.
//!
//! # Architecture
//!
//! Each fixed step runs:
//!
//! 1. Narrowphase detection over every body pair (SAT or GJK/EPA)
//! 2. Contact preparation (stabilization and restitution bias)
//! 3. Velocity integration (gravity, forces, damping)
//! 4. Sequential impulses: contacts, then distance constraints
//! 5. Position/orientation integration and world vertex refresh
//!
//! There is no broadphase; all pairs are tested. Forces and torques persist
//! until [`PhysicsWorld::clear_forces`] is called.

pub mod constraint;
pub mod contact;
pub mod draw;
pub mod error;
pub mod narrowphase;
pub mod rigid_body;
pub mod shape;
pub mod solver;

use glam::Vec3;
use slotmap::SlotMap;

use self::constraint::{Constraint, DistanceConstraint};
use self::contact::Manifold;
use self::draw::{BodyInstance, ContactMarker};
use self::error::PhysicsError;
use self::narrowphase::Detector;
use self::rigid_body::{integrate_position, integrate_velocity, RigidBody};

slotmap::new_key_type! {
    /// Handle to a body owned by a [`PhysicsWorld`].
    pub struct BodyHandle;
    /// Handle to a constraint owned by a [`PhysicsWorld`].
    pub struct ConstraintHandle;
}

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.8, 0).
    pub gravity: Vec3,
    /// Velocity multiplier applied every step, linear and angular. Default: 0.99.
    pub damping: f32,
    /// Fixed timestep in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum fixed steps per frame before the backlog is dropped. Default: 8.
    pub max_substeps: u32,
    /// Solver passes per step. Default: 1.
    pub solver_iterations: u32,
    /// Fraction of contact penetration corrected per step. Default: 0.1.
    pub contact_baumgarte: f32,
    /// Penetration tolerated before correction kicks in. Default: 0.001.
    pub contact_slop: f32,
    /// Fraction of distance-constraint error corrected per step. Default: 0.1.
    pub distance_baumgarte: f32,
    /// Narrowphase detector. Default: SAT.
    pub detector: Detector,
    /// EPA expansion cap for the GJK detector. Default: 32.
    pub epa_max_iterations: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.8, 0.0),
            damping: 0.99,
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 8,
            solver_iterations: 1,
            contact_baumgarte: 0.1,
            contact_slop: 0.001,
            distance_baumgarte: 0.1,
            detector: Detector::Sat,
            epa_max_iterations: narrowphase::gjk::EPA_MAX_ITERATIONS,
        }
    }
}

impl PhysicsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn fixed_timestep(mut self, fixed_timestep: f64) -> Self {
        self.fixed_timestep = fixed_timestep;
        self
    }

    pub fn max_substeps(mut self, max_substeps: u32) -> Self {
        self.max_substeps = max_substeps;
        self
    }

    pub fn solver_iterations(mut self, solver_iterations: u32) -> Self {
        self.solver_iterations = solver_iterations;
        self
    }

    pub fn contact_baumgarte(mut self, beta: f32) -> Self {
        self.contact_baumgarte = beta;
        self
    }

    pub fn contact_slop(mut self, slop: f32) -> Self {
        self.contact_slop = slop;
        self
    }

    pub fn distance_baumgarte(mut self, beta: f32) -> Self {
        self.distance_baumgarte = beta;
        self
    }

    pub fn detector(mut self, detector: Detector) -> Self {
        self.detector = detector;
        self
    }

    pub fn epa_max_iterations(mut self, iterations: usize) -> Self {
        self.epa_max_iterations = iterations;
        self
    }

    /// Check that the configuration can drive a simulation.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        validate_timestep(self.fixed_timestep)?;
        validate_damping(self.damping)?;
        if self.solver_iterations == 0 {
            return Err(PhysicsError::InvalidIterations);
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidSubsteps);
        }
        Ok(())
    }

    /// Constants for one fixed step.
    pub fn step_context(&self) -> StepContext {
        StepContext {
            dt: self.fixed_timestep as f32,
            gravity: self.gravity,
            damping: self.damping,
            contact_baumgarte: self.contact_baumgarte,
            contact_slop: self.contact_slop,
            distance_baumgarte: self.distance_baumgarte,
        }
    }
}

fn validate_timestep(dt: f64) -> Result<(), PhysicsError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidTimestep(dt))
    }
}

fn validate_damping(damping: f32) -> Result<(), PhysicsError> {
    if (0.0..=1.0).contains(&damping) {
        Ok(())
    } else {
        Err(PhysicsError::InvalidDamping(damping))
    }
}

/// Simulation constants passed explicitly to the integrator and solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    pub dt: f32,
    pub gravity: Vec3,
    pub damping: f32,
    pub contact_baumgarte: f32,
    pub contact_slop: f32,
    pub distance_baumgarte: f32,
}

/// Owns every body, constraint and the latest manifolds.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: SlotMap<BodyHandle, RigidBody>,
    constraints: SlotMap<ConstraintHandle, Constraint>,
    manifolds: Vec<Manifold>,
    accumulator: f64,
    last_time: Option<f64>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::from_valid_config(PhysicsConfig::default())
    }
}

impl PhysicsWorld {
    /// Create an empty world, rejecting configurations that cannot step.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PhysicsConfig) -> Self {
        Self {
            config,
            bodies: SlotMap::with_key(),
            constraints: SlotMap::with_key(),
            manifolds: Vec::new(),
            accumulator: 0.0,
            last_time: None,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    pub fn set_damping(&mut self, damping: f32) -> Result<(), PhysicsError> {
        validate_damping(damping)?;
        self.config.damping = damping;
        Ok(())
    }

    pub fn set_fixed_timestep(&mut self, dt: f64) -> Result<(), PhysicsError> {
        validate_timestep(dt)?;
        self.config.fixed_timestep = dt;
        Ok(())
    }

    pub fn set_detector(&mut self, detector: Detector) {
        self.config.detector = detector;
    }

    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        self.bodies.insert(body)
    }

    /// Remove a body along with every constraint and manifold referencing it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let body = self.bodies.remove(handle)?;
        self.constraints.retain(|_, c| !c.involves(handle));
        self.manifolds.retain(|m| m.body_a != handle && m.body_b != handle);
        Some(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Mutable access for setting forces or velocities. Use
    /// [`RigidBody::set_position`] to move a body so its vertices follow.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Link two bodies with a rod of `target_length` between world anchors.
    pub fn add_distance_constraint(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        target_length: f32,
        anchor_a: Vec3,
        anchor_b: Vec3,
    ) -> Result<ConstraintHandle, PhysicsError> {
        if body_a == body_b {
            return Err(PhysicsError::SameBody);
        }
        let a = self
            .bodies
            .get(body_a)
            .ok_or(PhysicsError::UnknownBody(body_a))?;
        let b = self
            .bodies
            .get(body_b)
            .ok_or(PhysicsError::UnknownBody(body_b))?;

        let constraint =
            DistanceConstraint::new(body_a, a, body_b, b, target_length, anchor_a, anchor_b);
        Ok(self.constraints.insert(Constraint::Distance(constraint)))
    }

    /// Like [`PhysicsWorld::add_distance_constraint`], holding the anchors
    /// at their current separation.
    pub fn add_rod(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        anchor_a: Vec3,
        anchor_b: Vec3,
    ) -> Result<ConstraintHandle, PhysicsError> {
        let length = (anchor_b - anchor_a).length();
        self.add_distance_constraint(body_a, body_b, length, anchor_a, anchor_b)
    }

    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Option<Constraint> {
        self.constraints.remove(handle)
    }

    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&Constraint> {
        self.constraints.get(handle)
    }

    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintHandle, &Constraint)> {
        self.constraints.iter()
    }

    /// Manifolds from the most recent detection pass.
    pub fn manifolds(&self) -> &[Manifold] {
        &self.manifolds
    }

    /// Time banked toward the next fixed step, in seconds.
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Zero every body's force and torque.
    pub fn clear_forces(&mut self) {
        for body in self.bodies.values_mut() {
            body.clear_forces();
        }
    }

    /// Rebuild the manifold list by testing every pair of bodies.
    pub fn detect_collisions(&mut self) {
        self.manifolds.clear();

        let handles: Vec<BodyHandle> = self.bodies.keys().collect();
        for (i, &handle_a) in handles.iter().enumerate() {
            for &handle_b in &handles[i + 1..] {
                let a = &self.bodies[handle_a];
                let b = &self.bodies[handle_b];
                if a.is_static() && b.is_static() {
                    continue;
                }

                let hit = narrowphase::collide(
                    self.config.detector,
                    a.shape(),
                    b.shape(),
                    self.config.epa_max_iterations,
                );
                if let Some(collision) = hit {
                    self.manifolds
                        .push(Manifold::new(handle_a, a, handle_b, b, collision));
                }
            }
        }

        tracing::trace!(
            bodies = handles.len(),
            manifolds = self.manifolds.len(),
            "narrowphase complete"
        );
    }

    /// Advance the simulation by exactly one fixed timestep.
    pub fn fixed_step(&mut self) {
        let ctx = self.config.step_context();

        self.detect_collisions();

        for manifold in &mut self.manifolds {
            if let (Some(a), Some(b)) = (
                self.bodies.get(manifold.body_a),
                self.bodies.get(manifold.body_b),
            ) {
                manifold.prepare(a, b, &ctx);
            }
        }

        for body in self.bodies.values_mut() {
            integrate_velocity(body, &ctx);
        }

        for _ in 0..self.config.solver_iterations {
            for manifold in &mut self.manifolds {
                let Some([a, b]) = self
                    .bodies
                    .get_disjoint_mut([manifold.body_a, manifold.body_b])
                else {
                    continue;
                };
                solver::solve_manifold(&mut manifold.contacts, a, b);
            }

            for constraint in self.constraints.values() {
                let (handle_a, handle_b) = constraint.bodies();
                let Some([a, b]) = self.bodies.get_disjoint_mut([handle_a, handle_b]) else {
                    continue;
                };
                solver::solve_constraint(constraint, a, b, &ctx);
            }
        }

        for body in self.bodies.values_mut() {
            integrate_position(body, &ctx);
        }
    }

    /// Bank `frame_time` seconds and run as many fixed steps as it covers.
    ///
    /// Returns the number of fixed steps run.
    pub fn step(&mut self, frame_time: f64) -> u32 {
        let dt = self.config.fixed_timestep;
        self.accumulator += frame_time.max(0.0);

        let mut steps = 0u32;
        while self.accumulator >= dt && steps < self.config.max_substeps {
            self.fixed_step();
            self.accumulator -= dt;
            steps += 1;
        }

        // Drop the backlog rather than spiral.
        if self.accumulator > dt * self.config.max_substeps as f64 {
            tracing::warn!(
                pending = self.accumulator,
                max_substeps = self.config.max_substeps,
                "physics fell behind, dropping accumulated time"
            );
            self.accumulator = 0.0;
        }

        tracing::debug!(
            steps,
            bodies = self.bodies.len(),
            manifolds = self.manifolds.len(),
            "physics frame"
        );
        steps
    }

    /// Step by the wall-clock time elapsed since the previous call.
    ///
    /// The first call only records `now_seconds` and runs nothing.
    pub fn advance_to(&mut self, now_seconds: f64) -> u32 {
        match self.last_time.replace(now_seconds) {
            Some(previous) => self.step(now_seconds - previous),
            None => 0,
        }
    }

    /// Model matrices for every body, in arena order.
    pub fn draw_instances(&self) -> Vec<BodyInstance> {
        self.bodies.values().map(BodyInstance::from_body).collect()
    }

    /// One marker per contact point of the latest manifolds.
    pub fn contact_markers(&self) -> Vec<ContactMarker> {
        draw::contact_markers(&self.manifolds)
    }
}
