//! Rein 2D physics kernel
//!
//! A fixed-timestep rigid-body simulation for convex polygons.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **shape** - Convex polygons and world-space vertex caches
//! 2. **narrowphase** - SAT with edge clipping, GJK with EPA refinement
//! 3. **contact** - Manifolds and per-point solver state
//! 4. **solver** - Sequential impulses for contacts and distance constraints
//! 5. **rigid_body** - Semi-implicit Euler integration
//! 6. **draw** - Plain data handed to an external renderer
//!
//! Windowing, input and rendering live outside this crate; they read body
//! transforms and manifolds back through [`PhysicsWorld`].

pub mod physics;

pub use physics::constraint::{Constraint, DistanceConstraint};
pub use physics::contact::{Contact, Manifold};
pub use physics::draw::{BodyInstance, ContactMarker};
pub use physics::error::PhysicsError;
pub use physics::narrowphase::{Collision, Detector};
pub use physics::rigid_body::RigidBody;
pub use physics::shape::{Shape, ShapeKind};
pub use physics::{BodyHandle, ConstraintHandle, PhysicsConfig, PhysicsWorld, StepContext};

// Re-export glam for convenience
pub use glam;
