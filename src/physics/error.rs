//! Errors reported by the world-building API.
//!
//! Detection and solving never fail; they report "no collision" or skip a
//! degenerate impulse instead.

use super::BodyHandle;

/// Errors returned when configuring a world or wiring bodies together.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("body {0:?} does not exist")]
    UnknownBody(BodyHandle),

    #[error("a constraint cannot link a body to itself")]
    SameBody,

    #[error("polygon needs at least 3 vertices, got {vertex_count}")]
    DegenerateShape { vertex_count: usize },

    #[error("fixed timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    #[error("damping must lie in [0, 1], got {0}")]
    InvalidDamping(f32),

    #[error("solver needs at least one iteration")]
    InvalidIterations,

    #[error("at least one substep per frame is required")]
    InvalidSubsteps,
}
