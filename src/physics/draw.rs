//! Plain-old-data snapshots of simulation state for a renderer.
//!
//! The physics layer owns no rendering state. These structs are laid out so
//! a caller can upload them with `bytemuck::cast_slice` as instance data.

use glam::{Mat4, Vec3};

use super::contact::Manifold;
use super::rigid_body::RigidBody;

/// Per-body instance data: the body's model matrix, with the shape's size
/// folded into the scale.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BodyInstance {
    pub model: [[f32; 4]; 4],
}

impl BodyInstance {
    pub fn from_body(body: &RigidBody) -> Self {
        let scale = body.shape().size().extend(1.0);
        let model = Mat4::from_scale_rotation_translation(scale, body.orientation, body.position);
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

/// Debug marker for one contact point.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ContactMarker {
    pub position: [f32; 3],
    pub size: f32,
}

impl ContactMarker {
    /// Default marker edge length in world units.
    pub const DEFAULT_SIZE: f32 = 0.1;

    pub fn new(position: Vec3) -> Self {
        Self {
            position: position.to_array(),
            size: Self::DEFAULT_SIZE,
        }
    }
}

/// Markers for every contact point in `manifolds`.
pub fn contact_markers<'a>(manifolds: impl IntoIterator<Item = &'a Manifold>) -> Vec<ContactMarker> {
    manifolds
        .into_iter()
        .filter(|m| m.collided)
        .flat_map(|m| m.points.iter().copied().map(ContactMarker::new))
        .collect()
}
