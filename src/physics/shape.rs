//! Convex polygon shapes and their world-space vertex caches.

use glam::{Quat, Vec2, Vec3};

use super::error::PhysicsError;

/// Built-in polygon layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Four corners, starting top-left, counter-clockwise.
    Box,
    /// Isosceles triangle pointing along +X.
    Triangle,
    /// Right angle at the bottom-left corner.
    RightTriangle,
    /// Caller-supplied vertices.
    Custom,
}

/// A convex polygon in the XY plane (Y up, counter-clockwise winding).
///
/// Local vertices are unit-sized and scaled by `size` when transformed, so a
/// `Box` of size `(100, 50)` spans 100 by 50 world units.
#[derive(Debug, Clone)]
pub struct Shape {
    kind: ShapeKind,
    local_vertices: Vec<Vec3>,
    world_vertices: Vec<Vec3>,
    center: Vec3,
    orientation: Quat,
    size: Vec2,
    radius: f32,
}

impl Shape {
    /// Create a built-in shape. `ShapeKind::Custom` yields an empty polygon
    /// until [`Shape::reset_vertices`] is called.
    pub fn new(size: Vec2, kind: ShapeKind) -> Self {
        let local_vertices = match kind {
            ShapeKind::Box => vec![
                Vec3::new(-0.5, 0.5, 0.0),
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
            ],
            ShapeKind::Triangle => vec![
                Vec3::new(0.5, 0.0, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
                Vec3::new(-0.5, -0.5, 0.0),
            ],
            ShapeKind::RightTriangle => vec![
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
                Vec3::new(-0.5, -0.5, 0.0),
            ],
            ShapeKind::Custom => Vec::new(),
        };

        let mut shape = Self {
            kind,
            world_vertices: local_vertices.clone(),
            local_vertices,
            center: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            size,
            radius: 0.0,
        };
        shape.update(Vec3::ZERO, Quat::IDENTITY);
        shape
    }

    /// Axis-aligned box of the given width and height.
    pub fn rectangle(size: Vec2) -> Self {
        Self::new(size, ShapeKind::Box)
    }

    /// Custom convex polygon. Vertices are in unit local space (scaled by
    /// `size`) and must wind counter-clockwise.
    pub fn custom(size: Vec2, vertices: Vec<Vec3>) -> Result<Self, PhysicsError> {
        let mut shape = Self::new(size, ShapeKind::Custom);
        shape.reset_vertices(vertices)?;
        Ok(shape)
    }

    /// Replace the local vertices and re-place them with the last transform.
    pub fn reset_vertices(&mut self, vertices: Vec<Vec3>) -> Result<(), PhysicsError> {
        if vertices.len() < 3 {
            return Err(PhysicsError::DegenerateShape {
                vertex_count: vertices.len(),
            });
        }
        self.world_vertices = vertices.clone();
        self.local_vertices = vertices;
        self.update(self.center, self.orientation);
        Ok(())
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Center of the polygon in world space (the owning body's position).
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Orientation of the last update.
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Distance from the center to the farthest vertex.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn vertex_count(&self) -> usize {
        self.local_vertices.len()
    }

    pub fn local_vertices(&self) -> &[Vec3] {
        &self.local_vertices
    }

    pub fn world_vertices(&self) -> &[Vec3] {
        &self.world_vertices
    }

    /// Whether detection can run on this shape at all.
    #[inline]
    pub fn is_collidable(&self) -> bool {
        self.world_vertices.len() >= 3
    }

    /// Recompute world vertices as `orientation * (local * size) + position`.
    pub fn update(&mut self, position: Vec3, orientation: Quat) {
        let scale = self.size.extend(1.0);
        for (world, local) in self.world_vertices.iter_mut().zip(&self.local_vertices) {
            *world = orientation * (*local * scale) + position;
        }
        self.center = position;
        self.orientation = orientation;
        self.radius = self.furthest_distance();
    }

    /// Update from a scale and an axis-angle rotation. A zero angle or a
    /// zero axis leaves the polygon unrotated.
    pub fn update_axis_angle(&mut self, position: Vec3, size: Vec2, axis: Vec3, angle: f32) {
        self.size = size;
        let axis = axis.normalize_or_zero();
        let orientation = if angle != 0.0 && axis != Vec3::ZERO {
            Quat::from_axis_angle(axis, angle)
        } else {
            Quat::IDENTITY
        };
        self.update(position, orientation);
    }

    /// Index of the world vertex with the greatest projection on `direction`.
    /// Ties keep the first vertex found.
    #[inline]
    pub fn support_index(&self, direction: Vec3) -> usize {
        max_dot_index(&self.world_vertices, direction)
    }

    /// Same as [`Shape::support_index`] but over local vertices.
    #[inline]
    pub fn local_support_index(&self, direction: Vec3) -> usize {
        max_dot_index(&self.local_vertices, direction)
    }

    /// Support function: the world vertex farthest along `direction`.
    /// An empty polygon answers with its center.
    #[inline]
    pub fn support(&self, direction: Vec3) -> Vec3 {
        self.world_vertices
            .get(self.support_index(direction))
            .copied()
            .unwrap_or(self.center)
    }

    /// The world vertex farthest from the center.
    pub fn furthest_vertex(&self) -> Vec3 {
        let mut best = self.center;
        let mut max = f32::MIN;
        for v in &self.world_vertices {
            let d = (*v - self.center).length();
            if d > max {
                max = d;
                best = *v;
            }
        }
        best
    }

    fn furthest_distance(&self) -> f32 {
        (self.furthest_vertex() - self.center).length()
    }
}

fn max_dot_index(vertices: &[Vec3], direction: Vec3) -> usize {
    let mut index = 0;
    let mut max = f32::MIN;
    for (i, v) in vertices.iter().enumerate() {
        let d = v.dot(direction);
        if d > max {
            max = d;
            index = i;
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_box_world_vertices() {
        let mut shape = Shape::rectangle(Vec2::new(100.0, 50.0));
        shape.update(Vec3::new(10.0, 20.0, 0.0), Quat::IDENTITY);

        let expected = [
            Vec3::new(-40.0, 45.0, 0.0),
            Vec3::new(-40.0, -5.0, 0.0),
            Vec3::new(60.0, -5.0, 0.0),
            Vec3::new(60.0, 45.0, 0.0),
        ];
        for (v, e) in shape.world_vertices().iter().zip(expected) {
            assert!((*v - e).length() < EPS, "vertex {v} != {e}");
        }
        assert_eq!(shape.center(), Vec3::new(10.0, 20.0, 0.0));
    }

    #[test]
    fn test_rotated_box() {
        let mut shape = Shape::rectangle(Vec2::new(2.0, 2.0));
        shape.update(Vec3::ZERO, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));

        // Top-left corner (-1, 1) rotates a quarter turn to (-1, -1).
        let v = shape.world_vertices()[0];
        assert!((v - Vec3::new(-1.0, -1.0, 0.0)).length() < EPS, "got {v}");
    }

    #[test]
    fn test_radius_tracks_farthest_vertex() {
        let mut shape = Shape::rectangle(Vec2::new(6.0, 8.0));
        shape.update(Vec3::new(3.0, 3.0, 0.0), Quat::from_rotation_z(0.3));
        assert!((shape.radius() - 5.0).abs() < 1e-4, "radius = {}", shape.radius());
    }

    #[test]
    fn test_triangle_windings_are_counter_clockwise() {
        for kind in [ShapeKind::Triangle, ShapeKind::RightTriangle, ShapeKind::Box] {
            let shape = Shape::new(Vec2::ONE, kind);
            let v = shape.local_vertices();
            let mut area = 0.0;
            for i in 0..v.len() {
                let a = v[i];
                let b = v[(i + 1) % v.len()];
                area += a.x * b.y - b.x * a.y;
            }
            assert!(area > 0.0, "{kind:?} winds clockwise");
        }
    }

    #[test]
    fn test_support_prefers_first_on_ties() {
        let shape = Shape::rectangle(Vec2::ONE);
        // Vertices 2 and 3 share x = 0.5.
        assert_eq!(shape.support_index(Vec3::X), 2);
        assert_eq!(shape.support(Vec3::new(1.0, 1.0, 0.0)), Vec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_axis_angle_update() {
        let mut shape = Shape::new(Vec2::ONE, ShapeKind::Triangle);
        shape.update_axis_angle(Vec3::ZERO, Vec2::splat(2.0), Vec3::Z, std::f32::consts::PI);
        let tip = shape.world_vertices()[0];
        assert!((tip - Vec3::new(-1.0, 0.0, 0.0)).length() < EPS, "got {tip}");

        shape.update_axis_angle(Vec3::X, Vec2::splat(2.0), Vec3::ZERO, 1.0);
        let tip = shape.world_vertices()[0];
        assert!((tip - Vec3::new(2.0, 0.0, 0.0)).length() < EPS, "got {tip}");
    }

    #[test]
    fn test_custom_shape_requires_three_vertices() {
        let err = Shape::custom(Vec2::ONE, vec![Vec3::ZERO, Vec3::X]).unwrap_err();
        assert_eq!(err, PhysicsError::DegenerateShape { vertex_count: 2 });

        let shape = Shape::custom(
            Vec2::ONE,
            vec![Vec3::ZERO, Vec3::X, Vec3::new(0.0, 1.0, 0.0)],
        )
        .unwrap();
        assert!(shape.is_collidable());
    }

    #[test]
    fn test_empty_custom_shape_is_inert() {
        let mut shape = Shape::new(Vec2::ONE, ShapeKind::Custom);
        shape.update(Vec3::new(4.0, 2.0, 0.0), Quat::IDENTITY);
        assert!(!shape.is_collidable());
        assert_eq!(shape.support(Vec3::X), Vec3::new(4.0, 2.0, 0.0));
        assert_eq!(shape.radius(), 0.0);
    }

    #[test]
    fn test_reset_vertices_keeps_last_transform() {
        let position = Vec3::new(5.0, -1.0, 0.0);
        let orientation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let mut shape = Shape::rectangle(Vec2::new(2.0, 2.0));
        shape.update(position, orientation);

        let wedge = vec![
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::new(-0.5, -0.5, 0.0),
        ];
        shape.reset_vertices(wedge.clone()).unwrap();

        assert_eq!(shape.orientation(), orientation);
        for (world, local) in shape.world_vertices().iter().zip(&wedge) {
            let expected = orientation * (*local * 2.0) + position;
            assert!((*world - expected).length() < EPS, "vertex {world} != {expected}");
        }
        // Farthest vertex is the scaled (-1, -1) corner.
        assert!((shape.radius() - 2.0f32.sqrt()).abs() < 1e-4, "radius = {}", shape.radius());
    }
}
