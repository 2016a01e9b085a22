//! Scene objects and their spatial transforms.
//!
//! - [`Transform`]: position, Euler rotation in degrees, and scale
//! - [`Shape`]: the local geometry an object occupies (used for its world AABB)
//! - [`SceneObject`]: a named, hit-testable object with a material
//!
//! # Transforms
//!
//! [`Transform`] uses a builder pattern:
//!
//! ```
//! use slabtrace::Transform;
//! use glam::Vec3;
//!
//! let transform = Transform::new()
//!     .position(Vec3::new(-2.0, 0.0, 0.0))
//!     .rotation(Vec3::new(0.0, 45.0, 0.0))
//!     .uniform_scale(1.0);
//!
//! let m = transform.matrix();
//! assert!((m.w_axis.truncate() - Vec3::new(-2.0, 0.0, 0.0)).length() < 1e-6);
//! ```

use crate::error::Result;
use crate::hit::{Hit, HitShape, Hittable, ModelTransform};
use crate::material::Material;
use crate::math::model_matrix;
use glam::{Mat4, Vec3};

/// Position, rotation and scale of an object.
///
/// The rotation holds Euler angles in degrees, applied X first, then Y,
/// then Z. See [`crate::math::model_matrix`] for the composition order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// World-space position (translation).
    pub position: Vec3,
    /// Euler angles in degrees.
    pub rotation: Vec3,
    /// Scale factors for each axis.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates an identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform positioned at the given location.
    ///
    /// ```
    /// use slabtrace::Transform;
    /// use glam::Vec3;
    ///
    /// let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
    /// assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
    /// ```
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the Euler rotation in degrees.
    pub fn rotation(mut self, degrees: Vec3) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Sets uniform scale on all axes.
    ///
    /// ```
    /// use slabtrace::Transform;
    /// use glam::Vec3;
    ///
    /// let transform = Transform::new().uniform_scale(2.0);
    /// assert_eq!(transform.scale, Vec3::new(2.0, 2.0, 2.0));
    /// ```
    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// `translate · rotate_x · rotate_y · rotate_z · scale`.
    pub fn matrix(&self) -> Mat4 {
        model_matrix(self.position, self.rotation, self.scale)
    }
}

impl ModelTransform for Transform {
    fn current_transform(&self) -> Mat4 {
        self.matrix()
    }
}

/// Local-space geometry of an object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shape {
    /// Cube spanning `[-1, 1]³`.
    #[default]
    Cube,
    /// Square spanning `[-1, 1]²` in the z = 0 plane, facing +Z.
    Quad,
}

const CUBE_CORNERS: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
];

const QUAD_CORNERS: [Vec3; 4] = [
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(-1.0, 1.0, 0.0),
];

impl Shape {
    /// Corner points in local space; their image bounds the shape.
    pub fn corners(&self) -> &'static [Vec3] {
        match self {
            Shape::Cube => &CUBE_CORNERS,
            Shape::Quad => &QUAD_CORNERS,
        }
    }
}

/// A named object in a scene.
///
/// Owns its transform and material. Hit tests borrow the object itself as
/// the transform provider, so they always see the current transform.
///
/// # Example
///
/// ```
/// use slabtrace::{Hittable, SceneObject, Transform};
/// use glam::Vec3;
///
/// let cube = SceneObject::cube("Cube1")
///     .with_transform(Transform::from_position(Vec3::new(-2.0, 0.0, 0.0)));
///
/// assert!(cube.check_hit(Vec3::new(-2.0, 0.0, 5.0), Vec3::NEG_Z).unwrap());
/// assert!(!cube.check_hit(Vec3::new(2.0, 0.0, 5.0), Vec3::NEG_Z).unwrap());
/// ```
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub material: Material,
    pub shape: Shape,
    pub hit_shape: HitShape,
    pub hittable: bool,
    /// Whether [`Scene::advance`](crate::Scene::advance) animates this object.
    pub animated: bool,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            material: Material::default(),
            shape,
            hit_shape: HitShape::default(),
            hittable: true,
            animated: true,
        }
    }

    pub fn cube(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Cube)
    }

    pub fn quad(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Quad)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_hit_shape(mut self, hit_shape: HitShape) -> Self {
        self.hit_shape = hit_shape;
        self
    }

    pub fn hittable(mut self, hittable: bool) -> Self {
        self.hittable = hittable;
        self
    }

    pub fn animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    /// A hit tester borrowing this object as its transform provider.
    pub fn hit(&self) -> Hit<&Self> {
        Hit::new(self, self.hit_shape).hittable(self.hittable)
    }

    /// World-space `(min, max)` of the shape's corners under the current transform.
    pub fn aabb(&self) -> (Vec3, Vec3) {
        let m = self.model_matrix();
        self.shape.corners().iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), &corner| {
                let p = m.transform_point3(corner);
                (min.min(p), max.max(p))
            },
        )
    }
}

impl ModelTransform for SceneObject {
    fn current_transform(&self) -> Mat4 {
        self.model_matrix()
    }
}

impl Hittable for SceneObject {
    fn check_hit(&self, origin: Vec3, direction: Vec3) -> Result<bool> {
        self.hit().check_hit(origin, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_matrix_is_translate_rotate_scale() {
        let t = Transform::new()
            .position(Vec3::new(1.0, 2.0, 3.0))
            .rotation(Vec3::new(10.0, 20.0, 30.0))
            .scale(Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(t.matrix(), model_matrix(t.position, t.rotation, t.scale));
    }

    #[test]
    fn cube_aabb_follows_position_and_scale() {
        let obj = SceneObject::cube("c").with_transform(
            Transform::from_position(Vec3::new(2.0, 0.0, 0.0)).scale(Vec3::new(1.0, 2.0, 0.5)),
        );
        let (min, max) = obj.aabb();
        assert!((min - Vec3::new(1.0, -2.0, -0.5)).length() < 1e-6);
        assert!((max - Vec3::new(3.0, 2.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn rotated_cube_aabb_grows() {
        let obj = SceneObject::cube("c")
            .with_transform(Transform::new().rotation(Vec3::new(0.0, 45.0, 0.0)));
        let (min, max) = obj.aabb();
        let diagonal = 2f32.sqrt();
        assert!((max.x - diagonal).abs() < 1e-5);
        assert!((min.z + diagonal).abs() < 1e-5);
        assert!((max.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn quad_aabb_is_flat() {
        let obj = SceneObject::quad("q").with_transform(Transform::from_position(Vec3::Z));
        let (min, max) = obj.aabb();
        assert_eq!(min.z, 1.0);
        assert_eq!(max.z, 1.0);
    }

    #[test]
    fn object_hit_respects_flags_and_shape() {
        let origin = Vec3::new(0.0, 0.0, 5.0);
        let obj = SceneObject::cube("c");
        assert!(obj.check_hit(origin, Vec3::NEG_Z).unwrap());
        assert!(!obj.clone().hittable(false).check_hit(origin, Vec3::NEG_Z).unwrap());

        let aabb = obj.with_hit_shape(HitShape::Aabb);
        assert_eq!(aabb.hit().shape(), HitShape::Aabb);
        assert!(aabb.check_hit(origin, Vec3::NEG_Z).unwrap());
    }

    #[test]
    fn hit_sees_transform_changes() {
        let mut obj = SceneObject::cube("c");
        let origin = Vec3::new(0.0, 0.0, 5.0);
        assert!(obj.check_hit(origin, Vec3::NEG_Z).unwrap());
        obj.transform.position.x = 4.0;
        assert!(!obj.check_hit(origin, Vec3::NEG_Z).unwrap());
    }
}
