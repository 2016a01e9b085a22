//! Perspective camera: view and projection matrices, screen-to-world rays
//! and the sky gradient shown where rays miss.
//!
//! Screen coordinates `(u, v)` run from `(0, 0)` at the bottom-left to
//! `(1, 1)` at the top-right.

use crate::error::{Result, TraceError};
use crate::ray::Ray;
use glam::{Mat4, Vec3};

/// Exponent of the sky gradient's power curve.
const SKY_CURVE: f32 = 1.5;

/// Two-color sky used to shade rays that miss every object.
///
/// Colors are in 0–255 space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyGradient {
    pub top: Vec3,
    pub bottom: Vec3,
}

impl SkyGradient {
    pub fn new(top: impl Into<Vec3>, bottom: impl Into<Vec3>) -> Self {
        Self {
            top: top.into(),
            bottom: bottom.into(),
        }
    }

    /// Color at `height` in `[-1, 1]`: `t = ((height + 1) / 2)^1.5`,
    /// `color = (1 - t)·bottom + t·top`.
    pub fn sample(&self, height: f32) -> Vec3 {
        let t = (0.5 * (height.clamp(-1.0, 1.0) + 1.0)).powf(SKY_CURVE);
        (1.0 - t) * self.bottom + t * self.top
    }
}

/// A perspective look-at camera that generates world-space rays.
///
/// The field of view is vertical and given in degrees. Sky colors start
/// unset; sampling the gradient before [`set_sky_colors`](Self::set_sky_colors)
/// is an error.
///
/// # Example
///
/// ```
/// use slabtrace::Camera;
/// use glam::Vec3;
///
/// let mut camera = Camera::new(
///     Vec3::new(0.0, 0.0, 6.0),
///     Vec3::ZERO,
///     Vec3::Y,
///     45.0,
///     800.0 / 600.0,
///     0.1,
///     100.0,
/// );
/// camera.set_sky_colors([16.0, 190.0, 222.0], [181.0, 224.0, 247.0]);
///
/// let ray = camera.raycast(0.5, 0.5).unwrap();
/// assert!((ray.direction() - Vec3::NEG_Z).length() < 1e-6);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    sky: Option<SkyGradient>,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            target,
            up,
            fov,
            aspect,
            near,
            far,
            sky: None,
        }
    }

    pub fn set_sky_colors(&mut self, top: impl Into<Vec3>, bottom: impl Into<Vec3>) {
        self.sky = Some(SkyGradient::new(top, bottom));
    }

    pub fn sky(&self) -> Option<&SkyGradient> {
        self.sky.as_ref()
    }

    /// Sky color for a ray whose vertical direction component is `height`.
    pub fn sky_gradient(&self, height: f32) -> Result<Vec3> {
        self.sky
            .as_ref()
            .map(|sky| sky.sample(height))
            .ok_or(TraceError::SkyNotConfigured)
    }

    /// OpenGL-style perspective projection from fov/aspect/near/far.
    ///
    /// A fov outside `(0°, 180°)` gives a degenerate matrix.
    pub fn perspective_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    /// Look-at matrix. Undefined when `up` is parallel to `target - position`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Camera-to-world matrix, as consumed by the compute pass.
    pub fn inverse_view_matrix(&self) -> Mat4 {
        self.view_matrix().inverse()
    }

    /// Map normalized screen coordinates `u, v ∈ [0, 1]` to a world-space ray
    /// starting at the camera position.
    pub fn raycast(&self, u: f32, v: f32) -> Result<Ray> {
        let fov_adjustment = (self.fov.to_radians() / 2.0).tan();
        let ndc_x = (2.0 * u - 1.0) * self.aspect * fov_adjustment;
        let ndc_y = (2.0 * v - 1.0) * fov_adjustment;

        let camera_dir = crate::math::normalize_checked(Vec3::new(ndc_x, ndc_y, -1.0))?;
        let world_dir = self.inverse_view_matrix().transform_vector3(camera_dir);

        Ray::new(self.position, world_dir)
    }
}
