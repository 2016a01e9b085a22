//! Render settings for the CPU and GPU paths.

use glam::Vec3;

/// Color written for a pixel whose trace failed under [`ErrorPolicy::Substitute`].
pub const ERROR_COLOR: Vec3 = Vec3::new(255.0, 0.0, 255.0);

/// What [`RayTracer::render_frame`](crate::RayTracer::render_frame) does when a
/// single pixel's trace fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Abort the frame with the first pixel error.
    Propagate,
    /// Paint the pixel with [`ERROR_COLOR`], count it, keep going.
    #[default]
    Substitute,
}

/// Configuration for a ray-traced scene.
///
/// # Example
///
/// ```
/// use slabtrace::{ErrorPolicy, RenderConfig};
///
/// let config = RenderConfig::new()
///     .size(320, 240)
///     .sky([0.0, 0.0, 0.0], [255.0, 255.0, 255.0])
///     .error_policy(ErrorPolicy::Propagate);
/// assert_eq!((config.width, config.height), (320, 240));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Sky color straight up, 0–255.
    pub sky_top: Vec3,
    /// Sky color straight down, 0–255.
    pub sky_bottom: Vec3,
    /// Flat color for any pixel whose ray hits an object, 0–255.
    pub hit_color: Vec3,
    pub error_policy: ErrorPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            sky_top: Vec3::new(16.0, 190.0, 222.0),
            sky_bottom: Vec3::new(181.0, 224.0, 247.0),
            hit_color: Vec3::new(255.0, 0.0, 0.0),
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn sky(mut self, top: impl Into<Vec3>, bottom: impl Into<Vec3>) -> Self {
        self.sky_top = top.into();
        self.sky_bottom = bottom.into();
        self
    }

    pub fn hit_color(mut self, color: impl Into<Vec3>) -> Self {
        self.hit_color = color.into();
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Width over height, as used for the camera aspect.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}
