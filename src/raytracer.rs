//! Reference CPU ray tracer.
//!
//! Shading is a two-way choice: a ray that hits any object gets the flat hit
//! color, a ray that hits nothing gets the camera's sky gradient. Objects are
//! tested in slice order and the first one that reports a hit wins; there is
//! no depth comparison between several hits.

use crate::camera::Camera;
use crate::config::{ERROR_COLOR, ErrorPolicy, RenderConfig};
use crate::error::Result;
use crate::hit::Hittable;
use crate::ray::Ray;
use crate::texture::Framebuffer;
use glam::Vec3;

/// Per-frame counters returned by [`RayTracer::render_frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub hits: u32,
    pub misses: u32,
    /// Pixels painted with [`ERROR_COLOR`] because their trace failed.
    pub failed: u32,
}

impl FrameStats {
    pub fn pixels(&self) -> u32 {
        self.hits + self.misses + self.failed
    }
}

/// Normalized screen coordinates of pixel `(x, y)`.
///
/// `u = x / (width - 1)` and `v = y / (height - 1)`; a dimension of 1 maps to
/// the constant `0.0`.
#[inline]
pub fn pixel_uv(x: u32, y: u32, width: u32, height: u32) -> (f32, f32) {
    (axis_coord(x, width), axis_coord(y, height))
}

#[inline]
fn axis_coord(i: u32, extent: u32) -> f32 {
    if extent > 1 {
        i as f32 / (extent - 1) as f32
    } else {
        0.0
    }
}

/// CPU ray tracer owning its framebuffer.
#[derive(Debug)]
pub struct RayTracer {
    framebuffer: Framebuffer,
    hit_color: Vec3,
    error_policy: ErrorPolicy,
}

impl RayTracer {
    pub fn new(config: &RenderConfig) -> Result<Self> {
        Ok(Self {
            framebuffer: Framebuffer::new(config.width, config.height)?,
            hit_color: config.hit_color,
            error_policy: config.error_policy,
        })
    }

    pub fn width(&self) -> u32 {
        self.framebuffer.width()
    }

    pub fn height(&self) -> u32 {
        self.framebuffer.height()
    }

    pub fn hit_color(&self) -> Vec3 {
        self.hit_color
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Index of the first object in `objects` hit by `ray`.
    pub fn first_hit<H: Hittable>(&self, ray: &Ray, objects: &[H]) -> Result<Option<usize>> {
        for (i, object) in objects.iter().enumerate() {
            if object.check_hit(ray.origin(), ray.direction())? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Color for a single ray, in 0–255 space.
    pub fn trace_ray<H: Hittable>(&self, camera: &Camera, ray: &Ray, objects: &[H]) -> Result<Vec3> {
        match self.first_hit(ray, objects)? {
            Some(_) => Ok(self.hit_color),
            None => camera.sky_gradient(ray.direction().y),
        }
    }

    /// Render every pixel in row-major order, overwriting the whole framebuffer.
    pub fn render_frame<H: Hittable>(&mut self, camera: &Camera, objects: &[H]) -> Result<FrameStats> {
        let (width, height) = (self.width(), self.height());
        let mut stats = FrameStats::default();

        for y in 0..height {
            for x in 0..width {
                let (u, v) = pixel_uv(x, y, width, height);
                let color = match self.shade_pixel(camera, u, v, objects) {
                    Ok((color, hit)) => {
                        if hit {
                            stats.hits += 1;
                        } else {
                            stats.misses += 1;
                        }
                        color
                    }
                    Err(err) => match self.error_policy {
                        ErrorPolicy::Propagate => return Err(err),
                        ErrorPolicy::Substitute => {
                            log::warn!("Pixel ({x}, {y}) failed to trace: {err}");
                            stats.failed += 1;
                            ERROR_COLOR
                        }
                    },
                };
                self.framebuffer.set_pixel(x, y, color);
            }
        }

        log::debug!(
            "Rendered {width}x{height} frame: {} hits, {} misses, {} failed",
            stats.hits,
            stats.misses,
            stats.failed
        );
        Ok(stats)
    }

    fn shade_pixel<H: Hittable>(&self, camera: &Camera, u: f32, v: f32, objects: &[H]) -> Result<(Vec3, bool)> {
        let ray = camera.raycast(u, v)?;
        match self.first_hit(&ray, objects)? {
            Some(_) => Ok((self.hit_color, true)),
            None => Ok((camera.sky_gradient(ray.direction().y)?, false)),
        }
    }
}
