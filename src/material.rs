//! Per-object surface color, accepted in either 0–1 or 0–255 range.

use crate::texture::ImageData;

/// Surface appearance handed to the compute pass: a base color and a
/// reflectivity factor.
///
/// The color may be given either in 0–255 or in 0–1 space, per component;
/// see [`Material::normalized_color`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: [f32; 3],
    pub reflectivity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [255.0, 255.0, 255.0],
            reflectivity: 0.0,
        }
    }
}

impl Material {
    pub fn new(color: [f32; 3], reflectivity: f32) -> Self {
        Self {
            color,
            reflectivity,
        }
    }

    /// Takes the color of the albedo image's first pixel.
    ///
    /// An empty image yields the default (white) color.
    pub fn from_albedo(albedo: &ImageData, reflectivity: f32) -> Self {
        let color = albedo
            .first_pixel_rgb()
            .unwrap_or(Self::default().color);
        Self {
            color,
            reflectivity,
        }
    }

    /// Color in 0–1 space. Each component above 1.0 is treated as 0–255 and
    /// divided by 255; components already ≤ 1.0 pass through unchanged.
    ///
    /// ```
    /// use slabtrace::Material;
    ///
    /// let m = Material::new([255.0, 0.0, 128.0], 0.0);
    /// let [r, g, b] = m.normalized_color();
    /// assert_eq!((r, g), (1.0, 0.0));
    /// assert!((b - 0.50196).abs() < 1e-5);
    /// ```
    pub fn normalized_color(&self) -> [f32; 3] {
        self.color.map(normalize_component)
    }
}

#[inline]
fn normalize_component(c: f32) -> f32 {
    if c > 1.0 { c / 255.0 } else { c }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn byte_range_colors_are_scaled() {
        let m = Material::new([255.0, 0.0, 128.0], 0.25);
        let c = m.normalized_color();
        assert_eq!(c[0], 1.0);
        assert_eq!(c[1], 0.0);
        assert!((c[2] - 0.50196).abs() < 1e-5);
    }

    #[test]
    fn unit_range_colors_pass_through() {
        let m = Material::new([0.2, 0.5, 0.9], 0.0);
        assert_eq!(m.normalized_color(), [0.2, 0.5, 0.9]);
    }

    #[test]
    fn exactly_one_is_not_rescaled() {
        let m = Material::new([1.0, 1.5, 1.0], 0.0);
        let c = m.normalized_color();
        assert_eq!(c[0], 1.0);
        assert!((c[1] - 1.5 / 255.0).abs() < 1e-7);
    }

    #[test]
    fn from_albedo_uses_first_pixel() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        img.put_pixel(0, 0, Rgb([200, 100, 50]));
        let m = Material::from_albedo(&ImageData::Rgb8(img), 0.5);
        assert_eq!(m.color, [200.0, 100.0, 50.0]);
        assert_eq!(m.reflectivity, 0.5);
    }
}
