//! CPU-side images: the ray tracer's framebuffer and a registry of named
//! textures that mirrors what is uploaded to the GPU.

use crate::error::{Result, TraceError};
use glam::Vec3;
use image::{Rgb, RgbImage, Rgba32FImage};
use std::collections::HashMap;

/// Pixel storage for a texture.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageData {
    /// 3 channels, 8 bits each.
    Rgb8(RgbImage),
    /// 4 channels, 32-bit float each (compute output target).
    Rgba32F(Rgba32FImage),
}

impl ImageData {
    /// An RGB8 image filled with `color`.
    pub fn rgb8(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self::Rgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    /// A zeroed RGBA32F image.
    pub fn rgba32f(width: u32, height: u32) -> Self {
        Self::Rgba32F(Rgba32FImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        match self {
            ImageData::Rgb8(img) => img.width(),
            ImageData::Rgba32F(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            ImageData::Rgb8(img) => img.height(),
            ImageData::Rgba32F(img) => img.height(),
        }
    }

    pub fn channels(&self) -> u32 {
        match self {
            ImageData::Rgb8(_) => 3,
            ImageData::Rgba32F(_) => 4,
        }
    }

    /// Raw bytes, rows top to bottom, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ImageData::Rgb8(img) => img.as_raw(),
            ImageData::Rgba32F(img) => bytemuck::cast_slice(img.as_raw()),
        }
    }

    /// RGB of pixel (0, 0) in the image's own value range.
    pub fn first_pixel_rgb(&self) -> Option<[f32; 3]> {
        if self.width() == 0 || self.height() == 0 {
            return None;
        }
        Some(match self {
            ImageData::Rgb8(img) => img.get_pixel(0, 0).0.map(f32::from),
            ImageData::Rgba32F(img) => {
                let [r, g, b, _] = img.get_pixel(0, 0).0;
                [r, g, b]
            }
        })
    }
}

/// A named texture.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub data: ImageData,
}

impl Texture {
    pub fn new(name: impl Into<String>, data: ImageData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.data.width()
    }

    pub fn height(&self) -> u32 {
        self.data.height()
    }
}

/// Shader access mode of an image-unit binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl ImageAccess {
    /// Whether a shader may store to an image bound with this access.
    pub fn allows_write(self) -> bool {
        matches!(self, ImageAccess::WriteOnly | ImageAccess::ReadWrite)
    }
}

impl From<ImageAccess> for wgpu::StorageTextureAccess {
    fn from(access: ImageAccess) -> Self {
        match access {
            ImageAccess::ReadOnly => wgpu::StorageTextureAccess::ReadOnly,
            ImageAccess::WriteOnly => wgpu::StorageTextureAccess::WriteOnly,
            ImageAccess::ReadWrite => wgpu::StorageTextureAccess::ReadWrite,
        }
    }
}

/// A texture bound to an image unit for compute access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBinding {
    pub name: String,
    pub unit: u32,
    pub access: ImageAccess,
}

/// Textures registered by name.
///
/// Looking up a name that was never registered fails with
/// [`TraceError::TextureNotFound`].
#[derive(Debug, Default)]
pub struct Textures {
    textures: HashMap<String, Texture>,
    bindings: HashMap<u32, ImageBinding>,
}

impl Textures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture, replacing any texture with the same name.
    pub fn insert(&mut self, texture: Texture) {
        log::debug!(
            "Registered texture '{}' ({}x{}, {} channels)",
            texture.name,
            texture.width(),
            texture.height(),
            texture.data.channels()
        );
        self.textures.insert(texture.name.clone(), texture);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&Texture> {
        self.textures.get(name).ok_or_else(|| not_found(name))
    }

    /// Replace the pixel data of a registered texture.
    pub fn update(&mut self, name: &str, data: ImageData) -> Result<()> {
        let texture = self.textures.get_mut(name).ok_or_else(|| not_found(name))?;
        texture.data = data;
        Ok(())
    }

    /// Bind a registered texture to an image unit, replacing the unit's
    /// previous binding.
    pub fn bind_to_image(&mut self, name: &str, unit: u32, access: ImageAccess) -> Result<&ImageBinding> {
        if !self.textures.contains_key(name) {
            return Err(not_found(name));
        }
        let binding = ImageBinding {
            name: name.to_string(),
            unit,
            access,
        };
        self.bindings.insert(unit, binding);
        Ok(&self.bindings[&unit])
    }

    pub fn image_binding(&self, unit: u32) -> Option<&ImageBinding> {
        self.bindings.get(&unit)
    }
}

fn not_found(name: &str) -> TraceError {
    TraceError::TextureNotFound {
        name: name.to_string(),
    }
}

/// The CPU ray tracer's output: a 3-channel, 8-bit image indexed
/// `[row][col][channel]`, mutated in place pixel by pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    image: RgbImage,
}

impl Framebuffer {
    /// A black framebuffer. Both dimensions must be non-zero.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TraceError::EmptyFramebuffer { width, height });
        }
        Ok(Self {
            image: RgbImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Write a color given in 0–255 space. Components are clamped and truncated.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Vec3) {
        let c = color.clamp(Vec3::ZERO, Vec3::splat(255.0));
        self.image.put_pixel(x, y, Rgb([c.x as u8, c.y as u8, c.z as u8]));
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }

    /// Row-major bytes: `((row * width) + col) * 3 + channel`.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Copy into texture storage for upload.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::Rgb8(self.image.clone())
    }
}
