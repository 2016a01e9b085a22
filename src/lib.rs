//! # slabtrace
//!
//! **Ray casting against boxes, on the CPU or in a compute shader.**
//!
//! A perspective [`Camera`] turns screen coordinates into world-space rays.
//! Each [`SceneObject`] answers hit tests through a [`Hit`] bound to its live
//! transform, either as a world-aligned box or as an oriented unit cube. The
//! [`RayTracer`] shades every pixel as *hit color* or *sky gradient*; the
//! [`RayTracerGpu`] marshals the same scene into flat buffers and runs the
//! equivalent test per pixel on a [`ComputeBackend`].
//!
//! ## Quick Start
//!
//! ```
//! use slabtrace::{RayScene, RenderConfig, Scene};
//!
//! let config = RenderConfig::new().size(64, 48);
//! let mut scene = RayScene::new(Scene::demo(config.aspect()), config)?;
//!
//! let stats = scene.render()?;
//! assert_eq!(stats.pixels(), 64 * 48);
//! assert!(stats.hits > 0);
//! # Ok::<(), slabtrace::TraceError>(())
//! ```
//!
//! ## Layout
//!
//! - **Geometry**: [`math`], [`Ray`], [`Camera`], [`Hit`] / [`Hittable`]
//! - **Scene**: [`Transform`], [`SceneObject`], [`Material`], [`Scene`]
//! - **CPU path**: [`RayTracer`], [`Framebuffer`], [`RayScene`]
//! - **GPU path**: [`FrameData`], [`compute`], [`WgpuCompute`], [`GpuRayScene`]

mod camera;
pub mod compute;
mod config;
mod error;
mod frame_data;
mod gpu;
mod hit;
mod material;
pub mod math;
mod object;
mod ray;
mod raytracer;
mod scene;
mod texture;

pub use camera::{Camera, SkyGradient};
pub use compute::{ComputeBackend, ComputeUniforms, RayTracerGpu, UniformValue};
pub use config::{ERROR_COLOR, ErrorPolicy, RenderConfig};
pub use error::{Result, TraceError};
pub use frame_data::{
    FlatPrimitiveList, FrameData, GpuMaterial, GpuPrimitive, PRIMITIVE_HITTABLE, PRIMITIVE_ORIENTED,
    PrimitiveListHeader, PrimitiveSerializer,
};
pub use gpu::WgpuCompute;
pub use hit::{Hit, HitShape, Hittable, ModelTransform, slab_test};
pub use material::Material;
pub use object::{SceneObject, Shape, Transform};
pub use ray::Ray;
pub use raytracer::{FrameStats, RayTracer, pixel_uv};
pub use scene::{GpuRayScene, OUTPUT_TEXTURE, RayScene, Scene};
pub use texture::{Framebuffer, ImageAccess, ImageBinding, ImageData, Texture, Textures};
