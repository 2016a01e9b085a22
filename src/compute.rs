//! The boundary between the marshalled frame data and a GPU compute pass.
//!
//! [`ComputeBackend`] is what a graphics API has to provide: named uniforms,
//! storage buffers at fixed bindings, a write-only RGBA32F output image, a
//! dispatch call and a read-back of that image. [`RayTracerGpu`] drives any
//! backend once per frame; [`WgpuCompute`](crate::WgpuCompute) is the bundled
//! implementation.

use crate::camera::Camera;
use crate::error::{Result, TraceError};
use crate::frame_data::FrameData;
use crate::object::SceneObject;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use image::Rgba32FImage;

/// Model matrices, 16 floats per object.
pub const BINDING_MODELS: u32 = 0;
/// Inverse model matrices, 16 floats per object.
pub const BINDING_INVERSE_MODELS: u32 = 1;
/// Materials, `r, g, b, reflectivity` per object.
pub const BINDING_MATERIALS: u32 = 2;
/// Serialized primitive list.
pub const BINDING_PRIMITIVES: u32 = 3;
/// RGBA32F output image, write-only.
pub const BINDING_OUTPUT: u32 = 4;
/// [`ComputeUniforms`] block.
pub const BINDING_UNIFORMS: u32 = 5;

/// Image unit the output texture is bound to.
pub const OUTPUT_IMAGE_UNIT: u32 = 0;

/// Edge length of the square workgroup tile.
pub const WORKGROUP_SIZE: u32 = 16;

pub const UNIFORM_CAMERA_POSITION: &str = "cameraPosition";
pub const UNIFORM_INVERSE_VIEW_MATRIX: &str = "inverseViewMatrix";
pub const UNIFORM_FIELD_OF_VIEW: &str = "fieldOfView";
pub const UNIFORM_ASPECT: &str = "aspect";
pub const UNIFORM_SKY_TOP: &str = "skyTop";
pub const UNIFORM_SKY_BOTTOM: &str = "skyBottom";

/// Workgroup counts covering a `width × height` image with 16×16 tiles.
///
/// ```
/// use slabtrace::compute::dispatch_groups;
///
/// assert_eq!(dispatch_groups(800, 600), [50, 38, 1]);
/// assert_eq!(dispatch_groups(1, 17), [1, 2, 1]);
/// ```
pub fn dispatch_groups(width: u32, height: u32) -> [u32; 3] {
    [width.div_ceil(WORKGROUP_SIZE), height.div_ceil(WORKGROUP_SIZE), 1]
}

/// A value passed to a uniform by name.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec3(Vec3),
    Mat4(Mat4),
}

/// Uniform block matching the WGSL `FrameUniforms` struct (112 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ComputeUniforms {
    pub inverse_view_matrix: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    /// Degrees.
    pub field_of_view: f32,
    /// 0–255.
    pub sky_top: [f32; 3],
    pub aspect: f32,
    /// 0–255.
    pub sky_bottom: [f32; 3],
    pub _padding: f32,
}

impl Default for ComputeUniforms {
    fn default() -> Self {
        Self {
            inverse_view_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            camera_position: [0.0; 3],
            field_of_view: 45.0,
            sky_top: [0.0; 3],
            aspect: 1.0,
            sky_bottom: [0.0; 3],
            _padding: 0.0,
        }
    }
}

impl ComputeUniforms {
    /// Store `value` under `name`. Returns false when no field has that name
    /// and type; the value is then dropped.
    pub fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match (name, value) {
            (UNIFORM_CAMERA_POSITION, UniformValue::Vec3(v)) => self.camera_position = v.to_array(),
            (UNIFORM_INVERSE_VIEW_MATRIX, UniformValue::Mat4(m)) => {
                self.inverse_view_matrix = m.to_cols_array_2d()
            }
            (UNIFORM_FIELD_OF_VIEW, UniformValue::Float(f)) => self.field_of_view = f,
            (UNIFORM_ASPECT, UniformValue::Float(f)) => self.aspect = f,
            (UNIFORM_SKY_TOP, UniformValue::Vec3(v)) => self.sky_top = v.to_array(),
            (UNIFORM_SKY_BOTTOM, UniformValue::Vec3(v)) => self.sky_bottom = v.to_array(),
            _ => {
                log::debug!("Ignoring unknown uniform '{name}' ({value:?})");
                return false;
            }
        }
        true
    }
}

/// What a graphics API must offer to run the ray-tracing compute pass.
pub trait ComputeBackend {
    /// Replace the contents of the storage buffer at `binding`.
    fn upload_storage(&mut self, binding: u32, bytes: &[u8]) -> Result<()>;

    /// Set a uniform by name. Unknown names are ignored.
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// (Re)create the RGBA32F output image.
    fn resize_output(&mut self, width: u32, height: u32) -> Result<()>;

    /// Run the pass with the given workgroup counts and wait for it.
    fn dispatch(&mut self, groups: [u32; 3]) -> Result<()>;

    /// Copy the output image back to the CPU. Row 0 is the row traced with `v = 0`.
    fn read_output(&self) -> Result<Rgba32FImage>;
}

impl<B: ComputeBackend + ?Sized> ComputeBackend for Box<B> {
    fn upload_storage(&mut self, binding: u32, bytes: &[u8]) -> Result<()> {
        (**self).upload_storage(binding, bytes)
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        (**self).set_uniform(name, value)
    }

    fn resize_output(&mut self, width: u32, height: u32) -> Result<()> {
        (**self).resize_output(width, height)
    }

    fn dispatch(&mut self, groups: [u32; 3]) -> Result<()> {
        (**self).dispatch(groups)
    }

    fn read_output(&self) -> Result<Rgba32FImage> {
        (**self).read_output()
    }
}

/// Drives a [`ComputeBackend`]: marshals objects, uploads bindings 0–3,
/// refreshes the camera uniforms and dispatches one 16×16 tile per group.
pub struct RayTracerGpu<B> {
    backend: B,
    frame_data: FrameData,
    width: u32,
    height: u32,
}

impl<B: ComputeBackend> RayTracerGpu<B> {
    pub fn new(mut backend: B, width: u32, height: u32) -> Result<Self> {
        check_size(width, height)?;
        backend.resize_output(width, height)?;
        Ok(Self {
            backend,
            frame_data: FrameData::new(),
            width,
            height,
        })
    }

    /// Replace the default [`FrameData`], e.g. to plug in another primitive serializer.
    pub fn with_frame_data(mut self, frame_data: FrameData) -> Self {
        self.frame_data = frame_data;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn frame_data(&self) -> &FrameData {
        &self.frame_data
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        check_size(width, height)?;
        self.backend.resize_output(width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Marshal `objects` and upload the four storage arrays.
    pub fn upload_frame(&mut self, objects: &[SceneObject]) -> Result<()> {
        self.frame_data.update(objects)?;
        let data = &self.frame_data;
        self.backend.upload_storage(BINDING_MODELS, data.models_bytes())?;
        self.backend
            .upload_storage(BINDING_INVERSE_MODELS, data.inverse_models_bytes())?;
        self.backend.upload_storage(BINDING_MATERIALS, data.materials_bytes())?;
        self.backend.upload_storage(BINDING_PRIMITIVES, data.primitives_bytes())?;
        Ok(())
    }

    /// Refresh the camera uniforms and dispatch. Returns the group counts used.
    pub fn run(&mut self, camera: &Camera) -> Result<[u32; 3]> {
        let sky = camera.sky().ok_or(TraceError::SkyNotConfigured)?;

        self.backend
            .set_uniform(UNIFORM_CAMERA_POSITION, UniformValue::Vec3(camera.position));
        self.backend.set_uniform(
            UNIFORM_INVERSE_VIEW_MATRIX,
            UniformValue::Mat4(camera.inverse_view_matrix()),
        );
        self.backend
            .set_uniform(UNIFORM_FIELD_OF_VIEW, UniformValue::Float(camera.fov));
        self.backend
            .set_uniform(UNIFORM_ASPECT, UniformValue::Float(camera.aspect));
        self.backend.set_uniform(UNIFORM_SKY_TOP, UniformValue::Vec3(sky.top));
        self.backend
            .set_uniform(UNIFORM_SKY_BOTTOM, UniformValue::Vec3(sky.bottom));

        let groups = dispatch_groups(self.width, self.height);
        self.backend.dispatch(groups)?;
        Ok(groups)
    }

    /// [`upload_frame`](Self::upload_frame) followed by [`run`](Self::run).
    pub fn render(&mut self, camera: &Camera, objects: &[SceneObject]) -> Result<[u32; 3]> {
        self.upload_frame(objects)?;
        self.run(camera)
    }

    /// The last dispatched frame, read back from the backend.
    pub fn read_output(&self) -> Result<Rgba32FImage> {
        self.backend.read_output()
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

fn check_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(TraceError::EmptyFramebuffer { width, height });
    }
    Ok(())
}
