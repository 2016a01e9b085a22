//! Headless wgpu implementation of [`ComputeBackend`].
//!
//! [`WgpuCompute`] owns its own device and queue (no window or surface), the
//! ray-tracing compute pipeline built from `shaders/raytrace.wgsl`, the four
//! storage buffers, the uniform block and the RGBA32F output texture.
//!
//! # Example
//!
//! ```no_run
//! use slabtrace::{Camera, ComputeBackend, RayTracerGpu, SceneObject, WgpuCompute};
//! use glam::Vec3;
//!
//! let mut camera = Camera::new(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, Vec3::Y, 45.0, 1.0, 0.1, 100.0);
//! camera.set_sky_colors([16.0, 190.0, 222.0], [181.0, 224.0, 247.0]);
//!
//! let backend = WgpuCompute::new()?;
//! let mut tracer = RayTracerGpu::new(backend, 64, 64)?;
//! tracer.render(&camera, &[SceneObject::cube("Cube")])?;
//! let image = tracer.backend().read_output()?;
//! # Ok::<(), slabtrace::TraceError>(())
//! ```

use crate::compute::{
    BINDING_INVERSE_MODELS, BINDING_MATERIALS, BINDING_MODELS, BINDING_OUTPUT, BINDING_PRIMITIVES,
    BINDING_UNIFORMS, ComputeBackend, ComputeUniforms, UniformValue,
};
use crate::error::{Result, TraceError};
use crate::texture::ImageAccess;
use image::Rgba32FImage;
use std::sync::mpsc;
use wgpu::util::DeviceExt;

const RAYTRACE_WGSL: &str = include_str!("shaders/raytrace.wgsl");

/// Bytes per RGBA32F texel.
const OUTPUT_TEXEL_SIZE: u32 = 16;

/// Rejects output sizes the device cannot allocate as a 2D texture.
fn check_output_size(width: u32, height: u32, max_dimension: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(TraceError::EmptyFramebuffer { width, height });
    }
    if width > max_dimension || height > max_dimension {
        return Err(TraceError::Gpu(format!(
            "output size {width}x{height} exceeds the device limit of {max_dimension} per side"
        )));
    }
    Ok(())
}

/// Row stride of the read-back buffer and its total size in bytes.
fn readback_layout(width: u32, height: u32) -> Result<(u32, u64)> {
    let padded_row = width
        .checked_mul(OUTPUT_TEXEL_SIZE)
        .and_then(|row| row.checked_next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT))
        .ok_or_else(|| TraceError::Gpu(format!("output width {width} is too large to read back")))?;
    Ok((padded_row, u64::from(padded_row) * u64::from(height)))
}

/// Storage buffers are padded to hold at least one element of the largest
/// runtime array (`mat4x4<f32>`).
const MIN_STORAGE_SIZE: usize = 64;

/// Output texture and its storage view.
struct OutputTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Compute backend running `raytrace.wgsl` on a wgpu device.
pub struct WgpuCompute {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    storage: [Option<wgpu::Buffer>; 4],
    uniforms: ComputeUniforms,
    uniform_buffer: wgpu::Buffer,
    output: Option<OutputTarget>,
}

impl WgpuCompute {
    /// Request an adapter and device without a surface and build the pipeline.
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| TraceError::Gpu(format!("no suitable adapter: {e}")))?;

        log::info!("Using GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("slabtrace_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(|e| TraceError::Gpu(format!("device request failed: {e}")))?;

        Ok(Self::from_device(device, queue))
    }

    /// Build the pipeline on an existing device.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("raytrace_shader"),
            source: wgpu::ShaderSource::Wgsl(RAYTRACE_WGSL.into()),
        });

        let storage_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("raytrace_bind_group_layout"),
            entries: &[
                storage_entry(BINDING_MODELS),
                storage_entry(BINDING_INVERSE_MODELS),
                storage_entry(BINDING_MATERIALS),
                storage_entry(BINDING_PRIMITIVES),
                wgpu::BindGroupLayoutEntry {
                    binding: BINDING_OUTPUT,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: ImageAccess::WriteOnly.into(),
                        format: wgpu::TextureFormat::Rgba32Float,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: BINDING_UNIFORMS,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("raytrace_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("raytrace_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("raytrace_uniforms"),
            size: std::mem::size_of::<ComputeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            storage: [None, None, None, None],
            uniforms: ComputeUniforms::default(),
            uniform_buffer,
            output: None,
        }
    }

    /// Current uniform values, as written before the next dispatch.
    pub fn uniforms(&self) -> &ComputeUniforms {
        &self.uniforms
    }

    /// Output dimensions, if an output texture exists.
    pub fn output_size(&self) -> Option<(u32, u32)> {
        self.output.as_ref().map(|o| (o.width, o.height))
    }

    fn wait(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| TraceError::Gpu(format!("device poll failed: {e}")))
    }

    fn create_output(&self, width: u32, height: u32) -> OutputTarget {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("raytrace_output"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        OutputTarget {
            texture,
            view,
            width,
            height,
        }
    }
}

impl ComputeBackend for WgpuCompute {
    fn upload_storage(&mut self, binding: u32, bytes: &[u8]) -> Result<()> {
        let slot = self
            .storage
            .get_mut(binding as usize)
            .ok_or_else(|| TraceError::Gpu(format!("binding {binding} is not a storage buffer")))?;

        let mut padded = Vec::new();
        let contents = if bytes.len() < MIN_STORAGE_SIZE {
            padded.resize(MIN_STORAGE_SIZE, 0u8);
            padded[..bytes.len()].copy_from_slice(bytes);
            &padded[..]
        } else {
            bytes
        };
        *slot = Some(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("raytrace_storage"),
            contents,
            usage: wgpu::BufferUsages::STORAGE,
        }));
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.uniforms.set(name, value);
    }

    fn resize_output(&mut self, width: u32, height: u32) -> Result<()> {
        check_output_size(width, height, self.device.limits().max_texture_dimension_2d)?;
        if self.output_size() == Some((width, height)) {
            return Ok(());
        }
        self.output = Some(self.create_output(width, height));
        log::debug!("Compute output resized to {width}x{height}");
        Ok(())
    }

    fn dispatch(&mut self, groups: [u32; 3]) -> Result<()> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| TraceError::Gpu("output texture has not been created".into()))?;
        let [Some(models), Some(inverses), Some(materials), Some(primitives)] = &self.storage else {
            return Err(TraceError::Gpu("frame data has not been uploaded".into()));
        };

        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("raytrace_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: BINDING_MODELS,
                    resource: models.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: BINDING_INVERSE_MODELS,
                    resource: inverses.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: BINDING_MATERIALS,
                    resource: materials.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: BINDING_PRIMITIVES,
                    resource: primitives.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: BINDING_OUTPUT,
                    resource: wgpu::BindingResource::TextureView(&output.view),
                },
                wgpu::BindGroupEntry {
                    binding: BINDING_UNIFORMS,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("raytrace_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("raytrace_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        }
        self.queue.submit(Some(encoder.finish()));
        self.wait()
    }

    fn read_output(&self) -> Result<Rgba32FImage> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| TraceError::Gpu("output texture has not been created".into()))?;

        let unpadded_row = output.width as usize * OUTPUT_TEXEL_SIZE as usize;
        let (padded_row, size) = readback_layout(output.width, output.height)?;

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("raytrace_readback"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("raytrace_readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &output.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(output.height),
                },
            },
            wgpu::Extent3d {
                width: output.width,
                height: output.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.wait()?;
        rx.recv()
            .map_err(|e| TraceError::Gpu(format!("readback callback dropped: {e}")))?
            .map_err(|e| TraceError::Gpu(format!("readback mapping failed: {e}")))?;

        let mut texels = Vec::with_capacity(output.width as usize * output.height as usize * 4);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(padded_row as usize) {
                texels.extend_from_slice(bytemuck::cast_slice::<u8, f32>(&row[..unpadded_row]));
            }
        }
        readback.unmap();

        Rgba32FImage::from_raw(output.width, output.height, texels)
            .ok_or_else(|| TraceError::Gpu("readback size does not match the output texture".into()))
    }
}
