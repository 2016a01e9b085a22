//! Per-frame marshalling of scene objects into flat GPU buffers.
//!
//! Every array is indexed by object slot: row `i` of the model, inverse-model,
//! material and primitive arrays all describe `objects[i]`. The arrays are
//! reused between frames, so a slice borrowed from one frame is overwritten
//! by the next [`FrameData::update`].

use crate::error::Result;
use crate::hit::HitShape;
use crate::math::inverse_checked;
use crate::object::SceneObject;
use bytemuck::{Pod, Zeroable};

/// Material record as read by the compute shader (`vec4<f32>`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    /// Color in 0–1.
    pub color: [f32; 3],
    pub reflectivity: f32,
}

/// `GpuPrimitive::flags` bit: the object takes part in hit testing.
pub const PRIMITIVE_HITTABLE: u32 = 1 << 0;
/// `GpuPrimitive::flags` bit: the object is tested as an oriented box.
pub const PRIMITIVE_ORIENTED: u32 = 1 << 1;

/// World-space AABB of one object plus the flags the shader needs.
///
/// Layout matches the WGSL `Primitive` struct (32 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuPrimitive {
    pub min: [f32; 3],
    pub flags: u32,
    pub max: [f32; 3],
    /// Slot of the object in the per-frame arrays.
    pub object: u32,
}

impl GpuPrimitive {
    pub fn is_hittable(&self) -> bool {
        self.flags & PRIMITIVE_HITTABLE != 0
    }

    pub fn is_oriented(&self) -> bool {
        self.flags & PRIMITIVE_ORIENTED != 0
    }
}

/// Turns the primitive list into the opaque bytes bound at
/// [`BINDING_PRIMITIVES`](crate::compute::BINDING_PRIMITIVES).
///
/// A BVH builder plugs in here; the shader bundled with this crate reads the
/// [`FlatPrimitiveList`] layout.
pub trait PrimitiveSerializer {
    /// Replace the contents of `out` with the serialized primitives.
    fn serialize(&self, primitives: &[GpuPrimitive], out: &mut Vec<u8>);
}

/// Header of a [`FlatPrimitiveList`] buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PrimitiveListHeader {
    pub count: u32,
    pub _padding: [u32; 3],
}

/// A 16-byte header followed by the primitives in object order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatPrimitiveList;

impl PrimitiveSerializer for FlatPrimitiveList {
    fn serialize(&self, primitives: &[GpuPrimitive], out: &mut Vec<u8>) {
        let header = PrimitiveListHeader {
            count: primitives.len() as u32,
            _padding: [0; 3],
        };
        out.clear();
        out.extend_from_slice(bytemuck::bytes_of(&header));
        out.extend_from_slice(bytemuck::cast_slice(primitives));
    }
}

/// Flat per-object arrays for the compute pass.
pub struct FrameData {
    models: Vec<[f32; 16]>,
    inverse_models: Vec<[f32; 16]>,
    materials: Vec<GpuMaterial>,
    primitives: Vec<GpuPrimitive>,
    serialized: Vec<u8>,
    serializer: Box<dyn PrimitiveSerializer>,
}

impl Default for FrameData {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameData {
    /// Empty arrays using the [`FlatPrimitiveList`] layout.
    pub fn new() -> Self {
        Self::with_serializer(Box::new(FlatPrimitiveList))
    }

    pub fn with_serializer(serializer: Box<dyn PrimitiveSerializer>) -> Self {
        Self {
            models: Vec::new(),
            inverse_models: Vec::new(),
            materials: Vec::new(),
            primitives: Vec::new(),
            serialized: Vec::new(),
            serializer,
        }
    }

    /// Re-marshal every object in iteration order.
    ///
    /// Fails with [`TraceError::SingularTransform`](crate::TraceError::SingularTransform)
    /// if any model matrix has no inverse; the arrays are then left partially
    /// written and must not be uploaded.
    pub fn update(&mut self, objects: &[SceneObject]) -> Result<()> {
        self.models.clear();
        self.inverse_models.clear();
        self.materials.clear();
        self.primitives.clear();

        for (i, object) in objects.iter().enumerate() {
            let model = object.model_matrix();
            let inverse = inverse_checked(model)?;
            let (min, max) = object.aabb();

            let mut flags = 0;
            if object.hittable {
                flags |= PRIMITIVE_HITTABLE;
            }
            if object.hit_shape == HitShape::Obb {
                flags |= PRIMITIVE_ORIENTED;
            }

            self.primitives.push(GpuPrimitive {
                min: min.to_array(),
                flags,
                max: max.to_array(),
                object: i as u32,
            });
            self.models.push(model.to_cols_array());
            self.inverse_models.push(inverse.to_cols_array());
            self.materials.push(GpuMaterial {
                color: object.material.normalized_color(),
                reflectivity: object.material.reflectivity,
            });
        }

        self.serializer.serialize(&self.primitives, &mut self.serialized);
        log::debug!(
            "Marshalled {} objects ({} primitive bytes)",
            objects.len(),
            self.serialized.len()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[[f32; 16]] {
        &self.models
    }

    pub fn inverse_models(&self) -> &[[f32; 16]] {
        &self.inverse_models
    }

    pub fn materials(&self) -> &[GpuMaterial] {
        &self.materials
    }

    pub fn primitives(&self) -> &[GpuPrimitive] {
        &self.primitives
    }

    pub fn models_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.models)
    }

    pub fn inverse_models_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.inverse_models)
    }

    pub fn materials_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.materials)
    }

    /// Output of the primitive serializer.
    pub fn primitives_bytes(&self) -> &[u8] {
        &self.serialized
    }
}
