//! Vertex layouts for the per-instance model and normal matrices.

use std::mem::size_of;

use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

use crate::engine_state::instancing::{InstanceModel, InstanceNormal};

/// Number of shader locations taken by one instance: four model matrix columns
/// followed by three normal matrix columns.
pub const INSTANCE_LOCATIONS: u32 = 7;

/// Attribute layout of the two instance buffers of a block type.
///
/// A pipeline reads the model matrix from the buffer bound at the first slot
/// and the normal matrix from the next one, both advancing once per instance.
///
/// # Shader Attributes
/// - `location = first .. first + 3`: model matrix columns (`vec4<f32>`)
/// - `location = first + 4 .. first + 6`: normal matrix columns (`vec3<f32>`)
pub struct InstanceLayout {
    model_attributes: [VertexAttribute; 4],
    normal_attributes: [VertexAttribute; 3],
}

impl InstanceLayout {
    /// Lays out the instance attributes starting at shader location `first_location`.
    pub fn new(first_location: u32) -> Self {
        let model_attributes = std::array::from_fn(|column| VertexAttribute {
            offset: (column * size_of::<[f32; 4]>()) as BufferAddress,
            shader_location: first_location + column as u32,
            format: VertexFormat::Float32x4,
        });
        let normal_attributes = std::array::from_fn(|column| VertexAttribute {
            offset: (column * size_of::<[f32; 3]>()) as BufferAddress,
            shader_location: first_location + 4 + column as u32,
            format: VertexFormat::Float32x3,
        });
        Self {
            model_attributes,
            normal_attributes,
        }
    }

    pub fn model(&self) -> VertexBufferLayout<'_> {
        VertexBufferLayout {
            array_stride: size_of::<InstanceModel>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: &self.model_attributes,
        }
    }

    pub fn normal(&self) -> VertexBufferLayout<'_> {
        VertexBufferLayout {
            array_stride: size_of::<InstanceNormal>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: &self.normal_attributes,
        }
    }

    /// Both layouts, in binding order.
    pub fn buffers(&self) -> [VertexBufferLayout<'_>; 2] {
        [self.model(), self.normal()]
    }
}
