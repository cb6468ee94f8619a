//! Per-instance transforms.
//!
//! Each drawable copy of a model carries a position, rotation and scale.
//! [`Instance::to_raw`] packs those into the matrix form the vertex shader
//! consumes through a second, instance-stepped vertex buffer.

use cgmath::{One, SquareMatrix};

use crate::data_structures::model;

#[derive(Clone, Debug)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transform: origin, no rotation, scale one.
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Identity transform moved to `position`.
    pub fn at<V: Into<cgmath::Vector3<f32>>>(position: V) -> Self {
        Self {
            position: position.into(),
            ..Self::new()
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
            // Rotation only; lighting normals must not pick up translation or
            // non-uniform scale
            normal: cgmath::Matrix3::from(self.rotation).into(),
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance::at(position)
    }
}

/**
 * The raw instance is the data as it lives in GPU memory: a model matrix
 * followed by the normal matrix.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl InstanceRaw {
    pub fn identity() -> Self {
        Self {
            model: cgmath::Matrix4::identity().into(),
            normal: cgmath::Matrix3::identity().into(),
        }
    }
}

impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Advance once per instance, not once per vertex
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // A mat4 occupies four vec4 slots
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // The normal matrix as three vec3 rows
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation3};

    #[test]
    fn default_instance_is_identity() {
        let raw = Instance::new().to_raw();
        assert_eq!(raw.model, InstanceRaw::identity().model);
        assert_eq!(raw.normal, InstanceRaw::identity().normal);
    }

    #[test]
    fn translation_lands_in_the_last_matrix_column() {
        let raw = Instance::at([1.0, 2.0, 3.0]).to_raw();
        assert_eq!(raw.model[3][0], 1.0);
        assert_eq!(raw.model[3][1], 2.0);
        assert_eq!(raw.model[3][2], 3.0);
        assert_eq!(raw.model[3][3], 1.0);
    }

    #[test]
    fn normal_matrix_ignores_translation_and_scale() {
        let mut instance = Instance::at([5.0, 0.0, 0.0]);
        instance.scale = cgmath::Vector3::new(2.0, 2.0, 2.0);
        instance.rotation =
            cgmath::Quaternion::from_axis_angle(cgmath::Vector3::unit_y(), Deg(90.0));
        let raw = instance.to_raw();
        let expected: [[f32; 3]; 3] =
            cgmath::Matrix3::from_angle_y(Deg(90.0)).into();
        for (row, expected_row) in raw.normal.iter().zip(expected.iter()) {
            for (a, b) in row.iter().zip(expected_row.iter()) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }
}
