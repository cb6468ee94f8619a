//! Models, meshes and materials.
//!
//! A [`Mesh`] is one drawable geometry batch: a vertex buffer, an index buffer
//! and the [`Material`] it is shaded with. Geometry is validated and uploaded
//! exactly once at construction; afterwards the mesh is immutable and can be
//! drawn any number of times through the [`DrawModel`] trait on a render pass.

use std::ops::Range;

use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::data_structures::texture::Texture;

/// Anything with a static GPU vertex buffer layout.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// The vertex record used by all model geometry.
///
/// Laid out contiguously (`repr(C)`) so a `&[ModelVertex]` can be uploaded
/// verbatim. Attribute slots 0/1/2 sit at byte offsets 0/12/24.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Semantic role of a texture map within a material.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

pub(crate) const TEXTURE_KIND_COUNT: usize = 2;

impl TextureKind {
    /// Shader-facing name stem, numbered per kind: `texture_diffuse1`,
    /// `texture_specular1`, `texture_diffuse2`, ...
    pub fn uniform_stem(&self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
        }
    }

    fn counter_index(&self) -> usize {
        match self {
            TextureKind::Diffuse => 0,
            TextureKind::Specular => 1,
        }
    }
}

/// A texture handle tagged with its semantic kind.
///
/// The handle is reference-like: cloning shares the underlying GPU resource,
/// and a material never disposes textures on behalf of their loader.
#[derive(Clone, Debug)]
pub struct TextureMap {
    pub kind: TextureKind,
    pub texture: Texture,
}

/// One slot of a material's binding plan: which texture unit a map occupies
/// and the shader name it answers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub unit: u32,
    pub uniform: String,
    pub kind: TextureKind,
}

/// Assign texture units and shader names to an ordered list of texture kinds.
///
/// Units are handed out in input order. Each kind keeps its own running
/// counter, so diffuse maps are numbered 1..N and specular maps 1..M
/// independently of each other.
pub fn assign_texture_units(kinds: &[TextureKind]) -> Vec<TextureBinding> {
    let mut counters = [0u32; TEXTURE_KIND_COUNT];
    kinds
        .iter()
        .enumerate()
        .map(|(unit, kind)| {
            let counter = &mut counters[kind.counter_index()];
            *counter += 1;
            TextureBinding {
                unit: unit as u32,
                uniform: format!("{}{}", kind.uniform_stem(), counter),
                kind: *kind,
            }
        })
        .collect()
}

/// Geometry rejected at mesh construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    NoVertices,
    #[error("mesh has no indices")]
    NoIndices,
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Check that the index sequence only references existing vertices.
///
/// Empty vertex or index sequences are rejected as well, since a mesh that
/// can never draw anything is a construction mistake rather than a valid
/// degenerate case.
pub fn validate_geometry(vertices: &[ModelVertex], indices: &[u32]) -> Result<(), MeshError> {
    if vertices.is_empty() {
        return Err(MeshError::NoVertices);
    }
    if indices.is_empty() {
        return Err(MeshError::NoIndices);
    }
    for &index in indices {
        if index as usize >= vertices.len() {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }
    }
    Ok(())
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    shininess: f32,
    // Uniform buffers round up to 16 byte rows
    _padding: [f32; 3],
}

/// Bind group layout matching a binding plan: one texture + sampler pair per
/// plan entry (bindings `2n` and `2n + 1`), followed by the material uniform.
pub fn material_layout(
    device: &wgpu::Device,
    bindings: &[TextureBinding],
) -> wgpu::BindGroupLayout {
    let mut entries = Vec::with_capacity(bindings.len() * 2 + 1);
    for binding in bindings {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: binding.unit * 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: binding.unit * 2 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: bindings.len() as u32 * 2,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("material_bind_group_layout"),
    })
}

/// A material: ordered texture maps plus a shininess exponent, packed into one
/// bind group.
///
/// The binding plan is computed once here and never changes, so every draw of
/// a mesh using this material binds the same units in the same order.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub shininess: f32,
    pub maps: Vec<TextureMap>,
    pub bindings: Vec<TextureBinding>,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    /// Build the bind group for `maps` against `layout`.
    ///
    /// `layout` must describe the same shape as the maps' binding plan; use
    /// [`material_layout`] or, for the common diffuse + specular pair,
    /// `resources::texture::diffuse_specular_layout`.
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        maps: Vec<TextureMap>,
        shininess: f32,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let kinds = maps.iter().map(|m| m.kind).collect::<Vec<_>>();
        let bindings = assign_texture_units(&kinds);

        let uniform = MaterialUniform {
            shininess,
            _padding: [0.0; 3],
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Material Buffer", name)),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let mut entries = Vec::with_capacity(maps.len() * 2 + 1);
        for (map, binding) in maps.iter().zip(&bindings) {
            entries.push(wgpu::BindGroupEntry {
                binding: binding.unit * 2,
                resource: wgpu::BindingResource::TextureView(&map.texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: binding.unit * 2 + 1,
                resource: wgpu::BindingResource::Sampler(&map.texture.sampler),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: maps.len() as u32 * 2,
            resource: buffer.as_entire_binding(),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some(name),
        });

        Self {
            name: name.to_string(),
            shininess,
            maps,
            bindings,
            bind_group,
        }
    }
}

/// One drawable geometry batch.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: Material,
}

impl Mesh {
    /// Validate and upload geometry.
    ///
    /// The input slices are only read; the caller keeps them unchanged. Buffer
    /// contents are fixed for the lifetime of the mesh, there is no re-upload
    /// path. If the adapter rejects the allocation the device error channel
    /// reports it and the context is gone; that case is fatal by design.
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        material: Material,
    ) -> Result<Self, MeshError> {
        validate_geometry(vertices, indices)?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Ok(Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            material,
        })
    }

    /// The immutable binding plan drawn on every `draw_mesh*` call.
    pub fn binding_plan(&self) -> &[TextureBinding] {
        &self.material.bindings
    }
}

/// A model is a list of meshes sharing one source file.
#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
}

/// Drawing of models with the phong pipeline bound.
///
/// Implemented on `wgpu::RenderPass`, so all binding happens against the
/// explicit pass the caller is recording into; nothing leaks into other
/// passes.
pub trait DrawModel<'a> {
    fn draw_mesh(
        &mut self,
        mesh: &'a Mesh,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
    fn draw_model(
        &mut self,
        model: &'a Model,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
    fn draw_model_instanced(
        &mut self,
        model: &'a Model,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(
        &mut self,
        mesh: &'b Mesh,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.draw_mesh_instanced(mesh, 0..1, camera_bind_group, light_bind_group);
    }

    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &mesh.material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        // One indexed draw over the full index range
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model(
        &mut self,
        model: &'b Model,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.draw_model_instanced(model, 0..1, camera_bind_group, light_bind_group);
    }

    fn draw_model_instanced(
        &mut self,
        model: &'b Model,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        for mesh in &model.meshes {
            self.draw_mesh_instanced(
                mesh,
                instances.clone(),
                camera_bind_group,
                light_bind_group,
            );
        }
    }
}

/// Drawing of the untextured light marker geometry with the light pipeline
/// bound (camera at group 0, lights at group 1).
pub trait DrawLight<'a> {
    fn draw_light_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
    fn draw_light_model_instanced(
        &mut self,
        model: &'a Model,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawLight<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_light_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, camera_bind_group, &[]);
        self.set_bind_group(1, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_light_model_instanced(
        &mut self,
        model: &'b Model,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        for mesh in &model.meshes {
            self.draw_light_mesh_instanced(
                mesh,
                instances.clone(),
                camera_bind_group,
                light_bind_group,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::shapes;

    #[test]
    fn units_are_numbered_independently_per_kind() {
        let plan = assign_texture_units(&[
            TextureKind::Diffuse,
            TextureKind::Specular,
            TextureKind::Diffuse,
        ]);
        let summary = plan
            .iter()
            .map(|b| (b.unit, b.uniform.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (0, "texture_diffuse1"),
                (1, "texture_specular1"),
                (2, "texture_diffuse2"),
            ]
        );
    }

    #[test]
    fn unit_assignment_is_deterministic() {
        let kinds = [
            TextureKind::Specular,
            TextureKind::Diffuse,
            TextureKind::Specular,
            TextureKind::Diffuse,
        ];
        assert_eq!(assign_texture_units(&kinds), assign_texture_units(&kinds));
    }

    #[test]
    fn empty_texture_list_has_empty_plan() {
        assert!(assign_texture_units(&[]).is_empty());
    }

    #[test]
    fn rejects_empty_vertices() {
        assert_eq!(
            validate_geometry(&[], &[0]),
            Err(MeshError::NoVertices)
        );
    }

    #[test]
    fn rejects_empty_indices() {
        let (vertices, _) = shapes::unit_quad();
        assert_eq!(
            validate_geometry(&vertices, &[]),
            Err(MeshError::NoIndices)
        );
    }

    #[test]
    fn rejects_index_out_of_range() {
        let (vertices, mut indices) = shapes::unit_quad();
        indices[3] = vertices.len() as u32;
        assert_eq!(
            validate_geometry(&vertices, &indices),
            Err(MeshError::IndexOutOfRange {
                index: vertices.len() as u32,
                vertex_count: vertices.len(),
            })
        );
    }

    #[test]
    fn accepts_the_unit_quad() {
        let (vertices, indices) = shapes::unit_quad();
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(validate_geometry(&vertices, &indices), Ok(()));
    }

    #[test]
    fn validation_leaves_inputs_untouched() {
        let (vertices, indices) = shapes::unit_quad();
        let (vertices_before, indices_before) = (vertices.clone(), indices.clone());
        validate_geometry(&vertices, &indices).unwrap();
        assert_eq!(vertices, vertices_before);
        assert_eq!(indices, indices_before);
    }
}
