use crate::data_structures::{
    model::{Material, Model, TextureKind, TextureMap},
    texture::Texture,
};

/**
 * This module contains all logic for loading meshes and textures from
 * external files under `assets/`.
 */
pub mod mesh;
pub mod texture;

pub use texture::diffuse_specular_layout;

/// The material used when geometry arrives without any .mtl entry: plain
/// white diffuse, no specular highlights.
pub fn default_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Material {
    let maps = vec![
        TextureMap {
            kind: TextureKind::Diffuse,
            texture: Texture::create_solid_color([255, 255, 255, 255], device, queue, "default diffuse"),
        },
        TextureMap {
            kind: TextureKind::Specular,
            texture: Texture::create_solid_color([0, 0, 0, 255], device, queue, "default specular"),
        },
    ];
    Material::new(device, "default", maps, texture::DEFAULT_SHININESS, layout)
}

/// Load an .obj file (with its .mtl materials) into a drawable [`Model`].
///
/// Meshes with broken geometry are skipped with a warning rather than
/// failing the whole file; a file without a single drawable mesh is an
/// error.
pub async fn load_model_obj(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Model> {
    let layout = diffuse_specular_layout(device);

    let (models, materials) = texture::load_materials(file_name, queue, device, &layout).await?;
    let fallback = default_material(device, queue, &layout);
    let meshes = mesh::load_meshes(&models, &materials, &fallback, file_name, device);
    let meshes = meshes
        .into_iter()
        .enumerate()
        .filter_map(|(idx, result)| match result {
            Ok(mesh) => Some(mesh),
            Err(e) => {
                log::warn!("Mesh at index {} in file {} was skipped: {}", idx, file_name, e);
                None
            }
        })
        .collect::<Vec<_>>();

    if meshes.is_empty() {
        anyhow::bail!("no drawable meshes in {file_name}");
    }
    Ok(Model { meshes })
}
