//! Texture and material loading.

use std::io::{BufReader, Cursor};

use crate::data_structures::{
    model::{Material, TextureKind, TextureMap, assign_texture_units, material_layout},
    texture::Texture,
};

/// Fallback shininess when the .mtl file doesn't specify an exponent.
pub const DEFAULT_SHININESS: f32 = 32.0;

/// Bind group layout for the standard material shape: one diffuse map, one
/// specular map, then the material parameters. This is the layout the phong
/// pipeline is built against.
pub fn diffuse_specular_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let plan = assign_texture_units(&[TextureKind::Diffuse, TextureKind::Specular]);
    material_layout(device, &plan)
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> reqwest::Url {
    let window = web_sys::window().unwrap();
    let location = window.location();
    let mut origin = location.origin().unwrap();
    if !origin.ends_with("assets") {
        origin = format!("{}/assets", origin);
    }
    let base = reqwest::Url::parse(&format!("{}/", origin,)).unwrap();
    base.join(file_name).unwrap()
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name);
        reqwest::get(url).await?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        std::fs::read_to_string(path)?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name);
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        std::fs::read(path)?
    };

    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_bytes(device, queue, &data, file_name, format)
}

/// The standard material map pair: image files where the .mtl names them,
/// solid 1x1 fallbacks where it doesn't.
pub async fn load_material_maps(
    material: &tobj::Material,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Vec<TextureMap>> {
    let diffuse = match &material.diffuse_texture {
        Some(file) => load_texture(file, device, queue, None).await?,
        None => Texture::create_solid_color([255, 255, 255, 255], device, queue, "default diffuse"),
    };
    let specular = match &material.specular_texture {
        Some(file) => load_texture(file, device, queue, None).await?,
        None => Texture::create_solid_color([0, 0, 0, 255], device, queue, "default specular"),
    };
    Ok(vec![
        TextureMap {
            kind: TextureKind::Diffuse,
            texture: diffuse,
        },
        TextureMap {
            kind: TextureKind::Specular,
            texture: specular,
        },
    ])
}

/// Parse an .obj (plus its .mtl files) and build a GPU material per .mtl
/// entry. The raw tobj models are returned alongside for the geometry pass.
pub async fn load_materials(
    file_name: &str,
    queue: &wgpu::Queue,
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<(Vec<tobj::Model>, Vec<Material>)> {
    let obj_text: String = load_string(file_name).await?;
    let obj_cursor = Cursor::new(obj_text);
    let mut obj_reader = BufReader::new(obj_cursor);

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            let mat_text = match load_string(&p).await {
                Ok(text) => text,
                Err(e) => {
                    log::error!("material file {p} could not be read: {e}");
                    return Err(tobj::LoadError::OpenFileFailed);
                }
            };
            tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text)))
        },
    )
    .await?;

    let mut materials = Vec::new();
    for m in obj_materials? {
        let maps = load_material_maps(&m, device, queue).await?;
        let shininess = m.shininess.unwrap_or(DEFAULT_SHININESS);
        materials.push(Material::new(device, &m.name, maps, shininess, layout));
    }
    Ok((models, materials))
}
