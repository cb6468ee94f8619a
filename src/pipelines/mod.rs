//! Render pipeline definitions.
//!
//! - `phong` is the main instanced pipeline shading with the multi-light
//!   phong model
//! - `light` holds the light caster data model and the marker-cube pipeline

pub mod light;
pub mod phong;

/// All pipelines the context owns, created once at startup.
#[derive(Debug)]
pub struct Pipelines {
    pub phong: wgpu::RenderPipeline,
    pub light: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            phong: phong::mk_phong_pipeline(
                device,
                config,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
            light: light::mk_light_pipeline(
                device,
                config,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
        }
    }
}
