//! Light casters and their GPU resources.
//!
//! Three caster families feed the phong pipeline: one directional light, up
//! to [`MAX_POINT_LIGHTS`] attenuated point lights and an optional spot
//! light with soft cutoff edges. All of them are packed into a single
//! uniform block ([`LightsUniform`]) bound at group 2 of the phong pipeline
//! and group 1 of the light-marker pipeline.

use cgmath::{Deg, InnerSpace, Rad, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::model::{Model, ModelVertex, Vertex};
use crate::data_structures::texture;

/// Size of the point light array in the uniform block.
pub const MAX_POINT_LIGHTS: usize = 4;

/// Distance based intensity falloff: `1 / (c + l*d + q*d^2)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

/// The classic range to coefficient table; `for_range` picks the nearest
/// covering row.
const ATTENUATION_TABLE: [(f32, f32, f32); 12] = [
    (7.0, 0.7, 1.8),
    (13.0, 0.35, 0.44),
    (20.0, 0.22, 0.20),
    (32.0, 0.14, 0.07),
    (50.0, 0.09, 0.032),
    (65.0, 0.07, 0.017),
    (100.0, 0.045, 0.0075),
    (160.0, 0.027, 0.0028),
    (200.0, 0.022, 0.0019),
    (325.0, 0.014, 0.0007),
    (600.0, 0.007, 0.0002),
    (3250.0, 0.0014, 0.000007),
];

impl Attenuation {
    /// Coefficients for a light meant to reach roughly `range` units.
    pub fn for_range(range: f32) -> Self {
        let (_, linear, quadratic) = ATTENUATION_TABLE
            .iter()
            .find(|(distance, _, _)| range <= *distance)
            .copied()
            .unwrap_or(ATTENUATION_TABLE[ATTENUATION_TABLE.len() - 1]);
        Self {
            constant: 1.0,
            linear,
            quadratic,
        }
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        // The 50 unit row, a sane default for room sized scenes
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

/// A light infinitely far away; only its direction matters.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub direction: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vector3::new(-0.2, -1.0, -0.3),
            ambient: Vector3::new(0.05, 0.05, 0.05),
            diffuse: Vector3::new(0.4, 0.4, 0.4),
            specular: Vector3::new(0.5, 0.5, 0.5),
        }
    }
}

/// A bulb-like light radiating from a position, fading with distance.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub attenuation: Attenuation,
}

impl PointLight {
    pub fn white_at<V: Into<Vector3<f32>>>(position: V) -> Self {
        Self {
            position: position.into(),
            ambient: Vector3::new(0.05, 0.05, 0.05),
            diffuse: Vector3::new(0.8, 0.8, 0.8),
            specular: Vector3::new(1.0, 1.0, 1.0),
            attenuation: Attenuation::default(),
        }
    }
}

/// A cone of light; fragments between the inner and outer cutoff angles get
/// a smooth falloff instead of a hard edge.
#[derive(Debug, Clone)]
pub struct SpotLight {
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub cut_off: Rad<f32>,
    pub outer_cut_off: Rad<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub attenuation: Attenuation,
}

impl SpotLight {
    /// A flashlight: white spot at `position` shining along `direction`.
    pub fn flashlight<V: Into<Vector3<f32>>>(position: V, direction: V) -> Self {
        Self {
            position: position.into(),
            direction: direction.into(),
            cut_off: Deg(12.5).into(),
            outer_cut_off: Deg(15.0).into(),
            ambient: Vector3::new(0.0, 0.0, 0.0),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            specular: Vector3::new(1.0, 1.0, 1.0),
            attenuation: Attenuation::default(),
        }
    }
}

/// The full caster set of a scene.
#[derive(Debug, Clone, Default)]
pub struct Lights {
    pub directional: DirectionalLight,
    pub points: Vec<PointLight>,
    pub spot: Option<SpotLight>,
}

impl Lights {
    pub fn to_raw(&self) -> LightsUniform {
        let mut points = [PointLightRaw::zeroed(); MAX_POINT_LIGHTS];
        if self.points.len() > MAX_POINT_LIGHTS {
            log::warn!(
                "scene has {} point lights, only the first {} are uploaded",
                self.points.len(),
                MAX_POINT_LIGHTS
            );
        }
        let count = self.points.len().min(MAX_POINT_LIGHTS);
        for (raw, light) in points.iter_mut().zip(&self.points) {
            *raw = PointLightRaw::from(light);
        }

        LightsUniform {
            directional: DirectionalLightRaw::from(&self.directional),
            points,
            spot: self
                .spot
                .as_ref()
                .map(SpotLightRaw::from)
                .unwrap_or(SpotLightRaw::zeroed()),
            counts: [count as u32, self.spot.is_some() as u32, 0, 0],
        }
    }
}

// Uniform blocks require 16 byte rows, hence a padding field after every vec3.

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLightRaw {
    direction: [f32; 3],
    _padding: u32,
    ambient: [f32; 3],
    _padding2: u32,
    diffuse: [f32; 3],
    _padding3: u32,
    specular: [f32; 3],
    _padding4: u32,
}

impl From<&DirectionalLight> for DirectionalLightRaw {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            direction: light.direction.normalize().into(),
            _padding: 0,
            ambient: light.ambient.into(),
            _padding2: 0,
            diffuse: light.diffuse.into(),
            _padding3: 0,
            specular: light.specular.into(),
            _padding4: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightRaw {
    position: [f32; 3],
    _padding: u32,
    ambient: [f32; 3],
    _padding2: u32,
    diffuse: [f32; 3],
    _padding3: u32,
    specular: [f32; 3],
    _padding4: u32,
    // constant, linear, quadratic
    attenuation: [f32; 3],
    _padding5: u32,
}

impl PointLightRaw {
    fn zeroed() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

impl From<&PointLight> for PointLightRaw {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.into(),
            _padding: 0,
            ambient: light.ambient.into(),
            _padding2: 0,
            diffuse: light.diffuse.into(),
            _padding3: 0,
            specular: light.specular.into(),
            _padding4: 0,
            attenuation: [
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
            ],
            _padding5: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpotLightRaw {
    position: [f32; 3],
    _padding: u32,
    direction: [f32; 3],
    _padding2: u32,
    ambient: [f32; 3],
    _padding3: u32,
    diffuse: [f32; 3],
    _padding4: u32,
    specular: [f32; 3],
    _padding5: u32,
    // cosines, the shader compares them against dot products directly
    cut_off: f32,
    outer_cut_off: f32,
    _padding6: [f32; 2],
    attenuation: [f32; 3],
    _padding7: u32,
}

impl SpotLightRaw {
    fn zeroed() -> Self {
        bytemuck::Zeroable::zeroed()
    }

    pub fn cut_off_cosines(&self) -> (f32, f32) {
        (self.cut_off, self.outer_cut_off)
    }
}

impl From<&SpotLight> for SpotLightRaw {
    fn from(light: &SpotLight) -> Self {
        Self {
            position: light.position.into(),
            _padding: 0,
            direction: light.direction.normalize().into(),
            _padding2: 0,
            ambient: light.ambient.into(),
            _padding3: 0,
            diffuse: light.diffuse.into(),
            _padding4: 0,
            specular: light.specular.into(),
            _padding5: 0,
            cut_off: light.cut_off.0.cos(),
            outer_cut_off: light.outer_cut_off.0.cos(),
            _padding6: [0.0; 2],
            attenuation: [
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
            ],
            _padding7: 0,
        }
    }
}

/// The uniform block as the shaders see it.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    directional: DirectionalLightRaw,
    points: [PointLightRaw; MAX_POINT_LIGHTS],
    spot: SpotLightRaw,
    // x: active point lights, y: spot enabled
    counts: [u32; 4],
}

impl LightsUniform {
    pub fn point_count(&self) -> u32 {
        self.counts[0]
    }

    pub fn spot_enabled(&self) -> bool {
        self.counts[1] == 1
    }

    pub fn spot(&self) -> &SpotLightRaw {
        &self.spot
    }
}

pub fn mk_buffer(device: &wgpu::Device, uniform: &LightsUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Lights Buffer"),
        contents: bytemuck::cast_slice(&[*uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("lights_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some("lights_bind_group"),
    })
}

/// Scene lights plus their GPU mirror and the optional marker model drawn at
/// point light positions.
#[derive(Debug)]
pub struct LightResources {
    pub lights: Lights,
    pub uniform: LightsUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub model: Option<Model>,
}

impl LightResources {
    pub fn new(lights: Lights, model: Option<Model>, device: &wgpu::Device) -> Self {
        let uniform = lights.to_raw();
        let buffer = mk_buffer(device, &uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            lights,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
            model,
        }
    }

    /// Push the current light state to the GPU. Call after mutating
    /// `self.lights`, typically once per frame.
    pub fn update(&mut self, queue: &wgpu::Queue) {
        self.uniform = self.lights.to_raw();
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Pipeline drawing untextured marker cubes at point light positions.
pub fn mk_light_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Light Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, light_bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Light Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("light.wgsl").into()),
    };
    crate::pipelines::phong::mk_render_pipeline(
        device,
        &layout,
        config.format,
        Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        Some(texture::Texture::DEPTH_FORMAT),
        &[ModelVertex::desc()],
        shader,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attenuation_table_covers_short_and_long_ranges() {
        let near = Attenuation::for_range(7.0);
        assert_eq!(near.linear, 0.7);
        assert_eq!(near.quadratic, 1.8);

        let mid = Attenuation::for_range(90.0);
        assert_eq!(mid.linear, 0.045);

        let far = Attenuation::for_range(10_000.0);
        assert_eq!(far.linear, 0.0014);
        assert_eq!(far.quadratic, 0.000007);
    }

    #[test]
    fn longer_ranges_attenuate_less() {
        let mut previous = f32::MAX;
        for range in [7.0, 20.0, 65.0, 200.0, 600.0] {
            let a = Attenuation::for_range(range);
            assert!(a.linear < previous);
            previous = a.linear;
        }
    }

    #[test]
    fn counts_reflect_active_casters() {
        let lights = Lights {
            points: vec![
                PointLight::white_at([0.0, 1.0, 0.0]),
                PointLight::white_at([2.0, 1.0, 0.0]),
            ],
            spot: None,
            ..Default::default()
        };
        let raw = lights.to_raw();
        assert_eq!(raw.point_count(), 2);
        assert!(!raw.spot_enabled());
    }

    #[test]
    fn point_lights_beyond_the_array_are_dropped() {
        let lights = Lights {
            points: (0..6)
                .map(|i| PointLight::white_at([i as f32, 0.0, 0.0]))
                .collect(),
            ..Default::default()
        };
        assert_eq!(lights.to_raw().point_count(), MAX_POINT_LIGHTS as u32);
    }

    #[test]
    fn spot_cutoffs_are_stored_as_ordered_cosines() {
        let lights = Lights {
            spot: Some(SpotLight::flashlight([0.0, 0.0, 0.0], [0.0, 0.0, -1.0])),
            ..Default::default()
        };
        let raw = lights.to_raw();
        assert!(raw.spot_enabled());
        let (inner, outer) = raw.spot().cut_off_cosines();
        // The inner cone is narrower, so its cosine is larger
        assert!(inner > outer);
        assert!(outer > 0.0);
    }
}
