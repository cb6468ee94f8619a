//! End-to-end draw coverage on a headless device.
//!
//! Renders a unit quad with the phong pipeline into an offscreen target and
//! checks the readback: the quad covers the center of the image, the clear
//! colour survives in the corners. Runs only with `--features
//! integration-tests` since it needs a working GPU adapter.

#![cfg(feature = "integration-tests")]

use futures::executor::block_on;
use lumen_ngin::camera::{Camera, CameraUniform, Projection};
use lumen_ngin::data_structures::instance::InstanceRaw;
use lumen_ngin::data_structures::model::{DrawModel, Mesh, MeshError};
use lumen_ngin::data_structures::shapes;
use lumen_ngin::data_structures::texture::Texture;
use lumen_ngin::pipelines::light::{LightResources, Lights};
use lumen_ngin::pipelines::phong::mk_phong_pipeline;
use lumen_ngin::resources;
use wgpu::util::DeviceExt;

const SIZE: u32 = 256;

fn request_device() -> (wgpu::Device, wgpu::Queue) {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });
    let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .expect("no suitable GPU adapter");
    block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: None,
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        memory_hints: Default::default(),
        trace: wgpu::Trace::Off,
    }))
    .expect("no device")
}

fn offscreen_config() -> wgpu::SurfaceConfiguration {
    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        width: SIZE,
        height: SIZE,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: wgpu::CompositeAlphaMode::Opaque,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    }
}

#[test]
fn quad_draw_covers_center_and_leaves_corners_clear() {
    let (device, queue) = request_device();
    let config = offscreen_config();

    // Camera two units in front of the quad, looking down -z
    let camera = Camera::new((0.0, 0.0, 2.0), cgmath::Deg(-90.0), cgmath::Deg(0.0));
    let projection = Projection::new(SIZE, SIZE, cgmath::Deg(45.0), 0.1, 100.0);
    let mut camera_uniform = CameraUniform::new();
    camera_uniform.update_view_proj(&camera, &projection);

    let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Camera Buffer"),
        contents: bytemuck::cast_slice(&[camera_uniform]),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("camera_bind_group_layout"),
    });
    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &camera_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: camera_buffer.as_entire_binding(),
        }],
        label: Some("camera_bind_group"),
    });

    let light = LightResources::new(Lights::default(), None, &device);

    let material_layout = resources::diffuse_specular_layout(&device);
    let material = resources::default_material(&device, &queue, &material_layout);
    let (vertices, indices) = shapes::unit_quad();
    let mesh = Mesh::new(&device, "quad", &vertices, &indices, material).unwrap();
    assert_eq!(mesh.num_elements, 6);

    let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Instance Buffer"),
        contents: bytemuck::cast_slice(&[InstanceRaw::identity()]),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let pipeline = mk_phong_pipeline(&device, &config, &camera_layout, &light.bind_group_layout);

    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let depth = Texture::create_depth_texture(&device, [SIZE, SIZE], "test depth");

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Test Encoder"),
    });
    {
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Test Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(&pipeline);
        render_pass.set_vertex_buffer(1, instance_buffer.slice(..));
        render_pass.draw_mesh(&mesh, &camera_bind_group, &light.bind_group);
    }

    let bytes_per_row = 4 * SIZE;
    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: None,
        size: (bytes_per_row * SIZE) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &target,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(SIZE),
            },
        },
        wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).unwrap();
    });
    device
        .poll(wgpu::PollType::Wait)
        .unwrap();
    block_on(rx.receive()).unwrap().unwrap();

    let data = buffer_slice.get_mapped_range();
    let pixel = |x: u32, y: u32| {
        let offset = ((y * SIZE + x) * 4) as usize;
        [data[offset], data[offset + 1], data[offset + 2]]
    };

    let center = pixel(SIZE / 2, SIZE / 2);
    assert!(
        center.iter().any(|&c| c > 0),
        "quad should be lit at the center, got {center:?}"
    );
    // The white quad must stay achromatic under the white lights
    assert!(center[0].abs_diff(center[1]) <= 1 && center[1].abs_diff(center[2]) <= 1);

    let corner = pixel(1, 1);
    assert_eq!(corner, [0, 0, 0], "corners keep the clear colour");
}

#[test]
fn out_of_range_index_is_rejected_before_upload() {
    let (device, queue) = request_device();
    let material_layout = resources::diffuse_specular_layout(&device);
    let material = resources::default_material(&device, &queue, &material_layout);
    let (vertices, mut indices) = shapes::unit_quad();
    indices[0] = 7;
    let err = Mesh::new(&device, "broken", &vertices, &indices, material).unwrap_err();
    assert_eq!(
        err,
        MeshError::IndexOutOfRange {
            index: 7,
            vertex_count: 4
        }
    );
}
