//! The smallest possible scene: one triangle, default material, no lights
//! beyond the built-in directional.

use lumen_ngin::{
    Rad,
    context::{Context, InitContext},
    data_structures::{
        instance::Instance,
        model::{Mesh, Model},
        shapes,
    },
    flow::{self, FlowConstructor, Out, SceneFlow},
    render::{Instanced, Render},
    resources,
};
use wgpu::util::DeviceExt;

struct Triangle {
    model: Model,
    instance_buffer: wgpu::Buffer,
}

impl Triangle {
    fn new(init: &InitContext) -> anyhow::Result<Self> {
        let layout = resources::diffuse_specular_layout(&init.device);
        let material = resources::default_material(&init.device, &init.queue, &layout);
        let (vertices, indices) = shapes::first_triangle();
        let mesh = Mesh::new(&init.device, "triangle", &vertices, &indices, material)?;

        let instance_data = [Instance::new().to_raw()];
        let instance_buffer = init
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Triangle Instance Buffer"),
                contents: bytemuck::cast_slice(&instance_data),
                usage: wgpu::BufferUsages::VERTEX,
            });

        Ok(Self {
            model: Model { meshes: vec![mesh] },
            instance_buffer,
        })
    }
}

impl SceneFlow<()> for Triangle {
    fn on_init(&mut self, _ctx: &mut Context, _state: &mut ()) -> Out<()> {
        Out::Configure(Box::new(|ctx: &mut Context| {
            ctx.clear_colour = wgpu::Color {
                r: 0.2,
                g: 0.3,
                b: 0.3,
                a: 1.0,
            };
            ctx.light.model = None;
            ctx.camera.camera.position = [0.0, 0.0, 2.0].into();
            ctx.camera.camera.pitch = Rad(0.0);
        }))
    }

    fn on_update(&mut self, _: &Context, _: &mut (), _: instant::Duration) -> Out<()> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut (), _: &lumen_ngin::WindowEvent) -> Out<()> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut (), _: &lumen_ngin::DeviceEvent) -> Out<()> {
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Default(Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
            amount: 1,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let constructor: FlowConstructor<()> = Box::new(|init: InitContext| {
        Box::pin(async move {
            let flow: Box<dyn SceneFlow<()>> =
                Box::new(Triangle::new(&init).expect("triangle setup failed"));
            flow
        })
    });
    flow::run(vec![constructor])
}
