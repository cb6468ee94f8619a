//! A field of crates under a directional light, four colored point lights
//! and a flashlight that follows the camera. Drag with the left mouse button
//! to look around, WASD to move.

use instant::Duration;
use lumen_ngin::{
    Deg, EuclideanSpace, InnerSpace, Quaternion, Rad, Rotation3, Vector3,
    context::{Context, InitContext},
    data_structures::{instance::Instance, model::Model},
    flow::{self, FlowConstructor, Out, SceneFlow},
    pipelines::light::{Lights, PointLight, SpotLight},
    render::{Instanced, Render},
    resources,
};
use wgpu::util::DeviceExt;

const CUBE_POSITIONS: [[f32; 3]; 10] = [
    [0.0, 0.0, 0.0],
    [2.0, 5.0, -15.0],
    [-1.5, -2.2, -2.5],
    [-3.8, -2.0, -12.3],
    [2.4, -0.4, -3.5],
    [-1.7, 3.0, -7.5],
    [1.3, -2.0, -2.5],
    [1.5, 2.0, -2.5],
    [1.5, 0.2, -1.5],
    [-1.3, 1.0, -1.5],
];

const LIGHT_POSITIONS: [[f32; 3]; 4] = [
    [0.7, 0.2, 2.0],
    [2.3, -3.3, -4.0],
    [-4.0, 2.0, -12.0],
    [0.0, 0.0, -3.0],
];

struct LitCubes {
    model: Model,
    instances: Vec<Instance>,
    instance_buffer: wgpu::Buffer,
}

impl LitCubes {
    async fn new(init: InitContext) -> anyhow::Result<Self> {
        let model = resources::load_model_obj("cube.obj", &init.device, &init.queue).await?;

        let axis = Vector3::new(1.0, 0.3, 0.5).normalize();
        let instances = CUBE_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, position)| {
                let mut instance = Instance::at(*position);
                instance.rotation = Quaternion::from_axis_angle(axis, Deg(20.0 * i as f32));
                instance
            })
            .collect::<Vec<_>>();

        let instance_data = instances.iter().map(Instance::to_raw).collect::<Vec<_>>();
        let instance_buffer = init
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cube Instance Buffer"),
                contents: bytemuck::cast_slice(&instance_data),
                usage: wgpu::BufferUsages::VERTEX,
            });

        Ok(Self {
            model,
            instances,
            instance_buffer,
        })
    }
}

fn camera_forward(ctx: &Context) -> Vector3<f32> {
    let (sin_pitch, cos_pitch) = ctx.camera.camera.pitch.0.sin_cos();
    let (sin_yaw, cos_yaw) = ctx.camera.camera.yaw.0.sin_cos();
    Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
}

impl SceneFlow<()> for LitCubes {
    fn on_init(&mut self, _ctx: &mut Context, _state: &mut ()) -> Out<()> {
        Out::Configure(Box::new(|ctx: &mut Context| {
            ctx.camera.camera.position = [0.0, 0.0, 3.0].into();
            ctx.camera.camera.pitch = Rad(0.0);
            ctx.light.lights = Lights {
                points: LIGHT_POSITIONS
                    .iter()
                    .map(|p| PointLight::white_at(*p))
                    .collect(),
                spot: Some(SpotLight::flashlight(
                    [0.0, 0.0, 3.0],
                    [0.0, 0.0, -1.0],
                )),
                ..Default::default()
            };
        }))
    }

    fn on_update(&mut self, ctx: &Context, _state: &mut (), _dt: Duration) -> Out<()> {
        // Keep the flashlight glued to the camera
        let position = ctx.camera.camera.position;
        let forward = camera_forward(ctx);
        Out::Configure(Box::new(move |ctx: &mut Context| {
            if let Some(spot) = ctx.light.lights.spot.as_mut() {
                spot.position = position.to_vec();
                spot.direction = forward;
            }
        }))
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
            amount: self.instances.len(),
        })
    }
}

fn main() -> anyhow::Result<()> {
    let constructor: FlowConstructor<()> = Box::new(|init: InitContext| {
        Box::pin(async move {
            let flow: Box<dyn SceneFlow<()>> =
                Box::new(LitCubes::new(init).await.expect("failed to load cube.obj"));
            flow
        })
    });
    flow::run(vec![constructor])
}
