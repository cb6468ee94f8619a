//! Scene flows and the application event loop.
//!
//! A "flow" is a self-contained scene or game state: it handles input,
//! updates its simulation and returns renderable objects each frame. The
//! engine owns the winit event loop, routes events to all flows and renders
//! their output in one depth-tested pass per frame.
//!
//! # Frame lifecycle
//!
//! 1. Window/device events are routed to every flow
//! 2. The camera controller and light uniforms are applied
//! 3. `on_update` runs with the elapsed time
//! 4. `on_render` collects renderables, which are drawn batched and presented

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::Window,
};

use crate::{
    context::{Context, InitContext},
    data_structures::{
        model::{DrawLight, DrawModel},
        texture::Texture,
    },
    render::{Instanced, Render},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

///
/// Output type for the lifecycle hooks.
///
/// `Out::Configure` can be used to modify the [`Context`], for instance to
/// change the clear colour, reposition the camera or swap the scene lights.
/// `Out::Mutate` queues a mutation of the shared application state that runs
/// once the hook has returned. `Empty` is the default output when nothing
/// needs to change.
///
pub enum Out<S> {
    Configure(Box<dyn FnOnce(&mut Context)>),
    Mutate(Box<dyn FnOnce(&mut S)>),
    Empty,
}

impl<S> Default for Out<S> {
    fn default() -> Self {
        Self::Empty
    }
}

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the flow is created; the only place to
///    mutate the context directly
/// 2. `on_window_events()` / `on_device_events()` are called per input event
/// 3. `on_update()` is called every frame with the elapsed time
/// 4. `on_render()` is called each frame and specifies how to render `self`
pub trait SceneFlow<S> {
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<S>;

    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<S>;

    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out<S>;

    fn on_device_events(&mut self, ctx: &Context, state: &mut S, event: &DeviceEvent) -> Out<S>;

    /// Collect the flow's objects into a [`Render`]. The engine batches all
    /// flows' renders and draws them in one pass.
    fn on_render<'pass>(&self) -> Render<'_, 'pass>;
}

impl<S> Debug for dyn SceneFlow<S> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SceneFlow")
    }
}

/// Factory for a flow: receives a cheap GPU handle and asynchronously loads
/// whatever resources the scene needs.
pub type FlowConstructor<S> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn SceneFlow<S>>>>>>;

fn handle_out<S>(out: Out<S>, ctx: &mut Context, state: &mut S) {
    match out {
        Out::Configure(configure) => configure(ctx),
        Out::Mutate(mutate) => mutate(state),
        Out::Empty => (),
    }
}

/// Application state bundle: GPU context, user state, surface status.
#[derive(Debug)]
pub struct AppState<S: 'static> {
    pub(crate) ctx: Context,
    state: S,
    is_surface_configured: bool,
}

impl<S: Default> AppState<S> {
    async fn new(window: Arc<Window>) -> Self {
        let ctx = match Context::new(window).await {
            Ok(ctx) => ctx,
            Err(e) => panic!(
                "App initialization failed. Cannot create the main context: {}",
                e
            ),
        };
        Self {
            ctx,
            state: S::default(),
            is_surface_configured: false,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    fn update(&mut self, flows: &mut Vec<Box<dyn SceneFlow<S>>>, dt: Duration) {
        let camera = &mut self.ctx.camera;
        camera.controller.update_camera(&mut camera.camera, dt);
        camera
            .uniform
            .update_view_proj(&camera.camera, &self.ctx.projection);
        self.ctx.queue.write_buffer(
            &self.ctx.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.ctx.camera.uniform]),
        );
        self.ctx.light.update(&self.ctx.queue);

        for flow in flows.iter_mut() {
            let out = flow.on_update(&self.ctx, &mut self.state, dt);
            handle_out(out, &mut self.ctx, &mut self.state);
        }
    }

    fn render(&mut self, flows: &Vec<Box<dyn SceneFlow<S>>>) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

            // Marker cubes at point light positions
            if let Some(model) = &self.ctx.light.model {
                let point_count = self.ctx.light.uniform.point_count();
                if point_count > 0 {
                    render_pass.set_pipeline(&self.ctx.pipelines.light);
                    render_pass.draw_light_model_instanced(
                        model,
                        0..point_count,
                        &self.ctx.camera.bind_group,
                        &self.ctx.light.bind_group,
                    );
                }
            }

            let mut basics: Vec<Instanced> = Vec::new();
            flows.iter().for_each(|flow| {
                let render = flow.on_render();
                render.set_pipelines(&self.ctx, &mut render_pass, &mut basics);
            });

            render_pass.set_pipeline(&self.ctx.pipelines.phong);
            for instanced in basics {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!("you attempted to render something with zero instances");
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_model_instanced(
                    instanced.model,
                    0..instanced.amount as u32,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub(crate) enum FlowEvent<S: 'static> {
    // The message from the wasm `spawn_local` once async setup finished
    #[allow(dead_code)]
    Initialized {
        state: AppState<S>,
        flows: Vec<Box<dyn SceneFlow<S>>>,
    },
}

impl<S> Debug for FlowEvent<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
        }
    }
}

pub struct App<S: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<S>>,
    state: Option<AppState<S>>,
    flows: Vec<Box<dyn SceneFlow<S>>>,
    // Holds the constructors until `resumed`; `take()`n after use
    constructors: Option<Vec<FlowConstructor<S>>>,
    last_time: Instant,
    mouse_pressed: bool,
}

impl<S: 'static> App<S> {
    fn new(event_loop: &EventLoop<FlowEvent<S>>, constructors: Vec<FlowConstructor<S>>) -> Self {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new().unwrap();
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
            mouse_pressed: false,
        }
    }

    fn init_flows(&mut self, mut app_state: AppState<S>, flows: Vec<Box<dyn SceneFlow<S>>>) {
        self.flows = flows;
        self.flows.iter_mut().for_each(|flow| {
            let out = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_out(out, &mut app_state.ctx, &mut app_state.state);
        });
        app_state.ctx.window.request_redraw();
        self.state = Some(app_state);
    }
}

impl<S: 'static + Default> ApplicationHandler<FlowEvent<S>> for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes();

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        let constructors = self.constructors.take().unwrap();

        let init_future = async move {
            let app_state = AppState::new(window).await;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            (app_state, flows)
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let (app_state, flows) = self.async_runtime.block_on(init_future);
            self.init_flows(app_state, flows);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let (app_state, flows) = init_future.await;
                assert!(
                    proxy
                        .send_event(FlowEvent::Initialized {
                            state: app_state,
                            flows,
                        })
                        .is_ok()
                );
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent<S>) {
        match event {
            FlowEvent::Initialized { mut state, flows } => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                self.init_flows(state, flows);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };

        for flow in self.flows.iter_mut() {
            let out = flow.on_window_events(&app_state.ctx, &mut app_state.state, &event);
            handle_out(out, &mut app_state.ctx, &mut app_state.state);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => app_state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } => {
                if let PhysicalKey::Code(key) = key_event.physical_key {
                    app_state
                        .ctx
                        .camera
                        .controller
                        .process_keyboard(key, key_event.state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                app_state.ctx.camera.controller.process_scroll(&delta);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.mouse_pressed = state.is_pressed();
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now - self.last_time;
                self.last_time = now;

                app_state.update(&mut self.flows, dt);
                match app_state.render(&self.flows) {
                    Ok(()) => {}
                    // The surface needs to be reconfigured
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = app_state.ctx.window.inner_size();
                        app_state.resize(size.width, size.height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory, exiting");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("Surface error: {:?}", e),
                }
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };

        for flow in self.flows.iter_mut() {
            let out = flow.on_device_events(&app_state.ctx, &mut app_state.state, &event);
            handle_out(out, &mut app_state.ctx, &mut app_state.state);
        }

        if let DeviceEvent::MouseMotion { delta } = event {
            // Only rotate while the left button is held
            if self.mouse_pressed {
                app_state
                    .ctx
                    .camera
                    .controller
                    .process_mouse(delta.0, delta.1);
            }
        }
    }
}

/// Run the event loop with the given scene constructors.
///
/// This call blocks until the window closes (native) or hands control to the
/// browser (wasm).
pub fn run<S: 'static + Default>(constructors: Vec<FlowConstructor<S>>) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    #[cfg(target_arch = "wasm32")]
    console_log::init_with_level(log::Level::Warn).expect("Couldn't initialize logger");

    let event_loop = EventLoop::<FlowEvent<S>>::with_user_event().build()?;
    let mut app = App::new(&event_loop, constructors);
    event_loop.run_app(&mut app)?;
    Ok(())
}
