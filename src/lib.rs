//! lumen-ngin
//!
//! A small cross-platform forward renderer for native and WASM targets. The
//! crate exposes a compact surface for building GPU meshes, shading them with
//! a multi-light phong model and driving a scene through a winit event loop.
//!
//! High-level modules
//! - `camera`: camera type, controller and uniforms for view/projection
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: engine data models (meshes, materials, instances)
//! - `flow`: scene flows and the application event loop
//! - `pipelines`: the phong and light-marker render pipelines
//! - `resources`: helpers to load textures/models and create GPU resources
//! - `render`: render composition for efficient pipeline reuse
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
