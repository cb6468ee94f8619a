//! Engine data structures: models, textures and instances.
//!
//! - `model` contains the vertex record, materials, validated meshes and the
//!   draw traits
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds per-instance transformation data
//! - `shapes` generates reference geometry (triangle, quad, cube)

pub mod instance;
pub mod model;
pub mod shapes;
pub mod texture;
