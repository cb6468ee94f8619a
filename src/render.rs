//! Render composition.
//!
//! Scene flows describe what to draw each frame by returning a [`Render`].
//! The engine flattens those into one batch for the phong pipeline so
//! pipeline switches happen once per frame, not once per object.

use wgpu::RenderPass;

use crate::{context::Context, data_structures::model::Model};

/// Data for one instanced object: a model plus the buffer of per-instance
/// transforms.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// Specifies how a scene object should be rendered.
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single instanced object
/// - `Defaults(Vec<Instanced>)` renders a batch of instanced objects
/// - `Composed(Vec<Render>)` recursively renders a composition
/// - `Custom(...)` invokes a user-defined closure against the open pass
pub enum Render<'a, 'pass>
where
    'pass: 'a,
{
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a, 'pass>>),
    Custom(Box<dyn 'a + FnOnce(&Context, &mut RenderPass<'pass>) -> ()>),
}

impl<'a, 'pass> Render<'a, 'pass> {
    pub(crate) fn set_pipelines(
        self,
        ctx: &Context,
        render_pass: &mut RenderPass<'pass>,
        basics: &mut Vec<Instanced<'a>>,
    ) {
        match self {
            Render::Default(instanced) => basics.push(instanced),
            Render::Defaults(mut vec) => basics.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(ctx, render_pass, basics)),
            Render::Custom(f) => f(ctx, render_pass),
            Render::None => (),
        }
    }
}
