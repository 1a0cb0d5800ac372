//! Render composition.
//!
//! Scenes describe what to draw each frame with a [`Render`] value. The
//! engine flattens it into a draw list and issues the draws in order.

use crate::{
    data_structures::model::Model,
    pipelines::{shader::Shader, uniforms::Uniforms},
};

/// A model drawn `amount` times with one shader.
///
/// Per-instance data is whatever the model's meshes carry in attribute slots
/// with a divisor. `uniforms` replaces some of the shader's values for this
/// draw only.
#[derive(Clone, Copy)]
pub struct Instanced<'a> {
    pub model: &'a Model,
    pub shader: &'a Shader,
    pub amount: u32,
    pub uniforms: Option<&'a Uniforms>,
}

impl<'a> Instanced<'a> {
    pub fn new(model: &'a Model, shader: &'a Shader, amount: u32) -> Self {
        Self {
            model,
            shader,
            amount,
            uniforms: None,
        }
    }

    pub fn single(model: &'a Model, shader: &'a Shader) -> Self {
        Self::new(model, shader, 1)
    }

    pub fn with_uniforms(mut self, uniforms: &'a Uniforms) -> Self {
        self.uniforms = Some(uniforms);
        self
    }
}

/// Specifies what a scene draws this frame.
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single instanced model
/// - `Defaults(Vec<Instanced>)` renders a batch of instanced models
/// - `Composed(Vec<Render>)` renders each of its parts in order
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Append every draw of this render to `draws`, in order.
    pub fn flatten_into(self, draws: &mut Vec<Instanced<'a>>) {
        match self {
            Render::None => (),
            Render::Default(instanced) => draws.push(instanced),
            Render::Defaults(instances) => draws.extend(instances),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.flatten_into(draws)),
        }
    }

    pub fn flatten(self) -> Vec<Instanced<'a>> {
        let mut draws = Vec::new();
        self.flatten_into(&mut draws);
        draws
    }
}

impl<'a> From<Instanced<'a>> for Render<'a> {
    fn from(instanced: Instanced<'a>) -> Self {
        Render::Default(instanced)
    }
}

impl<'a> From<Vec<Instanced<'a>>> for Render<'a> {
    fn from(instances: Vec<Instanced<'a>>) -> Self {
        Render::Defaults(instances)
    }
}

/// Write the per-draw uniforms of `draws`, grouped by shader, and return
/// the uniform offset of each draw. Draws whose uniforms are rejected get `None`.
fn stage_uniforms(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    draws: &[Instanced<'_>],
) -> Vec<Option<u32>> {
    let mut offsets = vec![Some(0); draws.len()];
    let mut by_shader: Vec<(&Shader, Vec<(usize, &Uniforms)>)> = Vec::new();
    for (i, draw) in draws.iter().enumerate() {
        let Some(uniforms) = draw.uniforms else {
            continue;
        };
        match by_shader
            .iter_mut()
            .find(|(shader, _)| std::ptr::eq(*shader, draw.shader))
        {
            Some((_, staged)) => staged.push((i, uniforms)),
            None => by_shader.push((draw.shader, vec![(i, uniforms)])),
        }
    }

    for (shader, staged) in by_shader {
        let overrides: Vec<&Uniforms> = staged.iter().map(|(_, uniforms)| *uniforms).collect();
        match shader.stage(device, queue, &overrides) {
            Ok(staged_offsets) => {
                for ((i, _), offset) in staged.iter().zip(staged_offsets) {
                    offsets[*i] = Some(offset);
                }
            }
            Err(e) => {
                log::warn!("{}: per-draw uniforms rejected: {}", shader.label(), e);
                for (i, _) in &staged {
                    offsets[*i] = None;
                }
            }
        }
    }
    offsets
}

/// Record `draws` into `render_pass`, which targets `color_format` and a
/// [`Texture2D::DEPTH_FORMAT`](crate::data_structures::texture::Texture2D::DEPTH_FORMAT) depth buffer.
///
/// Draws with their own [`Uniforms`] are written to the shader's uniform
/// slots through `queue` before anything is recorded.
pub fn draw_instances(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    color_format: wgpu::TextureFormat,
    render_pass: &mut wgpu::RenderPass<'_>,
    draws: &[Instanced<'_>],
) {
    let offsets = stage_uniforms(device, queue, draws);
    for (draw, offset) in draws.iter().zip(offsets) {
        let Some(offset) = offset else {
            continue;
        };
        if draw.amount == 0 {
            log::debug!("{}: skipped, zero instances", draw.model.name);
            continue;
        }
        for mesh in &draw.model.meshes {
            let Some(pipeline) = draw.shader.pipeline(device, color_format, &mesh.vertex_slots())
            else {
                continue;
            };
            render_pass.set_pipeline(&pipeline);
            draw.shader.bind(render_pass, offset);
            mesh.draw_instanced(render_pass, draw.amount);
        }
    }
}
