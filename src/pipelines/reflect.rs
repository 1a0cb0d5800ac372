//! Shader compilation checks and resource reflection.
//!
//! WGSL sources are parsed and validated with naga before wgpu ever sees
//! them, which turns compile errors into values instead of device errors.
//! The validated module is then walked to find uniforms by name and the
//! texture slots, so that shaders can be fed the way GL programs are.
//!
//! Conventions a shader has to follow:
//! - uniforms live in a single `var<uniform>` at `@group(0) @binding(0)`,
//!   either a struct (each member is a uniform) or a single value
//! - every `texture_2d<f32>` sits in `@group(1)` and is followed by its
//!   sampler at the next binding

use std::collections::BTreeMap;

use naga::{AddressSpace, Binding, ImageClass, ImageDimension, ScalarKind, ShaderStage, TypeInner};

use crate::error::ShaderError;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Uint,
    Float,
    Mat4,
}

impl UniformKind {
    pub fn name(self) -> &'static str {
        match self {
            UniformKind::Int => "i32",
            UniformKind::Uint => "u32",
            UniformKind::Float => "f32",
            UniformKind::Mat4 => "mat4x4<f32>",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSlot {
    pub name: String,
    pub binding: u32,
    pub sampler_binding: u32,
}

/// Resources and vertex inputs a program expects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reflection {
    pub uniforms: Vec<UniformField>,
    /// Size of the uniform block in bytes, zero when the program has none.
    pub uniform_size: u32,
    /// Ordered by binding, a slot's index is its texture unit.
    pub textures: Vec<TextureSlot>,
    /// `@location`s the vertex entry point reads.
    pub vertex_inputs: Vec<u32>,
}

impl Reflection {
    pub fn uniform(&self, name: &str) -> Option<&UniformField> {
        self.uniforms.iter().find(|field| field.name == name)
    }

    pub fn texture_unit(&self, name: &str) -> Option<usize> {
        self.textures.iter().position(|slot| slot.name == name)
    }
}

/// Parse and validate `source`, then reflect the resources it declares.
pub fn compile(stage: &'static str, source: &str) -> Result<(naga::Module, Reflection), ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| ShaderError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;
    let reflection = reflect(&module)?;
    Ok((module, reflection))
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match inner {
        TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
            ScalarKind::Sint => Some(UniformKind::Int),
            ScalarKind::Uint => Some(UniformKind::Uint),
            ScalarKind::Float => Some(UniformKind::Float),
            _ => None,
        },
        TypeInner::Matrix {
            columns: naga::VectorSize::Quad,
            rows: naga::VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float && scalar.width == 4 => Some(UniformKind::Mat4),
        _ => None,
    }
}

fn reflect(module: &naga::Module) -> Result<Reflection, ShaderError> {
    let mut reflection = Reflection::default();
    let mut textures = BTreeMap::new();
    let mut samplers = Vec::new();

    for (_, global) in module.global_variables.iter() {
        let name = global.name.clone().unwrap_or_default();
        let inner = &module.types[global.ty].inner;
        match (&global.space, global.binding.as_ref()) {
            (AddressSpace::Uniform, Some(binding)) => {
                if binding.group != 0 || binding.binding != 0 {
                    return Err(ShaderError::Link(format!(
                        "uniform `{}` must be bound at @group(0) @binding(0)",
                        name
                    )));
                }
                match inner {
                    TypeInner::Struct { members, span } => {
                        for member in members {
                            let member_name = member.name.clone().unwrap_or_default();
                            match uniform_kind(&module.types[member.ty].inner) {
                                Some(kind) => reflection.uniforms.push(UniformField {
                                    name: member_name,
                                    kind,
                                    offset: member.offset,
                                }),
                                None => log::debug!(
                                    "uniform member `{}` has a type that cannot be set by name",
                                    member_name
                                ),
                            }
                        }
                        reflection.uniform_size = align_to(*span, 16);
                    }
                    other => {
                        let kind = uniform_kind(other).ok_or_else(|| {
                            ShaderError::Link(format!("uniform `{}` has an unsupported type", name))
                        })?;
                        let size = if kind == UniformKind::Mat4 { 64 } else { 4 };
                        reflection.uniforms.push(UniformField {
                            name,
                            kind,
                            offset: 0,
                        });
                        reflection.uniform_size = align_to(size, 16);
                    }
                }
            }
            (AddressSpace::Handle, Some(binding)) => {
                if binding.group != 1 {
                    return Err(ShaderError::Link(format!(
                        "`{}` must be bound in @group(1), found @group({})",
                        name, binding.group
                    )));
                }
                match inner {
                    TypeInner::Image {
                        dim: ImageDimension::D2,
                        arrayed: false,
                        class: ImageClass::Sampled { .. },
                    } => {
                        textures.insert(binding.binding, name);
                    }
                    TypeInner::Sampler { .. } => samplers.push(binding.binding),
                    _ => {
                        return Err(ShaderError::Link(format!(
                            "`{}` is not a texture_2d or sampler",
                            name
                        )));
                    }
                }
            }
            _ => (),
        }
    }

    for (binding, name) in textures {
        let sampler_binding = binding + 1;
        if !samplers.contains(&sampler_binding) {
            return Err(ShaderError::Link(format!(
                "texture `{}` at binding {} has no sampler at binding {}",
                name, binding, sampler_binding
            )));
        }
        reflection.textures.push(TextureSlot {
            name,
            binding,
            sampler_binding,
        });
    }

    if let Some(entry) = module
        .entry_points
        .iter()
        .find(|entry| matches!(entry.stage, ShaderStage::Vertex) && entry.name == VERTEX_ENTRY)
    {
        for argument in &entry.function.arguments {
            match (&argument.binding, &module.types[argument.ty].inner) {
                (Some(Binding::Location { location, .. }), _) => {
                    reflection.vertex_inputs.push(*location)
                }
                (None, TypeInner::Struct { members, .. }) => {
                    reflection.vertex_inputs.extend(members.iter().filter_map(|member| {
                        match member.binding {
                            Some(Binding::Location { location, .. }) => Some(location),
                            _ => None,
                        }
                    }))
                }
                _ => (),
            }
        }
        reflection.vertex_inputs.sort_unstable();
    }

    Ok(reflection)
}

fn has_entry(module: &naga::Module, stage: ShaderStage, name: &str) -> bool {
    module
        .entry_points
        .iter()
        .any(|entry| entry.stage == stage && entry.name == name)
}

/// Combine the two stages into one program description.
///
/// The vertex module must provide `vs_main`, the fragment module `fs_main`,
/// and uniforms or textures declared in both must agree.
pub fn link(
    vertex: (&naga::Module, Reflection),
    fragment: (&naga::Module, Reflection),
) -> Result<Reflection, ShaderError> {
    if !has_entry(vertex.0, ShaderStage::Vertex, VERTEX_ENTRY) {
        return Err(ShaderError::Link(format!(
            "vertex stage has no @vertex fn {}",
            VERTEX_ENTRY
        )));
    }
    if !has_entry(fragment.0, ShaderStage::Fragment, FRAGMENT_ENTRY) {
        return Err(ShaderError::Link(format!(
            "fragment stage has no @fragment fn {}",
            FRAGMENT_ENTRY
        )));
    }

    let mut program = vertex.1;
    let fragment = fragment.1;

    for field in fragment.uniforms {
        match program.uniform(&field.name) {
            Some(existing) if *existing != field => {
                return Err(ShaderError::Link(format!(
                    "uniform `{}` is declared differently in the two stages",
                    field.name
                )));
            }
            Some(_) => (),
            None => program.uniforms.push(field),
        }
    }
    program.uniform_size = program.uniform_size.max(fragment.uniform_size);

    for slot in fragment.textures {
        match program.textures.iter().find(|t| t.binding == slot.binding) {
            Some(existing) if *existing != slot => {
                return Err(ShaderError::Link(format!(
                    "binding {} holds `{}` in one stage and `{}` in the other",
                    slot.binding, existing.name, slot.name
                )));
            }
            Some(_) => (),
            None => program.textures.push(slot),
        }
    }
    program.textures.sort_by_key(|slot| slot.binding);
    program.uniforms.sort_by_key(|field| field.offset);
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXTURED: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    tint: f32,
    use_texture: i32,
    layer: u32,
}
@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(1) @binding(0) var diffuse: texture_2d<f32>;
@group(1) @binding(1) var diffuse_sampler: sampler;
@group(1) @binding(2) var detail: texture_2d<f32>;
@group(1) @binding(3) var detail_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(2) uv: vec2<f32>,
}
struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip = uniforms.model * vec4<f32>(in.position, 1.0);
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let base = textureSample(diffuse, diffuse_sampler, in.uv);
    let extra = textureSample(detail, detail_sampler, in.uv);
    return base * extra * uniforms.tint;
}
"#;

    fn program(source: &str) -> Result<Reflection, ShaderError> {
        let vertex = compile("vertex", source)?;
        let fragment = compile("fragment", source)?;
        link((&vertex.0, vertex.1), (&fragment.0, fragment.1))
    }

    #[test]
    fn reflects_uniform_members_by_name() {
        let reflection = program(TEXTURED).unwrap();
        let names: Vec<_> = reflection.uniforms.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["model", "tint", "use_texture", "layer"]);
        assert_eq!(reflection.uniform("tint").unwrap().offset, 64);
        assert_eq!(reflection.uniform("use_texture").unwrap().kind, UniformKind::Int);
        assert_eq!(reflection.uniform("layer").unwrap().kind, UniformKind::Uint);
        // 64 + 3 * 4 = 76, rounded up to the 16 byte struct alignment
        assert_eq!(reflection.uniform_size, 80);
    }

    #[test]
    fn reflects_textures_in_binding_order() {
        let reflection = program(TEXTURED).unwrap();
        assert_eq!(reflection.texture_unit("diffuse"), Some(0));
        assert_eq!(reflection.texture_unit("detail"), Some(1));
        assert_eq!(reflection.textures[1].sampler_binding, 3);
    }

    #[test]
    fn reflects_vertex_inputs() {
        let reflection = program(TEXTURED).unwrap();
        assert_eq!(reflection.vertex_inputs, vec![0, 2]);
    }

    #[test]
    fn default_shader_declares_camera_uniforms() {
        let reflection = program(include_str!("default_shader.wgsl")).unwrap();
        assert!(reflection.uniform("model").is_some());
        assert!(reflection.uniform("view").is_some());
        assert!(reflection.uniform("projection").is_some());
        assert_eq!(reflection.uniform_size, 192);
        assert!(reflection.textures.is_empty());
    }

    #[test]
    fn syntax_errors_fail_compilation() {
        let err = compile("vertex", "fn vs_main( -> {").unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: "vertex", .. }));
    }

    #[test]
    fn type_errors_fail_validation() {
        let source = r#"
@vertex
fn vs_main() -> @builtin(position) vec4<f32> {
    let x: f32 = 1.0;
    return x;
}
"#;
        assert!(matches!(
            compile("vertex", source),
            Err(ShaderError::Compile { .. })
        ));
    }

    #[test]
    fn missing_entry_point_fails_linking() {
        let vertex_only = r#"
@vertex
fn vs_main() -> @builtin(position) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}
"#;
        assert!(matches!(program(vertex_only), Err(ShaderError::Link(_))));
    }

    #[test]
    fn texture_without_sampler_fails_linking() {
        let source = r#"
@group(1) @binding(0) var lonely: texture_2d<f32>;
@vertex
fn vs_main() -> @builtin(position) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return textureLoad(lonely, vec2<i32>(0, 0), 0);
}
"#;
        assert!(matches!(program(source), Err(ShaderError::Link(_))));
    }

    #[test]
    fn conflicting_stages_fail_linking() {
        let vertex = r#"
struct U { scale: f32 }
@group(0) @binding(0) var<uniform> u: U;
@vertex
fn vs_main() -> @builtin(position) vec4<f32> {
    return vec4<f32>(u.scale, 0.0, 0.0, 1.0);
}
"#;
        let fragment = r#"
struct U { scale: i32 }
@group(0) @binding(0) var<uniform> u: U;
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(f32(u.scale), 0.0, 0.0, 1.0);
}
"#;
        let vertex = compile("vertex", vertex).unwrap();
        let fragment = compile("fragment", fragment).unwrap();
        assert!(matches!(
            link((&vertex.0, vertex.1), (&fragment.0, fragment.1)),
            Err(ShaderError::Link(_))
        ));
    }
}
