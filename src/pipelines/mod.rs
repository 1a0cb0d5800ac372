//! Shader programs and the render pipelines built from them.
//!
//! - `reflect`: WGSL compilation checks and resource reflection
//! - `uniforms`: named uniform values and their byte layout
//! - `shader`: the [`Shader`](shader::Shader) program object
//! - `basic`: the render pipeline descriptor shared by all shaders

pub mod basic;
pub mod reflect;
pub mod shader;
pub mod uniforms;
