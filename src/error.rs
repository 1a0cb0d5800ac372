//! Typed failures for the resource modules.
//!
//! The engine surface works with `anyhow::Result`; these enums are what the
//! lower layers return so callers can match on the kind of failure.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to compile {stage} stage: {message}")]
    Compile { stage: &'static str, message: String },
    #[error("failed to link program: {0}")]
    Link(String),
    #[error("uniform `{name}` is a {expected} but a {actual} was set")]
    UniformKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("attribute at layout {layout} has {size} components, only 1 to 4 are supported")]
    AttributeSize { layout: u32, size: u32 },
    #[error("attribute at layout {layout} has {len} floats, which is not a multiple of {size}")]
    AttributeLength { layout: u32, len: usize, size: u32 },
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has zero extent ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

#[derive(Debug, Error)]
pub enum GltfError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load glTF: {0}")]
    Parse(#[from] gltf::Error),
    #[error("primitive {primitive} of mesh `{mesh}` has no POSITION attribute")]
    MissingPositions { mesh: String, primitive: usize },
}
