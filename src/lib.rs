//! glwrap
//!
//! A thin rendering scaffold over wgpu, winit and glTF. The crate gives a
//! small surface for compiling shaders with named uniforms, loading textures
//! and glTF meshes, placing objects and cameras in the world and running them
//! inside a window.
//!
//! High-level modules
//! - `camera`: perspective and orthographic cameras writing `view`/`projection`
//! - `context`: surface, device, queue and depth buffer of the window
//! - `data_structures`: transforms, meshes, models, textures and skeletons
//! - `flow`: the engine object, the [`Scene`] trait and the event loop
//! - `input`: keyboard and mouse state collected per frame
//! - `pipelines`: shader programs, reflection and pipeline construction
//! - `resources`: file loading and the glTF model library
//! - `render`: render composition for drawing instanced models
//! - `window`: window settings and cursor modes
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod input;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod time;
pub mod window;

#[cfg(test)]
mod test_utils;

pub use camera::Camera;
pub use data_structures::{
    mesh::{BufferUsage, Mesh},
    model::Model,
    skeleton::Skeleton,
    texture::{Channels, FilterMode, Texture2D},
    transform::Transform,
};
pub use flow::{Engine, Scene, run};
pub use input::{ElementState, InputState, KeyCode, MouseButton};
pub use pipelines::{
    shader::Shader,
    uniforms::{UniformValue, Uniforms},
};
pub use render::{Instanced, Render};
pub use resources::ModelLibrary;
pub use window::{CursorMode, WindowConfig};

// Re-exports commonly used crates for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit;
