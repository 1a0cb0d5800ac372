//! Engine data structures: transforms, meshes, models, textures and skeletons.
//!
//! - `transform` holds world-space position, Euler rotation and scale
//! - `mesh` contains per-slot vertex attribute buffers and index data
//! - `model` groups meshes that are drawn together
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `skeleton` holds bone hierarchies read from glTF skins

pub mod mesh;
pub mod model;
pub mod skeleton;
pub mod texture;
pub mod transform;
