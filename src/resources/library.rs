//! glTF import into CPU side models and skeletons.
//!
//! Every glTF mesh becomes a [`ModelData`] with one [`MeshData`] per
//! primitive. Attributes are stored in fixed slots so that shaders can rely
//! on them:
//!
//! | slot | attribute  | components |
//! |------|------------|------------|
//! | 0    | POSITION   | 3          |
//! | 1    | NORMAL     | 3          |
//! | 2    | TEXCOORD_0 | 2          |
//! | 3    | COLOR_0    | 3          |
//! | 4    | JOINTS_0   | 4          |
//! | 5    | WEIGHTS_0  | 4          |
//!
//! Slots 1 to 3 are zero filled when the primitive lacks them, joints and
//! weights are only present on skinned primitives.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use cgmath::{Quaternion, Vector3};

use crate::{
    data_structures::{
        mesh::{AttributeData, MeshData},
        model::ModelData,
        skeleton::{Bone, Skeleton},
    },
    error::GltfError,
    resources::load_binary,
};

pub const POSITION_SLOT: u32 = 0;
pub const NORMAL_SLOT: u32 = 1;
pub const TEX_COORD_SLOT: u32 = 2;
pub const COLOR_SLOT: u32 = 3;
pub const JOINTS_SLOT: u32 = 4;
pub const WEIGHTS_SLOT: u32 = 5;

/// Models and skeletons by name, as loaded from one or more glTF files.
#[derive(Clone, Debug, Default)]
pub struct ModelLibrary {
    pub models: BTreeMap<String, ModelData>,
    pub skeletons: BTreeMap<String, Skeleton>,
}

/// `"<base>.<n>"` with the smallest `n` that is not a key of `taken` yet.
fn unique_name<V>(taken: &BTreeMap<String, V>, base: &str) -> String {
    (0..)
        .map(|n| format!("{}.{}", base, n))
        .find(|name| !taken.contains_key(name))
        .unwrap_or_else(|| base.to_string())
}

impl ModelLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `.gltf` or `.glb` file. External buffers are resolved relative
    /// to the file. Returns the names the new models were stored under.
    pub async fn load_gltf(&mut self, path: impl AsRef<Path>) -> Result<Vec<String>, GltfError> {
        let path = path.as_ref();
        let bytes = load_binary(path).await.map_err(|source| GltfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_else(PathBuf::new);
        let names = self.load_gltf_slice(&bytes, Some(&base))?;
        log::info!("{}: loaded {} models", path.display(), names.len());
        Ok(names)
    }

    /// Load glTF JSON or GLB from memory. `base` resolves relative buffer URIs.
    pub fn load_gltf_slice(&mut self, bytes: &[u8], base: Option<&Path>) -> Result<Vec<String>, GltfError> {
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
        let buffers = gltf::import_buffers(&document, base, blob)?;

        let mut names = Vec::new();
        for mesh in document.meshes() {
            let mesh_name = mesh.name().unwrap_or("mesh");
            let meshes = mesh
                .primitives()
                .enumerate()
                .map(|(idx, primitive)| read_primitive(&buffers, mesh_name, idx, &primitive))
                .collect::<Result<Vec<_>, GltfError>>()?;
            let name = unique_name(&self.models, mesh_name);
            log::debug!("{}: {} primitives", name, meshes.len());
            self.models.insert(name.clone(), ModelData { meshes });
            names.push(name);
        }

        for skin in document.skins() {
            let name = unique_name(&self.skeletons, skin.name().unwrap_or("skin"));
            let skeleton = read_skin(&skin);
            log::debug!("{}: {} bones", name, skeleton.bones.len());
            self.skeletons.insert(name, skeleton);
        }
        Ok(names)
    }

    pub fn model(&self, name: &str) -> Option<&ModelData> {
        self.models.get(name)
    }

    pub fn skeleton(&self, name: &str) -> Option<&Skeleton> {
        self.skeletons.get(name)
    }
}

fn read_primitive(
    buffers: &[gltf::buffer::Data],
    mesh_name: &str,
    idx: usize,
    primitive: &gltf::Primitive<'_>,
) -> Result<MeshData, GltfError> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|positions| positions.collect())
        .ok_or_else(|| GltfError::MissingPositions {
            mesh: mesh_name.to_string(),
            primitive: idx,
        })?;
    let vertices = positions.len();

    let mut attributes = vec![AttributeData::new(positions.into_flattened(), 3)];
    attributes.push(
        reader
            .read_normals()
            .map(|normals| AttributeData::new(normals.flatten().collect(), 3))
            .unwrap_or_else(|| AttributeData::zeroed(vertices, 3)),
    );
    attributes.push(
        reader
            .read_tex_coords(0)
            .map(|uvs| AttributeData::new(uvs.into_f32().flatten().collect(), 2))
            .unwrap_or_else(|| AttributeData::zeroed(vertices, 2)),
    );
    attributes.push(
        reader
            .read_colors(0)
            .map(|colors| AttributeData::new(colors.into_rgb_f32().flatten().collect(), 3))
            .unwrap_or_else(|| AttributeData::zeroed(vertices, 3)),
    );
    if let Some(joints) = reader.read_joints(0) {
        let joints = joints.into_u16().flatten().map(f32::from).collect();
        attributes.push(AttributeData::new(joints, 4));
        if let Some(weights) = reader.read_weights(0) {
            attributes.push(AttributeData::new(weights.into_f32().flatten().collect(), 4));
        }
    }

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices as u32).collect(),
    };

    Ok(MeshData {
        attributes,
        indices,
    })
}

fn read_skin(skin: &gltf::Skin<'_>) -> Skeleton {
    let joints: Vec<gltf::Node<'_>> = skin.joints().collect();
    let joint_index = |node: &gltf::Node<'_>| joints.iter().position(|j| j.index() == node.index());

    let mut bones: Vec<Bone> = joints
        .iter()
        .map(|node| {
            let (translation, [x, y, z, w], scale) = node.transform().decomposed();
            Bone {
                name: node.name().unwrap_or_default().to_string(),
                local_position: Vector3::from(translation),
                local_rotation: Quaternion::new(w, x, y, z),
                local_scale: Vector3::from(scale),
                parent: None,
                children: node.children().filter_map(|child| joint_index(&child)).collect(),
            }
        })
        .collect();

    for parent in 0..bones.len() {
        for child in bones[parent].children.clone() {
            bones[child].parent = Some(parent);
        }
    }
    Skeleton { bones }
}
