use glwrap::{ModelLibrary, cgmath::Vector3, error::GltfError};

use crate::common::test_utils::{f32_bytes, glb, u16_bytes};

mod common;

const POSITIONS: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
const TEX_COORDS: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
const INDICES: [u16; 3] = [2, 1, 0];
const JOINTS: [u16; 12] = [0, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0];
const WEIGHTS: [f32; 12] = [0.5, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];

const DOCUMENT: &str = r#"{
    "asset": { "version": "2.0" },
    "buffers": [{ "byteLength": 140 }],
    "bufferViews": [
        { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
        { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
        { "buffer": 0, "byteOffset": 60, "byteLength": 6 },
        { "buffer": 0, "byteOffset": 68, "byteLength": 24 },
        { "buffer": 0, "byteOffset": 92, "byteLength": 48 }
    ],
    "accessors": [
        { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
          "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
        { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" },
        { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" },
        { "bufferView": 3, "componentType": 5123, "count": 3, "type": "VEC4" },
        { "bufferView": 4, "componentType": 5126, "count": 3, "type": "VEC4" }
    ],
    "meshes": [
        { "name": "Cube", "primitives": [
            { "attributes": { "POSITION": 0, "TEXCOORD_0": 1 }, "indices": 2 }
        ] },
        { "name": "Cube", "primitives": [
            { "attributes": { "POSITION": 0 } }
        ] },
        { "primitives": [
            { "attributes": { "POSITION": 0, "JOINTS_0": 3, "WEIGHTS_0": 4 } }
        ] }
    ],
    "nodes": [
        { "name": "root", "children": [1], "translation": [1.0, 2.0, 3.0] },
        { "name": "tip", "scale": [2.0, 2.0, 2.0] },
        { "mesh": 2, "skin": 0 }
    ],
    "skins": [{ "name": "Rig", "joints": [0, 1] }]
}"#;

fn document() -> Vec<u8> {
    let mut bin = f32_bytes(&POSITIONS);
    bin.extend(f32_bytes(&TEX_COORDS));
    bin.extend(u16_bytes(&INDICES));
    bin.extend([0, 0]);
    bin.extend(u16_bytes(&JOINTS));
    bin.extend(f32_bytes(&WEIGHTS));
    assert_eq!(bin.len(), 140);
    glb(DOCUMENT, &bin)
}

#[test]
fn should_postfix_model_names() {
    let mut library = ModelLibrary::new();
    let names = library.load_gltf_slice(&document(), None).unwrap();
    assert_eq!(names, vec!["Cube.0", "Cube.1", "mesh.0"]);

    let again = library.load_gltf_slice(&document(), None).unwrap();
    assert_eq!(again, vec!["Cube.2", "Cube.3", "mesh.1"]);
    assert_eq!(library.models.len(), 6);
}

#[test]
fn should_fill_fixed_attribute_slots() {
    let mut library = ModelLibrary::new();
    library.load_gltf_slice(&document(), None).unwrap();

    let cube = library.model("Cube.0").unwrap();
    assert_eq!(cube.meshes.len(), 1);
    let mesh = &cube.meshes[0];
    let sizes: Vec<u32> = mesh.attributes.iter().map(|a| a.size).collect();
    assert_eq!(sizes, vec![3, 3, 2, 3]);
    assert_eq!(mesh.attributes[0].data, POSITIONS);
    assert!(mesh.attributes[1].data.iter().all(|v| *v == 0.0));
    assert_eq!(mesh.attributes[2].data, TEX_COORDS);
    assert_eq!(mesh.attributes[3].data.len(), 9);
    assert!(mesh.attributes.iter().all(|a| a.element_count() == 3));
    assert_eq!(mesh.indices, vec![2, 1, 0]);
}

#[test]
fn should_index_sequentially_without_indices() {
    let mut library = ModelLibrary::new();
    library.load_gltf_slice(&document(), None).unwrap();

    let mesh = &library.model("Cube.1").unwrap().meshes[0];
    assert_eq!(mesh.indices, vec![0, 1, 2]);
}

#[test]
fn should_read_skinning_attributes() {
    let mut library = ModelLibrary::new();
    library.load_gltf_slice(&document(), None).unwrap();

    let mesh = &library.model("mesh.0").unwrap().meshes[0];
    assert_eq!(mesh.attributes.len(), 6);
    let joints: Vec<f32> = JOINTS.iter().map(|j| *j as f32).collect();
    assert_eq!(mesh.attributes[4].size, 4);
    assert_eq!(mesh.attributes[4].data, joints);
    assert_eq!(mesh.attributes[5].data, WEIGHTS);
}

#[test]
fn should_build_skeleton_hierarchy() {
    let mut library = ModelLibrary::new();
    library.load_gltf_slice(&document(), None).unwrap();

    let skeleton = library.skeleton("Rig.0").unwrap();
    assert_eq!(skeleton.bones.len(), 2);
    let root = skeleton.find("root").unwrap();
    let tip = skeleton.find("tip").unwrap();
    assert_eq!(skeleton.roots().collect::<Vec<_>>(), vec![root]);
    assert_eq!(skeleton.bones[root].children, vec![tip]);
    assert_eq!(skeleton.bones[tip].parent, Some(root));
    assert_eq!(skeleton.bones[root].local_position, Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(skeleton.bones[tip].local_scale, Vector3::new(2.0, 2.0, 2.0));
}

#[test]
fn should_reject_garbage() {
    let mut library = ModelLibrary::new();
    let result = library.load_gltf_slice(b"definitely not gltf", None);
    assert!(matches!(result, Err(GltfError::Parse(_))));
    assert!(library.models.is_empty());
}

#[tokio::test]
async fn should_load_from_disk() {
    let path = std::env::temp_dir().join(format!("glwrap-{}.glb", std::process::id()));
    tokio::fs::write(&path, document()).await.unwrap();

    let mut library = ModelLibrary::new();
    let names = library.load_gltf(&path).await.unwrap();
    assert_eq!(names.len(), 3);
    tokio::fs::remove_file(&path).await.unwrap();
}

#[tokio::test]
async fn should_report_missing_files() {
    let mut library = ModelLibrary::new();
    let result = library.load_gltf("does/not/exist.gltf").await;
    assert!(matches!(result, Err(GltfError::Io { .. })));
}
