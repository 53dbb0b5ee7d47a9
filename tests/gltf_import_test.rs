use std::rc::Rc;

use flow_viewer::{
    data_structures::texture::TextureKind,
    resources::{
        TextureCache,
        gltf_scene::{GltfParser, image_path},
        load_model,
        scene::SceneParser,
    },
};

mod common;
use common::test_utils::{RecordingGpu, TempDir, write_png};

// One triangle (positions, uvs, u32 indices) used by two nodes, plus a point
// cloud primitive that must be skipped.
const SCENE: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [ { "name": "main", "nodes": [0, 1] } ],
  "nodes": [
    { "name": "left", "mesh": 0 },
    { "name": "right", "mesh": 0, "translation": [2.0, 0.0, 0.0], "children": [2] },
    { "name": "points", "mesh": 1 }
  ],
  "meshes": [
    { "name": "tri", "primitives": [ { "attributes": { "POSITION": 0, "TEXCOORD_0": 1 }, "indices": 2, "material": 0 } ] },
    { "name": "cloud", "primitives": [ { "attributes": { "POSITION": 0 }, "mode": 0 } ] }
  ],
  "materials": [
    {
      "name": "wood",
      "pbrMetallicRoughness": {
        "baseColorTexture": { "index": 0 },
        "metallicRoughnessTexture": { "index": 1 }
      }
    }
  ],
  "textures": [ { "source": 0 }, { "source": 1 } ],
  "images": [ { "uri": "tex.png" }, { "uri": "mr.png" } ],
  "buffers": [ { "uri": "tri.bin", "byteLength": 72 } ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
    { "buffer": 0, "byteOffset": 60, "byteLength": 12 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" },
    { "bufferView": 2, "componentType": 5125, "count": 3, "type": "SCALAR" }
  ]
}"#;

fn triangle_buffer() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let uvs: [f32; 6] = [0.0, 1.0, 1.0, 1.0, 0.0, 0.0];
    let indices: [u32; 3] = [0, 1, 2];
    let mut bytes = Vec::with_capacity(72);
    positions.iter().for_each(|v| bytes.extend_from_slice(&v.to_le_bytes()));
    uvs.iter().for_each(|v| bytes.extend_from_slice(&v.to_le_bytes()));
    indices.iter().for_each(|v| bytes.extend_from_slice(&v.to_le_bytes()));
    bytes
}

fn fixture(name: &str) -> TempDir {
    let dir = TempDir::new(name);
    dir.write("scene.gltf", SCENE);
    dir.write("tri.bin", triangle_buffer());
    write_png(&dir.join("tex.png"), 2, 2, [90, 60, 30, 255]);
    dir
}

#[test]
fn parses_nodes_meshes_and_materials() {
    let dir = fixture("gltf-parse");
    let scene = GltfParser.parse(&dir.join("scene.gltf")).unwrap();

    // the point cloud is not a raw mesh
    assert_eq!(scene.meshes.len(), 1);
    let mesh = &scene.meshes[0];
    assert_eq!(mesh.name, "tri#0");
    assert_eq!(mesh.positions[1], [1.0, 0.0, 0.0]);
    assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    assert_eq!(mesh.tex_coords.as_ref().unwrap()[0], [0.0, 1.0]);
    assert_eq!(mesh.material, Some(0));
    for normal in &mesh.normals {
        assert!((normal[2] - 1.0).abs() < 1e-5, "{:?}", normal);
    }
    assert_eq!(mesh.tangents.len(), 3);

    let root = scene.root.as_ref().unwrap();
    assert_eq!(root.name, "main");
    let names: Vec<&str> = root.children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["left", "right"]);
    assert_eq!(root.children[0].meshes, vec![0]);
    assert_eq!(root.children[1].meshes, vec![0]);
    assert_eq!(root.children[1].children[0].name, "points");
    assert!(root.children[1].children[0].meshes.is_empty());

    let material = &scene.materials[0];
    assert_eq!(material.name, "wood");
    assert_eq!(
        material.textures(TextureKind::Diffuse).collect::<Vec<_>>(),
        vec!["tex.png"]
    );
    assert_eq!(
        material.textures(TextureKind::Unknown).collect::<Vec<_>>(),
        vec!["mr.png"]
    );
}

#[test]
fn two_nodes_share_one_uploaded_texture() {
    let dir = fixture("gltf-load");
    let gpu = RecordingGpu::new();
    let mut cache = TextureCache::new();
    let model = load_model(&gpu, &mut cache, &dir.join("scene.gltf"));

    assert_eq!(model.meshes.len(), 2);
    let left = &model.meshes[0].textures()[0];
    let right = &model.meshes[1].textures()[0];
    assert_eq!(left.kind, TextureKind::Diffuse);
    assert!(Rc::ptr_eq(&left.texture, &right.texture));
    assert!(left.texture.is_valid());

    // tex.png once, mr.png missing and cached as invalid
    assert_eq!(gpu.texture_uploads(), 1);
    assert_eq!(cache.len(), 2);
    let unknown = &model.meshes[0].textures()[1];
    assert_eq!((unknown.unit, unknown.kind), (1, TextureKind::Unknown));
    assert!(!unknown.texture.is_valid());
}

#[test]
fn a_missing_buffer_is_an_error() {
    let dir = TempDir::new("gltf-no-bin");
    dir.write("scene.gltf", SCENE);
    assert!(GltfParser.parse(&dir.join("scene.gltf")).is_err());
}

#[test]
fn image_uris_are_percent_decoded_and_data_uris_skipped() {
    let dir = TempDir::new("gltf-uris");
    let scene = SCENE.replace(
        r#"[ { "uri": "tex.png" }, { "uri": "mr.png" } ]"#,
        r#"[ { "uri": "my%20tex.png" }, { "uri": "data:image/png;base64,iVBORw0KGgo=" } ]"#,
    );
    assert!(scene.contains("my%20tex.png"));
    dir.write("scene.gltf", scene);
    dir.write("tri.bin", triangle_buffer());
    write_png(&dir.join("my tex.png"), 2, 2, [1, 2, 3, 255]);

    let parsed = GltfParser.parse(&dir.join("scene.gltf")).unwrap();
    let material = &parsed.materials[0];
    assert_eq!(
        material.textures(TextureKind::Diffuse).collect::<Vec<_>>(),
        vec!["my tex.png"]
    );
    assert_eq!(material.textures(TextureKind::Unknown).count(), 0);

    let gpu = RecordingGpu::new();
    let mut cache = TextureCache::new();
    let model = load_model(&gpu, &mut cache, &dir.join("scene.gltf"));
    assert!(model.meshes[0].textures()[0].texture.is_valid());
    assert_eq!(model.meshes[0].textures().len(), 1);
}

#[test]
fn image_path_keeps_plain_relative_paths() {
    assert_eq!(image_path("textures/wood.png").as_deref(), Some("textures/wood.png"));
    assert_eq!(image_path("a%2Fb.png").as_deref(), Some("a/b.png"));
    assert_eq!(image_path("data:image/png;base64,AAAA"), None);
}
