use std::path::Path;

use anyhow::Context;

use crate::{
    data_structures::texture::TextureKind,
    resources::{
        postprocess::{smooth_normals, split_tangents, tangent_space},
        scene::{ParsedScene, RawMaterial, RawMesh, SceneNode, SceneParser},
    },
};

/// glTF 2.0 scenes (`.gltf` with external buffers, or `.glb`).
///
/// Every triangle primitive becomes one raw mesh and nodes list the
/// primitives of their mesh. Only images referenced by URI can be resolved
/// to a texture path; embedded images are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfParser;

impl SceneParser for GltfParser {
    fn parse(&self, path: &Path) -> anyhow::Result<ParsedScene> {
        let gltf::Gltf { document, blob } = gltf::Gltf::open(path)
            .with_context(|| format!("Could not parse {}", path.display()))?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)
            .with_context(|| format!("Could not load the buffers of {}", path.display()))?;

        let mut meshes = Vec::new();
        // raw mesh indices of every glTF mesh, indexed by glTF mesh index
        let mut primitives_of_mesh = Vec::new();
        for mesh in document.meshes() {
            let mut ids = Vec::new();
            for primitive in mesh.primitives() {
                let name = format!(
                    "{}#{}",
                    mesh.name().unwrap_or("unknown_mesh"),
                    primitive.index()
                );
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "Primitive {} of {} is drawn as {:?}, only triangles are supported",
                        name,
                        path.display(),
                        primitive.mode()
                    );
                    continue;
                }
                let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
                let Some(positions) = reader.read_positions() else {
                    log::warn!("Primitive {} of {} has no positions", name, path.display());
                    continue;
                };
                let positions: Vec<[f32; 3]> = positions.collect();
                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().collect(),
                    None => (0..positions.len() as u32).collect(),
                };
                let faces: Vec<[u32; 3]> = indices
                    .chunks_exact(3)
                    .map(|f| [f[0], f[1], f[2]])
                    .collect();
                let normals = match reader.read_normals() {
                    Some(normals) => normals.collect(),
                    None => smooth_normals(&positions, &faces),
                };
                let tex_coords: Option<Vec<[f32; 2]>> =
                    reader.read_tex_coords(0).map(|uv| uv.into_f32().collect());
                let (tangents, bitangents) = match (reader.read_tangents(), &tex_coords) {
                    (Some(tangents), _) => {
                        let tangents: Vec<[f32; 4]> = tangents.collect();
                        split_tangents(&normals, &tangents)
                    }
                    (None, Some(tex_coords)) => tangent_space(&positions, tex_coords, &faces),
                    (None, None) => (Vec::new(), Vec::new()),
                };

                ids.push(meshes.len());
                meshes.push(RawMesh {
                    name,
                    positions,
                    normals,
                    tex_coords,
                    tangents,
                    bitangents,
                    faces,
                    material: primitive.material().index(),
                });
            }
            primitives_of_mesh.push(ids);
        }

        let materials = document
            .materials()
            .map(|material| to_raw_material(&material, path))
            .collect();

        let root = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .map(|scene| SceneNode {
                name: scene.name().unwrap_or("scene").to_string(),
                meshes: Vec::new(),
                children: scene
                    .nodes()
                    .map(|node| to_scene_node(&node, &primitives_of_mesh))
                    .collect(),
            });

        Ok(ParsedScene {
            root,
            meshes,
            materials,
            incomplete: false,
        })
    }
}

fn to_scene_node(node: &gltf::Node, primitives_of_mesh: &[Vec<usize>]) -> SceneNode {
    SceneNode {
        name: node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node{}", node.index())),
        meshes: node
            .mesh()
            .and_then(|mesh| primitives_of_mesh.get(mesh.index()))
            .cloned()
            .unwrap_or_default(),
        children: node
            .children()
            .map(|child| to_scene_node(&child, primitives_of_mesh))
            .collect(),
    }
}

fn to_raw_material(material: &gltf::Material, path: &Path) -> RawMaterial {
    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("material{}", material.index().unwrap_or(0)));
    let pbr = material.pbr_metallic_roughness();
    let slots = [
        (
            TextureKind::Diffuse,
            pbr.base_color_texture().map(|info| info.texture()),
        ),
        (
            TextureKind::Normal,
            material.normal_texture().map(|normal| normal.texture()),
        ),
        (
            TextureKind::Lightmap,
            material.occlusion_texture().map(|occlusion| occlusion.texture()),
        ),
        (
            TextureKind::Emissive,
            material.emissive_texture().map(|info| info.texture()),
        ),
        (
            TextureKind::Unknown,
            pbr.metallic_roughness_texture().map(|info| info.texture()),
        ),
    ];

    let mut textures = Vec::new();
    for (kind, texture) in slots {
        let Some(texture) = texture else { continue };
        match texture.source().source() {
            gltf::image::Source::Uri { uri, .. } => match image_path(uri) {
                Some(relative) => textures.push((kind, relative)),
                None => log::warn!(
                    "{} texture of material {} in {} is a data URI and cannot be loaded by path",
                    kind,
                    name,
                    path.display()
                ),
            },
            gltf::image::Source::View { .. } => log::warn!(
                "{} texture of material {} in {} is embedded and cannot be loaded by path",
                kind,
                name,
                path.display()
            ),
        }
    }

    RawMaterial { name, textures }
}

/// File path of an image URI relative to the scene file. `None` for `data:`
/// URIs, which carry the image inline.
pub fn image_path(uri: &str) -> Option<String> {
    if uri.starts_with("data:") {
        return None;
    }
    match urlencoding::decode(uri) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(err) => {
            log::warn!("Image URI {} is not valid UTF-8 once decoded: {}", uri, err);
            Some(uri.to_string())
        }
    }
}
