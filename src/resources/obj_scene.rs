use std::path::Path;

use anyhow::Context;

use crate::{
    data_structures::texture::TextureKind,
    resources::{
        postprocess::{smooth_normals, tangent_space},
        scene::{ParsedScene, RawMaterial, RawMesh, SceneNode, SceneParser},
    },
};

/// Wavefront OBJ/MTL scenes via `tobj`.
///
/// OBJ has no hierarchy: every object becomes a child of one root node. UVs
/// are flipped vertically to match wgpu's top-left texture origin, missing
/// normals are generated and tangents are computed whenever UVs exist.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjParser;

impl SceneParser for ObjParser {
    fn parse(&self, path: &Path) -> anyhow::Result<ParsedScene> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .with_context(|| format!("Could not parse {}", path.display()))?;

        let materials = match materials {
            Ok(materials) => materials,
            Err(e) => {
                log::warn!(
                    "Materials of {} could not be loaded ({}), textures are skipped",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        let meshes: Vec<RawMesh> = models.iter().map(to_raw_mesh).collect();
        let root = SceneNode {
            name: path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            meshes: Vec::new(),
            children: models
                .iter()
                .enumerate()
                .map(|(idx, model)| SceneNode {
                    name: model.name.clone(),
                    meshes: vec![idx],
                    children: Vec::new(),
                })
                .collect(),
        };

        Ok(ParsedScene {
            root: Some(root),
            meshes,
            materials: materials.iter().map(to_raw_material).collect(),
            incomplete: false,
        })
    }
}

fn to_raw_mesh(model: &tobj::Model) -> RawMesh {
    let mesh = &model.mesh;
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let faces: Vec<[u32; 3]> = mesh
        .indices
        .chunks_exact(3)
        .map(|f| [f[0], f[1], f[2]])
        .collect();
    let normals = if mesh.normals.is_empty() {
        smooth_normals(&positions, &faces)
    } else {
        mesh.normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect()
    };
    let tex_coords: Option<Vec<[f32; 2]>> = (!mesh.texcoords.is_empty()).then(|| {
        mesh.texcoords
            .chunks_exact(2)
            .map(|uv| [uv[0], 1.0 - uv[1]])
            .collect()
    });
    let (tangents, bitangents) = match &tex_coords {
        Some(tex_coords) => tangent_space(&positions, tex_coords, &faces),
        None => (Vec::new(), Vec::new()),
    };

    RawMesh {
        name: model.name.clone(),
        positions,
        normals,
        tex_coords,
        tangents,
        bitangents,
        faces,
        material: mesh.material_id,
    }
}

fn to_raw_material(material: &tobj::Material) -> RawMaterial {
    let mut textures = Vec::new();
    let mut push = |kind: TextureKind, path: Option<&String>| {
        if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
            textures.push((kind, path.trim().to_string()));
        }
    };
    push(TextureKind::Diffuse, material.diffuse_texture.as_ref());
    push(TextureKind::Specular, material.specular_texture.as_ref());
    push(TextureKind::Ambient, material.ambient_texture.as_ref());
    // tobj reads `map_Bump`/`bump` into `normal_texture`; those are height maps
    push(TextureKind::Height, material.normal_texture.as_ref());
    push(TextureKind::Shininess, material.shininess_texture.as_ref());
    push(TextureKind::Opacity, material.dissolve_texture.as_ref());
    // tobj keeps statements it does not know about as raw key/value pairs
    for (key, kind) in [
        ("map_Ke", TextureKind::Emissive),
        ("norm", TextureKind::Normal),
        ("disp", TextureKind::Displacement),
        ("refl", TextureKind::Reflection),
    ] {
        push(kind, material.unknown_param.get(key));
    }

    RawMaterial {
        name: material.name.clone(),
        textures,
    }
}
