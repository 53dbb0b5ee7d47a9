//! What a scene parser hands to the importer.
//!
//! Parsers produce a flat array of raw meshes and materials plus a node tree
//! that references meshes by index. Faces are triangles; parsers are
//! responsible for triangulating.

use std::path::Path;

use crate::data_structures::texture::TextureKind;

#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: String,
    /// Indices into [`ParsedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

#[derive(Clone, Debug, Default)]
pub struct RawMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// First UV channel, if the mesh has one.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub tangents: Vec<[f32; 3]>,
    pub bitangents: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    /// Index into [`ParsedScene::materials`].
    pub material: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct RawMaterial {
    pub name: String,
    /// Texture references as written in the material, relative to the scene file.
    pub textures: Vec<(TextureKind, String)>,
}

impl RawMaterial {
    pub fn textures(&self, kind: TextureKind) -> impl Iterator<Item = &str> + '_ {
        self.textures
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, path)| path.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParsedScene {
    pub root: Option<SceneNode>,
    pub meshes: Vec<RawMesh>,
    pub materials: Vec<RawMaterial>,
    /// Set when the parser could only read part of the file.
    pub incomplete: bool,
}

/// Parses a 3D scene file into a node hierarchy with meshes and materials.
pub trait SceneParser {
    fn parse(&self, path: &Path) -> anyhow::Result<ParsedScene>;
}
