//! Everything involved in getting a scene file onto the GPU.
//!
//! A [`scene::SceneParser`] turns a file into a [`scene::ParsedScene`]; the
//! [`Importer`] walks its node tree, converts every referenced mesh into
//! [`ModelVertex`]es and indices, resolves material textures through the
//! [`TextureCache`] and returns the flattened [`Model`].

use std::{path::Path, rc::Rc};

use anyhow::bail;

use crate::{
    context::Gpu,
    data_structures::{
        model::{Mesh, Model, ModelVertex},
        texture::{Texture, TextureKind},
    },
    resources::{
        gltf_scene::GltfParser,
        obj_scene::ObjParser,
        scene::{ParsedScene, RawMesh, SceneNode, SceneParser},
    },
};

pub use texture::TextureCache;

pub mod gltf_scene;
pub mod obj_scene;
pub mod postprocess;
pub mod scene;
pub mod texture;

/// Lifecycle of an [`Importer`]. An importer runs once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportState {
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

/// Turns one parsed scene into a [`Model`].
///
/// Nodes are visited depth first, a node's own meshes before its children.
/// Failures never abort the program: a scene that cannot be parsed yields a
/// model without meshes, a mesh that cannot be built is skipped.
pub struct Importer<'a, G: Gpu> {
    gpu: &'a G,
    cache: &'a mut TextureCache<G>,
    state: ImportState,
}

impl<'a, G: Gpu> Importer<'a, G> {
    pub fn new(gpu: &'a G, cache: &'a mut TextureCache<G>) -> Self {
        Self {
            gpu,
            cache,
            state: ImportState::NotLoaded,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn import(&mut self, parser: &dyn SceneParser, path: &Path) -> Model<G> {
        let name = path.display().to_string();
        let mut model = Model::empty(&name);
        if self.state != ImportState::NotLoaded {
            log::warn!(
                "Importer already ran ({:?}), {} is not imported",
                self.state,
                name
            );
            return model;
        }
        self.state = ImportState::Loading;

        let scene = match parser.parse(path) {
            Ok(scene) => scene,
            Err(e) => {
                log::error!("Could not import {}: {:#}", name, e);
                self.state = ImportState::Failed;
                return model;
            }
        };
        if scene.incomplete {
            log::error!("Could not import {}: the scene is incomplete", name);
            self.state = ImportState::Failed;
            return model;
        }
        let Some(root) = &scene.root else {
            log::error!("Could not import {}: the scene has no root node", name);
            self.state = ImportState::Failed;
            return model;
        };

        // texture paths in materials are relative to the scene file
        let directory = path.parent().unwrap_or(Path::new(""));
        self.process_node(root, &scene, directory, &mut model.meshes);
        self.state = ImportState::Loaded;
        log::info!(
            "Imported {} with {} meshes, {} textures cached",
            name,
            model.meshes.len(),
            self.cache.len()
        );
        model
    }

    fn process_node(
        &mut self,
        node: &SceneNode,
        scene: &ParsedScene,
        directory: &Path,
        meshes: &mut Vec<Mesh<G>>,
    ) {
        for &idx in &node.meshes {
            let Some(raw) = scene.meshes.get(idx) else {
                log::warn!(
                    "Node {} references mesh {} but the scene only has {}",
                    node.name,
                    idx,
                    scene.meshes.len()
                );
                continue;
            };
            if let Some(mesh) = self.process_mesh(raw, scene, directory) {
                meshes.push(mesh);
            }
        }
        for child in &node.children {
            self.process_node(child, scene, directory, meshes);
        }
    }

    fn process_mesh(&mut self, raw: &RawMesh, scene: &ParsedScene, directory: &Path) -> Option<Mesh<G>> {
        if raw.faces.is_empty() {
            log::warn!("Mesh {} has no faces and is skipped", raw.name);
            return None;
        }
        let vertices = to_vertices(raw);
        let indices = raw.faces.iter().flatten().copied().collect();
        let textures = self.process_textures(raw, scene, directory);

        match Mesh::new(self.gpu, &raw.name, vertices, indices, textures) {
            Ok(mesh) => Some(mesh),
            Err(e) => {
                log::warn!("{:#}", e);
                None
            }
        }
    }

    fn process_textures(
        &mut self,
        raw: &RawMesh,
        scene: &ParsedScene,
        directory: &Path,
    ) -> Vec<(TextureKind, Rc<Texture<G>>)> {
        let Some(material) = raw.material.and_then(|idx| scene.materials.get(idx)) else {
            return Vec::new();
        };
        let mut textures = Vec::new();
        for kind in TextureKind::SLOTS {
            for relative in material.textures(kind) {
                let path = resolve_texture_path(directory, relative);
                textures.push((kind, self.cache.acquire(self.gpu, &path, kind)));
            }
        }
        textures
    }
}

/// Vertices in engine format. UV-less meshes get zero texture coordinates
/// and zero tangent space.
fn to_vertices(raw: &RawMesh) -> Vec<ModelVertex> {
    raw.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let mut vertex = ModelVertex {
                position,
                normal: raw.normals.get(i).copied().unwrap_or_default(),
                ..Default::default()
            };
            if let Some(tex_coords) = &raw.tex_coords {
                vertex.tex_coords = tex_coords.get(i).copied().unwrap_or_default();
                vertex.tangent = raw.tangents.get(i).copied().unwrap_or_default();
                vertex.bitangent = raw.bitangents.get(i).copied().unwrap_or_default();
            }
            vertex
        })
        .collect()
}

/// Join a material's texture reference onto the scene directory.
///
/// Backslash separators, common in MTL files written on Windows, are turned
/// into forward slashes first.
pub fn resolve_texture_path(directory: &Path, relative: &str) -> String {
    directory
        .join(relative.replace('\\', "/"))
        .to_string_lossy()
        .into_owned()
}

/// The parser for `path`, chosen by file extension.
pub fn parser_for(path: &Path) -> anyhow::Result<Box<dyn SceneParser>> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "obj" => Ok(Box::new(ObjParser)),
        "gltf" | "glb" => Ok(Box::new(GltfParser)),
        _ => bail!("No scene parser for {}", path.display()),
    }
}

/// Import the scene at `path` with the parser matching its extension.
pub fn load_model<G: Gpu>(gpu: &G, cache: &mut TextureCache<G>, path: &Path) -> Model<G> {
    match parser_for(path) {
        Ok(parser) => Importer::new(gpu, cache).import(parser.as_ref(), path),
        Err(e) => {
            log::error!("Could not import {}: {:#}", path.display(), e);
            Model::empty(&path.display().to_string())
        }
    }
}
