//! Vertices, meshes and models.
//!
//! A [`Mesh`] is one immutable GPU batch built from a single source sub-mesh.
//! It owns its vertices and indices, shares its textures with every other
//! mesh that references the same file and draws itself into anything that
//! implements [`DrawMesh`].

use std::{mem, ops::Range, rc::Rc};

use anyhow::*;

use crate::{
    context::Gpu,
    data_structures::texture::{Texture, TextureKind},
};

/// Number of bone index/weight pairs carried by every vertex.
pub const MAX_BONE_INFLUENCE: usize = 4;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    // Reserved for skinning, nothing fills these yet
    pub bone_ids: [i32; MAX_BONE_INFLUENCE],
    pub bone_weights: [f32; MAX_BONE_INFLUENCE],
}

impl ModelVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = [
        wgpu::VertexAttribute {
            offset: mem::offset_of!(ModelVertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: mem::offset_of!(ModelVertex, normal) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: mem::offset_of!(ModelVertex, tex_coords) as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
        wgpu::VertexAttribute {
            offset: mem::offset_of!(ModelVertex, tangent) as wgpu::BufferAddress,
            shader_location: 3,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: mem::offset_of!(ModelVertex, bitangent) as wgpu::BufferAddress,
            shader_location: 4,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: mem::offset_of!(ModelVertex, bone_ids) as wgpu::BufferAddress,
            shader_location: 5,
            format: wgpu::VertexFormat::Sint32x4,
        },
        wgpu::VertexAttribute {
            offset: mem::offset_of!(ModelVertex, bone_weights) as wgpu::BufferAddress,
            shader_location: 6,
            format: wgpu::VertexFormat::Float32x4,
        },
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// One row of a mesh's binding table: which texture goes to which unit.
pub struct TextureBinding<G: Gpu> {
    pub unit: u32,
    /// The slot the mesh's material requested the texture for. This can
    /// differ from [`Texture::kind`], which is set by the first requester.
    pub kind: TextureKind,
    pub texture: Rc<Texture<G>>,
}

/// Something meshes can be drawn into.
///
/// Texture units are numbered from 0. A unit keeps its texture until it is
/// rebound; `set_active_unit` selects the unit subsequent state refers to.
pub trait DrawMesh<G: Gpu> {
    fn bind_texture(&mut self, unit: u32, texture: &G::Texture);

    /// Issue one indexed triangle-list draw.
    fn draw_elements(&mut self, vertices: &G::Buffer, indices: &G::Buffer, range: Range<u32>);

    fn set_active_unit(&mut self, unit: u32);
}

pub struct Mesh<G: Gpu> {
    name: String,
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
    textures: Vec<TextureBinding<G>>,
    vertex_buffer: G::Buffer,
    index_buffer: G::Buffer,
}

impl<G: Gpu> Mesh<G> {
    /// Validate the triangle list and upload it.
    ///
    /// Textures are bound to consecutive units in the order given.
    pub fn new(
        gpu: &G,
        name: &str,
        vertices: Vec<ModelVertex>,
        indices: Vec<u32>,
        textures: Vec<(TextureKind, Rc<Texture<G>>)>,
    ) -> Result<Self> {
        ensure!(
            indices.len() % 3 == 0,
            "Mesh {} has {} indices which is not a triangle list",
            name,
            indices.len()
        );
        if let Some(index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            bail!(
                "Mesh {} references vertex {} but only has {} vertices",
                name,
                index,
                vertices.len()
            );
        }

        let vertex_buffer = gpu.upload_vertices(name, &vertices);
        let index_buffer = gpu.upload_indices(name, &indices);
        let textures = textures
            .into_iter()
            .enumerate()
            .map(|(unit, (kind, texture))| TextureBinding {
                unit: unit as u32,
                kind,
                texture,
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            vertices,
            indices,
            textures,
            vertex_buffer,
            index_buffer,
        })
    }

    /// Bind every texture to its unit and draw all triangles.
    ///
    /// Textures that failed to load leave their unit unbound. The active
    /// unit is 0 afterwards.
    pub fn draw<P: DrawMesh<G>>(&self, target: &mut P) {
        for binding in &self.textures {
            match binding.texture.handle() {
                Some(handle) => target.bind_texture(binding.unit, handle),
                None => log::trace!(
                    "{} texture {} of mesh {} is not loaded, unit {} stays unbound",
                    binding.kind,
                    binding.texture.path(),
                    self.name,
                    binding.unit
                ),
            }
        }
        target.draw_elements(
            &self.vertex_buffer,
            &self.index_buffer,
            0..self.num_elements(),
        );
        target.set_active_unit(0);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[ModelVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn num_elements(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn textures(&self) -> &[TextureBinding<G>] {
        &self.textures
    }
}

/// All meshes imported from one scene file, in draw order.
pub struct Model<G: Gpu> {
    pub name: String,
    pub meshes: Vec<Mesh<G>>,
}

impl<G: Gpu> Model<G> {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            meshes: Vec::new(),
        }
    }

    pub fn draw<P: DrawMesh<G>>(&self, target: &mut P) {
        for mesh in &self.meshes {
            mesh.draw(target);
        }
    }
}
