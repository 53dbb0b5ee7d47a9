//! Drawing meshes through a wgpu render pass.
//!
//! [`WgpuPass`] is the [`DrawMesh`] implementation used by the window. Texture
//! units map to bind groups starting at [`FIRST_TEXTURE_GROUP`]; every unit a
//! mesh leaves unbound is filled with the fallback texture before drawing so
//! that no bind group of a previous mesh leaks into the next one.

use std::ops::Range;

use crate::{
    context::GpuContext,
    data_structures::{model::DrawMesh, texture::GpuTexture},
};

/// Bind group of the camera uniform.
pub const CAMERA_GROUP: u32 = 0;
/// Texture units the viewer pipeline exposes.
pub const TEXTURE_UNITS: u32 = 3;
/// Bind group of texture unit 0.
pub const FIRST_TEXTURE_GROUP: u32 = 1;

/// What the fragment stage writes: the shaded diffuse texture or the
/// world-space normal mapped into colour range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    DiffuseTexture,
    NormalVector,
}

impl OutputMode {
    pub fn toggled(self) -> Self {
        match self {
            OutputMode::DiffuseTexture => OutputMode::NormalVector,
            OutputMode::NormalVector => OutputMode::DiffuseTexture,
        }
    }

    /// Value of `output_mode` in the camera uniform.
    pub fn shader_value(self) -> u32 {
        match self {
            OutputMode::DiffuseTexture => 0,
            OutputMode::NormalVector => 1,
        }
    }
}

pub struct WgpuPass<'a, 'pass> {
    pass: &'a mut wgpu::RenderPass<'pass>,
    fallback: Option<&'a wgpu::BindGroup>,
    bound: [bool; TEXTURE_UNITS as usize],
    active_unit: u32,
}

impl<'a, 'pass> WgpuPass<'a, 'pass> {
    pub fn new(pass: &'a mut wgpu::RenderPass<'pass>, fallback: &'a GpuTexture) -> Self {
        Self {
            pass,
            fallback: fallback.bind_group.as_ref(),
            bound: [false; TEXTURE_UNITS as usize],
            active_unit: 0,
        }
    }

    pub fn active_unit(&self) -> u32 {
        self.active_unit
    }
}

impl DrawMesh<GpuContext> for WgpuPass<'_, '_> {
    fn bind_texture(&mut self, unit: u32, texture: &GpuTexture) {
        self.active_unit = unit;
        if unit >= TEXTURE_UNITS {
            log::debug!(
                "Texture unit {} is not available, the pipeline has {}",
                unit,
                TEXTURE_UNITS
            );
            return;
        }
        match &texture.bind_group {
            Some(group) => {
                self.pass.set_bind_group(FIRST_TEXTURE_GROUP + unit, group, &[]);
                self.bound[unit as usize] = true;
            }
            None => log::warn!("Texture for unit {} has no bind group", unit),
        }
    }

    fn draw_elements(&mut self, vertices: &wgpu::Buffer, indices: &wgpu::Buffer, range: Range<u32>) {
        for (unit, bound) in self.bound.iter_mut().enumerate() {
            if !*bound {
                if let Some(fallback) = self.fallback {
                    self.pass
                        .set_bind_group(FIRST_TEXTURE_GROUP + unit as u32, fallback, &[]);
                }
            }
            *bound = false;
        }
        self.pass.set_vertex_buffer(0, vertices.slice(..));
        self.pass
            .set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
        self.pass.draw_indexed(range, 0, 0..1);
    }

    fn set_active_unit(&mut self, unit: u32) {
        self.active_unit = unit;
    }
}
