//! Engine data structures: vertices, meshes, models and textures.
//!
//! - `model` contains the vertex layout, meshes and models plus the
//!   [`model::DrawMesh`] trait meshes draw themselves into
//! - `texture` contains texture kinds, decoded images, shared engine textures
//!   and the wgpu texture wrapper

pub mod model;
pub mod texture;
