//! flow-viewer
//!
//! A small fly-camera viewer for textured polygon scenes. A scene file is
//! imported once at startup, its textures are uploaded once per distinct path
//! and its node hierarchy is flattened into drawable mesh batches. Every frame
//! the camera is advanced from the accumulated input and all meshes are drawn
//! through a single forward pass.
//!
//! High-level modules
//! - `camera`: fly camera state, trackball math and the camera uniform
//! - `context`: the GPU seam (`Gpu`) and the wgpu context implementing it
//! - `data_structures`: vertices, meshes, models and textures
//! - `flow`: the winit event loop that drives a [`viewer::Viewer`]
//! - `input`: logical actions, key bindings, trackball and frame clock
//! - `pipelines`: the render pipeline used to draw imported models
//! - `render`: the wgpu implementation of [`data_structures::model::DrawMesh`]
//! - `resources`: scene parsers, the scene importer and the texture cache
//! - `viewer`: per-frame update and draw of the loaded models
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod input;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod viewer;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::keyboard::KeyCode;
