use std::{
    cell::{Cell, RefCell},
    fs,
    ops::Range,
    path::{Path, PathBuf},
};

use flow_viewer::{
    context::Gpu,
    data_structures::{
        model::{DrawMesh, ModelVertex},
        texture::{PixelFormat, TextureImage},
    },
    resources::scene::{ParsedScene, RawMaterial, RawMesh, SceneNode, SceneParser},
};

#[derive(Clone, Debug, PartialEq)]
pub struct FakeTexture {
    pub id: usize,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub mip_levels: u32,
    pub srgb: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FakeBuffer {
    pub id: usize,
    pub label: String,
    pub len: usize,
}

/// A [`Gpu`] that hands out numbered fake resources and remembers every upload.
#[derive(Default)]
pub struct RecordingGpu {
    next_id: Cell<usize>,
    pub textures: RefCell<Vec<FakeTexture>>,
    pub vertex_uploads: Cell<usize>,
    pub index_uploads: Cell<usize>,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture_uploads(&self) -> usize {
        self.textures.borrow().len()
    }

    pub fn uploaded_labels(&self) -> Vec<String> {
        self.textures.borrow().iter().map(|t| t.label.clone()).collect()
    }

    fn next(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl Gpu for RecordingGpu {
    type Texture = FakeTexture;
    type Buffer = FakeBuffer;

    fn upload_texture(&self, label: &str, image: &TextureImage, srgb: bool) -> FakeTexture {
        let texture = FakeTexture {
            id: self.next(),
            label: label.to_string(),
            width: image.width,
            height: image.height,
            format: image.format,
            mip_levels: image.mip_levels(),
            srgb,
        };
        self.textures.borrow_mut().push(texture.clone());
        texture
    }

    fn upload_vertices(&self, label: &str, vertices: &[ModelVertex]) -> FakeBuffer {
        self.vertex_uploads.set(self.vertex_uploads.get() + 1);
        FakeBuffer {
            id: self.next(),
            label: label.to_string(),
            len: vertices.len(),
        }
    }

    fn upload_indices(&self, label: &str, indices: &[u32]) -> FakeBuffer {
        self.index_uploads.set(self.index_uploads.get() + 1);
        FakeBuffer {
            id: self.next(),
            label: label.to_string(),
            len: indices.len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Bind { unit: u32, texture: String },
    Draw { mesh: String, vertices: usize, range: Range<u32> },
    ActiveUnit(u32),
}

/// A [`DrawMesh`] target recording every call in order.
#[derive(Default)]
pub struct RecordingPass {
    pub calls: Vec<DrawCall>,
}

impl RecordingPass {
    pub fn draws(&self) -> Vec<&DrawCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Draw { .. }))
            .collect()
    }
}

impl DrawMesh<RecordingGpu> for RecordingPass {
    fn bind_texture(&mut self, unit: u32, texture: &FakeTexture) {
        self.calls.push(DrawCall::Bind {
            unit,
            texture: texture.label.clone(),
        });
    }

    fn draw_elements(&mut self, vertices: &FakeBuffer, indices: &FakeBuffer, range: Range<u32>) {
        assert_eq!(vertices.label, indices.label, "buffers of different meshes");
        self.calls.push(DrawCall::Draw {
            mesh: vertices.label.clone(),
            vertices: vertices.len,
            range,
        });
    }

    fn set_active_unit(&mut self, unit: u32) {
        self.calls.push(DrawCall::ActiveUnit(unit));
    }
}

/// Returns the same scene on every parse, or fails with a fixed message.
pub struct StaticParser {
    scene: Option<ParsedScene>,
    pub parses: Cell<usize>,
}

impl StaticParser {
    pub fn new(scene: ParsedScene) -> Self {
        Self {
            scene: Some(scene),
            parses: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            scene: None,
            parses: Cell::new(0),
        }
    }
}

impl SceneParser for StaticParser {
    fn parse(&self, path: &Path) -> anyhow::Result<ParsedScene> {
        self.parses.set(self.parses.get() + 1);
        match &self.scene {
            Some(scene) => Ok(scene.clone()),
            None => anyhow::bail!("{} is not a scene", path.display()),
        }
    }
}

/// One triangle in the z = 0 plane with UVs covering the unit square corner.
pub fn triangle(name: &str, material: Option<usize>) -> RawMesh {
    RawMesh {
        name: name.to_string(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        tex_coords: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
        tangents: vec![[1.0, 0.0, 0.0]; 3],
        bitangents: vec![[0.0, 1.0, 0.0]; 3],
        faces: vec![[0, 1, 2]],
        material,
    }
}

pub fn material(name: &str, textures: &[(flow_viewer::data_structures::texture::TextureKind, &str)]) -> RawMaterial {
    RawMaterial {
        name: name.to_string(),
        textures: textures
            .iter()
            .map(|(kind, path)| (*kind, path.to_string()))
            .collect(),
    }
}

pub fn node(name: &str, meshes: Vec<usize>, children: Vec<SceneNode>) -> SceneNode {
    SceneNode {
        name: name.to_string(),
        meshes,
        children,
    }
}

/// A scratch directory removed again when dropped.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "flow-viewer-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, file: &str) -> PathBuf {
        self.path.join(file)
    }

    pub fn write(&self, file: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        fs::write(&path, contents).expect("failed to write fixture");
        path
    }

    /// The path as the importer spells it for a texture next to the scene.
    pub fn texture_key(&self, file: &str) -> String {
        self.join(file).to_string_lossy().into_owned()
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

pub fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
        .save(path)
        .expect("failed to write png fixture");
}

pub fn write_gray_png(path: &Path, width: u32, height: u32, luma: u8) {
    image::GrayImage::from_pixel(width, height, image::Luma([luma]))
        .save(path)
        .expect("failed to write png fixture");
}
