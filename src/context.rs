use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources},
    data_structures::{
        model::ModelVertex,
        texture::{GpuTexture, TextureImage, texture_unit_layout},
    },
    pipelines::basic::mk_viewer_pipeline,
};

/// The GPU a scene is uploaded to.
///
/// Meshes and textures only ever talk to the GPU through this trait, so the
/// importer and texture cache work the same against wgpu and against a
/// recording implementation. Every call happens on the thread that owns the
/// device.
pub trait Gpu {
    /// A GPU-resident texture bound to a texture unit when a mesh is drawn.
    type Texture;
    /// A GPU-resident vertex or index buffer.
    type Buffer;

    /// Allocate a texture and upload every mip level of `image`.
    fn upload_texture(&self, label: &str, image: &TextureImage, srgb: bool) -> Self::Texture;

    fn upload_vertices(&self, label: &str, vertices: &[ModelVertex]) -> Self::Buffer;

    fn upload_indices(&self, label: &str, indices: &[u32]) -> Self::Buffer;
}

/// Device and queue plus the shared layouts needed to upload scene data.
#[derive(Debug)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub texture_layout: wgpu::BindGroupLayout,
    pub fallback: GpuTexture,
}

impl GpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let texture_layout = texture_unit_layout(&device);
        let fallback = GpuTexture::create_fallback(&device, &queue, &texture_layout);
        Self {
            device,
            queue,
            texture_layout,
            fallback,
        }
    }
}

impl Gpu for GpuContext {
    type Texture = GpuTexture;
    type Buffer = wgpu::Buffer;

    fn upload_texture(&self, label: &str, image: &TextureImage, srgb: bool) -> GpuTexture {
        GpuTexture::from_image(
            &self.device,
            &self.queue,
            &self.texture_layout,
            image,
            label,
            srgb,
        )
    }

    fn upload_vertices(&self, label: &str, vertices: &[ModelVertex]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", label)),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
    }

    fn upload_indices(&self, label: &str, indices: &[u32]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", label)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
    }
}

/// Everything needed to render into the window: surface, GPU, camera
/// resources and the viewer pipeline.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: GpuTexture,
    pub surface: wgpu::Surface<'static>,
    pub gpu: GpuContext,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub pipeline: wgpu::RenderPipeline,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(
        window: Arc<Window>,
        camera: &Camera,
        clear_colour: wgpu::Color,
    ) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colour and relies on an sRGB surface for the
        // conversion; other surfaces come out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let gpu = GpuContext::new(device, queue);
        let camera = CameraResources::new(&gpu.device, camera);
        let pipeline = mk_viewer_pipeline(
            &gpu.device,
            &config,
            &camera.bind_group_layout,
            &gpu.texture_layout,
        );
        let depth_texture = GpuTexture::create_depth_texture(
            &gpu.device,
            [config.width, config.height],
            "depth_texture",
        );

        Ok(Self {
            window,
            depth_texture,
            surface,
            gpu,
            config,
            camera,
            pipeline,
            clear_colour,
        })
    }

    /// Reconfigure the surface and depth buffer. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.gpu.device, &self.config);
        self.depth_texture = GpuTexture::create_depth_texture(
            &self.gpu.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
        true
    }
}
