//! Needs a real adapter, run with `--features integration-tests`.
#![cfg(feature = "integration-tests")]

use std::iter;

use cgmath::Point3;
use flow_viewer::{
    camera::{Camera, CameraConfig, CameraResources},
    context::GpuContext,
    data_structures::texture::{GpuTexture, TextureKind},
    pipelines::basic::mk_viewer_pipeline,
    render::{CAMERA_GROUP, WgpuPass},
    resources::TextureCache,
    viewer::Viewer,
};

mod common;
use common::test_utils::{TempDir, write_png};

fn headless() -> Option<GpuContext> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok()?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .ok()?;
        Some(GpuContext::new(device, queue))
    })
}

const QUAD_OBJ: &str = "\
mtllib quad.mtl
v -1.0 -1.0 -5.0
v 1.0 -1.0 -5.0
v 1.0 1.0 -5.0
v -1.0 1.0 -5.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
usemtl wall
f 1/1 2/2 3/3 4/4
";

#[test]
fn uploads_textures_with_their_mip_chain() {
    let Some(gpu) = headless() else {
        eprintln!("no adapter, skipping");
        return;
    };
    let dir = TempDir::new("gpu-mips");
    write_png(&dir.join("wall.png"), 16, 8, [255, 0, 0, 255]);

    let mut cache = TextureCache::new();
    let texture = cache.acquire(&gpu, &dir.texture_key("wall.png"), TextureKind::Diffuse);
    let handle = texture.handle().unwrap();
    assert_eq!(handle.texture.mip_level_count(), 5);
    assert_eq!(handle.texture.format(), wgpu::TextureFormat::Rgba8UnormSrgb);
    assert!(handle.bind_group.is_some());
}

#[test]
fn renders_an_imported_scene() {
    let Some(gpu) = headless() else {
        eprintln!("no adapter, skipping");
        return;
    };
    let dir = TempDir::new("gpu-render");
    dir.write("quad.obj", QUAD_OBJ);
    dir.write("quad.mtl", "newmtl wall\nmap_Kd wall.png\n");
    write_png(&dir.join("wall.png"), 4, 4, [0, 0, 255, 255]);

    let camera = Camera::new(CameraConfig {
        position: Point3::new(0.0, 0.0, 0.0),
        aspect: 1.0,
        // look down -z
        theta: cgmath::Deg(-90.0),
        ..Default::default()
    });
    let mut viewer: Viewer<GpuContext> = Viewer::new(camera, 1.0);
    assert_eq!(viewer.load(&gpu, &dir.join("quad.obj")), 1);

    let format = wgpu::TextureFormat::Rgba8UnormSrgb;
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: 64,
        height: 64,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    let camera = CameraResources::new(&gpu.device, viewer.camera());
    let pipeline = mk_viewer_pipeline(
        &gpu.device,
        &config,
        &camera.bind_group_layout,
        &gpu.texture_layout,
    );
    let target = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("target"),
        size: wgpu::Extent3d {
            width: 64,
            height: 64,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let depth = GpuTexture::create_depth_texture(&gpu.device, [64, 64], "depth");

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("test pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&pipeline);
        render_pass.set_bind_group(CAMERA_GROUP, &camera.bind_group, &[]);
        let mut pass = WgpuPass::new(&mut render_pass, &gpu.fallback);
        viewer.draw(&mut pass);
        assert_eq!(pass.active_unit(), 0);
    }
    gpu.queue.submit(iter::once(encoder.finish()));

    assert_eq!(viewer.models()[0].meshes[0].num_elements(), 6);
}
