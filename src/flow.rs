//! Application event loop.
//!
//! Owns the window, the wgpu [`Context`] and the [`Viewer`] and forwards
//! window events to the viewer. Scenes are imported synchronously once the
//! window exists, before the first frame.
//!
//! # Lifecycle Flow
//!
//! Every redraw:
//! 1. Tick the frame clock and update the camera from the held keys and the
//!    trackball
//! 2. Write the camera uniform
//! 3. Draw every model in load order into a single render pass
//! 4. Present the frame

use std::{iter, sync::Arc};

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::Window,
};

use crate::{
    context::{Context, GpuContext},
    render::{CAMERA_GROUP, WgpuPass},
    viewer::{Viewer, ViewerConfig},
};

pub struct AppState {
    pub(crate) ctx: Context,
    viewer: Viewer<GpuContext>,
    is_surface_configured: bool,
}

impl AppState {
    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
            self.viewer.camera_mut().resize(width, height);
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        self.viewer.frame();
        self.ctx
            .camera
            .write(&self.ctx.gpu.queue, self.viewer.camera(), self.viewer.output_mode());

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

            render_pass.set_pipeline(&self.ctx.pipeline);
            render_pass.set_bind_group(CAMERA_GROUP, &self.ctx.camera.bind_group, &[]);
            let mut target = WgpuPass::new(&mut render_pass, &self.ctx.gpu.fallback);
            self.viewer.draw(&mut target);
        }

        self.ctx.gpu.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: ViewerConfig,
    state: Option<AppState>,
    // Set when the window or the GPU could not be set up
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let async_runtime = tokio::runtime::Builder::new_current_thread().build()?;
        Ok(Self {
            async_runtime,
            config,
            state: None,
            error: None,
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let mut viewer = Viewer::from_config(&self.config);
        let ctx = self.async_runtime.block_on(Context::new(
            window,
            viewer.camera(),
            self.config.clear_colour,
        ))?;

        for path in &self.config.models {
            let meshes = viewer.load(&ctx.gpu, path);
            log::info!("{} ready with {} meshes", path.display(), meshes);
        }
        log::info!("{} distinct textures loaded", viewer.textures().len());
        // the first frame must not move the camera by the import time
        viewer.restart_clock();

        let mut state = AppState {
            ctx,
            viewer,
            is_surface_configured: false,
        };
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);
        Ok(state)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => {
                state.ctx.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("App initialization failed: {:#}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                state
                    .viewer
                    .handle_key(code, key_state == ElementState::Pressed);
                if state.viewer.should_exit() {
                    event_loop.exit();
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => match button {
                MouseButton::Middle => state.viewer.set_trackball(button_state.is_pressed()),
                other => log::debug!("Mouse {:?} {:?}", other, button_state),
            },
            WindowEvent::CursorMoved { position, .. } => {
                state.viewer.cursor_moved(position.x, position.y)
            }
            WindowEvent::RedrawRequested => match state.render() {
                Ok(_) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.ctx.window.inner_size();
                    state.resize(size.width, size.height);
                }
                Err(e) => {
                    log::error!("Unable to render {}", e);
                }
            },
            _ => {}
        }
    }
}

/// Open a window, import `config.models` and run the viewer until the window
/// is closed or the exit key is pressed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
