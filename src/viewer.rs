//! The viewer: imported models, a camera and the input driving it.
//!
//! [`Viewer`] knows nothing about windows or wgpu. The event loop in
//! [`crate::flow`] feeds it keys, pointer positions and frame ticks and hands
//! it a [`DrawMesh`] target once per frame.

use std::{path::Path, path::PathBuf, time::Duration};

use cgmath::{Deg, Point3};
use winit::keyboard::KeyCode;

use crate::{
    camera::{Camera, CameraConfig},
    context::Gpu,
    data_structures::model::{DrawMesh, Model},
    input::{Action, FrameClock, InputState, KeyBindings, Trackball},
    render::OutputMode,
    resources::{TextureCache, load_model},
};

/// Startup settings of the windowed viewer.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub title: String,
    /// Initial inner window size in physical pixels.
    pub width: u32,
    pub height: u32,
    /// Scenes imported on startup, drawn in this order.
    pub models: Vec<PathBuf>,
    pub clear_colour: wgpu::Color,
    pub camera: CameraConfig,
    /// Multiplier applied to pointer deltas before they reach the camera.
    pub trackball_scale: f32,
    pub bindings: KeyBindings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let width = 1280;
        let height = 720;
        Self {
            title: "flow-viewer".to_string(),
            width,
            height,
            models: vec![PathBuf::from("assets/sponza/sponza.obj")],
            clear_colour: wgpu::Color {
                r: 0.0,
                g: 0.25,
                b: 0.0,
                a: 1.0,
            },
            // Sponza is roughly 3000 units long, so the camera starts above the
            // floor, looks down the nave and moves fast.
            camera: CameraConfig {
                position: Point3::new(0.0, 125.0, 0.0),
                aspect: width as f32 / height as f32,
                zfar: 5000.0,
                move_speed: 300.0,
                theta: Deg(180.0),
                ..Default::default()
            },
            trackball_scale: 1.0,
            bindings: KeyBindings::default(),
        }
    }
}

pub struct Viewer<G: Gpu> {
    camera: Camera,
    bindings: KeyBindings,
    input: InputState,
    trackball: Trackball,
    clock: FrameClock,
    textures: TextureCache<G>,
    models: Vec<Model<G>>,
    output_mode: OutputMode,
    should_exit: bool,
}

impl<G: Gpu> Viewer<G> {
    pub fn new(camera: Camera, trackball_scale: f32) -> Self {
        Self {
            camera,
            bindings: KeyBindings::default(),
            input: InputState::default(),
            trackball: Trackball::new(trackball_scale),
            clock: FrameClock::new(),
            textures: TextureCache::new(),
            models: Vec::new(),
            output_mode: OutputMode::default(),
            should_exit: false,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(Camera::new(config.camera), config.trackball_scale)
            .with_bindings(config.bindings.clone())
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Import the scene at `path` and append it to the drawn models.
    ///
    /// Import failures are logged; the model is still appended, without
    /// meshes. Returns the number of meshes imported.
    pub fn load(&mut self, gpu: &G, path: &Path) -> usize {
        let model = load_model(gpu, &mut self.textures, path);
        let meshes = model.meshes.len();
        self.add_model(model);
        meshes
    }

    pub fn add_model(&mut self, model: Model<G>) {
        self.models.push(model);
    }

    pub fn models(&self) -> &[Model<G>] {
        &self.models
    }

    pub fn textures(&self) -> &TextureCache<G> {
        &self.textures
    }

    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        match self.bindings.action(key) {
            Some(action) => self.handle_action(action, pressed),
            None => log::trace!("Unbound key {:?}", key),
        }
    }

    pub fn handle_action(&mut self, action: Action, pressed: bool) {
        match action {
            Action::ToggleTimer => {
                if pressed {
                    self.clock.toggle();
                    log::info!(
                        "Timer {}",
                        if self.clock.is_paused() { "paused" } else { "resumed" }
                    );
                }
            }
            Action::ToggleOutputMode => {
                if pressed {
                    self.output_mode = self.output_mode.toggled();
                    log::info!("Output mode {:?}", self.output_mode);
                }
            }
            Action::Exit => {
                if pressed {
                    self.should_exit = true;
                }
            }
            _ if pressed => self.input.press(action),
            _ => self.input.release(action),
        }
    }

    pub fn set_trackball(&mut self, enabled: bool) {
        self.trackball.set_enabled(enabled);
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.trackball.cursor_moved(x, y);
    }

    /// Advance one frame using the frame clock. Returns the elapsed time the
    /// camera was moved by.
    pub fn frame(&mut self) -> Duration {
        let dt = self.clock.tick();
        self.update(dt);
        dt
    }

    /// Move the camera along every held direction, then apply the pending
    /// trackball delta.
    pub fn update(&mut self, dt: Duration) {
        for direction in self.input.move_directions() {
            self.camera.process_move(direction, dt);
        }
        let (d_theta, d_phi) = self.trackball.take_delta();
        self.camera.process_trackball(d_theta, d_phi);
    }

    pub fn draw<P: DrawMesh<G>>(&self, target: &mut P) {
        for model in &self.models {
            model.draw(target);
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Restart frame timing, e.g. after a long import.
    pub fn restart_clock(&mut self) {
        self.clock.reset();
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }
}
