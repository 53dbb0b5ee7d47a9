//! Fly camera.
//!
//! The camera keeps a position and a right-handed orthonormal basis
//! (`front`, `top`, `right`). Movement translates the position along that
//! basis; trackball input rotates it through two Euler angles: `theta` (yaw)
//! and `phi` (pitch). Pitch is clamped to ±[`PITCH_LIMIT`] so `front` never
//! becomes parallel to [`WORLD_UP`], where `right` would be undefined.

use std::time::Duration;

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use wgpu::util::DeviceExt;

use crate::render::OutputMode;

/// The world's up axis, used to derive `right` from `front`.
pub const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

/// Largest absolute pitch in degrees.
pub const PITCH_LIMIT: f32 = 85.0;

/// cgmath builds OpenGL clip space (z in -1..1), wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Initial camera state. Every field has a default, so callers only name
/// what they change:
///
/// ```
/// use flow_viewer::{Deg, camera::CameraConfig};
///
/// let config = CameraConfig {
///     theta: Deg(180.0),
///     move_speed: 300.0,
///     ..Default::default()
/// };
/// # let _ = config;
/// ```
///
/// Basis vectors left as `None` are derived from `theta` and `phi`. Given
/// ones are normalized and used as they are.
#[derive(Clone, Copy, Debug)]
pub struct CameraConfig {
    pub position: Point3<f32>,
    pub front: Option<Vector3<f32>>,
    pub top: Option<Vector3<f32>>,
    pub right: Option<Vector3<f32>>,
    pub fov: Deg<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    pub move_speed: f32,
    pub trackball_speed: f32,
    pub theta: Deg<f32>,
    pub phi: Deg<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 0.0),
            front: None,
            top: None,
            right: None,
            fov: Deg(60.0),
            aspect: 16.0 / 9.0,
            znear: 0.1,
            zfar: 1000.0,
            move_speed: 10.0,
            trackball_speed: 0.1,
            theta: Deg(0.0),
            phi: Deg(0.0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    position: Point3<f32>,
    front: Vector3<f32>,
    top: Vector3<f32>,
    right: Vector3<f32>,
    fov: Deg<f32>,
    aspect: f32,
    znear: f32,
    zfar: f32,
    move_speed: f32,
    trackball_speed: f32,
    theta: Deg<f32>,
    phi: Deg<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl Camera {
    pub fn new(config: CameraConfig) -> Self {
        let mut camera = Self {
            position: config.position,
            front: Vector3::unit_x(),
            top: WORLD_UP,
            right: Vector3::unit_z(),
            fov: config.fov,
            aspect: config.aspect,
            znear: config.znear,
            zfar: config.zfar,
            move_speed: config.move_speed,
            trackball_speed: config.trackball_speed,
            theta: config.theta,
            phi: clamp_pitch(config.phi),
        };
        camera.update_basis();
        if let Some(front) = config.front {
            camera.front = front.normalize();
        }
        if let Some(top) = config.top {
            camera.top = top.normalize();
        }
        if let Some(right) = config.right {
            camera.right = right.normalize();
        }
        camera
    }

    /// Projection matrix in OpenGL clip space.
    pub fn perspective(&self) -> Matrix4<f32> {
        perspective(self.fov, self.aspect, self.znear, self.zfar)
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + self.front, self.top)
    }

    /// Translate along the current basis by `move_speed * dt`.
    pub fn process_move(&mut self, direction: MoveDirection, dt: Duration) {
        let shift = self.move_speed * dt.as_secs_f32();
        match direction {
            MoveDirection::Forward => self.position += self.front * shift,
            MoveDirection::Backward => self.position -= self.front * shift,
            MoveDirection::Left => self.position -= self.right * shift,
            MoveDirection::Right => self.position += self.right * shift,
            MoveDirection::Up => self.position += self.top * shift,
            MoveDirection::Down => self.position -= self.top * shift,
        }
    }

    /// Rotate by raw pointer deltas and rebuild the basis from the angles.
    pub fn process_trackball(&mut self, d_theta: f32, d_phi: f32) {
        self.theta = self.theta - Deg(d_theta * self.trackball_speed);
        self.phi = clamp_pitch(self.phi + Deg(d_phi * self.trackball_speed));
        self.update_basis();
    }

    /// Follow a surface resize. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    // front first, right and top are derived from it
    fn update_basis(&mut self) {
        let (sin_theta, cos_theta) = Rad::from(self.theta).0.sin_cos();
        let (sin_phi, cos_phi) = Rad::from(self.phi).0.sin_cos();
        self.front = Vector3::new(cos_theta * cos_phi, sin_phi, sin_theta * cos_phi).normalize();
        self.right = self.front.cross(WORLD_UP).normalize();
        self.top = self.right.cross(self.front).normalize();
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn top(&self) -> Vector3<f32> {
        self.top
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn fov(&self) -> Deg<f32> {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn clip_planes(&self) -> (f32, f32) {
        (self.znear, self.zfar)
    }

    pub fn theta(&self) -> Deg<f32> {
        self.theta
    }

    pub fn phi(&self) -> Deg<f32> {
        self.phi
    }
}

fn clamp_pitch(phi: Deg<f32>) -> Deg<f32> {
    Deg(phi.0.clamp(-PITCH_LIMIT, PITCH_LIMIT))
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    /// [`OutputMode::shader_value`] of the current mode.
    pub output_mode: u32,
    _padding: [u32; 3],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
            output_mode: OutputMode::default().shader_value(),
            _padding: [0; 3],
        }
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode.shader_value();
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_position = camera.position().to_homogeneous().into();
        self.view_proj = (OPENGL_TO_WGPU_MATRIX * camera.perspective() * camera.view()).into();
    }
}

/// The camera uniform and the GPU objects it is bound through.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: &Camera) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(camera);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Recompute the uniform from `camera` and `mode` and queue the buffer
    /// write.
    pub fn write(&mut self, queue: &wgpu::Queue, camera: &Camera, mode: OutputMode) {
        self.uniform.update_view_proj(camera);
        self.uniform.set_output_mode(mode);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
