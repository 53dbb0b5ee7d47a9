//! Input state decoupled from the window backend.
//!
//! Keys are mapped to logical [`Action`]s through [`KeyBindings`]; the viewer
//! only ever sees actions. Pointer motion feeds the [`Trackball`] and frame
//! timing comes from a pausable [`FrameClock`].

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use instant::Instant;
use winit::keyboard::KeyCode;

use crate::camera::MoveDirection;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    ToggleTimer,
    ToggleOutputMode,
    Exit,
}

impl Action {
    pub fn move_direction(self) -> Option<MoveDirection> {
        match self {
            Action::MoveForward => Some(MoveDirection::Forward),
            Action::MoveBackward => Some(MoveDirection::Backward),
            Action::MoveLeft => Some(MoveDirection::Left),
            Action::MoveRight => Some(MoveDirection::Right),
            Action::MoveUp => Some(MoveDirection::Up),
            Action::MoveDown => Some(MoveDirection::Down),
            Action::ToggleTimer | Action::ToggleOutputMode | Action::Exit => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct KeyBindings {
    bindings: HashMap<KeyCode, Action>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let bindings = [
            (KeyCode::KeyW, Action::MoveForward),
            (KeyCode::KeyS, Action::MoveBackward),
            (KeyCode::KeyA, Action::MoveLeft),
            (KeyCode::KeyD, Action::MoveRight),
            (KeyCode::KeyZ, Action::MoveUp),
            (KeyCode::KeyX, Action::MoveDown),
            (KeyCode::KeyT, Action::ToggleTimer),
            (KeyCode::KeyM, Action::ToggleOutputMode),
            (KeyCode::Escape, Action::Exit),
        ]
        .into_iter()
        .collect();
        Self { bindings }
    }
}

impl KeyBindings {
    pub fn action(&self, key: KeyCode) -> Option<Action> {
        self.bindings.get(&key).copied()
    }

    /// Bind `key` to `action`, replacing whatever it was bound to.
    pub fn bind(&mut self, key: KeyCode, action: Action) {
        self.bindings.insert(key, action);
    }

    pub fn unbind(&mut self, key: KeyCode) -> Option<Action> {
        self.bindings.remove(&key)
    }
}

/// Which actions are currently held down.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    pressed: HashSet<Action>,
}

impl InputState {
    pub fn press(&mut self, action: Action) {
        self.pressed.insert(action);
    }

    pub fn release(&mut self, action: Action) {
        self.pressed.remove(&action);
    }

    pub fn is_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    /// Held movement directions in a fixed order.
    pub fn move_directions(&self) -> impl Iterator<Item = MoveDirection> + '_ {
        [
            Action::MoveForward,
            Action::MoveBackward,
            Action::MoveLeft,
            Action::MoveRight,
            Action::MoveUp,
            Action::MoveDown,
        ]
        .into_iter()
        .filter(|action| self.is_pressed(*action))
        .filter_map(Action::move_direction)
    }
}

/// Turns pointer positions into look deltas while it is enabled.
///
/// The last position is tracked even while disabled so that enabling the
/// trackball does not produce a jump.
#[derive(Clone, Debug)]
pub struct Trackball {
    enabled: bool,
    scale: f32,
    last: Option<(f64, f64)>,
    pending: (f32, f32),
}

impl Default for Trackball {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Trackball {
    /// `scale` multiplies raw pointer deltas.
    pub fn new(scale: f32) -> Self {
        Self {
            enabled: false,
            scale,
            last: None,
            pending: (0.0, 0.0),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        if let (true, Some((last_x, last_y))) = (self.enabled, self.last) {
            self.pending.0 += (x - last_x) as f32 * self.scale;
            self.pending.1 += (y - last_y) as f32 * self.scale;
        }
        self.last = Some((x, y));
    }

    /// Deltas accumulated since the last call.
    pub fn take_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.pending)
    }
}

/// Frame timer that reports zero elapsed time while paused.
#[derive(Clone, Debug)]
pub struct FrameClock {
    last: Instant,
    paused: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self { last: now, paused: false }
    }

    pub fn tick(&mut self) -> Duration {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Duration {
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        if self.paused { Duration::ZERO } else { dt }
    }

    /// Start measuring from now, dropping the time since the last tick.
    /// The pause state is kept.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn toggle(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
