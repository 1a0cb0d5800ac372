//! Keyboard and mouse state, fed by the event loop once per event.
//!
//! Key presses, releases and repeats are edges that are only visible during
//! the frame they arrived in. Held keys and the cursor position persist.

use std::collections::HashSet;

use cgmath::Vector2;
pub use winit::{
    event::{ElementState, MouseButton},
    keyboard::KeyCode,
};

#[derive(Debug)]
pub struct InputState {
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    released: HashSet<KeyCode>,
    repeated: HashSet<KeyCode>,
    buttons: HashSet<MouseButton>,
    cursor: Vector2<f64>,
    /// Mouse movement this frame, positive y is up.
    delta: Vector2<f64>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
            repeated: HashSet::new(),
            buttons: HashSet::new(),
            cursor: Vector2::new(0.0, 0.0),
            delta: Vector2::new(0.0, 0.0),
        }
    }

    pub fn key_event(&mut self, key: KeyCode, state: ElementState, repeat: bool) {
        match (state, repeat) {
            (ElementState::Pressed, false) => {
                self.pressed.insert(key);
                self.held.insert(key);
            }
            (ElementState::Pressed, true) => {
                self.repeated.insert(key);
            }
            (ElementState::Released, _) => {
                self.released.insert(key);
                self.held.remove(&key);
            }
        }
    }

    pub fn mouse_button_event(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => self.buttons.insert(button),
            ElementState::Released => self.buttons.remove(&button),
        };
    }

    /// Raw device motion in window coordinates (y down).
    pub fn mouse_motion(&mut self, dx: f64, dy: f64) {
        self.delta += Vector2::new(dx, -dy);
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.cursor = Vector2::new(x, y);
    }

    /// Forget this frame's edges and mouse movement.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
        self.repeated.clear();
        self.delta = Vector2::new(0.0, 0.0);
    }

    /// Focus loss drops every held key, otherwise they would stick.
    pub fn release_all(&mut self) {
        self.released.extend(self.held.drain());
        self.buttons.clear();
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.released.contains(&key)
    }

    pub fn is_key_repeat(&self, key: KeyCode) -> bool {
        self.repeated.contains(&key)
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    pub fn cursor_position(&self) -> Vector2<f64> {
        self.cursor
    }

    pub fn mouse_delta(&self) -> Vector2<f64> {
        self.delta
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
