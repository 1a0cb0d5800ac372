//! Window configuration and cursor handling.

use winit::{
    dpi::PhysicalSize,
    window::{CursorGrabMode, Window, WindowAttributes},
};

/// How the cursor behaves while it is over the window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorMode {
    #[default]
    Normal,
    /// Invisible but free to leave the window.
    Hidden,
    /// Invisible and locked to the window, for mouse look.
    Disabled,
}

/// Settings the window and the renderer start with.
#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub title: String,
    pub size: PhysicalSize<u32>,
    pub clear_colour: wgpu::Color,
    pub cursor: CursorMode,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "glwrap".to_string(),
            size: PhysicalSize::new(1280, 720),
            clear_colour: wgpu::Color::BLACK,
            cursor: CursorMode::Normal,
        }
    }
}

impl WindowConfig {
    pub fn new(title: &str, width: u32, height: u32) -> Self {
        Self {
            title: title.to_string(),
            size: PhysicalSize::new(width, height),
            ..Default::default()
        }
    }

    pub fn attributes(&self) -> WindowAttributes {
        Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(self.size)
    }
}

/// Apply `mode` to `window`. Platforms without cursor locking fall back to confining.
pub fn apply_cursor_mode(window: &Window, mode: CursorMode) {
    let grab = match mode {
        CursorMode::Normal | CursorMode::Hidden => window.set_cursor_grab(CursorGrabMode::None),
        CursorMode::Disabled => window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined)),
    };
    if let Err(e) = grab {
        log::warn!("Unable to grab the cursor: {}", e);
    }
    window.set_cursor_visible(mode == CursorMode::Normal);
}
