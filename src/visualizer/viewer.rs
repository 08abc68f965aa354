// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Window that shows annotated frames.

use image::DynamicImage;
use minifb::{Key, Window, WindowOptions};

use crate::error::{Result, SignError};

/// A simple image viewer using minifb.
///
/// Closing the window or pressing `q`/`Esc` requests a stop.
pub struct Viewer {
    window: Window,
    width: usize,
    height: usize,
    buffer: Vec<u32>,
}

impl Viewer {
    /// Create a new viewer window.
    ///
    /// # Errors
    ///
    /// Returns a visualizer error if the window cannot be created.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| SignError::VisualizerError(format!("Failed to create window: {e}")))?;

        // ~60 fps cap
        window.set_target_fps(60);

        Ok(Self {
            window,
            width,
            height,
            buffer: Vec::new(),
        })
    }

    /// True once the user closed the window or pressed a quit key.
    #[must_use]
    pub fn quit_requested(&self) -> bool {
        !self.window.is_open()
            || self.window.is_key_down(Key::Escape)
            || self.window.is_key_down(Key::Q)
    }

    /// Show a new frame. Returns `false` if the user asked to quit.
    ///
    /// # Errors
    ///
    /// Returns a visualizer error if the window cannot be updated.
    pub fn update(&mut self, image: &DynamicImage) -> Result<bool> {
        if self.quit_requested() {
            return Ok(false);
        }

        let rgb = image.to_rgb8();
        self.width = rgb.width() as usize;
        self.height = rgb.height() as usize;

        // 0x00RRGGBB per pixel
        self.buffer.clear();
        self.buffer.extend(
            rgb.pixels()
                .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2])),
        );

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| SignError::VisualizerError(format!("Failed to update window: {e}")))?;

        Ok(!self.quit_requested())
    }
}
