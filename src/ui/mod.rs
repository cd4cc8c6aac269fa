//! UI rendering module
//!
//! The panel logic composes styled text lines in `screens`; backends draw
//! whatever they are given and never look at application state.

pub mod fb;
pub mod screens;

use anyhow::Result;

/// Glyph size for a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Small,
    Large,
}

/// One line of screen text with layout hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub size: TextSize,
    pub centered: bool,
}

impl Line {
    pub fn small(text: impl Into<String>) -> Self {
        Self { text: text.into(), size: TextSize::Small, centered: false }
    }

    pub fn small_centered(text: impl Into<String>) -> Self {
        Self { text: text.into(), size: TextSize::Small, centered: true }
    }

    pub fn large_centered(text: impl Into<String>) -> Self {
        Self { text: text.into(), size: TextSize::Large, centered: true }
    }

    pub fn blank() -> Self {
        Self::small("")
    }
}

/// Trait for UI backends
pub trait UiBackend {
    /// Initialize the UI backend
    fn init(&mut self) -> Result<()>;

    /// Clear screen to a solid color
    fn clear(&mut self, r: u8, g: u8, b: u8) -> Result<()>;

    /// Render styled text lines top to bottom
    fn render_lines(&mut self, lines: &[Line]) -> Result<()>;

    /// Flush/present the frame
    fn present(&mut self) -> Result<()>;

    /// Cleanup and restore terminal state
    fn cleanup(&mut self) -> Result<()>;
}

/// Create the appropriate UI backend
pub fn create_backend() -> Result<Box<dyn UiBackend>> {
    fb::FramebufferBackend::new().map(|b| Box::new(b) as Box<dyn UiBackend>)
}
