//! Input handling module
//!
//! Captures keyboard input via evdev and reduces it to the semantic events
//! the mode machine cares about: escape, enter, backspace, printable text.

pub mod evdev_handler;

use anyhow::Result;

/// One semantic key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Escape,
    Enter,
    Backspace,
    Char(char),
}

/// Trait for input handlers
pub trait InputHandler {
    /// Initialize the input handler
    fn init(&mut self) -> Result<()>;

    /// Poll for one key event (non-blocking).
    fn poll(&mut self) -> Result<Option<KeyEvent>>;

    /// Throw away everything currently queued. Used after a blocking config
    /// call so keystrokes typed while it ran never reach the state machine.
    fn drain(&mut self) -> Result<()>;

    /// Cleanup input handler
    fn cleanup(&mut self) -> Result<()>;
}

/// Create an input handler
pub fn create_handler() -> Result<Box<dyn InputHandler>> {
    evdev_handler::EvdevHandler::new().map(|h| Box::new(h) as Box<dyn InputHandler>)
}
