//! Evdev-based keyboard input handler

use anyhow::{anyhow, Context, Result};
use evdev::{Device, InputEventKind, Key};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{InputHandler, KeyEvent};

/// Evdev keyboard input handler
///
/// Queues decoded events so none are lost when a batch of evdev events
/// arrives in a single fetch. Tracks shift state itself; the config flow
/// needs the full printable range for SSIDs and passwords.
pub struct EvdevHandler {
    device: Option<Device>,
    queue: VecDeque<KeyEvent>,
    shift_down: bool,
    fallback_mode: bool,
}

impl EvdevHandler {
    /// Create a new evdev handler
    pub fn new() -> Result<Self> {
        Ok(Self {
            device: None,
            queue: VecDeque::new(),
            shift_down: false,
            fallback_mode: false,
        })
    }

    /// Find a keyboard device in /dev/input/event*
    fn find_keyboard() -> Result<Device> {
        let input_dir = PathBuf::from("/dev/input");

        if !input_dir.exists() {
            return Err(anyhow!("/dev/input directory not found"));
        }

        let entries = fs::read_dir(&input_dir).context("Failed to read /dev/input directory")?;

        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(name) = path.file_name() {
                if name.to_string_lossy().starts_with("event") {
                    if let Ok(device) = Device::open(&path) {
                        // Check if this device has keyboard capabilities
                        if device.supported_keys().map_or(false, |keys| {
                            keys.contains(Key::KEY_Q) && keys.contains(Key::KEY_A)
                        }) {
                            info!("Found keyboard device: {:?}", path);
                            return Ok(device);
                        }
                    }
                }
            }
        }

        Err(anyhow!("No keyboard device found in /dev/input"))
    }

    /// Map a pressed key to a semantic event
    fn key_event(key: Key, shift: bool) -> Option<KeyEvent> {
        match key {
            Key::KEY_ESC => Some(KeyEvent::Escape),
            Key::KEY_ENTER | Key::KEY_KPENTER => Some(KeyEvent::Enter),
            Key::KEY_BACKSPACE => Some(KeyEvent::Backspace),
            _ => key_char(key, shift).map(KeyEvent::Char),
        }
    }

    fn fill_queue(&mut self) -> Result<()> {
        if self.fallback_mode {
            return self.fill_from_stdin();
        }

        if let Some(ref mut device) = self.device {
            // Fetch events (non-blocking); decode every event in the batch.
            while let Ok(events) = device.fetch_events() {
                for event in events {
                    if let InputEventKind::Key(key) = event.kind() {
                        match key {
                            Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => {
                                self.shift_down = event.value() != 0;
                            }
                            // Key press (value == 1), not release or repeat
                            _ if event.value() == 1 => {
                                if let Some(ev) = Self::key_event(key, self.shift_down) {
                                    debug!("Key pressed: {:?} -> {:?}", key, ev);
                                    self.queue.push_back(ev);
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Check stdin for input in fallback mode
    fn fill_from_stdin(&mut self) -> Result<()> {
        use std::io::Read;

        let stdin = std::io::stdin();
        let mut buffer = [0u8; 64];

        loop {
            match stdin.lock().read(&mut buffer) {
                Ok(0) => break, // EOF
                Ok(n) => {
                    for &byte in &buffer[..n] {
                        if let Some(ev) = byte_event(byte) {
                            self.queue.push_back(ev);
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}

/// Map a raw stdin byte to a semantic event
fn byte_event(byte: u8) -> Option<KeyEvent> {
    match byte {
        0x1b => Some(KeyEvent::Escape),
        b'\n' | b'\r' => Some(KeyEvent::Enter),
        0x08 | 0x7f => Some(KeyEvent::Backspace),
        0x20..=0x7e => Some(KeyEvent::Char(byte as char)),
        _ => None,
    }
}

/// Map evdev key + shift state to a printable character
fn key_char(key: Key, shift: bool) -> Option<char> {
    let (lower, upper) = match key {
        Key::KEY_A => ('a', 'A'),
        Key::KEY_B => ('b', 'B'),
        Key::KEY_C => ('c', 'C'),
        Key::KEY_D => ('d', 'D'),
        Key::KEY_E => ('e', 'E'),
        Key::KEY_F => ('f', 'F'),
        Key::KEY_G => ('g', 'G'),
        Key::KEY_H => ('h', 'H'),
        Key::KEY_I => ('i', 'I'),
        Key::KEY_J => ('j', 'J'),
        Key::KEY_K => ('k', 'K'),
        Key::KEY_L => ('l', 'L'),
        Key::KEY_M => ('m', 'M'),
        Key::KEY_N => ('n', 'N'),
        Key::KEY_O => ('o', 'O'),
        Key::KEY_P => ('p', 'P'),
        Key::KEY_Q => ('q', 'Q'),
        Key::KEY_R => ('r', 'R'),
        Key::KEY_S => ('s', 'S'),
        Key::KEY_T => ('t', 'T'),
        Key::KEY_U => ('u', 'U'),
        Key::KEY_V => ('v', 'V'),
        Key::KEY_W => ('w', 'W'),
        Key::KEY_X => ('x', 'X'),
        Key::KEY_Y => ('y', 'Y'),
        Key::KEY_Z => ('z', 'Z'),
        Key::KEY_1 => ('1', '!'),
        Key::KEY_2 => ('2', '@'),
        Key::KEY_3 => ('3', '#'),
        Key::KEY_4 => ('4', '$'),
        Key::KEY_5 => ('5', '%'),
        Key::KEY_6 => ('6', '^'),
        Key::KEY_7 => ('7', '&'),
        Key::KEY_8 => ('8', '*'),
        Key::KEY_9 => ('9', '('),
        Key::KEY_0 => ('0', ')'),
        Key::KEY_MINUS => ('-', '_'),
        Key::KEY_EQUAL => ('=', '+'),
        Key::KEY_LEFTBRACE => ('[', '{'),
        Key::KEY_RIGHTBRACE => (']', '}'),
        Key::KEY_BACKSLASH => ('\\', '|'),
        Key::KEY_SEMICOLON => (';', ':'),
        Key::KEY_APOSTROPHE => ('\'', '"'),
        Key::KEY_GRAVE => ('`', '~'),
        Key::KEY_COMMA => (',', '<'),
        Key::KEY_DOT => ('.', '>'),
        Key::KEY_SLASH => ('/', '?'),
        Key::KEY_SPACE => (' ', ' '),
        _ => return None,
    };
    Some(if shift { upper } else { lower })
}

impl InputHandler for EvdevHandler {
    fn init(&mut self) -> Result<()> {
        match Self::find_keyboard() {
            Ok(device) => {
                info!("Evdev input handler initialized successfully");
                self.device = Some(device);
                self.fallback_mode = false;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to initialize evdev: {}. Using stdin fallback.", e);
                self.fallback_mode = true;

                // Set stdin to non-blocking mode in fallback
                use nix::fcntl::{fcntl, FcntlArg, OFlag};
                let stdin_fd = 0;
                if let Ok(flags) = fcntl(stdin_fd, FcntlArg::F_GETFL) {
                    let mut flags = OFlag::from_bits_truncate(flags);
                    flags.insert(OFlag::O_NONBLOCK);
                    let _ = fcntl(stdin_fd, FcntlArg::F_SETFL(flags));
                }

                Ok(())
            }
        }
    }

    fn poll(&mut self) -> Result<Option<KeyEvent>> {
        if self.queue.is_empty() {
            self.fill_queue()?;
        }
        Ok(self.queue.pop_front())
    }

    fn drain(&mut self) -> Result<()> {
        self.fill_queue()?;
        if !self.queue.is_empty() {
            debug!("Discarding {} queued key events", self.queue.len());
            self.queue.clear();
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.fallback_mode {
            // Restore blocking mode to stdin
            use nix::fcntl::{fcntl, FcntlArg, OFlag};
            let stdin_fd = 0;
            if let Ok(flags) = fcntl(stdin_fd, FcntlArg::F_GETFL) {
                let mut flags = OFlag::from_bits_truncate(flags);
                flags.remove(OFlag::O_NONBLOCK);
                let _ = fcntl(stdin_fd, FcntlArg::F_SETFL(flags));
            }
        }

        info!("Evdev input handler cleaned up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_respect_shift() {
        assert_eq!(key_char(Key::KEY_A, false), Some('a'));
        assert_eq!(key_char(Key::KEY_A, true), Some('A'));
    }

    #[test]
    fn digits_shift_to_symbols() {
        assert_eq!(key_char(Key::KEY_1, false), Some('1'));
        assert_eq!(key_char(Key::KEY_1, true), Some('!'));
        assert_eq!(key_char(Key::KEY_MINUS, true), Some('_'));
    }

    #[test]
    fn unmapped_keys_produce_nothing() {
        assert_eq!(key_char(Key::KEY_F1, false), None);
        assert_eq!(EvdevHandler::key_event(Key::KEY_F1, false), None);
    }

    #[test]
    fn control_keys_become_semantic_events() {
        assert_eq!(EvdevHandler::key_event(Key::KEY_ESC, false), Some(KeyEvent::Escape));
        assert_eq!(EvdevHandler::key_event(Key::KEY_ENTER, false), Some(KeyEvent::Enter));
        assert_eq!(
            EvdevHandler::key_event(Key::KEY_BACKSPACE, true),
            Some(KeyEvent::Backspace)
        );
    }

    #[test]
    fn stdin_bytes_decode_like_keys() {
        assert_eq!(byte_event(0x1b), Some(KeyEvent::Escape));
        assert_eq!(byte_event(b'\n'), Some(KeyEvent::Enter));
        assert_eq!(byte_event(0x7f), Some(KeyEvent::Backspace));
        assert_eq!(byte_event(b'R'), Some(KeyEvent::Char('R')));
        assert_eq!(byte_event(0x01), None);
    }
}
