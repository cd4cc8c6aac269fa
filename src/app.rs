//! Mode state machine
//!
//! Turns semantic key events into mode transitions and config side effects.
//! The only reachable cycle is Clock ⇄ ConfigHostname → ConfigSsid →
//! ConfigPassword → Clock. Runs entirely on the main loop; the metadata
//! watcher never touches the mode or the pending credentials.

use std::sync::Arc;
use tracing::{debug, info};

use crate::input::KeyEvent;
use crate::platform::applier::ConfigApplier;
use crate::state::{DisplayMode, DisplayState};

/// Main application controller
pub struct App {
    state: Arc<DisplayState>,
    applier: Box<dyn ConfigApplier>,
    entry: String,
    should_exit: bool,
    drain_input: bool,
}

impl App {
    /// Create a new application instance
    pub fn new(state: Arc<DisplayState>, applier: Box<dyn ConfigApplier>) -> Self {
        info!("Creating new application instance");
        Self {
            state,
            applier,
            entry: String::new(),
            should_exit: false,
            drain_input: false,
        }
    }

    /// Check if application should exit
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Text entered so far on the active config screen
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// True once after a blocking applier call; the caller throws away any
    /// input that queued while it ran.
    pub fn take_drain_request(&mut self) -> bool {
        std::mem::take(&mut self.drain_input)
    }

    /// Handle one key event
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key {
            KeyEvent::Escape => self.toggle(),
            KeyEvent::Enter => self.commit(),
            KeyEvent::Backspace => {
                self.entry.pop();
            }
            KeyEvent::Char(c) => self.handle_char(c),
        }
    }

    fn handle_char(&mut self, c: char) {
        match self.state.mode() {
            DisplayMode::Clock => {
                if c == 'q' || c == 'Q' {
                    info!("User requested exit");
                    self.should_exit = true;
                }
            }
            // Config screens buffer everything printable as entry text.
            _ => self.entry.push(c),
        }
    }

    /// Escape flips between the clock and the config flow. Leaving the flow
    /// from any step abandons whatever was entered so far.
    fn toggle(&mut self) {
        let next = match self.state.mode() {
            DisplayMode::Clock => DisplayMode::ConfigHostname,
            _ => DisplayMode::Clock,
        };
        self.entry.clear();
        self.state.clear_pending();
        self.transition_to(next);
    }

    /// Enter commits the entry text to the current config step. Empty
    /// commits are ignored everywhere.
    fn commit(&mut self) {
        if self.entry.is_empty() {
            debug!("Ignoring empty commit");
            return;
        }
        let text = std::mem::take(&mut self.entry);

        match self.state.mode() {
            DisplayMode::Clock => {}
            DisplayMode::ConfigHostname => {
                self.applier.set_hostname(&text);
                self.transition_to(DisplayMode::ConfigSsid);
            }
            DisplayMode::ConfigSsid => {
                self.state.set_pending_ssid(text);
                self.transition_to(DisplayMode::ConfigPassword);
            }
            DisplayMode::ConfigPassword => {
                self.state.set_pending_password(text);
                let creds = self.state.take_pending();
                // Blocks until the script returns; keystrokes typed in the
                // meantime queue up and get drained by the caller.
                self.applier.set_wifi(&creds.ssid, &creds.password);
                self.drain_input = true;
                self.transition_to(DisplayMode::Clock);
            }
        }
    }

    /// Transition to a new mode
    fn transition_to(&mut self, mode: DisplayMode) {
        info!("Mode transition: {} -> {}", self.state.mode(), mode);
        self.state.set_mode(mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Applied {
        Hostname(String),
        Wifi(String, String),
    }

    struct RecordingApplier {
        calls: Arc<Mutex<Vec<Applied>>>,
    }

    impl ConfigApplier for RecordingApplier {
        fn set_hostname(&self, name: &str) {
            self.calls.lock().unwrap().push(Applied::Hostname(name.to_string()));
        }

        fn set_wifi(&self, ssid: &str, password: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(Applied::Wifi(ssid.to_string(), password.to_string()));
        }
    }

    fn test_app() -> (App, Arc<DisplayState>, Arc<Mutex<Vec<Applied>>>) {
        let state = Arc::new(DisplayState::default());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let applier = RecordingApplier { calls: Arc::clone(&calls) };
        let app = App::new(Arc::clone(&state), Box::new(applier));
        (app, state, calls)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyEvent::Char(c));
        }
    }

    #[test]
    fn starts_on_the_clock() {
        let (app, state, _) = test_app();
        assert_eq!(state.mode(), DisplayMode::Clock);
        assert!(!app.should_exit());
    }

    #[test]
    fn full_config_flow_applies_in_order() {
        let (mut app, state, calls) = test_app();

        app.handle_key(KeyEvent::Escape);
        assert_eq!(state.mode(), DisplayMode::ConfigHostname);

        type_text(&mut app, "raspi");
        app.handle_key(KeyEvent::Enter);
        assert_eq!(state.mode(), DisplayMode::ConfigSsid);

        type_text(&mut app, "MyWifi");
        app.handle_key(KeyEvent::Enter);
        assert_eq!(state.mode(), DisplayMode::ConfigPassword);

        type_text(&mut app, "secret");
        app.handle_key(KeyEvent::Enter);
        assert_eq!(state.mode(), DisplayMode::Clock);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Applied::Hostname("raspi".to_string()),
                Applied::Wifi("MyWifi".to_string(), "secret".to_string()),
            ]
        );

        // Credentials are cleared once applied.
        assert_eq!(state.snapshot().pending.ssid, "");
        assert_eq!(state.snapshot().pending.password, "");
    }

    #[test]
    fn empty_commit_is_ignored() {
        let (mut app, state, calls) = test_app();

        app.handle_key(KeyEvent::Escape);
        app.handle_key(KeyEvent::Enter);
        assert_eq!(state.mode(), DisplayMode::ConfigHostname);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn toggle_returns_to_clock_from_every_config_step() {
        let commits = ["host", "ssid"];
        for steps in 0..=commits.len() {
            let (mut app, state, _) = test_app();
            app.handle_key(KeyEvent::Escape);
            for text in &commits[..steps] {
                type_text(&mut app, text);
                app.handle_key(KeyEvent::Enter);
            }
            assert_ne!(state.mode(), DisplayMode::Clock);

            type_text(&mut app, "abandoned");
            app.handle_key(KeyEvent::Escape);
            assert_eq!(state.mode(), DisplayMode::Clock);
            assert_eq!(app.entry(), "");
            assert_eq!(state.snapshot().pending.ssid, "");
        }
    }

    #[test]
    fn abandoned_entry_does_not_leak_into_next_flow() {
        let (mut app, state, calls) = test_app();

        app.handle_key(KeyEvent::Escape);
        type_text(&mut app, "half-typed");
        app.handle_key(KeyEvent::Escape);

        // Re-enter the flow; the previous entry must be gone.
        app.handle_key(KeyEvent::Escape);
        assert_eq!(state.mode(), DisplayMode::ConfigHostname);
        app.handle_key(KeyEvent::Enter);
        assert_eq!(state.mode(), DisplayMode::ConfigHostname);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn backspace_edits_the_entry() {
        let (mut app, _, calls) = test_app();

        app.handle_key(KeyEvent::Escape);
        type_text(&mut app, "raspberry");
        for _ in 0..5 {
            app.handle_key(KeyEvent::Backspace);
        }
        app.handle_key(KeyEvent::Enter);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![Applied::Hostname("rasp".to_string())]
        );
    }

    #[test]
    fn quit_key_only_works_on_the_clock() {
        let (mut app, _, _) = test_app();

        app.handle_key(KeyEvent::Escape);
        app.handle_key(KeyEvent::Char('q'));
        assert!(!app.should_exit());
        assert_eq!(app.entry(), "q");

        app.handle_key(KeyEvent::Escape);
        app.handle_key(KeyEvent::Char('q'));
        assert!(app.should_exit());
    }

    #[test]
    fn wifi_apply_requests_an_input_drain() {
        let (mut app, _, _) = test_app();
        assert!(!app.take_drain_request());

        app.handle_key(KeyEvent::Escape);
        type_text(&mut app, "raspi");
        app.handle_key(KeyEvent::Enter);
        assert!(!app.take_drain_request());

        type_text(&mut app, "MyWifi");
        app.handle_key(KeyEvent::Enter);
        type_text(&mut app, "secret");
        app.handle_key(KeyEvent::Enter);

        assert!(app.take_drain_request());
        // One-shot: consumed by the first take.
        assert!(!app.take_drain_request());
    }
}
