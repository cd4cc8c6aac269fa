//! Shared display state
//!
//! One bundle reachable from exactly two execution contexts: the metadata
//! watcher thread writes the track fields, the main render/input loop writes
//! the mode and the pending credentials. Each field sits behind its own lock,
//! so a reader never observes a half-written string and neither context ever
//! blocks the other for longer than one field update.

use std::fmt;
use std::sync::Mutex;

/// The artist/title pair currently known to the panel.
///
/// Either field may be empty until the first matching metadata line arrives.
/// No history is kept; each field is overwritten in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub artist: String,
    pub title: String,
}

/// Which track field a parsed metadata line updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackField {
    Artist,
    Title,
}

/// Which screen is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Clock,
    ConfigHostname,
    ConfigSsid,
    ConfigPassword,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Clock => write!(f, "Clock"),
            DisplayMode::ConfigHostname => write!(f, "ConfigHostname"),
            DisplayMode::ConfigSsid => write!(f, "ConfigSsid"),
            DisplayMode::ConfigPassword => write!(f, "ConfigPassword"),
        }
    }
}

/// Wi-Fi credentials accumulated across the SSID and password config steps.
///
/// Valid only while the config flow is in progress; cleared once applied or
/// when the flow is abandoned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingCredentials {
    pub ssid: String,
    pub password: String,
}

/// Shared state bundle.
///
/// Single-writer discipline per field: `track` is written only by the watcher
/// thread, `mode` and `pending` only by the main loop.
#[derive(Debug, Default)]
pub struct DisplayState {
    track: Mutex<TrackMetadata>,
    mode: Mutex<DisplayMode>,
    pending: Mutex<PendingCredentials>,
}

/// A consistent copy of the state, handed to the renderer once per frame.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub track: TrackMetadata,
    pub mode: DisplayMode,
    pub pending: PendingCredentials,
}

impl DisplayState {
    /// Overwrite one track field. Called only from the watcher thread.
    pub fn set_track(&self, field: TrackField, value: String) {
        let mut track = self.track.lock().unwrap();
        match field {
            TrackField::Artist => track.artist = value,
            TrackField::Title => track.title = value,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        *self.mode.lock().unwrap()
    }

    pub fn set_mode(&self, mode: DisplayMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn set_pending_ssid(&self, ssid: String) {
        self.pending.lock().unwrap().ssid = ssid;
    }

    pub fn set_pending_password(&self, password: String) {
        self.pending.lock().unwrap().password = password;
    }

    /// Hand out the accumulated credentials and reset them to empty.
    pub fn take_pending(&self) -> PendingCredentials {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }

    /// Discard partially-entered credentials when the flow is abandoned.
    pub fn clear_pending(&self) {
        *self.pending.lock().unwrap() = PendingCredentials::default();
    }

    /// A copy the renderer can use without holding any lock across drawing.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            track: self.track.lock().unwrap().clone(),
            mode: *self.mode.lock().unwrap(),
            pending: self.pending.lock().unwrap().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn track_fields_update_independently() {
        let state = DisplayState::default();
        state.set_track(TrackField::Artist, "Daft Punk".to_string());
        assert_eq!(state.snapshot().track.artist, "Daft Punk");
        assert_eq!(state.snapshot().track.title, "");

        state.set_track(TrackField::Title, "One More Time".to_string());
        let snap = state.snapshot();
        assert_eq!(snap.track.artist, "Daft Punk");
        assert_eq!(snap.track.title, "One More Time");
    }

    #[test]
    fn take_pending_resets_credentials() {
        let state = DisplayState::default();
        state.set_pending_ssid("MyWifi".to_string());
        state.set_pending_password("secret".to_string());

        let creds = state.take_pending();
        assert_eq!(creds.ssid, "MyWifi");
        assert_eq!(creds.password, "secret");
        assert_eq!(state.snapshot().pending, PendingCredentials::default());
    }

    #[test]
    fn snapshot_never_sees_torn_track_values() {
        let state = Arc::new(DisplayState::default());
        let a = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string();
        let b = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string();

        let writer = {
            let state = Arc::clone(&state);
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || {
                for i in 0..2000 {
                    let value = if i % 2 == 0 { a.clone() } else { b.clone() };
                    state.set_track(TrackField::Title, value);
                }
            })
        };

        for _ in 0..2000 {
            let title = state.snapshot().track.title;
            assert!(
                title.is_empty() || title == a || title == b,
                "torn read: {title:?}"
            );
        }

        writer.join().unwrap();
    }
}
