//! Screen composition
//!
//! Turns a state snapshot into the line list a backend draws. The clock
//! screen shows network identity, the time and date, and optionally the
//! current track; each config screen shows the value being replaced and the
//! text entered so far.

use chrono::{DateTime, Local};

use super::Line;
use crate::platform::netinfo::NetInfo;
use crate::state::{DisplayMode, Snapshot, TrackMetadata};

/// Compose the screen for the current mode. Reads of the network identity
/// files happen here, once per frame, so edits made by the config scripts
/// show up without a restart.
pub fn compose(snapshot: &Snapshot, entry: &str, net: &NetInfo, now: DateTime<Local>) -> Vec<Line> {
    match snapshot.mode {
        DisplayMode::Clock => clock_lines(
            now,
            &net.hostname(),
            &net.ip_address(),
            &snapshot.track,
            net.music_panel_enabled(),
        ),
        DisplayMode::ConfigHostname => entry_lines("Hostname", &net.hostname(), entry),
        DisplayMode::ConfigSsid => entry_lines("SSID", &net.configured_ssid(), entry),
        DisplayMode::ConfigPassword => entry_lines("PW", &net.configured_psk(), entry),
    }
}

fn clock_lines(
    now: DateTime<Local>,
    hostname: &str,
    ip: &str,
    track: &TrackMetadata,
    show_music: bool,
) -> Vec<Line> {
    let mut lines = vec![
        Line::small_centered(format!("{hostname} : {ip}")),
        Line::blank(),
        Line::large_centered(now.format("%I:%M %p").to_string()),
        Line::blank(),
        Line::small_centered(now.format("%A, %B %d").to_string()),
    ];

    if show_music {
        lines.push(Line::blank());
        lines.push(Line::small(track.artist.clone()));
        lines.push(Line::small(track.title.clone()));
    }

    lines
}

fn entry_lines(label: &str, current: &str, entry: &str) -> Vec<Line> {
    vec![
        Line::small(format!("{label} = {current}")),
        Line::blank(),
        Line::small(format!("> {entry}_")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::TextSize;
    use chrono::TimeZone;

    fn afternoon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 5, 15, 4, 0).unwrap()
    }

    #[test]
    fn clock_screen_has_time_and_date() {
        let track = TrackMetadata::default();
        let lines = clock_lines(afternoon(), "raspi", "192.168.1.20", &track, false);

        assert_eq!(lines[0].text, "raspi : 192.168.1.20");
        assert_eq!(lines[2].text, "03:04 PM");
        assert_eq!(lines[2].size, TextSize::Large);
        assert!(lines[2].centered);
        assert_eq!(lines[4].text, "Wednesday, August 05");
    }

    #[test]
    fn music_lines_only_when_enabled() {
        let track = TrackMetadata {
            artist: "Daft Punk".to_string(),
            title: "One More Time".to_string(),
        };

        let hidden = clock_lines(afternoon(), "raspi", "192.168.1.20", &track, false);
        assert!(!hidden.iter().any(|l| l.text == "Daft Punk"));

        let shown = clock_lines(afternoon(), "raspi", "192.168.1.20", &track, true);
        assert!(shown.iter().any(|l| l.text == "Daft Punk"));
        assert!(shown.iter().any(|l| l.text == "One More Time"));
    }

    #[test]
    fn entry_screen_shows_current_value_and_cursor() {
        let lines = entry_lines("SSID", "OldNetwork", "MyWi");
        assert_eq!(lines[0].text, "SSID = OldNetwork");
        assert_eq!(lines[2].text, "> MyWi_");
    }
}
