//! Network identity lookups
//!
//! Everything here reads files or interfaces that may be missing. Failures
//! degrade to defaults and are never propagated; the panel keeps rendering
//! with whatever it could find.

use nix::ifaddrs::getifaddrs;
use std::fs;
use std::path::{Path, PathBuf};

/// Shown on the clock screen when the interface has no address yet.
pub const NO_IP: &str = "No IP Address";

#[derive(Debug, Clone)]
pub struct NetInfo {
    hostname_path: PathBuf,
    wpa_conf_path: PathBuf,
    panel_state_path: PathBuf,
    interface: String,
}

impl NetInfo {
    pub fn new(
        hostname_path: impl Into<PathBuf>,
        wpa_conf_path: impl Into<PathBuf>,
        panel_state_path: impl Into<PathBuf>,
        interface: &str,
    ) -> Self {
        Self {
            hostname_path: hostname_path.into(),
            wpa_conf_path: wpa_conf_path.into(),
            panel_state_path: panel_state_path.into(),
            interface: interface.to_string(),
        }
    }

    pub fn new_default(interface: &str, panel_state_path: &Path) -> Self {
        Self::new(
            "/etc/hostname",
            "/etc/wpa_supplicant.conf",
            panel_state_path,
            interface,
        )
    }

    /// Device hostname, or empty if unreadable.
    pub fn hostname(&self) -> String {
        fs::read_to_string(&self.hostname_path)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default()
    }

    /// IPv4 address of the configured interface.
    pub fn ip_address(&self) -> String {
        interface_ipv4(&self.interface).unwrap_or_else(|| NO_IP.to_string())
    }

    /// SSID currently configured in wpa_supplicant.conf, or empty.
    pub fn configured_ssid(&self) -> String {
        self.wpa_value("ssid")
    }

    /// Commented-out plaintext PSK wpa_passphrase leaves behind, or empty.
    pub fn configured_psk(&self) -> String {
        self.wpa_value("#psk")
    }

    fn wpa_value(&self, key: &str) -> String {
        match fs::read_to_string(&self.wpa_conf_path) {
            Ok(conf) => wpa_field(&conf, key),
            Err(_) => String::new(),
        }
    }

    /// Whether the music panel is enabled. The state file is written by
    /// other tools on the device; any read failure means "hidden".
    pub fn music_panel_enabled(&self) -> bool {
        fs::read_to_string(&self.panel_state_path)
            .map(|s| s.contains("on"))
            .unwrap_or(false)
    }
}

/// Value of a `key=value` line in a wpa_supplicant config, quotes stripped.
/// Last occurrence wins, matching how wpa_supplicant layers network blocks.
fn wpa_field(conf: &str, key: &str) -> String {
    let mut value = String::new();
    for line in conf.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(key) {
            if let Some(v) = rest.strip_prefix('=') {
                value = v.trim().trim_matches('"').to_string();
            }
        }
    }
    value
}

fn interface_ipv4(name: &str) -> Option<String> {
    let addrs = getifaddrs().ok()?;
    for ifaddr in addrs {
        if ifaddr.interface_name != name {
            continue;
        }
        if let Some(addr) = ifaddr.address {
            if let Some(sin) = addr.as_sockaddr_in() {
                return Some(sin.ip().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net_info(root: &Path) -> NetInfo {
        NetInfo::new(
            root.join("hostname"),
            root.join("wpa_supplicant.conf"),
            root.join("state"),
            "definitely-not-an-interface",
        )
    }

    #[test]
    fn hostname_is_trimmed() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("hostname"), "raspi\n").unwrap();

        assert_eq!(net_info(temp.path()).hostname(), "raspi");
    }

    #[test]
    fn missing_files_yield_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let info = net_info(temp.path());

        assert_eq!(info.hostname(), "");
        assert_eq!(info.configured_ssid(), "");
        assert_eq!(info.configured_psk(), "");
        assert!(!info.music_panel_enabled());
    }

    #[test]
    fn unknown_interface_yields_placeholder() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(net_info(temp.path()).ip_address(), NO_IP);
    }

    #[test]
    fn wpa_conf_fields_are_parsed() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("wpa_supplicant.conf"),
            concat!(
                "ctrl_interface=DIR=/var/run/wpa_supplicant\n",
                "network={\n",
                "    ssid=\"MyWifi\"\n",
                "    #psk=\"secret\"\n",
                "    psk=6cf0e30e4e4b...\n",
                "    scan_ssid=1\n",
                "}\n",
            ),
        )
        .unwrap();

        let info = net_info(temp.path());
        assert_eq!(info.configured_ssid(), "MyWifi");
        assert_eq!(info.configured_psk(), "secret");
    }

    #[test]
    fn last_network_block_wins() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join("wpa_supplicant.conf"),
            "ssid=\"Old\"\nssid=\"New\"\n",
        )
        .unwrap();

        assert_eq!(net_info(temp.path()).configured_ssid(), "New");
    }

    #[test]
    fn panel_flag_checks_for_on() {
        let temp = tempfile::tempdir().unwrap();
        let state = temp.path().join("state");
        let info = net_info(temp.path());

        fs::write(&state, "off").unwrap();
        assert!(!info.music_panel_enabled());

        fs::write(&state, "music=on\n").unwrap();
        assert!(info.music_panel_enabled());
    }
}
