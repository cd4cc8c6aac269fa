//! Configuration appliers
//!
//! The actual hostname and Wi-Fi changes are made by shell scripts shipped
//! with the device image; this module only invokes them. Exit status is
//! logged but never inspected; the config flow moves on either way.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// Seam between the mode machine and the system-changing scripts.
pub trait ConfigApplier {
    fn set_hostname(&self, name: &str);

    /// Expected to be slow (it restarts networking); the caller blocks on it
    /// and discards any input queued while it ran.
    fn set_wifi(&self, ssid: &str, password: &str);
}

/// Applier that shells out to the device scripts.
pub struct ScriptApplier {
    hostname_script: PathBuf,
    wifi_script: PathBuf,
}

impl ScriptApplier {
    pub fn new(hostname_script: impl Into<PathBuf>, wifi_script: impl Into<PathBuf>) -> Self {
        Self {
            hostname_script: hostname_script.into(),
            wifi_script: wifi_script.into(),
        }
    }

    fn run(script: &Path, args: &[&str]) {
        info!("Applying config via {}", script.display());
        match Command::new(script).args(args).status() {
            Ok(status) => info!("{} exited with {}", script.display(), status),
            Err(e) => warn!("Failed to run {}: {}", script.display(), e),
        }
    }
}

impl ConfigApplier for ScriptApplier {
    fn set_hostname(&self, name: &str) {
        Self::run(&self.hostname_script, &[name]);
    }

    fn set_wifi(&self, ssid: &str, password: &str) {
        Self::run(&self.wifi_script, &[ssid, password]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(path: &Path, out_file: &Path) {
        let body = format!("#!/bin/sh\necho \"$@\" > {}\n", out_file.display());
        fs::write(path, body).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn scripts_receive_positional_args() {
        let temp = tempfile::tempdir().unwrap();
        let hostname_script = temp.path().join("hostname.sh");
        let wifi_script = temp.path().join("wifi-setup.sh");
        let hostname_out = temp.path().join("hostname.out");
        let wifi_out = temp.path().join("wifi.out");
        write_script(&hostname_script, &hostname_out);
        write_script(&wifi_script, &wifi_out);

        let applier = ScriptApplier::new(&hostname_script, &wifi_script);
        applier.set_hostname("raspi");
        applier.set_wifi("MyWifi", "secret");

        assert_eq!(fs::read_to_string(&hostname_out).unwrap().trim(), "raspi");
        assert_eq!(fs::read_to_string(&wifi_out).unwrap().trim(), "MyWifi secret");
    }

    #[test]
    fn missing_script_is_swallowed() {
        let applier = ScriptApplier::new("/nonexistent/hostname.sh", "/nonexistent/wifi.sh");
        // Must log and return, not panic or surface an error.
        applier.set_hostname("raspi");
        applier.set_wifi("MyWifi", "secret");
    }
}
