//! Metadata watcher
//!
//! Owns the external metadata-emitting process and the one background thread
//! that reads its output. Parsed fields are published into the shared display
//! state. The process runs in its own process group so shutdown can reap any
//! children it spawned. If the source exits on its own it is never restarted;
//! the panel just shows no music info from then on.

pub mod parser;

use anyhow::{anyhow, Context, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader};
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::state::DisplayState;

/// Handle to the spawned metadata source and its reader thread.
pub struct MetadataWatcher {
    pgid: Pid,
    reader: Option<JoinHandle<()>>,
}

impl MetadataWatcher {
    /// Spawn the metadata command in its own process group and start reading
    /// its output. Called at most once for the lifetime of the program.
    pub fn spawn(
        program: &str,
        args: &[&str],
        state: Arc<DisplayState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .with_context(|| format!("Failed to spawn metadata source '{program}'"))?;

        // process_group(0) makes the child its own group leader, so its pid
        // doubles as the group id to signal at shutdown.
        let pgid = Pid::from_raw(child.id() as i32);
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to capture metadata source stdout"))?;

        info!("Metadata source started: {} (pid {})", program, child.id());

        let reader = thread::spawn(move || read_loop(stdout, child, pgid, &state, &shutdown));

        Ok(Self { pgid, reader: Some(reader) })
    }

    /// Terminate the process group and wait for the reader thread to finish.
    ///
    /// The reader spends its life blocked on a line read, so killing the
    /// group is what actually unblocks it (EOF on the pipe).
    pub fn shutdown(mut self) {
        terminate_group(self.pgid);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                warn!("Metadata reader thread panicked");
            }
        }
    }
}

fn read_loop(
    stdout: ChildStdout,
    mut child: Child,
    pgid: Pid,
    state: &DisplayState,
    shutdown: &AtomicBool,
) {
    debug!("Metadata reader thread starting");

    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match line {
            Ok(line) => {
                if let Some((field, value)) = parser::parse_line(&line) {
                    debug!("Metadata update: {:?} = {:?}", field, value);
                    state.set_track(field, value);
                }
            }
            Err(e) => {
                warn!("Metadata read failed: {}", e);
                break;
            }
        }
    }

    if !shutdown.load(Ordering::SeqCst) {
        warn!("Metadata source stopped producing output; not restarting");
    }

    terminate_group(pgid);
    match child.wait() {
        Ok(status) => info!("Metadata source exited with {}", status),
        Err(e) => warn!("Failed to reap metadata source: {}", e),
    }

    debug!("Metadata reader thread exiting");
}

/// SIGTERM the whole group so any children of the metadata tool are reaped
/// too. Signalling an already-dead group is benign and not retried.
fn terminate_group(pgid: Pid) {
    if let Err(e) = signal::killpg(pgid, Signal::SIGTERM) {
        debug!("Could not signal metadata process group (already dead?): {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DisplayState;
    use std::time::{Duration, Instant};

    fn wait_for<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn publishes_parsed_fields_into_state() {
        let state = Arc::new(DisplayState::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let watcher = MetadataWatcher::spawn(
            "sh",
            &["-c", r#"printf 'Artist: "Daft Punk"\nTitle: "One More Time"\n'; sleep 30"#],
            Arc::clone(&state),
            Arc::clone(&shutdown),
        )
        .unwrap();

        assert!(
            wait_for(
                || {
                    let track = state.snapshot().track;
                    track.artist == "Daft Punk" && track.title == "One More Time"
                },
                Duration::from_secs(5)
            ),
            "metadata never reached shared state"
        );

        shutdown.store(true, Ordering::SeqCst);
        watcher.shutdown();
    }

    #[test]
    fn shutdown_terminates_a_blocked_source() {
        let state = Arc::new(DisplayState::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        // A source that produces nothing and would otherwise run forever.
        let watcher = MetadataWatcher::spawn(
            "sh",
            &["-c", "sleep 30"],
            Arc::clone(&state),
            Arc::clone(&shutdown),
        )
        .unwrap();

        shutdown.store(true, Ordering::SeqCst);
        let start = Instant::now();
        watcher.shutdown();
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "group termination did not unblock the reader"
        );
    }

    #[test]
    fn source_exit_stops_the_watcher() {
        let state = Arc::new(DisplayState::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let watcher = MetadataWatcher::spawn(
            "sh",
            &["-c", r#"printf 'Artist: "Random Access"\n'"#],
            Arc::clone(&state),
            Arc::clone(&shutdown),
        )
        .unwrap();

        assert!(
            wait_for(
                || state.snapshot().track.artist == "Random Access",
                Duration::from_secs(5)
            ),
            "metadata never reached shared state"
        );

        // The reader winds down on its own after EOF; joining must not hang
        // even though the shutdown flag was never set.
        watcher.shutdown();
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let state = Arc::new(DisplayState::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let result = MetadataWatcher::spawn(
            "/nonexistent/metadata-source",
            &[],
            state,
            shutdown,
        );
        assert!(result.is_err());
    }
}
