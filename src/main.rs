//! Clock panel
//!
//! Drives a small attached status display: time and date, network identity,
//! now-playing metadata from an external source process, and an on-device
//! configuration flow for hostname and Wi-Fi credentials.

mod app;
mod input;
mod metadata;
mod platform;
mod state;
mod ui;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use app::App;
use metadata::MetadataWatcher;
use platform::applier::ScriptApplier;
use platform::netinfo::NetInfo;
use state::DisplayState;
use ui::UiBackend;

/// Command-line configuration. Defaults match the device image layout.
#[derive(Debug, Parser)]
#[command(name = "clock-panel", about = "Clock and now-playing status panel")]
struct Args {
    /// Command that emits metadata lines on stdout
    #[arg(long, default_value = "scripts/metadata.sh")]
    metadata_cmd: String,

    /// Network interface whose IPv4 address is shown
    #[arg(long, default_value = "wlan0")]
    interface: String,

    /// File whose contents gate the music panel ("on" enables it)
    #[arg(long, default_value = "/tmp/state")]
    panel_state_file: PathBuf,

    /// Script invoked with the new hostname
    #[arg(long, default_value = "scripts/hostname.sh")]
    hostname_script: PathBuf,

    /// Script invoked with the new SSID and password
    #[arg(long, default_value = "scripts/wifi-setup.sh")]
    wifi_script: PathBuf,

    /// Render tick in milliseconds
    #[arg(long, default_value_t = 200)]
    tick_ms: u64,
}

/// Main entry point
fn main() {
    // Initialize logging to stdout/stderr
    tracing_subscriber::fmt::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    info!("clock-panel starting...");

    // Run the application and handle any errors
    match run(Args::parse()) {
        Ok(()) => {
            info!("clock-panel exiting cleanly");
            process::exit(0);
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("\nFATAL ERROR: {:#}", e);
            process::exit(1);
        }
    }
}

/// Main application logic
fn run(args: Args) -> Result<()> {
    // One-way shutdown flag; signals only ever set it.
    let shutdown = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        signal_hook::flag::register(sig, Arc::clone(&shutdown))
            .with_context(|| format!("Failed to install handler for signal {sig}"))?;
    }

    let display_state = Arc::new(DisplayState::default());

    // Initialize UI backend
    info!("Initializing UI backend...");
    let mut ui = ui::create_backend().context("Failed to create UI backend")?;
    ui.init().context("Failed to initialize UI backend")?;

    // Initialize input handler
    info!("Initializing input handler...");
    let mut input = input::create_handler().context("Failed to create input handler")?;
    input.init().context("Failed to initialize input handler")?;

    let netinfo = NetInfo::new_default(&args.interface, &args.panel_state_file);
    let applier = ScriptApplier::new(&args.hostname_script, &args.wifi_script);
    let mut app = App::new(Arc::clone(&display_state), Box::new(applier));

    // Metadata is best-effort: a source that fails to start just leaves the
    // panel without music info.
    let watcher = spawn_watcher(&args.metadata_cmd, &display_state, &shutdown);

    info!("Entering main loop...");
    let tick = Duration::from_millis(args.tick_ms);

    // Main event loop
    while !shutdown.load(Ordering::SeqCst) {
        // Feed everything queued since the last tick to the mode machine
        loop {
            match input.poll() {
                Ok(Some(key)) => {
                    debug!("Key event: {:?}", key);
                    app.handle_key(key);
                    if app.take_drain_request() {
                        if let Err(e) = input.drain() {
                            warn!("Failed to drain queued input: {}", e);
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Input error: {}", e);
                    break;
                }
            }
        }

        // Check if we should exit
        if app.should_exit() {
            info!("Exit requested from the panel");
            shutdown.store(true, Ordering::SeqCst);
            break;
        }

        render_frame(&mut *ui, &display_state, &netinfo, app.entry())?;

        thread::sleep(tick);
    }

    // Cleanup
    info!("Shutting down...");
    if let Some(watcher) = watcher {
        watcher.shutdown();
    }
    input.cleanup().context("Failed to cleanup input handler")?;
    ui.cleanup().context("Failed to cleanup UI backend")?;

    Ok(())
}

/// Start the metadata watcher, or run without one if the source is broken
fn spawn_watcher(
    cmd: &str,
    state: &Arc<DisplayState>,
    shutdown: &Arc<AtomicBool>,
) -> Option<MetadataWatcher> {
    let mut parts = cmd.split_whitespace();
    let Some(program) = parts.next() else {
        warn!("Empty metadata command; music info disabled");
        return None;
    };
    let argv: Vec<&str> = parts.collect();

    match MetadataWatcher::spawn(program, &argv, Arc::clone(state), Arc::clone(shutdown)) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("Metadata source unavailable: {:#}", e);
            None
        }
    }
}

/// Render a frame with current application state
fn render_frame(
    ui: &mut dyn UiBackend,
    state: &DisplayState,
    netinfo: &NetInfo,
    entry: &str,
) -> Result<()> {
    let snapshot = state.snapshot();
    let lines = ui::screens::compose(&snapshot, entry, netinfo, Local::now());

    // Clear screen to dark blue
    ui.clear(0, 0, 64)?;
    ui.render_lines(&lines)?;
    ui.present()?;

    Ok(())
}
