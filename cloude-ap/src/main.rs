//! CloudE Audio Player (cloude-ap) - Main entry point
//!
//! Loads configuration and persisted player settings, scans the library,
//! then serves the control API while the engine ticker and lyrics follower
//! run in the background.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cloude_ap::api::{self, AppContext};
use cloude_ap::audio::{AudioOutput, Clock, Mixer, SystemClock};
use cloude_ap::config::{Config, ConfigOverrides};
use cloude_ap::library;
use cloude_ap::lyrics::LyricsFollower;
use cloude_ap::playback::file_media::FileMedia;
use cloude_ap::playback::{start_ticker, PlayerEngine};
use cloude_common::config::{PlayerSettings, SettingsStore};
use cloude_common::events::{EventBus, SlotId};
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Event bus capacity; slow SSE clients lag rather than block
const EVENT_CAPACITY: usize = 256;

/// Command-line arguments for cloude-ap
#[derive(Parser, Debug)]
#[command(name = "cloude-ap")]
#[command(about = "Dual-slot crossfading audio player")]
#[command(version)]
struct Args {
    /// Bootstrap TOML configuration file
    #[arg(short, long, env = "CLOUDE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "CLOUDE_AP_PORT")]
    port: Option<u16>,

    /// Folder scanned for audio files
    #[arg(short, long, env = "CLOUDE_LIBRARY")]
    library: Option<PathBuf>,

    /// Player settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(
        args.config.as_deref(),
        ConfigOverrides {
            port: args.port,
            library_folder: args.library,
            settings_path: args.settings,
        },
    )
    .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let default_filter = format!(
        "cloude_ap={0},cloude_common={0},tower_http={0}",
        config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CloudE Audio Player on port {}", config.port);

    let store = SettingsStore::new(&config.settings_path);
    let settings = store
        .load_or_init()
        .with_context(|| format!("Failed to load settings from {}", config.settings_path.display()))?;
    info!("Settings: {}", store.path().display());

    let tracks = match &config.library_folder {
        Some(folder) => {
            let folder = folder.clone();
            tokio::task::spawn_blocking(move || library::scan_folder(&folder))
                .await
                .context("Library scan task panicked")?
                .unwrap_or_else(|e| {
                    warn!("Library scan failed: {}", e);
                    Vec::new()
                })
        }
        None => {
            info!("No library folder configured");
            Vec::new()
        }
    };

    let events = EventBus::new(EVENT_CAPACITY);
    let auto_lyrics = settings.auto_lyrics;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let (engine, _output) = build_engine(clock, settings, events.clone());
    let mut engine = engine.with_store(store);

    // Follower subscribes before the first track is cued
    let follower = LyricsFollower::new(auto_lyrics).spawn(events.clone());

    let added = engine
        .add_tracks(tracks)
        .context("Failed to queue library tracks")?;
    info!("Library loaded: {} tracks", added);

    let engine = Arc::new(Mutex::new(engine));
    let ticker = start_ticker(Arc::clone(&engine));

    api::run(AppContext::new(engine, events), config.port, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    ticker.abort();
    follower.abort();
    info!("Shutdown complete");
    Ok(())
}

/// Engine playing through the default output device
///
/// Without a usable device the engine runs on simulated elements so the API
/// stays available. The returned output must outlive the engine's playback.
fn build_engine(
    clock: Arc<dyn Clock>,
    settings: PlayerSettings,
    events: EventBus,
) -> (PlayerEngine, Option<AudioOutput>) {
    let mixer = Arc::new(Mixer::new());
    match AudioOutput::start(Arc::clone(&mixer)) {
        Ok(output) => {
            let rate = output.sample_rate();
            let a = FileMedia::new(SlotId::A, mixer.voice(SlotId::A), rate);
            let b = FileMedia::new(SlotId::B, mixer.voice(SlotId::B), rate);
            let engine =
                PlayerEngine::with_elements(clock, Box::new(a), Box::new(b), settings, events);
            (engine, Some(output))
        }
        Err(e) => {
            warn!("No audio output ({}); playback will be silent", e);
            (PlayerEngine::new(clock, settings, events), None)
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
