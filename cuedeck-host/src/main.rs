//! cuedeck - personal audio-cue player
//!
//! Runs the playback host and the remote-control gateway in one process,
//! joined by a host link.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cuedeck_common::link::{host_link, DEFAULT_LINK_CAPACITY};
use cuedeck_host::audio::mixer_engine::EngineOptions;
use cuedeck_host::audio::{AudioOutput, MixerEngine};
use cuedeck_host::config::TomlConfig;
use cuedeck_host::db;
use cuedeck_host::events::EventBus;
use cuedeck_host::host::{spawn_host, HostOptions};
use cuedeck_host::playback::Player;
use cuedeck_host::store::StoreState;
use cuedeck_remote::Gateway;

/// Command-line arguments for cuedeck
#[derive(Parser, Debug)]
#[command(name = "cuedeck")]
#[command(about = "Personal audio-cue player with a remote-control API")]
#[command(version)]
struct Args {
    /// Bootstrap config file (TOML)
    #[arg(short, long, env = "CUEDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Port for the remote-control API
    #[arg(short, long, env = "CUEDECK_PORT")]
    port: Option<u16>,

    /// Address for the remote-control API
    #[arg(long, env = "CUEDECK_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// SQLite database file
    #[arg(long, env = "CUEDECK_DATABASE")]
    database: Option<PathBuf>,

    /// Output device name
    #[arg(long, env = "CUEDECK_AUDIO_DEVICE")]
    audio_device: Option<String>,

    /// Render into a null sink instead of a sound card
    #[arg(long, env = "CUEDECK_HEADLESS")]
    headless: bool,

    /// Remote request timeout in milliseconds
    #[arg(long, env = "CUEDECK_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: Option<u64>,

    /// Progress tick in milliseconds
    #[arg(long, env = "CUEDECK_PROGRESS_TICK_MS")]
    progress_tick_ms: Option<u64>,

    /// Replace the library with one exported as JSON
    #[arg(long)]
    import: Option<PathBuf>,

    /// Print output device names and exit
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn apply_to(&self, config: &mut TomlConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(address) = &self.bind_address {
            config.bind_address = address.clone();
        }
        if let Some(database) = &self.database {
            config.database_path = Some(database.clone());
        }
        if let Some(device) = &self.audio_device {
            config.audio_device = Some(device.clone());
        }
        if self.headless {
            config.headless = true;
        }
        if let Some(timeout) = self.request_timeout_ms {
            config.request_timeout_ms = timeout;
        }
        if let Some(tick) = self.progress_tick_ms {
            config.progress_tick_ms = tick.max(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to list audio devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    info!("Starting cuedeck v{}", env!("CARGO_PKG_VERSION"));

    let database_path = config.database_path();
    let pool = db::connect(&database_path)
        .await
        .with_context(|| format!("Failed to open database {}", database_path.display()))?;
    let mut state = db::load_state(&pool).await.context("Failed to load persisted state")?;

    if let Some(path) = &args.import {
        let library = db::import_library(&pool, path)
            .await
            .with_context(|| format!("Failed to import library from {}", path.display()))?;
        state = StoreState::new(library, state.playback.preferences());
    }

    let engine = MixerEngine::open(&EngineOptions {
        device: config.audio_device.clone(),
        headless: config.headless,
        fade_curve: config.fade_curve,
    })
    .context("Failed to initialize audio engine")?;

    let player = Player::new(state, Box::new(engine), EventBus::default());
    let persister = db::Persister::new(pool.clone()).spawn(player.subscribe());

    let (link, endpoint) = host_link(DEFAULT_LINK_CAPACITY);
    let (host, host_task) = spawn_host(
        player,
        endpoint,
        HostOptions {
            progress_tick: Duration::from_millis(config.progress_tick_ms),
            ..HostOptions::default()
        },
    );

    let gateway = Arc::new(Gateway::new(Duration::from_millis(config.request_timeout_ms)));
    let pump = gateway.attach(link);
    let app = cuedeck_remote::api::router(Arc::clone(&gateway));

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, config.port))?;
    cuedeck_remote::api::serve(addr, app, shutdown_signal())
        .await
        .context("Server error")?;

    host.shutdown().await;
    if let Err(e) = host_task.await {
        warn!("Playback host task ended abnormally: {}", e);
    }
    if let Err(e) = pump.await {
        warn!("Gateway link task ended abnormally: {}", e);
    }
    drop(host);
    if let Err(e) = persister.await {
        warn!("Persister task ended abnormally: {}", e);
    }
    pool.close().await;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install signal handler: {}", e);
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
