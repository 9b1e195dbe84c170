use anyhow::{Context, Result};
use clap::Parser;
use dragonlink::{IngestHandler, SessionController};
use dragonlink_core::config::{AppConfig, LogFormat, LoggingConfig};
use dragonlink_core::settings::SettingsHandle;
use dragonlink_core::types::ConnectionMode;
use dragonlink_store::{Identified, Store, StoreCoordinator, StoreEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// DragonLink - drone and sensor kit telemetry receiver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "DRAGONLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Override connection mode (multicast, direct-socket, both)
    #[arg(short, long)]
    mode: Option<ConnectionMode>,

    /// Override the host for the selected mode
    #[arg(long)]
    host: Option<String>,

    /// Start listening immediately
    #[arg(short, long)]
    listen: bool,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_config_builder(path)
            .with_context(|| format!("Failed to load config file: {:?}", path))?,
        None => AppConfig::default(),
    };

    if args.mode.is_some() || args.host.is_some() {
        let mode = args.mode.unwrap_or(config.connection.mode);
        config.connection.update_connection(mode, args.host.as_deref());
    }
    if args.listen {
        config.connection.listening = true;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dragonlink={0},dragonlink_core={0},dragonlink_client={0},dragonlink_store={0},dragonlink_cot={0}", logging.level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Logs store changes until the store is dropped.
async fn watch_store<R, F>(store: Arc<Store<R>>, describe: F)
where
    R: Identified,
    F: Fn(&R) -> String + Send + 'static,
{
    let mut events = store.subscribe();
    loop {
        match events.recv().await {
            Ok(StoreEvent::Inserted { record, .. }) => {
                info!(store = store.name(), identity = %record.identity(), detail = %describe(&record), "New entry");
            }
            Ok(StoreEvent::Updated { record, .. }) => {
                debug!(store = store.name(), identity = %record.identity(), detail = %describe(&record), "Entry updated");
            }
            Ok(StoreEvent::Cleared { removed }) => {
                info!(store = store.name(), removed, "Store cleared");
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(store = store.name(), skipped, "Store observer fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(unix)]
async fn control_signals(settings: SettingsHandle, config_path: Option<PathBuf>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    let mut toggle =
        signal(SignalKind::user_defined1()).context("Failed to install SIGUSR1 handler")?;

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                let Some(path) = &config_path else {
                    warn!("SIGHUP received but no configuration file was given");
                    continue;
                };
                match AppConfig::from_config_builder(path).and_then(|c| c.validate().map(|_| c)) {
                    Ok(config) => {
                        info!(path = %path.display(), "Configuration reloaded");
                        settings.replace(config.connection);
                    }
                    Err(e) => warn!(error = %e, "Configuration reload failed, keeping current settings"),
                }
            }
            _ = toggle.recv() => {
                let listening = settings.toggle_listening();
                info!(listening, "Listening toggled");
            }
        }
    }
}

#[cfg(not(unix))]
async fn control_signals(_settings: SettingsHandle, _config_path: Option<PathBuf>) -> Result<()> {
    std::future::pending().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_tracing(&config.logging);

    info!("Starting DragonLink");
    if let Some(path) = &args.config {
        info!("Configuration loaded from {:?}", path);
    }
    info!(
        mode = %config.connection.mode,
        host = %config.connection.active_host(),
        listening = config.connection.listening,
        "Connection settings"
    );

    let coordinator = Arc::new(StoreCoordinator::new(&config.ingest));
    coordinator.start();

    tokio::spawn(watch_store(coordinator.telemetry(), |drone| {
        format!("{:.6},{:.6} {}", drone.lat, drone.lon, drone.cot_type)
    }));
    tokio::spawn(watch_store(coordinator.status(), |kit| {
        format!(
            "cpu {:.1}% temp {:.1}C",
            kit.system_stats.cpu_usage, kit.system_stats.temperature
        )
    }));

    let handler = Arc::new(IngestHandler::new(coordinator.clone()));
    let ingest_metrics = handler.metrics();

    let settings = SettingsHandle::new(config.connection.clone());
    let token = CancellationToken::new();
    let session = SessionController::new(config.ingest.clone(), handler);
    let session_task = tokio::spawn(session.run(settings.clone(), token.clone()));

    tokio::select! {
        result = control_signals(settings.clone(), args.config.clone()) => {
            result?;
        }
        result = signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Received shutdown signal, stopping...");
        }
    }

    token.cancel();
    session_task.await.context("Session task failed")?;
    coordinator.stop().await;

    let stores = coordinator.metrics().snapshot();
    info!(
        drones = coordinator.telemetry().len(),
        kits = coordinator.status().len(),
        decoded = ingest_metrics.telemetry_decoded() + ingest_metrics.status_decoded(),
        decode_failures = ingest_metrics.decode_failures(),
        updates = stores.telemetry_updated + stores.status_updated,
        "DragonLink stopped"
    );

    Ok(())
}
