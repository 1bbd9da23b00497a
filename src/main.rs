//! AgriCool server - Main Entry Point
//!
//! `serve` runs the HTTP/SSE/WebSocket API with the MQTT bridge;
//! `prune-notifications` runs one retention pass and exits.

use agricool::{
    client::{OfflinePublisher, PumpCommandPublisher},
    config::ServerConfig,
    http_transport::{AppState, HttpTransportServer},
    logging::{init_logging, LogConfig},
    realtime::RealtimeHub,
    services::{NotificationRetention, NotificationService},
    storage::Database,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Buffered readings between the broker and the correlator
const INGEST_CHANNEL_CAPACITY: usize = 256;

/// AgriCool server configuration
#[derive(Parser, Debug)]
#[command(name = "agricool-server")]
#[command(about = "Livestock-shed climate monitoring and misting control server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file
    #[arg(long, global = true, env = "AGRICOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Run without an MQTT broker; pump commands are only recorded
        #[arg(long)]
        offline: bool,
    },
    /// Delete old notifications and exit
    PruneNotifications {
        /// Keep notifications newer than this many days
        #[arg(long)]
        days: Option<u32>,
    },
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;

        if let Command::Serve { port, offline } = &self.command {
            if let Some(port) = port {
                config.http.port = *port;
            }
            if *offline {
                config.mqtt.enabled = false;
            }
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().context("invalid configuration")?;

    init_logging(LogConfig::from_settings(&config.logging).with_debug(cli.debug))?;

    match cli.command {
        Command::Serve { .. } => serve(config).await,
        Command::PruneNotifications { days } => {
            let db = Database::connect(&config.database).await?;
            let notifications = Arc::new(NotificationService::new(
                db,
                RealtimeHub::default(),
                config.notifications.default_limit,
            ));
            let days = days.unwrap_or(config.notifications.retention_days);
            let removed = notifications.prune_older_than(days).await?;
            info!("Removed {removed} notifications older than {days} days");
            Ok(())
        }
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    info!("🚀 Starting AgriCool server v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(&config.database)
        .await
        .with_context(|| format!("cannot open database {}", config.database.url))?;
    let hub = RealtimeHub::new(config.http.broadcast_capacity);
    let (readings_tx, readings_rx) = mpsc::channel(INGEST_CHANNEL_CAPACITY);

    let (publisher, mqtt) = connect_controller(&config, readings_tx)?;

    let state = Arc::new(AppState::new(&config, db, hub, publisher));
    state.correlator.restore().await?;
    let ingest = state.correlator.clone().spawn_ingest_loop(readings_rx);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let retention = NotificationRetention::new(
        state.notifications.clone(),
        config.notifications.retention_days,
        config.notifications.prune_interval,
    )
    .start(shutdown_rx);

    HttpTransportServer::new(state, &config.http)
        .serve(shutdown_signal())
        .await?;

    info!("Shutting down background tasks");
    let _ = shutdown_tx.send(true);
    #[cfg(feature = "mqtt")]
    if let Some(mqtt) = mqtt {
        mqtt.shutdown().await;
    }
    #[cfg(not(feature = "mqtt"))]
    let _ = mqtt;
    ingest.abort();
    if let Err(e) = retention.await {
        warn!("Retention task ended abnormally: {e}");
    }

    info!("👋 AgriCool server stopped");
    Ok(())
}

#[cfg(feature = "mqtt")]
type MqttHandle = Arc<agricool::client::MqttClient>;
#[cfg(not(feature = "mqtt"))]
type MqttHandle = ();

/// MQTT publisher when enabled, otherwise the in-memory one
fn connect_controller(
    config: &ServerConfig,
    readings: mpsc::Sender<agricool::models::IngestReading>,
) -> anyhow::Result<(Arc<dyn PumpCommandPublisher>, Option<MqttHandle>)> {
    if !config.mqtt.enabled {
        info!("📴 Offline mode: pump commands are recorded, not sent");
        let publisher: Arc<dyn PumpCommandPublisher> = Arc::new(OfflinePublisher::new());
        return Ok((publisher, None));
    }

    #[cfg(feature = "mqtt")]
    {
        let client = agricool::client::MqttClient::start(config.mqtt.clone(), readings)?;
        info!("📡 MQTT bridge started for {}", config.mqtt.primary_url);
        let publisher: Arc<dyn PumpCommandPublisher> = client.clone();
        return Ok((publisher, Some(client)));
    }

    #[cfg(not(feature = "mqtt"))]
    {
        drop(readings);
        warn!("Built without the mqtt feature; running offline");
        let publisher: Arc<dyn PumpCommandPublisher> = Arc::new(OfflinePublisher::new());
        return Ok((publisher, None));
    }
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
