#![allow(missing_docs)]

//! Warelay entry point: CLI parsing, wiring, and the session event loop.
//!
//! `start` runs the relay until a termination signal or a fatal session
//! error. `status` queries the bridge once and exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use warelay::config::{self, Config};
use warelay::logging;
use warelay::relay::InboundForwarder;
use warelay::server::{self, AppState};
use warelay::whatsapp::client::WhatsAppClient;
use warelay::whatsapp::events::{spawn_event_listener, BridgeEvent};
use warelay::whatsapp::{session, Bridge};

/// Buffer size of the bridge event channel.
const EVENT_CHANNEL_SIZE: usize = 64;

#[derive(Parser)]
#[command(name = "warelay", version, about = "Relay WhatsApp messages to a webhook")]
struct Cli {
    /// Path to config.toml (defaults to ~/.warelay/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay: WhatsApp session, webhook forwarding, HTTP API.
    Start,
    /// Query the bridge connection status and exit.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_dir()?.join("config.toml"),
    };

    match cli.command {
        Command::Start => start(&config_path).await,
        Command::Status => status(&config_path).await,
    }
}

/// Run the relay daemon until a termination signal or a fatal session
/// error. Exits 0 on a signal, 1 on authentication failure or exhausted
/// reconnects.
async fn start(config_path: &Path) -> Result<()> {
    let logs_dir = config::config_dir()?.join("logs");
    let _logging_guard = logging::init_daemon(&logs_dir)?;

    let config = config::load_config(config_path).context("failed to load configuration")?;
    info!(version = env!("CARGO_PKG_VERSION"), "warelay starting");

    let client = Arc::new(WhatsAppClient::new(config.bridge.base_url.clone()));

    // The session store's location is ours to configure; its contents are
    // the bridge's business.
    let session_dir = config::session_dir(&config)?;
    std::fs::create_dir_all(&session_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create session directory {}: {e}",
            session_dir.display()
        )
    })?;
    client
        .init_session(&session_dir)
        .await
        .context("failed to initialize WhatsApp session")?;

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
    let listener = spawn_event_listener(config.bridge.base_url.clone(), event_tx);

    let bridge: Arc<dyn Bridge> = Arc::clone(&client) as Arc<dyn Bridge>;
    let bind = config.http.bind.clone();
    let http = tokio::spawn(async move {
        if let Err(e) = server::serve(bind, AppState { bridge }).await {
            error!(error = %e, "HTTP API terminated");
        }
    });

    let forwarder = InboundForwarder::new(config.webhook.url.clone(), Arc::clone(&client));

    let result = run_event_loop(&config, &client, &forwarder, &session_dir, event_rx).await;

    // Teardown: close the session before exiting (best effort).
    if let Err(e) = client.close_session().await {
        warn!(error = %e, "session teardown failed");
    }
    listener.abort();
    http.abort();
    info!("warelay shut down");

    result
}

/// Consume session events one at a time until shutdown.
///
/// Each inbound message is handled to completion before the next event is
/// taken, so handlers never interleave.
async fn run_event_loop(
    config: &Config,
    client: &Arc<WhatsAppClient>,
    forwarder: &InboundForwarder,
    session_dir: &Path,
    mut event_rx: mpsc::Receiver<BridgeEvent>,
) -> Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    warn!("bridge event stream ended");
                    return Ok(());
                };
                match event {
                    BridgeEvent::Qr { code } => {
                        info!("pairing required, scan the code below with WhatsApp > Linked Devices");
                        println!("{code}");
                    }
                    BridgeEvent::Authenticated => info!("WhatsApp session authenticated"),
                    BridgeEvent::Ready => info!("WhatsApp session ready"),
                    BridgeEvent::AuthFailure { message } => {
                        let reason = message.unwrap_or_else(|| "pairing rejected".to_owned());
                        error!(%reason, "WhatsApp authentication failed");
                        anyhow::bail!("WhatsApp authentication failed: {reason}");
                    }
                    BridgeEvent::Disconnected { reason } => {
                        warn!(
                            reason = reason.as_deref().unwrap_or("unknown"),
                            "WhatsApp session disconnected"
                        );
                        session::reinitialize(client, session_dir, &config.reconnect)
                            .await
                            .context("could not recover WhatsApp session")?;
                    }
                    BridgeEvent::Message(msg) => forwarder.handle_message(msg).await,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
                return Ok(());
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                return Ok(());
            }
        }
    }
}

/// Print the bridge connection status.
async fn status(config_path: &Path) -> Result<()> {
    logging::init_minimal();

    let config = config::load_config(config_path)?;
    let client = WhatsAppClient::new(config.bridge.base_url.clone());

    match client.status().await {
        Ok(s) if s.connected => match s.phone_number {
            Some(number) => println!("connected ({number})"),
            None => println!("connected"),
        },
        Ok(_) => println!("disconnected"),
        Err(e) => println!("bridge unreachable: {e}"),
    }
    Ok(())
}
