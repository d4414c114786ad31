//! `frog`: runs the game server or pings a running one.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use frog_client::{ChannelSubscriber, Connection};
use frog_server::GameServer;
use frog_types::{ConnectResult, MessageKind};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::cli::{Cli, Command, PingArgs, ServeArgs};
use crate::config::AppConfig;
use crate::logging::setup_logging;
use crate::signals::wait_for_shutdown_signal;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Ping(args) => ping(args).await,
    };

    if let Err(e) = outcome {
        error!("❌ {:#}", e);
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load_from_file(&args.config)
        .await
        .with_context(|| format!("loading {}", args.config.display()))?;

    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }
    if let Some(workers) = args.worker_threads {
        config.server.worker_threads = workers;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;
    setup_logging(&config.logging.level, config.logging.json_format)?;

    let server_config = config.to_server_config()?;
    info!("🐸 Frog server v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration Summary:");
    info!("  🌐 Bind address: {}", server_config.bind_address);
    info!("  👥 Max connections: {}", server_config.max_connections);
    info!("  ⚙️ Workers: {}", server_config.worker_count());
    info!("  🔌 Handlers: {}", server_config.handlers.join(", "));

    let handle = GameServer::new(server_config)?.start()?;
    info!("🎮 Ready to accept connections on {}", handle.local_addr());
    info!("🛑 Press Ctrl+C to gracefully shutdown");

    wait_for_shutdown_signal().await?;
    info!("🛑 Shutdown signal received, initiating graceful shutdown...");

    // Joining the server threads blocks.
    let stats = handle.stats();
    let executed = tokio::task::spawn_blocking(move || {
        let executed = handle.executed_requests();
        handle.shutdown();
        executed
    })
    .await?;

    info!("📊 Final Statistics:");
    info!("  - Requests executed: {}", executed);
    info!("  - Players connected: {}", stats.players());
    info!("  - Tile changes: {}", stats.tile_changes());
    info!("✅ Frog server shutdown complete");
    Ok(())
}

async fn ping(args: PingArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load_from_file(&args.config)
        .await
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(log_level) = args.log_level.clone() {
        config.logging.level = log_level;
    }
    setup_logging(&config.logging.level, config.logging.json_format)?;

    let connection_config = config.to_connection_config();
    let token = tokio::task::spawn_blocking(move || run_ping(connection_config, &args)).await??;
    info!("🔑 Authenticated, token {}", token);
    Ok(())
}

/// Dials, handshakes and authenticates once, returning the issued token.
fn run_ping(config: frog_client::ConnectionConfig, args: &PingArgs) -> anyhow::Result<String> {
    let timeout = config.handshake_timeout();
    let connection = Connection::new(config);
    let (subscriber, packets) = ChannelSubscriber::new();
    connection.add_packet_subscriber(subscriber);

    connection.start(&args.host, args.port)?;
    info!("🔗 Connected to {}:{} ({})", args.host, args.port, connection.state());
    connection.connect(&args.account, &args.password)?;

    let deadline = Instant::now() + timeout;
    let reply = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let message = packets
            .recv_timeout(remaining)
            .map_err(|_| anyhow!("no authentication reply within {:?}", timeout))?;
        if message.kind() == MessageKind::ConnectResult {
            break message.payload::<ConnectResult>()?;
        }
        warn!("Ignoring {} while waiting for the authentication reply", message.kind());
    };
    connection.disconnect();

    match (reply.result, reply.token) {
        (true, Some(token)) => Ok(token),
        (true, None) => bail!("server accepted the account without issuing a token"),
        (false, _) => bail!(
            "authentication rejected: {}",
            reply.reason.unwrap_or_else(|| "no reason given".to_string())
        ),
    }
}
