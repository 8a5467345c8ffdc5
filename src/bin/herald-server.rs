// ABOUTME: Server binary wiring configuration, store, broker, and the REST and RPC listeners
// ABOUTME: Starts either or both transports and shuts down gracefully on ctrl-c or SIGTERM
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Herald Server Binary
//!
//! Loads configuration from the environment, opens the store (running
//! migrations), connects the Centrifugo client, and serves the selected
//! transports until a shutdown signal arrives.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use herald_server::{
    auth::AuthManager,
    broker::centrifugo::CentrifugoClient,
    config::environment::ServerConfig,
    constants::env_config,
    database::Database,
    gateway::Gateway,
    logging::LoggingConfig,
    routes::rest_router,
    rpc::rpc_router,
};
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Transports to serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportMode {
    /// REST only
    Rest,
    /// JSON-RPC only
    Rpc,
    /// Both listeners
    Both,
}

#[derive(Parser)]
#[command(name = "herald-server")]
#[command(about = "Herald - presence-aware notification gateway")]
struct Args {
    /// Override REST port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override RPC port
    #[arg(long)]
    rpc_port: Option<u16>,

    /// Transports to serve
    #[arg(long, value_enum, default_value_t = TransportMode::Both)]
    transport: TransportMode,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut logging = LoggingConfig::from_env();
    if env::var("RUST_LOG").is_err() {
        logging.level = env_config::log_level();
    }
    logging.init()?;

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    if let Some(http_port) = args.http_port {
        config.http.http_port = http_port;
    }
    if let Some(rpc_port) = args.rpc_port {
        config.http.rpc_port = rpc_port;
    }
    config.validate()?;
    info!("{}", config.summary());

    let database = Database::new(&config.database.to_connection_string())
        .await
        .context("Failed to open database")?;
    info!("Database ready: {}", config.database);

    let auth_manager = AuthManager::new(config.auth.key_ring()?);
    info!(
        "Authentication manager initialized with key {}",
        config.auth.key_id
    );

    let broker = CentrifugoClient::new(config.broker.centrifugo())
        .context("Failed to build Centrifugo client")?;

    let gateway = Arc::new(Gateway::new(
        Arc::new(database),
        Arc::new(auth_manager),
        Arc::new(broker),
        config.auth.bcrypt_cost,
    ));

    display_available_endpoints(&config, args.transport);

    let serve_rest = matches!(args.transport, TransportMode::Rest | TransportMode::Both);
    let serve_rpc = matches!(args.transport, TransportMode::Rpc | TransportMode::Both);

    let rest = async {
        if !serve_rest {
            return Ok(());
        }
        let router = rest_router(
            Arc::clone(&gateway),
            config.http.request_timeout(),
            &config.http.cors_allowed_origins,
        );
        serve("REST", &config.http.host, config.http.http_port, router).await
    };

    let rpc = async {
        if !serve_rpc {
            return Ok(());
        }
        let router = rpc_router(Arc::clone(&gateway), config.http.request_timeout());
        serve("RPC", &config.http.host, config.http.rpc_port, router).await
    };

    if let Err(e) = tokio::try_join!(rest, rpc) {
        error!("Server error: {e:#}");
        return Err(e);
    }

    info!("Herald server stopped");
    Ok(())
}

/// Bind and serve one listener until shutdown
async fn serve(name: &str, host: &str, port: u16, router: axum::Router) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {name} listener on {addr}"))?;
    info!("{name} listener on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| format!("{name} listener failed"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
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
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Display the endpoints of every served transport
fn display_available_endpoints(config: &ServerConfig, transport: TransportMode) {
    let host = &config.http.host;

    info!("=== Available API Endpoints ===");
    if transport != TransportMode::Rpc {
        display_rest_endpoints(host, config.http.http_port);
    }
    if transport != TransportMode::Rest {
        display_rpc_endpoints(host, config.http.rpc_port);
    }
    info!("=== End of Endpoint List ===");
}

#[allow(clippy::cognitive_complexity)]
fn display_rest_endpoints(host: &str, port: u16) {
    info!("REST:");
    info!("   Health:            GET  http://{host}:{port}/health");
    info!("   Register:          POST http://{host}:{port}/register");
    info!("   Login:             POST http://{host}:{port}/login");
    info!("   Token Refresh:     POST http://{host}:{port}/token_refresh");
    info!("   Profile:           GET  http://{host}:{port}/profile");
    info!("   Users (admin):     GET  http://{host}:{port}/users");
    info!("   Notifications:     GET  http://{host}:{port}/notifications?filter=");
    info!("   Mark Read:         POST http://{host}:{port}/notifications/mark_read");
    info!("   Publish (admin):   POST http://{host}:{port}/notifications/publish");
    info!("   Broadcast (admin): POST http://{host}:{port}/notifications/broadcast");
    info!("   Presence (admin):  GET  http://{host}:{port}/notifications/presence?channel=");
}

fn display_rpc_endpoints(host: &str, port: u16) {
    info!("JSON-RPC 2.0:");
    info!("   Endpoint:          POST http://{host}:{port}/rpc");
    info!(
        "   Methods:           {}",
        herald_server::rpc::RpcMethod::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
}
