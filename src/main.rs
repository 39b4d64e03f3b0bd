//! Kart relay server
//!
//! Accepts websocket connections from kart clients and relays join, move and
//! leave events between everyone in the single shared session.

use tokio::net::TcpListener;
use tracing::info;

use multikart::config::{lan_server_url, Config};
use multikart::util::telemetry::init_tracing;
use multikart::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);
    init_server_time();

    info!("Starting kart relay server");

    let addr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Liveness: http://{}/", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);
    info!(
        "Other players connect with SERVER_URL={}",
        lan_server_url(local_ipaddress::get().as_deref(), addr.port())
    );

    multikart::run_until(listener, config, shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
