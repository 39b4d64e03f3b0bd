//! Multiplayer kart racing: position relay server, sync client and the
//! client-side kart simulation.

pub mod app;
pub mod client;
pub mod config;
pub mod http;
pub mod session;
pub mod util;
pub mod vehicle;
pub mod ws;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::app::AppState;
use crate::config::Config;
use crate::http::build_router;

/// Serve the relay on an already bound listener until it fails
pub async fn run(listener: TcpListener, config: Config) -> std::io::Result<()> {
    run_until(listener, config, std::future::pending()).await
}

/// Serve the relay until `shutdown` resolves
pub async fn run_until<F>(listener: TcpListener, config: Config, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    let state = AppState::new(config);
    let router = build_router(state);

    info!(%address, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "Server error");
        })
}
