mod routes;
mod singleton;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use kinsync_core::{KinsyncConfig, Scheduler};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = KinsyncConfig::load()?;
    let lock = singleton::lock_data_dir(&config.data_path())?;
    debug!(lock = %lock.path().display(), "Locked data directory");

    let scheduler = Arc::new(Scheduler::from_config(&config)?);
    let sweep = scheduler.spawn_periodic(config.sync_interval()?);

    let app = app(AppState::new(scheduler));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server_port));
    info!("kinsync-server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    sweep.shutdown().await;
    Ok(())
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::sources::router())
        .with_state(state)
        .layer(cors)
}
