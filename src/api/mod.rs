//! Health server
//!
//! A small HTTP surface for hosting platforms that probe liveness. It knows
//! nothing about conversations.

use crate::config::HealthConfig;
use crate::error::{Error, Result};
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the health router
///
/// # Routes
///
/// - `GET /` - Static running indicator
/// - `GET /health` - Status, bot name, version and uptime
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the health router until `shutdown` fires
///
/// # Errors
/// Returns error if the address cannot be bound or serving fails
pub async fn start_health_server(
    config: &HealthConfig,
    bot_name: &str,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind_address = config.bind_address;
    let app = create_router(AppState::new(bot_name));

    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;

    tracing::info!(address = %bind_address, "health server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::ApiServerError(e.to_string()))?;

    tracing::info!("health server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
