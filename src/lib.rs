//! # tubedrop
//!
//! Chat bot core that downloads videos, audio and whole playlists from
//! supported video hosts and delivers them into the conversation.
//!
//! ## Design Philosophy
//!
//! tubedrop is designed to be:
//! - **Library-first** - The binary is a thin wrapper around [`run`]
//! - **Seam-driven** - Media extraction ([`MediaEngine`]) and chat delivery
//!   ([`Transport`]) are traits, so the core runs against fakes in tests
//! - **Single-owner** - One [`Dispatcher`] task owns every session; jobs report
//!   back to it over a channel instead of sharing locks
//! - **Event-driven** - Consumers subscribe to lifecycle [`Event`]s
//!
//! ## Quick Start
//!
//! ```no_run
//! use tubedrop::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::load(None)?;
//!     config.telegram.bot_token = "123456:token".to_string();
//!
//!     // Runs until SIGTERM or SIGINT
//!     tubedrop::run(config).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Health server
pub mod api;
/// Sequential collection downloads
pub mod batch;
/// Link recognition and classification
pub mod classifier;
/// Configuration types
pub mod config;
/// Artifact upload and cleanup
pub mod delivery;
/// Conversation dispatcher
pub mod dispatcher;
/// Media extraction engine
pub mod engine;
/// Error types
pub mod error;
/// Single-item downloads
pub mod executor;
/// Format selection
pub mod format;
/// Selection menu state machine
pub mod menu;
/// User-visible texts
pub mod messages;
/// Retry logic with exponential backoff
pub mod retry;
/// Per-conversation sessions
pub mod session;
/// Chat transport
pub mod transport;
/// Core types and events
pub mod types;
/// Bounded blocking-work pool
pub mod worker;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use batch::{BatchOrchestrator, BatchSummary};
pub use classifier::LinkClassifier;
pub use config::Config;
pub use delivery::{DeliveryManager, DeliveryResult};
pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use engine::{MediaEngine, OutputSpec, YtDlpEngine};
pub use error::{DownloadError, Error, Result, UserFacing};
pub use executor::{DownloadExecutor, DownloadRequest};
pub use format::FormatPolicy;
pub use menu::{Action, MenuState};
pub use session::{Session, SessionStore};
pub use transport::{InboundEvent, TelegramClient, Transport, run_polling};
pub use types::{
    Artifact, Classification, ConversationId, DownloadType, EntryRef, Event, LinkKind, Quality,
};
pub use worker::WorkerPool;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run the bot until a termination signal arrives
///
/// Validates the configuration, resolves yt-dlp, connects to the Bot API and
/// starts the dispatcher, the long-poll loop and (if enabled) the health
/// server. On SIGTERM or SIGINT everything is cancelled and awaited.
///
/// # Errors
/// Returns error if the configuration is invalid, yt-dlp cannot be found,
/// the download directory cannot be created or the HTTP client fails to build
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;
    tokio::fs::create_dir_all(&config.download.download_dir).await?;

    let engine = YtDlpEngine::from_config(&config.tools)?;
    tracing::info!(
        engine = engine.name(),
        path = %engine.binary_path().display(),
        "media engine ready"
    );

    let client = Arc::new(TelegramClient::new(&config.telegram, config.retry.clone())?);
    let dispatcher = Dispatcher::new(&config, Arc::new(engine), client.clone());
    let handle = dispatcher.handle();
    let shutdown = CancellationToken::new();

    let health = config.health.enabled.then(|| {
        let health_config = config.health.clone();
        let bot_name = config.bot_name.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = api::start_health_server(&health_config, &bot_name, shutdown).await {
                tracing::error!(error = %e, "health server failed");
            }
        })
    });

    let poller = tokio::spawn(run_polling(
        client,
        handle,
        config.telegram.poll_timeout,
        shutdown.clone(),
    ));
    let dispatcher = tokio::spawn(dispatcher.run(shutdown.clone()));

    tracing::info!(
        bot = %config.bot_name,
        workers = config.download.worker_threads,
        download_dir = %config.download.download_dir.display(),
        "bot running"
    );

    shutdown_signal().await;
    shutdown.cancel();

    let tasks = [
        ("poller", Some(poller)),
        ("dispatcher", Some(dispatcher)),
        ("health", health),
    ];
    for (name, task) in tasks {
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(task = name, error = %e, "task ended abnormally");
            }
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

/// Wait for a termination signal
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "could not register unix signal handlers, using ctrl_c");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl_c");
            }
        }
    }
}

/// Wait for a termination signal
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl+C"),
    }
}
