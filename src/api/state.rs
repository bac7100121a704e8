//! Application state for the health server

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared state handed to every handler (cheap to clone)
#[derive(Clone, Debug)]
pub struct AppState {
    /// Display name of the bot
    pub bot_name: Arc<str>,

    /// When the server state was created
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state stamped with the current time
    pub fn new(bot_name: &str) -> Self {
        Self {
            bot_name: Arc::from(bot_name),
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since the state was created
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}
