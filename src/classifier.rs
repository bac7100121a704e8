//! Link recognition and classification
//!
//! Recognition is a cheap synchronous check on incoming text. Classification
//! asks the engine what is behind the link, which blocks on the network and
//! therefore runs on the worker pool.

use crate::engine::MediaEngine;
use crate::error::{Error, Result};
use crate::types::Classification;
use crate::worker::WorkerPool;
use regex::Regex;
use std::sync::{Arc, OnceLock};

#[allow(clippy::expect_used)]
fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://\S+").expect("URL pattern is valid"))
}

/// Decides whether text is a supported link and classifies it
#[derive(Clone)]
pub struct LinkClassifier {
    engine: Arc<dyn MediaEngine>,
    pool: WorkerPool,
    hosts: Vec<String>,
}

impl LinkClassifier {
    /// Create a classifier for the given host substrings
    pub fn new(engine: Arc<dyn MediaEngine>, pool: WorkerPool, hosts: Vec<String>) -> Self {
        let hosts = hosts.into_iter().map(|h| h.to_lowercase()).collect();
        Self {
            engine,
            pool,
            hosts,
        }
    }

    /// Whether the text mentions a supported host
    pub fn is_supported(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.hosts.iter().any(|host| lower.contains(host.as_str()))
    }

    /// Extract the link to classify from a free-text message
    ///
    /// Returns the first URL that names a supported host. Text that mentions
    /// a host without a scheme is passed through trimmed, so `youtu.be/abc`
    /// still reaches the engine. Returns `None` for anything else.
    pub fn recognize(&self, text: &str) -> Option<String> {
        if !self.is_supported(text) {
            return None;
        }

        url_pattern()
            .find_iter(text)
            .map(|m| m.as_str())
            .find(|candidate| self.is_supported(candidate))
            .map(str::to_string)
            .or_else(|| Some(text.trim().to_string()))
    }

    /// Classify a link as a single item or a collection
    ///
    /// Any failure, including a crashed worker job, is reported as
    /// [`Error::Classification`].
    pub async fn classify(&self, link: &str) -> Result<Classification> {
        let engine = self.engine.clone();
        let owned = link.to_string();

        let result = self.pool.run(move || engine.probe(&owned)).await;

        match result {
            Ok(classification) => {
                tracing::info!(
                    link = %link,
                    collection = classification.is_collection(),
                    items = classification.item_count(),
                    "link classified"
                );
                Ok(classification)
            }
            Err(Error::Classification(cause)) => {
                tracing::warn!(link = %link, cause = %cause, "classification failed");
                Err(Error::Classification(cause))
            }
            Err(other) => {
                tracing::warn!(link = %link, error = %other, "classification failed");
                Err(Error::Classification(other.to_string()))
            }
        }
    }
}
