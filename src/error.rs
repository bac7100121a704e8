//! Error types for tubedrop
//!
//! This module provides the error taxonomy used throughout the crate:
//! - Domain failures surfaced to users (classification, download, size limit,
//!   upload, expired session)
//! - Ambient failures (configuration, I/O, network, transport)
//! - The [`UserFacing`] mapping that turns any failure into a chat message

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for tubedrop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tubedrop
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "bot_token")
        key: Option<String>,
    },

    /// Link could not be read or is unsupported
    #[error("could not classify link: {0}")]
    Classification(String),

    /// Executor could not materialize an artifact
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Artifact exceeds the upload ceiling
    #[error("artifact is {size_bytes} bytes, limit is {limit_bytes} bytes")]
    SizeLimitExceeded {
        /// Size of the rejected artifact
        size_bytes: u64,
        /// Configured ceiling
        limit_bytes: u64,
    },

    /// Transport rejected or errored during an upload
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// A download or menu step was reached with no link bound to the conversation
    #[error("session expired: no link bound to this conversation")]
    SessionExpired,

    /// Bot API returned an error response
    #[error("transport error: {0}")]
    Transport(String),

    /// Bot API flood control; the call may be repeated after `retry_after`
    #[error("transport error: {method}: Too Many Requests: retry after {}s", .retry_after.as_secs())]
    RateLimited {
        /// The Bot API method that was refused
        method: String,
        /// Wait requested by the server
        retry_after: Duration,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (yt-dlp missing, not executable)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Health server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failures while materializing an artifact
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The extraction tool reported a failure
    #[error("{cause}")]
    ToolFailed {
        /// Human-readable cause, usually the tool's last error line
        cause: String,
    },

    /// The tool reported success but the file is not there
    #[error("artifact missing at {path}")]
    ArtifactMissing {
        /// The path the tool reported
        path: PathBuf,
    },

    /// The offloaded job panicked or was cancelled
    #[error("worker job did not complete: {0}")]
    WorkerCrashed(String),
}

/// Classification of failures for the chat surface
///
/// Every failure crossing a component boundary passes through this mapping
/// before it is shown to a user.
pub trait UserFacing {
    /// Machine-readable error code
    fn error_code(&self) -> &str;

    /// Message suitable for sending to the user
    fn user_message(&self) -> String;
}

impl UserFacing for Error {
    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Classification(_) => "classification_error",
            Error::Download(e) => match e {
                DownloadError::ToolFailed { .. } => "download_error",
                DownloadError::ArtifactMissing { .. } => "artifact_missing",
                DownloadError::WorkerCrashed(_) => "worker_crashed",
            },
            Error::SizeLimitExceeded { .. } => "size_limit_exceeded",
            Error::UploadFailed(_) => "upload_failed",
            Error::SessionExpired => "session_expired",
            Error::Transport(_) => "transport_error",
            Error::RateLimited { .. } => "rate_limited",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }

    fn user_message(&self) -> String {
        match self {
            Error::Classification(_) => {
                "❌ Error: Could not fetch video information. Please check the URL.".to_string()
            }
            Error::Download(e) => format!("❌ Download failed: {e}"),
            Error::SizeLimitExceeded {
                size_bytes,
                limit_bytes,
            } => format!(
                "❌ File too large ({:.1} MB).\nTelegram limit is {} MB.\n\n\
                 Try downloading a lower quality version.",
                *size_bytes as f64 / MIB,
                limit_bytes / (1024 * 1024)
            ),
            Error::UploadFailed(cause) => format!("❌ Error uploading file: {cause}"),
            Error::SessionExpired => {
                "❌ Error: URL not found. Please send the link again.".to_string()
            }
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

const MIB: f64 = 1024.0 * 1024.0;

/// Notice sent when a failure has no more specific message
pub const GENERIC_FAILURE: &str =
    "❌ An error occurred. Please try again later or check your URL.";

impl Error {
    /// Shorthand for a configuration error on a given key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// (Error, expected code) for every variant
    fn all_error_variants() -> Vec<(Error, &'static str)> {
        vec![
            (Error::config("bot_token", "missing"), "config_error"),
            (Error::Classification("bad".into()), "classification_error"),
            (
                Error::Download(DownloadError::ToolFailed {
                    cause: "HTTP 403".into(),
                }),
                "download_error",
            ),
            (
                Error::Download(DownloadError::ArtifactMissing {
                    path: PathBuf::from("/tmp/x.mp4"),
                }),
                "artifact_missing",
            ),
            (
                Error::Download(DownloadError::WorkerCrashed("panic".into())),
                "worker_crashed",
            ),
            (
                Error::SizeLimitExceeded {
                    size_bytes: 3,
                    limit_bytes: 2,
                },
                "size_limit_exceeded",
            ),
            (Error::UploadFailed("413".into()), "upload_failed"),
            (Error::SessionExpired, "session_expired"),
            (Error::Transport("bad request".into()), "transport_error"),
            (
                Error::RateLimited {
                    method: "sendMessage".into(),
                    retry_after: Duration::from_secs(3),
                },
                "rate_limited",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                "io_error",
            ),
            (
                Error::Serialization(serde_json::from_str::<u8>("x").unwrap_err()),
                "serialization_error",
            ),
            (Error::ExternalTool("yt-dlp".into()), "external_tool_error"),
            (Error::ApiServerError("bind".into()), "api_server_error"),
            (Error::Other("?".into()), "internal_error"),
        ]
    }

    #[test]
    fn every_variant_has_expected_code() {
        for (error, code) in all_error_variants() {
            assert_eq!(error.error_code(), code, "wrong code for {error:?}");
        }
    }

    #[test]
    fn every_variant_has_nonempty_user_message() {
        for (error, _) in all_error_variants() {
            assert!(
                error.user_message().starts_with('❌'),
                "{error:?} should map to an error notice"
            );
        }
    }

    #[test]
    fn size_limit_message_is_distinct_from_upload_failure() {
        let too_large = Error::SizeLimitExceeded {
            size_bytes: 2500 * 1024 * 1024,
            limit_bytes: 2000 * 1024 * 1024,
        };
        let upload = Error::UploadFailed("Request Entity Too Large".into());

        assert!(too_large.user_message().contains("2500.0 MB"));
        assert!(too_large.user_message().contains("2000 MB"));
        assert!(upload.user_message().contains("Error uploading file"));
        assert_ne!(too_large.error_code(), upload.error_code());
    }

    #[test]
    fn download_error_message_carries_cause() {
        let error = Error::Download(DownloadError::ToolFailed {
            cause: "Requested format is not available".into(),
        });
        assert_eq!(
            error.user_message(),
            "❌ Download failed: Requested format is not available"
        );
    }

    #[test]
    fn ambient_errors_map_to_generic_notice() {
        let error = Error::Transport("chat not found".into());
        assert_eq!(error.user_message(), GENERIC_FAILURE);
    }
}
