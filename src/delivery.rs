//! Artifact delivery and cleanup
//!
//! Delivery takes ownership of an [`Artifact`], checks it against the upload
//! ceiling, hands it to the transport and deletes the file. The file is
//! removed on every path: after a successful upload, after a rejected one,
//! and when the artifact was never sent because it was too large.

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::error::{Error, Result};
use crate::messages;
use crate::transport::{AudioUpload, Transport, VideoUpload};
use crate::types::{Artifact, ConversationId, MediaKind};
use std::sync::Arc;

/// Outcome of one delivery attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryResult {
    /// The transport accepted the file
    Delivered {
        /// Size of the delivered file
        size_bytes: u64,
    },
    /// The file exceeded the ceiling and was not sent
    TooLarge {
        /// Size of the rejected file
        size_bytes: u64,
        /// Configured ceiling
        limit_bytes: u64,
    },
    /// The transport rejected or dropped the upload
    UploadFailed(String),
}

impl DeliveryResult {
    /// Whether the file reached the user
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryResult::Delivered { .. })
    }

    /// Convert into the error taxonomy
    pub fn into_result(self) -> Result<u64> {
        match self {
            DeliveryResult::Delivered { size_bytes } => Ok(size_bytes),
            DeliveryResult::TooLarge {
                size_bytes,
                limit_bytes,
            } => Err(Error::SizeLimitExceeded {
                size_bytes,
                limit_bytes,
            }),
            DeliveryResult::UploadFailed(cause) => Err(Error::UploadFailed(cause)),
        }
    }
}

/// Where a delivered artifact sits in its job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeliveryContext {
    /// Target conversation
    pub chat: ConversationId,
    /// 1-based position and total, for batch items
    pub position: Option<(usize, usize)>,
}

impl DeliveryContext {
    /// Context for a single-item download
    pub fn single(chat: ConversationId) -> Self {
        Self {
            chat,
            position: None,
        }
    }

    /// Context for item `index` of `total` in a batch
    pub fn batch_item(chat: ConversationId, index: usize, total: usize) -> Self {
        Self {
            chat,
            position: Some((index, total)),
        }
    }
}

/// Sends artifacts through the transport and removes them afterwards
pub struct DeliveryManager {
    transport: Arc<dyn Transport>,
    max_upload_bytes: u64,
}

impl DeliveryManager {
    /// Create a manager enforcing `max_upload_bytes`
    ///
    /// Values above [`DEFAULT_MAX_UPLOAD_BYTES`] are clamped to it.
    pub fn new(transport: Arc<dyn Transport>, max_upload_bytes: u64) -> Self {
        Self {
            transport,
            max_upload_bytes: max_upload_bytes.min(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    /// Configured upload ceiling in bytes
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Whether a file of `size_bytes` may be sent
    ///
    /// A file exactly at the ceiling is accepted.
    pub fn within_limit(&self, size_bytes: u64) -> bool {
        size_bytes <= self.max_upload_bytes
    }

    /// Deliver an artifact and delete it
    pub async fn deliver(&self, artifact: Artifact, ctx: DeliveryContext) -> DeliveryResult {
        let outcome = if !self.within_limit(artifact.size_bytes) {
            tracing::warn!(
                chat = %ctx.chat,
                size_bytes = artifact.size_bytes,
                limit_bytes = self.max_upload_bytes,
                "artifact exceeds upload ceiling"
            );
            DeliveryResult::TooLarge {
                size_bytes: artifact.size_bytes,
                limit_bytes: self.max_upload_bytes,
            }
        } else {
            match self.send(&artifact, ctx).await {
                Ok(()) => {
                    tracing::info!(
                        chat = %ctx.chat,
                        size_bytes = artifact.size_bytes,
                        transport = self.transport.name(),
                        "artifact delivered"
                    );
                    DeliveryResult::Delivered {
                        size_bytes: artifact.size_bytes,
                    }
                }
                Err(e) => {
                    tracing::warn!(chat = %ctx.chat, error = %e, "upload failed");
                    DeliveryResult::UploadFailed(upload_cause(e))
                }
            }
        };

        discard(artifact).await;
        outcome
    }

    async fn send(&self, artifact: &Artifact, ctx: DeliveryContext) -> Result<()> {
        match artifact.media_kind {
            MediaKind::Audio => {
                let upload = AudioUpload {
                    title: artifact.title.clone().unwrap_or_else(|| "Unknown".into()),
                    performer: artifact
                        .uploader
                        .clone()
                        .unwrap_or_else(|| "Unknown".into()),
                    duration_secs: artifact.duration_secs,
                };
                self.transport
                    .send_audio(ctx.chat, &artifact.path, &upload)
                    .await
            }
            MediaKind::Video => {
                let upload = VideoUpload {
                    caption: messages::video_caption(artifact.title.as_deref(), ctx.position),
                    duration_secs: artifact.duration_secs,
                    supports_streaming: true,
                };
                self.transport
                    .send_video(ctx.chat, &artifact.path, &upload)
                    .await
            }
        }
    }
}

fn upload_cause(error: Error) -> String {
    match error {
        Error::UploadFailed(cause) => cause,
        other => other.to_string(),
    }
}

/// Delete the artifact's file
///
/// Failures are logged, never escalated. Dropping the artifact afterwards
/// retries once.
async fn discard(artifact: Artifact) {
    match tokio::fs::remove_file(&artifact.path).await {
        Ok(()) => tracing::debug!(path = %artifact.path.display(), "artifact removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %artifact.path.display(),
            error = %e,
            "failed to remove artifact"
        ),
    }
}
