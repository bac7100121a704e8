//! Download execution
//!
//! Turns one link plus the user's choices into an artifact on disk. The
//! blocking engine call is offloaded to the worker pool so the dispatcher
//! never waits on it.

use crate::engine::{MediaEngine, OutputSpec};
use crate::error::{DownloadError, Error, Result};
use crate::format::FormatPolicy;
use crate::types::{Artifact, ConversationId, DownloadType, Quality};
use crate::worker::WorkerPool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Everything needed to materialize one item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Conversation the artifact belongs to
    pub chat: ConversationId,
    /// Link of a single item
    pub link: String,
    /// Video or audio
    pub download_type: DownloadType,
    /// Quality tier, ignored for audio
    pub quality: Quality,
}

/// Runs downloads on the worker pool
pub struct DownloadExecutor {
    engine: Arc<dyn MediaEngine>,
    pool: WorkerPool,
    download_dir: PathBuf,
    next_job: AtomicU64,
}

impl DownloadExecutor {
    /// Create an executor writing into `download_dir`
    pub fn new(engine: Arc<dyn MediaEngine>, pool: WorkerPool, download_dir: PathBuf) -> Self {
        Self {
            engine,
            pool,
            download_dir,
            next_job: AtomicU64::new(1),
        }
    }

    /// Directory artifacts are written into
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Materialize one item
    ///
    /// Every job gets its own filename stem so concurrent downloads, even for
    /// the same link in different conversations, never share a path. Any
    /// failure is reported as [`Error::Download`].
    pub async fn execute(&self, request: &DownloadRequest) -> Result<Artifact> {
        let policy = FormatPolicy::select(request.download_type, request.quality);
        let job = self.next_job.fetch_add(1, Ordering::Relaxed);
        let output = OutputSpec {
            dir: self.download_dir.clone(),
            stem: format!("{}-{}", request.chat, job),
        };

        tokio::fs::create_dir_all(&output.dir)
            .await
            .map_err(|e| as_download_error(e.into()))?;

        tracing::info!(
            chat = %request.chat,
            link = %request.link,
            download_type = ?request.download_type,
            quality = request.quality.label(),
            format = %policy.selector,
            "starting download"
        );

        let engine = self.engine.clone();
        let link = request.link.clone();
        let result = self
            .pool
            .run(move || engine.materialize(&link, &policy, &output))
            .await;

        match result {
            Ok(artifact) => {
                tracing::info!(
                    chat = %request.chat,
                    path = %artifact.path.display(),
                    size_mib = artifact.size_mib(),
                    "download finished"
                );
                Ok(artifact)
            }
            Err(e) => {
                let error = as_download_error(e);
                tracing::warn!(chat = %request.chat, link = %request.link, error = %error, "download failed");
                Err(error)
            }
        }
    }
}

fn as_download_error(error: Error) -> Error {
    match error {
        Error::Download(_) => error,
        other => Error::Download(DownloadError::ToolFailed {
            cause: other.to_string(),
        }),
    }
}
