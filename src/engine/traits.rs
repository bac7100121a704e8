//! Traits and types for media extraction engines

use crate::error::Result;
use crate::format::FormatPolicy;
use crate::types::{Artifact, Classification};
use std::path::PathBuf;

/// Where an engine should place the file it produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    /// Directory the artifact is written into
    pub dir: PathBuf,
    /// Filename prefix unique to this job
    ///
    /// Engines append their own item id and extension. Anything left behind
    /// under this prefix after a failed job is removed by the engine.
    pub stem: String,
}

/// Trait for media extraction engines
///
/// An engine answers two questions about a link: what is behind it
/// ([`probe`](MediaEngine::probe)) and how to turn it into a file on disk
/// ([`materialize`](MediaEngine::materialize)). Both calls block for as long
/// as the remote source takes and are meant to run on the
/// [`WorkerPool`](crate::worker::WorkerPool), never on the async runtime.
///
/// # Examples
///
/// ```no_run
/// use tubedrop::engine::{MediaEngine, YtDlpEngine};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// let info = engine.probe("https://youtu.be/dQw4w9WgXcQ")?;
/// println!("{} item(s)", info.item_count());
/// # Ok(())
/// # }
/// ```
pub trait MediaEngine: Send + Sync {
    /// Classify a link without downloading any media
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be read or is unsupported.
    fn probe(&self, link: &str) -> Result<Classification>;

    /// Download a single item and apply the format policy
    ///
    /// Collections are never expanded here; the caller resolves entries
    /// first and materializes them one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`](crate::error::DownloadError) variants when
    /// the tool fails or the reported file is missing.
    fn materialize(&self, link: &str, policy: &FormatPolicy, output: &OutputSpec)
    -> Result<Artifact>;

    /// Get the name of this engine implementation
    fn name(&self) -> &'static str;
}
