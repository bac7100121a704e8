//! Core types for tubedrop

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity of one conversation (a Telegram chat)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl ConversationId {
    /// Create a new ConversationId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message previously sent into a conversation, addressable for edits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Conversation the message lives in
    pub chat: ConversationId,
    /// Transport-assigned message id
    pub message_id: i64,
}

/// What the user wants out of a link
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadType {
    /// Video with audio, merged into mp4
    Video,
    /// Audio only, converted to mp3
    Audio,
}

impl DownloadType {
    /// Media kind of the artifact this download type produces
    pub fn media_kind(&self) -> MediaKind {
        match self {
            DownloadType::Video => MediaKind::Video,
            DownloadType::Audio => MediaKind::Audio,
        }
    }
}

/// Video quality tier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Best available
    #[default]
    Best,
    /// At most 720 lines
    P720,
    /// At most 480 lines
    P480,
    /// At most 360 lines
    P360,
}

impl Quality {
    /// Height ceiling in pixels, `None` for [`Quality::Best`]
    pub fn max_height(&self) -> Option<u32> {
        match self {
            Quality::Best => None,
            Quality::P720 => Some(720),
            Quality::P480 => Some(480),
            Quality::P360 => Some(360),
        }
    }

    /// Short label used in status messages ("best", "720", ...)
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Best => "best",
            Quality::P720 => "720",
            Quality::P480 => "480",
            Quality::P360 => "360",
        }
    }
}

/// Kind of a materialized artifact
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Video file
    Video,
    /// Audio file
    Audio,
}

/// Lightweight reference to one item of a collection
///
/// Entries reported as empty by the extractor are kept (with every field
/// unset) so they still count toward the collection total.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRef {
    /// Extractor id of the item
    pub id: Option<String>,
    /// Direct URL, when the extractor provides one
    pub url: Option<String>,
    /// Item title
    pub title: Option<String>,
}

/// Prefix used to derive a watch link from an entry id
pub const WATCH_URL_PREFIX: &str = "https://youtube.com/watch?v=";

impl EntryRef {
    /// Resolve the entry to a downloadable link
    ///
    /// Prefers the direct URL; otherwise derives one from the id. Returns
    /// `None` for entries that carry neither.
    pub fn resolve_link(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Some(url.to_string());
        }
        self.id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(|id| format!("{WATCH_URL_PREFIX}{id}"))
    }
}

/// Whether a link denotes one item or a collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LinkKind {
    /// One downloadable item
    Single,
    /// An ordered collection of items
    Collection {
        /// Entries in collection order
        entries: Vec<EntryRef>,
    },
}

/// Result of classifying a link, without any artifact materialized
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Title of the item or collection
    pub title: Option<String>,
    /// Duration in seconds (single items only)
    pub duration_secs: Option<u64>,
    /// Single item or collection
    pub kind: LinkKind,
}

impl Classification {
    /// Number of items behind the link
    pub fn item_count(&self) -> usize {
        match &self.kind {
            LinkKind::Single => 1,
            LinkKind::Collection { entries } => entries.len(),
        }
    }

    /// Whether this is a collection
    pub fn is_collection(&self) -> bool {
        matches!(self.kind, LinkKind::Collection { .. })
    }
}

/// A file produced by the executor and owned by delivery until deleted
///
/// Dropping an artifact removes its file if it is still on disk, so a
/// failed or abandoned delivery never leaves the file behind.
#[derive(Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Location of the file on disk
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Title of the item
    pub title: Option<String>,
    /// Uploader or performer
    pub uploader: Option<String>,
    /// Duration in seconds
    pub duration_secs: Option<u64>,
    /// Video or audio
    pub media_kind: MediaKind,
}

impl Artifact {
    /// Size in MiB, for display
    pub fn size_mib(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed artifact on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove artifact"
            ),
        }
    }
}

/// Per-batch counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Entries visited so far (including skipped ones)
    pub processed: usize,
    /// Entries delivered
    pub succeeded: usize,
    /// Entries that failed to download or deliver
    pub failed: usize,
}

/// Lifecycle events broadcast to subscribers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A link was classified and a menu offered
    Classified {
        /// Conversation
        chat: ConversationId,
        /// Whether the link is a collection
        collection: bool,
        /// Number of items behind the link
        items: usize,
    },

    /// A link could not be classified
    ClassificationFailed {
        /// Conversation
        chat: ConversationId,
        /// Error message
        error: String,
    },

    /// A single-item download started
    DownloadStarted {
        /// Conversation
        chat: ConversationId,
        /// Requested type
        download_type: DownloadType,
        /// Requested quality
        quality: Quality,
    },

    /// An artifact was handed to the transport
    Delivered {
        /// Conversation
        chat: ConversationId,
        /// Artifact size
        size_bytes: u64,
    },

    /// A single-item download or delivery failed
    Failed {
        /// Conversation
        chat: ConversationId,
        /// Machine-readable error code
        code: String,
        /// Error message
        error: String,
    },

    /// A batch started
    BatchStarted {
        /// Conversation
        chat: ConversationId,
        /// Number of entries
        total: usize,
    },

    /// A batch finished
    BatchComplete {
        /// Conversation
        chat: ConversationId,
        /// Entries delivered
        succeeded: usize,
        /// Entries failed
        failed: usize,
        /// Entries in the collection
        total: usize,
    },

    /// A conversation returned to idle
    SessionReset {
        /// Conversation
        chat: ConversationId,
    },
}
