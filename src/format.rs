//! Format selection policy
//!
//! Maps `(DownloadType, Quality)` to the format rule handed to the extraction
//! engine. The mapping is pure: the same inputs always produce the same rule,
//! whatever the remote source ends up offering.
//!
//! - Audio: best audio stream, converted to mp3 at 192 kbps
//! - Video best: best mp4 video + m4a audio, else best mp4, else best overall
//! - Video at a ceiling: best mp4 video at or below the height + m4a audio,
//!   else best single file at or below the height

use crate::types::{DownloadType, Quality};

/// Preferred container for video downloads
pub const VIDEO_CONTAINER: &str = "mp4";

/// Codec audio downloads are normalized to
pub const AUDIO_CODEC: &str = "mp3";

/// Target audio bitrate in kbps
pub const AUDIO_BITRATE_KBPS: u32 = 192;

/// Audio post-processing target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioTarget {
    /// Output codec/container ("mp3")
    pub codec: &'static str,
    /// Output bitrate in kbps
    pub bitrate_kbps: u32,
}

/// Concrete format rule for one download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatPolicy {
    /// yt-dlp format selector, alternatives separated by `/`
    pub selector: String,
    /// Container used when merging separate video and audio streams
    pub merge_container: Option<&'static str>,
    /// Audio extraction target, for audio downloads
    pub audio: Option<AudioTarget>,
}

impl FormatPolicy {
    /// Select the policy for a download type and quality
    ///
    /// Quality only matters for video; audio always takes the best stream.
    pub fn select(download_type: DownloadType, quality: Quality) -> Self {
        match download_type {
            DownloadType::Audio => Self {
                selector: "bestaudio/best".to_string(),
                merge_container: None,
                audio: Some(AudioTarget {
                    codec: AUDIO_CODEC,
                    bitrate_kbps: AUDIO_BITRATE_KBPS,
                }),
            },
            DownloadType::Video => Self {
                selector: video_selector(quality),
                merge_container: Some(VIDEO_CONTAINER),
                audio: None,
            },
        }
    }
}

fn video_selector(quality: Quality) -> String {
    match quality.max_height() {
        None => format!(
            "bestvideo[ext={c}]+bestaudio[ext=m4a]/best[ext={c}]/best",
            c = VIDEO_CONTAINER
        ),
        Some(h) => format!(
            "bestvideo[height<={h}][ext={c}]+bestaudio[ext=m4a]/best[height<={h}]",
            c = VIDEO_CONTAINER
        ),
    }
}
