//! User-visible texts and menus
//!
//! Every prompt the bot sends is built here so wording stays in one place.

use crate::batch::BatchSummary;
use crate::error::{Error, UserFacing};
use crate::menu::{Action, InfoTopic};
use crate::transport::{InlineMenu, MenuButton, Prompt};
use crate::types::{DownloadType, Quality};

/// Reply to `/start`
pub fn welcome() -> Prompt {
    Prompt::html(
        "🎬 <b>Welcome to YouTube Downloader Bot!</b>\n\n\
         I can download:\n\
         ✅ Single YouTube videos\n\
         ✅ Complete playlists\n\
         ✅ Audio only (MP3)\n\
         ✅ Videos in different qualities\n\n\
         <b>How to use:</b>\n\
         1️⃣ Send me a YouTube video or playlist link\n\
         2️⃣ Choose your download option\n\
         3️⃣ Wait for download to complete\n\
         4️⃣ Receive your file!\n\n\
         <b>Commands:</b>\n\
         /start - Show this message\n\
         /help - Get help\n\
         /about - About this bot\n\n\
         📎 <b>Just paste a YouTube link to get started!</b>",
    )
    .with_menu(
        InlineMenu::default()
            .row(vec![
                MenuButton::new("🎬 Video", Action::Info(InfoTopic::Video)),
                MenuButton::new("🎵 Audio", Action::Info(InfoTopic::Audio)),
            ])
            .row(vec![MenuButton::new(
                "📋 Playlist",
                Action::Info(InfoTopic::Playlist),
            )]),
    )
}

/// Reply to `/help`
pub fn help(max_upload_bytes: u64) -> Prompt {
    Prompt::html(format!(
        "<b>📖 How to Use This Bot</b>\n\n\
         <b>1. Download a Single Video:</b>\n\
         \u{20}  • Paste any YouTube video link\n\
         \u{20}  • Choose \"🎬 Video\" for video or \"🎵 Audio\" for MP3\n\
         \u{20}  • Select quality (Best, 720p, 480p, 360p)\n\
         \u{20}  • Wait for download\n\n\
         <b>2. Download a Playlist:</b>\n\
         \u{20}  • Paste playlist URL\n\
         \u{20}  • Bot will download all videos\n\
         \u{20}  • Files sent one by one\n\n\
         <b>3. Supported Links:</b>\n\
         \u{20}  • youtube.com/watch?v=...\n\
         \u{20}  • youtu.be/...\n\
         \u{20}  • youtube.com/playlist?list=...\n\
         \u{20}  • youtube.com/shorts/...\n\n\
         <b>⚠️ Notes:</b>\n\
         \u{20}  • Large files may take time\n\
         \u{20}  • Maximum file size: {} MB (Telegram limit)\n\
         \u{20}  • Be patient during downloads",
        max_upload_bytes / (1024 * 1024)
    ))
}

/// Reply to `/about`
pub fn about(bot_name: &str) -> Prompt {
    Prompt::html(format!(
        "<b>🤖 About {}</b>\n\n\
         📌 <b>Version:</b> {}\n\
         📌 <b>Features:</b>\n\
         \u{20}  • Video &amp; Audio downloads\n\
         \u{20}  • Playlist support\n\
         \u{20}  • Multiple quality options\n\n\
         📌 <b>Powered by:</b>\n\
         \u{20}  • yt-dlp\n\
         \u{20}  • ffmpeg",
        escape_html(bot_name),
        env!("CARGO_PKG_VERSION")
    ))
}

/// Text for a help topic button
pub fn info(topic: InfoTopic) -> Prompt {
    let text = match topic {
        InfoTopic::Video => {
            "🎬 <b>Video Download</b>\n\n\
             Send any YouTube video link and select 'Video' to download in MP4 format.\n\n\
             Supported qualities: Best, 720p, 480p, 360p"
        }
        InfoTopic::Audio => {
            "🎵 <b>Audio Download</b>\n\n\
             Send any YouTube video link and select 'Audio (MP3)' to extract audio.\n\n\
             Format: MP3 (192kbps)"
        }
        InfoTopic::Playlist => {
            "📋 <b>Playlist Download</b>\n\n\
             Send a YouTube playlist link to download all videos.\n\n\
             ⚠️ Note: Large playlists may take significant time."
        }
    };
    Prompt::html(text)
}

/// Status shown while a link is classified
pub fn analyzing() -> Prompt {
    Prompt::text("🔍 Analyzing link... Please wait.")
}

/// Reply to text that is not a supported link
pub fn not_a_link() -> Prompt {
    Prompt::text(
        "❌ That doesn't look like a YouTube link.\n\n\
         Please send a valid YouTube URL like:\n\
         • https://youtube.com/watch?v=...\n\
         • https://youtu.be/...",
    )
}

/// Reply to a new link while a job is running
pub fn busy() -> Prompt {
    Prompt::text("⏳ A download is already in progress. Please wait for it to finish.")
}

fn type_menu() -> InlineMenu {
    InlineMenu::default()
        .row(vec![MenuButton::new("🎬 Video", Action::TypeVideo)])
        .row(vec![MenuButton::new("🎵 Audio (MP3)", Action::TypeAudio)])
        .row(vec![MenuButton::new("❌ Cancel", Action::Cancel)])
}

/// Menu offered for a single item
pub fn single_found(title: Option<&str>, duration_secs: Option<u64>) -> Prompt {
    Prompt::html(format!(
        "🎬 <b>Video Found!</b>\n\n\
         📝 Title: {}\n\
         ⏱ Duration: {}\n\n\
         Choose download type:",
        escape_html(title.unwrap_or("Unknown")),
        format_duration(duration_secs)
    ))
    .with_menu(type_menu())
}

/// Menu offered again after backing out of quality selection
pub fn choose_type() -> Prompt {
    Prompt::text("Choose download type:").with_menu(type_menu())
}

/// Quality tiers for a video download
pub fn choose_quality() -> Prompt {
    Prompt::text("🎬 Select video quality:").with_menu(
        InlineMenu::default()
            .row(vec![MenuButton::new(
                "⭐ Best Quality",
                Action::Quality(Quality::Best),
            )])
            .row(vec![MenuButton::new("📺 720p", Action::Quality(Quality::P720))])
            .row(vec![MenuButton::new("📺 480p", Action::Quality(Quality::P480))])
            .row(vec![MenuButton::new("📺 360p", Action::Quality(Quality::P360))])
            .row(vec![MenuButton::new("⬅️ Back", Action::BackType)]),
    )
}

/// Menu offered for a collection
pub fn collection_found(title: Option<&str>, items: usize) -> Prompt {
    Prompt::html(format!(
        "📋 <b>Playlist Found!</b>\n\n\
         📝 Title: {}\n\
         🔢 Videos: {}\n\n\
         Choose download option:",
        escape_html(title.unwrap_or("Unknown Playlist")),
        items
    ))
    .with_menu(
        InlineMenu::default()
            .row(vec![MenuButton::new(
                "🎬 Download All Videos",
                Action::PlaylistVideo,
            )])
            .row(vec![MenuButton::new(
                "🎵 Download All Audio (MP3)",
                Action::PlaylistAudio,
            )])
            .row(vec![MenuButton::new("❌ Cancel", Action::Cancel)]),
    )
}

/// Confirmation after cancel
pub fn cancelled() -> Prompt {
    Prompt::text("❌ Download cancelled.")
}

/// Status while a single item downloads
pub fn downloading(download_type: DownloadType, quality: Quality) -> Prompt {
    let what = match download_type {
        DownloadType::Audio => "🎵 Audio".to_string(),
        DownloadType::Video => format!("🎬 Video ({} quality)", quality.label()),
    };
    Prompt::text(format!(
        "⬇️ Downloading {what}...\n\nPlease wait, this may take a few minutes."
    ))
}

/// Status while the artifact uploads
pub fn uploading(size_mib: f64) -> Prompt {
    Prompt::text(format!(
        "✅ Download complete!\n📤 Uploading to Telegram ({size_mib:.1} MB)..."
    ))
}

/// Final status after a successful single delivery
pub fn done() -> Prompt {
    Prompt::text("✅ Done! Send another link to download more.")
}

/// Status when a batch starts
pub fn batch_started(total: usize, download_type: DownloadType) -> Prompt {
    let what = match download_type {
        DownloadType::Audio => "🎵 Audio",
        DownloadType::Video => "🎬 Video",
    };
    Prompt::text(format!(
        "📋 Starting playlist download\n\
         📝 Total videos: {total}\n\
         📥 Type: {what}\n\n\
         ⏳ This will take some time. Please wait..."
    ))
}

/// Checkpoint notice during a batch
pub fn batch_progress(index: usize, total: usize) -> Prompt {
    Prompt::text(format!("⏳ Progress: {index}/{total} videos processed..."))
}

/// Summary after a batch
pub fn batch_summary(summary: &BatchSummary) -> Prompt {
    let mut text = format!(
        "✅ <b>Playlist Download Complete!</b>\n\n\
         ✓ Successful: {}\n\
         ✗ Failed: {}\n\
         📊 Total: {}",
        summary.succeeded, summary.failed, summary.total
    );

    let mut failures = summary.failures();
    let listed: Vec<String> = failures
        .by_ref()
        .take(MAX_LISTED_FAILURES)
        .map(|(item, error)| {
            format!(
                "• #{} {}: {}",
                item.index,
                escape_html(item.title.as_deref().unwrap_or("Unknown")),
                escape_html(&failure_cause(error))
            )
        })
        .collect();
    if !listed.is_empty() {
        text.push_str("\n\n<b>Failed items:</b>\n");
        text.push_str(&listed.join("\n"));
        let rest = failures.count();
        if rest > 0 {
            text.push_str(&format!("\n…and {rest} more"));
        }
    }
    Prompt::html(text)
}

/// Failed batch entries named in the summary; the rest are only counted
pub const MAX_LISTED_FAILURES: usize = 10;

/// One-line cause of a failed batch entry
fn failure_cause(error: &Error) -> String {
    match error {
        Error::Download(e) => e.to_string(),
        Error::SizeLimitExceeded { size_bytes, .. } => {
            format!("too large ({:.1} MB)", *size_bytes as f64 / (1024.0 * 1024.0))
        }
        Error::UploadFailed(cause) => format!("upload failed ({cause})"),
        other => other.error_code().replace('_', " "),
    }
}

/// Caption under a delivered video
///
/// Batch items carry their 1-based position.
pub fn video_caption(title: Option<&str>, position: Option<(usize, usize)>) -> String {
    let title = title.unwrap_or("Unknown");
    match position {
        Some((index, total)) => format!("🎬 {title} ({index}/{total})"),
        None => format!("🎬 {title}"),
    }
}

/// `m:ss`, or "Unknown" when the duration is missing or zero
pub fn format_duration(duration_secs: Option<u64>) -> String {
    match duration_secs {
        Some(secs) if secs > 0 => format!("{}:{:02}", secs / 60, secs % 60),
        _ => "Unknown".to_string(),
    }
}

/// Escape text interpolated into HTML messages
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Some(212)), "3:32");
        assert_eq!(format_duration(Some(59)), "0:59");
        assert_eq!(format_duration(Some(3600)), "60:00");
        assert_eq!(format_duration(Some(0)), "Unknown");
        assert_eq!(format_duration(None), "Unknown");
    }

    #[test]
    fn titles_are_escaped_in_html_prompts() {
        let prompt = single_found(Some("Tom & Jerry <live>"), Some(61));
        assert!(prompt.html);
        assert!(prompt.text.contains("Tom &amp; Jerry &lt;live&gt;"));
        assert!(prompt.text.contains("1:01"));
    }

    #[test]
    fn single_menu_offers_type_and_cancel() {
        let menu = single_found(None, None).menu.unwrap_or_default();
        let actions: Vec<Action> = menu.actions().collect();
        assert_eq!(actions, vec![Action::TypeVideo, Action::TypeAudio, Action::Cancel]);
    }

    #[test]
    fn quality_menu_offers_every_tier_and_back() {
        let menu = choose_quality().menu.unwrap_or_default();
        let actions: Vec<Action> = menu.actions().collect();
        assert_eq!(
            actions,
            vec![
                Action::Quality(Quality::Best),
                Action::Quality(Quality::P720),
                Action::Quality(Quality::P480),
                Action::Quality(Quality::P360),
                Action::BackType,
            ]
        );
    }

    #[test]
    fn collection_prompt_shows_count() {
        let prompt = collection_found(Some("Mix"), 12);
        assert!(prompt.text.contains("🔢 Videos: 12"));
        let actions: Vec<Action> = prompt.menu.unwrap_or_default().actions().collect();
        assert_eq!(
            actions,
            vec![Action::PlaylistVideo, Action::PlaylistAudio, Action::Cancel]
        );
    }

    #[test]
    fn captions_carry_batch_position() {
        assert_eq!(video_caption(Some("Clip"), None), "🎬 Clip");
        assert_eq!(video_caption(None, Some((3, 12))), "🎬 Unknown (3/12)");
    }

    #[test]
    fn progress_and_summary_texts() {
        assert_eq!(
            batch_progress(5, 12).text,
            "⏳ Progress: 5/12 videos processed..."
        );
        let summary = BatchSummary {
            succeeded: 10,
            failed: 2,
            total: 12,
            items: Vec::new(),
        };
        let text = batch_summary(&summary).text;
        assert!(text.contains("✓ Successful: 10"));
        assert!(text.contains("✗ Failed: 2"));
        assert!(text.contains("📊 Total: 12"));
    }

    #[test]
    fn batch_summary_names_failed_items() {
        use crate::batch::{ItemOutcome, ItemReport};
        use crate::error::DownloadError;

        let report = |index: usize, title: &str, outcome| ItemReport {
            index,
            title: Some(title.to_string()),
            outcome,
        };
        let summary = BatchSummary {
            succeeded: 1,
            failed: 2,
            total: 4,
            items: vec![
                report(1, "Intro", ItemOutcome::Delivered),
                report(
                    2,
                    "Live <set>",
                    ItemOutcome::Failed(Error::Download(DownloadError::ToolFailed {
                        cause: "Private video".into(),
                    })),
                ),
                report(3, "Empty", ItemOutcome::Skipped),
                report(
                    4,
                    "Concert",
                    ItemOutcome::Failed(Error::SizeLimitExceeded {
                        size_bytes: 2500 * 1024 * 1024,
                        limit_bytes: 2000 * 1024 * 1024,
                    }),
                ),
            ],
        };

        let text = batch_summary(&summary).text;
        assert!(text.contains("Failed items:"));
        assert!(text.contains("• #2 Live &lt;set&gt;: Private video"));
        assert!(text.contains("• #4 Concert: too large (2500.0 MB)"));
        assert!(!text.contains("#1 Intro"));
        assert!(!text.contains("#3 Empty"));
        assert!(!text.contains("more"));
    }

    #[test]
    fn batch_summary_caps_failure_list() {
        use crate::batch::{ItemOutcome, ItemReport};

        let items = (1..=MAX_LISTED_FAILURES + 3)
            .map(|index| ItemReport {
                index,
                title: None,
                outcome: ItemOutcome::Failed(Error::UploadFailed("timeout".into())),
            })
            .collect::<Vec<_>>();
        let summary = BatchSummary {
            succeeded: 0,
            failed: items.len(),
            total: items.len(),
            items,
        };

        let text = batch_summary(&summary).text;
        assert_eq!(text.matches("• #").count(), MAX_LISTED_FAILURES);
        assert!(text.contains("…and 3 more"));
        assert!(text.contains("Unknown: upload failed (timeout)"));
    }

    #[test]
    fn help_reports_configured_ceiling() {
        assert!(help(2000 * 1024 * 1024).text.contains("2000 MB"));
    }
}
