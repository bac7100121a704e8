//! Media extraction engines
//!
//! Provides a trait-based abstraction over the tool that inspects links and
//! produces files, with an implementation that shells out to `yt-dlp`.

mod traits;
mod ytdlp;

pub use traits::{MediaEngine, OutputSpec};
pub use ytdlp::YtDlpEngine;
