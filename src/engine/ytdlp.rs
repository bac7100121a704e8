//! yt-dlp backed engine
//!
//! Runs the external `yt-dlp` binary synchronously. Callers are expected to
//! invoke it from the worker pool.

use super::traits::{MediaEngine, OutputSpec};
use crate::config::ToolsConfig;
use crate::error::{DownloadError, Error, Result};
use crate::format::FormatPolicy;
use crate::types::{Artifact, Classification, EntryRef, LinkKind, MediaKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Template printed by yt-dlp once the final file is in place
const AFTER_MOVE_TEMPLATE: &str = "after_move:%(.{title,uploader,duration,filepath})j";

/// Engine that shells out to `yt-dlp`
///
/// # Examples
///
/// ```no_run
/// use tubedrop::engine::YtDlpEngine;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let engine = YtDlpEngine::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary_path: PathBuf,
    ffmpeg_location: Option<PathBuf>,
}

impl YtDlpEngine {
    /// Create an engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ffmpeg_location: None,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Resolve the engine from tool configuration
    ///
    /// An explicit `ytdlp_path` wins; otherwise PATH is searched when
    /// `search_path` is enabled.
    pub fn from_config(tools: &ToolsConfig) -> Result<Self> {
        let engine = match &tools.ytdlp_path {
            Some(path) => Some(Self::new(path.clone())),
            None if tools.search_path => Self::from_path(),
            None => None,
        };

        let engine = engine.ok_or_else(|| {
            Error::ExternalTool(
                "yt-dlp not found: set ytdlp_path or enable search_path".to_string(),
            )
        })?;

        Ok(match &tools.ffmpeg_location {
            Some(location) => engine.with_ffmpeg_location(location.clone()),
            None => engine,
        })
    }

    /// Point yt-dlp at a specific ffmpeg binary or directory
    pub fn with_ffmpeg_location(mut self, location: PathBuf) -> Self {
        self.ffmpeg_location = Some(location);
        self
    }

    /// Path of the yt-dlp binary in use
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn run(&self, args: &[String]) -> Result<Output> {
        Command::new(&self.binary_path)
            .args(args)
            .output()
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))
    }
}

impl MediaEngine for YtDlpEngine {
    fn probe(&self, link: &str) -> Result<Classification> {
        let output = self.run(&probe_args(link))?;
        if !output.status.success() {
            return Err(Error::Classification(failure_cause(&output)));
        }
        parse_probe_output(&output.stdout)
    }

    fn materialize(
        &self,
        link: &str,
        policy: &FormatPolicy,
        output: &OutputSpec,
    ) -> Result<Artifact> {
        let args = materialize_args(link, policy, output, self.ffmpeg_location.as_deref());
        let result = self
            .run(&args)
            .and_then(|out| {
                if out.status.success() {
                    Ok(out)
                } else {
                    Err(DownloadError::ToolFailed {
                        cause: failure_cause(&out),
                    }
                    .into())
                }
            })
            .and_then(|out| {
                let media_kind = if policy.audio.is_some() {
                    MediaKind::Audio
                } else {
                    MediaKind::Video
                };
                parse_materialize_output(&out.stdout, media_kind)
            });

        if result.is_err() {
            remove_leftovers(output);
        }
        result
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

fn probe_args(link: &str) -> Vec<String> {
    [
        "--dump-single-json",
        "--flat-playlist",
        "--no-warnings",
        "--quiet",
        link,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn materialize_args(
    link: &str,
    policy: &FormatPolicy,
    output: &OutputSpec,
    ffmpeg_location: Option<&Path>,
) -> Vec<String> {
    let template = output
        .dir
        .join(format!("{}-%(id)s.%(ext)s", output.stem))
        .to_string_lossy()
        .into_owned();

    let mut args: Vec<String> = vec![
        "--no-playlist".into(),
        "--no-warnings".into(),
        "--quiet".into(),
        "--no-progress".into(),
        "--no-simulate".into(),
        "-f".into(),
        policy.selector.clone(),
        "-o".into(),
        template,
        "--print".into(),
        AFTER_MOVE_TEMPLATE.into(),
    ];

    if let Some(container) = policy.merge_container {
        args.push("--merge-output-format".into());
        args.push(container.into());
    }

    if let Some(audio) = &policy.audio {
        args.push("-x".into());
        args.push("--audio-format".into());
        args.push(audio.codec.into());
        args.push("--audio-quality".into());
        args.push(format!("{}K", audio.bitrate_kbps));
    }

    if let Some(location) = ffmpeg_location {
        args.push("--ffmpeg-location".into());
        args.push(location.to_string_lossy().into_owned());
    }

    args.push(link.to_string());
    args
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    entries: Option<Vec<Option<RawEntry>>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: Option<String>,
    url: Option<String>,
    title: Option<String>,
}

/// Parse `--dump-single-json --flat-playlist` output
///
/// The presence of an `entries` list marks a collection. Null entries are
/// kept as empty [`EntryRef`]s so the collection total stays accurate.
fn parse_probe_output(stdout: &[u8]) -> Result<Classification> {
    let raw: RawInfo = serde_json::from_slice(stdout)
        .map_err(|e| Error::Classification(format!("yt-dlp returned invalid JSON: {}", e)))?;

    let kind = match raw.entries {
        Some(entries) => LinkKind::Collection {
            entries: entries
                .into_iter()
                .map(|entry| match entry {
                    Some(e) => EntryRef {
                        id: e.id,
                        url: e.url,
                        title: e.title,
                    },
                    None => EntryRef::default(),
                })
                .collect(),
        },
        None => LinkKind::Single,
    };

    Ok(Classification {
        title: raw.title,
        duration_secs: raw.duration.map(seconds),
        kind,
    })
}

#[derive(Debug, Deserialize)]
struct MovedFile {
    title: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    filepath: Option<PathBuf>,
}

/// Parse the `after_move` line yt-dlp prints for the finished file
fn parse_materialize_output(stdout: &[u8], media_kind: MediaKind) -> Result<Artifact> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| DownloadError::ToolFailed {
            cause: "yt-dlp reported no output file".to_string(),
        })?;

    let moved: MovedFile = serde_json::from_str(line.trim())?;
    let path = moved.filepath.ok_or_else(|| DownloadError::ToolFailed {
        cause: "yt-dlp reported no output file".to_string(),
    })?;

    let size_bytes = std::fs::metadata(&path)
        .map_err(|_| DownloadError::ArtifactMissing { path: path.clone() })?
        .len();

    Ok(Artifact {
        path,
        size_bytes,
        title: moved.title,
        uploader: moved.uploader,
        duration_secs: moved.duration.map(seconds),
        media_kind,
    })
}

/// Best single-line explanation of a failed run
fn failure_cause(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr_cause(&stderr).unwrap_or_else(|| format!("yt-dlp exited with {}", output.status))
}

fn stderr_cause(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
        .or_else(|| lines.last().map(|l| l.to_string()))
}

/// Remove partial files a failed job left under its stem
fn remove_leftovers(output: &OutputSpec) {
    let Ok(entries) = std::fs::read_dir(&output.dir) else {
        return;
    };
    let prefix = format!("{}-", output.stem);
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            let path = entry.path();
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed partial download"),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove partial download"),
            }
        }
    }
}

fn seconds(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}
