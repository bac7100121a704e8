//! Configuration types for tubedrop

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Placeholder token shipped in example configs, never valid
const PLACEHOLDER_TOKEN: &str = "YOUR_BOT_TOKEN_HERE";

/// Upload ceiling enforced before any transport attempt (2000 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2000 * 1024 * 1024;

/// Telegram Bot API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    #[serde(default)]
    pub bot_token: String,

    /// Bot API base URL (default: "https://api.telegram.org")
    ///
    /// Point this at a self-hosted Bot API server to lift the cloud upload
    /// limit up to the configured ceiling.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Long-poll timeout for getUpdates (default: 30 seconds)
    #[serde(default = "default_poll_timeout", with = "duration_serde")]
    pub poll_timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: default_api_base_url(),
            poll_timeout: default_poll_timeout(),
        }
    }
}

/// Download behavior configuration (directories, workers, limits)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory for transient artifacts (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Size of the blocking worker pool (default: 4)
    ///
    /// Classification and downloads from every conversation share this pool,
    /// so it also caps how many run at once.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Upload ceiling in bytes (default and maximum: 2000 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Hostnames whose presence in a message marks it as a link
    #[serde(default = "default_supported_hosts")]
    pub supported_hosts: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            worker_threads: default_worker_threads(),
            max_upload_bytes: default_max_upload_bytes(),
            supported_hosts: default_supported_hosts(),
        }
    }
}

/// External tool paths
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Directory or path of ffmpeg, passed through to yt-dlp
    #[serde(default)]
    pub ffmpeg_location: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_location: None,
            search_path: true,
        }
    }
}

/// Health endpoint configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Serve the health endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Address to bind to (default: 0.0.0.0:10000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
        }
    }
}

/// Retry configuration for transient Bot API failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for the bot
///
/// Fields are organized into sub-configs:
/// - [`telegram`](TelegramConfig): Bot API access
/// - [`download`](DownloadConfig): artifact directory, worker pool, ceiling
/// - [`tools`](ToolsConfig): external binary paths
/// - [`health`](HealthConfig): liveness endpoint
/// - [`retry`](RetryConfig): Bot API retry policy
///
/// `download` and `tools` are flattened, so their keys sit at the top level
/// of the TOML file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Display name reported by the health endpoint
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Telegram Bot API settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Health endpoint settings
    #[serde(default)]
    pub health: HealthConfig,

    /// Retry policy for Bot API calls
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            telegram: TelegramConfig::default(),
            download: DownloadConfig::default(),
            tools: ToolsConfig::default(),
            health: HealthConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })
    }

    /// Load configuration from an optional TOML file, then apply environment overrides
    ///
    /// Recognized variables: `BOT_TOKEN` and `PORT`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(
                        "config",
                        format!("failed to read '{}': {}", path.display(), e),
                    )
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| Error::config("PORT", format!("invalid port '{port}'")))?;
            self.health.bind_address.set_port(port);
        }
        Ok(())
    }

    /// Reject configurations the bot cannot run with
    pub fn validate(&self) -> Result<()> {
        let token = self.telegram.bot_token.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return Err(Error::config("bot_token", "a bot token is required"));
        }
        match url::Url::parse(&self.telegram.api_base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(Error::config(
                    "api_base_url",
                    format!("'{}' is not an http(s) URL", self.telegram.api_base_url),
                ));
            }
        }
        if self.download.worker_threads == 0 {
            return Err(Error::config(
                "worker_threads",
                "worker pool needs at least one thread",
            ));
        }
        if self.download.max_upload_bytes == 0 {
            return Err(Error::config(
                "max_upload_bytes",
                "upload ceiling must be positive",
            ));
        }
        if self.download.max_upload_bytes > DEFAULT_MAX_UPLOAD_BYTES {
            return Err(Error::config(
                "max_upload_bytes",
                format!(
                    "upload ceiling may not exceed {} MiB",
                    DEFAULT_MAX_UPLOAD_BYTES / (1024 * 1024)
                ),
            ));
        }
        if self.download.supported_hosts.is_empty() {
            return Err(Error::config(
                "supported_hosts",
                "at least one supported host is required",
            ));
        }
        Ok(())
    }
}

fn default_bot_name() -> String {
    "YouTube Downloader".to_string()
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_worker_threads() -> usize {
    4
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_supported_hosts() -> Vec<String> {
    vec!["youtube.com".to_string(), "youtu.be".to_string()]
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 10000))
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.telegram.bot_token = "123:abc".to_string();
        config
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.download.max_upload_bytes, 2000 * 1024 * 1024);
        assert_eq!(config.download.worker_threads, 4);
        assert_eq!(config.health.bind_address.port(), 10000);
        assert_eq!(config.telegram.api_base_url, "https://api.telegram.org");
        assert_eq!(
            config.download.supported_hosts,
            vec!["youtube.com".to_string(), "youtu.be".to_string()]
        );
    }

    #[test]
    fn toml_keys_for_flattened_sections_sit_at_top_level() {
        let config = Config::from_toml_str(
            r#"
            bot_name = "Test Bot"
            download_dir = "/var/tmp/tubedrop"
            worker_threads = 2
            ytdlp_path = "/opt/bin/yt-dlp"

            [telegram]
            bot_token = "1:x"
            poll_timeout = 10

            [health]
            enabled = false
            bind_address = "127.0.0.1:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.bot_name, "Test Bot");
        assert_eq!(config.download.download_dir, PathBuf::from("/var/tmp/tubedrop"));
        assert_eq!(config.download.worker_threads, 2);
        assert_eq!(
            config.tools.ytdlp_path,
            Some(PathBuf::from("/opt/bin/yt-dlp"))
        );
        assert_eq!(config.telegram.bot_token, "1:x");
        assert_eq!(config.telegram.poll_timeout, Duration::from_secs(10));
        assert!(!config.health.enabled);
        assert_eq!(config.health.bind_address.port(), 8080);
        // Untouched fields keep their defaults
        assert_eq!(config.download.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let result = Config::from_toml_str("worker_threads = \"many\"");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn env_overrides_token_and_port() {
        let env: HashMap<&str, &str> = [("BOT_TOKEN", "42:secret"), ("PORT", "8443")].into();
        let mut config = Config::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.telegram.bot_token, "42:secret");
        assert_eq!(config.health.bind_address.port(), 8443);
    }

    #[test]
    fn env_rejects_non_numeric_port() {
        let mut config = Config::default();
        let result = config.apply_env(|k| (k == "PORT").then(|| "http".to_string()));
        match result {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("PORT")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_missing_and_placeholder_tokens() {
        assert!(Config::default().validate().is_err());

        let mut config = valid_config();
        config.telegram.bot_token = PLACEHOLDER_TOKEN.to_string();
        assert!(config.validate().is_err());

        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_workers_and_zero_ceiling() {
        let mut config = valid_config();
        config.download.worker_threads = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.download.max_upload_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_ceiling_above_2000_mib() {
        let mut config = valid_config();
        config.download.max_upload_bytes = 4000 * 1024 * 1024;
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("max_upload_bytes"))
            }
            other => panic!("expected config error, got {other:?}"),
        }

        config.download.max_upload_bytes = DEFAULT_MAX_UPLOAD_BYTES;
        assert!(config.validate().is_ok());
        config.download.max_upload_bytes = 50 * 1024 * 1024;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_http_api_base() {
        let mut config = valid_config();
        config.telegram.api_base_url = "ftp://api.telegram.org".to_string();
        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("api_base_url")),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
