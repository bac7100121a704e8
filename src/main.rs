//! tubedrop bot binary

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tubedrop::Config;

/// Telegram bot that downloads videos, audio and playlists on request
#[derive(Debug, Parser)]
#[command(name = "tubedrop", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "TUBEDROP_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        return match config.validate() {
            Ok(()) => {
                tracing::info!("configuration is valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "invalid configuration");
                ExitCode::FAILURE
            }
        };
    }

    match tubedrop::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "bot stopped with an error");
            ExitCode::FAILURE
        }
    }
}
