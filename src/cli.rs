use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "deckhand",
    version,
    about = "Deploy application templates onto Kubernetes clusters from the terminal."
)]
pub struct CliArgs {
    /// Service Hub API base URL (for example: https://hub.example.com/api/v1)
    #[arg(long, env = "DECKHAND_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for the Service Hub API
    #[arg(long, env = "DECKHAND_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to a deckhand.yaml config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
