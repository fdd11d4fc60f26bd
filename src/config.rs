use crate::cli::CliArgs;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_LOG_FILTER: &str = "info";

/// Effective settings after merging the config file with CLI flags.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    pub source: Option<String>,
    pub api_url: String,
    pub token: Option<String>,
    pub log_filter: String,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct DeckhandConfigFile {
    #[serde(default, alias = "url", alias = "api")]
    api_url: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    token_env: Option<String>,
    #[serde(default)]
    log_filter: Option<String>,
}

impl Settings {
    pub fn load(args: &CliArgs) -> Result<Self> {
        let path = args.config.clone().or_else(discover_config_path);
        let file = match &path {
            Some(path) => read_config_file(path)?,
            None => DeckhandConfigFile::default(),
        };
        Self::merge(args, file, path.map(|path| path.display().to_string()))
    }

    fn merge(args: &CliArgs, file: DeckhandConfigFile, source: Option<String>) -> Result<Self> {
        let api_url = args
            .api_url
            .clone()
            .or(file.api_url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .context("Service Hub API URL is not configured; pass --api-url or set api_url in deckhand.yaml")?;

        let token = args
            .token
            .clone()
            .or(file.token)
            .or_else(|| {
                file.token_env
                    .as_deref()
                    .and_then(|name| std::env::var(name).ok())
            })
            .filter(|token| !token.trim().is_empty());

        let log_filter = args
            .log_filter
            .clone()
            .or(file.log_filter)
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            source,
            api_url,
            token,
            log_filter,
            log_file: args.log_file.clone(),
        })
    }
}

fn read_config_file(path: &Path) -> Result<DeckhandConfigFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}

fn parse_config(raw: &str) -> Result<DeckhandConfigFile> {
    if raw.trim().is_empty() {
        return Ok(DeckhandConfigFile::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DECKHAND_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("deckhand.yaml"),
        PathBuf::from("deckhand.yml"),
        PathBuf::from(".deckhand.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/deckhand/config.yaml"),
            PathBuf::from(&home).join(".config/deckhand/config.yml"),
            PathBuf::from(&home).join(".deckhand.yaml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}
