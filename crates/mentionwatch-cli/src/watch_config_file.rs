use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mentionwatch_github::build_reason_filter;
use serde::Deserialize;

use crate::cli_args::{ConnectionArgs, WatchArgs};

pub(crate) const DEFAULT_STATE_DIR: &str = ".mentionwatch";
pub(crate) const DEFAULT_API_BASE: &str = "https://api.github.com";
pub(crate) const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
/// Optional YAML defaults. Flags and environment values take precedence.
pub(crate) struct WatchConfigFile {
    #[serde(default)]
    pub(crate) repo: Option<String>,
    #[serde(default)]
    pub(crate) agent: Option<String>,
    #[serde(default)]
    pub(crate) reasons: Vec<String>,
    #[serde(default)]
    pub(crate) poll_interval_seconds: Option<u64>,
    #[serde(default)]
    pub(crate) state_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) api_base: Option<String>,
}

pub(crate) fn load_watch_config_file(path: Option<&Path>) -> Result<WatchConfigFile> {
    let Some(path) = path else {
        return Ok(WatchConfigFile::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(WatchConfigFile::default());
    }
    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedConnection {
    pub(crate) repo: Option<String>,
    pub(crate) state_dir: PathBuf,
    pub(crate) api_base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedWatchSettings {
    pub(crate) connection: ResolvedConnection,
    pub(crate) agent: Option<String>,
    pub(crate) reasons: Vec<String>,
    pub(crate) poll_interval_seconds: u64,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) fn resolve_connection(
    args: &ConnectionArgs,
    file: &WatchConfigFile,
) -> ResolvedConnection {
    ResolvedConnection {
        repo: non_empty(args.repo.as_deref()).or_else(|| non_empty(file.repo.as_deref())),
        state_dir: args
            .state_dir
            .clone()
            .or_else(|| file.state_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
        api_base: non_empty(args.api_base.as_deref())
            .or_else(|| non_empty(file.api_base.as_deref()))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
    }
}

pub(crate) fn resolve_watch_settings(
    args: &WatchArgs,
    file: &WatchConfigFile,
) -> ResolvedWatchSettings {
    let reasons = if args.reasons.is_empty() {
        &file.reasons
    } else {
        &args.reasons
    };
    ResolvedWatchSettings {
        connection: resolve_connection(&args.connection, file),
        agent: non_empty(args.agent.as_deref()).or_else(|| non_empty(file.agent.as_deref())),
        reasons: build_reason_filter(reasons.iter().map(String::as_str)),
        poll_interval_seconds: args
            .poll_interval_seconds
            .or(file.poll_interval_seconds)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS)
            .max(1),
    }
}
