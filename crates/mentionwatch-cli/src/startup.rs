use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mentionwatch_github::github_transport_helpers::RetryPolicy;
use mentionwatch_runtime::{
    acknowledge, resolve_agent_login, AckJournal, AckOutcome, GithubApiClient, JsonlEventSink,
    MentionWatchConfig, MentionWatchRuntime, RepoRef, ThreadReadMarker, WatchError, WatchPaths,
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli_args::{AckArgs, Cli, Command, ConnectionArgs, WatchArgs};
use crate::watch_config_file::{
    load_watch_config_file, resolve_connection, resolve_watch_settings, ResolvedConnection,
};

pub(crate) async fn run_cli(cli: Cli) -> Result<(), WatchError> {
    match cli.command {
        Command::Watch(args) => run_watch(args).await,
        Command::Ack(args) => run_ack(args).await,
    }
}

fn config_error(error: anyhow::Error) -> WatchError {
    WatchError::config(format!("{error:#}"))
}

fn require_repo(connection: &ResolvedConnection) -> Result<RepoRef, WatchError> {
    let raw = connection.repo.as_deref().ok_or_else(|| {
        WatchError::config("--repo is required (or set MENTIONWATCH_REPO / repo in the config file)")
    })?;
    RepoRef::parse(raw).map_err(config_error)
}

fn build_client(
    args: &ConnectionArgs,
    connection: &ResolvedConnection,
    repo: RepoRef,
    token: &str,
) -> Result<GithubApiClient, WatchError> {
    GithubApiClient::new(
        &connection.api_base,
        token,
        repo,
        args.request_timeout_ms,
        RetryPolicy::new(args.retry_max_attempts, args.retry_base_delay_ms),
    )
    .map_err(config_error)
}

fn resolve_token(args: &ConnectionArgs) -> Option<String> {
    args.github_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

async fn run_watch(args: WatchArgs) -> Result<(), WatchError> {
    let file = load_watch_config_file(args.connection.config.as_deref()).map_err(config_error)?;
    let settings = resolve_watch_settings(&args, &file);
    let repo = require_repo(&settings.connection)?;
    let token = resolve_token(&args.connection).ok_or_else(|| {
        WatchError::config("--github-token is required for watch (or set GITHUB_TOKEN)")
    })?;
    let client = Arc::new(build_client(
        &args.connection,
        &settings.connection,
        repo.clone(),
        &token,
    )?);

    let agent_login = resolve_agent_login(settings.agent.as_deref(), client.as_ref()).await?;
    let config = MentionWatchConfig {
        paths: WatchPaths::for_repo(&settings.connection.state_dir, &repo),
        repo,
        agent_login,
        reasons: settings.reasons,
        poll_interval: Duration::from_secs(settings.poll_interval_seconds),
        poll_once: args.once,
    };
    info!(
        repo = %config.repo.as_slug(),
        agent = %config.agent_login,
        reasons = ?config.reasons,
        poll_interval_seconds = settings.poll_interval_seconds,
        once = config.poll_once,
        state_path = %config.paths.state_path.display(),
        "mention watch starting"
    );

    let runtime =
        MentionWatchRuntime::new(config, client.clone(), client, JsonlEventSink::stdout());
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = cancel_tx.send(true);
    });
    let result = runtime.run(cancel_rx).await;
    signal_task.abort();
    result.map(|_| ())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(error) => {
            warn!(%error, "failed to install SIGTERM handler; only ctrl-c will stop the watch");
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
    info!("shutdown signal received");
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

/// Stands in for the GitHub client when no token is configured.
struct MissingTokenMarker;

#[async_trait]
impl ThreadReadMarker for MissingTokenMarker {
    async fn mark_thread_read(&self, _thread_id: &str) -> Result<()> {
        Err(anyhow!("no github token configured"))
    }
}

async fn run_ack(args: AckArgs) -> Result<(), WatchError> {
    let file = load_watch_config_file(args.connection.config.as_deref()).map_err(config_error)?;
    let connection = resolve_connection(&args.connection, &file);
    let repo = require_repo(&connection)?;
    let journal = AckJournal::new(WatchPaths::for_repo(&connection.state_dir, &repo).journal_path);

    let outcome = match resolve_token(&args.connection) {
        Some(token) => {
            let client = build_client(&args.connection, &connection, repo, &token)?;
            acknowledge(&journal, &client, &args.key).await?
        }
        None => acknowledge(&journal, &MissingTokenMarker, &args.key).await?,
    };
    print_ack_outcome(&outcome)
}

fn print_ack_outcome(outcome: &AckOutcome) -> Result<(), WatchError> {
    let line = serde_json::to_string(outcome)
        .map_err(|error| WatchError::Output {
            message: format!("failed to encode ack outcome: {error}"),
        })?;
    println!("{line}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use mentionwatch_runtime::{AckJournal, RepoRef, WatchError, WatchPaths};
    use tempfile::tempdir;

    use super::run_cli;
    use crate::cli_args::Cli;

    fn cli(argv: &[&str]) -> Cli {
        let mut full = vec!["mentionwatch"];
        full.extend_from_slice(argv);
        Cli::try_parse_from(full).expect("parse")
    }

    #[tokio::test]
    async fn functional_ack_journals_key_even_when_upstream_is_unreachable() {
        let temp = tempdir().expect("tempdir");
        let state_dir = temp.path().to_string_lossy().to_string();
        run_cli(cli(&[
            "ack",
            "1001:2026-02-01T11:30:00.000Z",
            "--repo",
            "owner/repo",
            "--state-dir",
            &state_dir,
            "--api-base",
            "http://127.0.0.1:9",
            "--retry-max-attempts",
            "1",
            "--request-timeout-ms",
            "500",
        ]))
        .await
        .expect("ack succeeds");

        let repo = RepoRef::parse("owner/repo").expect("repo");
        let journal = AckJournal::new(WatchPaths::for_repo(temp.path(), &repo).journal_path);
        let keys = journal.read_keys().expect("read journal");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].as_str(), "1001:2026-02-01T11:30:00.000Z");
    }

    #[tokio::test]
    async fn regression_invalid_ack_key_is_rejected_before_journal_write() {
        let temp = tempdir().expect("tempdir");
        let state_dir = temp.path().to_string_lossy().to_string();
        let error = run_cli(cli(&[
            "ack",
            "no-separator",
            "--repo",
            "owner/repo",
            "--state-dir",
            &state_dir,
        ]))
        .await
        .expect_err("invalid key");
        assert!(matches!(error, WatchError::InvalidAckKey(_)));
        assert_eq!(error.exit_code(), 2);

        let repo = RepoRef::parse("owner/repo").expect("repo");
        assert!(!WatchPaths::for_repo(temp.path(), &repo).journal_path.exists());
    }

    #[tokio::test]
    async fn regression_malformed_repo_is_a_config_error() {
        let temp = tempdir().expect("tempdir");
        let state_dir = temp.path().to_string_lossy().to_string();
        let error = run_cli(cli(&[
            "ack",
            "1:2",
            "--repo",
            "not-a-slug",
            "--state-dir",
            &state_dir,
        ]))
        .await
        .expect_err("bad repo");
        assert_eq!(error.code(), "config_invalid");
    }
}
