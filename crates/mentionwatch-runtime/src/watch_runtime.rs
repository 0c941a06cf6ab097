//! Mention watch runtime: poll scheduling, gating, and acknowledgment.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use mentionwatch_core::current_rfc3339_millis;
use mentionwatch_github::{
    build_mention_event, is_mentioned, reason_filter::normalize_reason, CommentDetail,
    CompositeKey, MentionEvent, RawNotification, MENTION_REASON,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

mod ack_handler;
mod ack_journal;
mod event_sink;
mod github_api_client;
mod watch_error;
mod watch_state_store;

pub use ack_handler::{acknowledge, AckOutcome, UpstreamMark};
pub use ack_journal::AckJournal;
pub use event_sink::JsonlEventSink;
pub use github_api_client::GithubApiClient;
pub use watch_error::WatchError;
pub use watch_state_store::{
    WatchHealthSnapshot, WatchState, WatchStateStore, WATCH_STATE_SCHEMA_VERSION,
};

const STATE_FILE_NAME: &str = "state.json";
const ACK_JOURNAL_FILE_NAME: &str = "acks.log";

/// Returns the currently-unread notifications already filtered to `reasons`.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch_unread(&self, reasons: &[String]) -> Result<Vec<RawNotification>>;
}

/// Fetches one comment; `None` means the fetch failed and should be retried later.
#[async_trait]
pub trait CommentFetcher: Send + Sync {
    async fn fetch_comment(&self, comment_ref: &str) -> Option<CommentDetail>;
}

#[async_trait]
pub trait ThreadReadMarker: Send + Sync {
    async fn mark_thread_read(&self, thread_id: &str) -> Result<()>;
}

#[async_trait]
pub trait AgentIdentityResolver: Send + Sync {
    async fn resolve_login(&self) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid repository '{raw}', expected owner/repo"))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            bail!("invalid repository '{raw}', expected owner/repo");
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

fn sanitize_for_path(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Per-repository locations of the watch state file and ack journal.
pub struct WatchPaths {
    pub state_path: PathBuf,
    pub journal_path: PathBuf,
}

impl WatchPaths {
    pub fn for_repo(state_dir: &Path, repo: &RepoRef) -> Self {
        let repository_dir = state_dir.join(sanitize_for_path(&format!(
            "{}__{}",
            repo.owner, repo.name
        )));
        Self {
            state_path: repository_dir.join(STATE_FILE_NAME),
            journal_path: repository_dir.join(ACK_JOURNAL_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone)]
/// Runtime configuration for the mention poll loop.
pub struct MentionWatchConfig {
    pub repo: RepoRef,
    pub agent_login: String,
    pub reasons: Vec<String>,
    pub poll_interval: Duration,
    pub poll_once: bool,
    pub paths: WatchPaths,
}

/// Uses the configured login when present, otherwise asks the source who we are.
pub async fn resolve_agent_login(
    configured: Option<&str>,
    resolver: &dyn AgentIdentityResolver,
) -> Result<String, WatchError> {
    if let Some(login) = configured
        .map(str::trim)
        .map(|login| login.trim_start_matches('@'))
        .filter(|login| !login.is_empty())
    {
        return Ok(login.to_string());
    }
    let login = resolver
        .resolve_login()
        .await
        .map_err(|error| WatchError::identity(&error))?;
    let login = login.trim();
    if login.is_empty() {
        return Err(WatchError::IdentityUnresolved {
            message: "source returned an empty login".to_string(),
        });
    }
    Ok(login.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of running one notification through the gating pipeline.
pub enum GateDecision {
    Emit(MentionEvent),
    SkipDuplicate,
    SkipTransient,
    SkipStaleMention(CompositeKey),
    DropUnparseable,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollCycleReport {
    pub fetched: usize,
    pub emitted: usize,
    pub skipped_duplicate: usize,
    pub skipped_transient: usize,
    pub skipped_stale_mention: usize,
    pub dropped_unparseable: usize,
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub state: WatchState,
    pub report: PollCycleReport,
}

/// Long-running poll loop over one repository's notifications.
pub struct MentionWatchRuntime {
    config: MentionWatchConfig,
    source: Arc<dyn NotificationSource>,
    comments: Arc<dyn CommentFetcher>,
    state_store: WatchStateStore,
    journal: AckJournal,
    sink: JsonlEventSink,
}

impl MentionWatchRuntime {
    pub fn new(
        config: MentionWatchConfig,
        source: Arc<dyn NotificationSource>,
        comments: Arc<dyn CommentFetcher>,
        sink: JsonlEventSink,
    ) -> Self {
        let state_store = WatchStateStore::new(config.paths.state_path.clone());
        let journal = AckJournal::new(config.paths.journal_path.clone());
        Self {
            config,
            source,
            comments,
            state_store,
            journal,
            sink,
        }
    }

    pub fn load_state(&self) -> Result<WatchState, WatchError> {
        self.state_store
            .load()
            .map_err(|error| WatchError::storage(&error))
    }

    /// Runs cycles until cancelled, or exactly once in single-cycle mode.
    ///
    /// Continuous mode logs fetch failures and retries after the interval;
    /// single-cycle mode surfaces them. Storage and output failures are fatal
    /// in both modes.
    pub async fn run(
        &self,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> Result<WatchState, WatchError> {
        let mut state = self.load_state()?;
        loop {
            if *cancel_rx.borrow() {
                info!(repo = %self.config.repo.as_slug(), "mention watch stopping");
                return Ok(state);
            }

            let cycle_started_at = current_rfc3339_millis();
            let cycle_started = Instant::now();
            match self.poll_cycle(state.clone()).await {
                Ok(outcome) => {
                    let report = &outcome.report;
                    info!(
                        repo = %self.config.repo.as_slug(),
                        fetched = report.fetched,
                        emitted = report.emitted,
                        duplicate_skips = report.skipped_duplicate,
                        transient_skips = report.skipped_transient,
                        stale_mention_skips = report.skipped_stale_mention,
                        unparseable_drops = report.dropped_unparseable,
                        "mention watch poll"
                    );
                    state = outcome.state;
                }
                Err(error @ WatchError::Fetch { .. }) => {
                    let failure_streak = state.health().failure_streak.saturating_add(1);
                    state = state.with_health(WatchHealthSnapshot {
                        last_cycle_started_at: Some(cycle_started_at),
                        last_cycle_duration_ms: elapsed_ms(cycle_started),
                        last_cycle_emitted: 0,
                        failure_streak,
                        last_error: Some(error.to_string()),
                    });
                    if let Err(save_error) = self.state_store.save(&state) {
                        if !self.config.poll_once {
                            return Err(WatchError::storage(&save_error));
                        }
                        warn!(
                            repo = %self.config.repo.as_slug(),
                            error = %format!("{save_error:#}"),
                            "failed to persist watch health after fetch failure"
                        );
                    }
                    if self.config.poll_once {
                        return Err(error);
                    }
                    warn!(
                        repo = %self.config.repo.as_slug(),
                        failure_streak,
                        %error,
                        "mention watch poll failed; retrying after interval"
                    );
                }
                Err(error) => return Err(error),
            }

            if self.config.poll_once {
                return Ok(state);
            }
            if sleep_or_cancel(&mut cancel_rx, self.config.poll_interval).await {
                info!(repo = %self.config.repo.as_slug(), "mention watch stopping");
                return Ok(state);
            }
        }
    }

    /// One full cycle: merge journal, fetch, gate, emit, persist.
    ///
    /// Takes the current state by value and returns the next one.
    pub async fn poll_cycle(&self, state: WatchState) -> Result<CycleOutcome, WatchError> {
        let cycle_started_at = current_rfc3339_millis();
        let cycle_started = Instant::now();
        let acknowledged = self
            .journal
            .read_keys()
            .map_err(|error| WatchError::storage(&error))?;
        let mut state = state.with_acknowledged(acknowledged);

        let checked_at = current_rfc3339_millis();
        let notifications = self
            .source
            .fetch_unread(&self.config.reasons)
            .await
            .map_err(|error| WatchError::fetch(&error))?;

        let mut report = PollCycleReport {
            fetched: notifications.len(),
            ..PollCycleReport::default()
        };
        for notification in &notifications {
            match self.gate_notification(&state, notification).await {
                GateDecision::Emit(event) => {
                    self.sink
                        .emit(&event)
                        .map_err(|error| WatchError::output(&error))?;
                    debug!(
                        key = %event.key,
                        kind = event.kind.as_str(),
                        number = event.number,
                        "emitted mention event"
                    );
                    report.emitted = report.emitted.saturating_add(1);
                }
                GateDecision::SkipDuplicate => {
                    report.skipped_duplicate = report.skipped_duplicate.saturating_add(1);
                }
                GateDecision::SkipTransient => {
                    report.skipped_transient = report.skipped_transient.saturating_add(1);
                }
                GateDecision::SkipStaleMention(key) => {
                    state.mark_processed(key);
                    report.skipped_stale_mention = report.skipped_stale_mention.saturating_add(1);
                }
                GateDecision::DropUnparseable => {
                    report.dropped_unparseable = report.dropped_unparseable.saturating_add(1);
                }
            }
        }

        let state = state
            .with_last_checked(checked_at)
            .with_health(WatchHealthSnapshot {
                last_cycle_started_at: Some(cycle_started_at),
                last_cycle_duration_ms: elapsed_ms(cycle_started),
                last_cycle_emitted: report.emitted,
                failure_streak: 0,
                last_error: None,
            });
        self.state_store
            .save(&state)
            .map_err(|error| WatchError::storage(&error))?;
        Ok(CycleOutcome { state, report })
    }

    /// Dedup, transient-failure, and stale-mention gates, then event building.
    ///
    /// Emission never marks a key processed; only an acknowledgment does.
    pub async fn gate_notification(
        &self,
        state: &WatchState,
        notification: &RawNotification,
    ) -> GateDecision {
        let key = CompositeKey::for_notification(notification);
        if state.contains(&key) {
            return GateDecision::SkipDuplicate;
        }

        let comment = match notification.comment_reference() {
            Some(comment_ref) => match self.comments.fetch_comment(comment_ref).await {
                Some(comment) => Some(comment),
                None => {
                    debug!(thread_id = %notification.id, %key, "comment fetch failed; retrying next cycle");
                    return GateDecision::SkipTransient;
                }
            },
            None => None,
        };

        if normalize_reason(&notification.reason) == MENTION_REASON {
            if let Some(comment) = comment.as_ref() {
                if !is_mentioned(&comment.body, &self.config.agent_login) {
                    debug!(thread_id = %notification.id, %key, "stale mention; marking processed");
                    return GateDecision::SkipStaleMention(key);
                }
            }
        }

        match build_mention_event(notification, comment.as_ref(), &self.config.agent_login) {
            Some(event) => GateDecision::Emit(event),
            None => {
                debug!(thread_id = %notification.id, %key, "unparseable notification subject");
                GateDecision::DropUnparseable
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

/// Sleeps for `interval`; returns true when cancellation interrupted the wait.
async fn sleep_or_cancel(cancel_rx: &mut watch::Receiver<bool>, interval: Duration) -> bool {
    tokio::select! {
        _ = wait_for_cancellation(cancel_rx) => true,
        _ = tokio::time::sleep(interval) => false,
    }
}

async fn wait_for_cancellation(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            // sender dropped: nobody can cancel any more
            std::future::pending::<()>().await;
        }
    }
}
