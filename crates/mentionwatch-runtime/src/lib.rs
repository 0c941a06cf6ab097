//! Watch-and-acknowledge pipeline for agent mentions.
//!
//! Polls the notification source, gates each notification through
//! de-duplication, transient-failure, and stale-mention checks, emits
//! newline-delimited mention events, and records consumer acknowledgments in
//! an append-only journal that is merged back into the watch state each cycle.

pub mod watch_runtime;

pub use watch_runtime::{
    acknowledge, resolve_agent_login, AckJournal, AckOutcome, AgentIdentityResolver,
    CommentFetcher, CycleOutcome, GateDecision, GithubApiClient, JsonlEventSink,
    MentionWatchConfig, MentionWatchRuntime, NotificationSource, PollCycleReport, RepoRef,
    ThreadReadMarker, UpstreamMark, WatchError, WatchHealthSnapshot, WatchPaths, WatchState,
    WatchStateStore,
};
