//! State-file persistence for poll progress and handled composite keys.

use std::{collections::HashSet, path::PathBuf};

use anyhow::{Context, Result};
use mentionwatch_core::write_text_atomic;
use mentionwatch_github::CompositeKey;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const WATCH_STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Informational transport health recorded after every cycle.
pub struct WatchHealthSnapshot {
    #[serde(default)]
    pub last_cycle_started_at: Option<String>,
    #[serde(default)]
    pub last_cycle_duration_ms: u64,
    #[serde(default)]
    pub last_cycle_emitted: usize,
    #[serde(default)]
    pub failure_streak: usize,
    #[serde(default)]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WatchStateFile {
    schema_version: u32,
    #[serde(default)]
    last_checked: Option<String>,
    #[serde(default)]
    processed_thread_ids: Vec<CompositeKey>,
    #[serde(default)]
    health: WatchHealthSnapshot,
}

#[derive(Debug, Clone, Default)]
/// Poll progress plus the ordered set of keys that must never be emitted again.
///
/// Keys are only ever added. A cycle takes the state by value and hands the
/// next value back to the scheduler.
pub struct WatchState {
    last_checked: Option<String>,
    processed_thread_ids: Vec<CompositeKey>,
    processed_index: HashSet<CompositeKey>,
    health: WatchHealthSnapshot,
}

impl PartialEq for WatchState {
    fn eq(&self, other: &Self) -> bool {
        self.last_checked == other.last_checked
            && self.processed_thread_ids == other.processed_thread_ids
            && self.health == other.health
    }
}

impl Eq for WatchState {}

impl WatchState {
    fn from_file(file: WatchStateFile) -> Self {
        let mut state = Self {
            last_checked: file.last_checked,
            health: file.health,
            ..Self::default()
        };
        for key in file.processed_thread_ids {
            state.mark_processed(key);
        }
        state
    }

    fn to_file(&self) -> WatchStateFile {
        WatchStateFile {
            schema_version: WATCH_STATE_SCHEMA_VERSION,
            last_checked: self.last_checked.clone(),
            processed_thread_ids: self.processed_thread_ids.clone(),
            health: self.health.clone(),
        }
    }

    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.processed_index.contains(key)
    }

    /// Appends `key`; returns false when it was already handled.
    pub fn mark_processed(&mut self, key: CompositeKey) -> bool {
        if self.processed_index.contains(&key) {
            return false;
        }
        self.processed_index.insert(key.clone());
        self.processed_thread_ids.push(key);
        true
    }

    /// Union of the current keys with externally acknowledged ones.
    pub fn with_acknowledged(mut self, keys: impl IntoIterator<Item = CompositeKey>) -> Self {
        for key in keys {
            self.mark_processed(key);
        }
        self
    }

    pub fn with_last_checked(mut self, last_checked: String) -> Self {
        self.last_checked = Some(last_checked);
        self
    }

    pub fn with_health(mut self, health: WatchHealthSnapshot) -> Self {
        self.health = health;
        self
    }

    pub fn last_checked(&self) -> Option<&str> {
        self.last_checked.as_deref()
    }

    pub fn processed_keys(&self) -> &[CompositeKey] {
        &self.processed_thread_ids
    }

    pub fn health(&self) -> &WatchHealthSnapshot {
        &self.health
    }
}

#[derive(Debug, Clone)]
pub struct WatchStateStore {
    path: PathBuf,
}

impl WatchStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads persisted state; an absent or empty file is the zero-value state.
    ///
    /// Invalid UTF-8, unreadable JSON, or an unknown schema also yields the zero value, since
    /// acknowledged keys are recovered from the ack journal on the next merge.
    pub fn load(&self) -> Result<WatchState> {
        if !self.path.exists() {
            return Ok(WatchState::default());
        }
        let raw = std::fs::read(&self.path)
            .with_context(|| format!("failed to read state file {}", self.path.display()))?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(WatchState::default());
        }
        let file = match serde_json::from_slice::<WatchStateFile>(&raw) {
            Ok(file) => file,
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    %error,
                    "failed to parse watch state file; starting fresh"
                );
                return Ok(WatchState::default());
            }
        };
        if file.schema_version != WATCH_STATE_SCHEMA_VERSION {
            warn!(
                path = %self.path.display(),
                expected = WATCH_STATE_SCHEMA_VERSION,
                found = file.schema_version,
                "unsupported watch state schema; starting fresh"
            );
            return Ok(WatchState::default());
        }
        Ok(WatchState::from_file(file))
    }

    pub fn save(&self, state: &WatchState) -> Result<()> {
        let mut payload = serde_json::to_string_pretty(&state.to_file())
            .context("failed to serialize watch state")?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload)
            .with_context(|| format!("failed to write state file {}", self.path.display()))?;
        Ok(())
    }
}
