use mentionwatch_github::CompositeKey;
use serde::Serialize;
use tracing::{info, warn};

use super::{AckJournal, ThreadReadMarker, WatchError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
/// Outcome of the best-effort mark-read step.
pub enum UpstreamMark {
    Marked,
    Failed { thread_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Success of `acknowledge` depends only on the journal write; `upstream`
/// reports the mark-read attempt separately.
pub struct AckOutcome {
    pub key: CompositeKey,
    pub upstream: UpstreamMark,
}

/// Durably records `raw_key` in the ack journal, then tries to mark the
/// thread read upstream.
///
/// The key is validated before any I/O. A mark-read failure is logged and
/// reported in the outcome but never fails the acknowledgment.
pub async fn acknowledge(
    journal: &AckJournal,
    marker: &dyn ThreadReadMarker,
    raw_key: &str,
) -> Result<AckOutcome, WatchError> {
    let key = CompositeKey::parse(raw_key.trim())?;
    journal
        .append(&key)
        .map_err(|error| WatchError::storage(&error))?;
    info!(%key, journal = %journal.path().display(), "acknowledged mention event");

    let thread_id = key.thread_id().to_string();
    let upstream = match marker.mark_thread_read(&thread_id).await {
        Ok(()) => UpstreamMark::Marked,
        Err(error) => {
            let reason = format!("{error:#}");
            warn!(
                thread_id = %thread_id,
                %reason,
                "failed to mark notification thread {thread_id} read; it may remain unread upstream"
            );
            UpstreamMark::Failed { thread_id, reason }
        }
    };
    Ok(AckOutcome { key, upstream })
}
