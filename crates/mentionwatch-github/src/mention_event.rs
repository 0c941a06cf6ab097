use serde::{Deserialize, Serialize};

use crate::composite_key::CompositeKey;
use crate::notification::{CommentDetail, RawNotification, SubjectKind};

/// Author recorded when the mention lives in an issue/PR body rather than a comment.
pub const UNKNOWN_AUTHOR: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Actionable event written to the output stream, one JSON object per line.
///
/// `key` is the composite key the consumer passes back when acknowledging.
pub struct MentionEvent {
    pub agent: String,
    pub repo: String,
    pub number: u64,
    #[serde(rename = "type")]
    pub kind: SubjectKind,
    pub title: String,
    pub author: String,
    pub body: String,
    pub url: String,
    pub thread_id: String,
    pub timestamp: String,
    pub key: CompositeKey,
}

/// Maps a notification plus its optional comment into a mention event.
///
/// Returns `None` when the subject number cannot be parsed from the subject
/// reference or the subject is neither an issue nor a pull request.
pub fn build_mention_event(
    notification: &RawNotification,
    comment: Option<&CommentDetail>,
    agent: &str,
) -> Option<MentionEvent> {
    let number = parse_subject_number(notification.subject.url.as_deref()?)?;
    let kind = notification.subject_kind()?;
    let (author, body, url) = match comment {
        Some(comment) => (
            comment.author.clone(),
            comment.body.clone(),
            comment.permalink.clone(),
        ),
        None => (UNKNOWN_AUTHOR.to_string(), String::new(), String::new()),
    };
    Some(MentionEvent {
        agent: agent.to_string(),
        repo: notification.repository.full_name.clone(),
        number,
        kind,
        title: notification.subject.title.clone(),
        author,
        body,
        url,
        thread_id: notification.id.clone(),
        timestamp: notification.updated_at.clone(),
        key: CompositeKey::for_notification(notification),
    })
}

fn parse_subject_number(subject_url: &str) -> Option<u64> {
    subject_url
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<u64>().ok())
        .filter(|number| *number > 0)
}
