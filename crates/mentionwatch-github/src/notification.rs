use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Subject types that can carry an actionable mention.
pub enum SubjectKind {
    Issue,
    PullRequest,
}

impl SubjectKind {
    /// Maps the source's `subject.type` string, rejecting releases, discussions, etc.
    pub fn from_subject_type(raw: &str) -> Option<Self> {
        match raw {
            "Issue" => Some(Self::Issue),
            "PullRequest" => Some(Self::PullRequest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "Issue",
            Self::PullRequest => "PullRequest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSubject {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub latest_comment_url: Option<String>,
    #[serde(rename = "type")]
    pub subject_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRepository {
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Unread notification snapshot as returned by the notification source.
///
/// `id` is the thread identifier; the source reuses it for the lifetime of a
/// subscription, so it only identifies new activity together with `updated_at`.
pub struct RawNotification {
    pub id: String,
    #[serde(default = "default_unread")]
    pub unread: bool,
    pub reason: String,
    pub updated_at: String,
    pub subject: NotificationSubject,
    pub repository: NotificationRepository,
}

fn default_unread() -> bool {
    true
}

impl RawNotification {
    pub fn subject_kind(&self) -> Option<SubjectKind> {
        SubjectKind::from_subject_type(&self.subject.subject_type)
    }

    /// Returns the comment to fetch for this notification, if any.
    ///
    /// The source points `latest_comment_url` at the subject itself when the
    /// newest activity is the issue/PR body; that case has no comment.
    pub fn comment_reference(&self) -> Option<&str> {
        let comment_url = self
            .subject
            .latest_comment_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())?;
        if self.subject.url.as_deref().map(str::trim) == Some(comment_url) {
            return None;
        }
        Some(comment_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Comment body, author login, and permalink fetched for a single notification.
pub struct CommentDetail {
    pub body: String,
    pub author: String,
    pub permalink: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RawNotification, SubjectKind};

    fn sample(latest_comment_url: serde_json::Value) -> RawNotification {
        serde_json::from_value(json!({
            "id": "1001",
            "reason": "mention",
            "updated_at": "2026-02-01T11:30:00Z",
            "subject": {
                "title": "Crash on start",
                "url": "https://api.github.com/repos/owner/repo/issues/42",
                "latest_comment_url": latest_comment_url,
                "type": "Issue"
            },
            "repository": {"full_name": "owner/repo"}
        }))
        .expect("notification")
    }

    #[test]
    fn unit_subject_kind_accepts_only_issue_and_pull_request() {
        assert_eq!(SubjectKind::from_subject_type("Issue"), Some(SubjectKind::Issue));
        assert_eq!(
            SubjectKind::from_subject_type("PullRequest"),
            Some(SubjectKind::PullRequest)
        );
        assert_eq!(SubjectKind::from_subject_type("Release"), None);
    }

    #[test]
    fn functional_comment_reference_distinguishes_comment_from_body_activity() {
        let with_comment =
            sample(json!("https://api.github.com/repos/owner/repo/issues/comments/9"));
        assert_eq!(
            with_comment.comment_reference(),
            Some("https://api.github.com/repos/owner/repo/issues/comments/9")
        );
        assert!(with_comment.unread);

        let body_only = sample(json!("https://api.github.com/repos/owner/repo/issues/42"));
        assert_eq!(body_only.comment_reference(), None);

        let missing = sample(serde_json::Value::Null);
        assert_eq!(missing.comment_reference(), None);
    }
}
