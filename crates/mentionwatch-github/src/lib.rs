//! Source-facing data model and pure gating logic for the mention watcher.
//!
//! Holds the GitHub notification payload types, the composite de-duplication
//! key, the `@mention` verifier, the mention-event builder, reason filters,
//! and HTTP retry helpers consumed by the runtime crate.

pub mod composite_key;
pub mod github_transport_helpers;
pub mod mention;
pub mod mention_event;
pub mod notification;
pub mod reason_filter;

pub use composite_key::{CompositeKey, CompositeKeyError};
pub use mention::is_mentioned;
pub use mention_event::{build_mention_event, MentionEvent, UNKNOWN_AUTHOR};
pub use notification::{
    CommentDetail, NotificationRepository, NotificationSubject, RawNotification, SubjectKind,
};
pub use reason_filter::{build_reason_filter, reason_matches, MENTION_REASON};
