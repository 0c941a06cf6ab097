/// Reason code the source attaches to direct `@` mentions.
pub const MENTION_REASON: &str = "mention";

/// Normalize a reason code for case-insensitive matching.
pub fn normalize_reason(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Build the ordered, de-duplicated reason filter from CLI or config values.
///
/// An empty result falls back to mentions only.
pub fn build_reason_filter<'a>(reasons: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut filter = Vec::new();
    for reason in reasons.into_iter().map(normalize_reason) {
        if !reason.is_empty() && !filter.contains(&reason) {
            filter.push(reason);
        }
    }
    if filter.is_empty() {
        filter.push(MENTION_REASON.to_string());
    }
    filter
}

/// Return true when the notification reason is one the watcher cares about.
pub fn reason_matches(reason: &str, filter: &[String]) -> bool {
    let reason = normalize_reason(reason);
    filter.iter().any(|candidate| *candidate == reason)
}

#[cfg(test)]
mod tests {
    use super::{build_reason_filter, normalize_reason, reason_matches, MENTION_REASON};

    #[test]
    fn unit_normalize_reason_trims_and_lowercases() {
        assert_eq!(normalize_reason("  Mention "), "mention");
    }

    #[test]
    fn functional_build_reason_filter_deduplicates_and_keeps_order() {
        let filter = build_reason_filter(["Comment", "mention", "comment", " ", "author"]);
        assert_eq!(filter, vec!["comment", "mention", "author"]);
    }

    #[test]
    fn regression_build_reason_filter_defaults_to_mentions() {
        let filter = build_reason_filter(Vec::<&str>::new());
        assert_eq!(filter, vec![MENTION_REASON.to_string()]);
        assert!(reason_matches("MENTION", &filter));
        assert!(!reason_matches("ci_activity", &filter));
    }
}
