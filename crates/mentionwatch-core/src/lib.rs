//! Foundational low-level utilities shared across mentionwatch crates.
//!
//! Provides the atomic file-write helper used by watch-state persistence and
//! the clock helpers used for cycle snapshots and health bookkeeping.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use time_utils::{current_rfc3339_millis, current_unix_timestamp_ms, format_rfc3339_millis};

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use super::*;

    #[test]
    fn unit_current_rfc3339_millis_is_utc_with_millisecond_precision() {
        let stamp = current_rfc3339_millis();
        assert!(stamp.ends_with('Z'), "expected UTC suffix in {stamp}");
        let (_, fraction) = stamp.rsplit_once('.').expect("fractional seconds");
        assert_eq!(fraction.len(), 4, "expected three digits plus Z in {stamp}");
    }

    #[test]
    fn functional_write_text_atomic_replaces_existing_content() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("nested").join("state.json");
        write_text_atomic(&path, "first").expect("write first");
        write_text_atomic(&path, "second").expect("write second");
        let contents = read_to_string(&path).expect("read");
        assert_eq!(contents, "second");
    }
}
