#![no_main]

use libfuzzer_sys::fuzz_target;
use mentionwatch_github::CompositeKey;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    match CompositeKey::parse(&raw) {
        Ok(key) => {
            assert!(!key.thread_id().is_empty());
            assert!(!key.thread_id().contains(':'));
            assert!(!key.as_str().chars().any(char::is_control));
            assert_eq!(
                format!("{}:{}", key.thread_id(), key.updated_at()),
                key.as_str()
            );
        }
        Err(error) => {
            assert!(!error.to_string().trim().is_empty());
        }
    }
});
