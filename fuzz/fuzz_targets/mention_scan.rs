#![no_main]

use libfuzzer_sys::fuzz_target;
use mentionwatch_github::is_mentioned;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let (body, agent) = raw.split_once('\n').unwrap_or((raw.as_ref(), "relaybot"));
    let mentioned = is_mentioned(body, agent);
    if mentioned {
        assert!(body.contains('@'));
    }
    let _ = is_mentioned(agent, body);
});
