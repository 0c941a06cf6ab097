//! Boundary-safe `@login` detection.

/// Returns true when `body` contains `@agent` as a standalone mention.
///
/// Matching is case-insensitive. A mention is rejected when the `@` is glued
/// to an email-like local part (`foo@agent`) or when the login continues past
/// `agent` (`@agent-extra`, `@agent2`).
pub fn is_mentioned(body: &str, agent: &str) -> bool {
    let agent = agent.trim().trim_start_matches('@');
    if agent.is_empty() {
        return false;
    }
    let agent = agent.chars().collect::<Vec<_>>();
    let body = body.chars().collect::<Vec<_>>();

    for (index, ch) in body.iter().enumerate() {
        if *ch != '@' {
            continue;
        }
        if index > 0 && blocks_left_boundary(body[index - 1]) {
            continue;
        }
        let start = index + 1;
        let end = start + agent.len();
        if end > body.len() {
            break;
        }
        let login_matches = body[start..end]
            .iter()
            .zip(agent.iter())
            .all(|(left, right)| chars_eq_ignore_case(*left, *right));
        if !login_matches {
            continue;
        }
        if body.get(end).is_some_and(|next| blocks_right_boundary(*next)) {
            continue;
        }
        return true;
    }
    false
}

fn blocks_left_boundary(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '+' | '-')
}

fn blocks_right_boundary(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-'
}

fn chars_eq_ignore_case(left: char, right: char) -> bool {
    left == right || left.to_lowercase().eq(right.to_lowercase())
}
