use std::{
    io::Write,
    sync::{Arc, Mutex},
    time::Duration,
};

use httpmock::prelude::*;
use mentionwatch_github::github_transport_helpers::RetryPolicy;
use mentionwatch_runtime::{
    acknowledge, AckJournal, GithubApiClient, JsonlEventSink, MentionWatchConfig,
    MentionWatchRuntime, RepoRef, UpstreamMark, WatchPaths,
};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::sync::watch;

#[derive(Clone, Default)]
struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("output lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedOutput {
    fn events(&self) -> Vec<Value> {
        let raw = String::from_utf8(self.0.lock().expect("output lock").clone()).expect("utf8");
        raw.lines()
            .map(|line| serde_json::from_str(line).expect("event line"))
            .collect()
    }
}

fn client(base_url: &str, repo: &RepoRef) -> Arc<GithubApiClient> {
    Arc::new(
        GithubApiClient::new(base_url, "integration-token", repo.clone(), 2_000, RetryPolicy::new(1, 1))
            .expect("client"),
    )
}

fn watch_once(
    client: Arc<GithubApiClient>,
    paths: WatchPaths,
    repo: RepoRef,
    output: CapturedOutput,
) -> MentionWatchRuntime {
    MentionWatchRuntime::new(
        MentionWatchConfig {
            repo,
            agent_login: "relaybot".to_string(),
            reasons: vec!["mention".to_string()],
            poll_interval: Duration::from_secs(60),
            poll_once: true,
            paths,
        },
        client.clone(),
        client,
        JsonlEventSink::from_writer(output),
    )
}

#[tokio::test]
async fn integration_mention_is_emitted_acknowledged_and_not_redelivered() {
    let server = MockServer::start();
    let comment_url = format!("{}/repos/owner/repo/issues/comments/9", server.base_url());
    let list = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/owner/repo/notifications")
            .query_param("all", "false");
        then.status(200).json_body(json!([{
            "id": "1001",
            "unread": true,
            "reason": "mention",
            "updated_at": "2026-02-01T11:30:00Z",
            "subject": {
                "title": "Deploy is flaky",
                "url": "https://api.github.com/repos/owner/repo/issues/42",
                "latest_comment_url": comment_url,
                "type": "Issue"
            },
            "repository": {"full_name": "owner/repo"}
        }]));
    });
    let comment = server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/comments/9");
        then.status(200).json_body(json!({
            "id": 9,
            "body": "@relaybot can you retry the deploy?",
            "user": {"login": "alice"},
            "html_url": "https://github.com/owner/repo/issues/42#issuecomment-9"
        }));
    });
    let mark_read = server.mock(|when, then| {
        when.method(PATCH).path("/notifications/threads/1001");
        then.status(205);
    });

    let temp = tempdir().expect("tempdir");
    let repo = RepoRef::parse("owner/repo").expect("repo");
    let paths = WatchPaths::for_repo(temp.path(), &repo);
    let api = client(&server.base_url(), &repo);
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let first_output = CapturedOutput::default();
    watch_once(api.clone(), paths.clone(), repo.clone(), first_output.clone())
        .run(cancel_rx.clone())
        .await
        .expect("first watch cycle");
    let events = first_output.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event["agent"], "relaybot");
    assert_eq!(event["repo"], "owner/repo");
    assert_eq!(event["number"], 42);
    assert_eq!(event["type"], "Issue");
    assert_eq!(event["author"], "alice");
    assert_eq!(event["thread_id"], "1001");
    let key = event["key"].as_str().expect("key").to_string();
    assert_eq!(key, "1001:2026-02-01T11:30:00Z");
    mark_read.assert_calls(0);

    let outcome = acknowledge(&AckJournal::new(paths.journal_path.clone()), api.as_ref(), &key)
        .await
        .expect("ack");
    assert_eq!(outcome.upstream, UpstreamMark::Marked);
    mark_read.assert_calls(1);

    let second_output = CapturedOutput::default();
    let state = watch_once(api, paths, repo, second_output.clone())
        .run(cancel_rx)
        .await
        .expect("second watch cycle");
    assert!(second_output.events().is_empty());
    assert_eq!(state.processed_keys().len(), 1);
    list.assert_calls(2);
    comment.assert_calls(1);
}
