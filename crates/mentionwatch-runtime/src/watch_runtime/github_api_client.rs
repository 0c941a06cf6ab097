use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use mentionwatch_github::github_transport_helpers::{
    is_retryable_github_status, is_retryable_transport_error, parse_retry_after,
    truncate_for_error, RetryPolicy,
};
use mentionwatch_github::{reason_matches, CommentDetail, RawNotification};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{AgentIdentityResolver, CommentFetcher, NotificationSource, RepoRef, ThreadReadMarker};

const NOTIFICATIONS_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Deserialize)]
struct GithubUser {
    login: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GithubComment {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    user: Option<GithubUser>,
    html_url: String,
}

#[derive(Clone)]
/// GitHub REST client scoped to one repository's notification feed.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
    retry: RetryPolicy,
}

impl GithubApiClient {
    pub fn new(
        api_base: &str,
        token: &str,
        repo: RepoRef,
        request_timeout_ms: u64,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("mentionwatch"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
            retry,
        })
    }

    pub async fn viewer_login(&self) -> Result<String> {
        let viewer: GithubUser = self
            .request_json("resolve viewer login", || {
                self.http.get(format!("{}/user", self.api_base))
            })
            .await?;
        Ok(viewer.login)
    }

    /// Lists unread Issue/PullRequest notifications whose reason is in `reasons`.
    pub async fn list_unread_notifications(
        &self,
        reasons: &[String],
    ) -> Result<Vec<RawNotification>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let per_page = NOTIFICATIONS_PAGE_SIZE.to_string();
            let chunk: Vec<RawNotification> = self
                .request_json("list notifications", || {
                    self.http
                        .get(format!(
                            "{}/repos/{}/{}/notifications",
                            self.api_base, self.repo.owner, self.repo.name
                        ))
                        .query(&[
                            ("all", "false"),
                            ("per_page", per_page.as_str()),
                            ("page", page_value.as_str()),
                        ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk.into_iter().filter(|notification| {
                notification.unread
                    && notification.subject_kind().is_some()
                    && reason_matches(&notification.reason, reasons)
            }));
            if chunk_len < NOTIFICATIONS_PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub async fn get_comment(&self, comment_url: &str) -> Result<CommentDetail> {
        let comment: GithubComment = self
            .request_json("fetch comment", || self.http.get(comment_url))
            .await?;
        Ok(CommentDetail {
            body: comment.body.unwrap_or_default(),
            author: comment
                .user
                .map(|user| user.login)
                .unwrap_or_else(|| mentionwatch_github::UNKNOWN_AUTHOR.to_string()),
            permalink: comment.html_url,
        })
    }

    pub async fn patch_thread_read(&self, thread_id: &str) -> Result<()> {
        self.send_with_retry("mark thread read", || {
            self.http.patch(format!(
                "{}/notifications/threads/{}",
                self.api_base, thread_id
            ))
        })
        .await?;
        Ok(())
    }

    async fn request_json<T, F>(&self, operation: &str, request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let response = self.send_with_retry(operation, request_builder).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode github {operation}"))
    }

    async fn send_with_retry<F>(
        &self,
        operation: &str,
        mut request_builder: F,
    ) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match request_builder().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if self.retry.allows_retry_after(attempt)
                        && is_retryable_github_status(status.as_u16())
                    {
                        debug!(operation, attempt, status = status.as_u16(), "retrying github request");
                        tokio::time::sleep(self.retry.delay_for(attempt, retry_after)).await;
                        continue;
                    }

                    bail!(
                        "github api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if self.retry.allows_retry_after(attempt)
                        && is_retryable_transport_error(&error)
                    {
                        debug!(operation, attempt, %error, "retrying github request");
                        tokio::time::sleep(self.retry.delay_for(attempt, None)).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("github api {operation} request failed"));
                }
            }
        }
    }
}

#[async_trait]
impl NotificationSource for GithubApiClient {
    async fn fetch_unread(&self, reasons: &[String]) -> Result<Vec<RawNotification>> {
        self.list_unread_notifications(reasons).await
    }
}

#[async_trait]
impl CommentFetcher for GithubApiClient {
    async fn fetch_comment(&self, comment_ref: &str) -> Option<CommentDetail> {
        match self.get_comment(comment_ref).await {
            Ok(comment) => Some(comment),
            Err(error) => {
                debug!(comment_ref, error = %format!("{error:#}"), "comment fetch failed");
                None
            }
        }
    }
}

#[async_trait]
impl ThreadReadMarker for GithubApiClient {
    async fn mark_thread_read(&self, thread_id: &str) -> Result<()> {
        self.patch_thread_read(thread_id).await
    }
}

#[async_trait]
impl AgentIdentityResolver for GithubApiClient {
    async fn resolve_login(&self) -> Result<String> {
        self.viewer_login().await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use mentionwatch_github::github_transport_helpers::RetryPolicy;
    use serde_json::json;

    use super::GithubApiClient;
    use crate::watch_runtime::{CommentFetcher, RepoRef};

    fn client(base_url: &str) -> GithubApiClient {
        GithubApiClient::new(
            base_url,
            "test-token",
            RepoRef::parse("owner/repo").expect("repo"),
            2_000,
            RetryPolicy::new(3, 1),
        )
        .expect("client")
    }

    fn notification_json(id: &str, reason: &str, subject_type: &str) -> serde_json::Value {
        json!({
            "id": id,
            "unread": true,
            "reason": reason,
            "updated_at": "2026-02-01T11:30:00Z",
            "subject": {
                "title": "Title",
                "url": "https://api.github.com/repos/owner/repo/issues/42",
                "latest_comment_url": "https://api.github.com/repos/owner/repo/issues/comments/9",
                "type": subject_type
            },
            "repository": {"full_name": "owner/repo"}
        })
    }

    #[tokio::test]
    async fn functional_list_unread_notifications_filters_reason_and_subject_type() {
        let server = MockServer::start();
        let list = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/owner/repo/notifications")
                .query_param("all", "false")
                .query_param("page", "1")
                .header("authorization", "Bearer test-token");
            then.status(200).json_body(json!([
                notification_json("1", "mention", "Issue"),
                notification_json("2", "ci_activity", "PullRequest"),
                notification_json("3", "mention", "Release"),
                notification_json("4", "Mention", "PullRequest"),
            ]));
        });

        let rows = client(&server.base_url())
            .list_unread_notifications(&["mention".to_string()])
            .await
            .expect("list");
        list.assert_calls(1);
        let ids = rows.iter().map(|row| row.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[tokio::test]
    async fn integration_list_unread_notifications_retries_server_errors_then_fails() {
        let server = MockServer::start();
        let list = server.mock(|when, then| {
            when.method(GET).path("/repos/owner/repo/notifications");
            then.status(502).body("bad gateway");
        });

        let error = client(&server.base_url())
            .list_unread_notifications(&["mention".to_string()])
            .await
            .expect_err("should fail");
        list.assert_calls(3);
        assert!(error.to_string().contains("status 502"));
    }

    #[tokio::test]
    async fn functional_fetch_comment_maps_detail_and_swallows_failures() {
        let server = MockServer::start();
        let _comment = server.mock(|when, then| {
            when.method(GET).path("/repos/owner/repo/issues/comments/9");
            then.status(200).json_body(json!({
                "id": 9,
                "body": "@relaybot hello",
                "user": {"login": "alice"},
                "html_url": "https://github.com/owner/repo/issues/42#issuecomment-9"
            }));
        });
        let _missing = server.mock(|when, then| {
            when.method(GET).path("/repos/owner/repo/issues/comments/10");
            then.status(404).body("not found");
        });

        let client = client(&server.base_url());
        let detail = client
            .fetch_comment(&server.url("/repos/owner/repo/issues/comments/9"))
            .await
            .expect("comment");
        assert_eq!(detail.author, "alice");
        assert_eq!(detail.body, "@relaybot hello");
        assert_eq!(
            detail.permalink,
            "https://github.com/owner/repo/issues/42#issuecomment-9"
        );

        assert!(client
            .fetch_comment(&server.url("/repos/owner/repo/issues/comments/10"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn functional_patch_thread_read_and_viewer_login() {
        let server = MockServer::start();
        let patch = server.mock(|when, then| {
            when.method(PATCH).path("/notifications/threads/1001");
            then.status(205);
        });
        let user = server.mock(|when, then| {
            when.method(GET).path("/user");
            then.status(200).json_body(json!({"login": "relaybot"}));
        });

        let client = client(&server.base_url());
        client.patch_thread_read("1001").await.expect("mark read");
        assert_eq!(client.viewer_login().await.expect("login"), "relaybot");
        patch.assert_calls(1);
        user.assert_calls(1);
    }
}
