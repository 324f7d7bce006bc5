//! GitHub Actions API client — workflow-run listing with filters.
//!
//! The client never retries. Failures come back as [`GitHubError`] with the
//! HTTP status preserved when GitHub answered, and 0 when it did not.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::GitHubConfig;
use crate::models::github::{WorkflowRun, WorkflowRunsResponse};
use crate::services::error::GitHubError;

/// GitHub's hard cap on `per_page`.
pub const MAX_PER_PAGE: u32 = 100;

/// Optional filters for a workflow-run listing.
///
/// Branch and status are passed through untouched; GitHub owns their
/// vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunQuery {
    pub branch: Option<String>,
    pub status: Option<String>,
    pub per_page: Option<u32>,
}

impl RunQuery {
    pub fn recent(per_page: u32) -> Self {
        Self {
            per_page: Some(per_page),
            ..Self::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Query-string pairs, with `per_page` clamped to [`MAX_PER_PAGE`].
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(branch) = self.branch.as_deref().filter(|b| !b.is_empty()) {
            pairs.push(("branch", branch.to_string()));
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("status", status.to_string()));
        }
        if let Some(per_page) = self.per_page.filter(|n| *n > 0) {
            pairs.push(("per_page", per_page.min(MAX_PER_PAGE).to_string()));
        }
        pairs
    }
}

/// Anything that can list workflow runs for a repository, newest first.
#[async_trait]
pub trait RunSource: Send + Sync {
    async fn fetch_runs(
        &self,
        owner: &str,
        repo: &str,
        query: &RunQuery,
    ) -> Result<Vec<WorkflowRun>, GitHubError>;
}

#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("cicd-dashboard")
            .build()
            .map_err(GitHubError::Transport)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn runs_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}/actions/runs", self.base_url)
    }
}

#[async_trait]
impl RunSource for GitHubClient {
    async fn fetch_runs(
        &self,
        owner: &str,
        repo: &str,
        query: &RunQuery,
    ) -> Result<Vec<WorkflowRun>, GitHubError> {
        let url = self.runs_url(owner, repo);
        tracing::debug!(%url, ?query, "Fetching workflow runs from GitHub API");

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&query.query_pairs());
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                crate::metrics::github_request("error");
                tracing::error!(owner, repo, "Error calling GitHub API: {e}");
                return Err(GitHubError::Transport(e));
            }
        };

        let status = resp.status();
        crate::metrics::github_request(status.as_str());

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(owner, repo, status = status.as_u16(), "GitHub API error: {text}");
            return Err(GitHubError::Status {
                status: status.as_u16(),
                message: failure_message(status, &text),
            });
        }

        let body = resp.bytes().await.map_err(GitHubError::Transport)?;
        let parsed: WorkflowRunsResponse =
            serde_json::from_slice(&body).map_err(|e| GitHubError::Decode(e.to_string()))?;

        tracing::debug!(
            owner,
            repo,
            total_count = parsed.total_count,
            fetched = parsed.workflow_runs.len(),
            "Fetched workflow runs"
        );
        Ok(parsed.workflow_runs)
    }
}

/// Human-readable message for a non-2xx response. Prefers GitHub's own
/// `message` field when the body is JSON.
fn failure_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    format!("Failed to fetch workflow runs: {detail}")
}

/// Newest run for a repository (optionally on one branch), if any.
pub async fn latest_run(
    source: &dyn RunSource,
    owner: &str,
    repo: &str,
    branch: Option<&str>,
) -> Result<Option<WorkflowRun>, GitHubError> {
    let mut query = RunQuery::recent(1);
    if let Some(branch) = branch {
        query = query.with_branch(branch);
    }
    let runs = source.fetch_runs(owner, repo, &query).await?;
    Ok(runs.into_iter().next())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(base_url: &str, timeout: Duration) -> GitHubClient {
        GitHubClient::new(&GitHubConfig {
            base_url: base_url.to_string(),
            token: "test-token".to_string(),
            timeout,
        })
        .unwrap()
    }

    fn run_json(id: i64, sha: &str, status: &str, conclusion: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "head_branch": "main",
            "head_sha": sha,
            "status": status,
            "conclusion": conclusion,
            "run_number": id,
            "run_started_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:05:00Z",
            "html_url": format!("https://github.com/acme/widgets/actions/runs/{id}"),
            "head_commit": {"message": "msg", "author": {"name": "Sam"}}
        })
    }

    #[test]
    fn per_page_is_clamped() {
        let pairs = RunQuery::recent(500).query_pairs();
        assert_eq!(pairs, vec![("per_page", "100".to_string())]);
    }

    #[test]
    fn empty_filters_are_dropped() {
        let query = RunQuery {
            branch: Some(String::new()),
            status: None,
            per_page: Some(0),
        };
        assert!(query.query_pairs().is_empty());
    }

    #[test]
    fn filters_pass_through_unvalidated() {
        let pairs = RunQuery::recent(10)
            .with_branch("feature/x")
            .with_status("action_required")
            .query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("branch", "feature/x".to_string()),
                ("status", "action_required".to_string()),
                ("per_page", "10".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn sends_clamped_page_size_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/actions/runs"))
            .and(query_param("per_page", "100"))
            .and(query_param_is_missing("branch"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 2,
                "workflow_runs": [
                    run_json(2, "bbb", "in_progress", None),
                    run_json(1, "aaa", "completed", Some("success")),
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let runs = client
            .fetch_runs("acme", "widgets", &RunQuery::recent(500))
            .await
            .unwrap();

        let shas: Vec<_> = runs.iter().map(|r| r.head_sha.as_str()).collect();
        assert_eq!(shas, ["bbb", "aaa"]);
    }

    #[tokio::test]
    async fn empty_run_list_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/empty/actions/runs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"total_count": 0, "workflow_runs": []})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let runs = client
            .fetch_runs("acme", "empty", &RunQuery::default())
            .await
            .unwrap();
        assert!(runs.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let err = client
            .fetch_runs("acme", "missing", &RunQuery::default())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 404);
        assert!(err.to_string().contains("Not Found"));
    }

    #[tokio::test]
    async fn malformed_body_is_unclassified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let err = client
            .fetch_runs("acme", "widgets", &RunQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::Decode(_)));
        assert_eq!(err.status_code(), 0);
    }

    #[tokio::test]
    async fn unresponsive_endpoint_times_out_unclassified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_json(json!({"total_count": 0, "workflow_runs": []})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_millis(100));
        let err = client
            .fetch_runs("acme", "slow", &RunQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::Transport(_)));
        assert_eq!(err.status_code(), 0);
    }

    #[tokio::test]
    async fn connection_refused_is_unclassified() {
        let client = client_for("http://127.0.0.1:1", Duration::from_secs(2));
        let err = client
            .fetch_runs("acme", "widgets", &RunQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::Transport(_)));
    }

    #[tokio::test]
    async fn latest_run_requests_one_run_on_branch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("per_page", "1"))
            .and(query_param("branch", "develop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "workflow_runs": [run_json(9, "ccc", "queued", None)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let run = latest_run(&client, "acme", "widgets", Some("develop"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.head_sha, "ccc");
    }
}
