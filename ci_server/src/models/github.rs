//! GitHub Actions workflow-run payloads and the build-status view built from them.
//!
//! Only the fields the dashboard reads are declared; serde skips the rest,
//! so new fields on the GitHub side never break parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::build::BuildStatus;
use crate::services::status_mapper::map_status;

/// Body of `GET /repos/{owner}/{repo}/actions/runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunsResponse {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: i64,
    #[serde(default)]
    pub head_branch: Option<String>,
    pub head_sha: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub run_number: Option<i64>,
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub repository: Option<RunRepository>,
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
}

impl WorkflowRun {
    /// Internal status for this run's raw status/conclusion pair.
    pub fn build_status(&self) -> BuildStatus {
        map_status(&self.status, self.conclusion.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunRepository {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

/// Flattened run as served by the pass-through API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatusView {
    pub run_id: i64,
    pub repository_name: Option<String>,
    pub branch: Option<String>,
    pub commit_sha: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub run_number: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub html_url: Option<String>,
    pub commit_message: Option<String>,
    pub author_name: Option<String>,
    pub build_status: BuildStatus,
}

impl From<&WorkflowRun> for BuildStatusView {
    fn from(run: &WorkflowRun) -> Self {
        let commit = run.head_commit.as_ref();
        Self {
            run_id: run.id,
            repository_name: run
                .repository
                .as_ref()
                .and_then(|r| r.name.clone().or_else(|| r.full_name.clone())),
            branch: run.head_branch.clone(),
            commit_sha: run.head_sha.clone(),
            status: run.status.clone(),
            conclusion: run.conclusion.clone(),
            run_number: run.run_number,
            started_at: run.run_started_at,
            updated_at: run.updated_at,
            html_url: run.html_url.clone(),
            commit_message: commit.and_then(|c| c.message.clone()),
            author_name: commit
                .and_then(|c| c.author.as_ref())
                .and_then(|a| a.name.clone()),
            build_status: run.build_status(),
        }
    }
}
