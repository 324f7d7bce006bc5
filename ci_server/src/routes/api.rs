//! REST API payloads and the logic behind each endpoint.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::models::build::{Build, BuildChanges, BuildStatus, NewBuild, UnknownBuildStatus};
use crate::models::github::BuildStatusView;
use crate::models::repository::{NewRepository, Repository};
use crate::services::error::{GitHubError, SyncError};
use crate::services::github_service::{self, RunQuery, RunSource};
use crate::services::scheduler::{Scheduler, SweepReport};
use crate::services::sync_service::SyncEngine;
use crate::store::{Store, StoreError};

/// Map an error's status code to an HTTP status. 0 means unclassified.
pub fn boundary_status(code: u16) -> StatusCode {
    if code == 0 {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Error body shared by every endpoint.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        Self::new(boundary_status(e.status_code()), e.to_string())
    }
}

impl From<GitHubError> for ApiError {
    fn from(e: GitHubError) -> Self {
        Self::new(boundary_status(e.status_code()), e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateRepository(_) | StoreError::DuplicateBuild(_) => {
                Self::new(StatusCode::CONFLICT, e.to_string())
            }
            other => {
                tracing::error!("Store error: {other}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal store error")
            }
        }
    }
}

impl From<UnknownBuildStatus> for ApiError {
    fn from(e: UnknownBuildStatus) -> Self {
        Self::new(StatusCode::BAD_REQUEST, e.to_string())
    }
}

/// Status names are accepted in any case.
fn parse_status(raw: &str) -> Result<BuildStatus, UnknownBuildStatus> {
    raw.to_uppercase().parse()
}

// ── Sync API ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQuery {
    pub repository_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub synced_count: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
}

/// Sync one repository on behalf of a caller; failures keep their status code.
pub async fn sync_repository(
    engine: &SyncEngine,
    owner: &str,
    repo: &str,
    repository_id: i64,
) -> Result<SyncResponse, ApiError> {
    let synced_count = engine.sync_repository(owner, repo, repository_id).await?;
    Ok(SyncResponse {
        success: true,
        synced_count,
        message: format!("Synced {synced_count} builds to database"),
        repository_name: None,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub owner: String,
    pub repo: String,
    pub repository_id: i64,
}

/// Body-driven variant of [`sync_repository`] that also names the stored repository.
pub async fn sync_builds(
    engine: &SyncEngine,
    request: SyncRequest,
) -> Result<SyncResponse, ApiError> {
    if request.owner.trim().is_empty() || request.repo.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "owner and repo are required"));
    }

    let synced_count = engine
        .sync_repository(&request.owner, &request.repo, request.repository_id)
        .await?;
    let repository_name = engine
        .store()
        .find_repository(request.repository_id)
        .await?
        .map(|r| r.name);
    Ok(SyncResponse {
        success: true,
        synced_count,
        message: format!("Successfully synced {synced_count} builds from GitHub"),
        repository_name,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub report: Option<SweepReport>,
}

/// Run a full sweep and describe the result.
pub async fn trigger_sync(scheduler: &Scheduler) -> (StatusCode, TriggerResponse) {
    match scheduler.trigger_manual().await {
        Ok(report) => (
            StatusCode::OK,
            TriggerResponse {
                status: "success",
                message: report.summary(),
                report: Some(report),
            },
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            TriggerResponse {
                status: "error",
                message: format!("Failed to trigger sync: {e}"),
                report: None,
            },
        ),
    }
}

// ── GitHub pass-through API ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunsQuery {
    pub per_page: Option<u32>,
}

impl RunsQuery {
    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(10)
    }
}

pub async fn latest_status(
    source: &dyn RunSource,
    owner: &str,
    repo: &str,
    branch: Option<&str>,
) -> Result<BuildStatusView, ApiError> {
    let run = github_service::latest_run(source, owner, repo, branch).await?;
    match run {
        Some(run) => Ok(BuildStatusView::from(&run)),
        None => {
            tracing::warn!(owner, repo, branch, "No workflow runs found");
            Err(ApiError::new(
                StatusCode::NOT_FOUND,
                "No workflow runs found for repository",
            ))
        }
    }
}

pub async fn list_runs(
    source: &dyn RunSource,
    owner: &str,
    repo: &str,
    query: RunQuery,
) -> Result<Vec<BuildStatusView>, ApiError> {
    let runs = source.fetch_runs(owner, repo, &query).await?;
    Ok(runs.iter().map(BuildStatusView::from).collect())
}

// ── Repository / build API ──

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    /// Requested page size, bounded to 1..=500.
    pub fn limit(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, 500)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBuildQuery {
    pub repository_id: i64,
}

/// Build fields accepted by create and update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPayload {
    pub status: Option<String>,
    pub commit_sha: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub async fn create_repository(
    store: &dyn Store,
    new_repository: NewRepository,
) -> Result<Repository, ApiError> {
    if new_repository.name.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "name is required"));
    }
    if new_repository.github_url.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "githubUrl is required"));
    }
    Ok(store.create_repository(new_repository).await?)
}

pub async fn get_repository(store: &dyn Store, id: i64) -> Result<Repository, ApiError> {
    store
        .find_repository(id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("repository {id} not found")))
}

pub async fn list_builds(
    store: &dyn Store,
    repository_id: i64,
    limit: i64,
) -> Result<Vec<Build>, ApiError> {
    get_repository(store, repository_id).await?;
    Ok(store.list_builds(repository_id, limit).await?)
}

pub async fn list_builds_by_status(
    store: &dyn Store,
    raw_status: &str,
    limit: i64,
) -> Result<Vec<Build>, ApiError> {
    let status = parse_status(raw_status).inspect_err(|e| tracing::warn!("{e}"))?;
    Ok(store.list_builds_by_status(status, limit).await?)
}

/// Record a build by hand. The status defaults to `PENDING` and the start
/// time to now.
pub async fn create_build(
    store: &dyn Store,
    repository_id: i64,
    payload: BuildPayload,
) -> Result<Build, ApiError> {
    if store.find_repository(repository_id).await?.is_none() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("repository {repository_id} not found"),
        ));
    }
    let commit_sha = match payload.commit_sha {
        Some(sha) if !sha.trim().is_empty() => sha,
        _ => return Err(ApiError::new(StatusCode::BAD_REQUEST, "commitSha is required")),
    };
    let status = match payload.status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => BuildStatus::Pending,
    };

    let new_build = NewBuild::new(
        repository_id,
        commit_sha.as_str(),
        status,
        Some(payload.started_at.unwrap_or_else(Utc::now)),
        payload.completed_at,
    );
    match store.insert_build(new_build).await? {
        Some(build) => {
            tracing::info!(build_id = build.id, repository_id, "Build created");
            Ok(build)
        }
        None => Err(StoreError::DuplicateBuild(commit_sha).into()),
    }
}

pub async fn update_build(
    store: &dyn Store,
    build_id: i64,
    payload: BuildPayload,
) -> Result<Build, ApiError> {
    let status = payload.status.as_deref().map(parse_status).transpose()?;
    let changes = BuildChanges {
        status: status.map(|s| s.as_str().to_string()),
        commit_sha: payload.commit_sha.filter(|sha| !sha.trim().is_empty()),
        started_at: payload.started_at,
        completed_at: payload.completed_at,
    };
    store
        .update_build(build_id, changes)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("build {build_id} not found")))
}

pub async fn delete_build(store: &dyn Store, build_id: i64) -> Result<(), ApiError> {
    if store.delete_build(build_id).await? {
        tracing::info!(build_id, "Build deleted");
        Ok(())
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("build {build_id} not found"),
        ))
    }
}

pub async fn get_build(store: &dyn Store, build_id: i64) -> Result<Build, ApiError> {
    store
        .get_build(build_id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("build {build_id} not found")))
}
