//! Dashboard HTTP routes — sync triggers, GitHub pass-through, store queries.

pub mod api;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::models::build::Build;
use crate::models::github::BuildStatusView;
use crate::models::repository::{NewRepository, Repository};
use crate::services::github_service::RunQuery;
use crate::services::scheduler::Scheduler;
use crate::services::sync_service::SyncEngine;

use self::api::{
    ApiError, BuildPayload, CreateBuildQuery, LimitQuery, RunsQuery, SyncQuery, SyncRequest,
};

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppRouterState {
    pub engine: Arc<SyncEngine>,
    pub scheduler: Arc<Scheduler>,
}

/// Build the dashboard's Axum router.
pub fn app_router(state: AppRouterState, cors_allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    api_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
}

fn api_router(state: AppRouterState) -> Router {
    Router::new()
        // Sync
        .route("/api/scheduler/trigger-sync", post(trigger_sync))
        .route("/api/github/sync/{owner}/{repo}", post(sync_repository))
        // GitHub pass-through
        .route("/api/github/status/{owner}/{repo}", get(latest_status))
        .route(
            "/api/github/status/{owner}/{repo}/branch/{branch}",
            get(latest_status_for_branch),
        )
        .route("/api/github/runs/{owner}/{repo}", get(list_runs))
        .route(
            "/api/github/runs/{owner}/{repo}/status/{status}",
            get(list_runs_by_status),
        )
        // Store
        .route(
            "/api/repositories",
            get(list_repositories).post(create_repository),
        )
        .route("/api/repositories/{id}", get(get_repository))
        .route("/api/repositories/{id}/builds", get(list_builds))
        // Builds
        .route("/api/builds", get(list_all_builds).post(create_build))
        .route("/api/builds/sync", post(sync_builds))
        .route("/api/builds/repository/{id}", get(list_builds))
        .route("/api/builds/status/{status}", get(list_builds_by_status))
        .route(
            "/api/builds/{id}",
            get(get_build).put(update_build).delete(delete_build),
        )
        .with_state(state)
}

// ── Sync ──

async fn trigger_sync(
    State(state): State<AppRouterState>,
) -> (StatusCode, Json<api::TriggerResponse>) {
    tracing::info!("Manual sync triggered via API");
    let (status, body) = api::trigger_sync(&state.scheduler).await;
    (status, Json(body))
}

async fn sync_repository(
    State(state): State<AppRouterState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<SyncQuery>,
) -> Result<Json<api::SyncResponse>, ApiError> {
    api::sync_repository(&state.engine, &owner, &repo, query.repository_id)
        .await
        .map(Json)
}

async fn sync_builds(
    State(state): State<AppRouterState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<api::SyncResponse>, ApiError> {
    api::sync_builds(&state.engine, request).await.map(Json)
}

// ── GitHub pass-through ──

async fn latest_status(
    State(state): State<AppRouterState>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<BuildStatusView>, ApiError> {
    api::latest_status(state.engine.source().as_ref(), &owner, &repo, None)
        .await
        .map(Json)
}

async fn latest_status_for_branch(
    State(state): State<AppRouterState>,
    Path((owner, repo, branch)): Path<(String, String, String)>,
) -> Result<Json<BuildStatusView>, ApiError> {
    api::latest_status(state.engine.source().as_ref(), &owner, &repo, Some(&branch))
        .await
        .map(Json)
}

async fn list_runs(
    State(state): State<AppRouterState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<BuildStatusView>>, ApiError> {
    let run_query = RunQuery::recent(query.per_page());
    api::list_runs(state.engine.source().as_ref(), &owner, &repo, run_query)
        .await
        .map(Json)
}

async fn list_runs_by_status(
    State(state): State<AppRouterState>,
    Path((owner, repo, status)): Path<(String, String, String)>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<BuildStatusView>>, ApiError> {
    let run_query = RunQuery::recent(query.per_page()).with_status(status);
    api::list_runs(state.engine.source().as_ref(), &owner, &repo, run_query)
        .await
        .map(Json)
}

// ── Store ──

async fn list_repositories(
    State(state): State<AppRouterState>,
) -> Result<Json<Vec<Repository>>, ApiError> {
    let repositories = state.engine.store().list_repositories().await?;
    Ok(Json(repositories))
}

async fn create_repository(
    State(state): State<AppRouterState>,
    Json(new_repository): Json<NewRepository>,
) -> Result<(StatusCode, Json<Repository>), ApiError> {
    api::create_repository(state.engine.store().as_ref(), new_repository)
        .await
        .map(|r| (StatusCode::CREATED, Json(r)))
}

async fn get_repository(
    State(state): State<AppRouterState>,
    Path(id): Path<i64>,
) -> Result<Json<Repository>, ApiError> {
    api::get_repository(state.engine.store().as_ref(), id)
        .await
        .map(Json)
}

async fn list_builds(
    State(state): State<AppRouterState>,
    Path(id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Build>>, ApiError> {
    api::list_builds(state.engine.store().as_ref(), id, query.limit(20))
        .await
        .map(Json)
}

async fn list_all_builds(
    State(state): State<AppRouterState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Build>>, ApiError> {
    let builds = state
        .engine
        .store()
        .list_all_builds(query.limit(100))
        .await?;
    Ok(Json(builds))
}

async fn list_builds_by_status(
    State(state): State<AppRouterState>,
    Path(status): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Build>>, ApiError> {
    api::list_builds_by_status(state.engine.store().as_ref(), &status, query.limit(100))
        .await
        .map(Json)
}

async fn create_build(
    State(state): State<AppRouterState>,
    Query(query): Query<CreateBuildQuery>,
    Json(payload): Json<BuildPayload>,
) -> Result<(StatusCode, Json<Build>), ApiError> {
    api::create_build(state.engine.store().as_ref(), query.repository_id, payload)
        .await
        .map(|b| (StatusCode::CREATED, Json(b)))
}

async fn update_build(
    State(state): State<AppRouterState>,
    Path(id): Path<i64>,
    Json(payload): Json<BuildPayload>,
) -> Result<Json<Build>, ApiError> {
    api::update_build(state.engine.store().as_ref(), id, payload)
        .await
        .map(Json)
}

async fn delete_build(
    State(state): State<AppRouterState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    api::delete_build(state.engine.store().as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_build(
    State(state): State<AppRouterState>,
    Path(id): Path<i64>,
) -> Result<Json<Build>, ApiError> {
    api::get_build(state.engine.store().as_ref(), id)
        .await
        .map(Json)
}
