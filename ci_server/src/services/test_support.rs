//! Fakes shared by the sync engine and scheduler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::models::build::{Build, BuildChanges, BuildStatus, NewBuild};
use crate::models::github::WorkflowRun;
use crate::models::repository::{NewRepository, Repository};
use crate::services::error::GitHubError;
use crate::services::github_service::{RunQuery, RunSource};
use crate::store::{MemoryStore, Store, StoreError};

pub fn run(sha: &str, status: &str, conclusion: Option<&str>) -> WorkflowRun {
    WorkflowRun {
        id: 1,
        head_branch: Some("main".to_string()),
        head_sha: sha.to_string(),
        status: status.to_string(),
        conclusion: conclusion.map(str::to_string),
        run_number: Some(1),
        run_started_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
        updated_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 5, 0).unwrap()),
        html_url: None,
        repository: None,
        head_commit: None,
    }
}

enum Scripted {
    Runs(Vec<WorkflowRun>),
    Status(u16),
    Unreachable,
}

/// Run source answering from a fixed script keyed by `owner/repo`.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<(String, RunQuery)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runs(self, full_name: &str, runs: Vec<WorkflowRun>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(full_name.to_string(), Scripted::Runs(runs));
        self
    }

    pub fn with_status(self, full_name: &str, status: u16) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(full_name.to_string(), Scripted::Status(status));
        self
    }

    pub fn with_unreachable(self, full_name: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(full_name.to_string(), Scripted::Unreachable);
        self
    }

    /// `owner/repo` of every fetch, in call order.
    pub fn called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn queries(&self) -> Vec<RunQuery> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, q)| q.clone())
            .collect()
    }
}

#[async_trait]
impl RunSource for ScriptedSource {
    async fn fetch_runs(
        &self,
        owner: &str,
        repo: &str,
        query: &RunQuery,
    ) -> Result<Vec<WorkflowRun>, GitHubError> {
        let full_name = format!("{owner}/{repo}");
        self.calls
            .lock()
            .unwrap()
            .push((full_name.clone(), query.clone()));
        match self.script.lock().unwrap().get(&full_name) {
            Some(Scripted::Runs(runs)) => Ok(runs.clone()),
            Some(Scripted::Status(status)) => Err(GitHubError::Status {
                status: *status,
                message: "scripted failure".to_string(),
            }),
            Some(Scripted::Unreachable) => Err(GitHubError::Decode("scripted".to_string())),
            None => Ok(Vec::new()),
        }
    }
}

/// Memory store whose build inserts start failing after `allowed` successes.
pub struct FailingInsertStore {
    inner: MemoryStore,
    allowed: AtomicUsize,
}

impl FailingInsertStore {
    pub fn new(allowed: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            allowed: AtomicUsize::new(allowed),
        }
    }
}

#[async_trait]
impl Store for FailingInsertStore {
    async fn find_repository(&self, id: i64) -> crate::store::Result<Option<Repository>> {
        self.inner.find_repository(id).await
    }

    async fn list_repositories(&self) -> crate::store::Result<Vec<Repository>> {
        self.inner.list_repositories().await
    }

    async fn create_repository(&self, r: NewRepository) -> crate::store::Result<Repository> {
        self.inner.create_repository(r).await
    }

    async fn find_build_by_commit(&self, sha: &str) -> crate::store::Result<Option<Build>> {
        self.inner.find_build_by_commit(sha).await
    }

    async fn insert_build(&self, b: NewBuild) -> crate::store::Result<Option<Build>> {
        let remaining = self.allowed.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(StoreError::Diesel(diesel::result::Error::BrokenTransactionManager));
        }
        self.allowed.store(remaining - 1, Ordering::SeqCst);
        self.inner.insert_build(b).await
    }

    async fn get_build(&self, id: i64) -> crate::store::Result<Option<Build>> {
        self.inner.get_build(id).await
    }

    async fn list_builds(&self, repo: i64, limit: i64) -> crate::store::Result<Vec<Build>> {
        self.inner.list_builds(repo, limit).await
    }

    async fn list_all_builds(&self, limit: i64) -> crate::store::Result<Vec<Build>> {
        self.inner.list_all_builds(limit).await
    }

    async fn list_builds_by_status(
        &self,
        status: BuildStatus,
        limit: i64,
    ) -> crate::store::Result<Vec<Build>> {
        self.inner.list_builds_by_status(status, limit).await
    }

    async fn update_build(
        &self,
        id: i64,
        changes: BuildChanges,
    ) -> crate::store::Result<Option<Build>> {
        self.inner.update_build(id, changes).await
    }

    async fn delete_build(&self, id: i64) -> crate::store::Result<bool> {
        self.inner.delete_build(id).await
    }
}

pub async fn register(store: &dyn Store, name: &str, url: &str) -> Repository {
    store
        .create_repository(NewRepository {
            name: name.to_string(),
            github_url: url.to_string(),
        })
        .await
        .unwrap()
}
