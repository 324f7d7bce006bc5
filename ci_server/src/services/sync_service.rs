//! Pulls workflow runs for one repository and records unseen commits as builds.
//!
//! A commit SHA is recorded at most once. Existing builds are never updated
//! by a sync, even if GitHub now reports a different status for the run.

use std::sync::Arc;

use crate::models::build::NewBuild;
use crate::services::error::SyncError;
use crate::services::github_service::{RunQuery, RunSource};
use crate::store::Store;

/// How many of the newest runs a sync looks at.
pub const SYNC_PAGE_SIZE: u32 = 50;

pub struct SyncEngine {
    store: Arc<dyn Store>,
    source: Arc<dyn RunSource>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn Store>, source: Arc<dyn RunSource>) -> Self {
        Self { store, source }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn source(&self) -> &Arc<dyn RunSource> {
        &self.source
    }

    /// Sync one repository. Returns the number of builds actually inserted.
    ///
    /// On error, builds inserted before the failure stay persisted but are
    /// not reported.
    pub async fn sync_repository(
        &self,
        owner: &str,
        repo: &str,
        repository_id: i64,
    ) -> Result<usize, SyncError> {
        let repository = self
            .store
            .find_repository(repository_id)
            .await?
            .ok_or(SyncError::RepositoryNotFound(repository_id))?;

        tracing::info!(owner, repo, repository_id, "Syncing workflow runs to database");

        let runs = self
            .source
            .fetch_runs(owner, repo, &RunQuery::recent(SYNC_PAGE_SIZE))
            .await?;

        let mut inserted = 0usize;
        for run in &runs {
            let existing = self
                .store
                .find_build_by_commit(&run.head_sha)
                .await
                .inspect_err(|_| record_partial(owner, repo, inserted))?;
            if existing.is_some() {
                continue;
            }

            let new_build = NewBuild::new(
                repository.id,
                run.head_sha.as_str(),
                run.build_status(),
                run.run_started_at,
                run.updated_at,
            );

            match self.store.insert_build(new_build).await {
                Ok(Some(build)) => {
                    inserted += 1;
                    tracing::debug!(
                        build_id = build.id,
                        commit_sha = %build.commit_sha,
                        status = %build.status,
                        "Build recorded"
                    );
                }
                // Another sync recorded the same commit between our lookup and insert.
                Ok(None) => {
                    tracing::debug!(commit_sha = %run.head_sha, "Build already recorded");
                }
                Err(e) => {
                    record_partial(owner, repo, inserted);
                    return Err(e.into());
                }
            }
        }

        crate::metrics::builds_synced(inserted);
        tracing::info!(owner, repo, repository_id, inserted, "Synced new builds to database");
        Ok(inserted)
    }
}

fn record_partial(owner: &str, repo: &str, inserted: usize) {
    crate::metrics::builds_synced(inserted);
    if inserted > 0 {
        tracing::warn!(
            owner,
            repo,
            inserted,
            "Sync aborted after recording some builds"
        );
    }
}
