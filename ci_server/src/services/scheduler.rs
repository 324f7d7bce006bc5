//! Sweep orchestration — syncs every monitored repository on a fixed
//! interval or on demand.
//!
//! Each sweep owns its [`SweepReport`]; nothing is shared between sweeps
//! except the store, so a manual trigger can overlap a scheduled one.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::SchedulerConfig;
use crate::services::sync_service::SyncEngine;
use crate::store::StoreError;

/// What started a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Builds inserted across all successful repositories.
    pub total_synced: usize,
    /// Repositories that synced without error.
    pub succeeded: usize,
    /// Repositories whose sync failed.
    pub failed: usize,
    /// Stored repositories whose URL could not be split into owner/repo.
    pub skipped: usize,
}

impl SweepReport {
    pub fn summary(&self) -> String {
        format!(
            "Synced {} new builds: {} repositories succeeded, {} failed, {} skipped",
            self.total_synced, self.succeeded, self.failed, self.skipped
        )
    }
}

/// One repository to sync within a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub repository_id: i64,
    pub owner: String,
    pub repo: String,
}

/// Split a repository URL into `(owner, repo)`.
///
/// Strips a trailing `.git` and takes the last two non-empty path segments.
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let trimmed = url.strip_suffix(".git").unwrap_or(url);
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., owner, repo] => Some((owner.to_string(), repo.to_string())),
        _ => None,
    }
}

pub struct Scheduler {
    engine: Arc<SyncEngine>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(engine: Arc<SyncEngine>, config: SchedulerConfig) -> Self {
        Self { engine, config }
    }

    /// Configured descriptors if any, otherwise every stored repository.
    async fn resolve_targets(
        &self,
        report: &mut SweepReport,
    ) -> Result<Vec<SyncTarget>, StoreError> {
        if !self.config.repositories.is_empty() {
            let targets = self
                .config
                .repositories
                .iter()
                .filter(|m| {
                    if !m.enabled {
                        tracing::debug!(owner = %m.owner, repo = %m.repo, "Skipping disabled repository");
                    }
                    m.enabled
                })
                .map(|m| SyncTarget {
                    repository_id: m.id,
                    owner: m.owner.clone(),
                    repo: m.repo.clone(),
                })
                .collect();
            return Ok(targets);
        }

        let repositories = self.engine.store().list_repositories().await?;
        if repositories.is_empty() {
            tracing::warn!("No repositories found in database. Register repositories first.");
        }

        let mut targets = Vec::with_capacity(repositories.len());
        for repository in repositories {
            match parse_owner_repo(&repository.github_url) {
                Some((owner, repo)) => targets.push(SyncTarget {
                    repository_id: repository.id,
                    owner,
                    repo,
                }),
                None => {
                    report.skipped += 1;
                    tracing::warn!(
                        repository_id = repository.id,
                        url = %repository.github_url,
                        "Could not extract owner/repo from URL"
                    );
                }
            }
        }
        Ok(targets)
    }

    /// Run one full sweep. Per-repository failures are counted, never returned.
    ///
    /// Only a failure to list stored repositories aborts the sweep.
    pub async fn run_sweep(&self, trigger: Trigger) -> Result<SweepReport, StoreError> {
        let started = Instant::now();
        tracing::info!(trigger = trigger.as_str(), "Starting GitHub builds sync");

        let mut report = SweepReport::default();
        let targets = match self.resolve_targets(&mut report).await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(trigger = trigger.as_str(), "Could not resolve repositories: {e}");
                crate::metrics::sync_failed("store");
                return Err(e);
            }
        };

        for target in &targets {
            match self
                .engine
                .sync_repository(&target.owner, &target.repo, target.repository_id)
                .await
            {
                Ok(inserted) => {
                    report.total_synced += inserted;
                    report.succeeded += 1;
                    crate::metrics::repository_synced("success");
                }
                Err(e) => {
                    report.failed += 1;
                    crate::metrics::repository_synced("failure");
                    crate::metrics::sync_failed(e.kind());
                    tracing::error!(
                        owner = %target.owner,
                        repo = %target.repo,
                        repository_id = target.repository_id,
                        kind = e.kind(),
                        "Sync failed: {e}"
                    );
                }
            }
        }

        let elapsed = started.elapsed();
        crate::metrics::sweep_completed(trigger.as_str(), elapsed.as_millis() as u64);
        tracing::info!(
            trigger = trigger.as_str(),
            total_synced = report.total_synced,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            duration_ms = elapsed.as_millis() as u64,
            "GitHub builds sync completed"
        );
        Ok(report)
    }

    /// On-demand sweep. Blocks until every repository has been attempted.
    pub async fn trigger_manual(&self) -> Result<SweepReport, StoreError> {
        tracing::info!("Manual sync triggered");
        self.run_sweep(Trigger::Manual).await
    }

    /// Run sweeps on the configured interval until `shutdown` flips to true.
    ///
    /// The first sweep starts immediately. A sweep in progress always runs to
    /// completion, and ticks missed while it ran are skipped, so scheduled
    /// sweeps never overlap.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            configured = self.config.repositories.len(),
            "Sync scheduler started"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    // Errors are already logged inside the sweep.
                    let _ = self.run_sweep(Trigger::Scheduled).await;
                }
            }
        }

        tracing::info!("Sync scheduler stopped");
    }
}
