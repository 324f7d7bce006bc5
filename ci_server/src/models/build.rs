//! builds — One observed CI run, keyed by commit SHA.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::builds;

/// Internal build lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Cancelled,
}

impl BuildStatus {
    /// Column representation.
    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Pending => "PENDING",
            BuildStatus::InProgress => "IN_PROGRESS",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failed => "FAILED",
            BuildStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown build status: {0}")]
pub struct UnknownBuildStatus(pub String);

impl FromStr for BuildStatus {
    type Err = UnknownBuildStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BuildStatus::Pending),
            "IN_PROGRESS" => Ok(BuildStatus::InProgress),
            "SUCCESS" => Ok(BuildStatus::Success),
            "FAILED" => Ok(BuildStatus::Failed),
            "CANCELLED" => Ok(BuildStatus::Cancelled),
            other => Err(UnknownBuildStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize, PartialEq, Eq)]
#[diesel(table_name = builds)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: i64,
    pub repository_id: i64,
    pub status: String,
    pub commit_sha: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = builds)]
pub struct NewBuild {
    pub repository_id: i64,
    pub status: String,
    pub commit_sha: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NewBuild {
    pub fn new(
        repository_id: i64,
        commit_sha: impl Into<String>,
        status: BuildStatus,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            repository_id,
            status: status.as_str().to_string(),
            commit_sha: commit_sha.into(),
            started_at,
            completed_at,
        }
    }
}

/// Partial update of a stored build. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = builds)]
pub struct BuildChanges {
    pub status: Option<String>,
    pub commit_sha: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BuildChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.commit_sha.is_none()
            && self.started_at.is_none()
            && self.completed_at.is_none()
    }

    /// Apply the set fields to an in-memory row.
    pub fn apply(self, build: &mut Build) {
        if let Some(status) = self.status {
            build.status = status;
        }
        if let Some(commit_sha) = self.commit_sha {
            build.commit_sha = commit_sha;
        }
        if let Some(started_at) = self.started_at {
            build.started_at = Some(started_at);
        }
        if let Some(completed_at) = self.completed_at {
            build.completed_at = Some(completed_at);
        }
    }
}
