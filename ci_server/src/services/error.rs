//! Error kinds threaded back through the sync path.

use crate::store::StoreError;

/// Failure talking to the GitHub API.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// Non-2xx response.
    #[error("GitHub API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// No response at all (connect failure, timeout, reset).
    #[error("failed to reach GitHub API: {0}")]
    Transport(#[source] reqwest::Error),

    /// 2xx response whose body was not a workflow-runs payload.
    #[error("unexpected response from GitHub API: {0}")]
    Decode(String),
}

impl GitHubError {
    /// HTTP status reported by GitHub, or 0 when there was none.
    pub fn status_code(&self) -> u16 {
        match self {
            GitHubError::Status { status, .. } => *status,
            GitHubError::Transport(_) | GitHubError::Decode(_) => 0,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.status_code() != 0
    }
}

/// Failure of a single-repository sync.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("repository not found with id {0}")]
    RepositoryNotFound(i64),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Status code surfaced to a direct caller. 0 means unclassified.
    pub fn status_code(&self) -> u16 {
        match self {
            SyncError::RepositoryNotFound(_) => 400,
            SyncError::GitHub(e) => e.status_code(),
            SyncError::Store(_) => 0,
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::RepositoryNotFound(_) => "repository_not_found",
            SyncError::GitHub(e) if e.is_classified() => "github_status",
            SyncError::GitHub(_) => "github_unreachable",
            SyncError::Store(_) => "store",
        }
    }
}
