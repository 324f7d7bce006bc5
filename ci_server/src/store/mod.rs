//! Persistence for repositories and builds.
//!
//! [`Store`] is the seam between the sync engine and the database. The
//! Postgres backend is used in production; the in-memory backend backs
//! `--memory` runs and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::build::{Build, BuildChanges, BuildStatus, NewBuild};
use crate::models::repository::{NewRepository, Repository};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("repository named {0:?} already exists")]
    DuplicateRepository(String),

    #[error("build for commit {0:?} already exists")]
    DuplicateBuild(String),

    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),

    #[error("connection pool: {0}")]
    Pool(#[from] diesel_async::pooled_connection::deadpool::PoolError),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_repository(&self, id: i64) -> Result<Option<Repository>>;

    /// All repositories, ordered by id.
    async fn list_repositories(&self) -> Result<Vec<Repository>>;

    async fn create_repository(&self, new_repository: NewRepository) -> Result<Repository>;

    async fn find_build_by_commit(&self, commit_sha: &str) -> Result<Option<Build>>;

    /// Insert a build unless one with the same commit SHA is already stored.
    ///
    /// Returns `None` when the row was not inserted. This is the final
    /// arbiter for concurrent syncs racing on the same commit.
    async fn insert_build(&self, new_build: NewBuild) -> Result<Option<Build>>;

    async fn get_build(&self, build_id: i64) -> Result<Option<Build>>;

    /// Most recent builds for a repository, newest id first.
    async fn list_builds(&self, repository_id: i64, limit: i64) -> Result<Vec<Build>>;

    /// Most recent builds across every repository, newest id first.
    async fn list_all_builds(&self, limit: i64) -> Result<Vec<Build>>;

    async fn list_builds_by_status(&self, status: BuildStatus, limit: i64) -> Result<Vec<Build>>;

    /// Returns `None` when no build has this id. Moving a build onto a
    /// commit SHA another build already holds fails with
    /// [`StoreError::DuplicateBuild`].
    async fn update_build(&self, build_id: i64, changes: BuildChanges) -> Result<Option<Build>>;

    /// Returns whether a row was removed.
    async fn delete_build(&self, build_id: i64) -> Result<bool>;
}
