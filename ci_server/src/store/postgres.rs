//! Postgres store via diesel-async and a deadpool connection pool.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::{Result, Store, StoreError};
use crate::models::build::{Build, BuildChanges, BuildStatus, NewBuild};
use crate::models::repository::{NewRepository, Repository};
use crate::schema::{builds, repositories};

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn connect(database_url: &str, max_connections: usize) -> anyhow::Result<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(max_connections)
            .build()
            .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))?;
        Ok(Self { pool })
    }

    /// Apply the dashboard DDL.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))?;
        crate::migration::run_migration(&mut conn).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_repository(&self, id: i64) -> Result<Option<Repository>> {
        let mut conn = self.pool.get().await?;
        let result = repositories::table
            .find(id)
            .select(Repository::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        let mut conn = self.pool.get().await?;
        let results = repositories::table
            .order(repositories::id.asc())
            .select(Repository::as_select())
            .load(&mut conn)
            .await?;
        Ok(results)
    }

    async fn create_repository(&self, new_repository: NewRepository) -> Result<Repository> {
        let mut conn = self.pool.get().await?;
        let name = new_repository.name.clone();
        let result = diesel::insert_into(repositories::table)
            .values(&new_repository)
            .returning(Repository::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::DuplicateRepository(name)
                }
                other => StoreError::Diesel(other),
            })?;

        tracing::info!(
            repository_id = result.id,
            name = %result.name,
            "Repository registered"
        );
        Ok(result)
    }

    async fn find_build_by_commit(&self, commit_sha: &str) -> Result<Option<Build>> {
        let mut conn = self.pool.get().await?;
        let result = builds::table
            .filter(builds::commit_sha.eq(commit_sha))
            .select(Build::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_build(&self, new_build: NewBuild) -> Result<Option<Build>> {
        let mut conn = self.pool.get().await?;
        // DO NOTHING returns zero rows on conflict, which `optional` turns into None.
        let result = diesel::insert_into(builds::table)
            .values(&new_build)
            .on_conflict(builds::commit_sha)
            .do_nothing()
            .returning(Build::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn get_build(&self, build_id: i64) -> Result<Option<Build>> {
        let mut conn = self.pool.get().await?;
        let result = builds::table
            .find(build_id)
            .select(Build::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn list_builds(&self, repository_id: i64, limit: i64) -> Result<Vec<Build>> {
        let mut conn = self.pool.get().await?;
        let results = builds::table
            .filter(builds::repository_id.eq(repository_id))
            .order(builds::id.desc())
            .limit(limit)
            .select(Build::as_select())
            .load(&mut conn)
            .await?;
        Ok(results)
    }

    async fn list_all_builds(&self, limit: i64) -> Result<Vec<Build>> {
        let mut conn = self.pool.get().await?;
        let results = builds::table
            .order(builds::id.desc())
            .limit(limit)
            .select(Build::as_select())
            .load(&mut conn)
            .await?;
        Ok(results)
    }

    async fn list_builds_by_status(&self, status: BuildStatus, limit: i64) -> Result<Vec<Build>> {
        let mut conn = self.pool.get().await?;
        let results = builds::table
            .filter(builds::status.eq(status.as_str()))
            .order(builds::id.desc())
            .limit(limit)
            .select(Build::as_select())
            .load(&mut conn)
            .await?;
        Ok(results)
    }

    async fn update_build(&self, build_id: i64, changes: BuildChanges) -> Result<Option<Build>> {
        // diesel rejects an UPDATE with an empty SET list.
        if changes.is_empty() {
            return self.get_build(build_id).await;
        }

        let mut conn = self.pool.get().await?;
        let commit_sha = changes.commit_sha.clone().unwrap_or_default();
        let result = diesel::update(builds::table.find(build_id))
            .set(&changes)
            .returning(Build::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::DuplicateBuild(commit_sha)
                }
                other => StoreError::Diesel(other),
            })?;
        Ok(result)
    }

    async fn delete_build(&self, build_id: i64) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let deleted = diesel::delete(builds::table.find(build_id))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }
}
