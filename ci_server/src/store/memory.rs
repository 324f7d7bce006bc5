//! In-memory store. Every operation runs under one lock, so the commit-SHA
//! check and the insert are atomic with respect to each other.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{Result, Store, StoreError};
use crate::models::build::{Build, BuildChanges, BuildStatus, NewBuild};
use crate::models::repository::{NewRepository, Repository};

#[derive(Default)]
struct Inner {
    repositories: BTreeMap<i64, Repository>,
    builds: BTreeMap<i64, Build>,
    next_repository_id: i64,
    next_build_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_repository(&self, id: i64) -> Result<Option<Repository>> {
        Ok(self.inner.lock().await.repositories.get(&id).cloned())
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        Ok(self.inner.lock().await.repositories.values().cloned().collect())
    }

    async fn create_repository(&self, new_repository: NewRepository) -> Result<Repository> {
        let mut inner = self.inner.lock().await;
        if inner
            .repositories
            .values()
            .any(|r| r.name == new_repository.name)
        {
            return Err(StoreError::DuplicateRepository(new_repository.name));
        }

        inner.next_repository_id += 1;
        let repository = Repository {
            id: inner.next_repository_id,
            name: new_repository.name,
            github_url: new_repository.github_url,
            created_at: Utc::now(),
        };
        inner.repositories.insert(repository.id, repository.clone());
        Ok(repository)
    }

    async fn find_build_by_commit(&self, commit_sha: &str) -> Result<Option<Build>> {
        Ok(self
            .inner
            .lock()
            .await
            .builds
            .values()
            .find(|b| b.commit_sha == commit_sha)
            .cloned())
    }

    async fn insert_build(&self, new_build: NewBuild) -> Result<Option<Build>> {
        let mut inner = self.inner.lock().await;
        if inner
            .builds
            .values()
            .any(|b| b.commit_sha == new_build.commit_sha)
        {
            return Ok(None);
        }

        inner.next_build_id += 1;
        let build = Build {
            id: inner.next_build_id,
            repository_id: new_build.repository_id,
            status: new_build.status,
            commit_sha: new_build.commit_sha,
            started_at: new_build.started_at,
            completed_at: new_build.completed_at,
        };
        inner.builds.insert(build.id, build.clone());
        Ok(Some(build))
    }

    async fn get_build(&self, build_id: i64) -> Result<Option<Build>> {
        Ok(self.inner.lock().await.builds.get(&build_id).cloned())
    }

    async fn list_builds(&self, repository_id: i64, limit: i64) -> Result<Vec<Build>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .inner
            .lock()
            .await
            .builds
            .values()
            .rev()
            .filter(|b| b.repository_id == repository_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_all_builds(&self, limit: i64) -> Result<Vec<Build>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .inner
            .lock()
            .await
            .builds
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_builds_by_status(&self, status: BuildStatus, limit: i64) -> Result<Vec<Build>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .inner
            .lock()
            .await
            .builds
            .values()
            .rev()
            .filter(|b| b.status == status.as_str())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_build(&self, build_id: i64, changes: BuildChanges) -> Result<Option<Build>> {
        let mut inner = self.inner.lock().await;
        if let Some(sha) = &changes.commit_sha {
            if inner
                .builds
                .values()
                .any(|b| b.id != build_id && &b.commit_sha == sha)
            {
                return Err(StoreError::DuplicateBuild(sha.clone()));
            }
        }

        let Some(build) = inner.builds.get_mut(&build_id) else {
            return Ok(None);
        };
        changes.apply(build);
        Ok(Some(build.clone()))
    }

    async fn delete_build(&self, build_id: i64) -> Result<bool> {
        Ok(self.inner.lock().await.builds.remove(&build_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::build::BuildStatus;

    fn new_repo(name: &str) -> NewRepository {
        NewRepository {
            name: name.to_string(),
            github_url: format!("https://github.com/acme/{name}"),
        }
    }

    #[tokio::test]
    async fn second_insert_for_same_commit_is_skipped() {
        let store = MemoryStore::new();
        let repo = store.create_repository(new_repo("widgets")).await.unwrap();

        let first = store
            .insert_build(NewBuild::new(repo.id, "abc123", BuildStatus::Success, None, None))
            .await
            .unwrap();
        let second = store
            .insert_build(NewBuild::new(repo.id, "abc123", BuildStatus::Failed, None, None))
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        let stored = store.find_build_by_commit("abc123").await.unwrap().unwrap();
        assert_eq!(stored.status, "SUCCESS");
    }

    #[tokio::test]
    async fn duplicate_repository_name_is_rejected() {
        let store = MemoryStore::new();
        store.create_repository(new_repo("widgets")).await.unwrap();
        let err = store.create_repository(new_repo("widgets")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRepository(name) if name == "widgets"));
    }

    #[tokio::test]
    async fn list_builds_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        let a = store.create_repository(new_repo("a")).await.unwrap();
        let b = store.create_repository(new_repo("b")).await.unwrap();
        for sha in ["s1", "s2", "s3"] {
            store
                .insert_build(NewBuild::new(a.id, sha, BuildStatus::Pending, None, None))
                .await
                .unwrap();
        }
        store
            .insert_build(NewBuild::new(b.id, "other", BuildStatus::Pending, None, None))
            .await
            .unwrap();

        let builds = store.list_builds(a.id, 2).await.unwrap();
        let shas: Vec<_> = builds.iter().map(|b| b.commit_sha.as_str()).collect();
        assert_eq!(shas, ["s3", "s2"]);
    }

    #[tokio::test]
    async fn builds_filter_by_status_across_repositories() {
        let store = MemoryStore::new();
        let a = store.create_repository(new_repo("a")).await.unwrap();
        let b = store.create_repository(new_repo("b")).await.unwrap();
        store
            .insert_build(NewBuild::new(a.id, "s1", BuildStatus::Failed, None, None))
            .await
            .unwrap();
        store
            .insert_build(NewBuild::new(b.id, "s2", BuildStatus::Success, None, None))
            .await
            .unwrap();
        store
            .insert_build(NewBuild::new(b.id, "s3", BuildStatus::Failed, None, None))
            .await
            .unwrap();

        let failed = store
            .list_builds_by_status(BuildStatus::Failed, 10)
            .await
            .unwrap();
        let shas: Vec<_> = failed.iter().map(|b| b.commit_sha.as_str()).collect();
        assert_eq!(shas, ["s3", "s1"]);
        assert_eq!(store.list_all_builds(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_cannot_take_another_builds_commit() {
        let store = MemoryStore::new();
        let repo = store.create_repository(new_repo("widgets")).await.unwrap();
        store
            .insert_build(NewBuild::new(repo.id, "abc", BuildStatus::Pending, None, None))
            .await
            .unwrap();
        let second = store
            .insert_build(NewBuild::new(repo.id, "def", BuildStatus::Pending, None, None))
            .await
            .unwrap()
            .unwrap();

        let changes = BuildChanges {
            commit_sha: Some("abc".to_string()),
            ..Default::default()
        };
        let err = store.update_build(second.id, changes).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateBuild(sha) if sha == "abc"));

        let missing = store
            .update_build(99, BuildChanges::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_went_away() {
        let store = MemoryStore::new();
        let repo = store.create_repository(new_repo("widgets")).await.unwrap();
        let build = store
            .insert_build(NewBuild::new(repo.id, "abc", BuildStatus::Pending, None, None))
            .await
            .unwrap()
            .unwrap();

        assert!(store.delete_build(build.id).await.unwrap());
        assert!(!store.delete_build(build.id).await.unwrap());
        assert!(store.find_build_by_commit("abc").await.unwrap().is_none());
    }
}
