//! Idempotent DDL for the dashboard tables, applied at startup.

use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};

/// SQL migration for the repositories and builds tables.
pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS repositories (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE,
    github_url      VARCHAR(512) NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS builds (
    id              BIGSERIAL PRIMARY KEY,
    repository_id   BIGINT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    status          VARCHAR(32) NOT NULL DEFAULT 'PENDING',
    commit_sha      VARCHAR(64) NOT NULL,
    started_at      TIMESTAMPTZ,
    completed_at    TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_builds_commit_sha ON builds (commit_sha);
CREATE INDEX IF NOT EXISTS idx_builds_repository ON builds (repository_id);
CREATE INDEX IF NOT EXISTS idx_builds_status ON builds (status);
"#;

/// Run the migration against a live connection.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL).await?;
    Ok(())
}
