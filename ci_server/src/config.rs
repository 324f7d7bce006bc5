//! Dashboard configuration — loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub scheduler: SchedulerConfig,
    /// Origins allowed by the CORS layer.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GitHubConfig {
    /// API base, e.g. `https://api.github.com`.
    pub base_url: String,
    /// Bearer token; requests are unauthenticated when empty.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Whether the periodic timer runs. Manual triggers work either way.
    pub enabled: bool,
    pub interval: Duration,
    /// Explicit repositories to sweep. Empty means "every stored repository".
    pub repositories: Vec<MonitoredRepository>,
}

/// A repository the scheduler should sync, as configured by the operator.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct MonitoredRepository {
    /// Local repository id.
    pub id: i64,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("GITHUB_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string());
        let token = std::env::var("GITHUB_TOKEN").unwrap_or_default();
        let timeout_secs = std::env::var("GITHUB_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let enabled = std::env::var("SCHEDULER_ENABLED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);
        let interval_secs = std::env::var("SCHEDULER_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &u64| *n > 0)
            .unwrap_or(300);
        let repositories = match std::env::var("SCHEDULER_REPOSITORIES") {
            Ok(raw) => parse_repositories(&raw)?,
            Err(_) => Vec::new(),
        };
        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),
        );

        if token.is_empty() {
            tracing::warn!("GITHUB_TOKEN not set -- GitHub API calls are unauthenticated");
        }
        if repositories.is_empty() {
            tracing::warn!(
                "SCHEDULER_REPOSITORIES not set -- sweeps will sync every stored repository"
            );
        }

        Ok(Self {
            github: GitHubConfig {
                base_url,
                token,
                timeout: Duration::from_secs(timeout_secs),
            },
            scheduler: SchedulerConfig {
                enabled,
                interval: Duration::from_secs(interval_secs),
                repositories,
            },
            cors_allowed_origins,
        })
    }
}

/// Parse a JSON array of monitored repositories. Blank input means none.
pub fn parse_repositories(raw: &str) -> anyhow::Result<Vec<MonitoredRepository>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("invalid SCHEDULER_REPOSITORIES: {e}"))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
