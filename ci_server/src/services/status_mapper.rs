//! Maps GitHub's (status, conclusion) vocabulary onto [`BuildStatus`].
//!
//! Unrecognized status strings map to `Pending`. GitHub owns the vocabulary,
//! so a new value degrades to "not finished yet" instead of an error.

use crate::models::build::BuildStatus;

/// Run status as reported by the workflow-runs API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Other,
}

impl RunStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            _ => RunStatus::Other,
        }
    }
}

/// Terminal outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunConclusion {
    Success,
    Cancelled,
    Other,
}

impl RunConclusion {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("success") => RunConclusion::Success,
            Some("cancelled") => RunConclusion::Cancelled,
            _ => RunConclusion::Other,
        }
    }
}

/// Total mapping over the parsed pair.
pub fn classify(status: RunStatus, conclusion: RunConclusion) -> BuildStatus {
    match (status, conclusion) {
        (RunStatus::Queued, _) => BuildStatus::Pending,
        (RunStatus::InProgress, _) => BuildStatus::InProgress,
        (RunStatus::Completed, RunConclusion::Success) => BuildStatus::Success,
        (RunStatus::Completed, RunConclusion::Cancelled) => BuildStatus::Cancelled,
        (RunStatus::Completed, RunConclusion::Other) => BuildStatus::Failed,
        (RunStatus::Other, _) => BuildStatus::Pending,
    }
}

/// Map raw GitHub strings to a build status.
pub fn map_status(raw_status: &str, raw_conclusion: Option<&str>) -> BuildStatus {
    classify(
        RunStatus::from_raw(raw_status),
        RunConclusion::from_raw(raw_conclusion),
    )
}
