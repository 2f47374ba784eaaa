//! Check, release and pipeline outcome types.

use crate::ids::RunId;
use crate::platform::Platform;
use crate::trigger::{RunDecision, TriggerEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one platform's check job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub platform: Platform,
    pub compiled: bool,
    pub tested: bool,
    /// `None` on platforms that do not lint.
    pub linted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            compiled: false,
            tested: false,
            linted: None,
            error: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.compiled && self.tested && self.linted != Some(false)
    }
}

/// All check results of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn new(mut results: Vec<CheckResult>) -> Self {
        results.sort_by_key(|r| r.platform);
        Self { results }
    }

    pub fn get(&self, platform: Platform) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.platform == platform)
    }

    /// True only when every platform reported and passed.
    pub fn aggregate_success(&self) -> bool {
        Platform::ALL
            .iter()
            .all(|p| self.get(*p).is_some_and(CheckResult::passed))
    }

    pub fn failed_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| !self.get(*p).is_some_and(CheckResult::passed))
            .collect()
    }
}

/// Terminal status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failure,
    Skipped,
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Success)
    }
}

/// A packaged file ready to be attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    /// Hex SHA-256 of the file.
    pub sha256: String,
}

/// Outcome of one platform's release job (build, shrink, package).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub platform: Platform,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<ReleaseAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReleaseOutcome {
    pub fn success(platform: Platform, asset: ReleaseAsset) -> Self {
        Self {
            platform,
            status: JobStatus::Success,
            asset: Some(asset),
            error: None,
        }
    }

    pub fn failure(platform: Platform, error: impl Into<String>) -> Self {
        Self {
            platform,
            status: JobStatus::Failure,
            asset: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of the publish step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub tag: String,
    pub status: JobStatus,
    /// Asset names attached to the release.
    pub assets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Overall status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Success,
    Failure,
}

/// Everything that happened during one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub event: TriggerEvent,
    pub decision: RunDecision,
    pub checks: CheckReport,
    /// Tag trigger AND every check passed.
    pub release_gate: bool,
    pub releases: Vec<ReleaseOutcome>,
    pub publish: Option<PublishOutcome>,
    pub status: PipelineStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Success
    }

    /// Names of the assets that reached the release record.
    pub fn published_assets(&self) -> &[String] {
        match &self.publish {
            Some(p) if p.status.is_success() => &p.assets,
            _ => &[],
        }
    }
}
