//! Main pipeline orchestration.

use crate::check::CheckStage;
use crate::matrix::ReleaseMatrix;
use crate::release::ReleaseStage;
use crate::triggers::TriggerGate;

use kiln_core::ports::BuildBackend;
use kiln_core::run::{
    CheckReport, JobStatus, PipelineReport, PipelineStatus, PublishOutcome, ReleaseAsset,
    ReleaseOutcome,
};
use kiln_core::{PipelineConfig, Platform, Result, RunId, TriggerEvent};
use kiln_package::ArtifactPackager;
use kiln_publish::Publisher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Runs one pipeline execution: checks on every platform, then, behind the
/// release gate, release jobs on every platform and a single publish.
pub struct PipelineScheduler {
    gate: TriggerGate,
    matrix: ReleaseMatrix,
    checks: CheckStage,
    releases: ReleaseStage,
    publisher: Publisher,
    bench_archive: PathBuf,
}

impl PipelineScheduler {
    pub fn new(
        config: &PipelineConfig,
        backend: Arc<dyn BuildBackend>,
        packager: Arc<ArtifactPackager>,
        publisher: Publisher,
        bench_archive: PathBuf,
    ) -> Result<Self> {
        let matrix = ReleaseMatrix::from_config(config);
        matrix.validate()?;

        Ok(Self {
            gate: TriggerGate::with_pattern(&config.tag_pattern),
            matrix,
            checks: CheckStage::new(backend.clone(), config.lint_platform),
            releases: ReleaseStage::new(backend, packager),
            publisher,
            bench_archive,
        })
    }

    #[instrument(skip(self, event), fields(event = %event.kind, git_ref = %event.git_ref))]
    pub async fn run(&self, event: &TriggerEvent) -> Result<PipelineReport> {
        let run_id = RunId::new();
        let started_at = chrono::Utc::now();

        let decision = self.gate.decide(event);
        info!(%run_id, run_check = decision.run_check, run_release = decision.run_release, "Trigger evaluated");

        let checks = if decision.run_check {
            self.checks.run(&Platform::ALL).await
        } else {
            CheckReport::default()
        };

        let release_gate = decision.run_release && checks.aggregate_success();
        let mut releases = Vec::new();
        let mut publish = None;

        if release_gate {
            info!("Release gate open");
            releases = self.releases.run(self.matrix.entries().to_vec()).await;
            publish = Some(self.publish(event, &releases).await);
        } else if decision.run_release {
            warn!(failed = ?checks.failed_platforms(), "Release gate closed by failing checks");
        }

        let checks_ok = !decision.run_check || checks.aggregate_success();
        let releases_ok = releases.iter().all(|r| r.status.is_success());
        let publish_ok = publish.as_ref().is_none_or(|p| p.status.is_success());
        let status = if checks_ok && releases_ok && publish_ok {
            PipelineStatus::Success
        } else {
            PipelineStatus::Failure
        };

        let completed_at = chrono::Utc::now();
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;
        info!(%run_id, ?status, duration_ms, "Pipeline finished");

        Ok(PipelineReport {
            run_id,
            event: event.clone(),
            decision,
            checks,
            release_gate,
            releases,
            publish,
            status,
            started_at,
            completed_at,
            duration_ms,
        })
    }

    /// Publish only when every release job produced its archive; a partial
    /// platform set publishes nothing.
    async fn publish(&self, event: &TriggerEvent, releases: &[ReleaseOutcome]) -> PublishOutcome {
        let tag = event.tag_name().unwrap_or_default().to_string();

        let failed: Vec<Platform> = releases
            .iter()
            .filter(|r| !r.status.is_success())
            .map(|r| r.platform)
            .collect();
        if !failed.is_empty() {
            warn!(?failed, "Release jobs failed, nothing published");
            return PublishOutcome {
                tag,
                status: JobStatus::Skipped,
                assets: vec![],
                error: Some(format!("release jobs failed on {:?}", failed)),
            };
        }

        let archives: Vec<ReleaseAsset> = releases.iter().filter_map(|r| r.asset.clone()).collect();
        match self.publisher.publish(&tag, &archives, &self.bench_archive).await {
            Ok(assets) => PublishOutcome {
                tag,
                status: JobStatus::Success,
                assets,
                error: None,
            },
            Err(e) => {
                error!(error = %e, "Publish failed");
                PublishOutcome {
                    tag,
                    status: JobStatus::Failure,
                    assets: vec![],
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
