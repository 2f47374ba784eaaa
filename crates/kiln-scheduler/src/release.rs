//! Per-platform release jobs: release build, then shrink and package.

use kiln_core::ports::BuildBackend;
use kiln_core::run::{ReleaseAsset, ReleaseOutcome};
use kiln_core::{MatrixEntry, Result};
use kiln_package::ArtifactPackager;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

pub struct ReleaseStage {
    backend: Arc<dyn BuildBackend>,
    packager: Arc<ArtifactPackager>,
}

impl ReleaseStage {
    pub fn new(backend: Arc<dyn BuildBackend>, packager: Arc<ArtifactPackager>) -> Self {
        Self { backend, packager }
    }

    /// Run every entry's release job in parallel. Each entry moves into its
    /// own task; one platform failing never stops its siblings.
    pub async fn run(&self, entries: Vec<MatrixEntry>) -> Vec<ReleaseOutcome> {
        let platforms: Vec<_> = entries.iter().map(|e| e.platform).collect();
        let mut join_set = JoinSet::new();

        for entry in entries {
            let backend = self.backend.clone();
            let packager = self.packager.clone();
            join_set.spawn(async move {
                let platform = entry.platform;
                match release_entry(backend.as_ref(), &packager, &entry).await {
                    Ok(asset) => ReleaseOutcome::success(platform, asset),
                    Err(e) => {
                        error!(platform = %platform, error = %e, "Release job failed");
                        ReleaseOutcome::failure(platform, e.to_string())
                    }
                }
            });
        }

        let mut outcomes = Vec::with_capacity(platforms.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "Release job did not complete"),
            }
        }

        for platform in platforms {
            if !outcomes.iter().any(|o| o.platform == platform) {
                outcomes.push(ReleaseOutcome::failure(
                    platform,
                    "release job did not complete",
                ));
            }
        }
        outcomes.sort_by_key(|o| o.platform);
        outcomes
    }

    /// Run one entry's release job in the current task.
    pub async fn run_entry(&self, entry: &MatrixEntry) -> Result<ReleaseAsset> {
        release_entry(self.backend.as_ref(), &self.packager, entry).await
    }
}

#[instrument(skip_all, fields(platform = %entry.platform))]
async fn release_entry(
    backend: &dyn BuildBackend,
    packager: &ArtifactPackager,
    entry: &MatrixEntry,
) -> Result<ReleaseAsset> {
    backend.build_release(entry).await?;
    let asset = packager.package(entry).await?;
    info!(archive = %asset.name, size = asset.size, "Release archive ready");
    Ok(asset)
}
