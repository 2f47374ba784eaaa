//! Per-platform verification: compile, test, and lint on one platform.

use kiln_core::Platform;
use kiln_core::ports::BuildBackend;
use kiln_core::run::{CheckReport, CheckResult};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

pub struct CheckStage {
    backend: Arc<dyn BuildBackend>,
    lint_platform: Platform,
}

impl CheckStage {
    pub fn new(backend: Arc<dyn BuildBackend>, lint_platform: Platform) -> Self {
        Self {
            backend,
            lint_platform,
        }
    }

    /// Run the check job of every platform in parallel and join them all.
    /// A job that panics counts as a failure of its platform.
    pub async fn run(&self, platforms: &[Platform]) -> CheckReport {
        let mut join_set = JoinSet::new();
        for &platform in platforms {
            let backend = self.backend.clone();
            let lint = platform == self.lint_platform;
            join_set.spawn(async move { check_platform(backend.as_ref(), platform, lint).await });
        }

        let mut results = Vec::with_capacity(platforms.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!(error = %e, "Check job did not complete"),
            }
        }

        for &platform in platforms {
            if !results.iter().any(|r| r.platform == platform) {
                let mut result = CheckResult::new(platform);
                result.error = Some("check job did not complete".to_string());
                results.push(result);
            }
        }

        let report = CheckReport::new(results);
        if report.aggregate_success() {
            info!("All checks passed");
        } else {
            warn!(failed = ?report.failed_platforms(), "Checks failed");
        }
        report
    }

    /// Run one platform's check job in the current task.
    pub async fn run_platform(&self, platform: Platform) -> CheckResult {
        check_platform(
            self.backend.as_ref(),
            platform,
            platform == self.lint_platform,
        )
        .await
    }
}

#[instrument(skip(backend))]
async fn check_platform(backend: &dyn BuildBackend, platform: Platform, lint: bool) -> CheckResult {
    let mut result = CheckResult::new(platform);

    if let Err(e) = backend.compile(platform).await {
        warn!(error = %e, "Compile failed");
        result.error = Some(e.to_string());
        return result;
    }
    result.compiled = true;

    if let Err(e) = backend.test(platform).await {
        warn!(error = %e, "Tests failed");
        result.error = Some(e.to_string());
        return result;
    }
    result.tested = true;

    if lint {
        match backend.lint(platform).await {
            Ok(()) => result.linted = Some(true),
            Err(e) => {
                warn!(error = %e, "Lint failed");
                result.linted = Some(false);
                result.error = Some(e.to_string());
            }
        }
    }

    if result.passed() {
        info!("Checks passed");
    }
    result
}
