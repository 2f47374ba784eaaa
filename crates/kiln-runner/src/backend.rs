//! Cargo as the build backend.

use async_trait::async_trait;
use kiln_core::ports::{BuildBackend, CommandRunner, CommandSpec};
use kiln_core::{Error, MatrixEntry, PipelineConfig, Platform, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Drives `cargo` through a [`CommandRunner`].
///
/// Cargo only builds for the machine it runs on, so every step for a
/// platform other than the host is refused before a command is spawned.
pub struct CargoBackend {
    runner: Arc<dyn CommandRunner>,
    workspace: PathBuf,
    cargo: String,
    color: bool,
    host: Option<Platform>,
}

impl CargoBackend {
    pub fn new(runner: Arc<dyn CommandRunner>, workspace: PathBuf, config: &PipelineConfig) -> Self {
        Self {
            runner,
            workspace,
            cargo: config.cargo_program.clone(),
            color: config.color,
            host: Platform::host(),
        }
    }

    /// Override the detected host platform.
    pub fn with_host(mut self, host: Option<Platform>) -> Self {
        self.host = host;
        self
    }

    fn ensure_host(&self, platform: Platform) -> std::result::Result<(), String> {
        match self.host {
            Some(host) if host == platform => Ok(()),
            Some(host) => Err(format!(
                "cargo on a {} host cannot build for {}; run this step on a {} runner",
                host, platform, platform
            )),
            None => Err(format!(
                "host OS {} is not a release platform; cannot build for {}",
                std::env::consts::OS,
                platform
            )),
        }
    }

    fn cargo<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let color = if self.color { "always" } else { "never" };
        CommandSpec::new(&self.cargo, &self.workspace)
            .args(args)
            .env("CARGO_TERM_COLOR", color)
    }

    /// Run a check verb; a non-zero exit is a verification failure.
    async fn check_step(&self, platform: Platform, step: &str, spec: CommandSpec) -> Result<()> {
        self.ensure_host(platform).map_err(|message| Error::Verification {
            platform,
            step: step.to_string(),
            message,
        })?;

        let output = self.runner.run(&spec).await?;
        if output.success {
            info!(%platform, step, duration_ms = output.duration_ms, "Check step passed");
            Ok(())
        } else {
            Err(Error::Verification {
                platform,
                step: step.to_string(),
                message: output.failure_message(),
            })
        }
    }
}

#[async_trait]
impl BuildBackend for CargoBackend {
    #[instrument(skip(self))]
    async fn compile(&self, platform: Platform) -> Result<()> {
        self.check_step(platform, "compile", self.cargo(["build"]))
            .await
    }

    #[instrument(skip(self))]
    async fn test(&self, platform: Platform) -> Result<()> {
        self.check_step(platform, "test", self.cargo(["test"])).await
    }

    #[instrument(skip(self))]
    async fn lint(&self, platform: Platform) -> Result<()> {
        self.check_step(
            platform,
            "lint",
            self.cargo(["clippy", "--", "-D", "warnings"]),
        )
        .await
    }

    #[instrument(skip(self, entry), fields(platform = %entry.platform))]
    async fn build_release(&self, entry: &MatrixEntry) -> Result<()> {
        self.ensure_host(entry.platform).map_err(|message| Error::Build {
            platform: entry.platform,
            message,
        })?;

        let mut spec = self.cargo(["build", "--release"]);
        if let Some(target) = &entry.build_target {
            spec = spec.args(["--target", target.as_str()]);
        }

        let output = self.runner.run(&spec).await.map_err(|e| Error::Build {
            platform: entry.platform,
            message: e.to_string(),
        })?;
        if !output.success {
            return Err(Error::Build {
                platform: entry.platform,
                message: output.failure_message(),
            });
        }

        let binary = self.workspace.join(&entry.source_binary_path);
        if !binary.is_file() {
            return Err(Error::Build {
                platform: entry.platform,
                message: format!("expected binary at {} was not produced", binary.display()),
            });
        }

        info!(binary = %binary.display(), "Release binary built");
        Ok(())
    }
}
