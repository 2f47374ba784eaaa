//! Per-invocation context: workspace, pipeline configuration and wiring.

use kiln_core::PipelineConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a command handler needs to know about this invocation.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub workspace: PathBuf,
    pub config: PipelineConfig,
    pub secrets_file: Option<PathBuf>,
    pub verbose: bool,
}

impl CliContext {
    /// Resolve the workspace and load the configuration file inside it.
    /// A missing configuration file means defaults.
    pub fn load(
        config_path: &Path,
        workspace: Option<PathBuf>,
        secrets_file: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let workspace = match workspace {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let config_path = if config_path.is_absolute() {
            config_path.to_path_buf()
        } else {
            workspace.join(config_path)
        };
        debug!(
            config = %config_path.display(),
            found = config_path.is_file(),
            "Loading pipeline configuration"
        );
        let config = PipelineConfig::load(&config_path)?;

        Ok(Self {
            workspace,
            config,
            secrets_file,
            verbose,
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config.output_dir_in(&self.workspace)
    }

    pub fn bench_archive(&self) -> PathBuf {
        self.config.bench_archive_in(&self.workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::Platform;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CliContext::load(
            Path::new("kiln.yaml"),
            Some(dir.path().to_path_buf()),
            None,
            false,
        )
        .unwrap();

        assert_eq!(ctx.config, PipelineConfig::default());
        assert_eq!(ctx.bench_archive(), dir.path().join("target/bench.tar.gz"));
    }

    #[test]
    fn test_config_loaded_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("kiln.yaml"),
            "lint_platform: macos\noutput_dir: dist\n",
        )
        .unwrap();

        let ctx = CliContext::load(
            Path::new("kiln.yaml"),
            Some(dir.path().to_path_buf()),
            None,
            false,
        )
        .unwrap();

        assert_eq!(ctx.config.lint_platform, Platform::Macos);
        assert_eq!(ctx.output_dir(), dir.path().join("dist"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kiln.yaml"), "repository: no-slash\n").unwrap();

        let result = CliContext::load(
            Path::new("kiln.yaml"),
            Some(dir.path().to_path_buf()),
            None,
            false,
        );
        assert!(result.is_err());
    }
}
