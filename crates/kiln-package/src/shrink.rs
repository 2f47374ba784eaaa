//! In-place executable shrinking: optional symbol strip, then compression.

use kiln_core::ports::{CommandRunner, CommandSpec};
use kiln_core::{Error, MatrixEntry, PipelineConfig, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Sizes before and after shrinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShrinkReport {
    pub original_size: u64,
    pub final_size: u64,
    pub stripped: bool,
}

pub struct Shrinker {
    runner: Arc<dyn CommandRunner>,
    strip_program: String,
    upx_program: String,
}

impl Shrinker {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &PipelineConfig) -> Self {
        Self {
            runner,
            strip_program: config.strip_program.clone(),
            upx_program: config.upx_program.clone(),
        }
    }

    /// Shrink the binary at `binary` using the entry's rules.
    #[instrument(skip(self, entry), fields(platform = %entry.platform))]
    pub async fn shrink(&self, entry: &MatrixEntry, binary: &Path) -> Result<ShrinkReport> {
        let original_size = file_size(entry, binary)?;
        let working_dir = binary.parent().unwrap_or(Path::new("."));
        let path = binary.to_string_lossy().into_owned();

        if entry.strip_symbols {
            let spec = CommandSpec::new(&self.strip_program, working_dir).arg(path.as_str());
            self.run_step(entry, &spec).await?;
        }

        let spec = CommandSpec::new(&self.upx_program, working_dir)
            .args(entry.compression_args.split_whitespace())
            .arg(path.as_str());
        self.run_step(entry, &spec).await?;

        let final_size = file_size(entry, binary)?;
        info!(original_size, final_size, stripped = entry.strip_symbols, "Binary shrunk");

        Ok(ShrinkReport {
            original_size,
            final_size,
            stripped: entry.strip_symbols,
        })
    }

    async fn run_step(&self, entry: &MatrixEntry, spec: &CommandSpec) -> Result<()> {
        let output = self.runner.run(spec).await.map_err(|e| Error::Packaging {
            platform: entry.platform,
            message: e.to_string(),
        })?;
        if output.success {
            Ok(())
        } else {
            Err(Error::Packaging {
                platform: entry.platform,
                message: format!("`{}` failed with {}", spec.display(), output.failure_message()),
            })
        }
    }
}

fn file_size(entry: &MatrixEntry, binary: &Path) -> Result<u64> {
    std::fs::metadata(binary)
        .map(|m| m.len())
        .map_err(|e| Error::Packaging {
            platform: entry.platform,
            message: format!("{}: {}", binary.display(), e),
        })
}
