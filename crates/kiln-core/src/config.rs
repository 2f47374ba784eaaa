//! Process-wide pipeline configuration.
//!
//! Loaded once per run (usually from `kiln.yaml` at the workspace root) and
//! handed to each stage explicitly. Nothing in the pipeline reads ambient
//! global state for these values.

use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the binary being released.
    #[serde(default = "default_binary_name")]
    pub binary_name: String,
    /// Coloured build-tool output.
    #[serde(default = "default_color")]
    pub color: bool,
    /// Target triple for the statically linked Linux build.
    #[serde(default = "default_static_target")]
    pub static_target: String,
    /// Glob a git ref must match to be a release candidate.
    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,
    /// The one platform that also runs the linter.
    #[serde(default = "default_lint_platform")]
    pub lint_platform: Platform,
    /// Shared directory archives are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Pre-built benchmark archive attached to every release.
    #[serde(default = "default_bench_archive")]
    pub bench_archive: PathBuf,
    /// Secret holding the release-publishing credential.
    #[serde(default = "default_credential_secret")]
    pub credential_secret: String,
    #[serde(default = "default_cargo_program")]
    pub cargo_program: String,
    #[serde(default = "default_strip_program")]
    pub strip_program: String,
    #[serde(default = "default_upx_program")]
    pub upx_program: String,
    /// `owner/name` of the repository owning the release.
    #[serde(default = "default_repository")]
    pub repository: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_uploads_url")]
    pub uploads_url: String,
}

fn default_binary_name() -> String {
    "zr".to_string()
}

fn default_color() -> bool {
    true
}

fn default_static_target() -> String {
    "x86_64-unknown-linux-musl".to_string()
}

fn default_tag_pattern() -> String {
    "refs/tags/*".to_string()
}

fn default_lint_platform() -> Platform {
    Platform::Linux
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_bench_archive() -> PathBuf {
    PathBuf::from("target/bench.tar.gz")
}

fn default_credential_secret() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_cargo_program() -> String {
    "cargo".to_string()
}

fn default_strip_program() -> String {
    "strip".to_string()
}

fn default_upx_program() -> String {
    "upx".to_string()
}

fn default_repository() -> String {
    "zr-cli/zr".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_uploads_url() -> String {
    "https://uploads.github.com".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            binary_name: default_binary_name(),
            color: default_color(),
            static_target: default_static_target(),
            tag_pattern: default_tag_pattern(),
            lint_platform: default_lint_platform(),
            output_dir: default_output_dir(),
            bench_archive: default_bench_archive(),
            credential_secret: default_credential_secret(),
            cargo_program: default_cargo_program(),
            strip_program: default_strip_program(),
            upx_program: default_upx_program(),
            repository: default_repository(),
            api_url: default_api_url(),
            uploads_url: default_uploads_url(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.binary_name.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "binary_name must not be empty".to_string(),
            ));
        }
        if self.static_target.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "static_target must not be empty".to_string(),
            ));
        }
        if !self.repository.contains('/') {
            return Err(crate::Error::InvalidConfig(format!(
                "repository must be owner/name, got {}",
                self.repository
            )));
        }
        Ok(())
    }

    /// Resolve the archive output directory against a workspace root.
    pub fn output_dir_in(&self, workspace: &Path) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            workspace.join(&self.output_dir)
        }
    }

    pub fn bench_archive_in(&self, workspace: &Path) -> PathBuf {
        if self.bench_archive.is_absolute() {
            self.bench_archive.clone()
        } else {
            workspace.join(&self.bench_archive)
        }
    }
}
