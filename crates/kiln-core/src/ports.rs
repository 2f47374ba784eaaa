//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the pipeline core and its
//! external collaborators: the process runner, the build backend, the
//! secret store and the release-asset store.

use crate::platform::{MatrixEntry, Platform};
use crate::run::ReleaseAsset;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// A process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// `program arg1 arg2` for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub success: bool,
    pub duration_ms: u64,
    /// Last lines of stderr, kept for error messages.
    pub stderr_tail: Vec<String>,
}

impl CommandOutput {
    pub fn failure_message(&self) -> String {
        if self.stderr_tail.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {}: {}", self.exit_code, self.stderr_tail.join("\n"))
        }
    }
}

/// Runs external processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion. Spawn failures are errors; a non-zero
    /// exit is reported through [`CommandOutput::success`].
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// The toolchain that compiles, tests, lints and release-builds the binary.
#[async_trait]
pub trait BuildBackend: Send + Sync {
    async fn compile(&self, platform: Platform) -> Result<()>;

    async fn test(&self, platform: Platform) -> Result<()>;

    /// Static analysis. Only ever invoked on the designated lint platform.
    async fn lint(&self, platform: Platform) -> Result<()>;

    /// Produce the release binary at `entry.source_binary_path`.
    async fn build_release(&self, entry: &MatrixEntry) -> Result<()>;
}

/// A secret value. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Secret provider for retrieving credentials.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get(&self, name: &str) -> Result<Credential>;

    async fn exists(&self, name: &str) -> Result<bool>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Remote store that holds release records and their assets.
#[async_trait]
pub trait ReleaseSink: Send + Sync {
    /// Attach every asset to the release identified by `tag`, in one call.
    async fn attach(
        &self,
        tag: &str,
        credential: &Credential,
        assets: &[ReleaseAsset],
    ) -> Result<Vec<String>>;
}
