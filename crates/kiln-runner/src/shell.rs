//! Host process execution.

use crate::runner::{OutputLine, OutputStream, RunnerConfig};
use async_trait::async_trait;
use kiln_core::Result;
use kiln_core::ports::{CommandOutput, CommandRunner, CommandSpec};
use std::collections::VecDeque;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Runs commands directly on the host, streaming their output.
pub struct ShellRunner {
    config: RunnerConfig,
    output_tx: Option<mpsc::Sender<OutputLine>>,
}

impl ShellRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            output_tx: None,
        }
    }

    /// Forward every output line to `tx` instead of the log.
    pub fn with_output(mut self, tx: mpsc::Sender<OutputLine>) -> Self {
        self.output_tx = Some(tx);
        self
    }

    async fn forward(tx: &Option<mpsc::Sender<OutputLine>>, line: OutputLine) -> bool {
        match tx {
            Some(tx) => tx.send(line).await.is_ok(),
            None => {
                debug!(stream = ?line.stream, "{}", line.content);
                true
            }
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let start = std::time::Instant::now();

        info!(command = %spec.display(), dir = %spec.working_dir.display(), "Executing command");

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .envs(&spec.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| kiln_core::Error::Spawn {
                program: spec.program.clone(),
                message: e.to_string(),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| kiln_core::Error::Internal("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| kiln_core::Error::Internal("stderr not captured".to_string()))?;

        let stdout_tx = self.output_tx.clone();
        let stdout_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut line_num = 0u32;

            while let Ok(Some(line)) = lines.next_line().await {
                line_num += 1;
                let output = OutputLine {
                    stream: OutputStream::Stdout,
                    content: line,
                    line_number: line_num,
                    timestamp: chrono::Utc::now(),
                };
                if !Self::forward(&stdout_tx, output).await {
                    break;
                }
            }
        });

        let stderr_tx = self.output_tx.clone();
        let tail_len = self.config.stderr_tail_lines;
        let stderr_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut line_num = 0u32;
            let mut tail = VecDeque::with_capacity(tail_len);

            while let Ok(Some(line)) = lines.next_line().await {
                line_num += 1;
                if tail_len > 0 {
                    if tail.len() == tail_len {
                        tail.pop_front();
                    }
                    tail.push_back(line.clone());
                }
                let output = OutputLine {
                    stream: OutputStream::Stderr,
                    content: line,
                    line_number: line_num,
                    timestamp: chrono::Utc::now(),
                };
                // Keep draining so the tail stays accurate.
                let _ = Self::forward(&stderr_tx, output).await;
            }
            tail.into_iter().collect::<Vec<_>>()
        });

        let wait_result = child.wait().await;

        let _ = stdout_handle.await;
        let stderr_tail = stderr_handle.await.unwrap_or_default();

        let status = wait_result.map_err(|e| {
            kiln_core::Error::Internal(format!("Failed to wait for process: {}", e))
        })?;

        let exit_code = status.code().unwrap_or(-1);
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(exit_code, duration_ms, "Command completed");

        Ok(CommandOutput {
            exit_code,
            success: status.success(),
            duration_ms,
            stderr_tail,
        })
    }
}
