//! Runner configuration and streamed output types.

/// Output line from a running process.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub content: String,
    pub line_number: u32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Output stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Configuration for process execution.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Stderr lines kept for error messages.
    pub stderr_tail_lines: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            stderr_tail_lines: 20,
        }
    }
}
