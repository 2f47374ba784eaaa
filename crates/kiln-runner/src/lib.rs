//! Process execution and the cargo build backend for kiln.

pub mod backend;
pub mod runner;
pub mod shell;

pub use backend::CargoBackend;
pub use runner::{OutputLine, OutputStream, RunnerConfig};
pub use shell::ShellRunner;
