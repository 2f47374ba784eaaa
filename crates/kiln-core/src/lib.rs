//! kiln core
//!
//! Domain types, ports and error handling for the kiln release pipeline.
//! Every other crate speaks this vocabulary: platforms and their release
//! matrix entries, trigger events, check and release outcomes, and the
//! traits that front the build backend, the command runner, the secret
//! store and the release sink.

pub mod config;
pub mod error;
pub mod ids;
pub mod platform;
pub mod ports;
pub mod run;
pub mod trigger;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use ids::*;
pub use platform::{ArchiveFormat, MatrixEntry, Platform, PlatformFamily};
pub use trigger::{EventKind, RunDecision, TAG_REF_PREFIX, TriggerEvent};
