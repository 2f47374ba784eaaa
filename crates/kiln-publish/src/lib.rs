//! Release publishing for kiln.
//!
//! The [`Publisher`] resolves the release credential, adds the benchmark
//! archive to the platform archives and hands everything to a
//! [`ReleaseSink`](kiln_core::ports::ReleaseSink) in a single call.

pub mod dry_run;
pub mod github;
pub mod publisher;

pub use dry_run::DryRunSink;
pub use github::GithubReleaseSink;
pub use publisher::{Publisher, asset_from_file};
