//! Pipeline scheduling for kiln: trigger gating, the per-platform check and
//! release stages, and the orchestration that ties them to the publisher.

pub mod check;
pub mod dag;
pub mod matrix;
pub mod release;
pub mod scheduler;
pub mod triggers;

pub use check::CheckStage;
pub use dag::{DagError, JobGraph, JobKind, JobNode};
pub use matrix::ReleaseMatrix;
pub use release::ReleaseStage;
pub use scheduler::PipelineScheduler;
pub use triggers::TriggerGate;
