//! Trigger events and the decision derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of VCS event that started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
    /// A push whose ref is a tag. Treated as a push everywhere.
    TagPush,
}

impl EventKind {
    pub fn is_push(&self) -> bool {
        matches!(self, EventKind::Push | EventKind::TagPush)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Push => f.write_str("push"),
            EventKind::PullRequest => f.write_str("pull_request"),
            EventKind::TagPush => f.write_str("tag_push"),
        }
    }
}

impl FromStr for EventKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "push" => Ok(EventKind::Push),
            "pull_request" | "pr" => Ok(EventKind::PullRequest),
            "tag" | "tag_push" => Ok(EventKind::TagPush),
            other => Err(crate::Error::UnknownEvent(other.to_string())),
        }
    }
}

/// Event metadata a run is started with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub kind: EventKind,
    pub git_ref: String,
}

pub const TAG_REF_PREFIX: &str = "refs/tags/";

impl TriggerEvent {
    pub fn new(kind: EventKind, git_ref: impl Into<String>) -> Self {
        Self {
            kind,
            git_ref: git_ref.into(),
        }
    }

    pub fn push(git_ref: impl Into<String>) -> Self {
        Self::new(EventKind::Push, git_ref)
    }

    pub fn pull_request(git_ref: impl Into<String>) -> Self {
        Self::new(EventKind::PullRequest, git_ref)
    }

    /// Read the event from the CI environment (`GITHUB_EVENT_NAME`,
    /// `GITHUB_REF`). Returns `None` outside a CI job.
    pub fn from_env() -> Option<Self> {
        let name = std::env::var("GITHUB_EVENT_NAME").ok()?;
        let git_ref = std::env::var("GITHUB_REF").ok()?;
        Self::from_ci(&name, git_ref)
    }

    /// Build an event from a CI event name and ref. Unknown event names
    /// yield `None`.
    pub fn from_ci(event_name: &str, git_ref: impl Into<String>) -> Option<Self> {
        let git_ref = git_ref.into();
        let kind = match event_name {
            "push" if git_ref.starts_with(TAG_REF_PREFIX) => EventKind::TagPush,
            "push" => EventKind::Push,
            "pull_request" | "pull_request_target" => EventKind::PullRequest,
            _ => return None,
        };
        Some(Self { kind, git_ref })
    }

    /// Tag name for a `refs/tags/...` ref.
    pub fn tag_name(&self) -> Option<&str> {
        self.git_ref
            .strip_prefix(TAG_REF_PREFIX)
            .filter(|name| !name.is_empty())
    }
}

/// Which stages a trigger allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunDecision {
    pub run_check: bool,
    /// Candidate only: release also needs every check to pass.
    pub run_release: bool,
}
