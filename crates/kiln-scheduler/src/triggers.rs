//! Trigger evaluation.

use kiln_core::{EventKind, RunDecision, TriggerEvent};

/// Default pattern a ref must match to be a release candidate.
pub const DEFAULT_TAG_PATTERN: &str = "refs/tags/*";

/// Decides which stages an event activates.
#[derive(Debug, Clone)]
pub struct TriggerGate {
    tag_pattern: String,
}

impl TriggerGate {
    pub fn new() -> Self {
        Self::with_pattern(DEFAULT_TAG_PATTERN)
    }

    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            tag_pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.tag_pattern
    }

    /// Checks run for every push and pull request. Release is only a
    /// candidate for pushes whose ref matches the tag pattern; the check
    /// outcome still has to clear it.
    pub fn decide(&self, event: &TriggerEvent) -> RunDecision {
        let run_check = matches!(
            event.kind,
            EventKind::Push | EventKind::PullRequest | EventKind::TagPush
        );
        let run_release = event.kind.is_push()
            && event.tag_name().is_some()
            && self.matches_ref(&event.git_ref);

        RunDecision {
            run_check,
            run_release,
        }
    }

    pub fn matches_ref(&self, git_ref: &str) -> bool {
        glob_match(&self.tag_pattern, git_ref)
    }
}

impl Default for TriggerGate {
    fn default() -> Self {
        Self::new()
    }
}

/// `*` matches any run of characters, slashes included.
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" || pattern == "**" {
        return true;
    }
    if !pattern.contains('*') {
        return pattern == text;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];

    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };
    for part in &parts[1..parts.len() - 1] {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("refs/tags/*", "refs/tags/v1.2.0"));
        assert!(glob_match("refs/tags/*", "refs/tags/release/1.0"));
        assert!(glob_match("refs/tags/v*", "refs/tags/v2"));
        assert!(glob_match("refs/tags/v*.*", "refs/tags/v2.1"));
        assert!(!glob_match("refs/tags/v*.*", "refs/tags/v2"));
        assert!(!glob_match("refs/tags/*", "refs/heads/main"));
        assert!(glob_match("refs/heads/main", "refs/heads/main"));
        assert!(glob_match("*", "anything"));
    }

    #[test]
    fn test_branch_push_checks_only() {
        let gate = TriggerGate::new();
        let decision = gate.decide(&TriggerEvent::push("refs/heads/main"));
        assert!(decision.run_check);
        assert!(!decision.run_release);
    }

    #[test]
    fn test_tag_push_is_release_candidate() {
        let gate = TriggerGate::new();
        let decision = gate.decide(&TriggerEvent::push("refs/tags/v1.2.0"));
        assert!(decision.run_check);
        assert!(decision.run_release);
    }

    #[test]
    fn test_pull_request_never_releases() {
        let gate = TriggerGate::new();
        let decision = gate.decide(&TriggerEvent::pull_request("refs/tags/v1.2.0"));
        assert!(decision.run_check);
        assert!(!decision.run_release);
    }

    #[test]
    fn test_custom_pattern() {
        let gate = TriggerGate::with_pattern("refs/tags/v*");
        assert!(gate.decide(&TriggerEvent::push("refs/tags/v3.0.0")).run_release);
        assert!(!gate.decide(&TriggerEvent::push("refs/tags/nightly")).run_release);
    }

    #[test]
    fn test_empty_tag_name_is_not_a_release() {
        let gate = TriggerGate::new();
        assert!(!gate.decide(&TriggerEvent::push("refs/tags/")).run_release);
    }
}
