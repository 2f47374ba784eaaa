//! Serialization tests for kiln-core types surfaced in CLI JSON output.

use chrono::Utc;
use kiln_core::PipelineConfig;
use kiln_core::ids::RunId;
use kiln_core::platform::{ArchiveFormat, MatrixEntry, Platform};
use kiln_core::run::*;
use kiln_core::trigger::{EventKind, RunDecision, TriggerEvent};
use pretty_assertions::assert_eq;

#[test]
fn test_matrix_entry_json_shape() {
    let entry = MatrixEntry::for_platform(Platform::Macos, &PipelineConfig::default());
    let json = serde_json::to_value(&entry).expect("serialize");

    assert_eq!(json["platform"], "macos");
    assert_eq!(json["archive_name"], "zr-macos.tar.gz");
    assert_eq!(json["archive_format"], "tar_gz");
    assert_eq!(json["strip_symbols"], true);
    assert_eq!(json["build_target"], serde_json::Value::Null);
}

#[test]
fn test_run_decision_roundtrip() {
    let decision = RunDecision {
        run_check: true,
        run_release: false,
    };
    let json = serde_json::to_string(&decision).expect("serialize");
    let parsed: RunDecision = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decision, parsed);
}

#[test]
fn test_check_result_omits_missing_error() {
    let result = CheckResult {
        platform: Platform::Windows,
        compiled: true,
        tested: true,
        linted: None,
        error: None,
    };
    let json = serde_json::to_string(&result).expect("serialize");
    assert!(!json.contains("error"));
    assert!(json.contains("\"linted\":null"));
}

#[test]
fn test_pipeline_report_roundtrip() {
    let now = Utc::now();
    let report = PipelineReport {
        run_id: RunId::new(),
        event: TriggerEvent::new(EventKind::TagPush, "refs/tags/v1.2.0"),
        decision: RunDecision {
            run_check: true,
            run_release: true,
        },
        checks: CheckReport::default(),
        release_gate: false,
        releases: vec![ReleaseOutcome::failure(Platform::Linux, "upx exited with 1")],
        publish: None,
        status: PipelineStatus::Failure,
        started_at: now,
        completed_at: now,
        duration_ms: 12,
    };

    let json = serde_json::to_string(&report).expect("serialize");
    let parsed: PipelineReport = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(parsed.run_id, report.run_id);
    assert_eq!(parsed.event, report.event);
    assert_eq!(parsed.releases, report.releases);
    assert!(parsed.published_assets().is_empty());
    assert_eq!(ArchiveFormat::Zip.extension(), "zip");
}
