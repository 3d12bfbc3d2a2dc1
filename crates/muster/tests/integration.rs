//! Integration tests for muster
//!
//! These tests verify the end-to-end behavior: policy file, registry,
//! event batch, evaluation and the command line driver.

use chrono::NaiveDate;
use muster_api::{EventBatch, MemberInfo, RawEvent};
use muster_config::{Config, parse_config};
use muster_core::{BatchEvaluator, CoreError, PolicyRegistry};
use muster_util::{Calendar, MemberId, TimeOfDay};
use std::io::Write;
use std::process::{Command, Output};

const POLICY_FILE: &str = r#"
config_version = 1

[settings]
frequency_filter_seconds = 60
utc_offset = "+08:00"

[[policies]]
name = "weekend-lab"
flex_threshold = { default = 14, categories = { competitor = 16 } }
regular = "sat"
window = { start = "12:00", end = "17:00" }

[[policies]]
name = "winter-camp"

[policies.training]
range = { from = "2025-01-20", to = "2025-01-23" }
window = { start = "09:00", end = "17:00" }
"#;

fn cal() -> Calendar {
    Calendar::fixed(8 * 3600).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
    let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    cal()
        .timestamp_at(date, TimeOfDay::from_hms(h, min, 0).unwrap())
        .unwrap()
}

fn load() -> (Config, PolicyRegistry) {
    let config = parse_config(POLICY_FILE).unwrap();
    let registry = PolicyRegistry::with_builtins().unwrap();
    registry.load_config(&config).unwrap();
    (config, registry)
}

#[test]
fn test_weekly_policy_end_to_end() {
    let (config, registry) = load();

    let roster = vec![
        MemberInfo::new("a01", "competitor"),
        MemberInfo::new("b02", "full-member"),
    ];
    // a01: a noisy double scan, then a full Saturday afternoon and a long Sunday
    // b02: a Saturday session that ends early
    let events = vec![
        RawEvent::new("a01", at(2024, 10, 5, 12, 0)),
        RawEvent::new("a01", at(2024, 10, 5, 12, 0) + 30),
        RawEvent::new("a01", at(2024, 10, 5, 17, 0)),
        RawEvent::new("a01", at(2024, 10, 6, 8, 0)),
        RawEvent::new("a01", at(2024, 10, 6, 20, 0)),
        RawEvent::new("b02", at(2024, 10, 5, 12, 0)),
        RawEvent::new("b02", at(2024, 10, 5, 14, 0)),
        // Trailing unpaired scan
        RawEvent::new("b02", at(2024, 10, 6, 9, 0)),
    ];
    let source = muster_api::EventSource::from_raw_events(events);

    let report = BatchEvaluator::from_settings(&registry, &config.settings)
        .run("weekend-lab", &roster, &source)
        .unwrap();

    let a01 = report.result_for(&MemberId::new("A01")).unwrap();
    assert_eq!(a01.seconds, "17:00");
    assert_eq!(a01.flex_count, 17);
    assert_eq!(a01.regular_count, 1);
    assert_eq!(a01.violation_count, 0);

    let b02 = report.result_for(&MemberId::new("B02")).unwrap();
    assert_eq!(b02.seconds, "02:00");
    assert_eq!(b02.flex_count, 2);
    assert_eq!(b02.regular_count, 0);
    assert_eq!(b02.violation_count, 2);

    assert_eq!(report.total_violations(), 2);
    assert!(report.failures.is_empty());
}

#[test]
fn test_training_policy_end_to_end() {
    let (config, registry) = load();

    let roster = vec![MemberInfo::new("c03", "")];
    let events = (20..=22).flat_map(|d| {
        [
            RawEvent::new("c03", at(2025, 1, d, 9, 0)),
            RawEvent::new("c03", at(2025, 1, d, 17, 0)),
        ]
    });
    let source = muster_api::EventSource::from_raw_events(events);

    let report = BatchEvaluator::from_settings(&registry, &config.settings)
        .run("winter-camp", &roster, &source)
        .unwrap();

    let c03 = &report.results[0].result;
    assert_eq!(c03.regular_count, 3);
    assert_eq!(c03.flex_count, 0);
    assert_eq!(c03.violation_count, 1);
}

#[test]
fn test_runtime_registration_is_visible_to_batches() {
    let (config, registry) = load();
    let roster = vec![MemberInfo::new("a01", "")];
    let source = muster_api::EventSource::from_raw_events(vec![
        RawEvent::new("a01", at(2024, 10, 7, 9, 0)),
        RawEvent::new("a01", at(2024, 10, 7, 12, 0)),
    ]);
    let batch = BatchEvaluator::from_settings(&registry, &config.settings);

    assert!(matches!(
        batch.run("three-hours", &roster, &source),
        Err(CoreError::PolicyNotFound(_))
    ));

    registry
        .register_json(r#"{ "name": "three-hours", "flex_threshold": 3, "regular": "none" }"#)
        .unwrap();

    let report = batch.run("three-hours", &roster, &source).unwrap();
    assert_eq!(report.results[0].result.flex_count, 3);
    assert_eq!(report.results[0].result.violation_count, 0);
}

#[test]
fn test_batch_document_round_trip() {
    let (config, registry) = load();
    let json = format!(
        r#"{{
            "members": [{{ "id": "a01", "category": "competitor", "name": "Lin" }}, {{ "id": "" }}],
            "records": {{ "A01": {{ "sessions": [{{ "start": {}, "end": {} }}] }} }}
        }}"#,
        at(2024, 10, 5, 12, 0),
        at(2024, 10, 5, 17, 0)
    );

    let (roster, source) = EventBatch::from_json(&json).unwrap().into_parts();
    let report = BatchEvaluator::from_settings(&registry, &config.settings)
        .run("weekend-lab", &roster, &source)
        .unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["policy"], "weekend-lab");
    assert_eq!(value["results"][0]["member_id"], "A01");
    assert_eq!(value["results"][0]["seconds"], "05:00");
    assert_eq!(value["results"][0]["regular_count"], 1);
    assert_eq!(value["failures"][0]["member_id"], "");
}

fn muster(args: &[&str], stdin: Option<&str>) -> Output {
    let home = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_muster"))
        .args(args)
        .env_remove("MUSTER_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", home.path())
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }
    child.wait_with_output().unwrap()
}

#[test]
fn test_cli_lists_builtin_policies_without_config() {
    let output = muster(&["policies"], None);
    assert!(output.status.success());

    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"term-regular"));
    assert!(names.contains(&"october-training-2024"));
}

#[test]
fn test_cli_evaluates_with_policy_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(POLICY_FILE.as_bytes()).unwrap();
    let config_path = file.path().to_str().unwrap().to_string();

    let batch = format!(
        r#"{{
            "members": [{{ "id": "a01", "category": "competitor" }}],
            "events": [
                {{ "member_id": "a01", "timestamp": {} }},
                {{ "member_id": "a01", "timestamp": {} }}
            ]
        }}"#,
        at(2024, 10, 5, 12, 0),
        at(2024, 10, 5, 17, 0)
    );

    let output = muster(
        &["--config", &config_path, "evaluate", "--policy", "weekend-lab"],
        Some(&batch),
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["results"][0]["seconds"], "05:00");
    assert_eq!(report["results"][0]["flex_count"], 5);
    assert_eq!(report["results"][0]["violation_count"], 1);
}

#[test]
fn test_cli_rejects_unknown_policy() {
    let output = muster(
        &["evaluate", "--policy", "missing"],
        Some(r#"{ "members": [] }"#),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing"));
}

#[test]
fn test_cli_reports_invalid_policy_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"config_version = 1\n\n[[policies]]\nname = \"x\"\nregular = \"sat\"\n")
        .unwrap();
    let config_path = file.path().to_str().unwrap().to_string();

    let output = muster(&["--config", &config_path, "policies"], None);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("window"));
}
