#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A channel that refuses connections immediately.
const DEAD_CHANNEL: &str = "http://127.0.0.1:1/hook";

fn standup(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("standup").unwrap();
    cmd.current_dir(dir.path()).env("STANDUP_ROOT", dir.path());
    cmd
}

fn init(dir: &TempDir) {
    standup(dir).arg("init").assert().success();
}

fn config_json(dir: &TempDir, workspace: &str) -> serde_json::Value {
    let out = standup(dir)
        .args(["config", "show", workspace, "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    serde_json::from_slice(&out.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// standup init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_settings_and_database() {
    let dir = TempDir::new().unwrap();
    standup(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .standup/standup.yaml"));

    assert!(dir.path().join(".standup").is_dir());
    assert!(dir.path().join(".standup/standup.db").exists());

    let raw = std::fs::read_to_string(dir.path().join(".standup/standup.yaml")).unwrap();
    let yaml: serde_yaml::Value = serde_yaml::from_str(&raw).unwrap();
    assert_eq!(yaml["listen"].as_str(), Some("0.0.0.0:3141"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .standup/standup.yaml"));
}

#[test]
fn commands_before_init_fail() {
    let dir = TempDir::new().unwrap();
    standup(&dir)
        .args(["config", "show", "team"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("standup init"));
}

// ---------------------------------------------------------------------------
// standup config
// ---------------------------------------------------------------------------

#[test]
fn config_show_creates_defaults() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["config", "show", "team"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trigger_time"))
        .stdout(predicate::str::contains("09:00"));

    standup(&dir)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("team"));
}

#[test]
fn config_set_updates_schedule() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args([
            "config",
            "set",
            "team",
            "--trigger-time",
            "7:30",
            "--timezone",
            "Asia/Manila",
            "--lookback-hours",
            "4",
        ])
        .assert()
        .success();

    let json = config_json(&dir, "team");
    assert_eq!(json["trigger_time"], "07:30");
    assert_eq!(json["timezone"], "Asia/Manila");
    assert_eq!(json["lookback_hours"], 4);
}

#[test]
fn invalid_values_are_rejected_without_changes() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["config", "set", "team", "--trigger-time", "25:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid trigger time"));
    standup(&dir)
        .args([
            "config",
            "set",
            "team",
            "--trigger-time",
            "08:00",
            "--timezone",
            "Mars/Olympus",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Mars/Olympus"));
    standup(&dir)
        .args(["config", "set", "team", "--lookback-hours", "25"])
        .assert()
        .failure();

    let json = config_json(&dir, "team");
    assert_eq!(json["trigger_time"], "09:00");
    assert_eq!(json["timezone"], "UTC");
}

#[test]
fn config_set_requires_a_change() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["config", "set", "team"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to change"));
}

#[test]
fn roster_admin_and_exclusions() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["config", "member", "team", "alice", "bob", "carol"])
        .assert()
        .success();
    standup(&dir)
        .args(["config", "member", "team", "carol", "--remove"])
        .assert()
        .success();
    standup(&dir)
        .args(["config", "exclude", "team", "bob"])
        .assert()
        .success();
    standup(&dir)
        .args(["config", "admin", "team", "alice"])
        .assert()
        .success();

    let json = config_json(&dir, "team");
    assert_eq!(json["members"], serde_json::json!(["alice", "bob"]));
    assert_eq!(json["excluded_members"], serde_json::json!(["bob"]));
    assert_eq!(json["admin_members"], serde_json::json!(["alice"]));

    standup(&dir)
        .args(["config", "include", "team", "bob"])
        .assert()
        .success();
    let json = config_json(&dir, "team");
    assert_eq!(json["excluded_members"], serde_json::json!([]));
}

#[test]
fn skip_dates_round_through_config() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["config", "skip", "team", "2026-12-24", "2026-12-26"])
        .assert()
        .success();
    standup(&dir)
        .args(["config", "skip", "team", "2026-12-26", "--remove"])
        .assert()
        .success();
    standup(&dir)
        .args(["config", "skip", "team", "24/12/2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date"));

    let json = config_json(&dir, "team");
    assert_eq!(json["manual_skip_dates"], serde_json::json!(["2026-12-24"]));
}

#[test]
fn invalid_workspace_id_is_rejected() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["config", "show", "bad id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid id"));
}

// ---------------------------------------------------------------------------
// standup open / summary
// ---------------------------------------------------------------------------

#[test]
fn open_without_channel_fails() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["open", "team"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no standup channel"));
}

#[test]
fn summary_before_any_session_fails() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["summary", "team"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no standup session"));
}

#[test]
fn open_with_unreachable_channel_leaves_no_session() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["config", "set", "team", "--channel", DEAD_CHANNEL])
        .assert()
        .success();
    standup(&dir).args(["open", "team"]).assert().failure();
    standup(&dir)
        .args(["summary", "team"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no standup session"));
}

// ---------------------------------------------------------------------------
// standup tick
// ---------------------------------------------------------------------------

#[test]
fn tick_with_no_workspaces() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .arg("tick")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 workspace(s)"));
}

#[test]
fn tick_outside_trigger_window_does_nothing() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["config", "set", "team", "--channel", DEAD_CHANNEL])
        .assert()
        .success();

    let out = standup(&dir)
        .args(["tick", "--at", "2026-10-19T12:00:00Z", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["workspaces"], 1);
    assert_eq!(report["opened"], serde_json::json!([]));
    assert_eq!(report["failed"], serde_json::json!([]));
}

#[test]
fn tick_reports_failed_open() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["config", "set", "team", "--channel", DEAD_CHANNEL])
        .assert()
        .success();

    // Monday 2026-10-19, inside the 09:00 UTC trigger window.
    standup(&dir)
        .args(["tick", "--at", "2026-10-19T09:00:10Z"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed"))
        .stdout(predicate::str::contains("team"))
        .stderr(predicate::str::contains("1 workspace(s) failed"));
}

#[test]
fn tick_rejects_malformed_instant() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    standup(&dir)
        .args(["tick", "--at", "tomorrow morning"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RFC 3339"));
}
