use std::ffi::OsString;
use std::fs;
use std::path::Path;

use mrplan_core::config::Settings;
use mrplan_core::memory::{MemoryService, Seed};
use mrplan_core::scenario::{Driver, Outcome, Scenario};
use mrplan_shared::{Bucket, Intent};
use tempfile::tempdir;

const SEED: &str = r#"{
  "user": "ana",
  "projects": [{ "name": "Home" }],
  "tasks": [
    { "title": "Read", "section": "inbox" },
    { "title": "Laundry", "section": "today", "estimatedTime": 60, "project": "Home" },
    { "title": "Old", "section": "next", "completed": true },
    { "title": "Dangling", "section": "someday", "projectId": "7d4e1c52-2f1a-4a8e-9b7e-3c1f0e6a9d21" }
  ]
}"#;

const SCENARIO: &str = r#"{
  "name": "morning",
  "steps": [
    { "step": "sign_in" },
    { "step": "drag_start", "task": "Read" },
    { "step": "drag_enter", "bucket": "next" },
    { "step": "drop", "bucket": "next" },
    { "step": "tap_complete", "task": "Laundry" },
    { "step": "open_add_task" },
    { "step": "open_calendar" },
    { "step": "set_draft_title", "title": "Buy milk" },
    { "step": "toggle_draft_time", "minutes": 30 },
    { "step": "submit_add_task" },
    { "step": "tap_options", "task": "Dangling" },
    { "step": "menu_delete" },
    { "step": "confirm_delete" },
    { "step": "pan_begin" },
    { "step": "pan_update", "dx": -300 },
    { "step": "pan_end" },
    { "step": "advance", "ms": 3000 }
  ]
}"#;

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write fixture");
    path
}

#[test]
fn seeded_scenario_replays_to_expected_board() {
    let temp = tempdir().expect("tempdir");
    let seed = Seed::load(&write(temp.path(), "seed.json", SEED)).expect("load seed");
    let scenario =
        Scenario::load(&write(temp.path(), "run.json", SCENARIO)).expect("load scenario");

    let service = MemoryService::with_seed(&seed).expect("seed service");
    let mut driver = Driver::new(service, Settings::default(), Some(seed.user.clone()));
    let report = driver.run(&scenario);

    assert_eq!(report.name, "morning");
    let outcomes: Vec<(&str, Outcome)> =
        report.steps.iter().map(|s| (s.step, s.outcome)).collect();
    assert_eq!(outcomes[6], ("open_calendar", Outcome::Rejected));
    assert!(
        outcomes
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != 6)
            .all(|(_, (_, outcome))| *outcome == Outcome::Applied),
        "{outcomes:?}"
    );

    let ops: Vec<&str> = report
        .intents
        .iter()
        .map(|intent| match intent {
            Intent::Create { .. } => "create",
            Intent::Update { .. } => "update",
            Intent::Delete { .. } => "delete",
        })
        .collect();
    assert_eq!(ops, vec!["update", "update", "create", "delete"]);

    let column = |bucket: Bucket| -> Vec<String> {
        report
            .board
            .iter()
            .find(|c| c.bucket == bucket)
            .map(|c| c.tasks.iter().map(|t| t.title.clone()).collect())
            .unwrap_or_default()
    };
    assert!(column(Bucket::Inbox).is_empty());
    assert_eq!(column(Bucket::Today), vec!["Laundry", "Buy milk"]);
    assert_eq!(column(Bucket::Next), vec!["Read"]);
    assert!(column(Bucket::Someday).is_empty());

    assert_eq!(report.status.overlay, "none");
    assert_eq!(report.status.drawer, "open");
    assert_eq!(report.projects.len(), 1);
}

#[test]
fn seed_with_unknown_project_name_is_an_error() {
    let seed: Seed = serde_json::from_str(
        r#"{ "user": "ana", "tasks": [{ "title": "X", "project": "Nowhere" }] }"#,
    )
    .expect("parse seed");
    let err = MemoryService::with_seed(&seed).err().expect("seed error");
    assert!(format!("{err:#}").contains("Nowhere"));
}

#[test]
fn cli_runs_scenario_end_to_end() {
    let temp = tempdir().expect("tempdir");
    let rc = write(temp.path(), "mrplanrc", "color = off\ndrawer.fraction = 0.8\n");
    let seed = write(temp.path(), "seed.json", SEED);
    let scenario = write(temp.path(), "run.json", SCENARIO);

    let args: Vec<OsString> = vec![
        "mrplan".into(),
        "--mrplanrc".into(),
        rc.into_os_string(),
        "--seed".into(),
        seed.into_os_string(),
        "--json".into(),
        "rc.overlay.edit_delay_ms=0".into(),
        scenario.into_os_string(),
    ];
    mrplan_core::run(args).expect("run scenario");
}

#[test]
fn cli_reports_missing_scenario_file() {
    let temp = tempdir().expect("tempdir");
    let rc = write(temp.path(), "mrplanrc", "");
    let args: Vec<OsString> = vec![
        "mrplan".into(),
        "--mrplanrc".into(),
        rc.into_os_string(),
        temp.path().join("missing.json").into_os_string(),
    ];
    let err = mrplan_core::run(args).expect_err("missing scenario");
    assert!(format!("{err:#}").contains("failed to read scenario"));
}

#[test]
fn cli_rejects_bad_config_values() {
    let temp = tempdir().expect("tempdir");
    let rc = write(temp.path(), "mrplanrc", "drawer.fraction = wide\n");
    let scenario = write(temp.path(), "run.json", r#"{ "steps": [] }"#);
    let args: Vec<OsString> = vec![
        "mrplan".into(),
        "--mrplanrc".into(),
        rc.into_os_string(),
        scenario.into_os_string(),
    ];
    let err = mrplan_core::run(args).expect_err("bad config");
    assert!(format!("{err:#}").contains("drawer.fraction"));
}
