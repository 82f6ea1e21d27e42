use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tasklist-{nanos}-{file_name}"))
}

fn run(store_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tasklist"))
        .args(args)
        .env("TASKLIST_STORE_PATH", store_path)
        .env("TASKLIST_CONFIG_PATH", store_path.with_extension("config.json"))
        .env("TASKLIST_DISABLE_NOTIFICATIONS", "1")
        .env_remove("TASKLIST_LOG")
        .output()
        .expect("failed to run tasklist")
}

fn list_json(store_path: &Path, filter: &str) -> Vec<serde_json::Value> {
    let output = run(store_path, &["list", "--filter", filter, "--json"]);
    assert!(output.status.success());
    serde_json::from_slice::<serde_json::Value>(&output.stdout)
        .expect("list output is JSON")
        .as_array()
        .cloned()
        .expect("list output is an array")
}

#[test]
fn add_then_list_orders_by_priority_and_deadline() {
    let store_path = temp_path("cli-add-list.json");

    let added = run(
        &store_path,
        &["add", "Write report", "-p", "high", "--due", "2099-03-01", "--at", "09:30"],
    );
    assert!(added.status.success());
    assert!(String::from_utf8_lossy(&added.stdout).contains("Added task 1: Write report"));

    assert!(run(&store_path, &["add", "Buy milk", "-p", "low"]).status.success());
    assert!(
        run(&store_path, &["add", "Call bank", "-p", "high", "--due", "2099-01-15"])
            .status
            .success()
    );

    let tasks = list_json(&store_path, "all");
    let on_disk = std::fs::read_to_string(&store_path).unwrap();
    std::fs::remove_file(&store_path).ok();

    let titles: Vec<&str> = tasks
        .iter()
        .map(|task| task["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Call bank", "Write report", "Buy milk"]);
    assert_eq!(tasks[0]["deadline"], "2099-01-15 23:59");
    assert_eq!(tasks[1]["deadline"], "2099-03-01 09:30");
    assert_eq!(tasks[2]["deadline"], serde_json::Value::Null);

    let stored: serde_json::Value = serde_json::from_str(&on_disk).unwrap();
    assert_eq!(stored[0]["deadline"], "2099-03-01");
    assert_eq!(stored[0]["deadline_time"], "09:30:00");
    assert_eq!(stored[0]["priority"], "High");
}

#[test]
fn add_rejects_empty_title_and_past_deadline() {
    let store_path = temp_path("cli-add-invalid.json");

    let blank = run(&store_path, &["add", "   "]);
    let past = run(&store_path, &["add", "Old", "--due", "2000-01-01"]);
    let exists = store_path.exists();
    std::fs::remove_file(&store_path).ok();

    assert!(!blank.status.success());
    assert!(String::from_utf8_lossy(&blank.stderr).contains("validation_error - title is required"));
    assert!(!past.status.success());
    assert!(String::from_utf8_lossy(&past.stderr).contains("deadline must be in the future"));
    assert!(!exists);
}

#[test]
fn list_filters_by_kind() {
    let store_path = temp_path("cli-list-filter.json");
    let content = serde_json::json!([
        { "title": "late", "priority": "Low", "deadline": "2001-01-01" },
        { "title": "finished", "priority": "High", "completed": true },
        { "title": "later", "priority": "High", "deadline": "2099-01-01" }
    ]);
    std::fs::write(&store_path, content.to_string()).unwrap();

    let overdue = list_json(&store_path, "overdue");
    let high = list_json(&store_path, "high");
    let completed = list_json(&store_path, "completed");
    let plain = run(&store_path, &["list"]);
    let unknown = run(&store_path, &["list", "--filter", "someday"]);
    std::fs::remove_file(&store_path).ok();

    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["title"], "late");
    assert_eq!(overdue[0]["overdue"], true);
    assert_eq!(high.len(), 2);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["title"], "finished");

    assert!(plain.status.success());
    let stdout = String::from_utf8_lossy(&plain.stdout);
    assert!(stdout.contains("1 Overdue Task(s)"));
    assert!(stdout.contains("OVERDUE"));

    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("unknown filter 'someday'"));
}
