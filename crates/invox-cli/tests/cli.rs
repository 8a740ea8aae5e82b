//! Command-line smoke tests. The service is disabled and no OCR models are
//! installed, so every run goes through the local fallbacks.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn invox(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("invox").unwrap();
    cmd.current_dir(dir);
    cmd
}

/// Write an offline config into `dir` and return its path as a string.
fn offline_config(dir: &Path, persist_placeholder_runs: bool) -> String {
    let config = json!({
        "service": { "enabled": false },
        "models": { "model_dir": dir.join("models") },
        "intake": {
            "input_dir": dir.join("invoices"),
            "processed_log": dir.join("processed.json"),
            "persist_placeholder_runs": persist_placeholder_runs
        },
        "storage": { "db_path": dir.join("invoice.sqlite") }
    });
    let path = dir.join("config.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    invox(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("notify"));
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(dir.path(), false);

    invox(dir.path())
        .args(["process", "missing.png", "--config", &config])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_offline_uses_fallbacks() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(dir.path(), false);
    fs::write(dir.path().join("scan.png"), b"not really a png").unwrap();

    invox(dir.path())
        .args(["process", "scan.png", "--persist", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"vendor\": \"ACME Corp\""))
        .stdout(predicate::str::contains("\"valid\": true"))
        .stderr(predicate::str::contains("Not storing scan.png"));

    invox(dir.path())
        .args(["list", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("No invoices stored yet."));
}

#[test]
fn test_process_text_format() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(dir.path(), false);
    fs::write(dir.path().join("scan.jpg"), b"x").unwrap();

    invox(dir.path())
        .args(["process", "scan.jpg", "-f", "text", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vendor: ACME Corp"))
        .stdout(predicate::str::contains("Total: 1000.00 USD"))
        .stdout(predicate::str::contains("Valid: yes"));
}

#[test]
fn test_watch_once_records_seen_files() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(dir.path(), true);
    fs::create_dir_all(dir.path().join("invoices")).unwrap();
    fs::write(dir.path().join("invoices").join("a.png"), b"x").unwrap();
    fs::write(dir.path().join("invoices").join("notes.txt"), b"x").unwrap();

    invox(dir.path())
        .args(["watch", "--once", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.png stored as #1"));

    let seen = fs::read_to_string(dir.path().join("processed.json")).unwrap();
    assert_eq!(serde_json::from_str::<Vec<String>>(&seen).unwrap(), vec!["a.png"]);

    // Second scan finds nothing new
    invox(dir.path())
        .args(["watch", "--once", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("stored as").not());

    invox(dir.path())
        .args(["list", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("ACME Corp"))
        .stdout(predicate::str::contains("Showing 1 of 1 invoices"));
}

#[test]
fn test_watch_continues_after_store_failure() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(dir.path(), true);
    let invoices = dir.path().join("invoices");
    fs::create_dir_all(&invoices).unwrap();
    for name in ["a.png", "bad.png", "c.png"] {
        fs::write(invoices.join(name), b"x").unwrap();
    }

    // Inserts for one file abort, as they would on a full or locked database
    let conn = rusqlite::Connection::open(dir.path().join("invoice.sqlite")).unwrap();
    conn.execute_batch(
        "CREATE TABLE invoices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name TEXT, vendor TEXT, number TEXT, date TEXT, total REAL,
            currency TEXT, raw_json TEXT, created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TRIGGER reject_bad BEFORE INSERT ON invoices
        WHEN NEW.file_name = 'bad.png'
        BEGIN SELECT RAISE(ABORT, 'database or disk is full'); END;",
    )
    .unwrap();
    drop(conn);

    invox(dir.path())
        .args(["watch", "--once", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.png stored as #1"))
        .stdout(predicate::str::contains("c.png stored as #2"))
        .stdout(predicate::str::contains("bad.png stored").not())
        .stderr(predicate::str::contains("Failed to store bad.png"));

    let seen = fs::read_to_string(dir.path().join("processed.json")).unwrap();
    assert_eq!(
        serde_json::from_str::<Vec<String>>(&seen).unwrap(),
        vec!["a.png", "c.png"]
    );
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("conf").join("config.json");
    let config = config.to_string_lossy().into_owned();

    invox(dir.path())
        .args(["config", "path", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("not created"));

    invox(dir.path())
        .args(["config", "init", "--config", &config])
        .assert()
        .success();

    invox(dir.path())
        .args(["config", "get", "service.model", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("gpt-4.1-nano"));

    invox(dir.path())
        .args(["config", "set", "intake.poll_secs", "30", "--config", &config])
        .assert()
        .success();

    invox(dir.path())
        .args(["config", "get", "intake.poll_secs", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("30"));

    invox(dir.path())
        .args(["config", "set", "intake.no_such_key", "1", "--config", &config])
        .assert()
        .failure();
}

#[test]
fn test_notify_without_sender_fails() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(dir.path(), false);

    invox(dir.path())
        .args(["notify", "someone@example.com", "--config", &config])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No sender configured"));
}
