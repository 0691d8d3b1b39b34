// Drives the compiled binary through its headless flags. These never start
// the TUI, so no TTY is needed.

use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

use splitwatch::persist::{SessionDb, SessionStore};

fn splitwatch() -> Command {
    Command::cargo_bin("splitwatch").unwrap()
}

#[test]
fn template_import_export_cycle() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("session.db");
    let template = dir.path().join("template.csv");
    let export = dir.path().join("out.csv");

    splitwatch()
        .arg("--db")
        .arg(&db)
        .arg("--template")
        .arg(&template)
        .assert()
        .success();
    let text = fs::read_to_string(&template).unwrap();
    assert!(text.starts_with("Nama Pelari\n"));

    let output = splitwatch()
        .arg("--db")
        .arg(&db)
        .arg("--import")
        .arg(&template)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Imported 4 runners"));

    let snapshot = SessionDb::open(&db).unwrap().load();
    let names: Vec<&str> = snapshot
        .runners
        .runners()
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["Runner 1", "Budi Santoso", "Siti Aminah", "Ahmad Yani", "Dewi Sartika"]
    );

    // nothing has been timed yet
    splitwatch()
        .arg("--db")
        .arg(&db)
        .arg("--export")
        .arg(&export)
        .assert()
        .failure();
    assert!(!export.exists());
}

#[test]
fn export_writes_recorded_splits() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("session.db");
    let export = dir.path().join("out.csv");

    {
        let mut db = SessionDb::open(&db_path).unwrap();
        let mut snapshot = db.load();
        snapshot.runners.rename(1, "Budi").unwrap();
        snapshot.runners.record_split(1, 61_000).unwrap();
        snapshot.elapsed_ms = 70_000;
        db.save(&snapshot).unwrap();
    }

    splitwatch()
        .arg("--db")
        .arg(&db_path)
        .arg("--export")
        .arg(&export)
        .assert()
        .success();

    let csv = fs::read_to_string(&export).unwrap();
    assert_eq!(
        csv,
        "Peringkat,Nama Pelari,Lap #,Waktu Lap,Waktu Total,Status\n\
         -,Budi,1,01:01.00,01:01.00,Split\n"
    );
}

#[test]
fn reset_clears_laps_and_clock() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("session.db");

    {
        let mut db = SessionDb::open(&db_path).unwrap();
        let mut snapshot = db.load();
        snapshot.runners.record_split(1, 5_000).unwrap();
        snapshot.elapsed_ms = 6_000;
        db.save(&snapshot).unwrap();
    }

    splitwatch()
        .arg("--db")
        .arg(&db_path)
        .arg("--reset")
        .assert()
        .success();

    let snapshot = SessionDb::open(&db_path).unwrap().load();
    assert_eq!(snapshot.elapsed_ms, 0);
    assert_eq!(snapshot.runners.len(), 1);
    assert!(!snapshot.runners.has_splits());
}

#[test]
fn without_a_tty_the_tui_refuses_to_start() {
    let dir = tempdir().unwrap();
    splitwatch()
        .arg("--db")
        .arg(dir.path().join("session.db"))
        .write_stdin("")
        .assert()
        .failure();
}
