//! Integration tests for the survey-pivot CLI
//!
//! These tests exercise the binary end-to-end using assert_cmd against a
//! SQLite survey database built in a temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SCHEMA_SQL: &str = r#"
    CREATE TABLE Survey (SurveyId INTEGER PRIMARY KEY, SurveyDescription TEXT, Survey_UserAdminId INTEGER);
    CREATE TABLE Question (QuestionId INTEGER PRIMARY KEY, Question_Text TEXT);
    CREATE TABLE SurveyStructure (SurveyId INTEGER NOT NULL, QuestionId INTEGER NOT NULL);
    CREATE TABLE [User] (UserId INTEGER PRIMARY KEY, User_Name TEXT, User_Email TEXT);
    CREATE TABLE Answer (QuestionId INTEGER NOT NULL, SurveyId INTEGER NOT NULL,
                         UserId INTEGER NOT NULL, Answer_Value INTEGER);

    INSERT INTO Survey VALUES (1, 'Spring', 10), (2, 'Autumn', 10);
    INSERT INTO Question VALUES (1, 'Q one'), (2, 'Q two'), (3, 'Q three');
    INSERT INTO SurveyStructure VALUES (1, 1), (1, 2), (2, 1), (2, 3);
    INSERT INTO [User] VALUES (100, 'Ann', 'ann@example.com'), (200, 'Bob', 'bob@example.com');
    INSERT INTO Answer VALUES (1, 1, 100, 5), (2, 1, 100, 4), (1, 2, 200, 2), (3, 2, 200, 1);
"#;

/// Helper to get a survey-pivot command isolated from the user's config
fn survey_pivot(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("survey-pivot").unwrap();
    cmd.current_dir(tmp.path())
        .env_remove("SURVEY_PIVOT_CONFIG")
        .env_remove("RUST_LOG")
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".config"));
    cmd
}

/// Helper to create a project with a populated database and a config file
fn setup_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("data")).unwrap();
    let conn = Connection::open(db_path(&tmp)).unwrap();
    conn.execute_batch(SCHEMA_SQL).unwrap();

    fs::write(
        tmp.path().join("survey-pivot.yaml"),
        "server: data\ndatabase: Survey_Sample\ncache_dir: cache\n",
    )
    .unwrap();
    tmp
}

fn db_path(tmp: &TempDir) -> PathBuf {
    tmp.path().join("data/Survey_Sample.db")
}

fn structure_file(tmp: &TempDir) -> PathBuf {
    tmp.path().join("cache/struct_view.csv")
}

fn view_file(tmp: &TempDir) -> PathBuf {
    tmp.path().join("cache/saved_view.csv")
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    survey_pivot(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pivot"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    survey_pivot(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("survey-pivot"));
}

#[test]
fn test_missing_config_fails_before_connecting() {
    let tmp = TempDir::new().unwrap();
    survey_pivot(&tmp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No configuration file found"))
        .stdout(predicate::str::contains("connected").not());
}

#[test]
fn test_explicit_config_path() {
    let tmp = setup_project();
    let moved = tmp.path().join("elsewhere.yaml");
    fs::rename(tmp.path().join("survey-pivot.yaml"), &moved).unwrap();

    survey_pivot(&tmp)
        .args(["--config", moved.to_str().unwrap(), "sql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UNION"));
}

#[test]
fn test_connection_failure_is_reported() {
    let tmp = setup_project();
    fs::remove_file(db_path(&tmp)).unwrap();

    survey_pivot(&tmp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Connection failed"));
    assert!(!structure_file(&tmp).exists());
}

// ============================================================================
// Cache Decision Tests
// ============================================================================

#[test]
fn test_first_run_creates_cache_files() {
    let tmp = setup_project();

    survey_pivot(&tmp)
        .assert()
        .success()
        .stdout(predicate::str::contains("connected to"))
        .stdout(predicate::str::contains("No view of survey structure is saved"))
        .stdout(predicate::str::contains("Answer_3"));

    let structure = fs::read_to_string(structure_file(&tmp)).unwrap();
    assert!(structure.starts_with("SurveyId;QuestionId;IsAsked"));
    assert!(structure.contains("1;3;0"));
    assert!(structure.contains("2;2;0"));

    let view = fs::read_to_string(view_file(&tmp)).unwrap();
    assert!(view.starts_with(";UserId;SurveyId;Answer_1;Answer_2;Answer_3"));
    assert!(view.contains("0;100;1;5;4;"));
    assert!(view.contains("1;200;2;2;;1"));
}

#[test]
fn test_second_run_reuses_view() {
    let tmp = setup_project();
    survey_pivot(&tmp).arg("run").assert().success();

    survey_pivot(&tmp)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("hasn't been updated"))
        .stdout(predicate::str::contains("Loading previous view"));
}

#[test]
fn test_missing_view_falls_back_to_create() {
    let tmp = setup_project();
    survey_pivot(&tmp).assert().success();
    fs::remove_file(view_file(&tmp)).unwrap();

    survey_pivot(&tmp)
        .assert()
        .success()
        .stdout(predicate::str::contains("no view of all data is saved"));
    assert!(view_file(&tmp).is_file());
}

#[test]
fn test_structure_change_updates_cache() {
    let tmp = setup_project();
    survey_pivot(&tmp).assert().success();

    let conn = Connection::open(db_path(&tmp)).unwrap();
    conn.execute("INSERT INTO SurveyStructure VALUES (1, 3)", [])
        .unwrap();
    conn.execute("INSERT INTO Answer VALUES (3, 1, 100, 9)", [])
        .unwrap();
    drop(conn);

    survey_pivot(&tmp)
        .assert()
        .success()
        .stdout(predicate::str::contains("has been updated"));

    let structure = fs::read_to_string(structure_file(&tmp)).unwrap();
    assert!(structure.contains("1;3;1"));
    let view = fs::read_to_string(view_file(&tmp)).unwrap();
    assert!(view.contains("0;100;1;5;4;9"));
}

#[test]
fn test_run_json_preview() {
    let tmp = setup_project();
    let output = survey_pivot(&tmp)
        .args(["--quiet", "run", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[0]["UserId"], "100");
    assert!(rows[0]["Answer_3"].is_null());
}

// ============================================================================
// Other Commands
// ============================================================================

#[test]
fn test_sql_prints_union_of_blocks() {
    let tmp = setup_project();
    survey_pivot(&tmp)
        .args(["--quiet", "sql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\nUNION\n"))
        .stdout(predicate::str::contains("NULL AS Answer_3"))
        .stdout(predicate::str::contains("NULL AS Answer_2"))
        .stdout(predicate::str::contains("UNION ALL").not());
    assert!(!structure_file(&tmp).exists());
}

#[test]
fn test_sql_single_survey() {
    let tmp = setup_project();
    survey_pivot(&tmp)
        .args(["--quiet", "sql", "--survey", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 AS SurveyId"))
        .stdout(predicate::str::contains("UNION").not());
}

#[test]
fn test_structure_csv() {
    let tmp = setup_project();
    survey_pivot(&tmp)
        .args(["--quiet", "structure", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SurveyId;QuestionId;IsAsked"))
        .stdout(predicate::str::contains("2;3;1"));
}

#[test]
fn test_status_before_and_after_run() {
    let tmp = setup_project();
    survey_pivot(&tmp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not saved"));

    survey_pivot(&tmp).assert().success();

    survey_pivot(&tmp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fingerprint"))
        .stdout(predicate::str::contains("Rows:"));
}

#[test]
fn test_export_writes_all_answers() {
    let tmp = setup_project();
    survey_pivot(&tmp)
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("[all_view.csv] saved"));

    let export = fs::read_to_string(tmp.path().join("cache/all_view.csv")).unwrap();
    assert!(export.contains("ann@example.com"));
    assert!(export.contains("Q three"));
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();
    survey_pivot(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("survey-pivot"));
}
