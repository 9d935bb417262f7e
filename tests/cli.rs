use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_snapshot(dir: &Path, rich_text: &str) -> std::path::PathBuf {
    let path = dir.join("readme.json");
    let snapshot = serde_json::json!({
        "richText": rich_text,
        "textAreaObjectFields": [],
        "objectIdPairs": [ { "id": 7, "name": "Main Camera", "objectRef": "Main Camera" } ]
    });
    fs::write(&path, snapshot.to_string()).unwrap();
    path
}

#[test]
#[allow(deprecated)]
fn test_poor_prints_stripped_text() {
    let dir = tempdir().unwrap();
    let path = write_snapshot(dir.path(), "<b>Hi</b> <color=red>there</color>");

    let mut cmd = Command::cargo_bin("rich-readme").unwrap();
    cmd.arg("poor").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::diff("Hi there\n"));
}

#[test]
#[allow(deprecated)]
fn test_check_reports_imbalance() {
    let dir = tempdir().unwrap();
    let path = write_snapshot(dir.path(), "<b>bold");

    let mut cmd = Command::cargo_bin("rich-readme").unwrap();
    cmd.arg("check").arg(&path);

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("never closed"));
}

#[test]
#[allow(deprecated)]
fn test_check_accepts_balanced_text() {
    let dir = tempdir().unwrap();
    let path = write_snapshot(dir.path(), "<i>fine</i>");

    let mut cmd = Command::cargo_bin("rich-readme").unwrap();
    cmd.arg("check").arg(&path);

    cmd.assert().success().stdout(predicate::str::contains("balanced"));
}

#[test]
#[allow(deprecated)]
fn test_toggle_writes_back() {
    let dir = tempdir().unwrap();
    let path = write_snapshot(dir.path(), "Hi there");

    let mut cmd = Command::cargo_bin("rich-readme").unwrap();
    cmd.args(["toggle", "--tag", "bold", "--start", "0", "--len", "2", "--write"])
        .arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<b>Hi</b> there"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["richText"], "<b>Hi</b> there");
}

#[test]
#[allow(deprecated)]
fn test_toggle_without_write_leaves_file() {
    let dir = tempdir().unwrap();
    let path = write_snapshot(dir.path(), "Hi there");
    let before = fs::read_to_string(&path).unwrap();

    let mut cmd = Command::cargo_bin("rich-readme").unwrap();
    cmd.args(["toggle", "--tag", "italic", "--start", "3", "--len", "5"])
        .arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Hi <i>there</i>"));

    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
#[allow(deprecated)]
fn test_fields_json_lists_resolved_names() {
    let dir = tempdir().unwrap();
    let path = write_snapshot(dir.path(), r#"Look at <o="0000007"></o> and <o="0000009"></o>"#);

    let mut cmd = Command::cargo_bin("rich-readme").unwrap();
    cmd.arg("fields").arg("--json").arg(&path);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let fields = json.as_array().unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0]["objectId"], 7);
    assert_eq!(fields[0]["index"], 8);
    assert_eq!(fields[0]["name"], "Main Camera");
    assert_eq!(fields[1]["objectId"], 9);
    assert!(fields[1]["name"].is_null());
}

#[test]
#[allow(deprecated)]
fn test_malformed_snapshot_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ nope").unwrap();

    let mut cmd = Command::cargo_bin("rich-readme").unwrap();
    cmd.arg("poor").arg(&path);

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("malformed snapshot"));
}
