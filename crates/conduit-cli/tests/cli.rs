//! End-to-end runs of the `cdt` binary against a file source and a
//! file-backed store in a temp directory.

use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use serde_json::Value;

fn write_fixture(dir: &Path) {
    let data = dir.join("data");
    std::fs::create_dir_all(&data).unwrap();
    let lines = [
        r#"{"id":"a","timestamp":"2024-01-02T03:04:05Z","location":{"city":"Houston","state":"TX"},"pipe":{"material":"PVC"},"inspection_score":80,"requires_repair":false,"defects":[{"type":"crack","severity":"minor"}]}"#,
        "{broken",
        r#"{"id":"b","timestamp":"2024-02-02T03:04:05Z","location":{"city":"Austin","state":"TX"},"pipe":{"material":"Clay"},"inspection_score":45,"requires_repair":true}"#,
    ];
    std::fs::write(data.join("a.jsonl"), lines.join("\n")).unwrap();
    std::fs::write(
        dir.join("conduit.toml"),
        format!(
            "[source]\nbase_url = \"{}\"\nsources = [\"a.jsonl\"]\n\n[store]\npath = \"{}\"\n",
            data.display(),
            dir.join("store").join("conduit.db").display()
        ),
    )
    .unwrap();
}

fn cdt(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cdt"));
    command
        .current_dir(dir)
        .arg("--quiet")
        .arg("--config")
        .arg(dir.join("conduit.toml"))
        .args(args);
    for (key, _) in std::env::vars() {
        if key.starts_with("CONDUIT_") {
            command.env_remove(key);
        }
    }
    command.output().unwrap()
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn import_then_query() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let report = json(&cdt(dir.path(), &["import"]));
    assert_eq!(report["sources"][0]["status"], "completed");
    assert_eq!(report["sources"][0]["records_imported"], 2);
    assert_eq!(report["sources"][0]["errors"], 1);

    let page = json(&cdt(dir.path(), &["search", "--city", "houston"]));
    assert_eq!(page["backend"], "indexed");
    assert_eq!(page["total_count"], 1);
    assert_eq!(page["results"][0]["id"], "a");

    let page = json(&cdt(dir.path(), &["search", "--requires-repair", "true", "--backend", "streaming"]));
    assert_eq!(page["backend"], "streaming");
    assert_eq!(page["results"][0]["id"], "b");

    let status = json(&cdt(dir.path(), &["status", "a.jsonl"]));
    assert_eq!(status["resumable"], false);
    assert_eq!(status["latest"]["status"], "completed");

    let history = json(&cdt(dir.path(), &["history"]));
    assert_eq!(history.as_array().map(Vec::len), Some(1));

    let stats = json(&cdt(dir.path(), &["stats"]));
    assert_eq!(stats["total_inspections"], 2);
    assert_eq!(stats["requires_repair"], 1);

    let check = json(&cdt(dir.path(), &["check"]));
    assert_eq!(check["ok"], true);
}

#[test]
fn reimport_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    json(&cdt(dir.path(), &["import"]));
    let second = json(&cdt(dir.path(), &["import"]));
    assert_eq!(second["sources"][0]["records_imported"], 0);
}

#[test]
fn resume_without_history_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let report = json(&cdt(dir.path(), &["import", "a.jsonl", "--resume"]));
    assert_eq!(report["sources"][0]["status"], "completed");
}

#[test]
fn jsonl_search_prints_one_record_per_line() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    json(&cdt(dir.path(), &["import"]));

    let output = cdt(dir.path(), &["--format", "jsonl", "search"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let ids = stdout
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["id"].clone())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![Value::from("b"), Value::from("a")]);
}

#[test]
fn schema_needs_no_config() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_cdt"))
        .current_dir(dir.path())
        .args(["schema", "checkpoint"])
        .output()
        .unwrap();
    let schema = json(&output);
    assert_eq!(schema["title"], "ImportCheckpoint");
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    std::fs::write(
        dir.path().join("conduit.toml"),
        "[import]\nchunk_size = 10\nbatch_size = 50\n",
    )
    .unwrap();

    let output = cdt(dir.path(), &["stats"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("import.batch_size"), "stderr: {stderr}");
}
