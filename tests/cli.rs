//! End-to-end runs of the `sales-pipeline` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn pipeline(dir: &Path, config: &str) -> Command {
    let config_path = dir.join("pipeline.toml");
    fs::write(&config_path, config).unwrap();

    let mut cmd = Command::cargo_bin("sales-pipeline").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("STORE_BACKEND")
        .arg("-c")
        .arg(&config_path);
    cmd
}

#[test]
fn failed_stage_is_reported_once() {
    let dir = TempDir::new().unwrap();

    let output = pipeline(dir.path(), "store_backend = \"memory\"\n")
        .args(["run", "map"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr
            .matches("map: input object 'Preprocessed.csv' not present in the bucket")
            .count(),
        1,
        "stderr was: {stderr}"
    );
}

#[test]
fn generate_then_run_all_against_a_local_bucket() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bucket");
    fs::create_dir(&root).unwrap();
    let config = format!(
        "store_backend = \"local\"\nlocal_root = {:?}\n",
        root.display().to_string()
    );

    pipeline(dir.path(), &config)
        .args(["generate", "-n", "200", "--seed", "7"])
        .assert()
        .success();
    pipeline(dir.path(), &config).arg("run-all").assert().success();

    pipeline(dir.path(), &config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dataset.csv"))
        .stdout(predicate::str::contains("Final_Output.csv"));

    pipeline(dir.path(), &config)
        .args(["run", "preprocess"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already present in the bucket"));
}
