mod common;

use common::helpers::{run_extpack, stderr, stdout, write_descriptor, write_package};
use std::fs;
use tempfile::TempDir;

// ===== METADATA COMMAND TESTS =====

#[test]
fn metadata_reports_identity_without_building() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), "rustyknife", "0.1.3");

    let output = run_extpack(temp.path(), &["metadata"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("name: rustyknife"));
    assert!(out.contains("version: 0.1.3"));
    assert!(!temp.path().join("build").exists());
}

#[test]
fn metadata_json() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), "rustyknife", "0.1.3");

    let output = run_extpack(temp.path(), &["metadata", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["full-name"], "rustyknife-0.1.3");
}

#[test]
fn metadata_rejects_unknown_binding() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("extpack.toml"),
        "[package]\nname = \"rustyknife\"\nversion = \"0.1.3\"\n\n\
         [[extension]]\nname = \"rustyknife\"\nmanifest = \"Cargo.toml\"\nbinding = \"cffi\"\n",
    )
    .unwrap();

    let output = run_extpack(temp.path(), &["metadata"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("configuration error"));
}

// ===== CHECK COMMAND TESTS =====

#[test]
fn check_accepts_valid_package() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), "rustyknife", "0.1.3");
    let ledger = temp.path().join("releases.json");

    let output = run_extpack(
        temp.path(),
        &["check", "--ledger", ledger.to_str().unwrap()],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Descriptor is valid"));
}

#[test]
fn check_reports_missing_manifest() {
    let temp = TempDir::new().unwrap();
    write_descriptor(temp.path(), "rustyknife", "0.1.3");
    let ledger = temp.path().join("releases.json");

    let output = run_extpack(
        temp.path(),
        &["check", "--ledger", ledger.to_str().unwrap()],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("missing artifact"));
}

#[test]
fn check_with_descriptor_flag() {
    let temp = TempDir::new().unwrap();
    let pkg = temp.path().join("pkg");
    fs::create_dir(&pkg).unwrap();
    let descriptor = write_package(&pkg, "rustyknife", "0.1.3");
    let ledger = temp.path().join("releases.json");

    let output = run_extpack(
        temp.path(),
        &[
            "check",
            "-f",
            descriptor.to_str().unwrap(),
            "--ledger",
            ledger.to_str().unwrap(),
            "--quiet",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty());
}

// ===== INIT COMMAND TESTS =====

#[test]
fn init_then_check() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("Cargo.toml"),
        "[package]\nname = \"rustyknife\"\nversion = \"0.1.1\"\n",
    )
    .unwrap();

    let output = run_extpack(temp.path(), &["init"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let ledger = temp.path().join("releases.json");
    let output = run_extpack(
        temp.path(),
        &["check", "--ledger", ledger.to_str().unwrap()],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("rustyknife-0.1.1"));
}

#[test]
fn init_refuses_existing_descriptor() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), "rustyknife", "0.1.3");

    let output = run_extpack(temp.path(), &["init"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("already exists"));
}

// ===== RELEASES / COMPLETION =====

#[test]
fn releases_on_empty_ledger() {
    let temp = TempDir::new().unwrap();
    let ledger = temp.path().join("releases.json");

    let output = run_extpack(
        temp.path(),
        &["releases", "--ledger", ledger.to_str().unwrap()],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("No releases"));
}

#[test]
fn completion_bash() {
    let temp = TempDir::new().unwrap();

    let output = run_extpack(temp.path(), &["completion", "bash"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("extpack"));
}

#[test]
fn demo_descriptor_checks() {
    let temp = TempDir::new().unwrap();
    let descriptor = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("rustyknife")
        .join("extpack.toml");
    let ledger = temp.path().join("releases.json");

    let output = run_extpack(
        temp.path(),
        &[
            "check",
            "-f",
            descriptor.to_str().unwrap(),
            "--ledger",
            ledger.to_str().unwrap(),
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("rustyknife-0.1.1"));
}
