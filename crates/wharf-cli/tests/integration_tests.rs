//! Integration tests for the wharf binary

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const UTIL: &str = r#"name: Util
channel: pear.example.org
summary: Utility library
version:
  release: 2.1.0
  api: 2.1.0
stability:
  release: stable
  api: stable
authors:
  - name: Jane Doe
    email: jane@example.org
license:
  identifier: LGPL-2.1
dependencies:
  - name: php
    type: runtime
    constraint: ^7
  - name: Exception
    channel: pear.example.org
    type: package
    constraint: ^2
  - name: Mime
    channel: pear.example.org
    type: package
    required: false
    constraint: ^2
"#;

const UTIL_CHANGELOG: &str = r#"2.1.0:
  api: 2.1.0
  state:
    release: stable
    api: stable
  license:
    identifier: LGPL-2.1
  notes: "[jd] Add Util::flatten()."
"#;

const EXCEPTION: &str = r#"name: Exception
channel: pear.example.org
summary: Exception handling
version:
  release: 2.0.0
  api: 2.0.0
stability:
  release: stable
  api: stable
license:
  identifier: LGPL-2.1
"#;

/// A checkout root with `Util` depending on `Exception`, plus a config file
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        let util = root.join("components/Util");
        fs::create_dir_all(util.join("lib")).unwrap();
        fs::write(util.join("component.yaml"), UTIL).unwrap();
        fs::write(util.join("changelog.yml"), UTIL_CHANGELOG).unwrap();
        fs::write(util.join("lib/Util.php"), "<?php\n").unwrap();

        let exception = root.join("components/Exception");
        fs::create_dir_all(&exception).unwrap();
        fs::write(exception.join("component.yaml"), EXCEPTION).unwrap();

        fs::write(
            root.join("wharf.yaml"),
            format!(
                "home_channel: pear.example.org\ncheckout_root: {}\n",
                root.join("components").display()
            ),
        )
        .unwrap();

        Self { dir }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    fn wharf(&self, args: &[&str]) -> Output {
        wharf_in(self.dir.path(), args)
    }
}

fn wharf_in(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wharf"))
        .args(args)
        .current_dir(cwd)
        .env_remove("WHARF_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute wharf")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_help() {
    let output = wharf_in(Path::new("."), &["--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    for command in ["deps", "install", "release", "update", "snapshot", "version"] {
        assert!(out.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_version_operations() {
    let cases = [
        ("validate", "1.2RC1", "1.2.0RC1"),
        ("next", "1.2.3", "1.2.4-git"),
        ("next-pear", "1.2.3beta1", "1.2.3beta2"),
        ("stability", "2.0.0alpha3", "alpha"),
        ("convert", "^1.2", ">= 1.2.0, <= 2.0.0alpha1, != 2.0.0alpha1"),
    ];
    for (op, value, expected) in cases {
        let output = wharf_in(Path::new("."), &["version", op, value]);
        assert!(output.status.success(), "{op} {value}: {}", stderr(&output));
        assert_eq!(stdout(&output).trim_end(), expected, "{op} {value}");
    }
}

#[test]
fn test_invalid_version_exits_with_validation_code() {
    let output = wharf_in(Path::new("."), &["version", "validate", "1.x"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("1.x"));
}

#[test]
fn test_deps_lists_local_checkouts() {
    let ws = Workspace::new();
    let output = ws.wharf(&[
        "--config",
        "wharf.yaml",
        "deps",
        "components/Util",
        "--no-remote",
    ]);

    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Util 2.1.0"));
    assert!(out.contains("Exception"));
    assert!(out.contains("2.0.0"));
    assert!(!out.contains("Mime"));
}

#[test]
fn test_deps_reports_unresolved_optional() {
    let ws = Workspace::new();
    let output = ws.wharf(&[
        "--config",
        "wharf.yaml",
        "deps",
        "components/Util",
        "--no-remote",
        "--optional",
    ]);

    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Mime"));
    assert!(out.contains("unresolved"));
}

#[test]
fn test_update_writes_manifest() {
    let ws = Workspace::new();
    let output = ws.wharf(&["update", "components/Util"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let manifest: serde_json::Value =
        serde_json::from_str(&ws.read("components/Util/manifest.json")).unwrap();
    assert_eq!(manifest["name"], "example/util");
    assert_eq!(manifest["require"]["php"], "^7");
    assert_eq!(manifest["require"]["pear.example.org/Exception"], "^2");
    assert_eq!(manifest["suggest"]["pear.example.org/Mime"], "^2");

    let descriptor = ws.read("components/Util/component.yaml");
    assert!(descriptor.contains("3.0.0alpha1"));
}

#[test]
fn test_update_pretend_writes_nothing() {
    let ws = Workspace::new();
    let output = ws.wharf(&["--pretend", "update", "components/Util"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Would write"));
    assert!(out.contains("\"name\": \"example/util\""));
    assert!(!ws.path("components/Util/manifest.json").exists());
    assert_eq!(ws.read("components/Util/component.yaml"), UTIL);
}

#[test]
fn test_snapshot_creates_dev_archive() {
    let ws = Workspace::new();
    let output = ws.wharf(&["snapshot", "components/Util", "--output", "dist"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let archives: Vec<String> = fs::read_dir(ws.path("dist"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(archives.len(), 1);
    let name = &archives[0];
    assert!(name.starts_with("Util-2.1.0dev"), "{name}");
    assert!(name.ends_with(".tgz"), "{name}");
    assert_eq!("Util-2.1.0dev".len() + 12 + ".tgz".len(), name.len());

    // The checkout itself keeps its release version
    assert_eq!(ws.read("components/Util/component.yaml"), UTIL);
}

#[test]
fn test_release_pretend_is_repeatable() {
    let ws = Workspace::new();
    let args = [
        "--config",
        "wharf.yaml",
        "--pretend",
        "release",
        "-C",
        "components/Util",
        "--date",
        "2024-05-01",
        "timestamp",
        "changelog",
        "commit",
    ];

    let first = ws.wharf(&args);
    let second = ws.wharf(&args);

    assert!(first.status.success(), "{}", stderr(&first));
    assert_eq!(stdout(&first), stdout(&second));

    let out = stdout(&first);
    assert!(out.contains("(pretend)"));
    assert!(out.contains("2024-05-01"));
    assert!(out.contains("Would commit"));
    assert_eq!(ws.read("components/Util/component.yaml"), UTIL);
    assert_eq!(ws.read("components/Util/changelog.yml"), UTIL_CHANGELOG);
    assert!(!ws.path("components/Util/CHANGES").exists());
}

#[test]
fn test_release_lists_tasks() {
    let ws = Workspace::new();
    let output = ws.wharf(&["--config", "wharf.yaml", "release", "--list"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("nextversion"));
    assert!(out.contains("release:default"));
}

#[test]
fn test_release_unknown_task_is_a_usage_error() {
    let ws = Workspace::new();
    let output = ws.wharf(&[
        "--config",
        "wharf.yaml",
        "--pretend",
        "release",
        "-C",
        "components/Util",
        "tagg",
    ]);

    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("did you mean 'tag'"));
}

#[test]
fn test_release_outside_a_component() {
    let ws = Workspace::new();
    let output = ws.wharf(&["--config", "wharf.yaml", "--pretend", "release", "-C", "nowhere"]);
    assert_eq!(output.status.code(), Some(2));
}
