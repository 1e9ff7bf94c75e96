//! End-to-end tests for the `dupehunter` binary.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use image::{ImageFormat, RgbImage};
use predicates::prelude::*;
use std::path::PathBuf;

fn write_gradient(dir: &TempDir, name: &str, rising: bool) -> PathBuf {
    let child = dir.child(name);
    RgbImage::from_fn(64, 48, |x, _| {
        let v = (if rising { 10 + x * 3 } else { 199 - x * 3 }) as u8;
        image::Rgb([v, v, v])
    })
    .save_with_format(child.path(), ImageFormat::Png)
    .unwrap();
    child.path().to_path_buf()
}

fn dupehunter(db: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dupehunter").unwrap();
    cmd.arg("--db").arg(db.path()).env("RUST_LOG", "warn");
    cmd
}

#[test]
fn json_output_lists_flagged_paths() {
    let images = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let a = write_gradient(&images, "a.png", true);
    let b = write_gradient(&images, "b.png", true);
    let c = write_gradient(&images, "c.png", false);

    let output = dupehunter(&db)
        .args(["-o", "json"])
        .args([&a, &b, &c])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["processed"], 3);
    assert_eq!(json["ingested"], 3);
    assert_eq!(json["threshold"], 12);

    let flagged: Vec<&str> = json["flagged"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(flagged.len(), 2);
    assert!(flagged.contains(&a.to_str().unwrap()));
    assert!(flagged.contains(&b.to_str().unwrap()));
    assert!(json["evaluations"].as_array().unwrap().is_empty());

    db.child("fingerprints.db").assert(predicate::path::exists());
}

#[test]
fn paths_can_come_from_stdin() {
    let images = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let a = write_gradient(&images, "a.png", true);
    let b = write_gradient(&images, "b.png", true);

    dupehunter(&db)
        .args(["-o", "minimal", "-"])
        .write_stdin(format!("{}\n\n{}\n", a.display(), b.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("a.png").and(predicate::str::contains("b.png")));
}

#[test]
fn stricter_distance_flags_nothing() {
    let images = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let a = write_gradient(&images, "a.png", true);
    let b = write_gradient(&images, "b.png", true);

    dupehunter(&db)
        .args(["-o", "minimal", "-d", "0"])
        .args([&a, &b])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn pretty_output_has_summary_and_footer() {
    let images = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let a = write_gradient(&images, "a.png", true);

    dupehunter(&db)
        .arg(&a)
        .assert()
        .success()
        .stdout(predicate::str::contains("files processed"))
        .stdout(predicate::str::contains("No duplicates found"))
        .stdout(predicate::str::contains("No files were modified"));
}

#[test]
fn invalid_distance_is_a_usage_error() {
    let db = TempDir::new().unwrap();

    dupehunter(&db)
        .args(["-d", "abc", "a.png"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn unusable_data_directory_is_fatal() {
    let db = TempDir::new().unwrap();
    let file = db.child("not-a-dir");
    file.write_str("occupied").unwrap();

    Command::cargo_bin("dupehunter")
        .unwrap()
        .arg("--db")
        .arg(file.path())
        .env("RUST_LOG", "warn")
        .assert()
        .code(1);
}
