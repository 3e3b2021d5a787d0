//! End-to-end conversions driving the real external tools.
//!
//! Every test probes PATH for the tools it needs and returns early when one
//! is missing, so the suite degrades gracefully on minimal machines.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn have_all(tools: &[&str]) -> bool {
    tools.iter().all(|tool| which::which(tool).is_ok())
}

/// Write `content` and gzip it, returning the `.gz` fixture path.
fn gzip_fixture(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
    let plain = dir.path().join(name);
    fs::write(&plain, content).expect("write fixture");
    let status = Command::new("gzip").arg(&plain).status().expect("run gzip");
    assert!(status.success(), "gzip failed on fixture");
    dir.path().join(format!("{name}.gz"))
}

fn xz_decompress(path: &Path) -> Vec<u8> {
    let output = Command::new("xz")
        .arg("-dc")
        .arg(path)
        .output()
        .expect("run xz -dc");
    assert!(output.status.success(), "xz -dc failed");
    output.stdout
}

#[test]
fn gzip_stream_converts_to_xz_with_backup() {
    if !have_all(&["gzip", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    gzip_fixture(&temp, "data.txt", b"payload worth keeping");

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .arg("data.txt.gz")
        .assert()
        .success();

    let converted = temp.path().join("data.txt.xz");
    assert!(converted.exists());
    assert_eq!(xz_decompress(&converted), b"payload worth keeping");

    // Default retention collects the original under OldArchives.
    assert!(!temp.path().join("data.txt.gz").exists());
    assert!(temp.path().join("OldArchives/data.txt.gz").exists());
}

#[test]
fn no_backup_deletes_the_original() {
    if !have_all(&["gzip", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    gzip_fixture(&temp, "log", b"lines");

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .args(["--no-backup", "log.gz"])
        .assert()
        .success();

    assert!(temp.path().join("log.xz").exists());
    assert!(!temp.path().join("log.gz").exists());
    assert!(!temp.path().join("OldArchives").exists());
}

#[test]
fn tarball_keeps_its_tar_wrapping() {
    if !have_all(&["tar", "gzip", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    let content = temp.path().join("content");
    fs::create_dir(&content).expect("mkdir");
    fs::write(content.join("file.txt"), b"member data").expect("write member");
    let status = Command::new("tar")
        .current_dir(temp.path())
        .args(["-czf", "bundle.tar.gz", "-C", "content", "file.txt"])
        .status()
        .expect("run tar");
    assert!(status.success());

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .arg("bundle.tar.gz")
        .assert()
        .success();

    let converted = temp.path().join("bundle.tar.xz");
    assert!(converted.exists());
    let listing = Command::new("tar")
        .args(["-tJf"])
        .arg(&converted)
        .output()
        .expect("list tarball");
    assert!(listing.status.success());
    assert!(String::from_utf8_lossy(&listing.stdout).contains("file.txt"));
    assert!(temp.path().join("OldArchives/bundle.tar.gz").exists());
}

#[test]
fn directory_becomes_a_sibling_tarball() {
    if !have_all(&["tar", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    let dir = temp.path().join("project");
    fs::create_dir(&dir).expect("mkdir");
    fs::write(dir.join("a.txt"), b"a").expect("write");
    fs::write(dir.join("b.txt"), b"b").expect("write");

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .arg("project")
        .assert()
        .success();

    let converted = temp.path().join("project.tar.xz");
    assert!(converted.exists());
    let listing = Command::new("tar")
        .args(["-tJf"])
        .arg(&converted)
        .output()
        .expect("list tarball");
    let names = String::from_utf8_lossy(&listing.stdout).to_string();
    assert!(names.contains("a.txt") && names.contains("b.txt"));
    // The directory entry itself is not a member.
    assert!(!names.lines().any(|line| line.trim_end_matches('/') == "project"));

    // The source directory is never deleted or moved.
    assert!(dir.join("a.txt").exists());
    assert!(!temp.path().join("OldArchives").exists());
}

#[test]
fn already_canonical_input_is_recompressed_not_stacked() {
    if !have_all(&["tar", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("file.txt"), b"canonical member").expect("write");
    let status = Command::new("tar")
        .current_dir(temp.path())
        .args(["-cJf", "ready.tar.xz", "file.txt"])
        .status()
        .expect("run tar");
    assert!(status.success());

    let assert = cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .args(["--json", "ready.tar.xz"])
        .assert()
        .success();

    assert!(temp.path().join("ready.tar.xz").exists());
    assert!(!temp.path().join("ready.tar.xz.tar.xz").exists());
    // Self-recompression replaces the input outright; no backup appears.
    assert!(!temp.path().join("OldArchives").exists());

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let entries: serde_json::Value = serde_json::from_str(&stdout).expect("json summary");
    assert_eq!(entries[0]["already_canonical"], true);
    assert_eq!(entries[0]["original"], "replaced");
}

#[test]
fn short_txz_suffix_expands_to_tar_xz() {
    if !have_all(&["tar", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("file.txt"), b"member").expect("write");
    let status = Command::new("tar")
        .current_dir(temp.path())
        .args(["-cJf", "short.txz", "file.txt"])
        .status()
        .expect("run tar");
    assert!(status.success());

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .args(["--no-backup", "short.txz"])
        .assert()
        .success();

    assert!(temp.path().join("short.tar.xz").exists());
    assert!(!temp.path().join("short.txz").exists());
}

#[test]
fn unknown_extension_compresses_in_place() {
    if !have_all(&["xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("README"), b"plain file").expect("write");

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .arg("README")
        .assert()
        .success();

    assert!(temp.path().join("README.xz").exists());
    assert!(!temp.path().join("README").exists());
    // This leaf never participates in the backup policy.
    assert!(!temp.path().join("OldArchives").exists());
}

#[test]
fn corrupt_stream_preserves_the_original() {
    if !have_all(&["gzip", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("bad.gz"), b"this is not gzip data").expect("write");

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .args(["--no-backup", "bad.gz"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("gzip"));

    assert!(temp.path().join("bad.gz").exists());
    assert!(!temp.path().join("bad.xz").exists());
    assert!(!temp.path().join("OldArchives").exists());
}

#[test]
fn failed_conversion_with_backup_still_moves_the_original() {
    if !have_all(&["gzip", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("bad.gz"), b"still not gzip data").expect("write");

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .arg("bad.gz")
        .assert()
        .failure()
        .code(1);

    // The original survives, relocated under the backup directory.
    assert!(temp.path().join("OldArchives/bad.gz").exists());
    assert!(!temp.path().join("bad.gz").exists());
    assert!(!temp.path().join("bad.xz").exists());
}

#[test]
fn batch_continues_past_a_failed_input() {
    if !have_all(&["gzip", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("bad.gz"), b"junk").expect("write");
    gzip_fixture(&temp, "good.txt", b"fine");

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .args(["--no-backup", "bad.gz", "good.txt.gz"])
        .assert()
        .failure()
        .code(1);

    // The second input was still converted.
    assert!(temp.path().join("good.txt.xz").exists());
    assert!(!temp.path().join("good.txt.gz").exists());
    assert!(temp.path().join("bad.gz").exists());
}

#[test]
fn level_override_is_accepted() {
    if !have_all(&["gzip", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    gzip_fixture(&temp, "fast.txt", b"compress me quickly");

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .env("REXZ_LEVEL", "1")
        .args(["--no-backup", "fast.txt.gz"])
        .assert()
        .success();

    let converted = temp.path().join("fast.txt.xz");
    assert!(converted.exists());
    assert_eq!(xz_decompress(&converted), b"compress me quickly");
}

#[test]
fn zip_container_repacks_to_tar_xz() {
    if !have_all(&["zip", "unzip", "tar", "xz"]) {
        return;
    }
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("one.txt"), b"1").expect("write");
    fs::write(temp.path().join("two.txt"), b"2").expect("write");
    let status = Command::new("zip")
        .current_dir(temp.path())
        .args(["-q", "pack.zip", "one.txt", "two.txt"])
        .status()
        .expect("run zip");
    assert!(status.success());

    cargo_bin_cmd!("rexz")
        .current_dir(temp.path())
        .arg("pack.zip")
        .assert()
        .success();

    let converted = temp.path().join("pack.tar.xz");
    assert!(converted.exists());
    let listing = Command::new("tar")
        .args(["-tJf"])
        .arg(&converted)
        .output()
        .expect("list tarball");
    let names = String::from_utf8_lossy(&listing.stdout).to_string();
    assert!(names.contains("one.txt") && names.contains("two.txt"));
    assert!(temp.path().join("OldArchives/pack.zip").exists());

    // No scratch directory leaks next to the input.
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".rexz-"))
        .collect();
    assert!(leftovers.is_empty());
}
