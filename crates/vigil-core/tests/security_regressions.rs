//! Security regression tests.
//!
//! Attack scenarios against the integrity layer: symlink redirection of
//! protected files and of hash records, and record clobbering.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use tempfile::TempDir;
use vigil_core::FileValidator;
use vigil_core::RunnerError;
use vigil_core::VerificationManager;

fn workspace() -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = temp.path().canonicalize().unwrap();
    let hash_dir = root.join("hashes");
    std::fs::create_dir(&hash_dir).unwrap();
    (temp, root, hash_dir)
}

#[test]
#[cfg(unix)]
fn test_symlinked_target_rejected_at_verify() {
    use std::os::unix::fs::symlink;

    let (_temp, root, hash_dir) = workspace();
    let real = root.join("real.sh");
    std::fs::write(&real, b"#!/bin/sh\n").unwrap();

    let validator = FileValidator::new(&hash_dir);
    validator.record(&real, false).unwrap();

    // Attacker swaps the protected path for a symlink to attacker-owned
    // content after recording.
    let attacker = root.join("attacker.sh");
    std::fs::write(&attacker, b"#!/bin/sh\n").unwrap();
    std::fs::remove_file(&real).unwrap();
    symlink(&attacker, &real).unwrap();

    assert!(matches!(
        validator.verify(&real),
        Err(RunnerError::IsSymlink { .. })
    ));
}

#[test]
#[cfg(unix)]
fn test_symlinked_hash_record_rejected() {
    use std::os::unix::fs::symlink;

    let (_temp, root, hash_dir) = workspace();
    let target = root.join("tool.sh");
    std::fs::write(&target, b"#!/bin/sh\n").unwrap();

    let validator = FileValidator::new(&hash_dir);
    validator.record(&target, false).unwrap();

    // Replace the record with a symlink to an attacker-controlled digest.
    let record_path = validator.record_path(&target).unwrap();
    let fake = root.join("fake-digest");
    let tampered = format!("{}\n", "0".repeat(64));
    std::fs::write(&fake, tampered).unwrap();
    std::fs::remove_file(&record_path).unwrap();
    symlink(&fake, &record_path).unwrap();

    assert!(matches!(
        validator.verify(&target),
        Err(RunnerError::IsSymlink { .. })
    ));
}

#[test]
#[cfg(unix)]
fn test_symlinked_hash_dir_component_rejected() {
    use std::os::unix::fs::symlink;

    let (_temp, root, _hash_dir) = workspace();
    let real_dir = root.join("real-hashes");
    std::fs::create_dir(&real_dir).unwrap();
    let link_dir = root.join("linked-hashes");
    symlink(&real_dir, &link_dir).unwrap();

    let target = root.join("tool.sh");
    std::fs::write(&target, b"#!/bin/sh\n").unwrap();

    // A validator handed a symlinked hash directory cannot write records
    // through it.
    let validator = FileValidator::new(&link_dir);
    assert!(matches!(
        validator.record(&target, false),
        Err(RunnerError::IsSymlink { .. })
    ));
}

#[test]
fn test_record_does_not_clobber_without_force() {
    let (_temp, root, hash_dir) = workspace();
    let target = root.join("tool.sh");
    std::fs::write(&target, b"v1").unwrap();

    let validator = FileValidator::new(&hash_dir);
    validator.record(&target, false).unwrap();
    let record_path = validator.record_path(&target).unwrap();
    let original = std::fs::read_to_string(&record_path).unwrap();

    std::fs::write(&target, b"v2").unwrap();
    assert!(matches!(
        validator.record(&target, false),
        Err(RunnerError::FileExists { .. })
    ));

    // The stored digest is untouched.
    assert_eq!(std::fs::read_to_string(&record_path).unwrap(), original);
}

#[test]
fn test_dry_run_does_not_mask_tampering() {
    let (_temp, root, hash_dir) = workspace();
    let target = root.join("tool.sh");
    std::fs::write(&target, b"v1").unwrap();

    let validator = FileValidator::new(&hash_dir);
    validator.record(&target, false).unwrap();
    std::fs::write(&target, b"v2").unwrap();

    // Dry-run forgives missing records, never wrong digests.
    let manager = VerificationManager::new_for_dry_run_with_dir(&hash_dir);
    assert!(matches!(
        manager.verify_file(&target),
        Err(RunnerError::HashMismatch { .. })
    ));
}
