use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;

/// Copy a fixture into a scratch location so the object file lands outside
/// the repo. `tag` keeps parallel tests from clobbering each other.
fn scratch_fixture(name: &str, tag: &str) -> PathBuf {
    let src = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/files")
        .join(name);
    let dst = std::env::temp_dir().join(format!("casl_{}_{}", tag, name));
    fs::copy(&src, &dst).unwrap();
    dst
}

#[test]
fn assembles_min_program() {
    let cas = scratch_fixture("min.cas", "asm_min");
    Command::cargo_bin("casl")
        .unwrap()
        .arg(&cas)
        .assert()
        .success()
        .stdout(contains("Assembling"))
        .stdout(contains("Saved to"));

    let object = fs::read_to_string(cas.with_extension("obj")).unwrap();
    let lines: Vec<&str> = object.lines().collect();
    assert_eq!(lines[0], "COMET 0000");
    assert!(lines[2].contains("8100"));
    assert!(object.contains("DEFINED LABELS"));
    assert!(object.contains("MAIN"));
}

#[test]
fn listing_flag_echoes_object() {
    let cas = scratch_fixture("min.cas", "asm_listing");
    Command::cargo_bin("casl")
        .unwrap()
        .arg("-a")
        .arg(&cas)
        .assert()
        .success()
        .stdout(contains("COMET 0000"))
        .stdout(contains("8100"));
}

#[test]
fn version_flag() {
    Command::cargo_bin("casl")
        .unwrap()
        .arg("-v")
        .assert()
        .success()
        .stdout(contains("casl"));
}

#[test]
fn no_input_fails() {
    Command::cargo_bin("casl").unwrap().assert().code(2);
}

#[test]
fn duplicate_label_fails() {
    let dst = std::env::temp_dir().join("casl_dup.cas");
    fs::write(&dst, "MAIN START\nA RET\nA RET\n    END\n").unwrap();
    Command::cargo_bin("casl")
        .unwrap()
        .arg(&dst)
        .assert()
        .code(1)
        .stderr(contains("duplicate"));
}

#[test]
fn missing_end_fails() {
    let dst = std::env::temp_dir().join("casl_noend.cas");
    fs::write(&dst, "MAIN START\n    RET\n").unwrap();
    Command::cargo_bin("casl")
        .unwrap()
        .arg(&dst)
        .assert()
        .code(1)
        .stderr(contains("END"));
}

#[test]
fn batch_continues_past_failure() {
    let bad = std::env::temp_dir().join("casl_batch_bad.cas");
    fs::write(&bad, "MAIN START\n    JUMP NOWHERE\n    END\n").unwrap();
    let good = scratch_fixture("min.cas", "asm_batch");
    Command::cargo_bin("casl")
        .unwrap()
        .arg(&bad)
        .arg(&good)
        .assert()
        .code(1)
        .stderr(contains("NOWHERE"))
        .stdout(contains("Saved to"));
    assert!(good.with_extension("obj").exists());
}
