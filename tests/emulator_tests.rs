use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;

/// Assemble a fixture in a scratch location and return the object path.
fn assemble_fixture(name: &str, tag: &str) -> PathBuf {
    let src = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/files")
        .join(name);
    let cas = std::env::temp_dir().join(format!("comet_{}_{}", tag, name));
    fs::copy(&src, &cas).unwrap();
    Command::cargo_bin("casl")
        .unwrap()
        .arg(&cas)
        .assert()
        .success();
    cas.with_extension("obj")
}

#[test]
fn runs_min_program() {
    let obj = assemble_fixture("min.cas", "run_min");
    Command::cargo_bin("comet")
        .unwrap()
        .arg("-q")
        .arg(&obj)
        .write_stdin("run\n")
        .assert()
        .success()
        .stdout(contains("Program terminated."));
}

#[test]
fn echoes_input() {
    let obj = assemble_fixture("echo.cas", "run_echo");
    Command::cargo_bin("comet")
        .unwrap()
        .arg("-q")
        .arg(&obj)
        .write_stdin("run\nhello\n")
        .assert()
        .success()
        .stdout(contains("OUT> hello"))
        .stdout(contains("Program terminated."));
}

#[test]
fn breakpoint_stops_run() {
    let obj = assemble_fixture("sub.cas", "run_break");
    Command::cargo_bin("comet")
        .unwrap()
        .arg("-q")
        .arg(&obj)
        .write_stdin("break 3\nrun\ncontinue\n")
        .assert()
        .success()
        .stderr(contains("Breakpoint 1 at #0003"))
        .stdout(contains("Program terminated."));
}

#[test]
fn step_and_print_show_registers() {
    let obj = assemble_fixture("sub.cas", "run_step");
    // CALL lands in SUB, LAD leaves 42 in GR2
    Command::cargo_bin("comet")
        .unwrap()
        .arg("-q")
        .arg(&obj)
        .write_stdin("step\nstep\nprint\nquit\n")
        .assert()
        .code(1)
        .stderr(contains("GR2 #002a"));
}

#[test]
fn quit_exits_with_one() {
    let obj = assemble_fixture("min.cas", "run_quit");
    Command::cargo_bin("comet")
        .unwrap()
        .arg("-q")
        .arg(&obj)
        .write_stdin("quit\n")
        .assert()
        .code(1);
}

#[test]
fn unknown_command_reports_and_continues() {
    let obj = assemble_fixture("min.cas", "run_unknown");
    Command::cargo_bin("comet")
        .unwrap()
        .arg("-q")
        .arg(&obj)
        .write_stdin("teleport\nquit\n")
        .assert()
        .code(1)
        .stderr(contains("unknown command"));
}

#[test]
fn missing_object_file_is_fatal() {
    Command::cargo_bin("comet")
        .unwrap()
        .arg("-q")
        .arg("does_not_exist.obj")
        .assert()
        .failure();
}

#[test]
fn labels_listed() {
    let obj = assemble_fixture("sub.cas", "run_label");
    Command::cargo_bin("comet")
        .unwrap()
        .arg("-q")
        .arg(&obj)
        .write_stdin("label\nquit\n")
        .assert()
        .code(1)
        .stderr(contains("MAIN"))
        .stderr(contains("SUB"));
}

#[test]
fn disasm_renders_mnemonics() {
    let obj = assemble_fixture("sub.cas", "run_disasm");
    Command::cargo_bin("comet")
        .unwrap()
        .arg("-q")
        .arg(&obj)
        .write_stdin("disasm 0\nquit\n")
        .assert()
        .code(1)
        .stderr(contains("CALL"))
        .stderr(contains("LAD GR2"));
}
