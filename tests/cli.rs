//! Integration tests for the `jsbc` binary, driven as a subprocess the
//! way `cargo test` wires up `tests/*.rs` against `[[bin]]` targets.

use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn jsbc_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jsbc"))
}

#[test]
fn build_compiles_a_program_file_to_jsbc() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("prog.js");
    fs::write(&input, "let x = 1 + 2;").unwrap();

    let output = jsbc_bin().arg("build").arg(&input).current_dir(dir.path()).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let compiled = fs::read(dir.path().join("prog.jsbc")).unwrap();
    assert_eq!(&compiled[0..4], b"PBO3");
}

#[test]
fn build_compiles_a_netbots_graph_file_to_jsbc() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("graph.json");
    fs::write(
        &input,
        r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"}]}"#,
    )
    .unwrap();

    let output = jsbc_bin().arg("build").arg(&input).current_dir(dir.path()).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let compiled = fs::read(dir.path().join("graph.jsbc")).unwrap();
    assert_eq!(&compiled[0..4], b"NBO2");
}

#[test]
fn build_respects_explicit_output_path() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("prog.js");
    let out = dir.path().join("out.bin");
    fs::write(&input, "let x = 1;").unwrap();

    let output = jsbc_bin().arg("build").arg(&input).arg("-o").arg(&out).output().unwrap();
    assert!(output.status.success());
    assert!(out.exists());
}

#[test]
fn build_rejects_an_unrecognized_extension_without_format_override() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("prog.txt");
    fs::write(&input, "let x = 1;").unwrap();

    let output = jsbc_bin().arg("build").arg(&input).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn check_reports_ok_for_a_well_formed_program() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("prog.js");
    fs::write(&input, "let x = 1;").unwrap();

    let output = jsbc_bin().arg("check").arg(&input).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("OK"));
}

#[test]
fn check_fails_for_a_semantic_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("prog.js");
    fs::write(&input, "x = 1;").unwrap();

    let output = jsbc_bin().arg("check").arg(&input).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}
