//! CLI integration tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

/// Run the binary with an isolated (empty) config directory
fn sqconsole(
    config_dir: &Path,
    args: &[&str],
    stdin: &str,
) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_sqconsole"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("binary should start");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("stdin should accept input");
    child.wait_with_output().expect("binary should finish")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    let output = sqconsole(dir.path(), &["version"], "");
    assert!(output.status.success());
    assert_eq!(stdout(&output), format!("sqconsole {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_eval_prints_each_value() {
    let dir = TempDir::new().unwrap();
    let output = sqconsole(dir.path(), &["eval", "=1+1\nx <- 3\n= x * \"!\""], "");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "2\n");
    assert!(stderr(&output).contains("arith op * on between 'integer' and 'string'"));
}

#[test]
fn test_piped_repl() {
    let dir = TempDir::new().unwrap();
    let output = sqconsole(dir.path(), &[], "function sq(n) {\nreturn n * n\n}\n= sq(6)\n= nope\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "36\n");
    assert!(stderr(&output).contains("script error: the index 'nope' does not exist"));
}

#[test]
fn test_run_file() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("hello.nut");
    std::fs::write(&script, "local who = \"file\"\nprint(\"from \" + who + \"\\n\")\n").unwrap();

    let output = sqconsole(dir.path(), &["run", script.to_str().unwrap()], "");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "from file\n");
}

#[test]
fn test_run_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = sqconsole(dir.path(), &["run", "/nonexistent/script.nut"], "");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to run"));
}

#[test]
fn test_config_controls_call_depth() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[vm]\nmax_call_depth = 4\n").unwrap();

    let output = sqconsole(
        dir.path(),
        &["--config", config.to_str().unwrap(), "eval", "function r(n) { return n ? r(n - 1) : 0 }\n= r(10)\n= r(2)"],
        "",
    );
    assert!(output.status.success());
    assert_eq!(stdout(&output), "0\n");
    assert!(stderr(&output).contains("stack overflow"));
}

#[test]
fn test_broken_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("broken.toml");
    std::fs::write(&config, "[vm\n").unwrap();

    let output = sqconsole(dir.path(), &["--config", config.to_str().unwrap(), "version"], "");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load config"));
}
