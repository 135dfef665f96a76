//! Behaviour of the demonstration binary.

use std::process::{Command, Output};

use panictrace::EXIT_CODE;
use panictrace_testing::{frame_blocks, strip_ansi};
use rstest::rstest;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_panictrace"))
        .args(args)
        .env_remove("NO_COLOR")
        .output()
        .expect("demo binary runs")
}

#[rstest]
#[case("handle")]
#[case("go")]
#[case("async")]
fn fatal_panic_exits_with_code(#[case] mode: &str) {
    let output = run(&["--mode", mode, "--color", "never"]);
    assert_eq!(output.status.code(), Some(EXIT_CODE));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("panic: boom\n"), "{stderr}");
    assert!(stderr.contains("panictrace.descend"), "{stderr}");
    assert!(!stderr.contains('\x1b'), "{stderr}");
}

#[test]
fn depth_controls_frame_count() {
    let output = run(&["--depth", "4", "--message", "deep", "--color", "never"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("panic: deep\n"), "{stderr}");
    assert_eq!(stderr.matches("panictrace.descend").count(), 5, "{stderr}");
    assert_eq!(frame_blocks(&stderr).0, 1);
}

#[test]
fn no_exit_recovers() {
    let output = run(&["--no-exit", "--color", "never"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("recovered"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("panic: boom"));
}

#[rstest]
#[case("handle")]
#[case("go")]
fn disabled_swallows_panic(#[case] mode: &str) {
    let output = run(&["--disable", "--mode", mode]);
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stderr).contains("panic:"));
}

#[test]
fn color_always_writes_escapes() {
    let output = run(&["--color", "always"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\x1b["), "{stderr}");
    assert!(strip_ansi(&stderr).contains("panic: boom\n"), "{stderr}");
}

#[rstest]
#[case(&[], false)]
#[case(&["--color", "always"], true)]
fn explicit_color_beats_no_color(#[case] args: &[&str], #[case] escapes: bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_panictrace"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("demo binary runs");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(strip_ansi(&stderr).contains("panic: boom\n"), "{stderr}");
    assert_eq!(stderr.contains('\x1b'), escapes, "{stderr}");
}

#[test]
fn rejects_unknown_color_choice() {
    let output = run(&["--color", "sometimes"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("sometimes"));
}
