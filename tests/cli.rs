use std::process::{Command, Output};

fn futex_turns(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_futex-turns"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_default_five_rounds() {
    let out = futex_turns(&[]);
    assert!(out.status.success());

    let expected: Vec<String> = (0..5)
        .flat_map(|j| [format!("Parent {j}"), format!("Child {j}")])
        .collect();
    assert_eq!(lines(&out), expected);
}

#[test]
fn test_loop_count_argument() {
    let out = futex_turns(&["200"]);
    assert!(out.status.success());
    let lines = lines(&out);
    assert_eq!(lines.len(), 400);
    assert_eq!(lines[398], "Parent 199");
    assert_eq!(lines[399], "Child 199");

    let out = futex_turns(&["0"]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn test_bad_loop_count_fails_with_a_diagnostic() {
    let out = futex_turns(&["five"]);
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid loop count"), "stderr: {stderr}");
}

/// A broken stdout is reported on stderr, but the turns go on to the end
#[cfg(target_os = "linux")]
#[test]
fn test_write_failures_dont_stop_the_turns() {
    let full = std::fs::OpenOptions::new()
        .write(true)
        .open("/dev/full")
        .unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_futex-turns"))
        .arg("3")
        .env_remove("RUST_LOG")
        .stdout(full)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(stderr.matches("failed to write").count(), 6, "stderr: {stderr}");
}
