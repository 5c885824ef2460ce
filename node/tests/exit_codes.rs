#![cfg(unix)]

use std::{
    ffi::OsString,
    os::unix::ffi::OsStringExt,
    process::{Command, Output},
};

fn task(dir: &tempfile::TempDir, tf_config: Option<OsString>, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_task"));
    cmd.current_dir(dir.path())
        .env("RUST_LOG", "error")
        .args(["--max_epochs", "1", "--retry_backoff_ms", "10"])
        .args(args);

    match tf_config {
        Some(raw) => cmd.env("TF_CONFIG", raw),
        None => cmd.env_remove("TF_CONFIG"),
    };

    cmd.output().unwrap()
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn unknown_optimizer_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = task(&dir, None, &["--optimizer", "lbfgs"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unknow optimizer: lbfgs, exit now"),
        "{stderr}"
    );
}

#[test]
fn invalid_cluster_config_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = task(&dir, Some(r#"{"cluster":{}}"#.into()), &[]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn non_unicode_cluster_config_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = task(&dir, Some(OsString::from_vec(vec![0x7b, 0xff, 0x7d])), &[]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn standalone_rerun_exits_with_success() {
    let dir = tempfile::tempdir().unwrap();

    assert!(task(&dir, None, &[]).status.success());
    assert!(task(&dir, None, &[]).status.success());
    assert!(dir.path().join("model/00000001").exists());
}

#[test]
fn trainer_failures_exit_with_success() {
    let dir = tempfile::tempdir().unwrap();
    let raw = format!(
        r#"{{"cluster": {{"ps": ["127.0.0.1:{}"], "master": ["127.0.0.1:2"]}},
            "task": {{"type": "master", "index": 0}}}}"#,
        closed_port()
    );
    let output = task(&dir, Some(raw.into()), &["--connect_retries", "0"]);

    assert!(output.status.success(), "{output:?}");
    assert!(!output.stderr.is_empty());
}
