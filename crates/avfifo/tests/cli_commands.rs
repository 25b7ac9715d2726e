#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn run_avfifo(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_avfifo"))
        .args(args)
        .output()
        .expect("binary should run")
}

fn unique_temp_file(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "avfifo-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

#[test]
fn version_prints_package_version() {
    let output = run_avfifo(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_reports_the_build_target() {
    let output = run_avfifo(&["version", "--extended"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    assert!(stdout.contains("build_target:"));
    assert!(!stdout.contains("build_target: unknown"));
}

#[test]
fn stream_reports_all_frames_delivered() {
    let output = run_avfifo(&[
        "--format",
        "json",
        "--log-level",
        "error",
        "stream",
        "--capacity",
        "8192",
        "--frames",
        "50",
        "--frame-size",
        "256",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let summary: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("summary should be json");
    assert_eq!(summary["frames_delivered"], 50);
    assert_eq!(summary["bytes_delivered"], 50 * 256);
    assert_eq!(summary["audio_config_seen"], true);
    assert_eq!(summary["video_config_seen"], true);
}

#[test]
fn stream_works_over_a_mapped_file() {
    let path = unique_temp_file("stream");
    let output = run_avfifo(&[
        "--format",
        "json",
        "--log-level",
        "error",
        "stream",
        "--capacity",
        "4096",
        "--frames",
        "10",
        "--frame-size",
        "128",
        "--file",
        path.to_str().expect("temp path should be utf-8"),
    ]);
    let _ = std::fs::remove_file(&path);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let summary: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("summary should be json");
    assert_eq!(summary["frames_delivered"], 10);
}

#[test]
fn bench_pushes_every_message() {
    let output = run_avfifo(&[
        "--format",
        "json",
        "--log-level",
        "error",
        "bench",
        "--capacity",
        "16384",
        "--messages",
        "2000",
        "--message-size",
        "512",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let summary: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("summary should be json");
    assert_eq!(summary["messages"], 2000);
    assert_eq!(summary["message_size"], 512);
}

#[test]
fn bench_rejects_messages_larger_than_half_the_fifo() {
    let output = run_avfifo(&[
        "bench",
        "--capacity",
        "1024",
        "--message-size",
        "1024",
        "--messages",
        "1",
    ]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(64));
}
