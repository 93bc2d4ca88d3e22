#![cfg(all(unix, feature = "cli"))]

use std::process::Command;

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_hidtunnel"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("hidtunnel {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_reports_frame_size() {
    let output = Command::new(env!("CARGO_BIN_EXE_hidtunnel"))
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("report_length: 20"));
    assert!(stdout.contains("build_target: "));
    assert!(!stdout.contains("build_target: unknown"));
}

#[test]
fn devices_emits_json_array() {
    let output = Command::new(env!("CARGO_BIN_EXE_hidtunnel"))
        .args(["--format", "json", "devices", "--all"])
        .output()
        .expect("devices should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let listed: serde_json::Value =
        serde_json::from_str(&stdout).expect("devices should emit json");
    assert!(listed.is_array());
}

#[test]
fn shell_without_receiver_exits_not_found() {
    let output = Command::new(env!("CARGO_BIN_EXE_hidtunnel"))
        .args(["shell", "--vid", "ffff", "--pid", "fffe", "--once"])
        .env_remove("HIDTUNNEL_VID")
        .env_remove("HIDTUNNEL_PID")
        .output()
        .expect("shell should run");

    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no HID device ffff:fffe"));
}

#[test]
fn shell_rejects_zero_poll_interval() {
    let output = Command::new(env!("CARGO_BIN_EXE_hidtunnel"))
        .args(["shell", "--poll-interval", "0ms"])
        .output()
        .expect("shell should run");

    assert_eq!(output.status.code(), Some(64));
}
