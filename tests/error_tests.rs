//! Error scenario integration tests

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn audio_kit_bin(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_audio-kit"));
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn record_into_missing_directory() {
    let home = TempDir::new().unwrap();
    let output = audio_kit_bin(home.path())
        .args(["--source", "sine", "record"])
        .arg(home.path().join("missing").join("take.flac"))
        .args(["-d", "1s"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("InvalidPath"),
        "Expected InvalidPath, got: {}",
        stderr
    );
}

#[test]
fn record_onto_a_directory() {
    let home = TempDir::new().unwrap();
    let output = audio_kit_bin(home.path())
        .args(["--source", "sine", "record"])
        .arg(home.path())
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("InvalidPath"));
}

#[test]
fn invalid_duration_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    let output = audio_kit_bin(home.path())
        .args(["--source", "sine", "record", "out.flac", "-d", "soon"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid duration"),
        "Expected error about invalid duration, got: {}",
        stderr
    );
}

#[test]
fn unknown_source_is_rejected_by_clap() {
    let home = TempDir::new().unwrap();
    let output = audio_kit_bin(home.path())
        .args(["--source", "tape", "devices"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("tape"));
}

#[test]
fn config_get_unknown_key() {
    let home = TempDir::new().unwrap();
    let output = audio_kit_bin(home.path())
        .args(["config", "get", "unknown_key"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unknown") || stderr.contains("Valid"),
        "Expected error about unknown key, got: {}",
        stderr
    );
}

#[test]
fn config_set_unknown_key() {
    let home = TempDir::new().unwrap();
    let output = audio_kit_bin(home.path())
        .args(["config", "set", "api_key", "value"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Valid keys"));
}

#[test]
fn config_set_invalid_sample_rate() {
    let home = TempDir::new().unwrap();
    let output = audio_kit_bin(home.path())
        .args(["config", "set", "sample_rate", "0"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("positive"),
        "Expected error about positive integer, got: {}",
        stderr
    );
}

#[test]
fn config_set_invalid_boolean() {
    let home = TempDir::new().unwrap();
    let output = audio_kit_bin(home.path())
        .args(["config", "set", "exclusive_device", "maybe"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("true") || stderr.contains("false"),
        "Expected error about invalid boolean, got: {}",
        stderr
    );
}

#[test]
fn config_list_with_no_file() {
    let home = TempDir::new().unwrap();
    let output = audio_kit_bin(home.path())
        .args(["config", "list"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("not set"),
        "Expected config list output, got: {}",
        stdout
    );
}

#[test]
fn config_init_twice_fails() {
    let home = TempDir::new().unwrap();
    let first = audio_kit_bin(home.path())
        .args(["config", "init"])
        .output()
        .expect("Failed to execute command");
    assert!(first.status.success());

    let second = audio_kit_bin(home.path())
        .args(["config", "init"])
        .output()
        .expect("Failed to execute command");
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("already exists"));
}

#[test]
fn broken_config_file_falls_back_to_defaults() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("audio-kit");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "sample_rate = [").unwrap();

    let output = audio_kit_bin(home.path())
        .args(["--source", "sine", "devices"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("using defaults"));
}
