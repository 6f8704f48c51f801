use std::{fs, process::Command};

#[test]
fn short_seeded_session_prints_a_summary() {
    let output = Command::new(env!("CARGO_BIN_EXE_wallbreaker"))
        .args([
            "--floors",
            "2",
            "--seconds-per-floor",
            "2",
            "--fps",
            "30",
            "--seed",
            "9",
        ])
        .output()
        .expect("failed to run wallbreaker");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("floor reached:"));
    assert!(stdout.contains("walls broken:"));
}

#[test]
fn broken_config_file_is_reported() {
    let path = std::env::temp_dir().join(format!("wallbreaker-bad-{}.toml", std::process::id()));
    fs::write(&path, "[world\nseed = ").expect("write temp config");

    let output = Command::new(env!("CARGO_BIN_EXE_wallbreaker"))
        .arg("--config")
        .arg(&path)
        .output()
        .expect("failed to run wallbreaker");
    let _ = fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load configuration"));
}

#[test]
fn zero_fps_is_rejected() {
    let status = Command::new(env!("CARGO_BIN_EXE_wallbreaker"))
        .args(["--fps", "0"])
        .status()
        .expect("failed to run wallbreaker");

    assert!(!status.success());
}
