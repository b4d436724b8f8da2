use std::process::Command;

fn horde_arena() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_horde-arena"));
    let _ = command.env("RUST_LOG", "warn");
    command
}

#[test]
fn bundled_scenario_runs_to_completion() {
    let scenario = concat!(env!("CARGO_MANIFEST_DIR"), "/../../scenarios/crowded_corner.toml");
    let output = horde_arena()
        .args(["--scenario", scenario])
        .output()
        .expect("failed to launch horde-arena");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("waves cleared: 3"), "{stdout}");
    assert!(!stdout.contains("timed out"), "{stdout}");
}

#[test]
fn print_config_applies_overrides() {
    let output = horde_arena()
        .args(["--print-config", "--seed", "77", "--waves", "2"])
        .output()
        .expect("failed to launch horde-arena");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("seed = 77"), "{stdout}");
    assert!(stdout.contains("waves = 2"), "{stdout}");
}

#[test]
fn missing_scenario_reports_path() {
    let output = horde_arena()
        .args(["--scenario", "does/not/exist.toml"])
        .output()
        .expect("failed to launch horde-arena");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does/not/exist.toml"), "{stderr}");
}
