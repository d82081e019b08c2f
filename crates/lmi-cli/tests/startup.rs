//! Process-level checks of the `lmi-cli` binary.

use std::process::Command;

fn lmi_cli() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_lmi-cli"));
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn help_works_with_malformed_config() {
    let output = lmi_cli()
        .env("LMI_MAX_RETRIES", "abc")
        .arg("--help")
        .output()
        .expect("spawn lmi-cli");

    assert!(output.status.success(), "status {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("search"), "stdout: {stdout}");
}

#[test]
fn malformed_config_fails_a_real_command() {
    let output = lmi_cli()
        .env("LMI_MAX_RETRIES", "abc")
        .arg("config")
        .output()
        .expect("spawn lmi-cli");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LMI_MAX_RETRIES"), "stderr: {stderr}");
}
