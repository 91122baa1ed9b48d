use strata_util::process::CommandBuilder;

#[cfg(unix)]
#[test]
fn test_builder_simple_command() {
    let output = CommandBuilder::new("echo").arg("hello").exec().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "hello");
}

#[cfg(unix)]
#[test]
fn test_builder_with_env() {
    let output = CommandBuilder::new("sh")
        .arg("-c")
        .arg("echo $STRATA_TEST_VAR")
        .env("STRATA_TEST_VAR", "strata_test_value")
        .exec()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "strata_test_value");
}

#[cfg(unix)]
#[test]
fn test_builder_with_cwd() {
    let tmp = tempfile::TempDir::new().unwrap();
    std::fs::write(tmp.path().join("strata_cwd_test.marker"), "ok").unwrap();

    let output = CommandBuilder::new("ls")
        .arg("strata_cwd_test.marker")
        .cwd(tmp.path())
        .exec()
        .unwrap();
    assert!(output.status.success());
}

#[test]
fn test_builder_nonexistent_program() {
    let result = CommandBuilder::new("nonexistent_program_xyz_123").exec();
    assert!(result.is_err());
}

#[test]
fn test_display_joins_program_and_args() {
    let cmd = CommandBuilder::new("flutter").args(["build", "apk"]);
    assert_eq!(cmd.display(), "flutter build apk");
}

#[cfg(unix)]
#[test]
fn test_spawn_pipes_stderr_only() {
    use std::io::Read;

    let mut child = CommandBuilder::new("sh")
        .args(["-c", "echo out; echo err >&2"])
        .spawn()
        .unwrap();
    let mut stderr = String::new();
    child.stderr.take().unwrap().read_to_string(&mut stderr).unwrap();
    assert!(child.wait().unwrap().success());
    assert!(child.stdout.is_none());
    assert_eq!(stderr.trim(), "err");
}
