use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// `idc` with a clean environment, run inside `dir`. The global store lives
/// under `<dir>/home`.
fn idc(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("idc");
    cmd.current_dir(dir)
        .env("IDC_GLOBAL_DIR", dir.join("home/.idc"))
        .env_remove("IDC_HOST_OS")
        .env_remove("IDC_KUBE")
        .env_remove("IDC_WINDOWS_PATH")
        .env_remove("IDC_STATE_DIR")
        .env_remove("IDC_ROOT_PASSWORD")
        .env("RUST_LOG", "warn");
    cmd
}

/// Contents of every store file in `<dir>/.idc/db` except the global one.
fn app_store(dir: &Path) -> String {
    let db = dir.join(".idc/db");
    std::fs::read_dir(&db)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().is_some_and(|n| n != "global.db"))
        .map(|p| std::fs::read_to_string(p).unwrap())
        .collect()
}

// ── Help / Version ──

#[test]
fn shows_help() {
    let tmp = TempDir::new().unwrap();
    idc(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("local dev containers"))
        .stdout(predicate::str::contains("status-tracker"));
}

#[test]
fn shows_version() {
    let tmp = TempDir::new().unwrap();
    idc(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("idc"));
}

#[test]
fn unknown_command_fails_with_usage() {
    let tmp = TempDir::new().unwrap();
    idc(tmp.path())
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// ── Mode ──

#[test]
fn dev_and_prod_record_start_mode() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .arg("prod")
        .assert()
        .success()
        .stdout(predicate::str::contains("prod mode"));
    assert!(app_store(tmp.path()).contains("start-mode|=|prod"));

    idc(tmp.path()).arg("dev").assert().success();
    assert!(app_store(tmp.path()).contains("start-mode|=|dev"));
}

#[test]
fn commands_are_case_insensitive() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path()).arg("PROD").assert().success();

    assert!(app_store(tmp.path()).contains("start-mode|=|prod"));
}

// ── Set ──

#[test]
fn set_app_setting() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .args(["set", "debug-port=5005"])
        .assert()
        .success()
        .stdout(predicate::str::contains("debug-port set to 5005"));

    assert!(app_store(tmp.path()).contains("debug-port|=|5005"));
}

#[test]
fn set_null_removes_setting() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .args(["set", "workspace-origin=/home/dev/shop"])
        .assert()
        .success();
    idc(tmp.path())
        .args(["set", "workspace-origin=null"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));

    assert!(!app_store(tmp.path()).contains("workspace-origin"));
}

#[test]
fn set_root_password_goes_to_global_store_and_is_not_echoed() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .args(["set", "root-password=s3cret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("s3cret").not());

    let global = std::fs::read_to_string(tmp.path().join("home/.idc/db/global.db")).unwrap();
    assert_eq!(global, "root-password|=|s3cret\n");
    assert!(!tmp.path().join(".idc/db/global.db").exists());
}

#[test]
fn global_store_is_shared_between_applications() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("shop")).unwrap();
    std::fs::create_dir_all(tmp.path().join("blog")).unwrap();
    let global = tmp.path().join("home/.idc/db/global.db");

    idc(tmp.path())
        .args(["--app-dir", "shop", "set", "root-password=pw"])
        .assert()
        .success();
    idc(tmp.path())
        .args(["--app-dir", "blog", "set", "root-password=null"])
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(global).unwrap(), "");
    assert!(!tmp.path().join("shop/.idc/db/global.db").exists());
    assert!(!tmp.path().join("blog/.idc/db/global.db").exists());
}

#[test]
fn set_unknown_key_is_a_config_error() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .args(["set", "favourite-colour=blue"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown key"));
}

#[test]
fn set_rejects_runtime_records() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .args(["set", "container-name=custom"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown key"));
}

#[test]
fn set_rejects_non_numeric_debug_port() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .args(["set", "debug-port=abc"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected a port number"));
}

#[test]
fn set_requires_key_value() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .args(["set", "debug-port"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("KEY=VALUE"));
}

// ── Shell ──

#[test]
fn shell_is_unsupported() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .arg("shell")
        .assert()
        .success()
        .stdout(predicate::str::contains("not supported"));
}

// ── Configuration failures ──

#[test]
fn build_without_master_dockerfile_exits_2() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("pom.xml"), "<project/>").unwrap();

    idc(tmp.path())
        .arg("build")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("master Dockerfile"));
}

#[test]
fn build_without_build_descriptor_exits_2() {
    let tmp = TempDir::new().unwrap();
    let artifacts = tmp.path().join(".idc/artifacts");
    std::fs::create_dir_all(&artifacts).unwrap();
    std::fs::write(artifacts.join("Dockerfile"), "FROM scratch\n").unwrap();

    idc(tmp.path())
        .arg("build")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("build descriptor"));
}

#[test]
fn invalid_kube_override_exits_2() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .env("IDC_KUBE", "maybe")
        .arg("start")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("IDC_KUBE"));
}

#[test]
fn malformed_config_exits_2() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join(".idc")).unwrap();
    std::fs::write(tmp.path().join(".idc/idc.toml"), "[runtime\nkubernetes = ").unwrap();

    idc(tmp.path())
        .arg("stop")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to parse config"));
}

#[test]
fn state_dir_override_is_honoured() {
    let tmp = TempDir::new().unwrap();
    let state = tmp.path().join("elsewhere");

    idc(tmp.path())
        .env("IDC_STATE_DIR", &state)
        .arg("dev")
        .assert()
        .success();

    assert!(state.join("db").is_dir());
    assert!(!tmp.path().join(".idc").exists());
}

// ── Removal prompts ──

#[test]
fn declined_container_remove_touches_nothing() {
    let tmp = TempDir::new().unwrap();

    idc(tmp.path())
        .arg("container-remove")
        .write_stdin("maybe\nno\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Please answer yes or no."))
        .stdout(predicate::str::contains("nothing to do").not());
}
