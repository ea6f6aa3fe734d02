//! Integration tests for `bb config`.
//!
//! These tests verify that config.kdl values are written and resolved with
//! the right precedence, that the stored token is never printed in full,
//! and that the sidebar preference survives between invocations.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_config_show_defaults() {
    let env = TestEnv::new();

    env.bb()
        .env_remove("BUGBOARD_API_URL")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"api_url\":\"http://localhost:8080/api\"",
        ))
        .stdout(predicate::str::contains("\"api_url_source\":\"default\""))
        .stdout(predicate::str::contains("\"logged_in\":false"))
        .stdout(predicate::str::contains("\"sidebar_open\":true"));
}

#[test]
fn test_config_show_env_source() {
    let env = TestEnv::new();

    env.bb()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"api_url_source\":\"env:BUGBOARD_API_URL\"",
        ));
}

#[test]
fn test_config_set_api_url() {
    let env = TestEnv::new();

    env.bb()
        .args(["config", "set", "api-url", "https://bugs.example.com/api/"])
        .assert()
        .success();

    env.bb()
        .env_remove("BUGBOARD_API_URL")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"api_url\":\"https://bugs.example.com/api\"",
        ))
        .stdout(predicate::str::contains("\"api_url_source\":\"config\""));

    env.bb()
        .env_remove("BUGBOARD_API_URL")
        .args(["--api-url", "http://other:9000/api", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"api_url_source\":\"cli\""));
}

#[test]
fn test_config_set_rejects_bad_values() {
    let env = TestEnv::new();

    env.bb()
        .args(["config", "set", "api-url", "ftp://bugs.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("http://"));

    env.bb()
        .args(["-H", "config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key 'colour'"));
}

#[test]
fn test_output_format_from_config() {
    let env = TestEnv::new();

    env.bb()
        .args(["config", "set", "output-format", "human"])
        .assert()
        .success();

    env.bb()
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn test_config_show_masks_token() {
    let env = TestEnv::as_admin();

    env.bb()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"logged_in\":true"))
        .stdout(predicate::str::contains(common::TOKEN).not());
}

#[test]
fn test_sidebar_preference_persists() {
    let env = TestEnv::new();

    env.bb()
        .args(["-H", "config", "sidebar", "closed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sidebar closed"));

    env.bb()
        .args(["config", "sidebar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sidebar_open\":false"));

    assert!(!env.store().sidebar_open().unwrap());
}

#[test]
fn test_logout_keeps_sidebar_preference() {
    let env = TestEnv::as_user();
    env.store().set_sidebar_open(false).unwrap();

    env.bb().arg("logout").assert().success();

    assert!(!env.store().sidebar_open().unwrap());
    assert!(!env.store().load().unwrap().is_authenticated());
}
