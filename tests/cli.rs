//! CLI integration tests for vitrine admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use vitrine::store::{SqliteStore, Store};

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("vitrine").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn create_user(&self, extra: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["admin", "create-user", "--data-dir", &self.data_dir_str()])
            .args(extra)
            .assert()
    }

    fn users_json(&self) -> Vec<Value> {
        let output = self
            .cmd()
            .args([
                "admin",
                "list-users",
                "--data-dir",
                &self.data_dir_str(),
                "--json",
            ])
            .output()
            .expect("failed to run command");
        assert!(output.status.success());

        let parsed: Value = serde_json::from_slice(&output.stdout).expect("failed to parse JSON");
        parsed.as_array().expect("users not an array").clone()
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("vitrine.db")).expect("open store")
    }
}

#[test]
fn create_user_generates_credentials() {
    let ctx = TestContext::new();

    ctx.create_user(&[])
        .success()
        .stdout(predicate::str::contains("User ID:  user"))
        .stdout(predicate::str::contains("Password: "));

    let users = ctx.users_json();
    assert_eq!(users.len(), 1);
    assert!(users[0]["user_id"].as_str().unwrap().starts_with("user"));
    assert_eq!(users[0]["name"], "");
}

#[test]
fn create_user_with_explicit_credentials() {
    let ctx = TestContext::new();

    ctx.create_user(&["--user-id", "front-desk", "--password", "s3cret"])
        .success()
        .stdout(predicate::str::contains("front-desk"));

    let user = ctx.store().get_user("front-desk").unwrap().unwrap();
    assert_eq!(user.password, "s3cret");

    ctx.create_user(&["--user-id", "front-desk", "--password", "other"])
        .failure();
}

#[test]
fn create_user_requires_both_credentials() {
    let ctx = TestContext::new();
    ctx.create_user(&["--user-id", "front-desk"]).failure();
}

#[test]
fn list_users_table_and_empty() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["admin", "list-users", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No users"));

    ctx.create_user(&["--user-id", "front-desk", "--password", "s3cret"])
        .success();

    ctx.cmd()
        .args(["admin", "list-users", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("USER ID"))
        .stdout(predicate::str::contains("front-desk"));
}

#[test]
fn delete_user_removes_rows_and_files() {
    let ctx = TestContext::new();
    ctx.create_user(&["--user-id", "front-desk", "--password", "s3cret"])
        .success();

    ctx.temp_dir.child("uploads").create_dir_all().unwrap();
    let stored = ctx.temp_dir.child("uploads").child("1700000000000-desk.jpg");
    stored.write_binary(b"jpeg").unwrap();

    {
        let store = ctx.store();
        let category = store.add_user_category("front-desk", "Lobby", false).unwrap();
        store
            .record_upload("front-desk", category.id, "uploads/1700000000000-desk.jpg")
            .unwrap();
    }

    ctx.cmd()
        .args([
            "admin",
            "delete-user",
            "front-desk",
            "--data-dir",
            &ctx.data_dir_str(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 image(s)"));

    stored.assert(predicate::path::missing());
    assert!(ctx.users_json().is_empty());

    ctx.cmd()
        .args([
            "admin",
            "delete-user",
            "front-desk",
            "--data-dir",
            &ctx.data_dir_str(),
        ])
        .assert()
        .failure();
}

#[test]
fn delete_user_uses_configured_content_dir() {
    let ctx = TestContext::new();
    ctx.create_user(&["--user-id", "front-desk", "--password", "s3cret"])
        .success();

    let media = ctx.temp_dir.child("media");
    media.create_dir_all().unwrap();
    let stored = media.child("1700000000000-desk.jpg");
    stored.write_binary(b"jpeg").unwrap();

    let config = ctx.temp_dir.child("vitrine.toml");
    config
        .write_str(&format!(
            "data_dir = '{}'\n\n[blob]\nbackend = \"local\"\ncontent_dir = '{}'\n",
            ctx.data_dir().display(),
            media.path().display()
        ))
        .unwrap();

    {
        let store = ctx.store();
        let category = store.add_user_category("front-desk", "Lobby", false).unwrap();
        store
            .record_upload("front-desk", category.id, "uploads/1700000000000-desk.jpg")
            .unwrap();
    }

    ctx.cmd()
        .args(["admin", "delete-user", "front-desk", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 image(s)"));

    stored.assert(predicate::path::missing());
    assert!(ctx.users_json().is_empty());
}
