//! Common test utilities for BugBoard integration tests.
//!
//! Provides `TestEnv`: isolated data and config directories plus a mockito
//! server standing in for the REST backend, so tests never touch the
//! user's real session or a live server.

#![allow(dead_code)]

use assert_cmd::Command;
use bugboard::models::{Role, User};
use bugboard::session::{Session, SessionStore};
use mockito::{Mock, Server, ServerGuard};
use serde_json::{Value, json};
pub use tempfile::TempDir;

pub const TOKEN: &str = "test-token";

/// A test environment with isolated storage and a fake backend.
///
/// The `bb()` method returns a `Command` with `BUGBOARD_DATA_DIR`,
/// `BUGBOARD_CONFIG_DIR` and `BUGBOARD_API_URL` set per invocation, making
/// tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
    pub server: ServerGuard,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
            server: Server::new(),
        }
    }

    /// A test environment with a stored administrator session.
    pub fn as_admin() -> Self {
        let env = Self::new();
        env.store_session(admin());
        env
    }

    /// A test environment with a stored regular-user session.
    pub fn as_user() -> Self {
        let env = Self::new();
        env.store_session(regular_user());
        env
    }

    pub fn api_url(&self) -> String {
        format!("{}/api", self.server.url())
    }

    /// Get a Command for the bb binary bound to this environment.
    pub fn bb(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bb"));
        cmd.env("BUGBOARD_DATA_DIR", self.data_dir.path());
        cmd.env("BUGBOARD_CONFIG_DIR", self.config_dir.path());
        cmd.env("BUGBOARD_API_URL", self.api_url());
        cmd.env_remove("BUGBOARD_PASSWORD");
        cmd.env_remove("BUGBOARD_LOG");
        cmd
    }

    pub fn store(&self) -> SessionStore {
        SessionStore::new(self.data_dir.path())
    }

    pub fn store_session(&self, user: User) {
        self.store().save(&Session::new(TOKEN, user)).unwrap();
    }

    /// Start a mock for an authenticated endpoint under `/api`.
    pub fn mock_api(&mut self, method: &str, path: &str) -> Mock {
        self.server
            .mock(method, format!("/api{}", path).as_str())
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
    }

    /// Mock an authenticated endpoint answering `body` as JSON.
    pub fn mock_json(&mut self, method: &str, path: &str, status: usize, body: Value) -> Mock {
        self.mock_api(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create()
    }

    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    pub fn config_path(&self) -> &std::path::Path {
        self.config_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

pub fn admin() -> User {
    User {
        id: 1,
        name: "Anna".into(),
        surname: "Rossi".into(),
        email: "anna.rossi@bugboard.it".into(),
        role: Role::Administrator,
        active: true,
    }
}

pub fn regular_user() -> User {
    User {
        id: 2,
        name: "Luca".into(),
        surname: "Bianchi".into(),
        email: "luca.bianchi@bugboard.it".into(),
        role: Role::User,
        active: true,
    }
}

pub fn user_json(user: &User) -> Value {
    serde_json::to_value(user).unwrap()
}

/// An issue as the backend serializes it.
pub fn issue_json(id: u64, title: &str, status: &str, archived: bool) -> Value {
    json!({
        "idIssue": id,
        "titolo": title,
        "descrizione": format!("Description of {}", title),
        "tipo": "bug",
        "priorita": "medium",
        "stato": status,
        "archiviata": archived,
        "dataCreazione": format!("2025-01-{:02}T09:00:00", id.min(28)),
        "dataArchiviazione": if archived { json!("2025-02-01T10:00:00") } else { Value::Null },
        "creatore": user_json(&admin()),
        "archiviatore": if archived { user_json(&admin()) } else { Value::Null },
    })
}
