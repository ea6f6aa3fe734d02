//! Command implementations for the `bb` CLI.
//!
//! Each command returns a result type implementing [`Output`], printed by
//! `main` as JSON (default) or human-readable text (`-H`).
//! Commands are organized by area:
//! - `account` - login, logout, whoami, password recovery, dashboard
//! - `issue` - issue lists, detail, lifecycle
//! - `attachment` - attachment listing, upload, download, deletion
//! - `user` - user administration and password change
//! - `settings` - config.kdl and stored preferences

mod account;
mod attachment;
mod issue;
mod settings;
mod user;

pub use account::{
    DashboardResult, LoginResult, WhoAmI, dashboard, login, logout, recover_password, whoami,
};
pub use attachment::{
    AttachmentList, Downloaded, UploadLine, UploadResult, attachment_count, attachment_delete,
    attachment_download, attachment_list, attachment_size, attachment_upload,
};
pub use issue::{
    IssueList, IssueResult, IssueShow, issue_archive, issue_create, issue_delete, issue_list,
    issue_search, issue_show, issue_stats, issue_unarchive, issue_update,
};
pub use settings::{ConfigShow, SidebarState, config_set, config_show, config_sidebar};
pub use user::{UserList, UserResult, user_create, user_list, user_passwd, user_role, user_set_active};

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::Result;
use crate::api::HttpClient;
use crate::config::ResolvedConfig;
use crate::session::{Session, SessionStore};
use crate::views::detail::ConfirmPrompt;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

pub(crate) fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// Asks the user to confirm a destructive action.
pub type Confirm<'a> = &'a mut dyn FnMut(&ConfirmPrompt) -> bool;

/// Everything a command needs: stored session, config and where they live.
#[derive(Debug, Clone)]
pub struct Context {
    store: SessionStore,
    config_dir: PathBuf,
    config: ResolvedConfig,
}

impl Context {
    pub fn new(store: SessionStore, config_dir: impl Into<PathBuf>, config: ResolvedConfig) -> Self {
        Self {
            store,
            config_dir: config_dir.into(),
            config,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn client(&self) -> Result<HttpClient> {
        HttpClient::new(self.config.api_url())
    }

    /// The stored session, which must be logged in.
    pub fn session(&self) -> Result<Session> {
        let session = self.store.load()?;
        session.require_user()?;
        Ok(session)
    }
}

/// A server or local confirmation message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cancelled: false,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            message: "Cancelled".to_string(),
            cancelled: true,
        }
    }
}

impl Output for Message {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        self.message.clone()
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}
