//! View-state models driven by the CLI.
//!
//! Each view owns its transient state (filters, dialogs, upload progress)
//! and talks to the backend only through the service traits in
//! [`crate::api`]. Nothing here is cached across views: every navigation
//! builds a fresh view and fetches again.

pub mod attachments;
pub mod create_issue;
pub mod dashboard;
pub mod detail;
pub mod list;
pub mod users;

use serde::{Deserialize, Serialize};

/// The issue list a user navigated from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListRoute {
    #[default]
    Active,
    Archived,
}

impl ListRoute {
    pub fn path(&self) -> &'static str {
        match self {
            ListRoute::Active => "/issues",
            ListRoute::Archived => "/issues/archived",
        }
    }
}
