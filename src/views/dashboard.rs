//! Home dashboard: issue statistics and the most recent active issues.

use serde::Serialize;

use crate::Result;
use crate::api::IssueApi;
use crate::models::query::{DateField, SortKey, sort_issues};
use crate::models::{Issue, IssueStats};
use crate::session::Session;

pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub stats: IssueStats,
    pub recent: Vec<Issue>,
}

impl Dashboard {
    /// Statistics and the recent-issues list come from two separate calls.
    pub fn load(api: &dyn IssueApi, session: &Session) -> Result<Self> {
        session.require_user()?;
        let stats = api.issue_stats(session)?;
        let mut recent = api.list_issues(session, Some(false))?;
        sort_issues(&mut recent, SortKey::NewestFirst, DateField::Created);
        recent.truncate(RECENT_LIMIT);
        Ok(Self { stats, recent })
    }
}
