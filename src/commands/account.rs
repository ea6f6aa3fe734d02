//! Login, logout, identity, password recovery and the dashboard.

use serde::Serialize;

use super::issue::issue_line;
use super::{Context, Message, Output, to_json_string};
use crate::Result;
use crate::models::{IssueStats, User};
use crate::session;
use crate::views::dashboard::Dashboard;
use crate::views::users;

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: User,
}

impl Output for LoginResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Logged in as {} <{}> ({})",
            self.user.full_name(),
            self.user.email,
            self.user.role
        )
    }
}

pub fn login(ctx: &Context, email: &str, password: &str) -> Result<LoginResult> {
    let client = ctx.client()?;
    let session = session::login(&client, ctx.store(), email, password)?;
    let user = session.require_user()?.clone();
    Ok(LoginResult { user })
}

pub fn logout(ctx: &Context) -> Result<Message> {
    session::logout(ctx.store())?;
    Ok(Message::new("Logged out"))
}

#[derive(Debug, Clone, Serialize)]
pub struct WhoAmI {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Output for WhoAmI {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        match self.user {
            Some(ref user) if self.authenticated => format!(
                "{} <{}>\nRole: {}\nUser ID: {}",
                user.full_name(),
                user.email,
                user.role,
                user.id
            ),
            _ => "Not logged in".to_string(),
        }
    }
}

/// Report the stored identity. Never contacts the server.
pub fn whoami(ctx: &Context) -> Result<WhoAmI> {
    let session = ctx.store().load()?;
    Ok(WhoAmI {
        authenticated: session.is_authenticated(),
        user: session.user().cloned(),
    })
}

pub fn recover_password(ctx: &Context, email: &str) -> Result<Message> {
    let client = ctx.client()?;
    users::recover_password(&client, email).map(Message::new)
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardResult {
    #[serde(flatten)]
    pub dashboard: Dashboard,
}

fn stats_lines(stats: &IssueStats) -> Vec<String> {
    vec![
        format!("Total: {}  Active: {}", stats.total, stats.active),
        format!(
            "To Do: {}  In Progress: {}  Done: {}",
            stats.todo, stats.in_progress, stats.done
        ),
    ]
}

impl Output for DashboardResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = stats_lines(&self.dashboard.stats);
        lines.push(String::new());
        if self.dashboard.recent.is_empty() {
            lines.push("No recent issues.".to_string());
        } else {
            lines.push("Recent issues:".to_string());
            lines.extend(self.dashboard.recent.iter().map(issue_line));
        }
        lines.join("\n")
    }
}

pub fn dashboard(ctx: &Context) -> Result<DashboardResult> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    Ok(DashboardResult {
        dashboard: Dashboard::load(&client, &session)?,
    })
}

pub(super) fn stats_human(stats: &IssueStats) -> String {
    stats_lines(stats).join("\n")
}
