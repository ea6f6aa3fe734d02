//! Issue commands: lists, detail, creation, update and lifecycle.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use super::account::stats_human;
use super::attachment::{UploadLine, attachment_line, upload_progress};
use super::{Confirm, Context, Message, Output, plural, to_json_string};
use crate::api::{IssueApi, service};
use crate::models::query::IssueFilter;
use crate::models::{
    Attachment, Issue, IssueDraft, IssueId, IssueStats, IssueUpdate, MAX_DESCRIPTION_CHARS,
    MAX_TITLE_CHARS, UploadFile,
};
use crate::session::Capability;
use crate::views::ListRoute;
use crate::views::attachments::AttachmentManager;
use crate::views::create_issue::CreateIssueForm;
use crate::views::detail::{DetailAction, DetailControl, DetailEffect, IssueDetail};
use crate::views::list::view_for;
use crate::{Error, Result};

fn timestamp(at: Option<NaiveDateTime>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One-line rendering used by every issue listing.
pub(super) fn issue_line(issue: &Issue) -> String {
    format!(
        "#{:<5} {:<11} {:<13} {:<8} {}",
        issue.id,
        issue.status.to_string(),
        issue.issue_type.to_string(),
        issue.priority.to_string(),
        issue.title
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<ListRoute>,
    pub issues: Vec<Issue>,
    pub shown: usize,
    pub total: usize,
}

impl Output for IssueList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.issues.is_empty() {
            return "No issues found.".to_string();
        }
        let mut lines: Vec<String> = self.issues.iter().map(issue_line).collect();
        lines.push(String::new());
        if self.shown == self.total {
            lines.push(plural(self.shown, "issue"));
        } else {
            lines.push(format!("Showing {} of {} issues", self.shown, self.total));
        }
        lines.join("\n")
    }
}

/// Load the active or archived list with `filter` applied.
pub fn issue_list(ctx: &Context, route: ListRoute, filter: IssueFilter) -> Result<IssueList> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let mut view = view_for(route, filter);
    view.load(&client, &session)?;
    Ok(IssueList {
        route: Some(view.route()),
        issues: view.visible().to_vec(),
        shown: view.visible().len(),
        total: view.total(),
    })
}

pub fn issue_search(ctx: &Context, term: &str) -> Result<IssueList> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let issues = service::search_issues(&client, &session, term)?;
    Ok(IssueList {
        route: None,
        shown: issues.len(),
        total: issues.len(),
        issues,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueShow {
    pub issue: Issue,
    pub attachments: Vec<Attachment>,
    pub actions: Vec<&'static str>,
    pub back: &'static str,
}

fn control_name(control: DetailControl) -> &'static str {
    match control {
        DetailControl::Archive => "archive",
        DetailControl::Unarchive => "unarchive",
        DetailControl::Delete => "delete",
        DetailControl::ReturnToList => "back",
    }
}

impl Output for IssueShow {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let issue = &self.issue;
        let mut lines = vec![
            format!("#{} {}", issue.id, issue.title),
            format!(
                "Status: {}  Type: {}  Priority: {}",
                issue.status, issue.issue_type, issue.priority
            ),
        ];
        let creator = issue
            .creator
            .as_ref()
            .map(|u| format!(" by {}", u.full_name()))
            .unwrap_or_default();
        lines.push(format!("Created: {}{}", timestamp(issue.created_at), creator));
        if issue.updated_at.is_some() {
            lines.push(format!("Updated: {}", timestamp(issue.updated_at)));
        }
        if issue.resolved_at.is_some() {
            lines.push(format!("Resolved: {}", timestamp(issue.resolved_at)));
        }
        if issue.archived {
            let archiver = issue
                .archiver
                .as_ref()
                .map(|u| format!(" by {}", u.full_name()))
                .unwrap_or_default();
            lines.push(format!("Archived: {}{}", timestamp(issue.archived_at), archiver));
        }
        if !issue.description.is_empty() {
            lines.push(String::new());
            lines.push(issue.description.clone());
        }
        lines.push(String::new());
        if self.attachments.is_empty() {
            lines.push("No attachments.".to_string());
        } else {
            lines.push(format!("Attachments ({}):", self.attachments.len()));
            lines.extend(self.attachments.iter().map(|a| format!("  {}", attachment_line(a))));
        }
        lines.push(format!("Actions: {}", self.actions.join(", ")));
        lines.join("\n")
    }
}

pub fn issue_show(ctx: &Context, id: IssueId, from: Option<ListRoute>) -> Result<IssueShow> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let detail = IssueDetail::open(&client, &session, id, from)?;
    let issue = detail
        .issue()
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("Issue {} not found", id)))?;
    let mut attachments = AttachmentManager::new(&client, &session, &issue);
    attachments.refresh()?;
    Ok(IssueShow {
        attachments: attachments.attachments().to_vec(),
        actions: detail
            .available_controls()
            .into_iter()
            .map(control_name)
            .collect(),
        back: detail.state().return_to.path(),
        issue,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueResult {
    pub issue: Issue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uploads: Vec<UploadLine>,
}

impl Output for IssueResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![issue_line(&self.issue)];
        lines.extend(self.uploads.iter().map(|u| format!("  {}", u.to_human())));
        lines.join("\n")
    }
}

/// Create an issue and upload `files` to it. A file the upload policy
/// refuses is reported per file and does not stop the issue or the rest.
pub fn issue_create(ctx: &Context, draft: IssueDraft, files: &[PathBuf]) -> Result<IssueResult> {
    let session = ctx.session()?;
    draft.validate()?;
    let mut form = CreateIssueForm::new(draft);
    for path in files {
        form.attach(UploadFile::from_path(path)?);
    }
    let client = ctx.client()?;
    let created = form.submit(&client, &session, &mut upload_progress)?;
    Ok(IssueResult {
        issue: created.issue,
        uploads: created.uploads.items.iter().map(UploadLine::from).collect(),
    })
}

fn check_update(update: &IssueUpdate) -> Result<()> {
    if update.is_empty() {
        return Err(Error::Validation("Nothing to update".to_string()));
    }
    if let Some(ref title) = update.title {
        let len = title.trim().chars().count();
        if len == 0 || len > MAX_TITLE_CHARS {
            return Err(Error::Validation(format!(
                "Title must be 1 to {} characters",
                MAX_TITLE_CHARS
            )));
        }
    }
    if let Some(ref description) = update.description {
        let len = description.trim().chars().count();
        if len == 0 || len > MAX_DESCRIPTION_CHARS {
            return Err(Error::Validation(format!(
                "Description must be 1 to {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }
    }
    Ok(())
}

pub fn issue_update(ctx: &Context, id: IssueId, update: IssueUpdate) -> Result<IssueResult> {
    let session = ctx.session()?;
    check_update(&update)?;
    let client = ctx.client()?;
    let issue = client.update_issue(&session, id, &update)?;
    info!(issue_id = id, "issue updated");
    Ok(IssueResult {
        issue,
        uploads: Vec::new(),
    })
}

/// Drive a confirmation-gated lifecycle action through the detail view.
fn run_lifecycle(
    ctx: &Context,
    id: IssueId,
    request: DetailAction,
    capability: Capability,
    confirm: Confirm<'_>,
) -> Result<Message> {
    let session = ctx.session()?;
    session.require(capability)?;
    let client = ctx.client()?;
    let mut detail = IssueDetail::open(&client, &session, id, None)?;

    let effects = detail.dispatch(request);
    let prompt = effects.iter().find_map(|e| match e {
        DetailEffect::Prompt(p) => Some(p.clone()),
        _ => None,
    });
    let Some(prompt) = prompt else {
        return Err(detail_error(&mut detail, &effects));
    };
    if !confirm(&prompt) {
        detail.dispatch(DetailAction::Cancel);
        return Ok(Message::cancelled());
    }

    let effects = detail.dispatch(DetailAction::Confirm);
    let notice = effects.iter().find_map(|e| match e {
        DetailEffect::ShowNotice(m) => Some(m.clone()),
        _ => None,
    });
    match notice {
        Some(message) => Ok(Message::new(message)),
        None => Err(detail_error(&mut detail, &effects)),
    }
}

fn detail_error(detail: &mut IssueDetail<'_>, effects: &[DetailEffect]) -> Error {
    if let Some(error) = detail.take_error() {
        return error;
    }
    let message = effects
        .iter()
        .find_map(|e| match e {
            DetailEffect::ShowError(m) => Some(m.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "The action could not be completed".to_string());
    Error::Validation(message)
}

pub fn issue_archive(ctx: &Context, id: IssueId, confirm: Confirm<'_>) -> Result<Message> {
    run_lifecycle(ctx, id, DetailAction::RequestArchive, Capability::ArchiveIssue, confirm)
}

pub fn issue_unarchive(ctx: &Context, id: IssueId, confirm: Confirm<'_>) -> Result<Message> {
    run_lifecycle(
        ctx,
        id,
        DetailAction::RequestUnarchive,
        Capability::UnarchiveIssue,
        confirm,
    )
}

pub fn issue_delete(ctx: &Context, id: IssueId, confirm: Confirm<'_>) -> Result<Message> {
    run_lifecycle(ctx, id, DetailAction::RequestDelete, Capability::DeleteIssue, confirm)
}

impl Output for IssueStats {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        stats_human(self)
    }
}

pub fn issue_stats(ctx: &Context) -> Result<IssueStats> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    client.issue_stats(&session)
}
