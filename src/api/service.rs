//! Issue operations with client-side preconditions.
//!
//! These wrap [`IssueApi`] calls whose preconditions are checked locally
//! before any request is sent. A failed precondition is always
//! [`Error::Validation`] (or [`Error::Auth`] for a missing capability).

use tracing::info;

use super::IssueApi;
use crate::models::{Issue, IssueDraft, IssueId, Status};
use crate::session::{Capability, Session};
use crate::{Error, Result};

pub const ARCHIVE_REQUIRES_DONE: &str =
    "Only issues with status Done can be archived. Mark the issue as Done first.";

/// Create an issue on behalf of the logged-in user.
pub fn create_issue(api: &dyn IssueApi, session: &Session, draft: IssueDraft) -> Result<Issue> {
    let creator = session.user().ok_or_else(|| {
        Error::Validation("Cannot determine the creating user. Log in again.".to_string())
    })?;
    let payload = draft.into_new_issue(creator.id)?;
    let issue = api.create_issue(session, &payload)?;
    info!(issue_id = issue.id, "issue created");
    Ok(issue)
}

/// Archive a done issue, recording the current user as archiver.
pub fn archive_issue(api: &dyn IssueApi, session: &Session, issue: &Issue) -> Result<String> {
    session.require(Capability::ArchiveIssue)?;
    if issue.archived {
        return Err(Error::Validation("The issue is already archived".to_string()));
    }
    if issue.status != Status::Done {
        return Err(Error::Validation(ARCHIVE_REQUIRES_DONE.to_string()));
    }
    let archiver = session.require_user()?.id;
    let message = api.archive_issue(session, issue.id, archiver)?;
    info!(issue_id = issue.id, archiver, "issue archived");
    Ok(message)
}

/// Restore an archived issue to the active lists.
pub fn unarchive_issue(api: &dyn IssueApi, session: &Session, issue: &Issue) -> Result<String> {
    session.require(Capability::UnarchiveIssue)?;
    if !issue.archived {
        return Err(Error::Validation("The issue is not archived".to_string()));
    }
    let message = api.unarchive_issue(session, issue.id)?;
    info!(issue_id = issue.id, "issue unarchived");
    Ok(message)
}

pub fn delete_issue(api: &dyn IssueApi, session: &Session, id: IssueId) -> Result<String> {
    session.require(Capability::DeleteIssue)?;
    let message = api.delete_issue(session, id)?;
    info!(issue_id = id, "issue deleted");
    Ok(message)
}

/// Title search. A blank term is refused locally.
pub fn search_issues(api: &dyn IssueApi, session: &Session, title: &str) -> Result<Vec<Issue>> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Enter a title to search for".to_string()));
    }
    api.search_issues(session, title)
}
