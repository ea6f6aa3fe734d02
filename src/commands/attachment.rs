//! Attachment commands.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::{Confirm, Context, Message, Output, plural, to_json_string};
use crate::api::{AttachmentApi, HttpClient, IssueApi};
use crate::models::{
    Attachment, AttachmentCount, AttachmentId, AttachmentSize, IssueId, UploadFile,
};
use crate::session::Session;
use crate::views::attachments::{
    AttachmentManager, UploadItem, UploadPolicy, UploadStatus, format_bytes,
};
use crate::{Error, Result};

pub(super) fn attachment_line(attachment: &Attachment) -> String {
    format!(
        "[{}] {} ({}, {})",
        attachment.id,
        attachment.file_name,
        attachment.mime_type,
        format_bytes(attachment.size)
    )
}

/// Progress sink for batch uploads.
pub(super) fn upload_progress(item: &UploadItem) {
    debug!(file = %item.name, status = ?item.status, "upload progress");
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentList {
    pub issue_id: IssueId,
    pub attachments: Vec<Attachment>,
}

impl Output for AttachmentList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.attachments.is_empty() {
            return format!("Issue #{} has no attachments.", self.issue_id);
        }
        let mut lines: Vec<String> = self.attachments.iter().map(attachment_line).collect();
        let total: u64 = self.attachments.iter().map(|a| a.size).sum();
        lines.push(format!(
            "{}, {}",
            plural(self.attachments.len(), "attachment"),
            format_bytes(total)
        ));
        lines.join("\n")
    }
}

fn manager<'a>(
    client: &'a HttpClient,
    session: &'a Session,
    issue_id: IssueId,
) -> Result<AttachmentManager<'a>> {
    let issue = client.get_issue(session, issue_id)?;
    let mut manager = AttachmentManager::new(client, session, &issue);
    manager.refresh()?;
    Ok(manager)
}

pub fn attachment_list(ctx: &Context, issue_id: IssueId) -> Result<AttachmentList> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let manager = manager(&client, &session, issue_id)?;
    Ok(AttachmentList {
        issue_id,
        attachments: manager.attachments().to_vec(),
    })
}

/// Outcome of one file in a batch upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadLine {
    pub file: String,
    pub size: u64,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&UploadItem> for UploadLine {
    fn from(item: &UploadItem) -> Self {
        let (status, attachment, reason) = match &item.status {
            UploadStatus::Pending => ("pending", None, None),
            UploadStatus::Uploading => ("uploading", None, None),
            UploadStatus::Uploaded(a) => ("uploaded", Some(a.clone()), None),
            UploadStatus::Rejected(r) => ("rejected", None, Some(r.clone())),
            UploadStatus::Failed(r) => ("failed", None, Some(r.clone())),
        };
        Self {
            file: item.name.clone(),
            size: item.size,
            status,
            attachment,
            reason,
        }
    }
}

impl UploadLine {
    pub fn to_human(&self) -> String {
        match self.reason {
            Some(ref reason) => format!("{}: {} ({})", self.file, self.status, reason),
            None => format!("{}: {} ({})", self.file, self.status, format_bytes(self.size)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub issue_id: IssueId,
    pub uploaded: usize,
    pub failed: usize,
    pub files: Vec<UploadLine>,
}

impl Output for UploadResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self.files.iter().map(UploadLine::to_human).collect();
        lines.push(format!(
            "{} uploaded, {} failed",
            self.uploaded, self.failed
        ));
        lines.join("\n")
    }
}

/// Upload image files to an issue. A refused or failed file does not stop
/// the others.
pub fn attachment_upload(
    ctx: &Context,
    issue_id: IssueId,
    paths: &[PathBuf],
) -> Result<UploadResult> {
    let session = ctx.session()?;
    if paths.is_empty() {
        return Err(Error::Validation("No files to upload".to_string()));
    }
    let files = paths
        .iter()
        .map(|p| UploadFile::from_path(p))
        .collect::<Result<Vec<_>>>()?;
    let client = ctx.client()?;
    let mut manager = manager(&client, &session, issue_id)?;
    let report = manager.upload(&files, &UploadPolicy::image_widget(), &mut upload_progress)?;
    Ok(UploadResult {
        issue_id,
        uploaded: report.uploaded().len(),
        failed: report.problems(),
        files: report.items.iter().map(UploadLine::from).collect(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Downloaded {
    pub attachment_id: AttachmentId,
    pub path: PathBuf,
}

impl Output for Downloaded {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Saved {}", self.path.display())
    }
}

pub fn attachment_download(
    ctx: &Context,
    issue_id: IssueId,
    attachment_id: AttachmentId,
    dir: &Path,
) -> Result<Downloaded> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let manager = manager(&client, &session, issue_id)?;
    let path = manager.download(attachment_id, dir)?;
    Ok(Downloaded {
        attachment_id,
        path,
    })
}

pub fn attachment_delete(
    ctx: &Context,
    issue_id: IssueId,
    attachment_id: AttachmentId,
    confirm: Confirm<'_>,
) -> Result<Message> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let mut manager = manager(&client, &session, issue_id)?;
    let prompt = manager.request_delete(attachment_id)?;
    if !confirm(&prompt) {
        manager.cancel_delete();
        return Ok(Message::cancelled());
    }
    manager.confirm_delete().map(Message::new)
}

impl Output for AttachmentCount {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Issue #{}: {}",
            self.issue_id,
            plural(self.count as usize, "attachment")
        )
    }
}

impl Output for AttachmentSize {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Issue #{}: {}", self.issue_id, format_bytes(self.total_bytes))
    }
}

pub fn attachment_count(ctx: &Context, issue_id: IssueId) -> Result<AttachmentCount> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    client.attachment_count(&session, issue_id)
}

pub fn attachment_size(ctx: &Context, issue_id: IssueId) -> Result<AttachmentSize> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    client.attachment_size(&session, issue_id)
}
