//! Attachment management for a single issue.
//!
//! Uploads are checked locally against an [`UploadPolicy`] (5 MiB limit and
//! an optional MIME allow-list) before any request. A batch is uploaded with
//! all-settled semantics: one rejected or failed file never stops the
//! others, and a single aggregate warning is logged at the end.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::detail::ConfirmPrompt;
use crate::api::AttachmentApi;
use crate::models::{
    Attachment, AttachmentCount, AttachmentId, AttachmentSize, Issue, IssueId, UploadFile,
};
use crate::session::Session;
use crate::{Error, Result};

pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

pub const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

pub const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const ARCHIVED_READ_ONLY: &str = "Attachments of an archived issue cannot be changed";

/// Client-side upload restrictions of one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    /// `None` accepts any type.
    pub allowed_types: Option<Vec<&'static str>>,
}

impl UploadPolicy {
    /// Issue creation form: images plus PDF and Word documents.
    pub fn issue_creation() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            allowed_types: Some(IMAGE_TYPES.iter().chain(DOCUMENT_TYPES).copied().collect()),
        }
    }

    /// Generic upload widget: images only.
    pub fn image_widget() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            allowed_types: Some(IMAGE_TYPES.to_vec()),
        }
    }

    /// Why `file` would be refused, if it would.
    pub fn check(&self, file: &UploadFile) -> std::result::Result<(), String> {
        if file.size() > self.max_bytes {
            return Err(format!(
                "{} is {}, the limit is {}",
                file.name,
                format_bytes(file.size()),
                format_bytes(self.max_bytes)
            ));
        }
        if let Some(ref allowed) = self.allowed_types {
            let mime = file.mime.to_lowercase();
            if !allowed.iter().any(|t| *t == mime) {
                return Err(format!(
                    "{}: unsupported file type {}",
                    file.name, file.mime
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Uploaded(Attachment),
    /// Refused locally, never sent.
    Rejected(String),
    /// Sent, but the request failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub name: String,
    pub size: u64,
    pub status: UploadStatus,
}

/// Outcome of a batch upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub items: Vec<UploadItem>,
}

impl UploadReport {
    pub fn uploaded(&self) -> Vec<&Attachment> {
        self.items
            .iter()
            .filter_map(|i| match &i.status {
                UploadStatus::Uploaded(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    pub fn problems(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.status, UploadStatus::Rejected(_) | UploadStatus::Failed(_)))
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.problems() == 0
    }
}

/// Upload `files` to `issue`, reporting each item's progress to `on_progress`.
pub fn upload_batch(
    api: &dyn AttachmentApi,
    session: &Session,
    issue: IssueId,
    files: &[UploadFile],
    policy: &UploadPolicy,
    on_progress: &mut dyn FnMut(&UploadItem),
) -> UploadReport {
    let mut report = UploadReport {
        items: files
            .iter()
            .map(|f| UploadItem {
                name: f.name.clone(),
                size: f.size(),
                status: UploadStatus::Pending,
            })
            .collect(),
    };

    for (file, item) in files.iter().zip(report.items.iter_mut()) {
        if let Err(reason) = policy.check(file) {
            item.status = UploadStatus::Rejected(reason);
            on_progress(item);
            continue;
        }
        item.status = UploadStatus::Uploading;
        on_progress(item);
        item.status = match api.upload_attachment(session, issue, file) {
            Ok(attachment) => UploadStatus::Uploaded(attachment),
            Err(e) => UploadStatus::Failed(e.user_message()),
        };
        on_progress(item);
    }

    let problems = report.problems();
    if problems > 0 {
        warn!(
            issue_id = issue,
            failed = problems,
            total = files.len(),
            "some attachments were not uploaded"
        );
    }
    report
}

/// Human-readable size, base 1024: `0 Bytes`, `512 Bytes`, `1.5 KB`, `5 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Reduce a server-supplied file name to a safe local file name.
pub fn sanitize_file_name(name: &str, fallback_id: AttachmentId) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        format!("attachment-{}", fallback_id)
    } else {
        cleaned
    }
}

/// Attachments of one issue, with confirmation-gated deletion.
pub struct AttachmentManager<'a> {
    api: &'a dyn AttachmentApi,
    session: &'a Session,
    issue_id: IssueId,
    issue_archived: bool,
    attachments: Vec<Attachment>,
    pending_delete: Option<AttachmentId>,
}

impl<'a> AttachmentManager<'a> {
    pub fn new(api: &'a dyn AttachmentApi, session: &'a Session, issue: &Issue) -> Self {
        Self {
            api,
            session,
            issue_id: issue.id,
            issue_archived: issue.archived,
            attachments: Vec::new(),
            pending_delete: None,
        }
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn is_read_only(&self) -> bool {
        self.issue_archived
    }

    pub fn pending_delete(&self) -> Option<AttachmentId> {
        self.pending_delete
    }

    pub fn refresh(&mut self) -> Result<&[Attachment]> {
        self.attachments = self.api.list_attachments(self.session, self.issue_id)?;
        Ok(&self.attachments)
    }

    pub fn upload(
        &mut self,
        files: &[UploadFile],
        policy: &UploadPolicy,
        on_progress: &mut dyn FnMut(&UploadItem),
    ) -> Result<UploadReport> {
        if self.issue_archived {
            return Err(Error::Validation(ARCHIVED_READ_ONLY.to_string()));
        }
        let report = upload_batch(
            self.api,
            self.session,
            self.issue_id,
            files,
            policy,
            on_progress,
        );
        if !report.uploaded().is_empty() {
            // A failed refresh leaves the previous list; the uploads stand.
            if let Err(e) = self.refresh() {
                warn!(error = %e, "could not refresh attachments after upload");
            }
        }
        Ok(report)
    }

    /// Ask for confirmation before deleting `id`.
    pub fn request_delete(&mut self, id: AttachmentId) -> Result<ConfirmPrompt> {
        if self.issue_archived {
            return Err(Error::Validation(ARCHIVED_READ_ONLY.to_string()));
        }
        let attachment = self
            .attachments
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Attachment {} does not belong to issue {}",
                    id, self.issue_id
                ))
            })?;
        self.pending_delete = Some(id);
        Ok(ConfirmPrompt {
            title: "Delete attachment".to_string(),
            message: format!("Delete \"{}\"?", attachment.file_name),
        })
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the attachment awaiting confirmation.
    pub fn confirm_delete(&mut self) -> Result<String> {
        let id = self
            .pending_delete
            .take()
            .ok_or_else(|| Error::Validation("No attachment deletion to confirm".to_string()))?;
        let message = self.api.delete_attachment(self.session, id)?;
        info!(attachment_id = id, issue_id = self.issue_id, "attachment deleted");
        self.attachments.retain(|a| a.id != id);
        Ok(message)
    }

    /// Fetch the attachment body and save it under `dir`.
    pub fn download(&self, id: AttachmentId, dir: &Path) -> Result<PathBuf> {
        let name = self
            .attachments
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.file_name.clone())
            .unwrap_or_default();
        let bytes = self.api.download_attachment(self.session, id)?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(sanitize_file_name(&name, id));
        std::fs::write(&path, bytes)?;
        info!(attachment_id = id, path = %path.display(), "attachment saved");
        Ok(path)
    }

    pub fn count(&self) -> Result<AttachmentCount> {
        self.api.attachment_count(self.session, self.issue_id)
    }

    pub fn total_size(&self) -> Result<AttachmentSize> {
        self.api.attachment_size(self.session, self.issue_id)
    }
}
