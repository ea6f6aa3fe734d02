//! Issue creation form.
//!
//! Attached files are only staged. Submitting creates the issue first and
//! then uploads the files as one batch, where an unsupported or oversized
//! file is recorded as rejected without holding back the others. The issue
//! stands even when every upload fails.

use tracing::info;

use super::attachments::{UploadItem, UploadPolicy, UploadReport, upload_batch};
use crate::api::{AttachmentApi, IssueApi, service};
use crate::models::{Issue, IssueDraft, UploadFile};
use crate::session::Session;
use crate::Result;

#[derive(Debug, Clone)]
pub struct CreateIssueForm {
    pub draft: IssueDraft,
    files: Vec<UploadFile>,
    policy: UploadPolicy,
}

#[derive(Debug, Clone)]
pub struct CreatedIssue {
    pub issue: Issue,
    pub uploads: UploadReport,
}

impl Default for CreateIssueForm {
    fn default() -> Self {
        Self::new(IssueDraft::default())
    }
}

impl CreateIssueForm {
    pub fn new(draft: IssueDraft) -> Self {
        Self {
            draft,
            files: Vec::new(),
            policy: UploadPolicy::issue_creation(),
        }
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    /// Stage `file` for upload once the issue exists.
    pub fn attach(&mut self, file: UploadFile) {
        self.files.push(file);
    }

    pub fn detach(&mut self, name: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.name != name);
        self.files.len() != before
    }

    /// Create the issue, then upload the attached files to it.
    pub fn submit<A>(
        self,
        api: &A,
        session: &Session,
        on_progress: &mut dyn FnMut(&UploadItem),
    ) -> Result<CreatedIssue>
    where
        A: IssueApi + AttachmentApi,
    {
        let issue = service::create_issue(api, session, self.draft)?;
        let uploads = if self.files.is_empty() {
            UploadReport::default()
        } else {
            upload_batch(api, session, issue.id, &self.files, &self.policy, on_progress)
        };
        info!(
            issue_id = issue.id,
            attachments = uploads.uploaded().len(),
            "issue submitted"
        );
        Ok(CreatedIssue { issue, uploads })
    }
}
