//! Service interfaces to the BugBoard REST backend.
//!
//! Each trait groups the endpoints of one backend controller. Every call
//! takes the caller's [`Session`] explicitly; only `login` and
//! `recover_password` work without one. [`http::HttpClient`] implements all
//! four traits over HTTP, and view models depend on the traits only.
//!
//! Mutations that the backend answers with `{"message": ...}` return that
//! message.

pub mod http;
pub mod service;

pub use http::HttpClient;

use crate::Result;
use crate::models::{
    Attachment, AttachmentCount, AttachmentId, AttachmentSize, Issue, IssueId, IssueStats,
    IssueType, IssueUpdate, LoginResponse, NewIssue, NewUser, Priority, Role, Status,
    UploadFile, User, UserId, query::IssueFilter,
};
use crate::session::Session;

/// `/utenza` authentication endpoints.
pub trait AuthApi {
    fn login(&self, email: &str, password: &str) -> Result<LoginResponse>;

    fn recover_password(&self, email: &str) -> Result<String>;

    /// Change the logged-in user's password.
    fn change_password(&self, session: &Session, new_password: &str) -> Result<String>;
}

/// `/issue` endpoints.
pub trait IssueApi {
    /// Full list, optionally scoped by the archived flag.
    fn list_issues(&self, session: &Session, archived: Option<bool>) -> Result<Vec<Issue>>;

    fn get_issue(&self, session: &Session, id: IssueId) -> Result<Issue>;

    /// Server-side filter and sort.
    fn filter_issues_advanced(&self, session: &Session, filter: &IssueFilter)
    -> Result<Vec<Issue>>;

    /// Simple equality filter without sort or scope.
    fn filter_issues(
        &self,
        session: &Session,
        status: Option<Status>,
        priority: Option<Priority>,
        issue_type: Option<IssueType>,
    ) -> Result<Vec<Issue>>;

    fn search_issues(&self, session: &Session, title: &str) -> Result<Vec<Issue>>;

    fn create_issue(&self, session: &Session, issue: &NewIssue) -> Result<Issue>;

    fn update_issue(&self, session: &Session, id: IssueId, update: &IssueUpdate)
    -> Result<Issue>;

    fn delete_issue(&self, session: &Session, id: IssueId) -> Result<String>;

    fn archive_issue(&self, session: &Session, id: IssueId, archiver: UserId) -> Result<String>;

    fn unarchive_issue(&self, session: &Session, id: IssueId) -> Result<String>;

    fn issue_stats(&self, session: &Session) -> Result<IssueStats>;
}

/// `/allegato` endpoints.
pub trait AttachmentApi {
    fn list_attachments(&self, session: &Session, issue: IssueId) -> Result<Vec<Attachment>>;

    fn upload_attachment(
        &self,
        session: &Session,
        issue: IssueId,
        file: &UploadFile,
    ) -> Result<Attachment>;

    fn download_attachment(&self, session: &Session, id: AttachmentId) -> Result<Vec<u8>>;

    fn delete_attachment(&self, session: &Session, id: AttachmentId) -> Result<String>;

    fn attachment_count(&self, session: &Session, issue: IssueId) -> Result<AttachmentCount>;

    fn attachment_size(&self, session: &Session, issue: IssueId) -> Result<AttachmentSize>;
}

/// `/utenza` administration endpoints.
pub trait UserApi {
    fn list_users(&self, session: &Session) -> Result<Vec<User>>;

    fn create_user(&self, session: &Session, user: &NewUser) -> Result<User>;

    fn change_role(&self, session: &Session, id: UserId, role: Role) -> Result<User>;

    fn set_active(&self, session: &Session, id: UserId, active: bool) -> Result<User>;
}
