//! Data models for BugBoard entities.
//!
//! This module defines the records exchanged with the REST backend:
//! - `Issue` - Tracked work item with type, priority, status and archival data
//! - `User` - Account with generated email, role and active flag
//! - `Attachment` - File metadata owned by one issue
//! - `IssueStats`, `AttachmentCount`, `AttachmentSize` - Aggregates
//!
//! Field names on the wire follow the backend (Italian), the Rust side uses
//! English names through serde renames.

pub mod email;
pub mod query;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Result};

pub type IssueId = u64;
pub type UserId = u64;
pub type AttachmentId = u64;

/// Workflow status of an issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "Todo", alias = "todo", alias = "TODO")]
    Todo,
    #[serde(
        rename = "inProgress",
        alias = "inprogress",
        alias = "in_progress",
        alias = "InProgress",
        alias = "in-progress"
    )]
    InProgress,
    #[serde(rename = "Done", alias = "done", alias = "DONE")]
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    /// Parse a status, case-insensitive. Accepts `in_progress` and `in-progress`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "todo" | "to do" => Some(Status::Todo),
            "inprogress" | "in_progress" | "in-progress" | "in progress" => {
                Some(Status::InProgress)
            }
            "done" => Some(Status::Done),
            _ => None,
        }
    }

    /// Query parameter spelling understood by the backend.
    pub fn as_param(&self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "inprogress",
            Status::Done => "done",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Status::parse(s).ok_or_else(|| format!("invalid status '{}' (todo, inprogress, done)", s))
    }
}

/// Kind of issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    #[serde(rename = "bug", alias = "Bug", alias = "BUG")]
    Bug,
    #[serde(rename = "features", alias = "feature", alias = "Features", alias = "Feature")]
    Feature,
    #[serde(rename = "question", alias = "Question")]
    Question,
    #[serde(rename = "documentation", alias = "Documentation")]
    Documentation,
}

impl IssueType {
    pub const ALL: [IssueType; 4] = [
        IssueType::Bug,
        IssueType::Feature,
        IssueType::Question,
        IssueType::Documentation,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bug" => Some(IssueType::Bug),
            "feature" | "features" => Some(IssueType::Feature),
            "question" => Some(IssueType::Question),
            "documentation" | "docs" => Some(IssueType::Documentation),
            _ => None,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            IssueType::Bug => "bug",
            IssueType::Feature => "features",
            IssueType::Question => "question",
            IssueType::Documentation => "documentation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IssueType::Bug => "Bug",
            IssueType::Feature => "Feature",
            IssueType::Question => "Question",
            IssueType::Documentation => "Documentation",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        IssueType::parse(s).ok_or_else(|| {
            format!(
                "invalid issue type '{}' (bug, feature, question, documentation)",
                s
            )
        })
    }
}

/// Issue priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    #[serde(alias = "None", alias = "NONE")]
    None,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[serde(alias = "Critical", alias = "CRITICAL")]
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::None,
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(Priority::None),
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Position in high-to-low order (critical first, none last).
    pub fn urgency_rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
            Priority::None => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::None => "None",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Priority::parse(s).ok_or_else(|| {
            format!(
                "invalid priority '{}' (none, low, medium, high, critical)",
                s
            )
        })
    }
}

/// Account role.
///
/// The backend spells roles `Utente` and `Amministratore`; older payloads
/// and stored sessions may carry `admin`, `user` or the English names.
/// Every spelling is normalized here so the rest of the crate compares enum
/// values only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    #[default]
    User,
    Administrator,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "utente" | "user" => Some(Role::User),
            "amministratore" | "administrator" | "admin" => Some(Role::Administrator),
            _ => None,
        }
    }

    /// Canonical wire spelling.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::User => "Utente",
            Role::Administrator => "Amministratore",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Administrator => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| format!("invalid role '{}' (user, admin)", s))
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_wire().to_string()
    }
}

fn default_active() -> bool {
    true
}

/// A BugBoard account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "idUtente", alias = "id")]
    pub id: UserId,

    #[serde(rename = "nome", default)]
    pub name: String,

    #[serde(rename = "cognome", default)]
    pub surname: String,

    /// Generated from name and surname at creation, never edited afterwards.
    #[serde(default)]
    pub email: String,

    #[serde(rename = "ruolo", default)]
    pub role: Role,

    #[serde(rename = "stato", default = "default_active")]
    pub active: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// A tracked issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "idIssue", alias = "id")]
    pub id: IssueId,

    #[serde(rename = "titolo")]
    pub title: String,

    #[serde(rename = "descrizione", default)]
    pub description: String,

    #[serde(rename = "tipo")]
    pub issue_type: IssueType,

    #[serde(rename = "priorita", default)]
    pub priority: Priority,

    #[serde(rename = "stato", default)]
    pub status: Status,

    #[serde(rename = "dataCreazione", default)]
    pub created_at: Option<NaiveDateTime>,

    #[serde(
        rename = "dataUltimaModifica",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<NaiveDateTime>,

    #[serde(rename = "archiviata", default)]
    pub archived: bool,

    #[serde(rename = "dataArchiviazione", default)]
    pub archived_at: Option<NaiveDateTime>,

    #[serde(
        rename = "dataRisoluzione",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub resolved_at: Option<NaiveDateTime>,

    #[serde(rename = "creatore", default)]
    pub creator: Option<User>,

    #[serde(rename = "archiviatore", default)]
    pub archiver: Option<User>,
}

impl Issue {
    /// Archival is only permitted once work on the issue is done.
    pub fn can_be_archived(&self) -> bool {
        !self.archived && self.status == Status::Done
    }
}

/// File metadata for an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(alias = "idAllegato")]
    pub id: AttachmentId,

    /// The backend omits the owning issue; it is filled in by the caller
    /// that listed attachments for a given issue.
    #[serde(rename = "idIssue", default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<IssueId>,

    #[serde(rename = "nomeFile")]
    pub file_name: String,

    #[serde(rename = "tipoFile", default)]
    pub mime_type: String,

    #[serde(rename = "dimensione", default)]
    pub size: u64,

    #[serde(rename = "dataCaricamento", default)]
    pub uploaded_at: Option<NaiveDateTime>,
}

/// Issue counters returned by the statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStats {
    #[serde(rename = "totali", default)]
    pub total: u64,
    #[serde(rename = "attive", default)]
    pub active: u64,
    #[serde(default)]
    pub todo: u64,
    #[serde(rename = "inProgress", default)]
    pub in_progress: u64,
    #[serde(default)]
    pub done: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentCount {
    #[serde(rename = "idIssue")]
    pub issue_id: IssueId,
    #[serde(rename = "numeroAllegati")]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentSize {
    #[serde(rename = "idIssue")]
    pub issue_id: IssueId,
    #[serde(rename = "dimensioneTotaleBytes")]
    pub total_bytes: u64,
    #[serde(rename = "dimensioneTotaleMB", default)]
    pub total_mb: f64,
}

/// Payload for `POST /issue/crea`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIssue {
    #[serde(rename = "titolo")]
    pub title: String,
    #[serde(rename = "descrizione")]
    pub description: String,
    #[serde(rename = "tipo")]
    pub issue_type: IssueType,
    #[serde(rename = "priorita")]
    pub priority: Priority,
    #[serde(rename = "stato")]
    pub status: Status,
    #[serde(rename = "idCreatore")]
    pub creator_id: UserId,
}

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 5000;

/// User input of the issue creation form, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub issue_type: Option<IssueType>,
    pub priority: Priority,
}

impl Default for IssueDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            issue_type: None,
            priority: Priority::Medium,
        }
    }
}

impl IssueDraft {
    /// Check the form fields without touching the network.
    pub fn validate(&self) -> Result<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::Validation("Title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(Error::Validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_CHARS
            )));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(Error::Validation("Description is required".to_string()));
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(Error::Validation(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }
        if self.issue_type.is_none() {
            return Err(Error::Validation("Issue type is required".to_string()));
        }
        Ok(())
    }

    /// Validate and build the creation payload. New issues always start as todo.
    pub fn into_new_issue(self, creator_id: UserId) -> Result<NewIssue> {
        self.validate()?;
        let issue_type = self
            .issue_type
            .ok_or_else(|| Error::Validation("Issue type is required".to_string()))?;
        Ok(NewIssue {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            issue_type,
            priority: self.priority,
            status: Status::Todo,
            creator_id,
        })
    }
}

/// Payload for `PUT /issue/modifica/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueUpdate {
    #[serde(rename = "titolo", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descrizione", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "tipo", skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    #[serde(rename = "priorita", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "stato", skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.issue_type.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }
}

/// Payload for `POST /utenza/crea`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "cognome")]
    pub surname: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "ruolo")]
    pub role: Role,
}

/// Response of `POST /utenza/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub token: String,
    #[serde(rename = "utente")]
    pub user: User,
}

/// A local file staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Validation(format!("Not a file: {}", path.display())))?;
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self { name, mime, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
