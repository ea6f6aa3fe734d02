//! In-memory backend and fixtures for unit tests.
//!
//! `FakeBackend` implements every service trait against plain vectors and
//! counts calls, so tests can assert that a client-side guard prevented a
//! request.

use std::cell::{Cell, RefCell};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::api::http::INVALID_CREDENTIALS;
use crate::api::{AttachmentApi, AuthApi, IssueApi, UserApi};
use crate::models::query::{DateField, IssueFilter};
use crate::models::{
    Attachment, AttachmentCount, AttachmentId, AttachmentSize, Issue, IssueId, IssueStats,
    IssueType, IssueUpdate, LoginResponse, NewIssue, NewUser, Priority, Role, Status,
    UploadFile, User, UserId,
};
use crate::session::Session;
use crate::{Error, Result};

pub const PASSWORD: &str = "secret";

pub fn admin() -> User {
    User {
        id: 1,
        name: "Anna".into(),
        surname: "Rossi".into(),
        email: "anna.rossi@bugboard.it".into(),
        role: Role::Administrator,
        active: true,
    }
}

pub fn regular_user() -> User {
    User {
        id: 2,
        name: "Luca".into(),
        surname: "Bianchi".into(),
        email: "luca.bianchi@bugboard.it".into(),
        role: Role::User,
        active: true,
    }
}

pub fn inactive_user() -> User {
    User {
        id: 3,
        name: "Marta".into(),
        surname: "Verdi".into(),
        email: "marta.verdi@bugboard.it".into(),
        role: Role::User,
        active: false,
    }
}

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap()
}

/// A bare active todo bug, created `id` hours after the fixture epoch.
pub fn issue(id: IssueId, title: &str) -> Issue {
    Issue {
        id,
        title: title.to_string(),
        description: String::new(),
        issue_type: IssueType::Bug,
        priority: Priority::Medium,
        status: Status::Todo,
        created_at: Some(epoch() + TimeDelta::hours(id as i64)),
        updated_at: None,
        archived: false,
        archived_at: None,
        resolved_at: None,
        creator: Some(admin()),
        archiver: None,
    }
}

#[derive(Default)]
pub struct FakeBackend {
    issues: RefCell<Vec<Issue>>,
    users: RefCell<Vec<User>>,
    attachments: RefCell<Vec<(Attachment, Vec<u8>)>>,
    next_id: Cell<u64>,
    clock: Cell<i64>,
    calls: Cell<usize>,
    failure: RefCell<Option<String>>,
    failing_uploads: RefCell<Vec<String>>,
    filter_requests: RefCell<Vec<IssueFilter>>,
    list_requests: RefCell<Vec<Option<bool>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.next_id.set(100);
        *backend.users.borrow_mut() = vec![admin(), regular_user(), inactive_user()];
        backend
    }

    /// Number of trait calls so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Make every following call fail with a 500 carrying `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.borrow_mut() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.failure.borrow_mut() = None;
    }

    /// Uploads of a file with this name fail server-side.
    pub fn fail_upload_of(&self, name: &str) {
        self.failing_uploads.borrow_mut().push(name.to_string());
    }

    pub fn filter_requests(&self) -> Vec<IssueFilter> {
        self.filter_requests.borrow().clone()
    }

    pub fn list_requests(&self) -> Vec<Option<bool>> {
        self.list_requests.borrow().clone()
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.issues.borrow().clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.users.borrow().clone()
    }

    pub fn stored_attachments(&self) -> Vec<Attachment> {
        self.attachments
            .borrow()
            .iter()
            .map(|(a, _)| a.clone())
            .collect()
    }

    pub fn seed_issue(&self, title: &str, status: Status) -> Issue {
        let id = self.next_id();
        let mut issue = issue(id, title);
        issue.status = status;
        issue.created_at = Some(self.tick());
        self.issues.borrow_mut().push(issue.clone());
        issue
    }

    pub fn seed_archived(&self, title: &str) -> Issue {
        let id = self.next_id();
        let mut issue = issue(id, title);
        issue.status = Status::Done;
        issue.created_at = Some(self.tick());
        issue.archived = true;
        issue.archived_at = Some(self.tick());
        issue.archiver = Some(admin());
        self.issues.borrow_mut().push(issue.clone());
        issue
    }

    pub fn seed_attachment(&self, issue: IssueId, name: &str, bytes: &[u8]) -> Attachment {
        let attachment = Attachment {
            id: self.next_id(),
            issue_id: Some(issue),
            file_name: name.to_string(),
            mime_type: "image/png".into(),
            size: bytes.len() as u64,
            uploaded_at: Some(self.tick()),
        };
        self.attachments
            .borrow_mut()
            .push((attachment.clone(), bytes.to_vec()));
        attachment
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn tick(&self) -> NaiveDateTime {
        let t = self.clock.get() + 1;
        self.clock.set(t);
        epoch() + TimeDelta::minutes(t)
    }

    fn enter(&self) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        match self.failure.borrow().as_ref() {
            Some(message) => Err(Error::Server {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn with_issue<T>(&self, id: IssueId, f: impl FnOnce(&mut Issue) -> T) -> Result<T> {
        let mut issues = self.issues.borrow_mut();
        let issue = issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::NotFound(format!("Issue non trovata con id: {}", id)))?;
        Ok(f(issue))
    }

    fn with_user<T>(&self, id: UserId, f: impl FnOnce(&mut User) -> T) -> Result<T> {
        let mut users = self.users.borrow_mut();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::NotFound("Utente non trovato".to_string()))?;
        Ok(f(user))
    }
}

impl AuthApi for FakeBackend {
    fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        self.enter()?;
        let user = self
            .users
            .borrow()
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| Error::Auth(INVALID_CREDENTIALS.to_string()))?;
        if !user.active {
            return Err(Error::Auth("Account disattivato".to_string()));
        }
        if password != PASSWORD {
            return Err(Error::Auth(INVALID_CREDENTIALS.to_string()));
        }
        Ok(LoginResponse {
            message: Some("Login effettuato con successo".into()),
            token: format!("token-{}", email),
            user,
        })
    }

    fn recover_password(&self, _email: &str) -> Result<String> {
        self.enter()?;
        Ok("Email di recupero inviata".into())
    }

    fn change_password(&self, session: &Session, _new_password: &str) -> Result<String> {
        self.enter()?;
        session.require_user()?;
        Ok("Password aggiornata con successo".into())
    }
}

impl IssueApi for FakeBackend {
    fn list_issues(&self, _session: &Session, archived: Option<bool>) -> Result<Vec<Issue>> {
        self.enter()?;
        self.list_requests.borrow_mut().push(archived);
        Ok(self
            .issues
            .borrow()
            .iter()
            .filter(|i| archived.is_none_or(|a| i.archived == a))
            .cloned()
            .collect())
    }

    fn get_issue(&self, _session: &Session, id: IssueId) -> Result<Issue> {
        self.enter()?;
        self.with_issue(id, |i| i.clone())
    }

    fn filter_issues_advanced(
        &self,
        _session: &Session,
        filter: &IssueFilter,
    ) -> Result<Vec<Issue>> {
        self.enter()?;
        self.filter_requests.borrow_mut().push(filter.clone());
        let scoped: Vec<Issue> = self
            .issues
            .borrow()
            .iter()
            .filter(|i| i.archived == filter.archived)
            .cloned()
            .collect();
        Ok(filter.apply(&scoped, DateField::Created))
    }

    fn filter_issues(
        &self,
        _session: &Session,
        status: Option<Status>,
        priority: Option<Priority>,
        issue_type: Option<IssueType>,
    ) -> Result<Vec<Issue>> {
        self.enter()?;
        let filter = IssueFilter {
            status,
            priority,
            issue_type,
            ..Default::default()
        };
        Ok(self
            .issues
            .borrow()
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    fn search_issues(&self, _session: &Session, title: &str) -> Result<Vec<Issue>> {
        self.enter()?;
        let needle = title.to_lowercase();
        Ok(self
            .issues
            .borrow()
            .iter()
            .filter(|i| i.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    fn create_issue(&self, _session: &Session, new: &NewIssue) -> Result<Issue> {
        self.enter()?;
        let creator = self
            .users
            .borrow()
            .iter()
            .find(|u| u.id == new.creator_id)
            .cloned();
        let issue = Issue {
            id: self.next_id(),
            title: new.title.clone(),
            description: new.description.clone(),
            issue_type: new.issue_type,
            priority: new.priority,
            status: new.status,
            created_at: Some(self.tick()),
            updated_at: None,
            archived: false,
            archived_at: None,
            resolved_at: None,
            creator,
            archiver: None,
        };
        self.issues.borrow_mut().push(issue.clone());
        Ok(issue)
    }

    fn update_issue(
        &self,
        _session: &Session,
        id: IssueId,
        update: &IssueUpdate,
    ) -> Result<Issue> {
        self.enter()?;
        let now = self.tick();
        self.with_issue(id, |issue| {
            if let Some(ref title) = update.title {
                issue.title = title.clone();
            }
            if let Some(ref description) = update.description {
                issue.description = description.clone();
            }
            if let Some(issue_type) = update.issue_type {
                issue.issue_type = issue_type;
            }
            if let Some(priority) = update.priority {
                issue.priority = priority;
            }
            if let Some(status) = update.status {
                issue.status = status;
            }
            issue.updated_at = Some(now);
            issue.clone()
        })
    }

    fn delete_issue(&self, _session: &Session, id: IssueId) -> Result<String> {
        self.enter()?;
        let mut issues = self.issues.borrow_mut();
        let before = issues.len();
        issues.retain(|i| i.id != id);
        if issues.len() == before {
            return Err(Error::NotFound(format!("Issue non trovata con id: {}", id)));
        }
        Ok("Issue eliminata con successo".into())
    }

    fn archive_issue(&self, _session: &Session, id: IssueId, archiver: UserId) -> Result<String> {
        self.enter()?;
        let archiver = self.users.borrow().iter().find(|u| u.id == archiver).cloned();
        let now = self.tick();
        self.with_issue(id, |issue| {
            if issue.archived {
                return Err(Error::Rejected {
                    status: 400,
                    message: "L'issue è già archiviata".into(),
                });
            }
            issue.archived = true;
            issue.archived_at = Some(now);
            issue.archiver = archiver;
            Ok("Issue archiviata con successo".to_string())
        })?
    }

    fn unarchive_issue(&self, _session: &Session, id: IssueId) -> Result<String> {
        self.enter()?;
        self.with_issue(id, |issue| {
            if !issue.archived {
                return Err(Error::Rejected {
                    status: 400,
                    message: "L'issue non è archiviata".into(),
                });
            }
            issue.archived = false;
            issue.archived_at = None;
            issue.archiver = None;
            Ok("Issue disarchiviata con successo".to_string())
        })?
    }

    fn issue_stats(&self, _session: &Session) -> Result<IssueStats> {
        self.enter()?;
        let issues = self.issues.borrow();
        let count = |s: Status| issues.iter().filter(|i| i.status == s).count() as u64;
        Ok(IssueStats {
            total: issues.len() as u64,
            active: issues.iter().filter(|i| !i.archived).count() as u64,
            todo: count(Status::Todo),
            in_progress: count(Status::InProgress),
            done: count(Status::Done),
        })
    }
}

impl AttachmentApi for FakeBackend {
    fn list_attachments(&self, _session: &Session, issue: IssueId) -> Result<Vec<Attachment>> {
        self.enter()?;
        Ok(self
            .attachments
            .borrow()
            .iter()
            .filter(|(a, _)| a.issue_id == Some(issue))
            .map(|(a, _)| a.clone())
            .collect())
    }

    fn upload_attachment(
        &self,
        _session: &Session,
        issue: IssueId,
        file: &UploadFile,
    ) -> Result<Attachment> {
        self.enter()?;
        if self.failing_uploads.borrow().contains(&file.name) {
            return Err(Error::Server {
                status: 500,
                message: "Errore durante l'operazione sul file".into(),
            });
        }
        let attachment = Attachment {
            id: self.next_id(),
            issue_id: Some(issue),
            file_name: file.name.clone(),
            mime_type: file.mime.clone(),
            size: file.size(),
            uploaded_at: Some(self.tick()),
        };
        self.attachments
            .borrow_mut()
            .push((attachment.clone(), file.bytes.clone()));
        Ok(attachment)
    }

    fn download_attachment(&self, _session: &Session, id: AttachmentId) -> Result<Vec<u8>> {
        self.enter()?;
        self.attachments
            .borrow()
            .iter()
            .find(|(a, _)| a.id == id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| Error::NotFound("Allegato non trovato".into()))
    }

    fn delete_attachment(&self, _session: &Session, id: AttachmentId) -> Result<String> {
        self.enter()?;
        let mut attachments = self.attachments.borrow_mut();
        let before = attachments.len();
        attachments.retain(|(a, _)| a.id != id);
        if attachments.len() == before {
            return Err(Error::NotFound("Allegato non trovato".into()));
        }
        Ok("Allegato eliminato con successo".into())
    }

    fn attachment_count(&self, session: &Session, issue: IssueId) -> Result<AttachmentCount> {
        let count = self.list_attachments(session, issue)?.len() as u64;
        Ok(AttachmentCount {
            issue_id: issue,
            count,
        })
    }

    fn attachment_size(&self, session: &Session, issue: IssueId) -> Result<AttachmentSize> {
        let total_bytes: u64 = self
            .list_attachments(session, issue)?
            .iter()
            .map(|a| a.size)
            .sum();
        Ok(AttachmentSize {
            issue_id: issue,
            total_bytes,
            total_mb: total_bytes as f64 / (1024.0 * 1024.0),
        })
    }
}

impl UserApi for FakeBackend {
    fn list_users(&self, _session: &Session) -> Result<Vec<User>> {
        self.enter()?;
        Ok(self.users())
    }

    fn create_user(&self, _session: &Session, new: &NewUser) -> Result<User> {
        self.enter()?;
        if self.users.borrow().iter().any(|u| u.email == new.email) {
            return Err(Error::Rejected {
                status: 409,
                message: "Email già registrata".into(),
            });
        }
        let user = User {
            id: self.next_id(),
            name: new.name.clone(),
            surname: new.surname.clone(),
            email: new.email.clone(),
            role: new.role,
            active: true,
        };
        self.users.borrow_mut().push(user.clone());
        Ok(user)
    }

    fn change_role(&self, _session: &Session, id: UserId, role: Role) -> Result<User> {
        self.enter()?;
        self.with_user(id, |u| {
            u.role = role;
            u.clone()
        })
    }

    fn set_active(&self, _session: &Session, id: UserId, active: bool) -> Result<User> {
        self.enter()?;
        self.with_user(id, |u| {
            u.active = active;
            u.clone()
        })
    }
}
