//! HTTP implementation of the service traits.
//!
//! Built on `reqwest::blocking`: the CLI issues one request at a time and
//! has no async runtime. Every authenticated request carries
//! `Authorization: Bearer <token>` from the session passed in.
//!
//! Status mapping:
//! - no response: [`Error::Network`]
//! - 401/403: [`Error::Auth`]
//! - 404: [`Error::NotFound`]
//! - 400/409/422: [`Error::Rejected`]
//! - 5xx: [`Error::Server`]
//! - anything else unsuccessful: [`Error::Unknown`]
//!
//! The server's `message` field (or `error`) is preferred over the default
//! text for each classification.

use reqwest::blocking::{Client, RequestBuilder, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::{AttachmentApi, AuthApi, IssueApi, UserApi};
use crate::models::{
    Attachment, AttachmentCount, AttachmentId, AttachmentSize, Issue, IssueId, IssueStats,
    IssueType, IssueUpdate, LoginResponse, NewIssue, NewUser, Priority, Role, Status,
    UploadFile, User, UserId, query::IssueFilter,
};
use crate::session::Session;
use crate::{Error, Result};

const USER_AGENT: &str = concat!("bugboard-cli/", env!("CARGO_PKG_VERSION"));

pub const CONNECTION_ERROR: &str = "Connection error: the server could not be reached";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
const SESSION_EXPIRED: &str = "Not authorized. Your session may have expired, log in again.";
const NOT_FOUND: &str = "The requested resource was not found";
const REJECTED: &str = "The request was rejected by the server";
const SERVER_ERROR: &str = "Server error. Please try again later.";

/// Error body returned by the backend.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

/// `{message, utenza}` envelope of the user administration endpoints.
#[derive(Debug, Deserialize)]
struct UserEnvelope {
    #[serde(rename = "utenza", alias = "utente")]
    user: User,
}

/// Classify an unsuccessful response.
///
/// `auth_default` is the message used for 401/403 when the body carries
/// none, since a failed login and an expired session read differently.
pub fn error_for_status(status: u16, body: &str, auth_default: &str) -> Error {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let server_message = parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty());
    let message = |default: &str| server_message.clone().unwrap_or_else(|| default.to_string());

    match status {
        401 | 403 => Error::Auth(message(auth_default)),
        404 => Error::NotFound(message(NOT_FOUND)),
        400 | 409 | 422 => Error::Rejected {
            status,
            message: message(REJECTED),
        },
        500..=599 => Error::Server {
            status,
            message: message(SERVER_ERROR),
        },
        _ => Error::Unknown(message(&format!("Unexpected response (HTTP {})", status))),
    }
}

/// Blocking REST client for the BugBoard backend.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and return the raw body of a successful response.
    fn execute(&self, request: RequestBuilder, auth_default: &str) -> Result<Vec<u8>> {
        let response = request.send().map_err(|e| {
            debug!(error = %e, "request failed without response");
            Error::Network(CONNECTION_ERROR.to_string())
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "response received");
        let body = response
            .bytes()
            .map_err(|_| Error::Network(CONNECTION_ERROR.to_string()))?;

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(error_for_status(
                status.as_u16(),
                &String::from_utf8_lossy(&body),
                auth_default,
            ))
        }
    }

    fn request_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.execute(request, SESSION_EXPIRED)?;
        decode(&body)
    }

    /// For endpoints answering `{"message": ...}`.
    fn request_message(&self, request: RequestBuilder, fallback: &str) -> Result<String> {
        let body = self.execute(request, SESSION_EXPIRED)?;
        let message = serde_json::from_slice::<MessageBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| fallback.to_string());
        Ok(message)
    }

    fn get(&self, session: &Session, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(method = "GET", %url, "sending request");
        self.authorized(self.client.get(url), session)
    }

    fn post(&self, session: &Session, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(method = "POST", %url, "sending request");
        self.authorized(self.client.post(url), session)
    }

    fn put(&self, session: &Session, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(method = "PUT", %url, "sending request");
        self.authorized(self.client.put(url), session)
    }

    fn patch(&self, session: &Session, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(method = "PATCH", %url, "sending request");
        self.authorized(self.client.patch(url), session)
    }

    fn delete(&self, session: &Session, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(method = "DELETE", %url, "sending request");
        self.authorized(self.client.delete(url), session)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| Error::Unknown(format!("Unexpected response from server: {}", e)))
}

impl AuthApi for HttpClient {
    fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = self
            .post(&Session::anonymous(), "utenza/login")
            .json(&json!({ "email": email, "password": password }));
        let body = self.execute(request, INVALID_CREDENTIALS)?;
        decode(&body)
    }

    fn recover_password(&self, email: &str) -> Result<String> {
        let request = self
            .post(&Session::anonymous(), "utenza/recupera-password")
            .json(&json!({ "email": email }));
        self.request_message(request, "Password recovery requested")
    }

    fn change_password(&self, session: &Session, new_password: &str) -> Result<String> {
        let request = self
            .put(session, "utenza/modifica")
            .json(&json!({ "password": new_password }));
        self.request_message(request, "Password updated")
    }
}

impl IssueApi for HttpClient {
    fn list_issues(&self, session: &Session, archived: Option<bool>) -> Result<Vec<Issue>> {
        let mut request = self.get(session, "issue/visualizza-lista");
        if let Some(archived) = archived {
            request = request.query(&[("archiviata", archived.to_string())]);
        }
        self.request_json(request)
    }

    fn get_issue(&self, session: &Session, id: IssueId) -> Result<Issue> {
        self.request_json(self.get(session, &format!("issue/visualizza/{}", id)))
    }

    fn filter_issues_advanced(
        &self,
        session: &Session,
        filter: &IssueFilter,
    ) -> Result<Vec<Issue>> {
        let request = self
            .get(session, "issue/filtra-avanzato")
            .query(&filter.query_params());
        self.request_json(request)
    }

    fn filter_issues(
        &self,
        session: &Session,
        status: Option<Status>,
        priority: Option<Priority>,
        issue_type: Option<IssueType>,
    ) -> Result<Vec<Issue>> {
        let mut params = Vec::new();
        if let Some(status) = status {
            params.push(("stato", status.as_param()));
        }
        if let Some(priority) = priority {
            params.push(("priorita", priority.as_param()));
        }
        if let Some(issue_type) = issue_type {
            params.push(("tipo", issue_type.as_param()));
        }
        self.request_json(self.get(session, "issue/filtra").query(&params))
    }

    fn search_issues(&self, session: &Session, title: &str) -> Result<Vec<Issue>> {
        let request = self.get(session, "issue/cerca").query(&[("titolo", title)]);
        self.request_json(request)
    }

    fn create_issue(&self, session: &Session, issue: &NewIssue) -> Result<Issue> {
        self.request_json(self.post(session, "issue/crea").json(issue))
    }

    fn update_issue(
        &self,
        session: &Session,
        id: IssueId,
        update: &IssueUpdate,
    ) -> Result<Issue> {
        let request = self
            .put(session, &format!("issue/modifica/{}", id))
            .json(update);
        self.request_json(request)
    }

    fn delete_issue(&self, session: &Session, id: IssueId) -> Result<String> {
        let request = self.delete(session, &format!("issue/elimina/{}", id));
        self.request_message(request, "Issue deleted")
    }

    fn archive_issue(&self, session: &Session, id: IssueId, archiver: UserId) -> Result<String> {
        let request = self
            .delete(session, &format!("issue/archivia/{}", id))
            .query(&[("idArchiviatore", archiver)]);
        self.request_message(request, "Issue archived")
    }

    fn unarchive_issue(&self, session: &Session, id: IssueId) -> Result<String> {
        let request = self.put(session, &format!("issue/disarchivia/{}", id));
        self.request_message(request, "Issue unarchived")
    }

    fn issue_stats(&self, session: &Session) -> Result<IssueStats> {
        self.request_json(self.get(session, "issue/statistiche"))
    }
}

impl AttachmentApi for HttpClient {
    fn list_attachments(&self, session: &Session, issue: IssueId) -> Result<Vec<Attachment>> {
        let mut attachments: Vec<Attachment> =
            self.request_json(self.get(session, &format!("allegato/issue/{}", issue)))?;
        for attachment in &mut attachments {
            attachment.issue_id.get_or_insert(issue);
        }
        Ok(attachments)
    }

    fn upload_attachment(
        &self,
        session: &Session,
        issue: IssueId,
        file: &UploadFile,
    ) -> Result<Attachment> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| Error::Validation(format!("Invalid file type '{}': {}", file.mime, e)))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("idIssue", issue.to_string());
        let mut attachment: Attachment =
            self.request_json(self.post(session, "allegato/upload").multipart(form))?;
        attachment.issue_id.get_or_insert(issue);
        Ok(attachment)
    }

    fn download_attachment(&self, session: &Session, id: AttachmentId) -> Result<Vec<u8>> {
        self.execute(
            self.get(session, &format!("allegato/download/{}", id)),
            SESSION_EXPIRED,
        )
    }

    fn delete_attachment(&self, session: &Session, id: AttachmentId) -> Result<String> {
        let request = self.delete(session, &format!("allegato/{}", id));
        self.request_message(request, "Attachment deleted")
    }

    fn attachment_count(&self, session: &Session, issue: IssueId) -> Result<AttachmentCount> {
        self.request_json(self.get(session, &format!("allegato/issue/{}/count", issue)))
    }

    fn attachment_size(&self, session: &Session, issue: IssueId) -> Result<AttachmentSize> {
        let path = format!("allegato/issue/{}/dimensione-totale", issue);
        self.request_json(self.get(session, &path))
    }
}

impl UserApi for HttpClient {
    fn list_users(&self, session: &Session) -> Result<Vec<User>> {
        self.request_json(self.get(session, "utenza/lista"))
    }

    fn create_user(&self, session: &Session, user: &NewUser) -> Result<User> {
        let envelope: UserEnvelope =
            self.request_json(self.post(session, "utenza/crea").json(user))?;
        Ok(envelope.user)
    }

    fn change_role(&self, session: &Session, id: UserId, role: Role) -> Result<User> {
        let request = self
            .put(session, &format!("utenza/{}", id))
            .json(&json!({ "ruolo": role.as_wire() }));
        let envelope: UserEnvelope = self.request_json(request)?;
        Ok(envelope.user)
    }

    fn set_active(&self, session: &Session, id: UserId, active: bool) -> Result<User> {
        let request = self
            .patch(session, &format!("utenza/{}/stato", id))
            .json(&json!({ "stato": active }));
        let envelope: UserEnvelope = self.request_json(request)?;
        Ok(envelope.user)
    }
}
