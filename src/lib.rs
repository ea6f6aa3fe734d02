//! BugBoard - client library and terminal frontend for the BugBoard issue tracker.
//!
//! This library provides the core functionality for the `bb` CLI tool:
//! session handling, the typed REST client, and the view-state models
//! (issue lists, issue lifecycle, attachments, user administration) that
//! the CLI drives.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod session;
pub mod views;

/// Version string shown by `bb --version`.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BB_GIT_COMMIT"),
    ", built ",
    env!("BB_BUILD_TIMESTAMP"),
    ")"
);

/// Test utilities shared by unit tests across modules.
#[cfg(test)]
pub(crate) mod test_utils;

/// Broad classification of an [`Error`], used when a caller needs to branch
/// on the kind of failure rather than on its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    Rejected,
    Server,
    Network,
    Unknown,
    Local,
}

/// Library-level error type for BugBoard operations.
///
/// The `Display` output of every variant is the message shown to the user:
/// the server-supplied message when one was returned, otherwise a default
/// for the classification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A client-side precondition failed; no network call was made.
    #[error("{0}")]
    Validation(String),

    /// HTTP 401/403, or a missing or insufficient session.
    #[error("{0}")]
    Auth(String),

    /// HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// HTTP 400/409/422: the backend refused the request on its own validation.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// HTTP 5xx.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The request was sent but no response was received.
    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Unknown(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Auth(_) => ErrorKind::Auth,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Rejected { .. } => ErrorKind::Rejected,
            Error::Server { .. } => ErrorKind::Server,
            Error::Network(_) => ErrorKind::Network,
            Error::Unknown(_) => ErrorKind::Unknown,
            Error::Io(_) | Error::Json(_) | Error::Config(_) => ErrorKind::Local,
        }
    }

    /// The message to display inline for this error.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// True when the failure was detected locally, before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Result type alias for BugBoard operations.
pub type Result<T> = std::result::Result<T, Error>;
