//! Session context and role capabilities.
//!
//! A [`Session`] is an explicit value passed to every service call. It is
//! loaded from and saved to state.kdl through [`SessionStore`]; nothing in
//! the crate reads the stored token behind the caller's back.

mod store;

pub use store::SessionStore;

use tracing::{debug, info};

use crate::api::AuthApi;
use crate::models::{Role, User};
use crate::{Error, Result};

/// Actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ArchiveIssue,
    UnarchiveIssue,
    DeleteIssue,
    CreateUser,
    ManageUsers,
}

impl Capability {
    fn describe(&self) -> &'static str {
        match self {
            Capability::ArchiveIssue => "archive issues",
            Capability::UnarchiveIssue => "restore archived issues",
            Capability::DeleteIssue => "delete issues",
            Capability::CreateUser => "create users",
            Capability::ManageUsers => "manage users",
        }
    }
}

/// The single role check used by every view and command.
pub fn allows(role: Role, capability: Capability) -> bool {
    match capability {
        Capability::ArchiveIssue
        | Capability::UnarchiveIssue
        | Capability::DeleteIssue
        | Capability::CreateUser
        | Capability::ManageUsers => role == Role::Administrator,
    }
}

/// Authenticated (or anonymous) client session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user: Option<User>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: Some(token.into()),
            user: Some(user),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(token: Option<String>, user: Option<User>) -> Self {
        Self { token, user }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// True when a token is held. Expiry is only discovered when a request
    /// fails with an auth error.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Administrator)
    }

    pub fn is_user(&self) -> bool {
        self.role() == Some(Role::User)
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role().is_some_and(|role| allows(role, capability))
    }

    /// Fail with an auth error unless the current user holds `capability`.
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(Error::Auth(format!(
                "Only administrators can {}",
                capability.describe()
            )))
        }
    }

    /// The logged-in user, or an auth error when there is none.
    pub fn require_user(&self) -> Result<&User> {
        match (&self.token, &self.user) {
            (Some(_), Some(user)) => Ok(user),
            _ => Err(Error::Auth("Not logged in. Run `bb login` first.".to_string())),
        }
    }
}

/// Authenticate and persist the resulting session.
pub fn login(
    api: &dyn AuthApi,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<Session> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(Error::Validation(
            "Email and password are required".to_string(),
        ));
    }
    debug!(email = email.trim(), "logging in");
    let response = api.login(email.trim(), password)?;
    let session = Session::new(response.token, response.user);
    store.save(&session)?;
    if let Some(user) = session.user() {
        info!(user_id = user.id, role = %user.role, "logged in");
    }
    Ok(session)
}

/// Clear the persisted session. Never contacts the server.
pub fn logout(store: &SessionStore) -> Result<()> {
    store.clear()
}
