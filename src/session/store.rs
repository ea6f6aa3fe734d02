//! Persistent session storage backed by state.kdl.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::Session;
use crate::Result;
use crate::config::{self, BugboardState};

/// Reads and writes the client-side session state in a data directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the default data directory (`BUGBOARD_DATA_DIR` aware).
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(config::data_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hydrate the session. Missing or malformed values load as absent.
    pub fn load(&self) -> Result<Session> {
        let state = config::read_state(&self.dir)?;
        debug!(
            has_token = state.auth_token.is_some(),
            has_user = state.user.is_some(),
            "loaded session state"
        );
        Ok(Session::from_parts(state.auth_token, state.user))
    }

    /// Persist token and user, keeping other stored preferences.
    pub fn save(&self, session: &Session) -> Result<()> {
        let mut state = config::read_state(&self.dir)?;
        state.auth_token = session.token().map(str::to_string);
        state.user = session.user().cloned();
        config::write_state(&self.dir, &state)
    }

    /// Remove token and user unconditionally.
    pub fn clear(&self) -> Result<()> {
        self.save(&Session::anonymous())
    }

    /// Stored sidebar preference, open by default.
    pub fn sidebar_open(&self) -> Result<bool> {
        Ok(config::read_state(&self.dir)?.sidebar_open.unwrap_or(true))
    }

    pub fn set_sidebar_open(&self, open: bool) -> Result<()> {
        let mut state = config::read_state(&self.dir)?;
        state.sidebar_open = Some(open);
        config::write_state(&self.dir, &state)
    }

    /// Raw stored state, for `bb config show`.
    pub fn state(&self) -> Result<BugboardState> {
        config::read_state(&self.dir)
    }
}
