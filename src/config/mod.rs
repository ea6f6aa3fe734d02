//! Configuration and state management for BugBoard.
//!
//! This module defines KDL schemas for two distinct files:
//!
//! ## config.kdl - User preferences
//!
//! Located at `~/.config/bugboard/config.kdl` (override the directory with
//! `BUGBOARD_CONFIG_DIR`).
//!
//! Contains:
//! - `api-url` - Base URL of the REST backend
//! - `output-format` - "json" or "human"
//!
//! ## state.kdl - Client session state (contains the bearer token)
//!
//! Located at `~/.local/share/bugboard/state.kdl` (override the directory
//! with `BUGBOARD_DATA_DIR`).
//!
//! Contains:
//! - `auth-token` - Bearer token from the last login
//! - `user` - Serialized user record from the last login
//! - `sidebar-open` - Sidebar preference
//!
//! ## Security
//!
//! `state.kdl` is created with 0600 permissions because it holds the token.
//! Concurrent `bb` processes do not lock it: the last writer wins.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

use kdl::KdlDocument;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub use resolver::{
    API_URL_ENV, ConfigOverrides, Resolved, ResolvedConfig, ValueSource, resolve_config,
};
pub use schema::{BugboardConfig, BugboardState, OutputFormat};
#[cfg(unix)]
pub use schema::{CONFIG_FILE_MODE, STATE_FILE_MODE};

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

pub const CONFIG_DIR_ENV: &str = "BUGBOARD_CONFIG_DIR";
pub const DATA_DIR_ENV: &str = "BUGBOARD_DATA_DIR";

const CONFIG_FILE: &str = "config.kdl";
const STATE_FILE: &str = "state.kdl";

/// Directory holding config.kdl.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|d| d.join("bugboard"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Directory holding state.kdl.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|d| d.join("bugboard"))
        .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

pub fn state_path(dir: &Path) -> PathBuf {
    dir.join(STATE_FILE)
}

fn read_kdl(path: &Path) -> Result<Option<KdlDocument>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<KdlDocument>()
        .map(Some)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

fn write_kdl(path: &Path, doc: &KdlDocument, #[allow(unused)] mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(path)?;
        // Pre-existing files keep their old mode unless reset.
        file.set_permissions(std::fs::Permissions::from_mode(mode))?;
        file.write_all(doc.to_string().as_bytes())?;
    }

    #[cfg(not(unix))]
    std::fs::write(path, doc.to_string())?;

    Ok(())
}

/// Read config.kdl, returning defaults when the file does not exist.
pub fn read_config(dir: &Path) -> Result<BugboardConfig> {
    Ok(read_kdl(&config_path(dir))?
        .map(|doc| BugboardConfig::from_kdl(&doc))
        .unwrap_or_default())
}

pub fn write_config(dir: &Path, config: &BugboardConfig) -> Result<()> {
    config.validate().map_err(Error::Config)?;
    write_kdl(&config_path(dir), &config.to_kdl(), 0o644)
}

/// Read state.kdl. An unparseable file is treated as empty, like missing
/// local storage.
pub fn read_state(dir: &Path) -> Result<BugboardState> {
    match read_kdl(&state_path(dir)) {
        Ok(doc) => Ok(doc
            .map(|doc| BugboardState::from_kdl(&doc))
            .unwrap_or_default()),
        Err(Error::Config(msg)) => {
            tracing::warn!("{}; treating session state as empty", msg);
            Ok(BugboardState::default())
        }
        Err(e) => Err(e),
    }
}

pub fn write_state(dir: &Path, state: &BugboardState) -> Result<()> {
    write_kdl(&state_path(dir), &state.to_kdl(), 0o600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_config_missing_is_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_config(dir.path()).unwrap(), BugboardConfig::default());
    }

    #[test]
    fn test_read_config_invalid_kdl_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(config_path(dir.path()), "api-url {{{").unwrap();
        assert!(matches!(read_config(dir.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_read_state_invalid_kdl_is_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(state_path(dir.path()), "auth-token {{{").unwrap();
        assert_eq!(read_state(dir.path()).unwrap(), BugboardState::default());
    }

    #[test]
    fn test_write_config_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let config = BugboardConfig {
            api_url: Some("localhost".into()),
            output_format: None,
        };
        assert!(write_config(dir.path(), &config).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_state_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let state = BugboardState {
            auth_token: Some("secret".into()),
            ..Default::default()
        };
        write_state(dir.path(), &state).unwrap();
        let mode = std::fs::metadata(state_path(dir.path()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, STATE_FILE_MODE);
        assert_eq!(read_state(dir.path()).unwrap(), state);
    }
}
