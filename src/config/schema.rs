//! KDL schema definitions for config.kdl and state.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation functions

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

use crate::models::User;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read the first string argument of a top-level node.
fn first_string<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a str> {
    doc.get(name)?.entries().first()?.value().as_string()
}

fn string_node(name: &str, value: &str) -> KdlNode {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    node
}

/// User preferences stored in config.kdl.
///
/// File permissions: 0644 (rw-r--r--)
///
/// # KDL Schema
///
/// ```kdl
/// api-url "https://bugboard.example.com/api"
/// output-format "human"  // or "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugboardConfig {
    /// Base URL of the REST backend, including the `/api` prefix
    pub api_url: Option<String>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,
}

impl BugboardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref url) = self.api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("api-url must start with http:// or https://, got {}", url));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            api_url: first_string(doc, "api-url").map(str::to_string),
            output_format: first_string(doc, "output-format").and_then(OutputFormat::parse),
        }
    }

    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref url) = self.api_url {
            doc.nodes_mut().push(string_node("api-url", url));
        }

        if let Some(ref format) = self.output_format {
            doc.nodes_mut().push(string_node("output-format", format.as_str()));
        }

        doc
    }

    /// Set a key from its KDL name, as used by `bb config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "api-url" => {
                self.api_url = Some(value.trim_end_matches('/').to_string());
            }
            "output-format" => {
                let format = OutputFormat::parse(value)
                    .ok_or_else(|| format!("output-format must be json or human, got {}", value))?;
                self.output_format = Some(format);
            }
            other => {
                return Err(format!(
                    "Unknown config key '{}' (api-url, output-format)",
                    other
                ));
            }
        }
        self.validate()
    }
}

/// Client-side session state stored in state.kdl.
///
/// This plays the role of browser local storage: the bearer token, the
/// serialized user record, and the sidebar preference.
///
/// File permissions: 0600 (rw-------) since it holds the token.
///
/// # KDL Schema
///
/// ```kdl
/// auth-token "eyJhbGciOi..."
/// user "{\"idUtente\":1,\"nome\":\"Anna\",...}"
/// sidebar-open #false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugboardState {
    pub auth_token: Option<String>,

    /// Cached user record. A malformed stored value loads as `None`.
    pub user: Option<User>,

    pub sidebar_open: Option<bool>,
}

impl BugboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_secrets(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Mask the token for display purposes.
    pub fn masked_token(&self) -> Option<String> {
        self.auth_token.as_ref().map(|token| mask_token(token))
    }

    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut state = Self::new();

        if let Some(token) = first_string(doc, "auth-token") {
            if !token.is_empty() {
                state.auth_token = Some(token.to_string());
            }
        }

        if let Some(raw) = first_string(doc, "user") {
            match serde_json::from_str::<User>(raw) {
                Ok(user) => state.user = Some(user),
                Err(e) => tracing::debug!(error = %e, "ignoring malformed stored user"),
            }
        }

        if let Some(node) = doc.get("sidebar-open") {
            if let Some(entry) = node.entries().first() {
                state.sidebar_open = entry.value().as_bool();
            }
        }

        state
    }

    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref token) = self.auth_token {
            doc.nodes_mut().push(string_node("auth-token", token));
        }

        if let Some(ref user) = self.user {
            if let Ok(json) = serde_json::to_string(user) {
                doc.nodes_mut().push(string_node("user", &json));
            }
        }

        if let Some(open) = self.sidebar_open {
            let mut node = KdlNode::new("sidebar-open");
            node.push(KdlEntry::new(KdlValue::Bool(open)));
            doc.nodes_mut().push(node);
        }

        doc
    }
}

pub(crate) fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        let head: String = chars.iter().take(4).collect();
        format!("{}...", head)
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Required permissions for state.kdl (Unix: 0600, owner read/write only).
#[cfg(unix)]
pub const STATE_FILE_MODE: u32 = 0o600;

/// Required permissions for config.kdl (Unix: 0644, readable by all).
#[cfg(unix)]
pub const CONFIG_FILE_MODE: u32 = 0o644;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("human"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
api-url "https://bugs.example.com/api"
output-format "human"
"#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = BugboardConfig::from_kdl(&doc);
        assert_eq!(
            config.api_url.as_deref(),
            Some("https://bugs.example.com/api")
        );
        assert_eq!(config.output_format, Some(OutputFormat::Human));
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = BugboardConfig {
            api_url: Some("http://localhost:9000/api".into()),
            output_format: Some(OutputFormat::Json),
        };
        let doc: KdlDocument = config.to_kdl().to_string().parse().unwrap();
        assert_eq!(BugboardConfig::from_kdl(&doc), config);
    }

    #[test]
    fn test_config_set_rejects_unknown_key_and_bad_url() {
        let mut config = BugboardConfig::new();
        assert!(config.set("editor", "vim").is_err());
        assert!(config.set("api-url", "ftp://x").is_err());
        config.set("api-url", "http://host/api/").unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://host/api"));
    }

    #[test]
    fn test_state_roundtrip_with_user() {
        let state = BugboardState {
            auth_token: Some("token-123".into()),
            user: Some(User {
                id: 4,
                name: "Anna".into(),
                surname: "Rossi".into(),
                email: "anna.rossi@bugboard.it".into(),
                role: Role::Administrator,
                active: true,
            }),
            sidebar_open: Some(false),
        };
        let doc: KdlDocument = state.to_kdl().to_string().parse().unwrap();
        assert_eq!(BugboardState::from_kdl(&doc), state);
    }

    #[test]
    fn test_state_malformed_user_is_absent() {
        let kdl = r#"
auth-token "abc"
user "{not json"
"#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let state = BugboardState::from_kdl(&doc);
        assert_eq!(state.auth_token.as_deref(), Some("abc"));
        assert!(state.user.is_none());
    }

    #[test]
    fn test_state_masked_token() {
        let state = BugboardState {
            auth_token: Some("abcdefghijklmnopqrstuvwxyz".into()),
            ..Default::default()
        };
        assert_eq!(state.masked_token().as_deref(), Some("abcd...wxyz"));
        assert_eq!(mask_token("short"), "shor...");
    }
}
