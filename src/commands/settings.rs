//! `bb config` commands: config.kdl values and stored preferences.

use serde::Serialize;

use super::{Context, Message, Output, to_json_string};
use crate::config::{self, OutputFormat};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct ConfigShow {
    pub api_url: String,
    pub api_url_source: String,
    pub output_format: OutputFormat,
    pub output_format_source: String,
    pub config_file: String,
    pub state_file: String,
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub sidebar_open: bool,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("api-url: {} ({})", self.api_url, self.api_url_source),
            format!(
                "output-format: {} ({})",
                self.output_format, self.output_format_source
            ),
            format!("sidebar: {}", if self.sidebar_open { "open" } else { "closed" }),
            format!("config file: {}", self.config_file),
            format!("state file: {}", self.state_file),
        ];
        match self.token {
            Some(ref token) => lines.push(format!("token: {}", token)),
            None => lines.push("token: (none)".to_string()),
        }
        lines.join("\n")
    }
}

/// Resolved settings and where each came from. The token is masked.
pub fn config_show(ctx: &Context) -> Result<ConfigShow> {
    let state = ctx.store().state()?;
    let resolved = ctx.config();
    Ok(ConfigShow {
        api_url: resolved.api_url().to_string(),
        api_url_source: resolved.api_url.source.to_string(),
        output_format: resolved.output_format().clone(),
        output_format_source: resolved.output_format.source.to_string(),
        config_file: config::config_path(ctx.config_dir()).display().to_string(),
        state_file: config::state_path(ctx.store().dir()).display().to_string(),
        logged_in: state.auth_token.is_some() && state.user.is_some(),
        token: state.masked_token(),
        sidebar_open: state.sidebar_open.unwrap_or(true),
    })
}

pub fn config_set(ctx: &Context, key: &str, value: &str) -> Result<Message> {
    let mut file = config::read_config(ctx.config_dir())?;
    file.set(key, value).map_err(Error::Validation)?;
    config::write_config(ctx.config_dir(), &file)?;
    Ok(Message::new(format!("Set {} = {}", key, value)))
}

#[derive(Debug, Clone, Serialize)]
pub struct SidebarState {
    pub sidebar_open: bool,
}

impl Output for SidebarState {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Sidebar {}", if self.sidebar_open { "open" } else { "closed" })
    }
}

/// Read the sidebar preference, or store a new one.
pub fn config_sidebar(ctx: &Context, open: Option<bool>) -> Result<SidebarState> {
    if let Some(open) = open {
        ctx.store().set_sidebar_open(open)?;
    }
    Ok(SidebarState {
        sidebar_open: ctx.store().sidebar_open()?,
    })
}
