//! Precedence resolution for configuration.
//!
//! ## API URL precedence (highest to lowest)
//!
//! 1. `--api-url` CLI flag
//! 2. `BUGBOARD_API_URL` environment variable
//! 3. config.kdl `api-url`
//! 4. Built-in default (`http://localhost:8080/api`)
//!
//! ## Output format precedence (highest to lowest)
//!
//! 1. `-H/--human` CLI flag
//! 2. config.kdl `output-format`
//! 3. Built-in default (JSON)

use std::path::Path;

use crate::Result;
use crate::config::{BugboardConfig, DEFAULT_API_URL, OutputFormat, read_config};

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "BUGBOARD_API_URL";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_url: Resolved<String>,
    pub output_format: Resolved<OutputFormat>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            api_url: Resolved::new(DEFAULT_API_URL.to_string(), ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn api_url(&self) -> &str {
        &self.api_url.value
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Resolve configuration from the config directory, the environment and
/// CLI overrides.
pub fn resolve_config(config_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let file_config = read_config(config_dir)?;
    let env_url = std::env::var(API_URL_ENV).ok();
    Ok(resolve_with(&file_config, env_url, overrides))
}

/// Pure precedence step, separated from file and environment access.
pub fn resolve_with(
    file_config: &BugboardConfig,
    env_url: Option<String>,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    let non_blank = |s: &String| !s.trim().is_empty();

    if let Some(url) = overrides.api_url.clone().filter(non_blank) {
        result.api_url = Resolved::new(url, ValueSource::CliFlag);
    } else if let Some(url) = env_url.filter(non_blank) {
        result.api_url = Resolved::new(url, ValueSource::EnvVar(API_URL_ENV.to_string()));
    } else if let Some(url) = file_config.api_url.clone().filter(non_blank) {
        result.api_url = Resolved::new(url, ValueSource::ConfigFile);
    }

    if let Some(ref format) = overrides.output_format {
        result.output_format = Resolved::new(format.clone(), ValueSource::CliFlag);
    } else if let Some(ref format) = file_config.output_format {
        result.output_format = Resolved::new(format.clone(), ValueSource::ConfigFile);
    }

    result
}
