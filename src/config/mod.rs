//! Configuration module for the SSO bridge.
//!
//! The bridge is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax. The `SPARKA_*`
//! variables used by the wider deployment override their config-file
//! counterparts, so the bridge can also run with no file at all.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [sparka]
//! enabled = true
//! validate_url = "https://chat.masonjames.com/api/auth/validate"
//! login_url = "https://chat.masonjames.com/login"
//! ```

mod auth;
mod observability;
mod server;
mod sparka;

use std::path::Path;

pub use auth::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use server::*;
pub use sparka::*;

/// Root configuration for the SSO bridge.
///
/// All sections are optional with sensible defaults, allowing minimal
/// configuration for simple deployments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Sparka IdP integration.
    #[serde(default)]
    pub sparka: SparkaConfig,

    /// Authentication and session cookie configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded, and
    /// `SPARKA_*` overrides are applied on top of the parsed file. Missing
    /// required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        let mut config = Self::parse(&contents)?;
        config.sparka.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// Unlike [`BridgeConfig::from_file`] and [`BridgeConfig::from_env`],
    /// no `SPARKA_*` overrides are applied, so the result depends only on
    /// the input text.
    #[allow(dead_code)] // Used in tests; production loads via from_file/from_env
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults and `SPARKA_*` environment
    /// variables, without a config file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.sparka.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        toml::from_str(&expanded).map_err(ConfigError::Parse)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.sparka.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        // Process the line, only expanding variables that appear before any comment
        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let match_start = cap.get(0).unwrap().start();

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos
                && match_start >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..match_start]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = cap.get(0).unwrap().end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
