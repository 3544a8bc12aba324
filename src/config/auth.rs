use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Bridge session cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

impl AuthConfig {
    /// Validate the authentication configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name.
    #[serde(default = "default_session_cookie")]
    pub cookie_name: String,

    /// Session duration in seconds.
    #[serde(default = "default_session_duration")]
    pub duration_secs: u64,

    /// Secure cookie (HTTPS only).
    #[serde(default = "default_true")]
    pub secure: bool,

    /// SameSite cookie attribute.
    #[serde(default)]
    pub same_site: SameSite,

    /// Interval between background sweeps of expired sessions, in seconds.
    /// Set to 0 to disable the sweeper; expired sessions are then only
    /// evicted lazily on read.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_session_cookie(),
            duration_secs: default_session_duration(),
            secure: true,
            same_site: SameSite::default(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl SessionConfig {
    /// Validate the session configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie_name.is_empty() {
            return Err(ConfigError::Validation(
                "Session cookie name cannot be empty".into(),
            ));
        }
        if self.duration_secs == 0 {
            return Err(ConfigError::Validation(
                "Session duration cannot be zero".into(),
            ));
        }
        Ok(())
    }

    /// Interval between background sweeps of expired sessions.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    #[default]
    Lax,
    Strict,
    None,
}

fn default_session_cookie() -> String {
    "__bridge_session".to_string()
}

// Default: 8 hours
fn default_session_duration() -> u64 {
    28800
}

// Default: sweep every 5 minutes
fn default_sweep_interval() -> u64 {
    300
}

fn default_true() -> bool {
    true
}
