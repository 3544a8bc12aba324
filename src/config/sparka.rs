use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Sparka IdP integration configuration.
///
/// The bridge trusts Sparka (the chat deployment) as its identity provider:
/// cookies minted by Sparka are validated server-side against its validation
/// endpoint, and unauthenticated browsers are sent to its login page.
///
/// Every field can be overridden with an environment variable, which takes
/// precedence over both the config file and the built-in default:
///
/// | Field          | Variable                                             |
/// |----------------|------------------------------------------------------|
/// | `enabled`      | `SPARKA_SSO_ENABLED`                                 |
/// | `validate_url` | `SPARKA_VALIDATE_URL`                                |
/// | `login_url`    | `SPARKA_LOGIN_URL` or `NEXT_PUBLIC_SPARKA_LOGIN_URL` |
/// | `webapp_url`   | `NEXT_PUBLIC_WEBAPP_URL`                             |
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SparkaConfig {
    /// Master toggle for the SSO bridge endpoints.
    /// When disabled, the callback and completion endpoints return 404.
    #[serde(default)]
    pub enabled: bool,

    /// Sparka session validation endpoint.
    #[serde(default = "default_validate_url")]
    pub validate_url: String,

    /// Sparka login page. Unauthenticated browsers are redirected here
    /// with a `returnTo` query parameter.
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Public base URL of this web app. Sent as the default `Origin` header
    /// on validation calls and used as the fallback `returnTo` target.
    #[serde(default = "default_webapp_url")]
    pub webapp_url: String,
}

impl Default for SparkaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            validate_url: default_validate_url(),
            login_url: default_login_url(),
            webapp_url: default_webapp_url(),
        }
    }
}

impl SparkaConfig {
    /// Apply environment variable overrides.
    ///
    /// `SPARKA_SSO_ENABLED` is a string flag: the bridge is enabled iff the
    /// value is exactly `"true"`. Any other value disables it, regardless of
    /// what the config file says.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(enabled) = std::env::var("SPARKA_SSO_ENABLED") {
            self.enabled = enabled == "true";
        }
        if let Ok(url) = std::env::var("SPARKA_VALIDATE_URL") {
            self.validate_url = url;
        }
        if let Ok(url) = std::env::var("SPARKA_LOGIN_URL")
            .or_else(|_| std::env::var("NEXT_PUBLIC_SPARKA_LOGIN_URL"))
        {
            self.login_url = url;
        }
        if let Ok(url) = std::env::var("NEXT_PUBLIC_WEBAPP_URL") {
            self.webapp_url = url;
        }
    }

    /// Validate the Sparka configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_http_url("sparka.validate_url", &self.validate_url)?;
        check_http_url("sparka.login_url", &self.login_url)?;
        check_http_url("sparka.webapp_url", &self.webapp_url)?;
        Ok(())
    }
}

fn check_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(value)
        .map_err(|e| ConfigError::Validation(format!("{field} is not a valid URL: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{field} must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(())
}

fn default_validate_url() -> String {
    "https://chat.masonjames.com/api/auth/validate".to_string()
}

fn default_login_url() -> String {
    "https://chat.masonjames.com/login".to_string()
}

fn default_webapp_url() -> String {
    "https://cal.masonjames.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparka_config_defaults() {
        let config = SparkaConfig::default();
        assert!(!config.enabled);
        assert_eq!(
            config.validate_url,
            "https://chat.masonjames.com/api/auth/validate"
        );
        assert_eq!(config.login_url, "https://chat.masonjames.com/login");
        assert_eq!(config.webapp_url, "https://cal.masonjames.com");
    }

    #[test]
    fn test_sparka_config_parse() {
        let toml = r#"
            enabled = true
            validate_url = "https://idp.example.com/api/auth/validate"
            login_url = "https://idp.example.com/login"
        "#;
        let config: SparkaConfig = toml::from_str(toml).unwrap();
        assert!(config.enabled);
        assert_eq!(
            config.validate_url,
            "https://idp.example.com/api/auth/validate"
        );
        // Defaults for unspecified fields
        assert_eq!(config.webapp_url, "https://cal.masonjames.com");
    }

    #[test]
    fn test_enabled_flag_requires_literal_true() {
        for (value, expected) in [
            (Some("true"), true),
            (Some("TRUE"), false),
            (Some("1"), false),
            (Some("yes"), false),
            (Some(""), false),
        ] {
            temp_env::with_var("SPARKA_SSO_ENABLED", value, || {
                let mut config = SparkaConfig {
                    enabled: true,
                    ..SparkaConfig::default()
                };
                config.apply_env_overrides();
                assert_eq!(config.enabled, expected, "SPARKA_SSO_ENABLED={value:?}");
            });
        }
    }

    #[test]
    fn test_enabled_flag_unset_keeps_config_value() {
        temp_env::with_var_unset("SPARKA_SSO_ENABLED", || {
            let mut config = SparkaConfig {
                enabled: true,
                ..SparkaConfig::default()
            };
            config.apply_env_overrides();
            assert!(config.enabled);
        });
    }

    #[test]
    fn test_url_env_overrides() {
        temp_env::with_vars(
            [
                ("SPARKA_VALIDATE_URL", Some("https://idp.test/validate")),
                ("SPARKA_LOGIN_URL", Some("https://idp.test/login")),
                ("NEXT_PUBLIC_WEBAPP_URL", Some("https://app.test")),
            ],
            || {
                let mut config = SparkaConfig::default();
                config.apply_env_overrides();
                assert_eq!(config.validate_url, "https://idp.test/validate");
                assert_eq!(config.login_url, "https://idp.test/login");
                assert_eq!(config.webapp_url, "https://app.test");
            },
        );
    }

    #[test]
    fn test_login_url_fallback_variable() {
        // NEXT_PUBLIC_SPARKA_LOGIN_URL applies only when SPARKA_LOGIN_URL is unset.
        temp_env::with_vars(
            [
                ("SPARKA_LOGIN_URL", None),
                (
                    "NEXT_PUBLIC_SPARKA_LOGIN_URL",
                    Some("https://public.test/login"),
                ),
            ],
            || {
                let mut config = SparkaConfig::default();
                config.apply_env_overrides();
                assert_eq!(config.login_url, "https://public.test/login");
            },
        );

        temp_env::with_vars(
            [
                ("SPARKA_LOGIN_URL", Some("https://server.test/login")),
                (
                    "NEXT_PUBLIC_SPARKA_LOGIN_URL",
                    Some("https://public.test/login"),
                ),
            ],
            || {
                let mut config = SparkaConfig::default();
                config.apply_env_overrides();
                assert_eq!(config.login_url, "https://server.test/login");
            },
        );
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let config = SparkaConfig {
            validate_url: "not a url".to_string(),
            ..SparkaConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sparka.validate_url"));

        let config = SparkaConfig {
            login_url: "ftp://idp.example.com/login".to_string(),
            ..SparkaConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must use http or https"));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(SparkaConfig::default().validate().is_ok());
    }
}
