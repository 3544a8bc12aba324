use reqwest::header;

use crate::{config::SparkaConfig, sparka::ValidateResponse};

/// Client for Sparka's session validation endpoint.
///
/// Holds the shared HTTP client and the resolved Sparka configuration, so
/// handlers can validate cookies without touching global state.
#[derive(Debug, Clone)]
pub struct SparkaClient {
    http: reqwest::Client,
    config: SparkaConfig,
}

impl SparkaClient {
    pub fn new(http: reqwest::Client, config: SparkaConfig) -> Self {
        Self { http, config }
    }

    /// Validate a browser's session cookie against Sparka.
    ///
    /// The `Cookie` header is forwarded verbatim so Sparka evaluates the
    /// same session the browser holds. `origin` defaults to this app's own
    /// public URL when the inbound request carried no `Origin` header.
    ///
    /// Never fails: transport errors, non-2xx statuses, and undecodable
    /// bodies all map to a not-authenticated verdict with a synthesized
    /// reason. A failed validation pushes the user back into the login
    /// redirect, which is the manual retry path.
    #[tracing::instrument(name = "sparka.validate", skip(self, cookie_header))]
    pub async fn validate_session(
        &self,
        cookie_header: &str,
        origin: Option<&str>,
    ) -> ValidateResponse {
        let origin = origin.unwrap_or(&self.config.webapp_url);

        let response = match self
            .http
            .get(&self.config.validate_url)
            .header(header::COOKIE, cookie_header)
            .header(header::ORIGIN, origin)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Sparka validation request failed");
                return ValidateResponse::denied("network_error");
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(
                status = status.as_u16(),
                "Sparka validation returned non-2xx"
            );
            return ValidateResponse::denied(format!("http_{}", status.as_u16()));
        }

        match response.json::<ValidateResponse>().await {
            Ok(result) => {
                tracing::debug!(
                    authenticated = result.authenticated,
                    "Sparka validation completed"
                );
                result
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to decode Sparka validation response");
                ValidateResponse::denied("network_error")
            }
        }
    }

    /// Build the Sparka login URL with a `returnTo` parameter.
    ///
    /// `return_to` defaults to the app's public base URL so a login started
    /// without context still lands the user back on the app.
    pub fn login_redirect_url(&self, return_to: Option<&str>) -> String {
        let return_to = return_to.unwrap_or(&self.config.webapp_url);
        format!(
            "{}?returnTo={}",
            self.config.login_url,
            urlencoding::encode(return_to)
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::*;

    fn test_client(validate_url: &str) -> SparkaClient {
        let config = SparkaConfig {
            enabled: true,
            validate_url: validate_url.to_string(),
            ..SparkaConfig::default()
        };
        SparkaClient::new(reqwest::Client::new(), config)
    }

    async fn mock_idp(server: &MockServer, template: ResponseTemplate) -> SparkaClient {
        Mock::given(method("GET"))
            .and(path("/api/auth/validate"))
            .respond_with(template)
            .mount(server)
            .await;
        test_client(&format!("{}/api/auth/validate", server.uri()))
    }

    #[tokio::test]
    async fn test_validation_forwards_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/validate"))
            .and(header("Cookie", "session-token=abc123"))
            .and(header("Origin", "https://cal.masonjames.com"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "authenticated": true,
                "user": {"id": "u1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&format!("{}/api/auth/validate", server.uri()));
        let result = client.validate_session("session-token=abc123", None).await;
        assert!(result.authenticated);
    }

    #[tokio::test]
    async fn test_explicit_origin_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/validate"))
            .and(header("Origin", "https://cal.masonjames.com:3000"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"authenticated": false, "reason": "x"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&format!("{}/api/auth/validate", server.uri()));
        client
            .validate_session("s=1", Some("https://cal.masonjames.com:3000"))
            .await;
    }

    #[tokio::test]
    async fn test_authenticated_body_passes_through() {
        let server = MockServer::start().await;
        let client = mock_idp(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "authenticated": true,
                "user": {"id": "u1", "email": "mason@example.com", "name": "Mason"},
                "entitlement": {"entitled": true, "tier": "pro"},
                "credits": {"totalCredits": 50.0, "availableCredits": 40.0, "reservedCredits": 10.0}
            })),
        )
        .await;

        let result = client.validate_session("session-token=abc", None).await;
        assert!(result.authenticated);
        assert!(result.reason.is_none());
        assert_eq!(result.user.as_ref().unwrap().id, "u1");
        assert!(result.entitlement.as_ref().unwrap().entitled);
        assert_eq!(result.credits.as_ref().unwrap().available_credits, 40.0);
    }

    #[rstest]
    #[case::bad_request(400)]
    #[case::unauthorized(401)]
    #[case::forbidden(403)]
    #[case::server_error(500)]
    #[case::unavailable(503)]
    #[tokio::test]
    async fn test_non_2xx_maps_to_http_reason(#[case] status: u16) {
        let server = MockServer::start().await;
        let client = mock_idp(&server, ResponseTemplate::new(status)).await;

        let result = client.validate_session("session-token=abc", None).await;
        assert!(!result.authenticated);
        assert_eq!(result.reason.as_deref(), Some(format!("http_{status}").as_str()));
        assert!(result.user.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_network_error() {
        // Nothing listens on port 9 (discard); connection is refused
        let client = test_client("http://127.0.0.1:9/api/auth/validate");

        let result = client.validate_session("session-token=abc", None).await;
        assert!(!result.authenticated);
        assert_eq!(result.reason.as_deref(), Some("network_error"));
    }

    #[tokio::test]
    async fn test_undecodable_2xx_maps_to_network_error() {
        let server = MockServer::start().await;
        let client = mock_idp(
            &server,
            ResponseTemplate::new(200).set_body_string("<html>not json</html>"),
        )
        .await;

        let result = client.validate_session("session-token=abc", None).await;
        assert!(!result.authenticated);
        assert_eq!(result.reason.as_deref(), Some("network_error"));
    }

    #[test]
    fn test_login_redirect_url_defaults_to_webapp() {
        let client = SparkaClient::new(reqwest::Client::new(), SparkaConfig::default());
        assert_eq!(
            client.login_redirect_url(None),
            "https://chat.masonjames.com/login?returnTo=https%3A%2F%2Fcal.masonjames.com"
        );
    }

    #[test]
    fn test_login_redirect_url_encodes_return_to() {
        let client = SparkaClient::new(reqwest::Client::new(), SparkaConfig::default());
        assert_eq!(
            client.login_redirect_url(Some("https://cal.masonjames.com/api/auth/sparka/callback")),
            "https://chat.masonjames.com/login?returnTo=https%3A%2F%2Fcal.masonjames.com%2Fapi%2Fauth%2Fsparka%2Fcallback"
        );
    }
}
