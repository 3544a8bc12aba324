use serde::{Deserialize, Serialize};

/// Verdict returned by Sparka's session validation endpoint.
///
/// The body is passed through verbatim: no fields are interpreted beyond
/// `authenticated` and `user`, and unknown fields are ignored so the IdP
/// can grow its response without breaking the bridge.
///
/// Invariant (upheld by Sparka, relied on here): `authenticated == true`
/// implies `user` is present; `authenticated == false` implies `reason`
/// is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateResponse {
    #[serde(default)]
    pub authenticated: bool,

    /// Why validation failed. Synthesized locally as `http_<status>` or
    /// `network_error` when the validation call itself fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SparkaUser>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entitlement: Option<SparkaEntitlement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<SparkaCredits>,
}

impl ValidateResponse {
    /// A not-authenticated verdict with the given reason.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            reason: Some(reason.into()),
            user: None,
            entitlement: None,
            credits: None,
        }
    }
}

/// Identity fields as reported by Sparka. Opaque to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparkaUser {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Billing/authorization metadata owned by Sparka. Passed through, never
/// interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparkaEntitlement {
    #[serde(default)]
    pub entitled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Credit balances owned by Sparka. Passed through, never interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparkaCredits {
    #[serde(default)]
    pub total_credits: f64,

    #[serde(default)]
    pub available_credits: f64,

    #[serde(default)]
    pub reserved_credits: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_constructor() {
        let result = ValidateResponse::denied("http_401");
        assert!(!result.authenticated);
        assert_eq!(result.reason.as_deref(), Some("http_401"));
        assert!(result.user.is_none());
        assert!(result.entitlement.is_none());
        assert!(result.credits.is_none());
    }

    #[test]
    fn test_full_response_parses() {
        let body = serde_json::json!({
            "authenticated": true,
            "user": {
                "id": "u1",
                "email": "mason@example.com",
                "name": "Mason",
                "image": null
            },
            "entitlement": {
                "entitled": true,
                "tier": "pro",
                "source": "subscription",
                "reason": null
            },
            "credits": {
                "totalCredits": 100.0,
                "availableCredits": 75.5,
                "reservedCredits": 24.5
            }
        });

        let result: ValidateResponse = serde_json::from_value(body).unwrap();
        assert!(result.authenticated);

        let user = result.user.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.email.as_deref(), Some("mason@example.com"));
        assert!(user.image.is_none());

        let entitlement = result.entitlement.unwrap();
        assert!(entitlement.entitled);
        assert_eq!(entitlement.tier.as_deref(), Some("pro"));

        let credits = result.credits.unwrap();
        assert_eq!(credits.total_credits, 100.0);
        assert_eq!(credits.available_credits, 75.5);
        assert_eq!(credits.reserved_credits, 24.5);
    }

    #[test]
    fn test_sparse_response_parses() {
        // Sparka only includes fields relevant to the verdict
        let result: ValidateResponse =
            serde_json::from_str(r#"{"authenticated": false, "reason": "no_session"}"#).unwrap();
        assert!(!result.authenticated);
        assert_eq!(result.reason.as_deref(), Some("no_session"));
        assert!(result.user.is_none());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let result: ValidateResponse = serde_json::from_str(
            r#"{"authenticated": true, "user": {"id": "u1", "role": "admin"}, "experimental": {}}"#,
        )
        .unwrap();
        assert!(result.authenticated);
        assert_eq!(result.user.unwrap().id, "u1");
    }

    #[test]
    fn test_empty_object_is_not_authenticated() {
        let result: ValidateResponse = serde_json::from_str("{}").unwrap();
        assert!(!result.authenticated);
    }

    #[test]
    fn test_credits_serialize_camel_case() {
        let credits = SparkaCredits {
            total_credits: 10.0,
            available_credits: 8.0,
            reserved_credits: 2.0,
        };
        let value = serde_json::to_value(&credits).unwrap();
        assert_eq!(value["totalCredits"], 10.0);
        assert_eq!(value["availableCredits"], 8.0);
        assert_eq!(value["reservedCredits"], 2.0);
    }
}
