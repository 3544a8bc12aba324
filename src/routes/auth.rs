//! Sparka SSO routes.
//!
//! The SSO flow crosses two hops:
//! - `/api/auth/sparka/callback` - validates the browser's Sparka cookie and
//!   routes it either to the IdP login page or onward to the completion
//!   endpoint
//! - `/auth/sso/sparka` - completes sign-in: mints the app session cookie
//!   and sends the browser to its original destination, or renders the
//!   error panel
//! - `/api/auth/me` - introspects the current app session
//! - `/api/auth/logout` - deletes the app session and clears its cookie

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_cookies::{
    Cookie, Cookies,
    cookie::{SameSite as CookieSameSite, time::Duration as CookieDuration},
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthError, SignInError, SignInRequest},
    config::{SameSite, SessionConfig},
    sparka::{SparkaCredits, SparkaEntitlement, SparkaUser},
};

/// Build the session cookie issued after a successful sign-in.
fn build_session_cookie(session_config: &SessionConfig, session_id: Uuid) -> Cookie<'static> {
    let same_site = match session_config.same_site {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    };
    Cookie::build((session_config.cookie_name.clone(), session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(session_config.secure)
        .same_site(same_site)
        .max_age(CookieDuration::seconds(session_config.duration_secs as i64))
        .build()
}

/// Build a session removal cookie with the same security attributes as the login cookie.
fn build_removal_cookie(session_config: &SessionConfig) -> Cookie<'static> {
    let same_site = match session_config.same_site {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    };
    Cookie::build(session_config.cookie_name.clone())
        .path("/")
        .http_only(true)
        .secure(session_config.secure)
        .same_site(same_site)
        .max_age(CookieDuration::ZERO)
        .build()
}

/// Raw `Cookie` header value, if the request carried a non-empty one.
fn cookie_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Inbound `Origin` header, if any.
fn origin_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
}

/// Collapse a caller-supplied callback URL to an app-relative path.
///
/// Absolute URLs, scheme-relative `//host` forms, and backslash variants
/// such as `/\host` (browsers normalize `\` to `/` when resolving) fall
/// back to `/` so the flow can never redirect off the app's own origin.
fn sanitize_callback_url(url: Option<String>) -> String {
    url.filter(|u| {
        u.starts_with('/')
            && !u.starts_with("//")
            && !u.starts_with("/\\")
            && !u.contains("://")
    })
    .unwrap_or_else(|| "/".to_string())
}

/// Escape text for interpolation into HTML.
fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Minimal error page shown when sign-in fails with no recovery redirect.
fn error_panel(message: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Sign-in Failed</title></head>\n<body>\n\
         <h1>Sign-in Failed</h1>\n<p>{}</p>\n\
         <p><a href=\"/auth/login\">Return to Login</a></p>\n</body>\n</html>\n",
        html_escape(message)
    );
    Html(body).into_response()
}

/// Query parameters for the callback endpoint.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Where to send the browser once sign-in completes
    #[serde(rename = "callbackUrl", default)]
    pub callback_url: Option<String>,
}

/// Query parameters for the completion endpoint.
#[derive(Debug, Deserialize)]
pub struct SsoCompleteQuery {
    #[serde(rename = "callbackUrl", default)]
    pub callback_url: Option<String>,

    /// Set to `1` when the browser has already been through an IdP round trip
    #[serde(default)]
    pub returned: Option<String>,
}

/// Current-session view returned by `/api/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: SparkaUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entitlement: Option<SparkaEntitlement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<SparkaCredits>,
    pub expires_at: DateTime<Utc>,
}

/// Sparka SSO callback.
///
/// First hop of the flow. Based on the browser's Sparka cookie, bounces to
/// the IdP login page or forwards to the completion endpoint. Establishes no
/// app session itself; the completion endpoint does that with its own
/// validation pass.
#[tracing::instrument(name = "auth.callback", skip(state, headers, query))]
pub async fn sparka_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AuthError> {
    if !state.config.sparka.enabled {
        return Err(AuthError::SsoDisabled);
    }

    // returnTo is this endpoint's own absolute URL. callbackUrl does not
    // survive the IdP round trip; the post-login pass falls back to `/`.
    let own_url = format!(
        "{}/api/auth/sparka/callback",
        state.config.sparka.webapp_url
    );

    let Some(cookie) = cookie_header(&headers) else {
        tracing::debug!("No cookie on callback request; redirecting to the IdP login page");
        return Ok(Redirect::to(&state.sparka.login_redirect_url(Some(&own_url))).into_response());
    };

    let verdict = state
        .sparka
        .validate_session(cookie, origin_header(&headers))
        .await;

    if !verdict.authenticated || verdict.user.is_none() {
        return Ok(Redirect::to(&state.sparka.login_redirect_url(Some(&own_url))).into_response());
    }

    let callback_url = sanitize_callback_url(query.callback_url);
    let target = format!(
        "/auth/sso/sparka?callbackUrl={}",
        urlencoding::encode(&callback_url)
    );
    Ok(Redirect::to(&target).into_response())
}

/// Sparka SSO completion.
///
/// Second hop: runs the credential sign-in once per request and issues the
/// app session cookie on success. The `returned=1` marker distinguishes a
/// fresh attempt from the post-IdP return, bounding the flow to one IdP
/// round trip per attempt.
#[tracing::instrument(name = "auth.sso_complete", skip(state, headers, cookies, query))]
pub async fn sso_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<SsoCompleteQuery>,
) -> Result<Response, AuthError> {
    if !state.config.sparka.enabled {
        return Err(AuthError::SsoDisabled);
    }

    let callback_url = sanitize_callback_url(query.callback_url);
    let request = SignInRequest {
        cookie_header: cookie_header(&headers).unwrap_or_default().to_string(),
        origin: origin_header(&headers).map(str::to_string),
        callback_url: callback_url.clone(),
    };

    match state.signin.sign_in(request).await {
        Ok(success) => {
            cookies.add(build_session_cookie(
                &state.config.auth.session,
                success.session.id,
            ));
            Ok(Redirect::to(&success.redirect_url).into_response())
        }
        Err(SignInError::NotAuthenticated) => {
            if query.returned.as_deref() != Some("1") {
                // Fresh attempt: hand the browser to the IdP login page with
                // a returnTo that leads back here carrying the marker.
                let page_url = format!(
                    "{}/auth/sso/sparka?callbackUrl={}&returned=1",
                    state.config.sparka.webapp_url,
                    urlencoding::encode(&callback_url)
                );
                return Ok(
                    Redirect::to(&state.sparka.login_redirect_url(Some(&page_url)))
                        .into_response(),
                );
            }

            // Still unauthenticated after the IdP round trip: stop here
            // rather than redirect again.
            Ok(error_panel("Sparka session is not authenticated"))
        }
        Err(SignInError::Provider(message)) => Ok(error_panel(&message)),
        Err(SignInError::Internal(message)) => {
            tracing::error!(error = %message, "Sign-in failed unexpectedly");
            Ok(error_panel("An unexpected error occurred"))
        }
    }
}

/// Get the current user's session.
#[tracing::instrument(name = "auth.me", skip(state, cookies))]
pub async fn me(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<MeResponse>, AuthError> {
    let session_config = &state.config.auth.session;
    let session_id = cookies
        .get(&session_config.cookie_name)
        .and_then(|c| c.value().parse::<Uuid>().ok())
        .ok_or(AuthError::SessionNotFound)?;

    let session = state
        .sessions
        .get_session(session_id)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or(AuthError::SessionNotFound)?;

    Ok(Json(MeResponse {
        user: session.user,
        entitlement: session.entitlement,
        credits: session.credits,
        expires_at: session.expires_at,
    }))
}

/// Logout endpoint.
///
/// Deletes the app session and clears its cookie. The Sparka session on the
/// chat domain is untouched.
#[tracing::instrument(name = "auth.logout", skip(state, cookies))]
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response, AuthError> {
    let session_config = &state.config.auth.session;

    if let Some(session_cookie) = cookies.get(&session_config.cookie_name)
        && let Ok(session_id) = session_cookie.value().parse::<Uuid>()
    {
        let _ = state.sessions.delete_session(session_id).await;
        tracing::info!(session_id = %session_id, "Session deleted");
    }

    cookies.remove(build_removal_cookie(session_config));

    Ok(StatusCode::NO_CONTENT.into_response())
}
