//! Credential sign-in against Sparka.
//!
//! `CredentialSignIn` is the single seam between the HTTP handlers and the
//! identity provider: hand it the browser's cookie header, get back either a
//! minted session or a typed error. Handlers branch on the error variant,
//! never on error message text.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    auth::{BridgeSession, SharedSessionStore},
    sparka::SparkaClient,
};

/// Input to a sign-in attempt.
#[derive(Debug, Clone)]
pub struct SignInRequest {
    /// Raw `Cookie` header from the browser, forwarded to Sparka verbatim
    pub cookie_header: String,

    /// Inbound `Origin` header, if any
    pub origin: Option<String>,

    /// Where the browser should land after a successful sign-in
    pub callback_url: String,
}

/// A completed sign-in: the minted session plus the post-login destination.
#[derive(Debug, Clone)]
pub struct SignInSuccess {
    pub session: BridgeSession,
    pub redirect_url: String,
}

/// Why a sign-in attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    /// Sparka did not vouch for the presented cookie. Covers missing
    /// cookies, denied verdicts of any reason, and verdicts without a user.
    #[error("Sparka session is not authenticated")]
    NotAuthenticated,

    /// The sign-in backend rejected the attempt for some other reason.
    /// The message is user-presentable.
    #[error("{0}")]
    #[allow(dead_code)] // SparkaSignIn never produces this; other backends surface text here
    Provider(String),

    /// Session persistence or other internal failure
    #[error("Sign-in failed: {0}")]
    Internal(String),
}

/// One-method sign-in interface.
#[async_trait]
pub trait CredentialSignIn: Send + Sync {
    async fn sign_in(&self, request: SignInRequest) -> Result<SignInSuccess, SignInError>;
}

/// Sign-in backed by Sparka session validation.
///
/// A successful validation mints a [`BridgeSession`] carrying the user,
/// entitlement, and credit snapshot exactly as Sparka reported them.
pub struct SparkaSignIn {
    sparka: Arc<SparkaClient>,
    sessions: SharedSessionStore,
    session_duration_secs: u64,
}

impl SparkaSignIn {
    pub fn new(
        sparka: Arc<SparkaClient>,
        sessions: SharedSessionStore,
        session_duration_secs: u64,
    ) -> Self {
        Self {
            sparka,
            sessions,
            session_duration_secs,
        }
    }
}

#[async_trait]
impl CredentialSignIn for SparkaSignIn {
    async fn sign_in(&self, request: SignInRequest) -> Result<SignInSuccess, SignInError> {
        // No cookie means no session to validate; skip the network call
        if request.cookie_header.is_empty() {
            return Err(SignInError::NotAuthenticated);
        }

        let verdict = self
            .sparka
            .validate_session(&request.cookie_header, request.origin.as_deref())
            .await;

        if !verdict.authenticated {
            tracing::debug!(
                reason = verdict.reason.as_deref().unwrap_or("unknown"),
                "Sparka denied the session"
            );
            return Err(SignInError::NotAuthenticated);
        }

        let Some(user) = verdict.user else {
            tracing::warn!("Sparka reported an authenticated session without a user");
            return Err(SignInError::NotAuthenticated);
        };

        let session = BridgeSession::new(
            user,
            verdict.entitlement,
            verdict.credits,
            self.session_duration_secs,
        );

        self.sessions
            .create_session(session.clone())
            .await
            .map_err(|e| SignInError::Internal(e.to_string()))?;

        tracing::info!(
            user_id = %session.user.id,
            session_id = %session.id,
            "Signed in via Sparka session"
        );

        Ok(SignInSuccess {
            session,
            redirect_url: request.callback_url,
        })
    }
}
