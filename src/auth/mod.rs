mod error;
mod session;
mod signin;

pub use error::AuthError;
pub use session::{
    BridgeSession, MemorySessionStore, SessionError, SessionResult, SessionStore,
    SharedSessionStore, start_session_sweeper,
};
pub use signin::{CredentialSignIn, SignInError, SignInRequest, SignInSuccess, SparkaSignIn};
