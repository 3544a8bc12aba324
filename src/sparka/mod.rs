//! Sparka IdP integration.
//!
//! Sparka owns the real session, entitlement, and credit data. The bridge
//! never mutates any of it: the client here forwards the browser's cookie
//! to Sparka's validation endpoint and passes the JSON verdict through.

mod client;
mod types;

pub use client::*;
pub use types::*;
