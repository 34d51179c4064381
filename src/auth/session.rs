//! Session management
//!
//! Uses AES-256-GCM sealed session payloads stored in a cookie.
//! No server-side session storage needed.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::Duration as CookieDuration;

use crate::data::PublicUser;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "blogen-session";

/// Session record sealed into the `blogen-session` cookie.
///
/// Carries the operator profile plus the Shopify access token for
/// request-time article calls. The token never appears outside the
/// encrypted payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Operator profile (credential-free view)
    pub user: PublicUser,
    /// Shopify access token granted to this operator
    pub access_token: String,
    /// Canonical shop domain the session belongs to
    pub shop: String,
    /// Always true for established sessions
    pub authenticated: bool,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    /// Establish a session valid for `max_age_seconds` from now.
    pub fn establish(
        user: PublicUser,
        access_token: String,
        shop: String,
        max_age_seconds: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            user,
            access_token,
            shop,
            authenticated: true,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Derive the 32-byte sealing key from the configured session secret.
fn sealing_key(secret: &str) -> Vec<u8> {
    Sha256::digest(secret.as_bytes()).to_vec()
}

/// Seal a session into its cookie value.
///
/// # Errors
/// Returns error if serialization or encryption fails
pub fn seal_session(
    session: &SessionData,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    let payload = serde_json::to_vec(session)
        .map_err(|e| crate::error::AppError::Internal(e.into()))?;
    crate::crypto::seal_to_string(&sealing_key(secret), &payload)
}

/// Open and validate a session cookie value.
///
/// Any failure (malformed encoding, wrong key, tampering, expired
/// session) maps to `Unauthorized`; the cookie is untrusted input.
pub fn open_session(sealed: &str, secret: &str) -> Result<SessionData, crate::error::AppError> {
    let payload = crate::crypto::open_sealed_string(&sealing_key(secret), sealed)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    let session: SessionData =
        serde_json::from_slice(&payload).map_err(|_| crate::error::AppError::Unauthorized)?;

    if session.is_expired() {
        return Err(crate::error::AppError::Unauthorized);
    }

    Ok(session)
}

/// Build the session cookie carrying a sealed payload.
pub fn build_session_cookie(
    sealed_value: String,
    secure: bool,
    max_age_seconds: i64,
) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, sealed_value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .build()
}

/// Build a removal cookie destroying the session.
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "".to_string()))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}
