//! Shopify OAuth authentication
//!
//! Handles:
//! - Shopify OAuth flow
//! - Session management
//! - Authentication middleware

mod middleware;
mod oauth;
pub mod session;

pub use middleware::{CurrentUser, require_session};
pub use oauth::auth_router;
pub use session::{SESSION_COOKIE, SessionData};
