//! Authentication middleware
//!
//! Protects routes that require an established session.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::{SESSION_COOKIE, SessionData, open_session};
use crate::AppState;
use crate::error::AppError;

fn extract_sealed_session(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
}

fn authenticate(sealed: &str, state: &AppState) -> Result<SessionData, AppError> {
    open_session(sealed, &state.config.auth.session_secret)
}

/// Middleware to require an authenticated session
///
/// Opens and validates the session cookie.
/// Adds SessionData to request extensions if valid.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/metrics", ...)
///     .layer(middleware::from_fn_with_state(state, require_session));
/// ```
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let sealed = extract_sealed_session(request.headers()).ok_or(AppError::Unauthorized)?;
    let session = authenticate(&sealed, &state)?;

    // Add session to request extensions
    request.extensions_mut().insert(session);

    // Continue to next handler
    Ok(next.run(request).await)
}

/// Extractor for the current authenticated session
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(session): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", session.user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionData);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<SessionData>().cloned() {
            return Ok(CurrentUser(session));
        }

        let app_state = AppState::from_ref(state);
        let sealed = extract_sealed_session(&parts.headers).ok_or(AppError::Unauthorized)?;
        let session = authenticate(&sealed, &app_state)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}
