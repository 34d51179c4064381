//! Shopify OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with per-user
//! grants against a shop's `/admin/oauth` endpoints, and the session
//! endpoints that consume the result.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::Deserialize;
use serde_json::json;
use time::Duration as CookieDuration;

use crate::AppState;
use crate::auth::session::{self, SessionData};
use crate::data::{UserRole, UserUpsert};
use crate::error::AppError;
use crate::metrics::{
    OAUTH_AUTHORIZATIONS_TOTAL, OAUTH_STATE_TOKENS_ISSUED, SESSIONS_ESTABLISHED_TOTAL,
};
use crate::shopify;

/// Name of the anti-forgery state cookie.
pub const STATE_COOKIE: &str = "oauth_state";
/// How long one pending authorization may stay open.
const STATE_COOKIE_MAX_AGE_SECONDS: i64 = 600;
/// Where the browser lands after a successful authorization.
const DASHBOARD_LOCATION: &str = "/dashboard";
/// Single failure destination. Step detail stays in the logs.
const AUTH_ERROR_LOCATION: &str = "/auth/error?message=Authentication%20failed";

/// Create authentication router
///
/// Routes:
/// - GET /api/auth/shopify - Redirect to the shop's consent page
/// - POST /api/auth/shopify - Consent URL as JSON (for fetch-based UIs)
/// - GET /api/auth/shopify/callback - OAuth callback
/// - GET /api/auth/me - Current operator profile
/// - GET/POST /api/auth/logout - Destroy session
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/auth/shopify",
            get(begin_authorization).post(begin_authorization_json),
        )
        .route("/api/auth/shopify/callback", get(authorization_callback))
        .route("/api/auth/me", get(current_user_profile))
        .route("/api/auth/logout", get(logout_redirect).post(logout))
}

// =============================================================================
// Authorization initiation
// =============================================================================

#[derive(Debug, Deserialize)]
struct BeginAuthQuery {
    shop: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BeginAuthBody {
    shop: Option<String>,
}

/// Validate the shop parameter and mint the state token.
///
/// Returns the canonical shop domain, the state token, and the consent
/// URL the operator's browser must visit.
fn prepare_authorization(
    state: &AppState,
    shop_input: Option<&str>,
) -> Result<(String, String, String), AppError> {
    let shop_input = shop_input
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation("Shop parameter is required".to_string()))?;

    let shop = shopify::normalize_shop_domain(shop_input);
    if !shopify::is_valid_shop_domain(&shop) {
        return Err(AppError::Validation("Invalid shop domain".to_string()));
    }

    let state_token = generate_state_token();
    let consent_url = state.shopify.consent_url(&shop, &state_token)?;
    OAUTH_STATE_TOKENS_ISSUED.inc();

    Ok((shop, state_token, consent_url))
}

/// GET /api/auth/shopify
///
/// Sends the operator's browser to the shop's consent page.
///
/// # Steps
/// 1. Normalize and validate the shop domain
/// 2. Mint the anti-forgery state token, store it in the state cookie
/// 3. Redirect to the consent URL
async fn begin_authorization(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<BeginAuthQuery>,
) -> Result<Response, AppError> {
    let (shop, state_token, consent_url) = prepare_authorization(&state, query.shop.as_deref())?;
    let cookie = build_state_cookie(&state_token, state.config.should_use_secure_cookies());

    tracing::info!(shop = %shop, "Redirecting operator to consent page");
    Ok((jar.add(cookie), Redirect::to(&consent_url)).into_response())
}

/// POST /api/auth/shopify
///
/// Same contract as the GET path, but returns the consent URL as JSON
/// so a fetch-based UI can navigate itself. The state cookie is set
/// here too; without it the callback could never verify the response.
async fn begin_authorization_json(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<BeginAuthBody>,
) -> Result<Response, AppError> {
    let (shop, state_token, consent_url) = prepare_authorization(&state, body.shop.as_deref())?;
    let cookie = build_state_cookie(&state_token, state.config.should_use_secure_cookies());

    tracing::info!(shop = %shop, "Issued consent URL");
    let payload = json!({
        "authUrl": consent_url,
        "state": state_token,
    });
    Ok((jar.add(cookie), Json(payload)).into_response())
}

// =============================================================================
// Authorization callback
// =============================================================================

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// Shop domain the grant belongs to
    shop: Option<String>,
    /// Anti-forgery state token
    state: Option<String>,
}

/// A failed callback step: which stage broke, and the underlying error.
///
/// Only the stage label and log line ever distinguish failures; the
/// browser always gets the same generic redirect.
struct CallbackFailure {
    stage: &'static str,
    error: AppError,
}

impl CallbackFailure {
    fn at(stage: &'static str) -> impl FnOnce(AppError) -> Self {
        move |error| Self { stage, error }
    }
}

/// GET /api/auth/shopify/callback
///
/// Completes the authorization. Every failure converges to the same
/// generic error redirect, and the single-use state cookie is cleared
/// on every response.
async fn authorization_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match complete_authorization(&state, &query, &jar).await {
        Ok(session_cookie) => {
            OAUTH_AUTHORIZATIONS_TOTAL
                .with_label_values(&["completed"])
                .inc();
            let jar = jar.add(clear_state_cookie()).add(session_cookie);
            (jar, Redirect::to(DASHBOARD_LOCATION)).into_response()
        }
        Err(failure) => {
            tracing::warn!(
                stage = failure.stage,
                error = %failure.error,
                "Shopify authorization failed"
            );
            OAUTH_AUTHORIZATIONS_TOTAL
                .with_label_values(&[failure.stage])
                .inc();
            let jar = jar.add(clear_state_cookie());
            (jar, Redirect::to(AUTH_ERROR_LOCATION)).into_response()
        }
    }
}

/// The callback pipeline. Returns the session cookie to set.
///
/// # Steps
/// 1. Require code, shop, and state parameters
/// 2. Compare state against the cookie before any network call
/// 3. Re-validate the shop domain
/// 4. Exchange the code for an access token
/// 5. Fetch shop and staff profiles concurrently (both required)
/// 6. Derive the role and upsert the operator profile atomically
/// 7. Seal the session
async fn complete_authorization(
    state: &AppState,
    query: &CallbackQuery,
    jar: &CookieJar,
) -> Result<Cookie<'static>, CallbackFailure> {
    let (Some(code), Some(shop_param), Some(state_param)) = (
        query.code.as_deref(),
        query.shop.as_deref(),
        query.state.as_deref(),
    ) else {
        return Err(CallbackFailure {
            stage: "missing_parameters",
            error: AppError::Validation("callback requires code, shop, and state".to_string()),
        });
    };

    // Anti-forgery check comes before anything touches the network.
    let expected_state = jar.get(STATE_COOKIE).map(|cookie| cookie.value().to_owned());
    if expected_state.as_deref() != Some(state_param) {
        return Err(CallbackFailure {
            stage: "state_mismatch",
            error: AppError::Unauthorized,
        });
    }

    let shop = shopify::normalize_shop_domain(shop_param);
    if !shopify::is_valid_shop_domain(&shop) {
        return Err(CallbackFailure {
            stage: "invalid_shop",
            error: AppError::Validation("Invalid shop domain".to_string()),
        });
    }

    let auth = state
        .shopify
        .exchange_code(&shop, code)
        .await
        .map_err(CallbackFailure::at("token_exchange"))?;

    // Both profiles are required; fetch them concurrently.
    let (shop_profile, staff) = match tokio::join!(
        state.shopify.fetch_shop(&auth),
        state.shopify.fetch_current_user(&auth),
    ) {
        (Ok(shop_profile), Ok(staff)) => (shop_profile, staff),
        (Err(error), _) | (_, Err(error)) => {
            return Err(CallbackFailure {
                stage: "profile_fetch",
                error,
            });
        }
    };

    let role = UserRole::from_account_owner(staff.account_owner);
    let access_token_ciphertext =
        crate::crypto::seal_to_string(&state.credential_key, auth.access_token.as_bytes())
            .map_err(CallbackFailure::at("persistence"))?;

    let user = state
        .db
        .upsert_user(&UserUpsert {
            shopify_user_id: staff.id,
            email: staff.email.clone(),
            full_name: staff.full_name(),
            shop_domain: shop.clone(),
            store_name: Some(shop_profile.name.clone()),
            access_token_ciphertext,
            role,
        })
        .await
        .map_err(CallbackFailure::at("persistence"))?;

    let session_record = SessionData::establish(
        user.to_public(),
        auth.access_token.clone(),
        shop.clone(),
        state.config.auth.session_max_age,
    );
    let sealed = session::seal_session(&session_record, &state.config.auth.session_secret)
        .map_err(CallbackFailure::at("session"))?;

    SESSIONS_ESTABLISHED_TOTAL.inc();
    tracing::info!(
        shop = %shop,
        shopify_user_id = staff.id,
        role = role.as_str(),
        "Operator authorized"
    );

    Ok(session::build_session_cookie(
        sealed,
        state.config.should_use_secure_cookies(),
        state.config.auth.session_max_age,
    ))
}

// =============================================================================
// Session endpoints
// =============================================================================

/// GET /api/auth/me
///
/// Returns the operator profile from the session. The access token is
/// never part of the response.
async fn current_user_profile(
    crate::auth::CurrentUser(session_record): crate::auth::CurrentUser,
) -> impl IntoResponse {
    Json(session_record.user)
}

/// POST /api/auth/logout
///
/// Clears the session cookie.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.add(session::clear_session_cookie()),
        Json(json!({ "success": true })),
    )
}

/// GET /api/auth/logout
///
/// Clears the session cookie and sends the browser home.
async fn logout_redirect(jar: CookieJar) -> impl IntoResponse {
    (
        jar.add(session::clear_session_cookie()),
        Redirect::to("/"),
    )
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random anti-forgery state token (256 bits, base64url).
fn generate_state_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn build_state_cookie(state_token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, state_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(STATE_COOKIE_MAX_AGE_SECONDS))
        .build()
}

fn clear_state_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((STATE_COOKIE, "".to_string()))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}
