//! Blogen - a Shopify blog CMS backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Shopify OAuth endpoints                                  │
//! │  - Session endpoints (me / logout)                          │
//! │  - Blog content endpoints                                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Shopify Client Layer                      │
//! │  - OAuth token exchange                                     │
//! │  - Admin API (shop, staff, blogs, articles)                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Operator profiles, tokens sealed at rest                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for blog content and metrics
//! - `auth`: Shopify OAuth flow, sessions, middleware
//! - `shopify`: Admin API client and shop domain rules
//! - `data`: Database layer
//! - `crypto`: Sealing primitives for tokens and sessions
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod data;
pub mod error;
pub mod metrics;
pub mod shopify;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Shopify Admin API client
    pub shopify: Arc<shopify::ShopifyClient>,

    /// HTTP client for outbound requests
    pub http_client: Arc<reqwest::Client>,

    /// Key that seals access tokens at rest
    pub credential_key: Arc<Vec<u8>>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Parse the credential sealing key
    /// 2. Connect to SQLite database
    /// 3. Build the outbound HTTP client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Parse the credential key before touching anything else
        let credential_key = crypto::parse_credential_key(&config.auth.credential_key)?;

        // 2. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!("Database connected");

        // 3. Build the outbound HTTP client
        let http_client = reqwest::Client::builder()
            .user_agent("Blogen/0.1.0")
            .timeout(std::time::Duration::from_secs(
                config.shopify.request_timeout_seconds,
            ))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;
        let http_client = Arc::new(http_client);

        let config = Arc::new(config);
        let shopify = shopify::ShopifyClient::new(Arc::clone(&config), Arc::clone(&http_client));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config,
            db: Arc::new(db),
            shopify: Arc::new(shopify),
            http_client,
            credential_key: Arc::new(credential_key),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .nest("/api", api::content_router())
        .merge(api::metrics_router(state.clone()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
