//! Common test utilities for E2E tests

use blogen::auth::session::{self, SessionData};
use blogen::data::{EntityId, PublicUser, UserRole};
use blogen::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Session secret used across the suite (32+ bytes).
pub const TEST_SESSION_SECRET: &str = "test-secret-key-32-bytes-long!!!";
/// 32-byte credential sealing key, base64 encoded.
pub const TEST_CREDENTIAL_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
/// Access token placed in sessions minted by `establish_session`.
pub const TEST_ACCESS_TOKEN: &str = "shpua_test_token";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::start(None).await
    }

    /// Create a test server whose Admin API calls go to `admin_api_base`
    /// (a wiremock server) instead of the shop's real domain.
    pub async fn with_admin_api_base(admin_api_base: &str) -> Self {
        Self::start(Some(admin_api_base.to_string())).await
    }

    async fn start(admin_api_base: Option<String>) -> Self {
        // Register metrics once per test binary
        static INIT_METRICS: std::sync::Once = std::sync::Once::new();
        INIT_METRICS.call_once(blogen::metrics::init_metrics);

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "127.0.0.1".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            shopify: config::ShopifyConfig {
                api_key: "test-api-key".to_string(),
                api_secret: "test-api-secret".to_string(),
                scopes: "read_content,write_content".to_string(),
                api_version: "2024-01".to_string(),
                admin_api_base,
                request_timeout_seconds: 10,
            },
            auth: config::AuthConfig {
                session_secret: TEST_SESSION_SECRET.to_string(),
                credential_key: TEST_CREDENTIAL_KEY.to_string(),
                session_max_age: 604800,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = blogen::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Seal a session for the default operator and return its Cookie
    /// header value together with the profile it carries.
    pub fn establish_session(&self) -> (String, PublicUser) {
        self.establish_session_for(test_operator())
    }

    /// Seal a session for a given operator profile.
    pub fn establish_session_for(&self, user: PublicUser) -> (String, PublicUser) {
        let session = SessionData::establish(
            user.clone(),
            TEST_ACCESS_TOKEN.to_string(),
            user.shop_domain.clone(),
            self.state.config.auth.session_max_age,
        );
        let sealed = session::seal_session(&session, &self.state.config.auth.session_secret)
            .expect("failed to seal test session");
        (format!("{}={}", session::SESSION_COOKIE, sealed), user)
    }
}

/// Operator profile most session tests use.
pub fn test_operator() -> PublicUser {
    let now = chrono::Utc::now();
    PublicUser {
        id: EntityId::new().0,
        shopify_user_id: 77,
        email: "asha@pahadi.example".to_string(),
        full_name: Some("Asha Negi".to_string()),
        shop_domain: "pahadi-store.myshopify.com".to_string(),
        store_name: Some("Pahadi Store".to_string()),
        role: UserRole::StoreOwner,
        created_at: now,
        updated_at: now,
    }
}

/// Pull one cookie's value out of a response's Set-Cookie headers.
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .and_then(|v| v.split(';').next())
        .map(|pair| pair[prefix.len()..].to_string())
}

/// The Set-Cookie header for one cookie, attributes included.
pub fn set_cookie_header(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(ToString::to_string)
}
