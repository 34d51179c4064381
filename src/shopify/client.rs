//! Shopify Admin API client.
//!
//! All outbound calls to Shopify go through this module: the OAuth token
//! exchange, profile fetches during authorization, and blog/article
//! operations on behalf of an established session. Every request uses
//! the shared HTTP client and its configured timeout; nothing retries.

use std::sync::Arc;
use std::time::Instant;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::metrics::observe_shopify_request;

type HmacSha256 = Hmac<Sha256>;

/// Authorization granted by one OAuth exchange.
///
/// Lives only for the duration of a callback invocation; the durable
/// copies are the user row and the sealed session cookie.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub shop: String,
    pub access_token: String,
    pub scope: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub subject_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    scope: Option<String>,
    expires_in: Option<i64>,
    associated_user: Option<AssociatedUser>,
}

#[derive(Debug, Deserialize)]
struct AssociatedUser {
    id: i64,
}

/// Store profile from `shop.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopProfile {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShopEnvelope {
    shop: ShopProfile,
}

/// Staff member from `users/current.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffMember {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub account_owner: bool,
}

impl StaffMember {
    /// First and last name joined, or `None` when Shopify has neither.
    pub fn full_name(&self) -> Option<String> {
        let joined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: StaffMember,
}

#[derive(Debug, Deserialize)]
struct BlogsEnvelope {
    blogs: Value,
}

#[derive(Debug, Deserialize)]
struct ArticlesEnvelope {
    articles: Value,
}

#[derive(Debug, Deserialize)]
struct ArticleEnvelope {
    article: Value,
}

/// Article fields for create and update calls.
///
/// `None` fields are omitted from the request body, so an update only
/// touches what the caller provided.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArticlePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

#[derive(Serialize)]
struct ArticleRequest<'a> {
    article: &'a ArticlePayload,
}

/// Client for the Shopify Admin API.
pub struct ShopifyClient {
    config: Arc<AppConfig>,
    http: Arc<reqwest::Client>,
}

impl ShopifyClient {
    pub fn new(config: Arc<AppConfig>, http: Arc<reqwest::Client>) -> Self {
        Self { config, http }
    }

    /// Consent URL the operator's browser is sent to.
    ///
    /// Always points at the shop itself; the Admin API base override does
    /// not apply to browser-facing URLs.
    ///
    /// # Errors
    /// Returns an error if the shop domain does not form a valid URL.
    pub fn consent_url(&self, shop: &str, state: &str) -> Result<String, AppError> {
        let mut url = url::Url::parse(&format!("https://{shop}/admin/oauth/authorize"))
            .map_err(|_| AppError::Validation("Invalid shop domain".to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.shopify.api_key)
            .append_pair("scope", &self.config.shopify.scopes)
            .append_pair("redirect_uri", &self.config.oauth_callback_url())
            .append_pair("state", state)
            .append_pair("grant_options[]", "per-user");
        Ok(url.into())
    }

    /// Base URL for server-side calls to one shop.
    fn shop_base(&self, shop: &str) -> String {
        match &self.config.shopify.admin_api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{shop}"),
        }
    }

    fn api_url(&self, shop: &str, path: &str) -> String {
        format!(
            "{}/admin/api/{}/{}",
            self.shop_base(shop),
            self.config.shopify.api_version,
            path
        )
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status, or a
    /// response without an access token.
    pub async fn exchange_code(&self, shop: &str, code: &str) -> Result<AuthSession, AppError> {
        let url = format!("{}/admin/oauth/access_token", self.shop_base(shop));
        let body = serde_json::json!({
            "client_id": self.config.shopify.api_key,
            "client_secret": self.config.shopify.api_secret,
            "code": code,
        });

        let response = self
            .send_recorded("exchange_code", self.http.post(&url).json(&body))
            .await?;
        let response = Self::ensure_success(response, "token exchange").await?;
        let token: AccessTokenResponse = response.json().await?;

        let access_token = token
            .access_token
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AppError::ShopifyApi("token exchange response contained no access token".to_string())
            })?;

        Ok(AuthSession {
            shop: shop.to_string(),
            access_token,
            scope: token.scope.unwrap_or_default(),
            expires_at: token
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
            subject_id: token.associated_user.map(|user| user.id),
        })
    }

    /// Fetch the store profile for an authorized shop.
    pub async fn fetch_shop(&self, auth: &AuthSession) -> Result<ShopProfile, AppError> {
        let url = self.api_url(&auth.shop, "shop.json");
        let response = self
            .send_recorded(
                "fetch_shop",
                self.http
                    .get(&url)
                    .header("X-Shopify-Access-Token", &auth.access_token),
            )
            .await?;
        let response = Self::ensure_success(response, "shop profile fetch").await?;
        let envelope: ShopEnvelope = response.json().await?;
        Ok(envelope.shop)
    }

    /// Fetch the staff member the per-user grant belongs to.
    pub async fn fetch_current_user(&self, auth: &AuthSession) -> Result<StaffMember, AppError> {
        let url = self.api_url(&auth.shop, "users/current.json");
        let response = self
            .send_recorded(
                "fetch_current_user",
                self.http
                    .get(&url)
                    .header("X-Shopify-Access-Token", &auth.access_token),
            )
            .await?;
        let response = Self::ensure_success(response, "user profile fetch").await?;
        let envelope: UserEnvelope = response.json().await?;
        Ok(envelope.user)
    }

    /// List the store's blogs.
    pub async fn list_blogs(&self, shop: &str, access_token: &str) -> Result<Value, AppError> {
        let url = self.api_url(shop, "blogs.json");
        let response = self
            .send_recorded(
                "list_blogs",
                self.http
                    .get(&url)
                    .header("X-Shopify-Access-Token", access_token),
            )
            .await?;
        let response = Self::ensure_success(response, "blog listing").await?;
        let envelope: BlogsEnvelope = response.json().await?;
        Ok(envelope.blogs)
    }

    /// List articles in one blog.
    pub async fn list_articles(
        &self,
        shop: &str,
        access_token: &str,
        blog_id: i64,
        limit: u32,
    ) -> Result<Value, AppError> {
        let url = format!(
            "{}?limit={}",
            self.api_url(shop, &format!("blogs/{blog_id}/articles.json")),
            limit
        );
        let response = self
            .send_recorded(
                "list_articles",
                self.http
                    .get(&url)
                    .header("X-Shopify-Access-Token", access_token),
            )
            .await?;
        let response = Self::ensure_success(response, "article listing").await?;
        let envelope: ArticlesEnvelope = response.json().await?;
        Ok(envelope.articles)
    }

    /// Create an article in one blog.
    pub async fn create_article(
        &self,
        shop: &str,
        access_token: &str,
        blog_id: i64,
        article: &ArticlePayload,
    ) -> Result<Value, AppError> {
        let url = self.api_url(shop, &format!("blogs/{blog_id}/articles.json"));
        let response = self
            .send_recorded(
                "create_article",
                self.http
                    .post(&url)
                    .header("X-Shopify-Access-Token", access_token)
                    .json(&ArticleRequest { article }),
            )
            .await?;
        let response = Self::ensure_success(response, "article create").await?;
        let envelope: ArticleEnvelope = response.json().await?;
        Ok(envelope.article)
    }

    /// Fetch one article.
    pub async fn get_article(
        &self,
        shop: &str,
        access_token: &str,
        blog_id: i64,
        article_id: i64,
    ) -> Result<Value, AppError> {
        let url = self.api_url(shop, &format!("blogs/{blog_id}/articles/{article_id}.json"));
        let response = self
            .send_recorded(
                "get_article",
                self.http
                    .get(&url)
                    .header("X-Shopify-Access-Token", access_token),
            )
            .await?;
        let response = Self::ensure_success(response, "article fetch").await?;
        let envelope: ArticleEnvelope = response.json().await?;
        Ok(envelope.article)
    }

    /// Update fields of one article.
    pub async fn update_article(
        &self,
        shop: &str,
        access_token: &str,
        blog_id: i64,
        article_id: i64,
        article: &ArticlePayload,
    ) -> Result<Value, AppError> {
        let url = self.api_url(shop, &format!("blogs/{blog_id}/articles/{article_id}.json"));
        let response = self
            .send_recorded(
                "update_article",
                self.http
                    .put(&url)
                    .header("X-Shopify-Access-Token", access_token)
                    .json(&ArticleRequest { article }),
            )
            .await?;
        let response = Self::ensure_success(response, "article update").await?;
        let envelope: ArticleEnvelope = response.json().await?;
        Ok(envelope.article)
    }

    /// Delete one article.
    pub async fn delete_article(
        &self,
        shop: &str,
        access_token: &str,
        blog_id: i64,
        article_id: i64,
    ) -> Result<(), AppError> {
        let url = self.api_url(shop, &format!("blogs/{blog_id}/articles/{article_id}.json"));
        let response = self
            .send_recorded(
                "delete_article",
                self.http
                    .delete(&url)
                    .header("X-Shopify-Access-Token", access_token),
            )
            .await?;
        Self::ensure_success(response, "article delete").await?;
        Ok(())
    }

    /// Verify a webhook body against its `X-Shopify-Hmac-Sha256` header.
    ///
    /// Comparison goes through the HMAC verifier, which is constant-time.
    pub fn verify_webhook_hmac(&self, payload: &[u8], signature: &str) -> Result<(), AppError> {
        let provided = BASE64_STANDARD
            .decode(signature.trim())
            .map_err(|_| AppError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(self.config.shopify.api_secret.as_bytes())
            .map_err(|_| AppError::Encryption("webhook secret rejected by HMAC".to_string()))?;
        mac.update(payload);
        mac.verify_slice(&provided)
            .map_err(|_| AppError::InvalidSignature)
    }

    async fn send_recorded(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AppError> {
        let started = Instant::now();
        match request.send().await {
            Ok(response) => {
                observe_shopify_request(operation, response.status().as_str(), started.elapsed());
                Ok(response)
            }
            Err(error) => {
                observe_shopify_request(operation, "transport_error", started.elapsed());
                Err(error.into())
            }
        }
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::ShopifyApi(format!(
            "{operation} failed with status {status}: {body}"
        )))
    }
}
