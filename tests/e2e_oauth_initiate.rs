//! E2E tests for starting the Shopify authorization flow

mod common;

use common::TestServer;
use serde_json::{Value, json};

fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

fn location_header(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

fn query_param(location: &str, name: &str) -> Option<String> {
    let parsed = url::Url::parse(location).expect("location parses as URL");
    parsed
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.to_string())
}

#[tokio::test]
async fn test_get_redirects_to_consent_page() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/api/auth/shopify?shop=pahadi-store"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = location_header(&response);
    assert!(
        location.starts_with("https://pahadi-store.myshopify.com/admin/oauth/authorize?"),
        "unexpected consent URL: {location}"
    );
    assert!(location.contains("client_id=test-api-key"));
    assert!(location.contains("scope=read_content%2Cwrite_content"));
    assert!(
        location.contains("redirect_uri=http%3A%2F%2F127.0.0.1%2Fapi%2Fauth%2Fshopify%2Fcallback")
    );
    assert!(location.contains("grant_options%5B%5D=per-user"));
}

#[tokio::test]
async fn test_get_state_cookie_matches_consent_url() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/api/auth/shopify?shop=pahadi-store"))
        .send()
        .await
        .expect("request succeeds");

    let location = location_header(&response);
    let state_in_url = query_param(&location, "state").expect("state parameter");
    let state_in_cookie =
        common::cookie_value(&response, "oauth_state").expect("oauth_state cookie");
    assert_eq!(state_in_url, state_in_cookie);
    assert!(!state_in_cookie.is_empty());

    let set_cookie =
        common::set_cookie_header(&response, "oauth_state").expect("set-cookie header");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=600"));
}

#[tokio::test]
async fn test_each_authorization_gets_a_fresh_state() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let mut states = Vec::new();
    for _ in 0..2 {
        let response = client
            .get(server.url("/api/auth/shopify?shop=pahadi-store"))
            .send()
            .await
            .expect("request succeeds");
        states.push(common::cookie_value(&response, "oauth_state").expect("oauth_state cookie"));
    }

    assert_ne!(states[0], states[1]);
}

#[tokio::test]
async fn test_post_returns_consent_url_as_json() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/auth/shopify"))
        .json(&json!({ "shop": "pahadi-store" }))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let state_in_cookie =
        common::cookie_value(&response, "oauth_state").expect("oauth_state cookie");

    let body: Value = response.json().await.unwrap();
    let auth_url = body["authUrl"].as_str().expect("authUrl field");
    assert!(auth_url.starts_with("https://pahadi-store.myshopify.com/admin/oauth/authorize?"));
    assert_eq!(body["state"].as_str(), Some(state_in_cookie.as_str()));
}

#[tokio::test]
async fn test_shop_domain_is_normalized() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/api/auth/shopify?shop=HTTPS%3A%2F%2FPahadi-Store.myshopify.com%2F"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = location_header(&response);
    assert!(
        location.starts_with("https://pahadi-store.myshopify.com/admin/oauth/authorize?"),
        "normalization failed: {location}"
    );
}

#[tokio::test]
async fn test_missing_shop_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/auth/shopify"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Shop parameter is required");

    let response = server
        .client
        .post(server.url("/api/auth/shopify"))
        .json(&json!({}))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Shop parameter is required");
}

#[tokio::test]
async fn test_invalid_shop_domains_are_rejected() {
    let server = TestServer::new().await;

    for shop in ["-foo", "foo-", "fo--o", "foo.myshopify.com.evil.com"] {
        let response = server
            .client
            .get(server.url(&format!("/api/auth/shopify?shop={shop}")))
            .send()
            .await
            .expect("request succeeds");

        assert_eq!(response.status(), 400, "shop {shop:?} should be rejected");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid shop domain");
    }
}
