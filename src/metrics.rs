//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // OAuth flow metrics
    pub static ref OAUTH_STATE_TOKENS_ISSUED: IntCounter = IntCounter::new(
        "blogen_oauth_state_tokens_issued_total",
        "Total number of anti-forgery state tokens issued"
    ).expect("metric can be created");
    pub static ref OAUTH_AUTHORIZATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("blogen_oauth_authorizations_total", "Total number of OAuth callback completions"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref SESSIONS_ESTABLISHED_TOTAL: IntCounter = IntCounter::new(
        "blogen_sessions_established_total",
        "Total number of sessions established after authorization"
    ).expect("metric can be created");

    // Shopify Admin API metrics
    pub static ref SHOPIFY_API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("blogen_shopify_api_requests_total", "Total number of Shopify Admin API requests"),
        &["operation", "status"]
    ).expect("metric can be created");
    pub static ref SHOPIFY_API_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "blogen_shopify_api_request_duration_seconds",
            "Shopify Admin API request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("blogen_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(OAUTH_STATE_TOKENS_ISSUED.clone()))
        .expect("OAUTH_STATE_TOKENS_ISSUED can be registered");
    REGISTRY
        .register(Box::new(OAUTH_AUTHORIZATIONS_TOTAL.clone()))
        .expect("OAUTH_AUTHORIZATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_ESTABLISHED_TOTAL.clone()))
        .expect("SESSIONS_ESTABLISHED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SHOPIFY_API_REQUESTS_TOTAL.clone()))
        .expect("SHOPIFY_API_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SHOPIFY_API_REQUEST_DURATION_SECONDS.clone()))
        .expect("SHOPIFY_API_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Record one Shopify Admin API request outcome with its duration.
pub fn observe_shopify_request(operation: &str, status: &str, elapsed: std::time::Duration) {
    SHOPIFY_API_REQUESTS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
    SHOPIFY_API_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(elapsed.as_secs_f64());
}
