//! API layer
//!
//! HTTP handlers for:
//! - Blog content (proxied to the shop's Admin API)
//! - Metrics (Prometheus)

mod content;
pub mod metrics;

pub use content::content_router;
pub use metrics::metrics_router;
