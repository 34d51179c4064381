//! Shopify integration
//!
//! Handles:
//! - Shop domain normalization and validation
//! - Admin API calls (OAuth token exchange, profiles, blogs, articles)
//! - Webhook signature verification

mod client;
mod domain;

pub use client::{ArticlePayload, AuthSession, ShopProfile, ShopifyClient, StaffMember};
pub use domain::{is_valid_shop_domain, normalize_shop_domain};
