//! Shop domain normalization and validation.
//!
//! Operators type their shop in many shapes ("pahadi-store",
//! "HTTPS://Foo.myshopify.com/"). Everything is normalized to the
//! canonical `{store}.myshopify.com` form before validation, and the
//! validated form is the only one that reaches OAuth URLs, API calls,
//! or the database.

const SHOPIFY_DOMAIN_SUFFIX: &str = ".myshopify.com";

/// Normalize operator input to `{store}.myshopify.com`.
///
/// Lowercases, strips an `http://`/`https://` prefix and one trailing
/// slash, and appends the Shopify suffix when missing. Returns an empty
/// string for blank input.
pub fn normalize_shop_domain(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut shop = trimmed.to_ascii_lowercase();
    if let Some(rest) = shop.strip_prefix("https://") {
        shop = rest.to_string();
    } else if let Some(rest) = shop.strip_prefix("http://") {
        shop = rest.to_string();
    }
    if let Some(rest) = shop.strip_suffix('/') {
        shop = rest.to_string();
    }

    if !shop.ends_with(SHOPIFY_DOMAIN_SUFFIX) {
        shop.push_str(SHOPIFY_DOMAIN_SUFFIX);
    }

    shop
}

/// Check whether a normalized domain is a well-formed shop domain.
///
/// The store label must be non-empty, consist of lowercase ASCII
/// alphanumerics and hyphens, start and end alphanumeric, and contain
/// no consecutive hyphens.
pub fn is_valid_shop_domain(domain: &str) -> bool {
    let Some(label) = domain.strip_suffix(SHOPIFY_DOMAIN_SUFFIX) else {
        return false;
    };

    if label.is_empty() || label.contains("--") {
        return false;
    }

    if !label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return false;
    }

    !label.starts_with('-') && !label.ends_with('-')
}
