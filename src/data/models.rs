//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// Role a store operator holds within their shop.
///
/// `StoreAdmin` exists in the schema but no flow assigns it today; the
/// grant derivation only distinguishes owner from staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UserRole {
    StoreOwner,
    StoreAdmin,
    StoreStaff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoreOwner => "store_owner",
            Self::StoreAdmin => "store_admin",
            Self::StoreStaff => "store_staff",
        }
    }

    /// Derive the role from the Shopify staff profile.
    pub fn from_account_owner(account_owner: bool) -> Self {
        if account_owner {
            Self::StoreOwner
        } else {
            Self::StoreStaff
        }
    }
}

/// Store operator profile persisted after a successful authorization.
///
/// One row per (Shopify staff member, shop) pair. The access token is
/// stored sealed; the plaintext only lives inside the encrypted session
/// cookie.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub shopify_user_id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub shop_domain: String,
    pub store_name: Option<String>,
    /// AES-256-GCM sealed access token (base64url nonce||ciphertext)
    pub access_token_ciphertext: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// View safe to serialize to clients. Never carries credentials.
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            shopify_user_id: self.shopify_user_id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            shop_domain: self.shop_domain.clone(),
            store_name: self.store_name.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Credential-free user view for API responses and session payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub shopify_user_id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub shop_domain: String,
    pub store_name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields written on every successful authorization.
#[derive(Debug, Clone)]
pub struct UserUpsert {
    pub shopify_user_id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub shop_domain: String,
    pub store_name: Option<String>,
    pub access_token_ciphertext: String,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_derivation_maps_owner_flag() {
        assert_eq!(UserRole::from_account_owner(true), UserRole::StoreOwner);
        assert_eq!(UserRole::from_account_owner(false), UserRole::StoreStaff);
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&UserRole::StoreOwner).unwrap(),
            "\"store_owner\""
        );
        assert_eq!(
            serde_json::from_str::<UserRole>("\"store_staff\"").unwrap(),
            UserRole::StoreStaff
        );
    }

    #[test]
    fn public_view_has_no_credential_field() {
        let user = User {
            id: EntityId::new().0,
            shopify_user_id: 42,
            email: "owner@pahadi.example".to_string(),
            full_name: Some("Asha Thapa".to_string()),
            shop_domain: "pahadi-store.myshopify.com".to_string(),
            store_name: Some("Pahadi Store".to_string()),
            access_token_ciphertext: "sealed".to_string(),
            role: UserRole::StoreOwner,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let serialized = serde_json::to_value(user.to_public()).unwrap();
        assert!(serialized.get("access_token_ciphertext").is_none());
        assert_eq!(serialized["role"], "store_owner");
    }
}
