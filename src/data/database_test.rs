//! Database tests

use super::*;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn sample_upsert() -> UserUpsert {
    UserUpsert {
        shopify_user_id: 7001,
        email: "owner@pahadi.example".to_string(),
        full_name: Some("Asha Thapa".to_string()),
        shop_domain: "pahadi-store.myshopify.com".to_string(),
        store_name: Some("Pahadi Store".to_string()),
        access_token_ciphertext: "sealed-token-v1".to_string(),
        role: UserRole::StoreOwner,
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_first_upsert_creates_row() {
    let (db, _temp_dir) = create_test_db().await;

    let user = db.upsert_user(&sample_upsert()).await.unwrap();

    assert_eq!(user.shopify_user_id, 7001);
    assert_eq!(user.email, "owner@pahadi.example");
    assert_eq!(user.shop_domain, "pahadi-store.myshopify.com");
    assert_eq!(user.role, UserRole::StoreOwner);
    assert_eq!(db.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_repeat_upsert_updates_in_place() {
    let (db, _temp_dir) = create_test_db().await;

    let first = db.upsert_user(&sample_upsert()).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let mut changed = sample_upsert();
    changed.email = "renamed@pahadi.example".to_string();
    changed.access_token_ciphertext = "sealed-token-v2".to_string();
    let second = db.upsert_user(&changed).await.unwrap();

    // Same logical row: identity and creation time survive the update.
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.email, "renamed@pahadi.example");
    assert_eq!(second.access_token_ciphertext, "sealed-token-v2");
    assert_eq!(db.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_same_staff_id_on_other_shop_is_a_new_row() {
    let (db, _temp_dir) = create_test_db().await;

    db.upsert_user(&sample_upsert()).await.unwrap();

    let mut other_shop = sample_upsert();
    other_shop.shop_domain = "second-store.myshopify.com".to_string();
    db.upsert_user(&other_shop).await.unwrap();

    assert_eq!(db.count_users().await.unwrap(), 2);
}

#[tokio::test]
async fn test_find_user_by_grant() {
    let (db, _temp_dir) = create_test_db().await;

    db.upsert_user(&sample_upsert()).await.unwrap();

    let found = db
        .find_user_by_grant(7001, "pahadi-store.myshopify.com")
        .await
        .unwrap();
    assert!(found.is_some());
    assert_eq!(found.unwrap().full_name.as_deref(), Some("Asha Thapa"));

    let missing = db
        .find_user_by_grant(7001, "other-store.myshopify.com")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_concurrent_upserts_converge_to_one_row() {
    let (db, _temp_dir) = create_test_db().await;
    let db = std::sync::Arc::new(db);

    let mut handles = Vec::new();
    for attempt in 0..8 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            let mut upsert = sample_upsert();
            upsert.access_token_ciphertext = format!("sealed-token-{attempt}");
            db.upsert_user(&upsert).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(db.count_users().await.unwrap(), 1);
}
