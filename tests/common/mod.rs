//! Common test utilities

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

/// API key with the admin permission, seeded by the setup helpers
pub const ADMIN_KEY: &str = "test_admin_key_123";

/// API key with only the storefront permission, seeded by the setup helpers
pub const STOREFRONT_KEY: &str = "test_storefront_key_123";

/// Setup test database - truncate tables and seed test data
pub async fn setup_test_db() -> PgPool {
    let pool = connect().await;

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    // Clean up DB for fresh state
    sqlx::query(
        "TRUNCATE TABLE menu_items, cart_items, orders, order_items, cart_additions, audit_logs, api_keys CASCADE",
    )
    .execute(&mut *tx)
    .await
    .expect("Failed to clean up DB");

    seed_api_keys(&mut tx).await;

    tx.commit().await.expect("Failed to commit transaction");

    pool
}

/// Connect and make sure the test API keys exist, without wiping state.
/// For tests that only exercise request validation and create no rows.
pub async fn connect_test_db() -> PgPool {
    let pool = connect().await;

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    seed_api_keys(&mut tx).await;
    tx.commit().await.expect("Failed to commit transaction");

    pool
}

async fn connect() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB")
}

async fn seed_api_keys(tx: &mut Transaction<'_, Postgres>) {
    // Hashes are computed in SQL to match what the middleware looks up
    let keys = [
        ("Test Admin Key", ADMIN_KEY, "test_adm", vec!["admin".to_string()]),
        (
            "Test Storefront Key",
            STOREFRONT_KEY,
            "test_sto",
            vec!["storefront".to_string()],
        ),
    ];

    for (name, key, prefix, permissions) in keys {
        sqlx::query(
            r#"
            INSERT INTO api_keys (id, name, key_hash, key_prefix, permissions, is_active)
            VALUES ($1, $2, encode(sha256($3::bytea), 'hex'), $4, $5, true)
            ON CONFLICT (key_prefix) DO NOTHING
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(name)
        .bind(key.as_bytes())
        .bind(prefix)
        .bind(permissions)
        .execute(&mut **tx)
        .await
        .expect("Failed to seed API key");
    }
}
