//! Load Testing Tool
//!
//! Bulk-inserts cart-addition tracking events and reports the sustained
//! insert rate. Run with: cargo run --bin load_test --release -- --events 1000

use std::time::Instant;

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let event_count: u64 = args
        .iter()
        .position(|a| a == "--events")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Load Test - Inserting {} cart additions", event_count);
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    // Every tracking row references a menu item, so make sure one exists.
    let menu_item_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO menu_items (id, name, description, price, category, is_vegan, created_at)
        VALUES ($1, 'Load Test Margherita', 'Synthetic item for load testing', 9.90, 'main_course', true, NOW())
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .fetch_one(&pool)
    .await?;

    let start = Instant::now();
    let mut success_count = 0u64;

    for i in 0..event_count {
        let event_id = Uuid::new_v4();

        // Alternate between signed-in users and anonymous sessions so the
        // data resembles real storefront traffic.
        let (user_id, session_id) = if i % 2 == 0 {
            (Some(Uuid::new_v4().to_string()), None)
        } else {
            (None, Some(format!("load-test-session-{}", i)))
        };

        let result = sqlx::query(
            r#"
            INSERT INTO cart_additions (id, menu_item_id, user_id, session_id, ip_address, added_at)
            VALUES ($1, $2, $3, $4, '127.0.0.1', NOW())
            "#,
        )
        .bind(event_id)
        .bind(menu_item_id)
        .bind(user_id)
        .bind(session_id)
        .execute(&pool)
        .await;

        if result.is_ok() {
            success_count += 1;
        }

        if (i + 1) % 1000 == 0 {
            println!("Inserted {} events...", i + 1);
        }
    }

    let elapsed = start.elapsed();
    let rate = success_count as f64 / elapsed.as_secs_f64();

    println!("\n=== Load Test Results ===");
    println!("Total events: {}", event_count);
    println!("Successful: {}", success_count);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Rate: {:.0} events/sec", rate);

    Ok(())
}
