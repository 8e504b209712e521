//! Menu Item Repository
//!
//! Persistence for the restaurant menu. Categories are stored as text
//! and parsed back into `MenuItemCategory` on read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{MenuItemCategory, Price};

/// Stored menu item
#[derive(Debug, Clone)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: MenuItemCategory,
    pub is_vegan: bool,
    pub created_at: DateTime<Utc>,
}

/// Menu item to be created
#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: MenuItemCategory,
    pub is_vegan: bool,
}

/// Filters for listing the menu
#[derive(Debug, Clone, Default)]
pub struct MenuFilter {
    /// Only these categories; empty means all
    pub categories: Vec<MenuItemCategory>,
    /// Only vegan (or only non-vegan) items when set
    pub is_vegan: Option<bool>,
}

type MenuItemRow = (Uuid, String, String, Decimal, String, bool, DateTime<Utc>);

fn map_menu_item(row: MenuItemRow) -> Result<MenuItem, sqlx::Error> {
    let (id, name, description, price, category, is_vegan, created_at) = row;

    let category = category
        .parse::<MenuItemCategory>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "category".to_string(),
            source: Box::new(e),
        })?;

    Ok(MenuItem {
        id,
        name,
        description,
        price,
        category,
        is_vegan,
        created_at,
    })
}

/// Repository for menu_items
#[derive(Debug, Clone)]
pub struct MenuItemRepository {
    pool: PgPool,
}

impl MenuItemRepository {
    /// Create a new MenuItemRepository with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new menu item and return the stored row.
    pub async fn insert(&self, item: &NewMenuItem) -> Result<MenuItem, sqlx::Error> {
        let id = Uuid::new_v4();

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO menu_items (id, name, description, price, category, is_vegan, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.value())
        .bind(item.category.as_str())
        .bind(item.is_vegan)
        .fetch_one(&self.pool)
        .await?;

        Ok(MenuItem {
            id,
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price.value(),
            category: item.category,
            is_vegan: item.is_vegan,
            created_at,
        })
    }

    /// List menu items, optionally narrowed by category and vegan flag.
    pub async fn list(&self, filter: &MenuFilter) -> Result<Vec<MenuItem>, sqlx::Error> {
        let categories: Option<Vec<String>> = if filter.categories.is_empty() {
            None
        } else {
            Some(
                filter
                    .categories
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect(),
            )
        };

        let rows = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, name, description, price, category, is_vegan, created_at
            FROM menu_items
            WHERE ($1::text[] IS NULL OR category = ANY($1))
              AND ($2::bool IS NULL OR is_vegan = $2)
            ORDER BY category, name
            "#,
        )
        .bind(categories)
        .bind(filter.is_vegan)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_menu_item).collect()
    }

    /// Find a menu item by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItem>, sqlx::Error> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, name, description, price, category, is_vegan, created_at
            FROM menu_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_menu_item).transpose()
    }

    /// Find a menu item by its exact name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<MenuItem>, sqlx::Error> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, name, description, price, category, is_vegan, created_at
            FROM menu_items
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_menu_item).transpose()
    }

    /// Delete a menu item. Returns false when no row matched.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM menu_items WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}
