//! Menu Service
//!
//! Business rules for managing the menu: unique names, validated
//! prices, and existence checks for reads and deletes.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::error::AppError;

use super::repository::{MenuFilter, MenuItem, MenuItemRepository, NewMenuItem};

/// Service for menu management
#[derive(Debug, Clone)]
pub struct MenuService {
    repo: MenuItemRepository,
}

impl MenuService {
    /// Create a new MenuService with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: MenuItemRepository::new(pool),
        }
    }

    /// Create a menu item.
    ///
    /// # Errors
    /// - `DomainError::DuplicateMenuItem` if the name is already taken
    pub async fn create(&self, item: NewMenuItem) -> Result<MenuItem, AppError> {
        if item.name.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Menu item name must not be empty".to_string(),
            ));
        }

        if self.repo.find_by_name(&item.name).await?.is_some() {
            return Err(DomainError::DuplicateMenuItem(item.name).into());
        }

        // The unique index backstops the pre-check under concurrent creates
        let created = match self.repo.insert(&item).await {
            Ok(created) => created,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(DomainError::DuplicateMenuItem(item.name).into());
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Menu item {} created: {}", created.id, created.name);

        Ok(created)
    }

    /// List menu items matching the filter.
    pub async fn list(&self, filter: &MenuFilter) -> Result<Vec<MenuItem>, AppError> {
        Ok(self.repo.list(filter).await?)
    }

    /// Fetch one menu item.
    ///
    /// # Errors
    /// - `DomainError::MenuItemNotFound` if the item does not exist
    pub async fn get(&self, id: Uuid) -> Result<MenuItem, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::MenuItemNotFound(id.to_string()).into())
    }

    /// Delete a menu item.
    ///
    /// # Errors
    /// - `DomainError::MenuItemNotFound` if the item does not exist
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(id).await? {
            return Err(DomainError::MenuItemNotFound(id.to_string()).into());
        }

        tracing::info!("Menu item {} deleted", id);

        Ok(())
    }
}
