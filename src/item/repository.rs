use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

use super::models::ItemModel;
use super::types::ItemPayload;
use crate::shared::AppError;

/// Trait for item repository operations
#[async_trait]
pub trait ItemRepository {
    /// All items ordered by id
    async fn list_items(&self) -> Result<Vec<ItemModel>, AppError>;
    async fn get_item(&self, item_id: i64) -> Result<Option<ItemModel>, AppError>;
    /// Persists a new item, assigning its id
    async fn create_item(&self, payload: &ItemPayload) -> Result<ItemModel, AppError>;
    /// Overwrites all fields of an existing item; `None` when it does not exist
    async fn update_item(
        &self,
        item_id: i64,
        payload: &ItemPayload,
    ) -> Result<Option<ItemModel>, AppError>;
    /// Removes an item; `false` when it does not exist
    async fn delete_item(&self, item_id: i64) -> Result<bool, AppError>;
}

struct ItemTable {
    next_id: i64,
    rows: BTreeMap<i64, ItemModel>,
}

/// In-memory implementation of ItemRepository for development and testing
///
/// Ids start at 1 and are never reused, matching a database sequence.
pub struct InMemoryItemRepository {
    table: Mutex<ItemTable>,
}

impl Default for InMemoryItemRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryItemRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            table: Mutex::new(ItemTable {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    /// Returns the current number of items in the repository
    pub fn item_count(&self) -> usize {
        self.lock().rows.len()
    }

    fn lock(&self) -> MutexGuard<'_, ItemTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    #[instrument(skip(self))]
    async fn list_items(&self) -> Result<Vec<ItemModel>, AppError> {
        let items: Vec<ItemModel> = self.lock().rows.values().cloned().collect();
        debug!(item_count = items.len(), "Items listed from memory");
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn get_item(&self, item_id: i64) -> Result<Option<ItemModel>, AppError> {
        let item = self.lock().rows.get(&item_id).cloned();

        match &item {
            Some(i) => debug!(item_id, name = %i.name, "Item found in memory"),
            None => debug!(item_id, "Item not found in memory"),
        }

        Ok(item)
    }

    #[instrument(skip(self, payload))]
    async fn create_item(&self, payload: &ItemPayload) -> Result<ItemModel, AppError> {
        let mut table = self.lock();
        let item = ItemModel::from_payload(table.next_id, payload);
        table.next_id += 1;
        table.rows.insert(item.id, item.clone());

        debug!(item_id = item.id, name = %item.name, "Item created in memory");
        Ok(item)
    }

    #[instrument(skip(self, payload))]
    async fn update_item(
        &self,
        item_id: i64,
        payload: &ItemPayload,
    ) -> Result<Option<ItemModel>, AppError> {
        let mut table = self.lock();
        let Some(item) = table.rows.get_mut(&item_id) else {
            warn!(item_id, "Item not found for update in memory");
            return Ok(None);
        };

        item.apply(payload);
        debug!(item_id, "Item updated in memory");
        Ok(Some(item.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, item_id: i64) -> Result<bool, AppError> {
        let removed = self.lock().rows.remove(&item_id).is_some();
        if removed {
            debug!(item_id, "Item deleted from memory");
        } else {
            warn!(item_id, "Item not found for deletion in memory");
        }
        Ok(removed)
    }
}

/// PostgreSQL implementation of item repository
pub struct PostgresItemRepository {
    pool: PgPool,
}

impl PostgresItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemRepository for PostgresItemRepository {
    #[instrument(skip(self))]
    async fn list_items(&self) -> Result<Vec<ItemModel>, AppError> {
        let items = sqlx::query_as::<_, ItemModel>(
            "SELECT id, name, description, quantity FROM items ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list items from database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(item_count = items.len(), "Items listed from database");
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn get_item(&self, item_id: i64) -> Result<Option<ItemModel>, AppError> {
        sqlx::query_as::<_, ItemModel>(
            "SELECT id, name, description, quantity FROM items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, item_id, "Failed to fetch item from database");
            AppError::DatabaseError(e.to_string())
        })
    }

    #[instrument(skip(self, payload))]
    async fn create_item(&self, payload: &ItemPayload) -> Result<ItemModel, AppError> {
        let item = sqlx::query_as::<_, ItemModel>(
            "INSERT INTO items (name, description, quantity) VALUES ($1, $2, $3) \
             RETURNING id, name, description, quantity",
        )
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(payload.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create item in database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(item_id = item.id, "Item created in database");
        Ok(item)
    }

    #[instrument(skip(self, payload))]
    async fn update_item(
        &self,
        item_id: i64,
        payload: &ItemPayload,
    ) -> Result<Option<ItemModel>, AppError> {
        let item = sqlx::query_as::<_, ItemModel>(
            "UPDATE items SET name = $2, description = $3, quantity = $4 WHERE id = $1 \
             RETURNING id, name, description, quantity",
        )
        .bind(item_id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(payload.quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, item_id, "Failed to update item in database");
            AppError::DatabaseError(e.to_string())
        })?;

        if item.is_none() {
            warn!(item_id, "Item not found for update");
        }
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, item_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, item_id, "Failed to delete item from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }
}
