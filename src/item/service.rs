use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{models::ItemModel, repository::ItemRepository, types::ItemPayload};
use crate::cache::CacheStore;
use crate::shared::AppError;

pub const ITEMS_LIST_KEY: &str = "items_list";
pub const ITEM_NOT_FOUND: &str = "Item not found!";

pub fn item_cache_key(item_id: i64) -> String {
    format!("item_{}", item_id)
}

/// Service for item business logic: cache-aside reads over the repository
/// and cache invalidation after every successful write.
///
/// Invalidation runs after the store write and before the caller sees the
/// result. The two steps are not atomic: a concurrent read that misses the
/// cache between them can repopulate a stale entry, which then lives until
/// the next write or its expiry.
pub struct ItemService {
    repository: Arc<dyn ItemRepository + Send + Sync>,
    cache: Arc<dyn CacheStore + Send + Sync>,
}

impl ItemService {
    pub fn new(
        repository: Arc<dyn ItemRepository + Send + Sync>,
        cache: Arc<dyn CacheStore + Send + Sync>,
    ) -> Self {
        Self { repository, cache }
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<ItemModel>, AppError> {
        if let Some(items) = self.cached::<Vec<ItemModel>>(ITEMS_LIST_KEY).await? {
            debug!(item_count = items.len(), "Serving item list from cache");
            return Ok(items);
        }

        let items = self.repository.list_items().await?;
        self.populate(ITEMS_LIST_KEY, &items).await?;

        info!(item_count = items.len(), "Item list loaded from store");
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: i64) -> Result<ItemModel, AppError> {
        let key = item_cache_key(item_id);
        if let Some(item) = self.cached::<ItemModel>(&key).await? {
            debug!(item_id, "Serving item from cache");
            return Ok(item);
        }

        let item = self
            .repository
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(ITEM_NOT_FOUND.to_string()))?;
        self.populate(&key, &item).await?;

        Ok(item)
    }

    #[instrument(skip(self, payload))]
    pub async fn create_item(&self, payload: ItemPayload) -> Result<ItemModel, AppError> {
        let item = self.repository.create_item(&payload).await?;
        self.cache.delete(ITEMS_LIST_KEY).await?;

        info!(item_id = item.id, name = %item.name, "Item created");
        Ok(item)
    }

    /// Existence is checked before the payload is considered, so an unknown
    /// id yields not-found even when the body is also invalid.
    #[instrument(skip(self, payload))]
    pub async fn update_item(
        &self,
        item_id: i64,
        payload: impl FnOnce() -> Result<ItemPayload, AppError>,
    ) -> Result<ItemModel, AppError> {
        if self.repository.get_item(item_id).await?.is_none() {
            return Err(AppError::NotFound(ITEM_NOT_FOUND.to_string()));
        }

        let payload = payload()?;
        let item = self
            .repository
            .update_item(item_id, &payload)
            .await?
            .ok_or_else(|| AppError::NotFound(ITEM_NOT_FOUND.to_string()))?;
        self.invalidate(item_id).await?;

        info!(item_id, quantity = item.quantity, "Item updated");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: i64) -> Result<(), AppError> {
        if !self.repository.delete_item(item_id).await? {
            return Err(AppError::NotFound(ITEM_NOT_FOUND.to_string()));
        }
        self.invalidate(item_id).await?;

        info!(item_id, "Item deleted");
        Ok(())
    }

    async fn invalidate(&self, item_id: i64) -> Result<(), AppError> {
        self.cache.delete(&item_cache_key(item_id)).await?;
        self.cache.delete(ITEMS_LIST_KEY).await
    }

    /// Reads and decodes a cached value. An entry that no longer decodes is
    /// treated as a miss.
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let Some(value) = self.cache.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_value(value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let json = serde_json::to_value(value).map_err(|e| {
            warn!(key = %key, error = %e, "Failed to serialize value for cache");
            AppError::Internal
        })?;
        self.cache.set(key, json).await
    }
}
