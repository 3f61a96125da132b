use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::types::ItemPayload;

/// Database model for the items table, also the JSON shape returned by the API
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemModel {
    pub id: i64, // Assigned by the store
    pub name: String,
    pub description: String,
    pub quantity: i32,
}

impl ItemModel {
    pub fn from_payload(id: i64, payload: &ItemPayload) -> Self {
        Self {
            id,
            name: payload.name.clone(),
            description: payload.description.clone(),
            quantity: payload.quantity,
        }
    }

    /// Replaces every writable field, keeping the id
    pub fn apply(&mut self, payload: &ItemPayload) {
        self.name = payload.name.clone();
        self.description = payload.description.clone();
        self.quantity = payload.quantity;
    }
}
