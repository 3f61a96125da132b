use serde::Serialize;
use serde_json::{Map, Value};

use crate::shared::AppError;
use crate::validation::{integer_field, string_field, FieldErrors, StringRules};

pub const NAME_MAX_LENGTH: usize = 255;

/// Validated fields for creating or fully replacing an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPayload {
    pub name: String,
    pub description: String,
    pub quantity: i32,
}

impl ItemPayload {
    /// Validates a raw request body, collecting an error for every bad field.
    /// Unknown fields (including `id`) are ignored.
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, AppError> {
        let mut errors = FieldErrors::new();

        let name = string_field(
            body,
            "name",
            StringRules::required(Some(NAME_MAX_LENGTH)),
            &mut errors,
        );
        let description = string_field(
            body,
            "description",
            StringRules::required(None).allow_blank(),
            &mut errors,
        );
        let quantity = integer_field(body, "quantity", &mut errors);

        match (name, description, quantity) {
            (Some(name), Some(description), Some(quantity)) if errors.is_empty() => Ok(Self {
                name,
                description,
                quantity,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// Logical payload of a successful delete
#[derive(Debug, Serialize)]
pub struct ItemDeletedResponse {
    pub message: &'static str,
}
