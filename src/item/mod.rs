// Public API - what other modules can use
pub use handlers::{create_item, delete_item, get_item, list_items, missing_item_id, update_item};
pub use service::ItemService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
