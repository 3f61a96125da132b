// Library crate for the inventory service
// This file exposes the public API for integration tests

pub mod auth;
pub mod cache;
pub mod config;
pub mod item;
pub mod routes;
pub mod shared;
pub mod user;
pub mod validation;

// Re-export commonly used types for easier access in tests
pub use cache::{CacheStore, InMemoryCacheStore};
pub use config::Config;
pub use item::repository::{InMemoryItemRepository, ItemRepository};
pub use routes::create_router;
pub use shared::{AppError, AppState};
pub use user::repository::{InMemoryUserRepository, UserRepository};
