// Public API - what other modules can use
pub use store::{CacheStore, InMemoryCacheStore};

// Internal modules
mod store;
