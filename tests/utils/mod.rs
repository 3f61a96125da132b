pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use setup::{AuthedClient, TestApp, TestResponse, TEST_PASSWORD, TEST_USERNAME};
