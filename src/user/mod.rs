// Internal modules
pub mod models;
pub mod password;
pub mod repository;
