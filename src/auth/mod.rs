// Public API - what other modules can use
pub use handlers::{login, refresh_token, register};
pub use middleware::jwt_auth;
pub use service::AuthService;
pub use token::TokenConfig;
pub use types::{TokenClaims, TokenType};

// Internal modules
mod handlers;
mod middleware;
pub mod service;
mod token;
pub mod types;
