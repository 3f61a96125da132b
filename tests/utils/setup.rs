use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use inventory::{
    create_router, AppState, Config, InMemoryCacheStore, InMemoryItemRepository,
    InMemoryUserRepository,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const TEST_USERNAME: &str = "testuser";
pub const TEST_PASSWORD: &str = "testpass";

/// Full application router over in-memory storage, with handles on the
/// storage so tests can inspect it directly.
pub struct TestApp {
    pub router: Router,
    pub items: Arc<InMemoryItemRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub cache: Arc<InMemoryCacheStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let items = Arc::new(InMemoryItemRepository::new());
        let users = Arc::new(InMemoryUserRepository::new());
        let cache = Arc::new(InMemoryCacheStore::new(config.cache_ttl()));

        let app_state = AppState::new(items.clone(), users.clone(), cache.clone(), &config);

        Self {
            router: create_router(app_state),
            items,
            users,
            cache,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse { status, body }
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request("POST", uri, None, Some(body)).await
    }

    /// Registers the default test user
    pub async fn register_test_user(&self) {
        let response = self
            .post(
                "/auth/register/",
                json!({
                    "username": TEST_USERNAME,
                    "password": TEST_PASSWORD,
                    "password2": TEST_PASSWORD,
                    "email": "testuser@example.com"
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    }

    /// Logs in as the default test user and returns the token pair body
    pub async fn login_test_user(&self) -> Value {
        let response = self
            .post(
                "/auth/login/",
                json!({"username": TEST_USERNAME, "password": TEST_PASSWORD}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body
    }

    /// Registers and logs in the default test user, returning an access token
    pub async fn access_token(&self) -> String {
        self.register_test_user().await;
        let tokens = self.login_test_user().await;
        tokens["access"].as_str().unwrap().to_string()
    }
}

/// Shortcut for item requests carrying a bearer token
pub struct AuthedClient<'a> {
    pub app: &'a TestApp,
    pub token: String,
}

impl<'a> AuthedClient<'a> {
    pub async fn login(app: &'a TestApp) -> AuthedClient<'a> {
        let token = app.access_token().await;
        Self { app, token }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.app.request("GET", uri, Some(&self.token), None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.app.request("POST", uri, Some(&self.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.app.request("PUT", uri, Some(&self.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.app.request("DELETE", uri, Some(&self.token), None).await
    }

    /// Creates an item and returns its id
    pub async fn create_item(&self, name: &str, description: &str, quantity: i32) -> i64 {
        let response = self
            .post(
                "/items/",
                json!({"name": name, "description": description, "quantity": quantity}),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_i64().unwrap()
    }
}
