use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::{auth, item, shared::AppState};

/// Builds the full HTTP surface.
///
/// Item routes sit behind the bearer-token middleware; the auth routes and
/// the health check are public.
pub fn create_router(app_state: AppState) -> Router {
    let item_routes = Router::new()
        .route(
            "/items/",
            get(item::list_items)
                .post(item::create_item)
                .put(item::missing_item_id)
                .delete(item::missing_item_id),
        )
        .route(
            "/items/:item_id",
            get(item::get_item)
                .put(item::update_item)
                .delete(item::delete_item),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::jwt_auth,
        ));

    let auth_routes = Router::new()
        .route("/auth/register/", post(auth::register))
        .route("/auth/login/", post(auth::login))
        .route("/auth/token/refresh/", post(auth::refresh_token));

    Router::new()
        .route("/health", get(health))
        .merge(item_routes)
        .merge(auth_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
