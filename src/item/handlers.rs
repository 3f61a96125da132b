use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::Value;
use tracing::{info, instrument};

use super::{
    models::ItemModel,
    service::{ItemService, ITEM_NOT_FOUND},
    types::{ItemDeletedResponse, ItemPayload},
};
use crate::auth::TokenClaims;
use crate::shared::{AppError, AppState};
use crate::validation::json_object;

pub const MISSING_ITEM_ID: &str = "Please provide the item_id in the URL!";

fn item_service(state: &AppState) -> ItemService {
    ItemService::new(state.item_repository.clone(), state.cache.clone())
}

/// Ids that are not integers cannot name an item
fn parse_item_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(ITEM_NOT_FOUND.to_string()))
}

/// GET /items/
#[instrument(name = "list_items", skip(state))]
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<ItemModel>>, AppError> {
    let items = item_service(&state).list_items().await?;
    Ok(Json(items))
}

/// GET /items/{item_id}
#[instrument(name = "get_item", skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<ItemModel>, AppError> {
    let item_id = parse_item_id(&item_id)?;
    let item = item_service(&state).get_item(item_id).await?;
    Ok(Json(item))
}

/// POST /items/
/// Returns 201 with the stored item
#[instrument(name = "create_item", skip(state, claims, payload))]
pub async fn create_item(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemModel>), AppError> {
    let body = json_object(payload)?;
    let payload = ItemPayload::from_body(&body)?;

    let item = item_service(&state).create_item(payload).await?;
    info!(item_id = item.id, username = %claims.username, "Item created via API");

    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /items/{item_id}
/// Full replacement of name, description and quantity
#[instrument(name = "update_item", skip(state, claims, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(item_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ItemModel>, AppError> {
    let item_id = parse_item_id(&item_id)?;

    let item = item_service(&state)
        .update_item(item_id, || {
            let body = json_object(payload)?;
            ItemPayload::from_body(&body)
        })
        .await?;
    info!(item_id, username = %claims.username, "Item updated via API");

    Ok(Json(item))
}

/// DELETE /items/{item_id}
/// HTTP servers drop the body of a 204, so most clients only see the status
#[instrument(name = "delete_item", skip(state, claims))]
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(item_id): Path<String>,
) -> Result<(StatusCode, Json<ItemDeletedResponse>), AppError> {
    let item_id = parse_item_id(&item_id)?;
    item_service(&state).delete_item(item_id).await?;
    info!(item_id, username = %claims.username, "Item deleted via API");

    Ok((
        StatusCode::NO_CONTENT,
        Json(ItemDeletedResponse {
            message: "Item deleted!",
        }),
    ))
}

/// PUT or DELETE on the collection path: the item id is missing
#[instrument(name = "missing_item_id")]
pub async fn missing_item_id() -> AppError {
    AppError::BadRequest(MISSING_ITEM_ID.to_string())
}
