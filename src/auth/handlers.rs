use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::{info, instrument};

use super::{
    service::AuthService,
    types::{AccessTokenResponse, MessageResponse, TokenPairResponse},
};
use crate::shared::{AppError, AppState};
use crate::validation::json_object;

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.user_repository.clone(), state.token_config.clone())
}

/// HTTP handler for registering a new user account
///
/// POST /auth/register/
#[instrument(name = "register", skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let body = json_object(payload)?;
    let user = auth_service(&state).register(&body).await?;

    info!(username = %user.username, "Registration completed");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully.".to_string(),
        }),
    ))
}

/// HTTP handler for obtaining an access/refresh token pair
///
/// POST /auth/login/
#[instrument(name = "login", skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let body = json_object(payload)?;
    let pair = auth_service(&state).login(&body).await?;
    Ok(Json(pair))
}

/// HTTP handler for exchanging a refresh token for a new access token
///
/// POST /auth/token/refresh/
#[instrument(name = "refresh_token", skip(state, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let body = json_object(payload)?;
    let access = auth_service(&state).refresh(&body).await?;
    Ok(Json(access))
}
