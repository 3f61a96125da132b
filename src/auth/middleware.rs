use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::service::AuthService;
use crate::shared::{AppError, AppState};

/// JWT authentication middleware - validates Authorization Bearer header and adds TokenClaims to request.
/// Usage: .route_layer(middleware::from_fn_with_state(app_state.clone(), auth::jwt_auth))
/// Handlers can then extract Extension(claims): Extension<TokenClaims>.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;

    // Any other scheme counts as no credentials at all
    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Authorization header is not a Bearer token");
        AppError::Unauthorized("Authentication credentials were not provided.".to_string())
    })?;

    let token = token.trim().to_string();
    if token.is_empty() || token.contains(' ') {
        warn!("Malformed Bearer authorization header");
        return Err(AppError::Unauthorized(
            "Authorization header must contain two space-delimited values".to_string(),
        ));
    }

    let service = AuthService::new(state.user_repository.clone(), state.token_config.clone());
    let claims = match service.authenticate(&token).await {
        Ok(claims) => claims,
        Err(e) => {
            warn!("JWT authentication failed: {}", e);
            return Err(e);
        }
    };

    debug!(
        username = %claims.username,
        user_id = claims.user_id,
        "Authentication successful, adding claims to request"
    );

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
