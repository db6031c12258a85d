use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use tracing::warn;
use uuid::Uuid;

use crate::models::{self, api_error, ErrorResponse};
use crate::services::auth_service::{get_auth_token, verify_user_token};

/// Verified identity of the caller, injected into request extensions
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

pub async fn auth_middleware(
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(_) => {
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                models::error::AUTH_TOKEN_MISSING,
                "Authentication token required",
            ));
        }
    };

    // 2. Validate the token and extract the bound user id
    let user_id = match verify_user_token(&token) {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!("Authentication failed: {}", e);
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                models::error::AUTH_TOKEN_INVALID,
                "Invalid authentication token",
            ));
        }
    };

    // 3. The identity provider issues UUID subjects
    let user_uuid = match Uuid::parse_str(&user_id) {
        Ok(uuid) => uuid,
        Err(_) => {
            warn!("JWT subject is not a UUID: {}", user_id);
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                models::error::AUTH_TOKEN_INVALID,
                "Invalid authentication token",
            ));
        }
    };

    // 4. Expose the identity to downstream handlers
    req.extensions_mut().insert(AuthUser { id: user_uuid });

    Ok(next.run(req).await)
}
