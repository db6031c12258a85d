use axum::http::{self};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use tracing::info;

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| "Invalid Authorization header".to_string())?;
        Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string())
    }
    // 2. Try to get token from cookies
    else {
        let cookie_header = req
            .headers()
            .get(http::header::COOKIE)
            .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
            .to_str()
            .map_err(|_| "Invalid Cookie header".to_string())?;

        for cookie in cookie::Cookie::split_parse(cookie_header) {
            if let Ok(c) = cookie {
                if c.name() == "auth_token" {
                    return Ok(c.value().to_string());
                }
            }
        }
        Err("auth_token cookie not found".to_string())
    }
}

// Validate a JWT token and return the token data
pub fn validate_jwt(
    token: &str,
    secret: &str,
) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Supabase access tokens carry aud=authenticated
    validation.validate_aud = false;
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}

// Verify a bearer token and return the user id it is bound to.
// Shared by the REST auth middleware and the realtime hub's authenticate
// handshake.
pub fn verify_user_token(token: &str) -> Result<String, String> {
    let config = crate::config::get_config();
    let secret = match &config.supabase_jwt_secret {
        Some(secret) => secret,
        None => return Err("No JWT secret configured".to_string()),
    };

    match validate_jwt(token, secret) {
        Ok(token_data) => {
            if let Some(sub) = token_data.claims.get("sub").and_then(|v| v.as_str()) {
                info!("JWT token validated successfully for user: {}", sub);
                Ok(sub.to_string())
            } else {
                Err("Can't extract a user id from the JWT token".to_string())
            }
        }
        Err(e) => Err(format!("JWT validation failed: {}", e)),
    }
}
