use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user id as a UUID string.
    pub sub: String,
    /// Display name resolved by the credential issuer.
    pub name: Option<String>,
    /// Expiration time (unix timestamp).
    pub exp: i64,
}

/// Validate a bearer credential and resolve it to a user identity.
/// HS256 with the shared secret, matching the credential issuer.
pub fn verify_token(secret: &str, token: &str) -> Result<AuthUser, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let id = Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)?;
    let name = data.claims.name.unwrap_or_else(|| id.to_string());
    Ok(AuthUser { id, name })
}

/// Issue a token for the given identity. Used by the test suite and dev tooling;
/// production credentials come from the external identity service.
pub fn sign_token(secret: &str, user_id: Uuid, name: &str, ttl_secs: i64) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        name: Some(name.to_string()),
        exp: Utc::now().timestamp() + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal)
}

/// Middleware that extracts the bearer token and stores the authenticated
/// user in request extensions for the `AuthUser` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let user = verify_token(&state.config.jwt_secret, token)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
