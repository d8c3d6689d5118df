//! Middleware for access-token validation

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{AppState, error::ApiError};

/// Extract and validate the access token from the Authorization header,
/// making its claims available to handlers through request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let claims = state
        .token_service
        .validate_access_token(token)
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
