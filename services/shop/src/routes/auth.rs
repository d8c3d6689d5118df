//! Registration and authentication routes

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::NewUser,
    password,
    token::TokenPair,
    validation,
};

/// Name of the refresh token session cookie
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Request for a password-reset email
#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Request for setting a new password
#[derive(Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

// Emailed links must point at this API, where the handling routes are
// mounted; CLIENT_URL only serves post-activation redirects.
fn activation_url(api_url: &str, link: &str) -> String {
    format!("{api_url}/auth/activate/{link}")
}

fn change_password_url(api_url: &str, link: &str) -> String {
    format!("{api_url}/auth/change-password/{link}")
}

fn refresh_cookie(token: &str, max_age_secs: u64) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(max_age_secs as i64))
        .build()
}

fn issue_tokens(state: &AppState, user: &crate::models::User) -> ApiResult<TokenPair> {
    state.token_service.generate_tokens(user).map_err(|e| {
        error!("Failed to generate tokens: {}", e);
        ApiError::Internal
    })
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    info!("Registration attempt for login: {}", payload.login);

    validation::validate_login(&payload.login).map_err(ApiError::Validation)?;
    validation::validate_email(&payload.email).map_err(ApiError::Validation)?;
    validation::validate_password(&payload.password).map_err(ApiError::Validation)?;

    // Case-insensitive pre-check for a friendly error; the unique indexes
    // on LOWER(login)/LOWER(email) catch the race two concurrent
    // registrations would otherwise slip through.
    if state
        .user_repository
        .exists_with_login_or_email(&payload.login, &payload.email)
        .await?
    {
        return Err(ApiError::DuplicateUser);
    }

    let password_hash = password::hash(&payload.password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::Internal
    })?;

    let activation_link = Uuid::new_v4().to_string();
    let user = state
        .user_repository
        .create(&payload, &password_hash, &activation_link)
        .await?;

    // Fire-and-forget: delivery failures are logged by the mailer only.
    let mailer = state.mailer.clone();
    let email = user.email.clone();
    let link = activation_url(&state.config.api_url, &activation_link);
    tokio::spawn(async move {
        mailer.send_activation_mail(&email, &link).await;
    });

    let tokens = issue_tokens(&state, &user)?;
    state
        .token_repository
        .save(user.id, &tokens.refresh_token)
        .await?;

    let jar = jar.add(refresh_cookie(
        &tokens.refresh_token,
        state.token_service.refresh_token_expiry(),
    ));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({
            "message": "Новый пользователь успешно зарегистрирован",
            "access_token": tokens.access_token,
            "user": user,
        })),
    ))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Login attempt for login: {}", payload.login);

    let user = state
        .user_repository
        .find_by_login(&payload.login)
        .await?
        .ok_or_else(|| ApiError::NotFound("User with this login was not found".to_string()))?;

    if !password::verify(&payload.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let tokens = issue_tokens(&state, &user)?;
    state
        .token_repository
        .save(user.id, &tokens.refresh_token)
        .await?;

    let jar = jar.add(refresh_cookie(
        &tokens.refresh_token,
        state.token_service.refresh_token_expiry(),
    ));

    Ok((
        jar,
        Json(json!({
            "message": "Авторизация прошла успешно",
            "access_token": tokens.access_token,
            "user": user,
        })),
    ))
}

/// Refresh the session token pair from the refresh cookie
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let refresh_token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ApiError::Unauthorized)?;

    // Both the signature/expiry check and the persisted-store check must
    // pass; a token that was logged out elsewhere is no longer accepted.
    let claims = state
        .token_service
        .validate_refresh_token(&refresh_token)
        .ok_or(ApiError::Unauthorized)?;

    if state.token_repository.find(&refresh_token).await?.is_none() {
        return Err(ApiError::Unauthorized);
    }

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let tokens = issue_tokens(&state, &user)?;
    state
        .token_repository
        .save(user.id, &tokens.refresh_token)
        .await?;

    let jar = jar.add(refresh_cookie(
        &tokens.refresh_token,
        state.token_service.refresh_token_expiry(),
    ));

    Ok((
        jar,
        Json(json!({
            "access_token": tokens.access_token,
            "refresh_token": tokens.refresh_token,
            "user": user,
        })),
    ))
}

/// Logout endpoint. Idempotent: an absent or unknown cookie is not an error.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        state.token_repository.remove(cookie.value()).await?;
    }

    let jar = jar.remove(Cookie::build((REFRESH_COOKIE, "")).path("/").build());

    Ok((jar, Json(json!({ "message": "Логаут успешен" }))))
}

/// Consume an activation link: mark the account activated and send the
/// browser on to the storefront.
pub async fn activate(
    State(state): State<AppState>,
    Path(link): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_activation_link(&link)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid activation link".to_string()))?;

    state.user_repository.set_activated(user.id).await?;
    info!("Activated account for user {}", user.id);

    Ok(Redirect::to(&state.config.client_url))
}

/// Email a password-reset link to an existing user
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User with this email was not found".to_string()))?;

    let link = state
        .user_repository
        .latest_activation_link(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No activation link exists for this user".to_string()))?;

    let mailer = state.mailer.clone();
    let email = user.email.clone();
    let url = change_password_url(&state.config.api_url, &link);
    tokio::spawn(async move {
        mailer.send_change_password_mail(&email, &url).await;
    });

    Ok(Json(json!({ "message": "Письмо для смены пароля отправлено" })))
}

/// Resolve a change-password link and redirect to the storefront's
/// change-password page for the owning user.
pub async fn change_password_redirect(
    State(state): State<AppState>,
    Path(link): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_activation_link(&link)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid activation link".to_string()))?;

    Ok(Redirect::to(&format!(
        "{}/change-password/{}",
        state.config.client_url, user.id
    )))
}

/// Store a new password for a user
pub async fn set_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_password(&payload.password).map_err(ApiError::Validation)?;

    let user = state
        .user_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let password_hash = password::hash(&payload.password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::Internal
    })?;

    state
        .user_repository
        .update_password(user.id, &password_hash)
        .await?;

    Ok(Json(json!({ "message": "Пароль успешно изменен" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emailed_links_target_served_routes() {
        // These paths must stay in lockstep with the router in routes/mod.rs.
        assert_eq!(
            activation_url("http://localhost:5000", "abc"),
            "http://localhost:5000/auth/activate/abc"
        );
        assert_eq!(
            change_password_url("http://localhost:5000", "abc"),
            "http://localhost:5000/auth/change-password/abc"
        );
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie("token-value", 2_592_000);

        assert_eq!(cookie.name(), REFRESH_COOKIE);
        assert_eq!(cookie.value(), "token-value");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::seconds(2_592_000))
        );
    }
}
