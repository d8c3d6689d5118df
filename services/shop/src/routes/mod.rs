//! Shop service routes

pub mod auth;
pub mod orders;

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{AppState, middleware::auth_middleware};

/// Create the router for the shop service
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/orders/all", get(orders::all_orders))
        .route("/orders/change", post(orders::change_order_status))
        .route("/orders/decline", post(orders::decline_order))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/registration", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/activate/:link", get(auth::activate))
        .route(
            "/auth/request-password-reset",
            post(auth::request_password_reset),
        )
        .route(
            "/auth/change-password/:link",
            get(auth::change_password_redirect),
        )
        .route("/auth/set-password/:id", post(auth::set_password))
        .route("/orders", post(orders::create_order))
        .route("/orders/user/:user_id", get(orders::user_orders))
        .merge(admin_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "shop-service"
    }))
}
