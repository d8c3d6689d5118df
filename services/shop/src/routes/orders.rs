//! Order lifecycle routes

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{NewOrder, OrderLineItem, OrderStatus},
    password,
};

/// Request for order creation
#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub password: String,
    /// Serialized line-item payload, stored opaquely with the order
    pub order_info: String,
}

/// Request for an order status change
#[derive(Deserialize)]
pub struct ChangeOrderRequest {
    pub order_id: Uuid,
    pub order_status: OrderStatus,
    pub seen: bool,
    /// Line items to decrement inventory for when the order moves into
    /// assembly
    pub order_json: Option<Vec<OrderLineItem>>,
}

/// Request for declining an order
#[derive(Deserialize)]
pub struct DeclineOrderRequest {
    pub order_id: Uuid,
}

/// Create a new order.
///
/// The caller's password is re-verified even though they hold a session: a
/// stolen cookie alone must not be enough to place orders.
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !password::verify(&payload.password, &user.password_hash) {
        return Err(ApiError::ValidatingError);
    }

    let order_info: serde_json::Value = serde_json::from_str(&payload.order_info)
        .map_err(|_| ApiError::Validation("order_info is not valid JSON".to_string()))?;

    let order = state
        .order_repository
        .create(&NewOrder {
            order_id: Uuid::new_v4(),
            user_id: user.id,
            order_info,
            order_name: Uuid::new_v4().to_string(),
            order_status: OrderStatus::InProcess,
        })
        .await?;

    info!("Order {} created for user {}", order.order_id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Заказ сформирован", "order_id": order.order_id })),
    ))
}

/// Change an order's status and seen flag.
///
/// Moving into assembly decrements inventory for every line item and
/// schedules the delayed auto-advance to ready; any terminal status write
/// cancels a pending auto-advance instead.
pub async fn change_order_status(
    State(state): State<AppState>,
    Json(payload): Json<ChangeOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let order_id = payload.order_id;

    state
        .order_repository
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if payload.order_status.is_terminal() {
        state.scheduler.cancel(order_id).await;
    }

    state
        .order_repository
        .update_status(order_id, payload.order_status, payload.seen)
        .await?;

    if payload.order_status == OrderStatus::Assembling {
        if let Some(items) = &payload.order_json {
            state.inventory_repository.apply_line_items(items).await?;
        }

        let orders = state.order_repository.clone();
        state
            .scheduler
            .schedule(order_id, state.config.order_ready_delay, move || async move {
                advance_to_ready(&orders, order_id).await;
            })
            .await;
    }

    Ok(Json(json!({ "message": "Статус заказа изменен" })))
}

/// Delayed auto-advance: re-read the order and set it ready unless it was
/// cancelled in the meantime. No inventory is touched here.
async fn advance_to_ready(orders: &crate::repositories::OrderRepository, order_id: Uuid) {
    match orders.find_by_id(order_id).await {
        Ok(Some(order)) if !order.order_status.is_cancelled() => {
            if let Err(e) = orders.set_status(order_id, OrderStatus::Ready).await {
                error!("Failed to auto-advance order {}: {}", order_id, e);
            }
        }
        Ok(Some(order)) => {
            info!(
                "Skipping auto-advance for order {}: status is {}",
                order_id, order.order_status
            );
        }
        Ok(None) => {
            warn!("Order {} disappeared before auto-advance", order_id);
        }
        Err(e) => {
            error!("Failed to re-read order {} for auto-advance: {}", order_id, e);
        }
    }
}

/// Cancel an order. Inventory already decremented for it is not restored.
pub async fn decline_order(
    State(state): State<AppState>,
    Json(payload): Json<DeclineOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let order_id = payload.order_id;

    state
        .order_repository
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    // Cancel the pending auto-advance before the status write so the timer
    // cannot fire in between.
    state.scheduler.cancel(order_id).await;

    state
        .order_repository
        .set_status(order_id, OrderStatus::Cancelled)
        .await?;

    Ok(Json(json!({ "message": "Отмена успешна" })))
}

/// List a user's orders
pub async fn user_orders(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let orders = state.order_repository.list_by_user(user_id).await?;
    Ok(Json(orders))
}

/// List every order with its owner, for the admin dashboard
pub async fn all_orders(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let orders = state.order_repository.list_all().await?;
    Ok(Json(orders))
}
