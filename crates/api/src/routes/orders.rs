//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use bazaar_core::OrderId;
use bazaar_core::order::{NewOrder, Order, PaymentUpdate};

use super::{ApiJson, parse_id};
use crate::db::orders::OrderTransitionError;
use crate::db::{OrderRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::NotFound("Order not found".to_string())
}

/// Malformed ids are reported the same as missing orders.
fn order_id(raw: &str) -> Result<OrderId> {
    parse_id(raw, not_found)
}

fn transition_error(err: OrderTransitionError) -> AppError {
    match err {
        OrderTransitionError::Repository(RepositoryError::NotFound) => not_found(),
        other => other.into(),
    }
}

/// `POST /api/orders` - place an order for the caller.
///
/// Prices are stored as submitted.
///
/// # Errors
///
/// Returns 400 `No order items` for an empty order.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ApiJson(order): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<Order>)> {
    order.validate()?;

    let order = OrderRepository::new(state.pool())
        .create(user.id, &order)
        .await?;

    info!(order_id = %order.id, total = %order.total_price, "Order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/orders/{id}`
///
/// # Errors
///
/// Returns 404 when the id is malformed or the order does not exist.
pub async fn show(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id = order_id(&id)?;
    let order = OrderRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(order))
}

/// `PUT /api/orders/{id}/pay` - record the payment provider's confirmation.
///
/// # Errors
///
/// Returns 404 when the order does not exist and 400 when it is already paid.
#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
pub async fn pay(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payment): ApiJson<PaymentUpdate>,
) -> Result<Json<Order>> {
    let id = order_id(&id)?;
    let order_ref = id.to_string();
    add_breadcrumb(
        "checkout",
        "Payment received",
        Some(&[("order_id", order_ref.as_str()), ("status", payment.status.as_str())]),
    );

    let order = OrderRepository::new(state.pool())
        .mark_paid(id, payment.into())
        .await
        .map_err(transition_error)?;

    info!("Order paid");
    Ok(Json(order))
}

/// `PUT /api/orders/{id}/deliver`
///
/// # Errors
///
/// Returns 404 when the order does not exist and 400 when it was already
/// delivered.
#[instrument(skip_all, fields(admin_id = %admin.id, order_id = %id))]
pub async fn deliver(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id = order_id(&id)?;

    let order = OrderRepository::new(state.pool())
        .mark_delivered(id)
        .await
        .map_err(transition_error)?;

    info!("Order delivered");
    Ok(Json(order))
}

/// `GET /api/orders/myorders`
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list_mine(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// `GET /api/orders`
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list_all(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(orders))
}
