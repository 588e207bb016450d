//! HTTP handlers for `/api/orders`.
//!
//! One path multiplexes several operations through query parameters:
//! `?orderId=` selects a single order, `?stats=` asks for per-status counts,
//! and `PATCH ?orderId=&action=status` updates a status.

use crate::{
    errors::AppError,
    models::order::{Order, OrderDraft},
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    pub stats: Option<String>,
    pub action: Option<String>,
}

impl OrdersQuery {
    /// `orderId`, treating an empty value as absent.
    fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// `GET /api/orders` - one order, status counts, or the full sorted list.
pub async fn get_orders(
    State(state): State<AppState>,
    Query(q): Query<OrdersQuery>,
) -> Result<Response, AppError> {
    if let Some(order_id) = q.order_id() {
        let order = state
            .orders
            .get_order(order_id)
            .await
            .map_err(|e| AppError::from_store(e, "Failed to load order"))?
            .ok_or_else(|| AppError::not_found("Order not found"))?;
        return Ok(Json(order).into_response());
    }

    if q.stats.as_deref().is_some_and(|s| !s.is_empty()) {
        let counts = state
            .orders
            .count_by_status()
            .await
            .map_err(|e| AppError::from_store(e, "Failed to load order statistics"))?;
        return Ok(Json(counts).into_response());
    }

    let orders = state
        .orders
        .list_orders()
        .await
        .map_err(|e| AppError::from_store(e, "Failed to load orders"))?;
    Ok(Json(orders).into_response())
}

/// `POST /api/orders` - create an order from the submitted draft.
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let Json(draft) = payload.map_err(|rej| AppError::bad_request(rej.body_text()))?;
    let order = state
        .orders
        .create_order(draft)
        .await
        .map_err(|e| AppError::from_store(e, "Failed to save order"))?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `PATCH /api/orders?orderId=X&action=status` with body `{ "status": ... }`.
pub async fn update_order(
    State(state): State<AppState>,
    Query(q): Query<OrdersQuery>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Order>, AppError> {
    let order_id = match (q.order_id(), q.action.as_deref()) {
        (Some(order_id), Some("status")) => order_id,
        _ => return Err(AppError::bad_request("Invalid request")),
    };
    let Json(update) = payload.map_err(|rej| AppError::bad_request(rej.body_text()))?;

    let order = state
        .orders
        .update_status(order_id, &update.status)
        .await
        .map_err(|e| AppError::from_store(e, "Failed to update order"))?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    Ok(Json(order))
}

/// `DELETE /api/orders` - remove every order.
pub async fn delete_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state
        .orders
        .delete_all_orders()
        .await
        .map_err(|e| AppError::from_store(e, "Failed to delete orders"))?;
    Ok(Json(json!({ "message": "All orders deleted" })))
}

/// `GET /api/orders/export` - sorted orders as a downloadable JSON file.
pub async fn export_orders(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state
        .orders
        .export_orders()
        .await
        .map_err(|e| AppError::from_store(e, "Failed to export orders"))?;

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"orders-export.json\""),
    );
    Ok(response)
}

/// `POST /api/orders/import` - replace all orders with a previous export.
pub async fn import_orders(
    State(state): State<AppState>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let imported = state
        .orders
        .import_orders(&body)
        .await
        .map_err(|e| AppError::from_store(e, "Failed to import orders"))?;
    Ok(Json(json!({ "imported": imported })))
}
