//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{Order, OrderId, OrderStatus};
use fulfillment::OrderLineRequest;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let items = order
            .lines()
            .iter()
            .map(|line| OrderItemResponse {
                product_id: line.product_id.to_string(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
            })
            .collect();

        Self {
            id: order.id().to_string(),
            status: order.status(),
            items,
            total_cents: order.total().cents(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

// -- Handlers --

/// POST /orders — create an order, reserving stock for every item.
#[tracing::instrument(skip(state, req), fields(items = req.items.len()))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let lines = req
        .items
        .into_iter()
        .map(|item| OrderLineRequest::new(item.product_id, item.quantity))
        .collect();
    let order = state.orders.create_order(lines).await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — list every order, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list_orders().await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id} — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.get_order(&OrderId::new(id)).await?;
    Ok(Json(order.into()))
}

/// PUT /orders/{id}/status — move an order to a new status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: domain::OrderError| ApiError::Unprocessable(e.to_string()))?;

    let order = state
        .orders
        .update_order_status(&OrderId::new(id), status)
        .await?;

    Ok(Json(order.into()))
}
