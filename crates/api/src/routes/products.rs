//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{Money, NewProduct, Product, ProductId, ProductPatch};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub stock_quantity: u32,
}

#[derive(Deserialize, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
}

#[derive(Deserialize)]
pub struct RestockRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub price_cents: i64,
    pub stock_quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id().to_string(),
            name: product.name().to_string(),
            category: product.category().to_string(),
            description: product.description().to_string(),
            price_cents: product.price().cents(),
            stock_quantity: product.stock_quantity(),
            created_at: product.created_at(),
            updated_at: product.updated_at(),
        }
    }
}

// -- Handlers --

/// POST /products — create a new product.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let attrs = NewProduct::new(
        req.name,
        req.category,
        req.description,
        Money::from_cents(req.price_cents),
        req.stock_quantity,
    );
    let product = state.products.create_product(attrs).await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products — list every product.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.products.list_products().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /products/{id} — load a product by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.products.get_product(&ProductId::new(id)).await?;
    Ok(Json(product.into()))
}

/// PUT /products/{id} — update a product's descriptive attributes.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let patch = ProductPatch {
        name: req.name,
        category: req.category,
        description: req.description,
        price: req.price_cents.map(Money::from_cents),
    };
    let product = state
        .products
        .update_product(&ProductId::new(id), patch)
        .await?;

    Ok(Json(product.into()))
}

/// DELETE /products/{id} — remove a product.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.products.delete_product(&ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /products/{id}/restock — add stock to a product.
#[tracing::instrument(skip(state, req))]
pub async fn restock<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .products
        .restock_product(&ProductId::new(id), req.quantity)
        .await?;

    Ok(Json(product.into()))
}
