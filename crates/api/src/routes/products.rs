//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use tracing::{info, instrument};

use bazaar_core::message::MessageResponse;
use bazaar_core::product::{
    NewProduct, NewReview, Product, ProductListQuery, ProductPage, ProductUpdate, ReviewAuthor,
    TOP_PRODUCTS,
};
use bazaar_core::{ProductId, page_count};

use super::{ApiJson, parse_id};
use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::state::AppState;

fn product_id(raw: &str) -> Result<ProductId> {
    parse_id(raw, || AppError::BadRequest("Invalid product id".to_string()))
}

fn not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

/// `GET /api/products` - one page of products, optionally filtered by name.
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list(
    State(state): State<AppState>,
    query: std::result::Result<Query<ProductListQuery>, QueryRejection>,
) -> Result<Json<ProductPage>> {
    let Query(query) = query?;
    let page = query.page();

    let (products, total) = ProductRepository::new(state.pool())
        .list(query.keyword(), page)
        .await?;

    Ok(Json(ProductPage {
        products,
        page: page.page(),
        pages: page_count(total),
    }))
}

/// `GET /api/products/top` - highest rated products.
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn top(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .top_rated(TOP_PRODUCTS)
        .await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}`
///
/// # Errors
///
/// Returns 400 for a malformed id and 404 when the product does not exist.
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id = product_id(&id)?;
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(product))
}

/// `POST /api/products` - create a placeholder product owned by the admin.
///
/// # Errors
///
/// Returns `AppError::Database` if the insert fails.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = ProductRepository::new(state.pool())
        .create(admin.id, &NewProduct::placeholder())
        .await?;

    info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/{id}` - overwrite the editable fields.
///
/// # Errors
///
/// Returns 400 for a malformed id or invalid body and 404 when the product
/// does not exist.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> Result<Json<Product>> {
    let id = product_id(&id)?;
    update.validate()?;

    let product = ProductRepository::new(state.pool())
        .update(id, &update)
        .await?
        .ok_or_else(not_found)?;

    info!("Product updated");
    Ok(Json(product))
}

/// `DELETE /api/products/{id}`
///
/// # Errors
///
/// Returns 400 for a malformed id and 404 when the product does not exist.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = product_id(&id)?;

    if !ProductRepository::new(state.pool()).delete(id).await? {
        return Err(not_found());
    }

    info!("Product removed");
    Ok(Json(MessageResponse::new("Product removed")))
}

/// `POST /api/products/{id}/reviews`
///
/// # Errors
///
/// Returns 404 when the product does not exist and 400 when the review is
/// invalid or the user already reviewed the product.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %id))]
pub async fn add_review(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(review): ApiJson<NewReview>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let id = product_id(&id)?;
    let author = ReviewAuthor {
        id: user.id,
        name: &user.name,
    };

    ProductRepository::new(state.pool())
        .add_review(id, author, review)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Database(RepositoryError::NotFound) => not_found(),
            other => other,
        })?;

    info!("Review added");
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Review added"))))
}
