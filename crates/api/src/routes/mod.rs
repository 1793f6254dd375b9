//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! # Products
//! GET    /api/products                - Paged listing (?keyword=&pageNumber=)
//! GET    /api/products/top            - Top rated products
//! GET    /api/products/{id}           - Product detail
//! POST   /api/products                - Create placeholder product (admin)
//! PUT    /api/products/{id}           - Overwrite product (admin)
//! DELETE /api/products/{id}           - Delete product (admin)
//! POST   /api/products/{id}/reviews   - Add review (auth)
//!
//! # Users
//! POST   /api/users                   - Register (rate limited)
//! POST   /api/users/login             - Login (rate limited)
//! GET    /api/users/profile           - Own profile (auth)
//! PUT    /api/users/profile           - Update own profile (auth)
//! GET    /api/users                   - All users (admin)
//! GET    /api/users/{id}              - User detail (admin)
//! PUT    /api/users/{id}              - Update user (admin)
//! DELETE /api/users/{id}              - Delete user (admin)
//!
//! # Orders
//! POST   /api/orders                  - Place order (auth)
//! GET    /api/orders                  - All orders (admin)
//! GET    /api/orders/myorders         - Own orders (auth)
//! GET    /api/orders/{id}             - Order detail (auth)
//! PUT    /api/orders/{id}/pay         - Record payment (auth)
//! PUT    /api/orders/{id}/deliver     - Mark delivered (admin)
//!
//! # Misc
//! POST   /api/upload                  - Image upload (multipart, field `image`)
//! GET    /api/config/paypal           - Payment provider client id
//! ```
//!
//! Anything else answers 404 with `Not Found - <path>`.

pub mod config;
pub mod orders;
pub mod products;
pub mod upload;
pub mod users;

use std::str::FromStr;

use axum::{
    Router,
    extract::FromRequest,
    http::Uri,
    routing::{get, post, put},
};

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// JSON body extractor whose rejection renders as the API error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Parse a path id, mapping malformed input to `err`.
fn parse_id<T: FromStr>(raw: &str, err: impl FnOnce() -> AppError) -> Result<T, AppError> {
    raw.parse().map_err(|_| err())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route("/top", get(products::top))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/{id}/reviews", post(products::add_review))
}

/// Create the user routes router.
pub fn user_routes(config: &ApiConfig) -> Router<AppState> {
    let limiter = auth_rate_limiter(config);

    Router::new()
        .route(
            "/",
            get(users::list).merge(post(users::register).layer(limiter.clone())),
        )
        .route("/login", post(users::login).layer(limiter))
        .route(
            "/profile",
            get(users::profile).put(users::update_profile),
        )
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::delete),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_all).post(orders::create))
        .route("/myorders", get(orders::list_mine))
        .route("/{id}", get(orders::show))
        .route("/{id}/pay", put(orders::pay))
        .route("/{id}/deliver", put(orders::deliver))
}

/// Create all `/api` routes.
pub fn routes(config: &ApiConfig) -> Router<AppState> {
    Router::new()
        .nest("/api/products", product_routes())
        .nest("/api/users", user_routes(config))
        .nest("/api/orders", order_routes())
        .route("/api/upload", post(upload::upload))
        .route("/api/config/paypal", get(config::paypal_client_id))
        .fallback(not_found)
}

/// Fallback for unmatched routes.
async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Not Found - {}", uri.path()))
}
