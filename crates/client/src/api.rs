//! Typed client for the Bazaar REST API.
//!
//! Every method maps to one route. Routes that need a signed-in user take
//! the bearer token as an `Option<&str>`; with `None` the request is sent
//! without credentials and the server decides.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use bazaar_core::message::{ErrorBody, MessageResponse};
use bazaar_core::order::{NewOrder, Order, PaymentUpdate};
use bazaar_core::product::{
    NewReview, Product, ProductListQuery, ProductPage, ProductUpdate,
};
use bazaar_core::user::{
    AdminUserUpdate, LoginRequest, ProfileUpdate, RegisterRequest, UserInfo, UserProfile,
};
use bazaar_core::{OrderId, ProductId, UserId};

use crate::error::ClientError;

/// Client for the Bazaar API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the API served at `base_url`
    /// (e.g. `http://localhost:5000`).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            inner: Arc::new(ApiClientInner { client, base_url }),
        }
    }

    /// The API origin this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, format!("{}{path}", self.inner.base_url));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_json<B, T>(request: RequestBuilder, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Self::send(request.json(body)).await
    }

    async fn send_text(request: RequestBuilder) -> Result<String, ClientError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.text().await?)
    }

    /// Turn an error status into [`ClientError::Api`].
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await?;
        let message = error_message(status, &body);
        debug!(status = status.as_u16(), %message, "API error");

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// `GET /api/products`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        keyword: Option<&str>,
        page: u32,
    ) -> Result<ProductPage, ClientError> {
        let query = ProductListQuery {
            keyword: keyword.map(String::from),
            page_number: Some(page.to_string()),
        };
        Self::send(self.request(Method::GET, "/api/products", None).query(&query)).await
    }

    /// `GET /api/products/top`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn top_products(&self) -> Result<Vec<Product>, ClientError> {
        Self::send(self.request(Method::GET, "/api/products/top", None)).await
    }

    /// `GET /api/products/{id}`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn product(&self, id: ProductId) -> Result<Product, ClientError> {
        Self::send(self.request(Method::GET, &format!("/api/products/{id}"), None)).await
    }

    /// `POST /api/products` (admin)
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn create_product(&self, token: Option<&str>) -> Result<Product, ClientError> {
        Self::send(self.request(Method::POST, "/api/products", token)).await
    }

    /// `PUT /api/products/{id}` (admin)
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn update_product(
        &self,
        token: Option<&str>,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, ClientError> {
        let request = self.request(Method::PUT, &format!("/api/products/{id}"), token);
        Self::send_json(request, update).await
    }

    /// `DELETE /api/products/{id}` (admin)
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn delete_product(
        &self,
        token: Option<&str>,
        id: ProductId,
    ) -> Result<MessageResponse, ClientError> {
        Self::send(self.request(Method::DELETE, &format!("/api/products/{id}"), token)).await
    }

    /// `POST /api/products/{id}/reviews`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn create_review(
        &self,
        token: Option<&str>,
        id: ProductId,
        review: &NewReview,
    ) -> Result<MessageResponse, ClientError> {
        let request = self.request(Method::POST, &format!("/api/products/{id}/reviews"), token);
        Self::send_json(request, review).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// `POST /api/users/login`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn login(&self, request: &LoginRequest) -> Result<UserInfo, ClientError> {
        Self::send_json(self.request(Method::POST, "/api/users/login", None), request).await
    }

    /// `POST /api/users`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserInfo, ClientError> {
        Self::send_json(self.request(Method::POST, "/api/users", None), request).await
    }

    /// `GET /api/users/profile`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn profile(&self, token: Option<&str>) -> Result<UserProfile, ClientError> {
        Self::send(self.request(Method::GET, "/api/users/profile", token)).await
    }

    /// `PUT /api/users/profile`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn update_profile(
        &self,
        token: Option<&str>,
        update: &ProfileUpdate,
    ) -> Result<UserInfo, ClientError> {
        Self::send_json(self.request(Method::PUT, "/api/users/profile", token), update).await
    }

    /// `GET /api/users` (admin)
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn list_users(&self, token: Option<&str>) -> Result<Vec<UserProfile>, ClientError> {
        Self::send(self.request(Method::GET, "/api/users", token)).await
    }

    /// `GET /api/users/{id}` (admin)
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn user(&self, token: Option<&str>, id: UserId) -> Result<UserProfile, ClientError> {
        Self::send(self.request(Method::GET, &format!("/api/users/{id}"), token)).await
    }

    /// `PUT /api/users/{id}` (admin)
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn update_user(
        &self,
        token: Option<&str>,
        id: UserId,
        update: &AdminUserUpdate,
    ) -> Result<UserProfile, ClientError> {
        let request = self.request(Method::PUT, &format!("/api/users/{id}"), token);
        Self::send_json(request, update).await
    }

    /// `DELETE /api/users/{id}` (admin)
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn delete_user(
        &self,
        token: Option<&str>,
        id: UserId,
    ) -> Result<MessageResponse, ClientError> {
        Self::send(self.request(Method::DELETE, &format!("/api/users/{id}"), token)).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// `POST /api/orders`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn create_order(
        &self,
        token: Option<&str>,
        order: &NewOrder,
    ) -> Result<Order, ClientError> {
        Self::send_json(self.request(Method::POST, "/api/orders", token), order).await
    }

    /// `GET /api/orders/{id}`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn order(&self, token: Option<&str>, id: OrderId) -> Result<Order, ClientError> {
        Self::send(self.request(Method::GET, &format!("/api/orders/{id}"), token)).await
    }

    /// `PUT /api/orders/{id}/pay`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn pay_order(
        &self,
        token: Option<&str>,
        id: OrderId,
        payment: &PaymentUpdate,
    ) -> Result<Order, ClientError> {
        let request = self.request(Method::PUT, &format!("/api/orders/{id}/pay"), token);
        Self::send_json(request, payment).await
    }

    /// `PUT /api/orders/{id}/deliver` (admin)
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn deliver_order(
        &self,
        token: Option<&str>,
        id: OrderId,
    ) -> Result<Order, ClientError> {
        Self::send(self.request(Method::PUT, &format!("/api/orders/{id}/deliver"), token)).await
    }

    /// `GET /api/orders/myorders`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn my_orders(&self, token: Option<&str>) -> Result<Vec<Order>, ClientError> {
        Self::send(self.request(Method::GET, "/api/orders/myorders", token)).await
    }

    /// `GET /api/orders` (admin)
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn list_orders(&self, token: Option<&str>) -> Result<Vec<Order>, ClientError> {
        Self::send(self.request(Method::GET, "/api/orders", token)).await
    }

    // =========================================================================
    // Misc
    // =========================================================================

    /// `POST /api/upload` - returns the stored image path.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        if let Some(mime) = image_mime(file_name) {
            part = part.mime_str(mime)?;
        }
        let form = reqwest::multipart::Form::new().part("image", part);
        Self::send_text(self.request(Method::POST, "/api/upload", None).multipart(form)).await
    }

    /// `GET /api/config/paypal`
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn paypal_client_id(&self) -> Result<String, ClientError> {
        Self::send_text(self.request(Method::GET, "/api/config/paypal", None)).await
    }
}

fn image_mime(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// The message for an error response: the body's `message` field, else the
/// status reason.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body).map_or_else(
        |_| {
            status
                .canonical_reason()
                .map_or_else(|| status.to_string(), String::from)
        },
        |b| b.message,
    )
}
