//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error renders as `{"message": ..., "stack": ...}`. The `stack` field
//! carries the error's debug rendering and is only included when
//! [`expose_error_detail`] has been switched on (outside production).

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use bazaar_core::message::ErrorBody;
use bazaar_core::order::OrderError;
use bazaar_core::product::{ProductUpdateError, ReviewError};

use crate::db::RepositoryError;
use crate::db::orders::OrderTransitionError;
use crate::db::products::AddReviewError;
use crate::services::auth::AuthError;

static EXPOSE_DETAIL: AtomicBool = AtomicBool::new(false);

/// Include diagnostic detail (`stack`) in error bodies.
pub fn expose_error_detail(enabled: bool) {
    EXPOSE_DETAIL.store(enabled, Ordering::Relaxed);
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated or not allowed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists | AuthError::InvalidInput(_) => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::Token(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// The client-facing message. Server errors never expose their cause.
    #[must_use]
    pub fn message(&self) -> String {
        if self.status().is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Database(_) => "Not found".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::UserNotFound => "User not found".to_string(),
                AuthError::UserAlreadyExists => "User already exists".to_string(),
                other => other.to_string(),
            },
            Self::RateLimited => "Too many requests, please try again later".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

/// Build the JSON body for `err`.
#[must_use]
pub fn error_body(err: &AppError, include_detail: bool) -> ErrorBody {
    ErrorBody {
        message: err.message(),
        stack: include_detail.then(|| format!("{err:?}")),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = error_body(&self, EXPOSE_DETAIL.load(Ordering::Relaxed));
        (status, Json(body)).into_response()
    }
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ProductUpdateError> for AppError {
    fn from(err: ProductUpdateError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<AddReviewError> for AppError {
    fn from(err: AddReviewError) -> Self {
        match err {
            AddReviewError::Rejected(e) => e.into(),
            AddReviewError::Repository(e) => e.into(),
        }
    }
}

impl From<OrderTransitionError> for AppError {
    fn from(err: OrderTransitionError) -> Self {
        match err {
            OrderTransitionError::Rejected(e) => e.into(),
            OrderTransitionError::Repository(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order paid", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::user::UserInputError;

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product not found".to_string());
        assert_eq!(err.to_string(), "Not found: Product not found");
        assert_eq!(err.message(), "Product not found");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_auth_error_mapping() {
        let cases = [
            (
                AuthError::InvalidCredentials,
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
            ),
            (
                AuthError::UserAlreadyExists,
                StatusCode::BAD_REQUEST,
                "User already exists",
            ),
            (AuthError::UserNotFound, StatusCode::NOT_FOUND, "User not found"),
            (
                AuthError::InvalidInput(UserInputError::PasswordTooShort),
                StatusCode::BAD_REQUEST,
                "Password must be at least 6 characters",
            ),
            (
                AuthError::PasswordHash,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ),
        ];

        for (err, status, message) in cases {
            let err = AppError::from(err);
            assert_eq!(err.status(), status);
            assert_eq!(err.message(), message);
        }
    }

    #[test]
    fn test_domain_errors_are_bad_requests() {
        let err = AppError::from(ReviewError::AlreadyReviewed);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Product already reviewed");

        let err = AppError::from(OrderError::NoItems);
        assert_eq!(err.message(), "No order items");

        let err = AppError::from(OrderTransitionError::Rejected(OrderError::AlreadyPaid));
        assert_eq!(err.message(), "Order already paid");
    }

    #[test]
    fn test_server_errors_hide_cause() {
        let err = AppError::Internal("connection refused to 10.0.0.5".to_string());
        let body = error_body(&err, false);
        assert_eq!(body.message, "Internal server error");
        assert_eq!(body.stack, None);
    }

    #[test]
    fn test_error_body_detail_toggle() {
        let err = AppError::NotFound("Order not found".to_string());
        assert_eq!(error_body(&err, false).stack, None);

        let body = error_body(&err, true);
        assert_eq!(body.message, "Order not found");
        assert!(body.stack.unwrap().contains("NotFound"));
    }
}
