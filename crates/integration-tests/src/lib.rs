//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! # Prepare a database and load the sample catalog
//! cargo run -p bazaar-cli -- migrate
//! cargo run -p bazaar-cli -- seed import
//!
//! # Start the API with room for the suite's logins and registrations
//! BAZAAR_AUTH_RATE_BURST=1000 cargo run -p bazaar-api
//!
//! # Run integration tests
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! The tests talk to the server at `BAZAAR_API_URL` (default
//! `http://localhost:5000`) and sign in as the seeded admin
//! (`admin@example.com` / `123456`). Every test registers its own users with
//! unique emails, so tests can run in parallel and repeatedly. Login and
//! registration are rate limited per client IP and every test connects from
//! the same address, so the default burst of 5 is far too small for a full
//! run.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use bazaar_client::ApiClient;
use bazaar_core::user::{LoginRequest, RegisterRequest, UserInfo};
use uuid::Uuid;

pub const SEED_ADMIN_EMAIL: &str = "admin@example.com";
pub const SEED_PASSWORD: &str = "123456";

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("BAZAAR_API_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// A fresh client without a session.
#[must_use]
pub fn api() -> ApiClient {
    ApiClient::new(base_url())
}

/// An email no other test run has used.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// Register a fresh non-admin user.
pub async fn register_user(api: &ApiClient, prefix: &str) -> UserInfo {
    api.register(&RegisterRequest {
        name: format!("Test {prefix}"),
        email: unique_email(prefix),
        password: SEED_PASSWORD.to_string(),
    })
    .await
    .unwrap()
}

/// Sign in as the seeded admin.
pub async fn login_admin(api: &ApiClient) -> UserInfo {
    api.login(&LoginRequest {
        email: SEED_ADMIN_EMAIL.to_string(),
        password: SEED_PASSWORD.to_string(),
    })
    .await
    .unwrap()
}
