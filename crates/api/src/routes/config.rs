//! Client-facing configuration values.

use axum::extract::State;

use crate::state::AppState;

/// `GET /api/config/paypal` - the payment provider client id, empty when
/// unconfigured.
pub async fn paypal_client_id(State(state): State<AppState>) -> String {
    state.config().paypal_client_id.clone().unwrap_or_default()
}
