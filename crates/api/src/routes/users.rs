//! User route handlers: registration, login, profiles, and administration.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use bazaar_core::UserId;
use bazaar_core::message::MessageResponse;
use bazaar_core::user::{
    AdminUserUpdate, LoginRequest, ProfileUpdate, RegisterRequest, UserInfo, UserProfile,
};

use super::{ApiJson, parse_id};
use crate::db::users::UserChanges;
use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn user_id(raw: &str) -> Result<UserId> {
    parse_id(raw, not_found)
}

/// `POST /api/users` - register a new account and sign it in.
///
/// # Errors
///
/// Returns 400 for invalid input or an email that is already registered.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserInfo>)> {
    let info = AuthService::new(state.pool(), state.tokens())
        .register(&request)
        .await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// `POST /api/users/login`
///
/// # Errors
///
/// Returns 401 `Invalid email or password` on any credential mismatch.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<UserInfo>> {
    let info = AuthService::new(state.pool(), state.tokens())
        .login(&request)
        .await?;
    info!(user_id = %info.id, "User logged in");
    Ok(Json(info))
}

/// `GET /api/users/profile`
pub async fn profile(RequireAuth(user): RequireAuth) -> Json<UserProfile> {
    Json(user)
}

/// `PUT /api/users/profile` - update the caller's own name, email or password.
///
/// # Errors
///
/// Returns 400 for invalid input or an email that belongs to another account.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<UserInfo>> {
    let info = AuthService::new(state.pool(), state.tokens())
        .update_profile(user.id, &update)
        .await?;
    info!("Profile updated");
    Ok(Json(info))
}

/// `GET /api/users` - every account.
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>> {
    let users = UserRepository::new(state.pool()).list_all().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// `GET /api/users/{id}`
///
/// # Errors
///
/// Returns 404 when the id is malformed or the user does not exist.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>> {
    let id = user_id(&id)?;
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(user.into()))
}

/// `PUT /api/users/{id}` - change name, email or the admin flag.
///
/// # Errors
///
/// Returns 404 when the user does not exist and 400 for an invalid or
/// already registered email.
#[instrument(skip_all, fields(admin_id = %admin.id, user_id = %id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<AdminUserUpdate>,
) -> Result<Json<UserProfile>> {
    let id = user_id(&id)?;
    let email = update.email().map_err(AuthError::from)?;

    let changes = UserChanges {
        name: update.name(),
        email: email.as_ref(),
        password_hash: None,
        is_admin: update.is_admin,
    };

    let user = UserRepository::new(state.pool())
        .update(id, &changes)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::Auth(AuthError::UserAlreadyExists),
            other => other.into(),
        })?
        .ok_or_else(not_found)?;

    info!("User updated");
    Ok(Json(user.into()))
}

/// `DELETE /api/users/{id}`
///
/// # Errors
///
/// Returns 404 when the user does not exist.
#[instrument(skip_all, fields(admin_id = %admin.id, user_id = %id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = user_id(&id)?;

    if !UserRepository::new(state.pool()).delete(id).await? {
        return Err(not_found());
    }

    info!("User removed");
    Ok(Json(MessageResponse::new("User removed")))
}

