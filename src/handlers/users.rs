use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{User, UserCreateRequest, UserResponse, UserUpdateRequest, WebResponse};
use crate::security::hash_password;
use crate::state::AppState;

type UserReply = Json<WebResponse<UserResponse>>;

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UserCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, UserReply), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let password = hash_in_background(payload.password).await?;
    let user = state.users.save(User {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        email: payload.email,
        password,
        created_at: chrono::Utc::now().timestamp_millis(),
    });
    info!(user_id = %user.id, "User created");

    let status = StatusCode::CREATED;
    Ok((status, Json(WebResponse::new(status, Some(user.into())))))
}

pub async fn find_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<UserReply, ApiError> {
    let user = state.users.find_by_id(&user_id)?;
    Ok(Json(WebResponse::new(StatusCode::OK, Some(user.into()))))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    payload: Result<Json<UserUpdateRequest>, JsonRejection>,
) -> Result<UserReply, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let mut user = state.users.find_by_id(&user_id)?;
    // blank fields keep what is stored
    if !payload.name.is_empty() {
        user.name = payload.name;
    }
    if !payload.email.is_empty() {
        user.email = payload.email;
    }
    if !payload.password.is_empty() {
        user.password = hash_in_background(payload.password).await?;
    }

    let user = state.users.update(user)?;
    Ok(Json(WebResponse::new(StatusCode::OK, Some(user.into()))))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<WebResponse<()>>, ApiError> {
    state.users.delete(&user_id)?;
    info!(user_id = %user_id, "User deleted");
    Ok(Json(WebResponse::with_status(StatusCode::NO_CONTENT.as_u16(), "DELETED", None)))
}

// argon2 hashing runs on the blocking pool
async fn hash_in_background(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {}", e)))?
}
