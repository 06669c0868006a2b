//! REST handlers for the user resource.
//!
//! Each handler validates its input first and only then goes through the
//! [`UserStore`](crate::store::UserStore) seam, so a request that fails
//! validation never produces a store command. Store failures are logged
//! here and surface to the client as a generic 500.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;
use uuid::Uuid;

use crate::domain::{CreateUser, UpdateUser};
use crate::store::StoreError;

use super::AppState;

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Response {
    match state.store.list().await {
        Ok(users) => Json(users).into_response(),
        Err(err) => internal_error(err),
    }
}

/// GET /api/users/:id
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_id(&id) else {
        return invalid_id();
    };
    match state.store.get(id).await {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => user_not_found(),
        Err(err) => internal_error(err),
    }
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Response {
    let Ok(Json(user)) = payload else {
        return invalid_body();
    };
    match state.store.create(user).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(err) => internal_error(err),
    }
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return invalid_id();
    };
    let Ok(Json(update)) = payload else {
        return invalid_body();
    };
    match state.store.update(id, update).await {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => user_not_found(),
        Err(err) => internal_error(err),
    }
}

/// DELETE /api/users/:id
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_id(&id) else {
        return invalid_id();
    };
    match state.store.delete(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => user_not_found(),
        Err(err) => internal_error(err),
    }
}

/// Fallback for unmatched paths and verbs.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Page not found").into_response()
}

/// Ids must parse as canonical UUIDs; anything else is rejected before the
/// store is consulted.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

fn invalid_id() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid user id").into_response()
}

fn invalid_body() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid request body").into_response()
}

fn user_not_found() -> Response {
    (StatusCode::NOT_FOUND, "User not found").into_response()
}

/// Details stay in the log; the client gets a generic body.
fn internal_error(err: StoreError) -> Response {
    error!(error = %err, "store request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}
