//! User endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use repohub_types::{User, UserDraft};

use crate::{AppState, Result};

pub async fn create_user(
    State(state): State<AppState>,
    Json(draft): Json<UserDraft>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.users.create(draft).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let user = state.users.get(&id).await?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<UserDraft>,
) -> Result<Json<User>> {
    let user = state.users.update(&id, draft).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.users.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    let users = state.users.list().await?;
    Ok(Json(users))
}
