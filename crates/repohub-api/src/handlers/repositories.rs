//! Repository-record endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use repohub_types::{RecordDraft, RepoRecord};

use crate::{AppState, Result};

pub async fn create_record(
    State(state): State<AppState>,
    Json(draft): Json<RecordDraft>,
) -> Result<(StatusCode, Json<RepoRecord>)> {
    let record = state.records.create(draft).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RepoRecord>> {
    let record = state.records.get(&id).await?;
    Ok(Json(record))
}

pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<RecordDraft>,
) -> Result<Json<RepoRecord>> {
    let record = state.records.update(&id, draft).await?;
    Ok(Json(record))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.records.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_records(State(state): State<AppState>) -> Result<Json<Vec<RepoRecord>>> {
    let records = state.records.list().await?;
    Ok(Json(records))
}
