//! Per-user routes: reading with saved progress, reading lists and user stats.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use bookshelf_store::{PageResult, ReadingListEntry, ReadingStatus, UserStats};
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/{user_id}/read/{book_id}", get(read_book))
        .route(
            "/users/{user_id}/progress/{book_id}",
            get(get_progress).put(save_progress),
        )
        .route(
            "/users/{user_id}/books",
            get(list_entries).post(add_entry).delete(clear_entries),
        )
        .route("/users/{user_id}/books/{book_id}", delete(remove_entry))
        .route("/users/{user_id}/books/{book_id}/status", put(set_status))
        .route("/users/{user_id}/books/{book_id}/rating", put(rate_book))
        .route("/users/{user_id}/stats", get(user_stats))
}

fn parse_status(raw: Option<&str>) -> ApiResult<Option<ReadingStatus>> {
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<ReadingStatus>)
        .transpose()?)
}

// ---------------------------------------------------------------
// Reading
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct ReadQuery {
    page: Option<i64>,
    page_size: Option<usize>,
}

/// Without `page` the reader resumes from the saved page.
async fn read_book(
    State(state): State<Arc<AppState>>,
    Path((user_id, book_id)): Path<(i64, i64)>,
    Query(q): Query<ReadQuery>,
) -> ApiResult<Json<PageResult>> {
    let page_size = state.page_size(q.page_size);
    Ok(Json(state.store.read_book(user_id, book_id, page_size, q.page)?))
}

async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, book_id)): Path<(i64, i64)>,
) -> ApiResult<Json<serde_json::Value>> {
    let record = state.store.get_progress_record(user_id, book_id)?;
    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "book_id": book_id,
        "page": record.as_ref().map(|r| r.page),
        "updated_at": record.map(|r| r.updated_at),
    })))
}

#[derive(Deserialize)]
struct ProgressRequest {
    page: i64,
}

async fn save_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, book_id)): Path<(i64, i64)>,
    Json(req): Json<ProgressRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.save_progress(user_id, book_id, req.page)?;
    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "book_id": book_id,
        "page": req.page,
    })))
}

// ---------------------------------------------------------------
// Reading list
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct ListQuery {
    status: Option<String>,
}

async fn list_entries(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let status = parse_status(q.status.as_deref())?;
    let entries: Vec<ReadingListEntry> = state.store.reading_list(user_id, status)?;
    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "status": status,
        "total": entries.len(),
        "books": entries,
    })))
}

#[derive(Deserialize)]
struct AddEntryRequest {
    book_id: i64,
    status: Option<String>,
}

async fn add_entry(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(req): Json<AddEntryRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let status = parse_status(req.status.as_deref())?.unwrap_or_default();
    state.store.add_to_reading_list(user_id, req.book_id, status)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "user_id": user_id,
            "book_id": req.book_id,
            "status": status,
        })),
    ))
}

async fn clear_entries(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = state.store.clear_reading_list(user_id)?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

async fn remove_entry(
    State(state): State<Arc<AppState>>,
    Path((user_id, book_id)): Path<(i64, i64)>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = state.store.remove_from_reading_list(user_id, book_id)?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: String,
}

async fn set_status(
    State(state): State<Arc<AppState>>,
    Path((user_id, book_id)): Path<(i64, i64)>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let status: ReadingStatus = req.status.parse()?;
    if !state.store.set_status(user_id, book_id, status)? {
        return Err(ApiError::not_found(format!(
            "book {} is not on the reading list of user {}",
            book_id, user_id
        )));
    }
    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "book_id": book_id,
        "status": status,
    })))
}

#[derive(Deserialize)]
struct RatingRequest {
    rating: i64,
}

async fn rate_book(
    State(state): State<Arc<AppState>>,
    Path((user_id, book_id)): Path<(i64, i64)>,
    Json(req): Json<RatingRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.rate_book(user_id, book_id, req.rating)?;
    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "book_id": book_id,
        "rating": req.rating,
    })))
}

async fn user_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<UserStats>> {
    Ok(Json(state.store.user_stats(user_id)?))
}
