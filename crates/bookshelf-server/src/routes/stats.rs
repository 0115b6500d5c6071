//! Library stats and server status routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/status", get(get_status))
}

/// GET /api/stats: book counts and the most common genres and authors.
async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let stats = state.store.library_stats()?;
    Ok(Json(serde_json::json!({
        "total_books": stats.total_books,
        "books_with_content": stats.books_with_content,
        "top_genres": stats.top_genres,
        "top_authors": stats.top_authors,
        "page_size": state.config.page_size,
        "uploads": count_files_in_dir(&state.config.data_paths.uploads),
    })))
}

/// GET /api/status: liveness plus the basics of the running instance.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let books = state.store.count_books().ok();
    Json(serde_json::json!({
        "status": if books.is_some() { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "books": books,
        "port": state.config.port,
        "page_size": state.config.page_size,
        "database": state.store.db_path().display().to_string(),
    }))
}

fn count_files_in_dir(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}
