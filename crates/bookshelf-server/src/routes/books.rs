//! Book routes: catalogue, search, upload and paginated reading.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bookshelf_core::Error;
use bookshelf_ingest::{extract_upload, parse_book_line, parse_caption};
use bookshelf_store::pagination::total_pages;
use bookshelf_store::sqlite::content_hash;
use bookshelf_store::{BookSummary, NewBook, PageResult, SearchField};
use serde::Deserialize;
use tracing::{info, warn};

use super::{ApiError, ApiResult};
use crate::state::AppState;

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/books", get(list_books).post(add_book))
        .route("/books/line", post(add_book_line))
        .route(
            "/books/upload",
            post(upload_book).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/books/search", get(search_books))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/books/{id}/content", put(set_content))
        .route("/books/{id}/pages/{page}", get(get_page))
}

// ---------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    readable: bool,
}

async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let books = if q.readable {
        state.store.list_readable_books()?
    } else {
        state.store.list_books()?
    };
    Ok(Json(serde_json::json!({
        "total": books.len(),
        "books": books,
    })))
}

#[derive(Deserialize)]
struct AddBookRequest {
    title: String,
    author: String,
    #[serde(default)]
    genre: String,
    content: Option<String>,
}

async fn add_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddBookRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let book = NewBook {
        title: req.title,
        author: req.author,
        genre: req.genre,
        content: req.content,
        source_file: None,
    };
    created(&state, book)
}

/// POST /api/books/line: `Title | Author | Genre [| Text]` as a plain-text body.
async fn add_book_line(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let book = parse_book_line(&body)?;
    created(&state, book)
}

fn created(state: &AppState, book: NewBook) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let chars = book.content.as_ref().map(|c| c.chars().count());
    let id = state.store.insert_book(book)?;
    let summary = state
        .store
        .get_book_summary(id)?
        .ok_or_else(|| Error::Internal(format!("book {} vanished after insert", id)))?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": id,
            "book": summary,
            "pages": chars.map(|n| total_pages(n, state.config.page_size)),
        })),
    ))
}

async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BookSummary>> {
    state
        .store
        .get_book_summary(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("book {}", id)))
}

#[derive(Deserialize)]
struct UpdateBookRequest {
    title: String,
    author: String,
    #[serde(default)]
    genre: String,
}

async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBookRequest>,
) -> ApiResult<Json<BookSummary>> {
    if !state
        .store
        .update_book_metadata(id, &req.title, &req.author, &req.genre)?
    {
        return Err(ApiError::not_found(format!("book {}", id)));
    }
    get_book(State(state), Path(id)).await
}

#[derive(Deserialize)]
struct SetContentRequest {
    content: String,
}

async fn set_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<SetContentRequest>,
) -> ApiResult<Json<BookSummary>> {
    if !state.store.set_book_content(id, &req.content)? {
        return Err(ApiError::not_found(format!("book {}", id)));
    }
    get_book(State(state), Path(id)).await
}

async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let source_file = state
        .store
        .get_book_summary(id)?
        .and_then(|b| b.source_file);
    let deleted = state.store.delete_book(id)?;

    if let Some(name) = source_file.filter(|_| deleted) {
        let path = state.config.data_paths.uploads.join(&name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("could not remove upload {}: {}", path.display(), e);
        }
    }
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

// ---------------------------------------------------------------
// Search
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    field: Option<String>,
}

async fn search_books(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let field = q
        .field
        .as_deref()
        .filter(|f| !f.is_empty())
        .map(str::parse::<SearchField>)
        .transpose()?;
    let results = state.store.search(&q.q, field)?;
    Ok(Json(serde_json::json!({
        "query": q.q,
        "field": field,
        "total": results.len(),
        "results": results,
    })))
}

// ---------------------------------------------------------------
// Upload
// ---------------------------------------------------------------

/// POST /api/books/upload: multipart with a `file` part and a `caption`
/// part of the form `Title | Author | Genre`.
async fn upload_book(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let mut caption = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("caption") => {
                caption = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::validation(e.to_string()))?,
                );
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.txt").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(e.to_string()))?;
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let caption = caption.ok_or_else(|| ApiError::validation("missing caption part"))?;
    let (filename, bytes) = file.ok_or_else(|| ApiError::validation("missing file part"))?;

    let meta = parse_caption(&caption)?;
    let text = extract_upload(&filename, &bytes)?;

    if let Some(existing) = state.store.find_book_by_hash(&content_hash(&text))? {
        return Err(ApiError(Error::Duplicate(format!(
            "this text is already stored as book {} ('{}')",
            existing.id, existing.title
        ))));
    }

    let stored_name = stored_upload_name(&filename);
    let stored_path = state.config.data_paths.uploads.join(&stored_name);
    tokio::fs::write(&stored_path, &bytes)
        .await
        .map_err(|e| ApiError(Error::Storage(e.to_string())))?;

    let book = meta.into_new_book().with_content(text).with_source_file(&stored_name);
    match created(&state, book) {
        Ok(response) => {
            info!("upload {} stored as {}", filename, stored_name);
            Ok(response)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&stored_path).await;
            Err(e)
        }
    }
}

/// Random file name that keeps the upload's extension.
fn stored_upload_name(original: &str) -> String {
    let ext = FsPath::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("txt")
        .to_lowercase();
    format!("{}.{}", uuid::Uuid::new_v4(), ext)
}

// ---------------------------------------------------------------
// Pages
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct PageQuery {
    page_size: Option<usize>,
    user_id: Option<i64>,
}

/// GET /api/books/{id}/pages/{page}: saves progress when `user_id` is given.
async fn get_page(
    State(state): State<Arc<AppState>>,
    Path((id, page)): Path<(i64, i64)>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<PageResult>> {
    let page_size = state.page_size(q.page_size);
    let result = match q.user_id {
        Some(user_id) => state.store.read_book(user_id, id, page_size, Some(page))?,
        None => state.store.get_page(id, page, page_size)?,
    };
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn test_add_get_and_list() {
        let app = TestApp::new();

        let (status, body) = app
            .json(
                "POST",
                "/api/books",
                json!({"title": "Dune", "author": "Frank Herbert", "genre": "SF"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();
        assert!(body["pages"].is_null());

        let (status, body) = app.get(&format!("/api/books/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Dune");
        assert_eq!(body["has_content"], false);

        let (_, body) = app.get("/api/books").await;
        assert_eq!(body["total"], 1);
        let (_, body) = app.get("/api/books?readable=true").await;
        assert_eq!(body["total"], 0);

        let (status, _) = app.get("/api/books/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_and_validation_statuses() {
        let app = TestApp::new();
        let book = json!({"title": "Dune", "author": "Frank Herbert", "genre": "SF"});
        app.json("POST", "/api/books", book.clone()).await;

        let (status, body) = app.json("POST", "/api/books", book).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("Dune"));

        let (status, _) = app
            .json(
                "POST",
                "/api/books",
                json!({"title": "Short", "author": "A", "content": "tiny"}),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = app
            .json(
                "POST",
                "/api/books",
                json!({"title": "Nul", "author": "A", "content": "abc\u{0}defghijklmnopqrstuvwxyz"}),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_line_entry_and_paging() {
        let app = TestApp::new();
        let req = Request::post("/api/books/line")
            .header("content-type", "text/plain")
            .body(Body::from("Alphabet | Anon | Primer | abcdefghijklmnopqrstuvwxyz"))
            .unwrap();
        let (status, body) = app.send(req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["pages"], 3);
        let id = body["id"].as_i64().unwrap();

        let (status, page) = app.get(&format!("/api/books/{}/pages/3", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["text"], "uvwxyz");
        assert_eq!(page["start"], 20);
        assert_eq!(page["end"], 26);
        assert_eq!(page["percent"], 100.0);

        let (_, page) = app.get(&format!("/api/books/{}/pages/0?page_size=5", id)).await;
        assert_eq!(page["page"], 1);
        assert_eq!(page["text"], "abcde");
        assert_eq!(page["total_pages"], 6);

        let (status, _) = app
            .get(&format!("/api/books/{}/pages/1?page_size=0", id))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_page_view_with_user_saves_progress() {
        let app = TestApp::new();
        let (_, body) = app
            .json(
                "POST",
                "/api/books",
                json!({"title": "T", "author": "A", "content": "abcdefghijklmnopqrstuvwxyz"}),
            )
            .await;
        let id = body["id"].as_i64().unwrap();

        app.get(&format!("/api/books/{}/pages/99?user_id=42", id)).await;
        assert_eq!(app.state.store.get_progress(42, id).unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_metadata_only_book_has_no_pages() {
        let app = TestApp::new();
        let (_, body) = app
            .json("POST", "/api/books", json!({"title": "T", "author": "A"}))
            .await;
        let id = body["id"].as_i64().unwrap();
        let (status, _) = app.get(&format!("/api/books/{}/pages/1", id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search() {
        let app = TestApp::new();
        for (title, author, genre) in [
            ("Война и мир", "Лев Толстой", "Роман"),
            ("Anna Karenina", "Лев Толстой", "Роман"),
            ("1984", "George Orwell", "Dystopia"),
        ] {
            app.json(
                "POST",
                "/api/books",
                json!({"title": title, "author": author, "genre": genre}),
            )
            .await;
        }

        let (status, body) = app.get("/api/books/search?q=1984").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let (_, body) = app.get("/api/books/search?q=dystopia&field=genre").await;
        assert_eq!(body["results"][0]["title"], "1984");
        assert_eq!(body["field"], "genre");

        let (status, _) = app.get("/api/books/search?q=x&field=isbn").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_update_content_and_delete() {
        let app = TestApp::new();
        let (_, body) = app
            .json("POST", "/api/books", json!({"title": "T", "author": "A"}))
            .await;
        let id = body["id"].as_i64().unwrap();

        let (status, body) = app
            .json(
                "PUT",
                &format!("/api/books/{}", id),
                json!({"title": "T2", "author": "A", "genre": "G"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "T2");

        let (status, body) = app
            .json(
                "PUT",
                &format!("/api/books/{}/content", id),
                json!({"content": "Some readable text here."}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["has_content"], true);

        let (_, body) = app.delete(&format!("/api/books/{}", id)).await;
        assert_eq!(body["deleted"], true);
        let (_, body) = app.delete(&format!("/api/books/{}", id)).await;
        assert_eq!(body["deleted"], false);

        let (status, _) = app
            .json("PUT", "/api/books/999", json!({"title": "X", "author": "Y"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    fn multipart_request(caption: &str, filename: &str, file: &[u8]) -> Request<Body> {
        let boundary = "bookshelf-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\n{c}\r\n",
                b = boundary,
                c = caption
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
                 Content-Type: text/plain\r\n\r\n",
                b = boundary,
                f = filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::post("/api/books/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_stores_file_and_text() {
        let app = TestApp::new();
        let text = "ВОЙНА И МИР\r\nЛев Толстой\r\n\r\nТом первый";

        let (status, body) = app
            .send(multipart_request(
                "Война и мир | Лев Толстой | Роман",
                "war.txt",
                text.as_bytes(),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();
        let source = body["book"]["source_file"].as_str().unwrap().to_string();
        assert!(source.ends_with(".txt"));
        assert!(app.state.config.data_paths.uploads.join(&source).is_file());

        let stored = app.state.store.get_book_content(id).unwrap().unwrap();
        assert_eq!(stored, "ВОЙНА И МИР\nЛев Толстой\n\nТом первый");

        // Same text again is rejected, whatever the caption says.
        let (status, _) = app
            .send(multipart_request("Copy | Someone | Else", "copy.txt", text.as_bytes()))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        app.delete(&format!("/api/books/{}", id)).await;
        assert!(!app.state.config.data_paths.uploads.join(&source).exists());
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_input() {
        let app = TestApp::new();

        let (status, _) = app
            .send(multipart_request("No pipes here", "book.txt", b"Some long enough text"))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = app
            .send(multipart_request("T | A | G", "book.pdf", b"%PDF-1.4 binary"))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = app
            .send(multipart_request("T | A | G", "book.txt", b"short"))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let uploads = std::fs::read_dir(&app.state.config.data_paths.uploads).unwrap();
        assert_eq!(uploads.count(), 0);
    }
}
