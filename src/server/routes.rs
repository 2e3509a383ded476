//! HTTP routes
//!
//! Maps each endpoint onto a storage operation and renders the outcome as
//! JSON. Every error leaves as `{"error": ...}` with a 4xx/5xx status.

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::fs;
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, StorageError, handle_error};
use crate::middleware::log_request;
use crate::storage::results::{DirectoryEntry, FilePayload};
use crate::storage::{Sandbox, operations};

/// State shared by all routes. Immutable after startup.
#[derive(Debug)]
pub struct AppState {
    pub sandbox: Sandbox,
}

type SharedState = Arc<AppState>;

pub fn router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/browse/", get(browse_root))
        .route("/browse/*subpath", get(browse))
        .route("/files", get(list_files))
        .route("/uploads/*filename", get(download))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/delete_item", post(delete_item))
        .route("/create_folder", post(create_folder))
        .route("/move_item", post(move_item))
        .route("/rename_item", post(rename_item))
        .layer(axum::middleware::from_fn(log_request))
        .with_state(state)
}

// ═══ REQUEST BODIES ═══

#[derive(Debug, Default, Deserialize)]
struct PathQuery {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DeleteRequest {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CreateFolderRequest {
    folder: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MoveRequest {
    source: Option<String>,
    destination: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenameRequest {
    old_name: Option<String>,
    new_name: Option<String>,
}

/// A missing, malformed or mistyped JSON body reads as one with no fields
fn json_body<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    payload.map(|Json(body)| body).unwrap_or_default()
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// Log a storage error and convert it with its default status
fn reject(context: &str, err: StorageError) -> ApiError {
    handle_error(context, &err);
    ApiError::from(err)
}

// ═══ BROWSE ═══

async fn index() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/browse/")]).into_response()
}

async fn browse_root(state: State<SharedState>) -> Result<Html<String>, ApiError> {
    browse(state, Path(String::new())).await
}

async fn browse(
    State(state): State<SharedState>,
    Path(subpath): Path<String>,
) -> Result<Html<String>, ApiError> {
    if let Err(e) = state.sandbox.resolve(&subpath) {
        handle_error("browse", &e);
        return Err(ApiError::not_found("Not found"));
    }

    Ok(Html(render_browse_page(&subpath)))
}

/// Minimal page shell; the listing itself is fetched from `/files`
fn render_browse_page(current_path: &str) -> String {
    let escaped = escape_html(current_path);
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>File Manager - /{escaped}</title></head>\n\
         <body data-current-path=\"{escaped}\">\n\
         <h1>/{escaped}</h1>\n\
         <ul id=\"file-list\"></ul>\n\
         </body>\n\
         </html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ═══ GET /files ═══

async fn list_files(
    State(state): State<SharedState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<Vec<DirectoryEntry>>, ApiError> {
    let relative = query.path.unwrap_or_default();

    match operations::list_directory(&state.sandbox, &relative).await {
        Ok(entries) => Ok(Json(entries)),
        Err(e @ StorageError::SandboxViolation(_)) => {
            handle_error("list", &e);
            Err(ApiError::invalid_request("Invalid path"))
        }
        Err(e) => Err(reject("list", e)),
    }
}

// ═══ GET /uploads/*filename ═══

async fn download(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let file_path = match operations::prepare_file_retrieval(&state.sandbox, &filename).await {
        Ok(path) => path,
        Err(e @ (StorageError::SandboxViolation(_) | StorageError::NotFound(_))) => {
            handle_error("download", &e);
            return Err(ApiError::not_found("Not found"));
        }
        Err(e) => return Err(reject("download", e)),
    };

    let file = fs::File::open(&file_path)
        .await
        .map_err(|e| reject("download", e.into()))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| reject("download", e.into()))?
        .len();

    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().replace(['"', '\\'], "_"))
        .unwrap_or_default();

    info!("Streaming {} ({} bytes)", file_path.display(), length);

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", name),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

// ═══ POST /upload ═══

async fn upload(
    State(state): State<SharedState>,
    Query(query): Query<PathQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let relative = query.path.unwrap_or_default();

    if let Err(e) = state.sandbox.resolve(&relative) {
        handle_error("upload", &e);
        return Err(ApiError::invalid_request("Invalid target directory"));
    }

    let mut multipart =
        multipart.map_err(|_| ApiError::invalid_request("No file part in the request"))?;

    let mut payloads = Vec::new();
    let mut saw_file_field = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        saw_file_field = true;

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        payloads.push(FilePayload::new(filename, data));
    }

    if !saw_file_field {
        return Err(ApiError::invalid_request("No file part in the request"));
    }

    let filenames = operations::store_files(&state.sandbox, &relative, payloads)
        .await
        .map_err(|e| reject("upload", e))?;

    Ok(Json(json!({ "success": true, "filenames": filenames })))
}

// ═══ POST /delete_item ═══

async fn delete_item(
    State(state): State<SharedState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let path = json_body(payload)
        .path
        .ok_or_else(|| ApiError::invalid_request("Missing path"))?;

    operations::delete_item(&state.sandbox, &path)
        .await
        .map_err(|e| reject("delete", e))?;

    Ok(success())
}

// ═══ POST /create_folder ═══

async fn create_folder(
    State(state): State<SharedState>,
    payload: Result<Json<CreateFolderRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let folder = json_body(payload)
        .folder
        .ok_or_else(|| ApiError::invalid_request("Missing folder name"))?;

    operations::create_folder(&state.sandbox, &folder)
        .await
        .map_err(|e| {
            handle_error("create folder", &e);
            ApiError::invalid_request(e.to_string())
        })?;

    Ok(success())
}

// ═══ POST /move_item ═══

async fn move_item(
    State(state): State<SharedState>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(payload);
    let (Some(source), Some(destination)) = (body.source, body.destination) else {
        return Err(ApiError::invalid_request("Missing source or destination"));
    };

    operations::move_item(&state.sandbox, &source, &destination)
        .await
        .map_err(|e| reject("move", e))?;

    Ok(success())
}

// ═══ POST /rename_item ═══

async fn rename_item(
    State(state): State<SharedState>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(payload);
    let (Some(old_name), Some(new_name)) = (body.old_name, body.new_name) else {
        return Err(ApiError::invalid_request("Missing old_name or new_name"));
    };

    match operations::rename_item(&state.sandbox, &old_name, &new_name).await {
        Ok(()) => Ok(success()),
        Err(StorageError::SandboxViolation(rejected)) if rejected == new_name => {
            handle_error("rename", &StorageError::SandboxViolation(rejected));
            Err(ApiError::invalid_request("Unsafe new name"))
        }
        Err(e) => Err(reject("rename", e)),
    }
}
