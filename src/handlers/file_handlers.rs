//! HTTP handlers for uploads and stored files.

use crate::{
    errors::AppError,
    services::file_store::{FileStoreError, MAX_UPLOAD_BYTES},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use std::io;
use tokio_util::io::ReaderStream;
use tracing::info;

/// Multipart field carrying the file.
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    pub path: Option<String>,
}

/// `GET /api/files` - list every file, or stat one with `?path=`.
pub async fn get_files(
    State(state): State<AppState>,
    Query(q): Query<FilesQuery>,
) -> Result<Response, AppError> {
    if let Some(path) = q.path.as_deref().filter(|p| !p.is_empty()) {
        let file = state
            .files
            .get_file(path)
            .await
            .map_err(|e| AppError::from_files(e, "Failed to read file"))?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        return Ok(Json(file).into_response());
    }

    let files = state
        .files
        .list_files()
        .await
        .map_err(|e| AppError::from_files(e, "Failed to list files"))?;
    Ok(Json(files).into_response())
}

/// `DELETE /api/files` - remove every stored file.
pub async fn delete_files(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let deleted = state
        .files
        .delete_all_files()
        .await
        .map_err(|e| AppError::from_files(e, "Failed to delete files"))?;
    info!(deleted, "all uploaded files deleted");
    Ok(Json(json!({ "message": "All files deleted", "deleted": deleted })))
}

/// `POST /api/upload` - store the multipart field named `file`.
///
/// Other fields are skipped. The body streams straight to disk.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("unknown").to_string();
        let content_type = field.content_type().map(str::to_string);
        let body = field.map_err(io::Error::other);

        let stored = match state
            .files
            .save_stream(body, &original_name, content_type)
            .await
        {
            Ok(stored) => stored,
            Err(FileStoreError::Io(err)) if exceeded_body_limit(&err) => {
                return Err(AppError::from_files(
                    FileStoreError::TooLarge {
                        limit: MAX_UPLOAD_BYTES,
                    },
                    "Upload failed",
                ));
            }
            Err(err) => return Err(AppError::from_files(err, "Upload failed")),
        };
        info!(name = %stored.name, path = %stored.path, size = stored.size, "file uploaded");
        return Ok(Json(stored));
    }

    Err(AppError::bad_request("No file uploaded"))
}

/// `GET /uploads/{*name}` - raw bytes of a stored file.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let (meta, file) = state
        .files
        .open_file(&name)
        .await
        .map_err(|e| AppError::from_files(e, "Failed to read file"))?
        .ok_or_else(|| AppError::not_found("File not found"))?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size));
    Ok(response)
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), format!("Upload failed: {}", err.body_text()))
}

/// The request body limit surfaces as a multipart read error mid-stream.
fn exceeded_body_limit(err: &io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
        .is_some_and(|m| m.status() == StatusCode::PAYLOAD_TOO_LARGE)
}
