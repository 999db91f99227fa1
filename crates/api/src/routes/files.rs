//! File routes: upload, list, download URL and delete.

use std::io;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use filegate_core::storage::BackendKind;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::StreamReader;
use tracing::info;

use crate::{AppState, error::ApiError};

/// Multipart part carrying the file.
const FILE_FIELD: &str = "file";

/// Creates the file routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload/", post(upload_file))
        .route("/files/", get(list_files))
        .route("/download/{filename}", get(download_file))
        .route("/delete/{filename}", delete(delete_file))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Optional backend selector.
#[derive(Debug, Default, Deserialize)]
pub struct StorageQuery {
    /// `s3` or `ftp`; each route has its own default.
    pub storage_type: Option<BackendKind>,
}

/// Confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

/// Stored file names.
#[derive(Debug, Serialize)]
pub struct FilesResponse {
    /// Keys relative to the container.
    pub files: Vec<String>,
}

/// Presigned download URL.
#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    /// URL valid for the configured TTL.
    pub download_url: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/upload/`
/// Stream the `file` part of a multipart body to the selected backend.
async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<StorageQuery>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_owned).ok_or_else(|| {
            ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "multipart part 'file' has no filename",
            )
        })?;

        let reader = StreamReader::new(field.map_err(io::Error::other));
        tokio::pin!(reader);
        let bytes = state
            .storage
            .upload(query.storage_type, &filename, &mut reader)
            .await?;

        info!(
            filename = %filename,
            storage_type = ?query.storage_type,
            bytes,
            "File uploaded"
        );

        return Ok(Json(MessageResponse {
            message: format!("File '{filename}' uploaded successfully."),
        }));
    }

    Err(ApiError::new(
        StatusCode::UNPROCESSABLE_ENTITY,
        "multipart body has no 'file' part",
    ))
}

/// GET `/files/`
/// List stored files.
async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<StorageQuery>,
) -> Result<Json<FilesResponse>, ApiError> {
    let files = state.storage.list(query.storage_type).await?;
    Ok(Json(FilesResponse { files }))
}

/// GET `/download/{filename}`
/// Issue a presigned download URL.
async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<StorageQuery>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let reference = state
        .storage
        .download_reference(query.storage_type, &filename)
        .await?;

    info!(
        filename = %filename,
        expires_at = %reference.expires_at.to_rfc3339(),
        "Download URL issued"
    );

    Ok(Json(DownloadResponse {
        download_url: reference.url,
    }))
}

/// DELETE `/delete/{filename}`
/// Remove a stored file.
async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<StorageQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.storage.delete(query.storage_type, &filename).await?;

    info!(filename = %filename, "File deleted");

    Ok(Json(MessageResponse {
        message: format!("File '{filename}' deleted successfully."),
    }))
}
