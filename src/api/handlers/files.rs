//! `/api/archivos` routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Extension;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::api::extract::{Json, Path};
use crate::api::response::{created, ok};
use crate::api::state::AppState;
use crate::domain::{Actor, FileStatus};
use crate::errors::{AppError, AppResult};
use crate::validation::parse_content_type;
use crate::workflow::NewUpload;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadBody {
    request_id: i64,
    document_type: String,
    original_name: String,
    content_type: Option<String>,
    /// File contents, standard base64.
    content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileReviewBody {
    status: FileStatus,
    comment: Option<String>,
}

/// POST /api/archivos
pub(crate) async fn handle_upload(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<UploadBody>,
) -> AppResult<impl IntoResponse> {
    let bytes = STANDARD
        .decode(body.content.trim())
        .map_err(|e| AppError::validation(format!("file content is not valid base64: {e}")))?;
    let original_name = body.original_name.trim();
    if original_name.is_empty() {
        return Err(AppError::validation("original file name is required"));
    }
    if original_name.chars().any(char::is_control) {
        return Err(AppError::validation("file name contains control characters"));
    }
    let content_type = match body.content_type.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_content_type(raw)
            .ok_or_else(|| AppError::validation(format!("invalid content type {raw:?}")))?,
        _ => mime::APPLICATION_OCTET_STREAM,
    };

    let record = state
        .documents
        .upload(
            actor,
            NewUpload {
                request_id: body.request_id,
                document_type: body.document_type.trim(),
                original_name,
                content_type: content_type.as_ref(),
                bytes: &bytes,
            },
        )
        .await?;
    Ok(created(record))
}

/// GET /api/archivos/{id}
///
/// Raw bytes with the stored content type.
pub(crate) async fn handle_download(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let (record, bytes) = state.documents.download(actor, id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        record.original_name.replace(['"', '\\'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, record.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// PUT /api/archivos/{id}/revision
pub(crate) async fn handle_review(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<FileReviewBody>,
) -> AppResult<impl IntoResponse> {
    let record = state
        .reviews
        .record_file_review(id, body.status, body.comment.as_deref(), actor)
        .await?;
    Ok(ok(record))
}
