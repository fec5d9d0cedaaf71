//! Document retrieval route
//!
//! Serves stored documents as downloadable PDF attachments.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use base64::Engine as _;

use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/document/:id", get(download_document))
}

/// GET /api/document/:id
async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let record = DocumentStore::new(state.db())
        .fetch(&id)
        .await?
        .ok_or_else(|| AppError::SourceNotFound(id.clone()))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(record.doc.as_bytes())
        .map_err(|e| AppError::Internal(format!("stored document is not valid base64: {e}")))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"document-signe-{id}.pdf\""),
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}
