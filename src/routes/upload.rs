//! Upload route
//!
//! Accepts a PDF as a multipart `file` field and stores it base64-encoded,
//! returning the new document's identifier.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use base64::Engine as _;
use serde::Serialize;

use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub id: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/upload", post(upload_document))
}

/// POST /api/upload
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().map(str::to_owned);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file = Some((content_type, data.to_vec()));
            break;
        }
    }

    let Some((content_type, data)) = file else {
        return Err(AppError::InputMissing("file".to_string()));
    };
    if data.is_empty() {
        return Err(AppError::InputMissing("file".to_string()));
    }
    let is_pdf = content_type.as_deref().is_some_and(|ct| ct.contains("pdf"));
    if !is_pdf {
        return Err(AppError::BadRequest("Only PDF files are allowed".to_string()));
    }

    let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
    let id = DocumentStore::new(state.db()).insert(&encoded).await?;

    tracing::info!(%id, size = data.len(), "document uploaded");
    Ok(Json(UploadResponse { id }))
}
