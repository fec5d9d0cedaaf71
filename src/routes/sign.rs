//! Sign route
//!
//! Invokes the signature-placement engine on a stored document and persists
//! the signed result.

use axum::{extract::State, routing::post, Json, Router};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::signing::{self, Placement};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignRequest {
    pub id: Option<String>,
    #[serde(rename = "signatureDataUrl")]
    pub signature_data_url: Option<String>,
}

#[derive(Serialize)]
pub struct SignResponse {
    pub ok: bool,
    #[serde(rename = "signedBase64")]
    pub signed_base64: String,
    /// How the signature was placed. `none` means the document had no
    /// usable target and was only flattened.
    pub placement: Placement,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/sign", post(sign_document))
}

/// POST /api/sign
async fn sign_document(
    State(state): State<AppState>,
    Json(request): Json<SignRequest>,
) -> Result<Json<SignResponse>> {
    let id = request
        .id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InputMissing("id".to_string()))?;
    let data_url = request
        .signature_data_url
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InputMissing("signatureDataUrl".to_string()))?;

    let store = DocumentStore::new(state.db());
    let record = store
        .fetch(&id)
        .await?
        .ok_or_else(|| AppError::SourceNotFound(id.clone()))?;

    let engine = base64::engine::general_purpose::STANDARD;
    let pdf_bytes = engine
        .decode(record.doc.as_bytes())
        .map_err(|e| AppError::Internal(format!("stored document is not valid base64: {e}")))?;

    // The capture surface sends a data URL; accept a bare base64 payload too.
    let signature_b64 = match data_url.split_once(',') {
        Some((_, payload)) => payload,
        None => data_url.as_str(),
    };
    let signature_bytes = engine
        .decode(signature_b64)
        .map_err(|_| AppError::BadRequest("signature payload is not valid base64".to_string()))?;

    // The pipeline is CPU-bound (raster decode, document mutation); keep it
    // off the async workers.
    let signed =
        tokio::task::spawn_blocking(move || signing::sign_pdf(&pdf_bytes, &signature_bytes))
            .await
            .map_err(|e| AppError::Internal(format!("signing task failed: {e}")))??;

    if signed.placement == Placement::None {
        tracing::warn!(%id, "no usable signature target; stored output is flattened only");
    }

    let signed_base64 = engine.encode(&signed.bytes);
    let updated = store
        .update(&id, &signed_base64, true)
        .await
        .map_err(|e| AppError::PersistenceFailure(e.to_string()))?;
    if !updated {
        return Err(AppError::PersistenceFailure(format!(
            "document {id} disappeared before update"
        )));
    }

    tracing::info!(%id, placement = signed.placement.as_str(), "document signed");
    Ok(Json(SignResponse {
        ok: true,
        signed_base64,
        placement: signed.placement,
    }))
}
