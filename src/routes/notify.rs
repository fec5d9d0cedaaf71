//! Notification route
//!
//! Mails a stored signed document to the client, cc the advisor. Delivery
//! is best-effort: failures are logged, not retried, and not surfaced.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::mail::{signed_document_mail, MailAttachment, OutgoingMail};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct NotifyRequest {
    pub advisor: Option<String>,
    pub client: Option<String>,
    #[serde(rename = "docId")]
    pub doc_id: Option<String>,
}

#[derive(Serialize)]
pub struct NotifyResponse {
    pub ok: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/send-email", post(send_signed_document))
}

/// POST /api/send-email
async fn send_signed_document(
    State(state): State<AppState>,
    Json(request): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>> {
    let advisor = request
        .advisor
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InputMissing("advisor".to_string()))?;
    let client = request
        .client
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InputMissing("client".to_string()))?;
    let doc_id = request
        .doc_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InputMissing("docId".to_string()))?;

    let record = DocumentStore::new(state.db())
        .fetch(&doc_id)
        .await?
        .ok_or_else(|| AppError::SourceNotFound(doc_id.clone()))?;

    let content = signed_document_mail(&state.config().mail.from_name);
    let mail = OutgoingMail {
        to: client,
        cc: vec![advisor],
        subject: content.subject,
        text_body: content.text_body,
        html_body: content.html_body,
        attachments: vec![MailAttachment {
            name: format!("document-signe-{doc_id}.pdf"),
            content_base64: record.doc,
            content_type: "application/pdf".to_string(),
        }],
    };

    if let Err(e) = state.mailer().send(mail).await {
        tracing::warn!(%doc_id, "failed to send signed-document mail: {e}");
    }

    Ok(Json(NotifyResponse { ok: true }))
}
