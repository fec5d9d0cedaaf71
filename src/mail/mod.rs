//! Outbound mail
//!
//! Best-effort delivery through a Postmark-compatible HTTP API. Failures
//! are logged by callers, never retried, and never surfaced as pipeline
//! failures.

mod client;
mod templates;

pub use client::{MailAttachment, MailError, Mailer, OutgoingMail};
pub use templates::signed_document_mail;
