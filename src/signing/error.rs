//! Signing engine error types

use thiserror::Error;

/// Errors produced by the signature-placement engine.
///
/// The locator never errors (all its failure paths return the no-target
/// sentinel); these cover PDF parsing, image decoding, and document
/// mutation/serialization.
#[derive(Debug, Error)]
pub enum SignError {
    /// Source bytes are not a loadable PDF
    #[error("Failed to parse PDF: {0}")]
    PdfParse(String),

    /// Signature bytes decode as neither supported raster format
    #[error("Signature image decodes as neither PNG nor JPEG")]
    UnsupportedImage,

    /// Re-encoding the signature raster for embedding failed
    #[error("Failed to encode signature raster: {0}")]
    ImageEncode(String),

    /// Writing the placement into the document failed
    #[error("Failed to write placement into document: {0}")]
    Commit(String),

    /// Flattening interactive form structures failed
    #[error("Failed to flatten form structures: {0}")]
    Flatten(String),

    /// Serializing the final byte stream failed
    #[error("Failed to serialize signed document: {0}")]
    Serialize(String),
}

/// Result type alias for signing operations
pub type Result<T> = std::result::Result<T, SignError>;
