//! Document model error types.

use thiserror::Error;

/// Errors raised while turning a dereferenced JSON value into a typed,
/// validated [`OpenApiDocument`](super::OpenApiDocument).
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The value does not have the shape of an OpenAPI 3 document.
    #[error("Failed to deserialize document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A structural rule of the document model is broken.
    #[error("Invalid document at {location}: {message}")]
    Invalid { location: String, message: String },
}

impl DocumentError {
    pub fn invalid(location: impl Into<String>, message: impl Into<String>) -> Self {
        DocumentError::Invalid {
            location: location.into(),
            message: message.into(),
        }
    }
}
