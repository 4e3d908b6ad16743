use std::path::PathBuf;
use thiserror::Error;

use crate::document::DocumentError;

/// Errors that can occur while fetching and parsing documents.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request for {uri} failed: {message}")]
    Http { uri: String, message: String },

    #[error("Request for {uri} returned status {status}")]
    HttpStatus { uri: String, status: u16 },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid URI {uri}: {message}")]
    InvalidUri { uri: String, message: String },

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document {uri}: {source}")]
    Document {
        uri: String,
        #[source]
        source: DocumentError,
    },
}

impl LoaderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoaderError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_uri(uri: impl Into<String>, message: impl ToString) -> Self {
        LoaderError::InvalidUri {
            uri: uri.into(),
            message: message.to_string(),
        }
    }
}
