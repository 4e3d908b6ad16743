use thiserror::Error;

use crate::document::DocumentError;
use crate::loader::LoaderError;

use super::types::NodeKey;

/// Errors raised while building or querying an [`ApiGraph`](super::ApiGraph).
///
/// Every build error is fatal: no partial graph is ever returned.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Duplicate operationId {operation_id:?} in {doc_uri}")]
    DuplicateOperationId {
        doc_uri: String,
        operation_id: String,
    },

    #[error("Invalid link {name:?} on {from}: {reason}")]
    InvalidLink {
        from: NodeKey,
        name: String,
        reason: String,
    },

    #[error("Invalid backlink operation {name:?} on {to}: {reason}")]
    InvalidBacklinkOperation {
        to: NodeKey,
        name: String,
        reason: String,
    },

    #[error("Invalid backlinks declaration for chain {chain:?} on {to}: {reason}")]
    InvalidBacklinksDeclaration {
        to: NodeKey,
        chain: String,
        reason: String,
    },

    #[error("Security scheme {scheme:?} used by {operation} is not declared in components")]
    InvalidSecurityScheme { scheme: String, operation: NodeKey },

    #[error("Circular dependency for {node} in chain {chain:?}: {}", format_cycle(.cycle))]
    CircularDependency {
        node: NodeKey,
        chain: Option<String>,
        cycle: Vec<NodeKey>,
    },

    #[error("Invalid document {doc_uri}: {source}")]
    InvalidDocument {
        doc_uri: String,
        #[source]
        source: DocumentError,
    },

    #[error("Failed to load document: {0}")]
    Load(#[source] LoaderError),

    #[error("Document was never crawled: {0}")]
    DocumentNotLoaded(String),

    #[error("No operation for {0}")]
    NodeNotFound(NodeKey),
}

impl GraphError {
    /// Whether the error means the input document set is invalid.
    ///
    /// Fetch failures and lookups of unknown nodes are not.
    pub fn is_invalid_document(&self) -> bool {
        !matches!(
            self,
            GraphError::Load(_) | GraphError::DocumentNotLoaded(_) | GraphError::NodeNotFound(_)
        )
    }
}

impl From<LoaderError> for GraphError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::Document { uri, source } => GraphError::InvalidDocument {
                doc_uri: uri,
                source,
            },
            other => GraphError::Load(other),
        }
    }
}

fn format_cycle(cycle: &[NodeKey]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_errors_become_invalid_document() {
        let err: GraphError = LoaderError::Document {
            uri: "https://example.com/api.yaml".into(),
            source: DocumentError::invalid("openapi", "bad version"),
        }
        .into();
        assert!(matches!(err, GraphError::InvalidDocument { .. }));
        assert!(err.is_invalid_document());
    }

    #[test]
    fn test_fetch_errors_are_not_document_errors() {
        let err: GraphError = LoaderError::NotFound("https://example.com/x.yaml".into()).into();
        assert!(matches!(err, GraphError::Load(_)));
        assert!(!err.is_invalid_document());
    }
}
