//! Per-document `operationId` index.

use std::collections::HashMap;
use url::Url;

use crate::document::{HttpMethod, OpenApiDocument};

use super::error::GraphError;

/// `operationId` -> `(path, method)` for one document.
pub type OperationIds = HashMap<String, (String, HttpMethod)>;

/// Memoized operationId indexes, owned by one build.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    indexes: HashMap<Url, OperationIds>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `doc` under `doc_uri`, once.
    ///
    /// Fails on the second occurrence of any operationId in the document.
    pub fn index_for(
        &mut self,
        doc_uri: &Url,
        doc: &OpenApiDocument,
    ) -> Result<&OperationIds, GraphError> {
        if !self.indexes.contains_key(doc_uri) {
            let index = build_index(doc_uri, doc)?;
            self.indexes.insert(doc_uri.clone(), index);
        }
        self.indexes
            .get(doc_uri)
            .ok_or_else(|| GraphError::DocumentNotLoaded(doc_uri.to_string()))
    }

    pub fn get(&self, doc_uri: &Url) -> Option<&OperationIds> {
        self.indexes.get(doc_uri)
    }
}

fn build_index(doc_uri: &Url, doc: &OpenApiDocument) -> Result<OperationIds, GraphError> {
    let mut index = OperationIds::new();

    for (path, item) in &doc.paths {
        for (method, operation) in item.operations() {
            let Some(operation_id) = &operation.operation_id else {
                continue;
            };
            if index
                .insert(operation_id.clone(), (path.clone(), method))
                .is_some()
            {
                return Err(GraphError::DuplicateOperationId {
                    doc_uri: doc_uri.to_string(),
                    operation_id: operation_id.clone(),
                });
            }
        }
    }

    Ok(index)
}
