//! Recursive crawl of documents into a [`GraphStore`].

use std::collections::BTreeMap;
use url::Url;

use crate::document::OpenApiDocument;
use crate::loader::DocumentLoader;

use super::api::ApiGraph;
use super::edges::{backlink_edges, link_edges, ExtractContext};
use super::error::GraphError;
use super::index::DocumentIndex;
use super::operation::operation_detail;
use super::store::GraphStore;
use super::types::NodeKey;

/// Builds an [`ApiGraph`] by crawling from one entry document.
///
/// A document is crawled fully, then every document it references that is
/// not crawled yet, in URI order, depth first. Each document is crawled
/// once. Any error aborts the build.
pub struct GraphBuilder<'l, L: ?Sized> {
    loader: &'l L,
    index: DocumentIndex,
    store: GraphStore,
    docs: BTreeMap<Url, OpenApiDocument>,
}

impl<'l, L: DocumentLoader + ?Sized> GraphBuilder<'l, L> {
    pub fn new(loader: &'l L) -> Self {
        Self {
            loader,
            index: DocumentIndex::new(),
            store: GraphStore::new(),
            docs: BTreeMap::new(),
        }
    }

    pub fn build(mut self, start: &Url) -> Result<ApiGraph, GraphError> {
        let mut start = start.clone();
        start.set_fragment(None);

        tracing::info!(start = %start, "Building API graph");
        self.crawl(start)?;

        let adjacency = self.store.freeze();
        for (node, detail) in adjacency.nodes() {
            if detail.is_none() && self.docs.contains_key(&node.doc_uri) {
                tracing::warn!(node = %node, "Link or backlink refers to an operation that does not exist");
            }
        }

        tracing::info!(
            documents = self.docs.len(),
            nodes = adjacency.nodes().len(),
            edges = adjacency.edge_count(),
            "Built API graph"
        );
        Ok(ApiGraph::new(self.docs, adjacency))
    }

    fn crawl(&mut self, doc_uri: Url) -> Result<(), GraphError> {
        tracing::debug!(uri = %doc_uri, "Crawling document");
        let doc = self.loader.load(&doc_uri)?;
        let operation_ids = self.index.index_for(&doc_uri, &doc)?;
        let mut ctx = ExtractContext::new(&doc_uri, operation_ids);

        for (path, item) in &doc.paths {
            for (method, operation) in item.operations() {
                let node = NodeKey::new(doc_uri.clone(), path.clone(), method);
                let detail = operation_detail(&doc, &node, item, operation)?;
                self.store.fill_node(node.clone(), detail);

                for edge in link_edges(&mut ctx, &node, operation)? {
                    self.store.insert_edge(edge);
                }
                for edge in backlink_edges(&mut ctx, &node, operation)? {
                    self.store.insert_edge(edge);
                }
            }
        }

        let referenced = ctx.external;
        self.docs.insert(doc_uri, doc);

        for uri in referenced {
            if !self.docs.contains_key(&uri) {
                self.crawl(uri)?;
            }
        }
        Ok(())
    }
}
