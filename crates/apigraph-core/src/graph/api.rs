use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

use crate::document::{OpenApiDocument, Operation};
use crate::loader::DocumentLoader;

use super::builder::GraphBuilder;
use super::chain::{chain_key, ChainCache, ChainSubgraph, ChainView};
use super::error::GraphError;
use super::store::Adjacency;
use super::types::{EdgeDetail, EdgeKey, EdgeRef, NodeKey, OperationDetail};

/// Immutable multigraph of operations, built from one or more documents.
///
/// Nodes are operations identified by [`NodeKey`]; edges are links and
/// backlinks identified by `(from, to, EdgeKey)`. The graph is safe to share
/// between threads once built.
#[derive(Debug)]
pub struct ApiGraph {
    docs: BTreeMap<Url, OpenApiDocument>,
    adjacency: Adjacency,
    chains: ChainCache,
}

impl ApiGraph {
    /// Crawl from `start` and build the graph.
    pub fn build<L: DocumentLoader + ?Sized>(start: &Url, loader: &L) -> Result<Self, GraphError> {
        GraphBuilder::new(loader).build(start)
    }

    pub(crate) fn new(docs: BTreeMap<Url, OpenApiDocument>, adjacency: Adjacency) -> Self {
        Self {
            docs,
            adjacency,
            chains: ChainCache::default(),
        }
    }

    /// Every crawled document, by URI.
    pub fn docs(&self) -> &BTreeMap<Url, OpenApiDocument> {
        &self.docs
    }

    /// All nodes in `NodeKey` order. Placeholders have no detail.
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeKey, Option<&OperationDetail>)> {
        self.adjacency
            .nodes()
            .iter()
            .map(|(key, detail)| (key, detail.as_ref()))
    }

    pub fn node(&self, key: &NodeKey) -> Option<&OperationDetail> {
        self.adjacency.nodes().get(key).and_then(Option::as_ref)
    }

    pub fn contains_node(&self, key: &NodeKey) -> bool {
        self.adjacency.nodes().contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.nodes().len()
    }

    /// All edges in `(from, to, key)` order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> {
        self.adjacency
            .all_outgoing()
            .iter()
            .flat_map(|(from, targets)| {
                targets.iter().map(move |((to, key), detail)| EdgeRef {
                    from,
                    to,
                    key,
                    detail,
                })
            })
    }

    /// Edges from `from` to `to`, by key.
    pub fn edges_between<'a>(
        &'a self,
        from: &NodeKey,
        to: &'a NodeKey,
    ) -> impl Iterator<Item = (&'a EdgeKey, &'a EdgeDetail)> + 'a {
        self.adjacency
            .outgoing(from)
            .into_iter()
            .flatten()
            .filter(move |((target, _), _)| target == to)
            .map(|((_, key), detail)| (key, detail))
    }

    pub fn edge(&self, from: &NodeKey, to: &NodeKey, key: &EdgeKey) -> Option<&EdgeDetail> {
        self.adjacency.edge(from, to, key)
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.edge_count()
    }

    /// The raw operation behind `key`.
    pub fn get_operation(&self, key: &NodeKey) -> Result<&Operation, GraphError> {
        let doc = self
            .docs
            .get(&key.doc_uri)
            .ok_or_else(|| GraphError::DocumentNotLoaded(key.doc_uri.to_string()))?;
        doc.operation(&key.path, key.method)
            .ok_or_else(|| GraphError::NodeNotFound(key.clone()))
    }

    /// Memoized view of the edges belonging to `chain_id`, plus anonymous
    /// edges when `include_anonymous` is set.
    pub fn chain_view(&self, chain_id: Option<&str>, include_anonymous: bool) -> Arc<ChainView> {
        self.chains
            .get_or_build(&self.adjacency, chain_key(chain_id, include_anonymous))
    }

    /// `node` and all of its ancestors within the chain, as an induced subgraph.
    ///
    /// Fails with [`GraphError::CircularDependency`] when those nodes contain
    /// a directed cycle.
    pub fn ancestors_of(
        &self,
        node: &NodeKey,
        chain_id: Option<&str>,
        include_anonymous: bool,
    ) -> Result<ChainSubgraph<'_>, GraphError> {
        if !self.contains_node(node) {
            return Err(GraphError::NodeNotFound(node.clone()));
        }
        let view = self.chain_view(chain_id, include_anonymous);
        ChainSubgraph::resolve(&self.adjacency, view, node)
    }

    /// Number of chain views materialized so far.
    pub fn cached_chain_views(&self) -> usize {
        self.chains.len()
    }
}
