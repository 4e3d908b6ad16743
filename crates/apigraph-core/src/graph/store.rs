//! Adjacency storage for the operation multigraph.
//!
//! [`GraphStore`] is the mutable side, owned by the builder while crawling.
//! Freezing it yields an [`Adjacency`] that only [`ApiGraph`](super::ApiGraph)
//! holds and that exposes no mutation.

use std::collections::{BTreeMap, BTreeSet};

use super::edges::CandidateEdge;
use super::types::{EdgeDetail, EdgeKey, LinkType, NodeKey, OperationDetail};

/// Outgoing edges of one node, by `(target, key)`.
pub type Targets = BTreeMap<(NodeKey, EdgeKey), EdgeDetail>;

/// Outcome of inserting a candidate edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Inserted,
    /// An edge with the same `(from, to, key)` was overwritten.
    Replaced,
    /// A link lost against an existing backlink with the same identity.
    Discarded,
}

#[derive(Debug, Default)]
pub struct Adjacency {
    /// `None` marks a placeholder: referenced, but not (yet) filled by a crawl.
    nodes: BTreeMap<NodeKey, Option<OperationDetail>>,
    outgoing: BTreeMap<NodeKey, Targets>,
    /// Reverse index: node -> `(source, key)` of every edge arriving at it.
    incoming: BTreeMap<NodeKey, BTreeSet<(NodeKey, EdgeKey)>>,
}

impl Adjacency {
    pub fn nodes(&self) -> &BTreeMap<NodeKey, Option<OperationDetail>> {
        &self.nodes
    }

    pub fn outgoing(&self, from: &NodeKey) -> Option<&Targets> {
        self.outgoing.get(from)
    }

    pub fn all_outgoing(&self) -> &BTreeMap<NodeKey, Targets> {
        &self.outgoing
    }

    pub fn incoming(&self, to: &NodeKey) -> impl Iterator<Item = &(NodeKey, EdgeKey)> {
        self.incoming.get(to).into_iter().flatten()
    }

    pub fn edge(&self, from: &NodeKey, to: &NodeKey, key: &EdgeKey) -> Option<&EdgeDetail> {
        self.outgoing
            .get(from)
            .and_then(|targets| targets.get(&(to.clone(), key.clone())))
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeMap::len).sum()
    }
}

/// Graph under construction.
#[derive(Debug, Default)]
pub struct GraphStore {
    adjacency: Adjacency,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` as a placeholder unless it is already known.
    pub fn ensure_node(&mut self, key: &NodeKey) {
        if !self.adjacency.nodes.contains_key(key) {
            self.adjacency.nodes.insert(key.clone(), None);
        }
    }

    /// Attach `detail` to `key`. An already filled node keeps its detail.
    pub fn fill_node(&mut self, key: NodeKey, detail: OperationDetail) {
        let slot = self.adjacency.nodes.entry(key).or_insert(None);
        if slot.is_none() {
            *slot = Some(detail);
        }
    }

    /// Insert an edge, applying the precedence rules.
    ///
    /// A backlink is never replaced by a link with the same `(from, to, key)`.
    /// Any other collision is won by the newer edge.
    pub fn insert_edge(&mut self, edge: CandidateEdge) -> Insertion {
        let CandidateEdge {
            from,
            to,
            key,
            detail,
        } = edge;

        self.ensure_node(&from);
        self.ensure_node(&to);

        let targets = self.adjacency.outgoing.entry(from.clone()).or_default();
        let slot = (to.clone(), key.clone());

        if let Some(existing) = targets.get(&slot) {
            if existing.link_type == LinkType::Backlink && detail.link_type == LinkType::Link {
                tracing::debug!(
                    from = %from, to = %to, response = %key.response_id, link = %detail.name,
                    "Discarding link shadowed by backlink"
                );
                return Insertion::Discarded;
            }
        }

        let replaced = targets.insert(slot, detail);
        self.adjacency
            .incoming
            .entry(to.clone())
            .or_default()
            .insert((from.clone(), key.clone()));

        match replaced {
            Some(previous) => {
                tracing::debug!(
                    from = %from, to = %to, response = %key.response_id, replaced = %previous.name,
                    "Overwriting edge"
                );
                Insertion::Replaced
            }
            None => Insertion::Inserted,
        }
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    pub fn freeze(self) -> Adjacency {
        self.adjacency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HttpMethod;
    use url::Url;

    fn node(path: &str) -> NodeKey {
        NodeKey::new(
            Url::parse("https://example.com/api.yaml").unwrap(),
            path,
            HttpMethod::Get,
        )
    }

    fn candidate(link_type: LinkType, name: &str, chain: Option<&str>) -> CandidateEdge {
        CandidateEdge {
            from: node("/a"),
            to: node("/b"),
            key: EdgeKey::new(chain.map(String::from), "200"),
            detail: EdgeDetail {
                link_type,
                name: name.to_string(),
                description: None,
                parameters: BTreeMap::new(),
                request_body: None,
                request_body_parameters: BTreeMap::new(),
            },
        }
    }

    fn only_detail(store: &GraphStore) -> &EdgeDetail {
        let targets = store.adjacency().outgoing(&node("/a")).unwrap();
        assert_eq!(targets.len(), 1);
        targets.values().next().unwrap()
    }

    #[test]
    fn test_backlink_beats_link_in_either_order() {
        let mut store = GraphStore::new();
        store.insert_edge(candidate(LinkType::Link, "link", None));
        assert_eq!(
            store.insert_edge(candidate(LinkType::Backlink, "backlink", None)),
            Insertion::Replaced
        );
        assert_eq!(only_detail(&store).link_type, LinkType::Backlink);

        let mut store = GraphStore::new();
        store.insert_edge(candidate(LinkType::Backlink, "backlink", None));
        assert_eq!(
            store.insert_edge(candidate(LinkType::Link, "link", None)),
            Insertion::Discarded
        );
        assert_eq!(only_detail(&store).link_type, LinkType::Backlink);
    }

    #[test]
    fn test_same_type_collision_last_write_wins() {
        let mut store = GraphStore::new();
        store.insert_edge(candidate(LinkType::Link, "first", None));
        store.insert_edge(candidate(LinkType::Link, "second", None));
        assert_eq!(only_detail(&store).name, "second");

        let mut store = GraphStore::new();
        store.insert_edge(candidate(LinkType::Backlink, "first", None));
        store.insert_edge(candidate(LinkType::Backlink, "second", None));
        assert_eq!(only_detail(&store).name, "second");
    }

    #[test]
    fn test_different_keys_coexist() {
        let mut store = GraphStore::new();
        store.insert_edge(candidate(LinkType::Link, "anon", None));
        store.insert_edge(candidate(LinkType::Link, "v1", Some("v1")));

        let adjacency = store.freeze();
        assert_eq!(adjacency.edge_count(), 2);
        assert_eq!(adjacency.incoming(&node("/b")).count(), 2);
    }

    #[test]
    fn test_edge_endpoints_become_placeholders() {
        let mut store = GraphStore::new();
        store.insert_edge(candidate(LinkType::Link, "l", None));

        let nodes = store.adjacency().nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.values().all(Option::is_none));
    }
}
