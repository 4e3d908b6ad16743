//! Dependency chain views and ancestor subgraphs.
//!
//! A chain view keeps the edges whose chain id belongs to a matched set:
//! `{chain}` or `{chain, anonymous}`. Views are built lazily, once per
//! matched set, and shared by every query using that set.

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use super::error::GraphError;
use super::store::Adjacency;
use super::types::{EdgeKey, EdgeRef, NodeKey};

/// The chain ids a view matches. `None` stands for anonymous edges.
pub type ChainKey = BTreeSet<Option<String>>;

pub fn chain_key(chain_id: Option<&str>, include_anonymous: bool) -> ChainKey {
    let mut key = ChainKey::new();
    key.insert(chain_id.map(String::from));
    if include_anonymous {
        key.insert(None);
    }
    key
}

/// Read-only view of the graph restricted to one [`ChainKey`].
#[derive(Debug)]
pub struct ChainView {
    matched: ChainKey,
    /// node -> nodes with a matching edge into it
    predecessors: BTreeMap<NodeKey, BTreeSet<NodeKey>>,
    edge_count: usize,
}

impl ChainView {
    fn build(adjacency: &Adjacency, matched: ChainKey) -> Self {
        let mut predecessors: BTreeMap<NodeKey, BTreeSet<NodeKey>> = BTreeMap::new();
        let mut edge_count = 0;

        for (from, targets) in adjacency.all_outgoing() {
            for (to, key) in targets.keys() {
                if matched.contains(&key.chain_id) {
                    predecessors.entry(to.clone()).or_default().insert(from.clone());
                    edge_count += 1;
                }
            }
        }

        tracing::debug!(chains = ?matched, edges = edge_count, "Materialized chain view");
        Self {
            matched,
            predecessors,
            edge_count,
        }
    }

    pub fn matched(&self) -> &ChainKey {
        &self.matched
    }

    pub fn matches(&self, key: &EdgeKey) -> bool {
        self.matched.contains(&key.chain_id)
    }

    pub fn predecessors(&self, node: &NodeKey) -> impl Iterator<Item = &NodeKey> {
        self.predecessors.get(node).into_iter().flatten()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// `node` and every node with a directed path to it.
    fn ancestors_and_self(&self, node: &NodeKey) -> BTreeSet<NodeKey> {
        let mut seen = BTreeSet::from([node.clone()]);
        let mut queue = VecDeque::from([node]);

        while let Some(current) = queue.pop_front() {
            for pred in self.predecessors(current) {
                if seen.insert(pred.clone()) {
                    queue.push_back(pred);
                }
            }
        }
        seen
    }

    /// Successor lists restricted to `nodes`.
    fn successors_within<'a>(
        &'a self,
        nodes: &'a BTreeSet<NodeKey>,
    ) -> BTreeMap<&'a NodeKey, Vec<&'a NodeKey>> {
        let mut successors: BTreeMap<&NodeKey, Vec<&NodeKey>> = BTreeMap::new();
        for to in nodes {
            for from in self.predecessors(to).filter(|p| nodes.contains(*p)) {
                successors.entry(from).or_default().push(to);
            }
        }
        successors
    }
}

/// Lazily filled cache of chain views, owned by one graph.
#[derive(Debug, Default)]
pub struct ChainCache {
    views: RwLock<HashMap<ChainKey, Arc<ChainView>>>,
}

impl ChainCache {
    pub fn get_or_build(&self, adjacency: &Adjacency, key: ChainKey) -> Arc<ChainView> {
        if let Some(view) = self.views.read().get(&key) {
            return Arc::clone(view);
        }

        let mut views = self.views.write();
        Arc::clone(
            views
                .entry(key.clone())
                .or_insert_with(|| Arc::new(ChainView::build(adjacency, key))),
        )
    }

    pub fn len(&self) -> usize {
        self.views.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.read().is_empty()
    }
}

/// Induced subgraph over a node and its ancestors within one chain view.
#[derive(Debug, Clone)]
pub struct ChainSubgraph<'g> {
    root: NodeKey,
    view: Arc<ChainView>,
    nodes: BTreeSet<NodeKey>,
    adjacency: &'g Adjacency,
}

impl<'g> ChainSubgraph<'g> {
    pub(crate) fn resolve(
        adjacency: &'g Adjacency,
        view: Arc<ChainView>,
        root: &NodeKey,
    ) -> Result<Self, GraphError> {
        let nodes = view.ancestors_and_self(root);

        if let Some(cycle) = find_cycle(&nodes, &view.successors_within(&nodes)) {
            let chain = view.matched.iter().flatten().next().cloned();
            return Err(GraphError::CircularDependency {
                node: root.clone(),
                chain,
                cycle,
            });
        }

        Ok(Self {
            root: root.clone(),
            view,
            nodes,
            adjacency,
        })
    }

    /// The node the subgraph was computed for.
    pub fn root(&self) -> &NodeKey {
        &self.root
    }

    pub fn chain_key(&self) -> &ChainKey {
        self.view.matched()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: &NodeKey) -> bool {
        self.nodes.contains(node)
    }

    /// Matching edges with both ends in the subgraph.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> + '_ {
        self.nodes.iter().flat_map(move |from| {
            self.adjacency
                .outgoing(from)
                .into_iter()
                .flatten()
                .filter(move |((to, key), _)| self.nodes.contains(to) && self.view.matches(key))
                .map(move |((to, key), detail)| EdgeRef {
                    from,
                    to,
                    key,
                    detail,
                })
        })
    }

    /// Nodes ordered so that every prerequisite comes before its dependents.
    ///
    /// Among nodes whose prerequisites are all placed, the smallest
    /// [`NodeKey`] goes first. The root is always last.
    pub fn topological_order(&self) -> Vec<&NodeKey> {
        let successors = self.view.successors_within(&self.nodes);
        let mut pending: BTreeMap<&NodeKey, usize> = self
            .nodes
            .iter()
            .map(|node| {
                let count = self
                    .view
                    .predecessors(node)
                    .filter(|p| self.nodes.contains(*p))
                    .count();
                (node, count)
            })
            .collect();

        let mut ready: BTreeSet<&NodeKey> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(node) = ready.pop_first() {
            order.push(node);
            for next in successors.get(node).into_iter().flatten() {
                if let Some(count) = pending.get_mut(next) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*next);
                    }
                }
            }
        }
        order
    }
}

enum Mark {
    Visiting,
    Done,
}

/// First directed cycle found, as a closed walk `[a, b, ..., a]`.
fn find_cycle(
    nodes: &BTreeSet<NodeKey>,
    successors: &BTreeMap<&NodeKey, Vec<&NodeKey>>,
) -> Option<Vec<NodeKey>> {
    let mut marks: HashMap<&NodeKey, Mark> = HashMap::new();

    for start in nodes {
        if marks.contains_key(start) {
            continue;
        }
        marks.insert(start, Mark::Visiting);
        let mut stack: Vec<(&NodeKey, usize)> = vec![(start, 0)];

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let next = successors.get(node).and_then(|s| s.get(top.1)).copied();
            top.1 += 1;

            match next {
                None => {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                }
                Some(next) => match marks.get(next) {
                    Some(Mark::Visiting) => {
                        let start = stack.iter().position(|(k, _)| *k == next).unwrap_or(0);
                        let mut cycle: Vec<NodeKey> =
                            stack[start..].iter().map(|(k, _)| (*k).clone()).collect();
                        cycle.push(next.clone());
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::Visiting);
                        stack.push((next, 0));
                    }
                },
            }
        }
    }
    None
}
