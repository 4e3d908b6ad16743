use std::collections::HashMap;

use apigraph_core::document::{HttpMethod, OpenApiDocument};
use apigraph_core::graph::{EdgeKey, LinkType};
use apigraph_core::loader::{DocumentLoader, LoaderError, MemoryFetcher};
use apigraph_core::{ApiGraph, GraphError, Loader, NodeKey};
use parking_lot::Mutex;
use url::Url;

const USERS: &str = "https://example.com/specs/users.yaml";
const REPOS: &str = "https://example.com/specs/repos.yaml";
const ACCOUNTS: &str = "https://example.com/specs/accounts.yaml";

/// Counts how often each document is loaded.
struct CountingLoader {
    inner: Loader<MemoryFetcher>,
    loads: Mutex<HashMap<String, usize>>,
}

impl CountingLoader {
    fn new() -> Self {
        let fetcher = MemoryFetcher::new()
            .with_document(&url(USERS), include_str!("fixtures/crossdoc/users.yaml"))
            .with_document(&url(REPOS), include_str!("fixtures/crossdoc/repos.yaml"))
            .with_document(&url(ACCOUNTS), include_str!("fixtures/crossdoc/accounts.yaml"));
        Self {
            inner: Loader::new(fetcher),
            loads: Mutex::new(HashMap::new()),
        }
    }

    fn loads(&self, uri: &str) -> usize {
        self.loads.lock().get(uri).copied().unwrap_or(0)
    }
}

impl DocumentLoader for CountingLoader {
    fn load(&self, uri: &Url) -> Result<OpenApiDocument, LoaderError> {
        *self.loads.lock().entry(uri.to_string()).or_default() += 1;
        self.inner.load(uri)
    }
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn test_crawls_every_referenced_document_once() {
    let loader = CountingLoader::new();
    let graph = ApiGraph::build(&url(USERS), &loader).unwrap();

    let docs: Vec<&str> = graph.docs().keys().map(Url::as_str).collect();
    assert_eq!(docs, vec![ACCOUNTS, REPOS, USERS]);

    for doc in [USERS, REPOS, ACCOUNTS] {
        assert_eq!(loader.loads(doc), 1, "{doc} should be loaded once");
    }
}

#[test]
fn test_circular_references_terminate_from_either_end() {
    let loader = CountingLoader::new();
    let from_repos = ApiGraph::build(&url(REPOS), &loader).unwrap();
    assert_eq!(from_repos.docs().len(), 3);

    let from_users = ApiGraph::build(&url(USERS), &CountingLoader::new()).unwrap();
    assert_eq!(from_users.node_count(), from_repos.node_count());
    assert_eq!(from_users.edge_count(), from_repos.edge_count());
}

#[test]
fn test_cross_document_edges() {
    let graph = ApiGraph::build(&url(USERS), &CountingLoader::new()).unwrap();
    let get_user = NodeKey::new(url(USERS), "/users/{username}", HttpMethod::Get);
    let list_repos = NodeKey::new(url(REPOS), "/repos/{username}", HttpMethod::Get);
    let account = NodeKey::new(url(ACCOUNTS), "/accounts/{id}", HttpMethod::Get);

    let forward = graph
        .edge(&get_user, &list_repos, &EdgeKey::new(None, "200"))
        .unwrap();
    assert_eq!(forward.name, "repositories");

    let back = graph
        .edge(&list_repos, &get_user, &EdgeKey::new(None, "200"))
        .unwrap();
    assert_eq!(back.name, "owner");

    // relative document reference, resolved against repos.yaml
    assert!(graph
        .edge(&list_repos, &account, &EdgeKey::new(Some("accounts".into()), "200"))
        .is_some());
    assert!(graph.node(&account).is_some());
}

#[test]
fn test_cross_document_backlink_via_component_ref() {
    let graph = ApiGraph::build(&url(USERS), &CountingLoader::new()).unwrap();
    let get_user = NodeKey::new(url(USERS), "/users/{username}", HttpMethod::Get);
    let create_repo = NodeKey::new(url(REPOS), "/repos/{username}", HttpMethod::Post);

    let detail = graph
        .edge(&get_user, &create_repo, &EdgeKey::new(Some("default".into()), "200"))
        .unwrap();
    assert_eq!(detail.link_type, LinkType::Backlink);
    assert_eq!(detail.name, "user");
    assert_eq!(detail.description.as_deref(), Some("the owner must exist"));

    let chain = graph
        .ancestors_of(&create_repo, Some("default"), false)
        .unwrap();
    assert_eq!(chain.topological_order(), vec![&get_user, &create_repo]);
}

#[test]
fn test_dangling_reference_leaves_placeholder() {
    let graph = ApiGraph::build(&url(USERS), &CountingLoader::new()).unwrap();
    let archived = NodeKey::new(url(REPOS), "/repos/{username}/archived", HttpMethod::Get);

    assert!(graph.contains_node(&archived));
    assert!(graph.node(&archived).is_none());
    assert!(matches!(
        graph.get_operation(&archived),
        Err(GraphError::NodeNotFound(_))
    ));
    assert_eq!(graph.node_count(), 5);
    assert_eq!(graph.edge_count(), 5);
}

#[test]
fn test_unreachable_document_aborts_build() {
    let fetcher = MemoryFetcher::new()
        .with_document(&url(USERS), include_str!("fixtures/crossdoc/users.yaml"));
    let loader = Loader::new(fetcher);

    let err = ApiGraph::build(&url(USERS), &loader).unwrap_err();
    assert!(matches!(err, GraphError::Load(LoaderError::NotFound(ref uri)) if uri == REPOS));
}
