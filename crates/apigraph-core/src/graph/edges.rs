//! Translation of Link and Backlink declarations into candidate edges.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

use crate::document::{
    BacklinkChain, BacklinkOperation, BacklinkSelector, Link, Operation, ANONYMOUS_CHAIN_KEY,
};

use super::error::GraphError;
use super::index::OperationIds;
use super::reference::{decode_operation_ref, decode_response_ref, DecodedOperation};
use super::types::{EdgeDetail, EdgeKey, LinkType, NodeKey};

/// An edge waiting to be inserted into the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEdge {
    pub from: NodeKey,
    pub to: NodeKey,
    pub key: EdgeKey,
    pub detail: EdgeDetail,
}

/// What edge extraction needs to know about the document being crawled.
pub struct ExtractContext<'a> {
    pub doc_uri: &'a Url,
    pub operation_ids: &'a OperationIds,
    /// Documents referenced by absolute or relative references, to be crawled.
    pub external: BTreeSet<Url>,
}

impl<'a> ExtractContext<'a> {
    pub fn new(doc_uri: &'a Url, operation_ids: &'a OperationIds) -> Self {
        Self {
            doc_uri,
            operation_ids,
            external: BTreeSet::new(),
        }
    }

    fn node_for_operation_id(&self, operation_id: &str) -> Option<NodeKey> {
        self.operation_ids
            .get(operation_id)
            .map(|(path, method)| NodeKey::new(self.doc_uri.clone(), path.clone(), *method))
    }

    fn track(&mut self, decoded: DecodedOperation) -> NodeKey {
        if let Some(uri) = decoded.external {
            self.external.insert(uri);
        }
        decoded.node
    }
}

/// Edges declared by the response links of `operation`, leaving `from`.
pub fn link_edges(
    ctx: &mut ExtractContext<'_>,
    from: &NodeKey,
    operation: &Operation,
) -> Result<Vec<CandidateEdge>, GraphError> {
    let mut edges = Vec::new();

    for (response_id, response) in &operation.responses {
        for (name, link) in &response.links {
            let to = link_target(ctx, from, name, link)?;
            edges.push(CandidateEdge {
                from: from.clone(),
                to,
                key: EdgeKey::new(link.chain_id.clone(), response_id.clone()),
                detail: EdgeDetail {
                    link_type: LinkType::Link,
                    name: name.clone(),
                    description: link.description.clone(),
                    parameters: link.parameters.clone(),
                    request_body: link.request_body.clone(),
                    request_body_parameters: link.request_body_parameters.clone(),
                },
            });
        }
    }

    Ok(edges)
}

fn link_target(
    ctx: &mut ExtractContext<'_>,
    from: &NodeKey,
    name: &str,
    link: &Link,
) -> Result<NodeKey, GraphError> {
    let invalid = |reason: String| GraphError::InvalidLink {
        from: from.clone(),
        name: name.to_string(),
        reason,
    };

    match (&link.operation_id, &link.operation_ref) {
        (Some(operation_id), _) => ctx
            .node_for_operation_id(operation_id)
            .ok_or_else(|| invalid(format!("unknown operationId {operation_id:?}"))),
        (None, Some(operation_ref)) => decode_operation_ref(operation_ref, ctx.doc_uri)
            .map(|decoded| ctx.track(decoded))
            .map_err(|e| invalid(e.to_string())),
        (None, None) => Err(invalid(
            "link specifies neither operationId nor operationRef".to_string(),
        )),
    }
}

/// Edges declared by the backlinks of `operation`, arriving at `to`.
pub fn backlink_edges(
    ctx: &mut ExtractContext<'_>,
    to: &NodeKey,
    operation: &Operation,
) -> Result<Vec<CandidateEdge>, GraphError> {
    let mut edges = Vec::new();

    for (chain_key, chain) in &operation.backlinks {
        let chain_id = (chain_key != ANONYMOUS_CHAIN_KEY).then(|| chain_key.clone());

        if chain.operations.is_empty() {
            return Err(GraphError::InvalidBacklinksDeclaration {
                to: to.clone(),
                chain: chain_key.clone(),
                reason: "no operations declared".to_string(),
            });
        }
        check_selectors(to, chain)?;

        for (entry, backlink) in &chain.operations {
            let (from, response_id) = backlink_source(ctx, to, entry, backlink)?;
            edges.push(CandidateEdge {
                from,
                to: to.clone(),
                key: EdgeKey::new(chain_id.clone(), response_id),
                detail: backlink_detail(entry, backlink, chain),
            });
        }
    }

    Ok(edges)
}

fn selectors(chain: &BacklinkChain) -> impl Iterator<Item = &BacklinkSelector> {
    chain
        .parameters
        .values()
        .chain(chain.request_body.iter())
        .chain(chain.request_body_parameters.values())
}

/// Every selector must name an entry of the chain's `operations`.
fn check_selectors(to: &NodeKey, chain: &BacklinkChain) -> Result<(), GraphError> {
    match selectors(chain).find(|s| !chain.operations.contains_key(&s.from)) {
        Some(selector) => Err(GraphError::InvalidBacklinkOperation {
            to: to.clone(),
            name: selector.from.clone(),
            reason: "selector refers to an operation not declared in this backlink".to_string(),
        }),
        None => Ok(()),
    }
}

fn backlink_source(
    ctx: &mut ExtractContext<'_>,
    to: &NodeKey,
    entry: &str,
    backlink: &BacklinkOperation,
) -> Result<(NodeKey, String), GraphError> {
    let invalid = |reason: String| GraphError::InvalidBacklinkOperation {
        to: to.clone(),
        name: entry.to_string(),
        reason,
    };

    let forms = [
        backlink.response_ref.is_some(),
        backlink.operation_id.is_some(),
        backlink.operation_ref.is_some(),
    ];
    if forms.iter().filter(|set| **set).count() != 1 {
        return Err(invalid(
            "exactly one of responseRef, operationId or operationRef is required".to_string(),
        ));
    }

    match backlink {
        BacklinkOperation {
            response_ref: Some(response_ref),
            response: None,
            ..
        } => {
            let decoded =
                decode_response_ref(response_ref, ctx.doc_uri).map_err(|e| invalid(e.to_string()))?;
            Ok((ctx.track(decoded.operation), decoded.response_id))
        }
        BacklinkOperation {
            response_ref: Some(_),
            ..
        } => Err(invalid(
            "responseRef already names a response, drop `response`".to_string(),
        )),
        BacklinkOperation { response: None, .. } => Err(invalid(
            "operationId and operationRef need an explicit `response`".to_string(),
        )),
        BacklinkOperation {
            operation_id: Some(operation_id),
            response: Some(response),
            ..
        } => {
            let node = ctx
                .node_for_operation_id(operation_id)
                .ok_or_else(|| invalid(format!("unknown operationId {operation_id:?}")))?;
            Ok((node, response.clone()))
        }
        BacklinkOperation {
            operation_ref: Some(operation_ref),
            response: Some(response),
            ..
        } => {
            let decoded =
                decode_operation_ref(operation_ref, ctx.doc_uri).map_err(|e| invalid(e.to_string()))?;
            Ok((ctx.track(decoded), response.clone()))
        }
        _ => Err(invalid("no addressing form given".to_string())),
    }
}

/// Detail of the edge produced by one backlink entry: only the selectors
/// reading from that entry are kept.
fn backlink_detail(entry: &str, backlink: &BacklinkOperation, chain: &BacklinkChain) -> EdgeDetail {
    let from_entry = |selector: &&BacklinkSelector| selector.from == entry;

    let parameters: BTreeMap<String, Value> = chain
        .parameters
        .iter()
        .filter(|(_, selector)| from_entry(selector))
        .map(|(dest, selector)| (dest.clone(), Value::String(selector.select.clone())))
        .collect();

    let request_body = chain
        .request_body
        .as_ref()
        .filter(from_entry)
        .map(|selector| Value::String(selector.select.clone()));

    let request_body_parameters = chain
        .request_body_parameters
        .iter()
        .filter(|(_, selector)| from_entry(selector))
        .map(|(pointer, selector)| (pointer.clone(), selector.select.clone()))
        .collect();

    EdgeDetail {
        link_type: LinkType::Backlink,
        name: entry.to_string(),
        description: backlink
            .description
            .clone()
            .or_else(|| chain.description.clone()),
        parameters,
        request_body,
        request_body_parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HttpMethod;
    use serde_json::json;

    fn uri() -> Url {
        Url::parse("https://example.com/api.yaml").unwrap()
    }

    fn ids() -> OperationIds {
        OperationIds::from([
            ("createUser".to_string(), ("/users".to_string(), HttpMethod::Post)),
            ("getUser".to_string(), ("/users/{username}".to_string(), HttpMethod::Get)),
        ])
    }

    fn target() -> NodeKey {
        NodeKey::new(uri(), "/users/{username}", HttpMethod::Get)
    }

    fn operation(value: serde_json::Value) -> Operation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_link_by_operation_id() {
        let (uri, ids) = (uri(), ids());
        let mut ctx = ExtractContext::new(&uri, &ids);
        let from = NodeKey::new(uri.clone(), "/users", HttpMethod::Post);
        let op = operation(json!({"responses": {"201": {"links": {
            "user": {
                "operationId": "getUser",
                "parameters": {"username": "$response.body#/username"},
                "x-apigraph-chainId": "v1"
            }
        }}}}));

        let edges = link_edges(&mut ctx, &from, &op).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, target());
        assert_eq!(edges[0].key, EdgeKey::new(Some("v1".into()), "201"));
        assert_eq!(edges[0].detail.link_type, LinkType::Link);
        assert!(ctx.external.is_empty());
    }

    #[test]
    fn test_link_to_other_document_is_tracked() {
        let (uri, ids) = (uri(), ids());
        let mut ctx = ExtractContext::new(&uri, &ids);
        let op = operation(json!({"responses": {"200": {"links": {
            "repos": {"operationRef": "https://other.example.com/api.yaml#/paths/~1repos/get"}
        }}}}));

        let edges = link_edges(&mut ctx, &target(), &op).unwrap();
        assert_eq!(edges[0].to.doc_uri.as_str(), "https://other.example.com/api.yaml");
        assert_eq!(ctx.external.len(), 1);
    }

    #[test]
    fn test_link_without_target_is_invalid() {
        let (uri, ids) = (uri(), ids());
        let mut ctx = ExtractContext::new(&uri, &ids);
        let op = operation(json!({"responses": {"200": {"links": {"x": {}}}}}));
        assert!(matches!(
            link_edges(&mut ctx, &target(), &op),
            Err(GraphError::InvalidLink { .. })
        ));

        let op = operation(json!({"responses": {"200": {"links": {"x": {"operationId": "nope"}}}}}));
        assert!(matches!(
            link_edges(&mut ctx, &target(), &op),
            Err(GraphError::InvalidLink { .. })
        ));
    }

    #[test]
    fn test_backlink_entries_split_selectors() {
        let (uri, ids) = (uri(), ids());
        let mut ctx = ExtractContext::new(&uri, &ids);
        let op = operation(json!({
            "responses": {},
            "x-apigraph-backlinks": {
                "*": {
                    "operations": {
                        "created": {"operationId": "createUser", "response": 201},
                        "fetched": {"responseRef": "#/paths/~1users~1{username}/get/responses/200"}
                    },
                    "parameters": {
                        "username": {"from": "created", "select": "$response.body#/username"},
                        "etag": {"from": "fetched", "select": "$response.header.ETag"}
                    }
                }
            }
        }));
        let to = NodeKey::new(uri.clone(), "/users/{username}", HttpMethod::Put);

        let edges = backlink_edges(&mut ctx, &to, &op).unwrap();
        assert_eq!(edges.len(), 2);

        let created = edges.iter().find(|e| e.detail.name == "created").unwrap();
        assert_eq!(created.key, EdgeKey::new(None, "201"));
        assert_eq!(created.from.method, HttpMethod::Post);
        assert_eq!(
            created.detail.parameters,
            BTreeMap::from([("username".to_string(), json!("$response.body#/username"))])
        );

        let fetched = edges.iter().find(|e| e.detail.name == "fetched").unwrap();
        assert_eq!(fetched.key.response_id, "200");
        assert_eq!(fetched.detail.parameters.len(), 1);
        assert!(fetched.detail.parameters.contains_key("etag"));
    }

    #[test]
    fn test_backlink_selector_from_unknown_entry() {
        let (uri, ids) = (uri(), ids());
        let mut ctx = ExtractContext::new(&uri, &ids);
        let op = operation(json!({
            "responses": {},
            "x-apigraph-backlinks": {"v1": {
                "operations": {"created": {"operationId": "createUser", "response": "201"}},
                "requestBody": {"from": "missing", "select": "$response.body"}
            }}
        }));

        let err = backlink_edges(&mut ctx, &target(), &op).unwrap_err();
        assert!(matches!(err, GraphError::InvalidBacklinkOperation { ref name, .. } if name == "missing"));
    }

    #[test]
    fn test_backlink_addressing_forms() {
        let (uri, ids) = (uri(), ids());
        let mut ctx = ExtractContext::new(&uri, &ids);

        for entry in [
            json!({"operationId": "createUser"}),
            json!({}),
            json!({"operationId": "createUser", "operationRef": "#/paths/~1users/post", "response": "201"}),
            json!({"responseRef": "#/paths/~1users/post/responses/201", "response": "201"}),
        ] {
            let op = operation(json!({
                "responses": {},
                "x-apigraph-backlinks": {"v1": {"operations": {"e": entry}}}
            }));
            assert!(matches!(
                backlink_edges(&mut ctx, &target(), &op),
                Err(GraphError::InvalidBacklinkOperation { .. })
            ));
        }
    }

    #[test]
    fn test_empty_backlink_chain() {
        let (uri, ids) = (uri(), ids());
        let mut ctx = ExtractContext::new(&uri, &ids);
        let op = operation(json!({
            "responses": {},
            "x-apigraph-backlinks": {"v1": {"operations": {}}}
        }));
        assert!(matches!(
            backlink_edges(&mut ctx, &target(), &op),
            Err(GraphError::InvalidBacklinksDeclaration { .. })
        ));
    }
}
