//! Output models for `--json`.
//!
//! Keys are rendered with `NodeKey`'s `METHOD path @ document` form so they
//! can be pasted back into other commands.

use apigraph_core::graph::{EdgeRef, LinkType, OperationDetail};
use apigraph_core::NodeKey;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// False for nodes only known as link targets.
    pub resolved: bool,
}

impl NodeSummary {
    pub fn new(key: &NodeKey, detail: Option<&OperationDetail>) -> Self {
        Self {
            key: key.to_string(),
            operation_id: detail.and_then(|d| d.operation_id.clone()),
            summary: detail.and_then(|d| d.summary.clone()),
            resolved: detail.is_some(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSummary {
    pub from: String,
    pub to: String,
    pub link_type: LinkType,
    pub chain_id: Option<String>,
    pub response_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<EdgeRef<'_>> for EdgeSummary {
    fn from(edge: EdgeRef<'_>) -> Self {
        Self {
            from: edge.from.to_string(),
            to: edge.to.to_string(),
            link_type: edge.detail.link_type,
            chain_id: edge.key.chain_id.clone(),
            response_id: edge.key.response_id.clone(),
            name: edge.detail.name.clone(),
            description: edge.detail.description.clone(),
        }
    }
}

/// Result of `apigraph deps`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    pub node: String,
    pub chain_id: Option<String>,
    pub include_anonymous: bool,
    /// Prerequisites first, the requested node last.
    pub order: Vec<NodeSummary>,
    pub edges: Vec<EdgeSummary>,
}
