//! Node, edge and payload types of the operation graph.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use url::Url;

use crate::document::{HttpMethod, ParamLocation, Parameter, RequestBody, SecurityScheme};
use crate::loader::{normalize_uri, LoaderError};

/// Identity of one operation across every crawled document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeKey {
    pub doc_uri: Url,
    pub path: String,
    pub method: HttpMethod,
}

impl NodeKey {
    pub fn new(doc_uri: Url, path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            doc_uri,
            path: path.into(),
            method,
        }
    }

    /// Parse the `METHOD path @ document` form produced by `Display`.
    ///
    /// The document part may be a URL or a local path.
    pub fn parse(s: &str) -> Result<Self, LoaderError> {
        let malformed = || LoaderError::invalid_uri(s, "expected `METHOD path @ document`");

        let (method, rest) = s.trim().split_once(' ').ok_or_else(malformed)?;
        let (path, doc) = rest.rsplit_once(" @ ").ok_or_else(malformed)?;
        let method = method
            .parse::<HttpMethod>()
            .map_err(|message| LoaderError::invalid_uri(s, message))?;

        Ok(Self::new(normalize_uri(doc.trim())?, path.trim(), method))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {}",
            self.method.as_str().to_ascii_uppercase(),
            self.path,
            self.doc_uri
        )
    }
}

/// Identity of an edge between two given nodes.
///
/// Two nodes may be joined by several edges as long as their keys differ.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EdgeKey {
    /// `None` for anonymous edges, which belong to every chain.
    pub chain_id: Option<String>,
    pub response_id: String,
}

impl EdgeKey {
    pub fn new(chain_id: Option<String>, response_id: impl Into<String>) -> Self {
        Self {
            chain_id,
            response_id: response_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkType {
    Link,
    Backlink,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Link => write!(f, "LINK"),
            LinkType::Backlink => write!(f, "BACKLINK"),
        }
    }
}

/// Normalized payload of an edge, whichever declaration style produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDetail {
    pub link_type: LinkType,
    /// Link name, or backlink operation entry name.
    pub name: String,
    pub description: Option<String>,
    /// Destination parameter -> constant or runtime expression.
    pub parameters: BTreeMap<String, Value>,
    pub request_body: Option<Value>,
    /// Request body JSON pointer -> runtime expression.
    pub request_body_parameters: BTreeMap<String, String>,
}

/// Uniqueness key of a parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ParamKey {
    pub name: String,
    pub location: ParamLocation,
}

impl ParamKey {
    pub fn new(name: impl Into<String>, location: ParamLocation) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

impl From<&Parameter> for ParamKey {
    fn from(param: &Parameter) -> Self {
        ParamKey::new(param.name.clone(), param.location)
    }
}

/// A security scheme together with the name it is declared under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResolvedSecurityScheme {
    pub name: String,
    pub scheme: SecurityScheme,
}

/// Outer set: alternatives. Inner set: schemes required together.
pub type SecurityAlternatives = BTreeSet<BTreeSet<ResolvedSecurityScheme>>;

/// Normalized payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDetail {
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Path item parameters overlaid with the operation's own.
    #[serde(serialize_with = "values_as_list")]
    pub parameters: BTreeMap<ParamKey, Parameter>,
    pub request_body: Option<RequestBody>,
    pub security_schemes: SecurityAlternatives,
}

impl OperationDetail {
    pub fn parameter(&self, name: &str, location: ParamLocation) -> Option<&Parameter> {
        self.parameters.get(&ParamKey::new(name, location))
    }

    /// No security requirement applies to the operation.
    pub fn is_public(&self) -> bool {
        self.security_schemes.is_empty()
    }
}

/// Borrowed view of one edge.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EdgeRef<'a> {
    pub from: &'a NodeKey,
    pub to: &'a NodeKey,
    pub key: &'a EdgeKey,
    pub detail: &'a EdgeDetail,
}

fn values_as_list<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    serializer.collect_seq(map.values())
}
