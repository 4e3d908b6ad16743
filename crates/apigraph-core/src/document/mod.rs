//! Typed OpenAPI 3 document model.
//!
//! The graph builder reads documents through these types only. They are
//! deserialized from an already dereferenced JSON value (see [`crate::loader`])
//! and validated once by [`OpenApiDocument::from_value`].
//!
//! Only the parts of OpenAPI the graph needs are modelled in detail:
//! paths, operations, parameters, request bodies, responses, links and
//! security schemes. Schemas, examples, headers and callbacks are kept as
//! opaque JSON.
//!
//! # apigraph extensions
//!
//! | field | on | meaning |
//! |---|---|---|
//! | `x-apigraph-chainId` | Link | dependency chain the link belongs to |
//! | `x-apigraph-requestBodyParameters` | Link | body JSON pointer -> runtime expression |
//! | `x-apigraph-backlinks` | Operation, Components | chain-keyed prerequisite declarations |
//!
//! Backlinks are declared from the target operation's side:
//!
//! ```yaml
//! x-apigraph-backlinks:
//!   v1:                       # chain id, "*" for anonymous backlinks
//!     operations:
//!       createUser:
//!         operationId: createUser
//!         response: "201"
//!     parameters:
//!       username:
//!         from: createUser
//!         select: $response.body#/username
//! ```

mod error;
mod validate;

pub use error::DocumentError;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Operation-level and Components-level field holding backlinks.
pub const BACKLINKS_EXTENSION: &str = "x-apigraph-backlinks";

/// Link field naming the dependency chain.
pub const CHAIN_ID_EXTENSION: &str = "x-apigraph-chainId";

/// Link field mapping request body pointers to runtime expressions.
pub const REQUEST_BODY_PARAMETERS_EXTENSION: &str = "x-apigraph-requestBodyParameters";

/// Backlinks map key declaring backlinks without a chain id.
pub const ANONYMOUS_CHAIN_KEY: &str = "*";

/// A security requirement: scheme name -> required scopes.
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// Root of an OpenAPI 3 document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(default)]
    pub servers: Vec<Server>,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(default)]
    pub components: Option<Components>,
    /// Document-wide default security; operations may override it.
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub external_docs: Option<ExternalDocumentation>,
}

impl OpenApiDocument {
    /// Deserialize and validate a fully dereferenced document.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let doc: OpenApiDocument = serde_json::from_value(value)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Look up an operation by path and method.
    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.get(path).and_then(|item| item.operation(method))
    }

    /// Security schemes declared under `components`, if any.
    pub fn security_schemes(&self) -> Option<&BTreeMap<String, SecurityScheme>> {
        self.components.as_ref().map(|c| &c.security_schemes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub terms_of_service: Option<String>,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Server {
    /// May be relative and may contain `{variable}` placeholders.
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, ServerVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerVariable {
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    pub default: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_docs: Option<ExternalDocumentation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDocumentation {
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
}

// =============================================================================
// PATHS AND OPERATIONS
// =============================================================================

/// The eight HTTP methods a path item can hold an operation for.
///
/// Declaration order is the order operations of a path item are visited in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    /// Lowercase name, as used for PathItem fields and JSON pointers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown HTTP method: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub get: Option<Operation>,
    #[serde(default)]
    pub put: Option<Operation>,
    #[serde(default)]
    pub post: Option<Operation>,
    #[serde(default)]
    pub delete: Option<Operation>,
    #[serde(default)]
    pub options: Option<Operation>,
    #[serde(default)]
    pub head: Option<Operation>,
    #[serde(default)]
    pub patch: Option<Operation>,
    #[serde(default)]
    pub trace: Option<Operation>,
    #[serde(default)]
    pub servers: Option<Vec<Server>>,
    /// Applied to every operation under this path unless overridden.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }

    /// Operations present on this path item, in [`HttpMethod::ALL`] order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(move |method| self.operation(method).map(|op| (method, op)))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_docs: Option<ExternalDocumentation>,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub operation_id: Option<String>,
    /// May override a matching PathItem parameter, never remove one.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: BTreeMap<String, Response>,
    #[serde(default)]
    pub callbacks: BTreeMap<String, Value>,
    #[serde(default)]
    pub deprecated: bool,
    /// `None` inherits the document default, `Some(vec![])` removes it.
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
    #[serde(default)]
    pub servers: Option<Vec<Server>>,
    #[serde(default, rename = "x-apigraph-backlinks")]
    pub backlinks: BTreeMap<String, BacklinkChain>,
}

// =============================================================================
// PARAMETERS AND BODIES
// =============================================================================

/// Where a parameter is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Query,
    Header,
    Path,
    Cookie,
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Header => "header",
            Self::Path => "path",
            Self::Cookie => "cookie",
        }
    }

    /// Serialization styles allowed for this location.
    pub fn allowed_styles(&self) -> &'static [ParameterStyle] {
        match self {
            Self::Query => &[
                ParameterStyle::Form,
                ParameterStyle::SpaceDelimited,
                ParameterStyle::PipeDelimited,
                ParameterStyle::DeepObject,
            ],
            Self::Header => &[ParameterStyle::Simple],
            Self::Path => &[
                ParameterStyle::Matrix,
                ParameterStyle::Label,
                ParameterStyle::Simple,
            ],
            Self::Cookie => &[ParameterStyle::Form],
        }
    }

    /// Style used when a parameter declares none.
    pub fn default_style(&self) -> ParameterStyle {
        match self {
            Self::Query | Self::Cookie => ParameterStyle::Form,
            Self::Header | Self::Path => ParameterStyle::Simple,
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

/// A parameter. Uniquely identified by `(name, in)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub allow_empty_value: bool,
    #[serde(default)]
    pub style: Option<ParameterStyle>,
    #[serde(default)]
    pub explode: Option<bool>,
    #[serde(default)]
    pub allow_reserved: bool,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(default)]
    pub examples: BTreeMap<String, Value>,
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

impl Parameter {
    /// Declared style, or the default for the parameter's location.
    pub fn effective_style(&self) -> ParameterStyle {
        self.style.unwrap_or_else(|| self.location.default_style())
    }

    /// Declared explode flag, defaulting to true only for `form` style.
    pub fn effective_explode(&self) -> bool {
        self.explode
            .unwrap_or(self.effective_style() == ParameterStyle::Form)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub example: Option<Value>,
    #[serde(default)]
    pub examples: BTreeMap<String, Value>,
    #[serde(default)]
    pub encoding: BTreeMap<String, Value>,
}

// =============================================================================
// RESPONSES, LINKS AND BACKLINKS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
    #[serde(default)]
    pub links: BTreeMap<String, Link>,
}

/// An OpenAPI Link from a response to a following operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default)]
    pub operation_ref: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub operation_id: Option<String>,
    /// Target parameter -> constant or runtime expression.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub request_body: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub server: Option<Server>,
    #[serde(
        default,
        rename = "x-apigraph-chainId",
        deserialize_with = "optional_scalar_string"
    )]
    pub chain_id: Option<String>,
    #[serde(default, rename = "x-apigraph-requestBodyParameters")]
    pub request_body_parameters: BTreeMap<String, String>,
}

/// Prerequisites of an operation for one chain, declared by the operation itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinkChain {
    #[serde(default)]
    pub description: Option<String>,
    /// Entry name -> address of the prerequisite response.
    #[serde(default)]
    pub operations: BTreeMap<String, BacklinkOperation>,
    #[serde(default)]
    pub parameters: BTreeMap<String, BacklinkSelector>,
    #[serde(default)]
    pub request_body: Option<BacklinkSelector>,
    /// Request body JSON pointer -> selector.
    #[serde(default)]
    pub request_body_parameters: BTreeMap<String, BacklinkSelector>,
}

/// Address of the response a backlink depends on.
///
/// Exactly one of `responseRef`, `operationId` + `response` or
/// `operationRef` + `response` is expected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinkOperation {
    #[serde(default)]
    pub response_ref: Option<String>,
    #[serde(default)]
    pub operation_ref: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub operation_id: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub response: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Picks a value out of the response produced by backlink entry `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklinkSelector {
    pub from: String,
    pub select: String,
}

// =============================================================================
// COMPONENTS AND SECURITY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, Value>,
    #[serde(default)]
    pub responses: BTreeMap<String, Value>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub examples: BTreeMap<String, Value>,
    #[serde(default)]
    pub request_bodies: BTreeMap<String, Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,
    #[serde(default)]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
    #[serde(default)]
    pub links: BTreeMap<String, Link>,
    #[serde(default)]
    pub callbacks: BTreeMap<String, Value>,
    #[serde(default, rename = "x-apigraph-backlinks")]
    pub backlinks: BTreeMap<String, BacklinkChain>,
}

/// A security scheme declared under `components.securitySchemes`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecurityScheme {
    #[serde(rename = "apiKey")]
    ApiKey {
        name: String,
        #[serde(rename = "in")]
        location: ParamLocation,
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename = "http")]
    Http {
        scheme: String,
        #[serde(default, rename = "bearerFormat")]
        bearer_format: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename = "oauth2")]
    OAuth2 {
        flows: OAuthFlows,
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename = "openIdConnect")]
    OpenIdConnect {
        #[serde(rename = "openIdConnectUrl")]
        open_id_connect_url: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl SecurityScheme {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ApiKey { .. } => "apiKey",
            Self::Http { .. } => "http",
            Self::OAuth2 { .. } => "oauth2",
            Self::OpenIdConnect { .. } => "openIdConnect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlows {
    #[serde(default)]
    pub implicit: Option<OAuthFlow>,
    #[serde(default)]
    pub password: Option<OAuthFlow>,
    #[serde(default)]
    pub client_credentials: Option<OAuthFlow>,
    #[serde(default)]
    pub authorization_code: Option<OAuthFlow>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlow {
    #[serde(default)]
    pub authorization_url: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default)]
    pub refresh_url: Option<String>,
    #[serde(default)]
    pub scopes: BTreeMap<String, String>,
}

/// Identifiers and versions written as bare YAML scalars (`version: 1.0`,
/// `response: 201`, `x-apigraph-chainId: 2`) are read as their text.
fn scalar_text<E: serde::de::Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(E::custom(format!("expected a scalar, found {other}"))),
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_text::<D::Error>(Value::deserialize(deserializer)?)?
        .ok_or_else(|| serde::de::Error::custom("expected a scalar, found null"))
}

fn optional_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value) => scalar_text(value),
        None => Ok(None),
    }
}
