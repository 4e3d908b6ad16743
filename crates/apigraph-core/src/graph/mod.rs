//! The operation graph: crawl, edge consolidation and chain queries.
//!
//! ```text
//! ApiGraph::build(uri, loader)
//!   └── GraphBuilder            crawl documents depth first
//!         ├── DocumentIndex     operationId -> (path, method), per document
//!         ├── reference         operationRef / responseRef decoding
//!         ├── edges             links and backlinks -> candidate edges
//!         ├── operation         merged parameters, security alternatives
//!         └── GraphStore        multigraph with link/backlink precedence
//!
//! ApiGraph::ancestors_of(node, chain, include_anonymous)
//!   └── ChainCache -> ChainView -> ChainSubgraph
//! ```

mod api;
mod builder;
mod chain;
mod edges;
mod error;
mod index;
mod operation;
pub mod reference;
mod store;
mod types;

pub use api::ApiGraph;
pub use builder::GraphBuilder;
pub use chain::{chain_key, ChainKey, ChainSubgraph, ChainView};
pub use edges::CandidateEdge;
pub use error::GraphError;
pub use index::{DocumentIndex, OperationIds};
pub use operation::{merge_parameters, resolve_security};
pub use store::{Insertion, Targets};
pub use types::{
    EdgeDetail, EdgeKey, EdgeRef, LinkType, NodeKey, OperationDetail, ParamKey,
    ResolvedSecurityScheme, SecurityAlternatives,
};

pub use crate::document::HttpMethod;
