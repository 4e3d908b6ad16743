pub mod config;
pub mod document;
pub mod graph;
pub mod loader;

pub use config::Config;
pub use document::OpenApiDocument;
pub use graph::{ApiGraph, GraphBuilder, GraphError, NodeKey};
pub use loader::{normalize_uri, DocumentLoader, Loader};
