//! Document loading: fetch, parse, expand `$ref`s, validate.
//!
//! The graph builder only sees [`DocumentLoader`]. The default
//! implementation, [`Loader`], is generic over a [`Fetch`] backend:
//!
//! ```text
//! Loader
//!   └── DiskCache          (remote URIs only, optional)
//!         └── SchemeFetcher
//!               ├── FileFetcher   file://
//!               └── HttpFetcher   http://, https://
//! ```
//!
//! [`MemoryFetcher`] can stand in for any of these.

mod cache;
mod error;
mod fetch;
pub mod refs;

pub use cache::DiskCache;
pub use error::LoaderError;
pub use fetch::{Fetch, FileFetcher, HttpFetcher, MemoryFetcher, SchemeFetcher};

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use url::Url;

use crate::config::Config;
use crate::document::OpenApiDocument;
use refs::RawDocuments;

/// Turns a document URI into a dereferenced, validated document.
///
/// Implementations must be idempotent for the same normalized URI.
pub trait DocumentLoader {
    fn load(&self, uri: &Url) -> Result<OpenApiDocument, LoaderError>;
}

impl<L: DocumentLoader + ?Sized> DocumentLoader for &L {
    fn load(&self, uri: &Url) -> Result<OpenApiDocument, LoaderError> {
        (**self).load(uri)
    }
}

/// Default [`DocumentLoader`].
///
/// Parsed raw documents are kept for the lifetime of the loader, so a
/// document referenced from several others is fetched once.
pub struct Loader<F> {
    fetcher: F,
    raw: RwLock<HashMap<Url, Arc<Value>>>,
}

impl<F: Fetch> Loader<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            raw: RwLock::new(HashMap::new()),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

impl Loader<Box<dyn Fetch>> {
    /// Build the file/http loader described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, LoaderError> {
        let fetcher = SchemeFetcher::new(HttpFetcher::new(&config.http)?);
        let fetcher: Box<dyn Fetch> = if config.cache.enabled {
            Box::new(
                DiskCache::new(fetcher, config.cache.dir_path())
                    .with_expiry(config.cache.expiry()),
            )
        } else {
            Box::new(fetcher)
        };
        Ok(Self::new(fetcher))
    }
}

impl<F: Fetch> RawDocuments for Loader<F> {
    fn raw(&self, uri: &Url) -> Result<Arc<Value>, LoaderError> {
        if let Some(value) = self.raw.read().get(uri) {
            return Ok(Arc::clone(value));
        }

        tracing::debug!(uri = %uri, "Fetching document");
        let text = self.fetcher.fetch(uri)?;
        let value = Arc::new(refs::parse_text(&text)?);
        self.raw.write().insert(uri.clone(), Arc::clone(&value));
        Ok(value)
    }
}

impl<F: Fetch> DocumentLoader for Loader<F> {
    fn load(&self, uri: &Url) -> Result<OpenApiDocument, LoaderError> {
        let (uri, _) = refs::split_target(uri);
        let raw = self.raw(&uri)?;
        let expanded = refs::expand(&raw, &uri, self)?;

        OpenApiDocument::from_value(expanded).map_err(|source| LoaderError::Document {
            uri: uri.to_string(),
            source,
        })
    }
}

/// Normalize a user supplied location into an absolute URI without fragment.
///
/// Absolute URLs are kept as they are; anything else is treated as a local
/// path and turned into a `file://` URL.
pub fn normalize_uri(location: &str) -> Result<Url, LoaderError> {
    let mut uri = match Url::parse(location) {
        // single letter schemes are Windows drive letters
        Ok(uri) if uri.scheme().len() > 1 => uri,
        _ => {
            let path = Path::new(location);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map_err(|e| LoaderError::io(path, e))?
                    .join(path)
            };
            Url::from_file_path(&absolute)
                .map_err(|_| LoaderError::invalid_uri(location, "not an absolute path"))?
        }
    };
    uri.set_fragment(None);
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /users/{username}:
    parameters:
      - $ref: "#/components/parameters/username"
    get:
      operationId: getUser
      responses:
        200:
          description: ok
          links:
            repos:
              $ref: "#/components/links/repos"
components:
  parameters:
    username: {name: username, in: path, required: true}
  links:
    repos: {operationId: getRepos}
"##;

    #[test]
    fn test_load_expands_refs() {
        let uri = Url::parse("https://example.com/api.yaml").unwrap();
        let loader = Loader::new(MemoryFetcher::new().with_document(&uri, DOC));

        let doc = loader.load(&uri).unwrap();
        let item = &doc.paths["/users/{username}"];
        assert_eq!(item.parameters[0].name, "username");

        let link = &item.get.as_ref().unwrap().responses["200"].links["repos"];
        assert_eq!(link.operation_id.as_deref(), Some("getRepos"));
    }

    #[test]
    fn test_load_fetches_once() {
        let uri = Url::parse("https://example.com/api.yaml").unwrap();
        let loader = Loader::new(MemoryFetcher::new().with_document(&uri, DOC));

        loader.load(&uri).unwrap();
        loader.load(&uri).unwrap();
        assert_eq!(loader.fetcher().fetch_count(&uri), 1);
    }

    #[test]
    fn test_invalid_document_is_reported() {
        let uri = Url::parse("https://example.com/api.yaml").unwrap();
        let fetcher = MemoryFetcher::new()
            .with_document(&uri, "openapi: 2.0\ninfo: {title: t, version: '1'}\npaths: {}\n");
        let loader = Loader::new(fetcher);

        assert!(matches!(loader.load(&uri), Err(LoaderError::Document { .. })));
    }

    #[test]
    fn test_normalize_uri() {
        let uri = normalize_uri("https://example.com/api.yaml#/paths").unwrap();
        assert_eq!(uri.as_str(), "https://example.com/api.yaml");

        let uri = normalize_uri("specs/api.yaml").unwrap();
        assert_eq!(uri.scheme(), "file");
        assert!(uri.path().ends_with("/specs/api.yaml"));
    }
}
