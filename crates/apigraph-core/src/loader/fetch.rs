//! Raw document retrieval.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs;
use url::Url;

use crate::config::HttpConfig;

use super::error::LoaderError;

/// Retrieves the raw text of a document.
///
/// Implementations receive normalized URIs (absolute, no fragment).
pub trait Fetch {
    fn fetch(&self, uri: &Url) -> Result<String, LoaderError>;
}

impl<F: Fetch + ?Sized> Fetch for Box<F> {
    fn fetch(&self, uri: &Url) -> Result<String, LoaderError> {
        (**self).fetch(uri)
    }
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, uri: &Url) -> Result<String, LoaderError> {
        (**self).fetch(uri)
    }
}

/// Reads `file://` URIs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl Fetch for FileFetcher {
    fn fetch(&self, uri: &Url) -> Result<String, LoaderError> {
        if uri.scheme() != "file" {
            return Err(LoaderError::UnsupportedScheme(uri.scheme().to_string()));
        }
        let path = uri
            .to_file_path()
            .map_err(|_| LoaderError::invalid_uri(uri.as_str(), "not a local file path"))?;
        fs::read_to_string(&path).map_err(|e| LoaderError::io(path, e))
    }
}

/// Fetches `http` and `https` URIs with a blocking client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, LoaderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LoaderError::Http {
                uri: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, uri: &Url) -> Result<String, LoaderError> {
        let http_error = |e: reqwest::Error| LoaderError::Http {
            uri: uri.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(uri.clone()).send().map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoaderError::HttpStatus {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(http_error)
    }
}

/// Dispatches on the URI scheme: `file` to disk, `http`/`https` to the network.
pub struct SchemeFetcher {
    file: FileFetcher,
    http: HttpFetcher,
}

impl SchemeFetcher {
    pub fn new(http: HttpFetcher) -> Self {
        Self {
            file: FileFetcher,
            http,
        }
    }
}

impl Fetch for SchemeFetcher {
    fn fetch(&self, uri: &Url) -> Result<String, LoaderError> {
        match uri.scheme() {
            "file" => self.file.fetch(uri),
            "http" | "https" => self.http.fetch(uri),
            other => Err(LoaderError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Serves documents registered in memory.
///
/// Useful for embedding apigraph where documents do not live on disk, and
/// for tests that need cross-document setups with remote-looking URIs.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: RwLock<HashMap<String, String>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document, replacing any previous text for the same URI.
    pub fn insert(&self, uri: &Url, text: impl Into<String>) {
        self.documents.write().insert(key(uri), text.into());
    }

    pub fn with_document(self, uri: &Url, text: impl Into<String>) -> Self {
        self.insert(uri, text);
        self
    }

    /// How many times `uri` has been fetched.
    pub fn fetch_count(&self, uri: &Url) -> usize {
        self.fetches.lock().get(&key(uri)).copied().unwrap_or(0)
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, uri: &Url) -> Result<String, LoaderError> {
        let key = key(uri);
        *self.fetches.lock().entry(key.clone()).or_default() += 1;
        self.documents
            .read()
            .get(&key)
            .cloned()
            .ok_or(LoaderError::NotFound(key))
    }
}

fn key(uri: &Url) -> String {
    let mut uri = uri.clone();
    uri.set_fragment(None);
    uri.to_string()
}
