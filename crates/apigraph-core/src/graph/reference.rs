//! Decoding of `operationRef` and `responseRef` strings.
//!
//! Only identity is computed here; the referenced document is never read.
//!
//! ```text
//! operationRef  [<document>]#/paths/<path>/<method>
//! responseRef   [<document>]#/paths/<path>/<method>/responses/<responseId>
//! ```
//!
//! `<path>` is a JSON pointer token (`~1` for `/`) that may also be
//! percent-encoded.

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

use crate::document::HttpMethod;

use super::types::NodeKey;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("cannot resolve {reference:?}: {message}")]
    Uri { reference: String, message: String },

    #[error("{reference:?} does not have the shape {expected}")]
    Shape {
        reference: String,
        expected: &'static str,
    },

    #[error("{reference:?} names unknown HTTP method {method:?}")]
    Method { reference: String, method: String },
}

/// A decoded reference to an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOperation {
    pub node: NodeKey,
    /// Set when the reference points into a document other than the current one.
    pub external: Option<Url>,
}

/// A decoded reference to one response of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResponse {
    pub operation: DecodedOperation,
    pub response_id: String,
}

const OPERATION_SHAPE: &str = "#/paths/{path}/{method}";
const RESPONSE_SHAPE: &str = "#/paths/{path}/{method}/responses/{responseId}";

pub fn decode_operation_ref(
    reference: &str,
    current: &Url,
) -> Result<DecodedOperation, ReferenceError> {
    let (doc_uri, tokens) = split_reference(reference, current, OPERATION_SHAPE)?;
    match tokens.as_slice() {
        [paths, path, method] if paths == "paths" => {
            operation(reference, current, doc_uri, path, method)
        }
        _ => Err(ReferenceError::Shape {
            reference: reference.to_string(),
            expected: OPERATION_SHAPE,
        }),
    }
}

pub fn decode_response_ref(
    reference: &str,
    current: &Url,
) -> Result<DecodedResponse, ReferenceError> {
    let (doc_uri, tokens) = split_reference(reference, current, RESPONSE_SHAPE)?;
    match tokens.as_slice() {
        [paths, path, method, responses, response_id]
            if paths == "paths" && responses == "responses" && !response_id.is_empty() =>
        {
            Ok(DecodedResponse {
                operation: operation(reference, current, doc_uri, path, method)?,
                response_id: response_id.clone(),
            })
        }
        _ => Err(ReferenceError::Shape {
            reference: reference.to_string(),
            expected: RESPONSE_SHAPE,
        }),
    }
}

fn operation(
    reference: &str,
    current: &Url,
    doc_uri: Url,
    path: &str,
    method: &str,
) -> Result<DecodedOperation, ReferenceError> {
    let method = method
        .parse::<HttpMethod>()
        .map_err(|_| ReferenceError::Method {
            reference: reference.to_string(),
            method: method.to_string(),
        })?;
    let external = (doc_uri != *current).then(|| doc_uri.clone());

    Ok(DecodedOperation {
        node: NodeKey::new(doc_uri, path, method),
        external,
    })
}

/// Resolve the document part against `current` and decode the pointer tokens.
fn split_reference(
    reference: &str,
    current: &Url,
    expected: &'static str,
) -> Result<(Url, Vec<String>), ReferenceError> {
    let uri_error = |message: String| ReferenceError::Uri {
        reference: reference.to_string(),
        message,
    };

    let (document, fragment) = match reference.split_once('#') {
        Some((document, fragment)) => (document, fragment),
        None => (reference, ""),
    };

    let mut doc_uri = if document.is_empty() {
        current.clone()
    } else {
        current.join(document).map_err(|e| uri_error(e.to_string()))?
    };
    doc_uri.set_fragment(None);

    let pointer = fragment.strip_prefix('/').ok_or_else(|| ReferenceError::Shape {
        reference: reference.to_string(),
        expected,
    })?;

    let tokens = pointer
        .split('/')
        .map(|token| {
            let token = token.replace("~1", "/").replace("~0", "~");
            percent_decode_str(&token)
                .decode_utf8()
                .map(|t| t.into_owned())
                .map_err(|e| uri_error(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((doc_uri, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> Url {
        Url::parse("https://example.com/specs/api.yaml").unwrap()
    }

    #[test]
    fn test_local_operation_ref() {
        let decoded =
            decode_operation_ref("#/paths/~12.0~1users~1{username}/get", &current()).unwrap();
        assert_eq!(decoded.node.path, "/2.0/users/{username}");
        assert_eq!(decoded.node.method, HttpMethod::Get);
        assert_eq!(decoded.node.doc_uri, current());
        assert_eq!(decoded.external, None);
    }

    #[test]
    fn test_percent_encoded_path() {
        let decoded =
            decode_operation_ref("#/paths/~1users~1%7Busername%7D/post", &current()).unwrap();
        assert_eq!(decoded.node.path, "/users/{username}");
    }

    #[test]
    fn test_absolute_reference_is_external() {
        let decoded = decode_operation_ref(
            "https://other.example.com/api.yaml#/paths/~1repos/get",
            &current(),
        )
        .unwrap();
        assert_eq!(
            decoded.external.unwrap().as_str(),
            "https://other.example.com/api.yaml"
        );
        assert_eq!(decoded.node.path, "/repos");
    }

    #[test]
    fn test_relative_document_joined_to_current() {
        let decoded = decode_operation_ref("other.yaml#/paths/~1repos/get", &current()).unwrap();
        assert_eq!(
            decoded.node.doc_uri.as_str(),
            "https://example.com/specs/other.yaml"
        );
        assert!(decoded.external.is_some());
    }

    #[test]
    fn test_response_ref() {
        let decoded =
            decode_response_ref("#/paths/~1users/post/responses/201", &current()).unwrap();
        assert_eq!(decoded.response_id, "201");
        assert_eq!(decoded.operation.node.method, HttpMethod::Post);
    }

    #[test]
    fn test_wrong_shapes() {
        assert!(matches!(
            decode_operation_ref("#/paths/~1users/post/responses/201", &current()),
            Err(ReferenceError::Shape { .. })
        ));
        assert!(matches!(
            decode_response_ref("#/paths/~1users/post", &current()),
            Err(ReferenceError::Shape { .. })
        ));
        assert!(matches!(
            decode_operation_ref("#/components/links/x", &current()),
            Err(ReferenceError::Shape { .. })
        ));
        assert!(matches!(
            decode_operation_ref("#/paths/~1users/fetch", &current()),
            Err(ReferenceError::Method { .. })
        ));
    }
}
