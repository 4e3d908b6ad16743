//! Structural checks applied after deserialization.

use super::{
    BacklinkChain, DocumentError, Link, OpenApiDocument, Operation, ParamLocation, Parameter,
    PathItem,
};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

const VERSION_PATTERN: &str = r"^3\.\d+\.\d+$";
const RESPONSE_KEY_PATTERN: &str = r"^([1-5][X0-9]{2}|default)$";

/// Compiled once; a pattern that fails to compile matches nothing.
fn pattern_matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "Invalid validation pattern");
            None
        }
    })
    .as_ref()
    .is_some_and(|re| re.is_match(text))
}

fn is_supported_version(version: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    pattern_matches(&PATTERN, VERSION_PATTERN, version)
}

fn is_response_key(key: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    pattern_matches(&PATTERN, RESPONSE_KEY_PATTERN, key)
}

impl OpenApiDocument {
    /// Check the rules serde cannot express.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if !is_supported_version(&self.openapi) {
            return Err(DocumentError::invalid(
                "openapi",
                format!("unsupported OpenAPI version {:?}, expected 3.x.y", self.openapi),
            ));
        }

        for (path, item) in &self.paths {
            validate_path_item(path, item)?;
        }

        if let Some(components) = &self.components {
            for (name, link) in &components.links {
                validate_link(&format!("components/links/{name}"), link)?;
            }
            validate_backlinks("components/x-apigraph-backlinks", &components.backlinks)?;
        }

        Ok(())
    }
}

fn validate_path_item(path: &str, item: &PathItem) -> Result<(), DocumentError> {
    if !path.starts_with('/') {
        return Err(DocumentError::invalid(
            format!("paths/{path}"),
            "path must start with '/'",
        ));
    }

    validate_parameters(&format!("paths/{path}/parameters"), &item.parameters)?;

    for (method, operation) in item.operations() {
        validate_operation(&format!("paths/{path}/{method}"), operation)?;
    }
    Ok(())
}

fn validate_operation(location: &str, operation: &Operation) -> Result<(), DocumentError> {
    validate_parameters(&format!("{location}/parameters"), &operation.parameters)?;

    for (response_id, response) in &operation.responses {
        if !is_response_key(response_id) {
            return Err(DocumentError::invalid(
                format!("{location}/responses/{response_id}"),
                "response key must be an HTTP status code, a range like 2XX, or 'default'",
            ));
        }
        for (name, link) in &response.links {
            validate_link(&format!("{location}/responses/{response_id}/links/{name}"), link)?;
        }
    }

    validate_backlinks(&format!("{location}/x-apigraph-backlinks"), &operation.backlinks)
}

fn validate_parameters(location: &str, parameters: &[Parameter]) -> Result<(), DocumentError> {
    let mut seen = HashSet::new();

    for param in parameters {
        let param_location = format!("{location}/{}", param.name);

        if !seen.insert((param.name.as_str(), param.location)) {
            return Err(DocumentError::invalid(
                param_location,
                format!("duplicate {} parameter", param.location),
            ));
        }

        if param.location == ParamLocation::Path && !param.required {
            return Err(DocumentError::invalid(
                param_location,
                "path parameters must be required",
            ));
        }

        if let Some(style) = param.style {
            if !param.location.allowed_styles().contains(&style) {
                return Err(DocumentError::invalid(
                    param_location,
                    format!("style {style:?} is not allowed for {} parameters", param.location),
                ));
            }
        }
    }
    Ok(())
}

fn validate_link(location: &str, link: &Link) -> Result<(), DocumentError> {
    match (&link.operation_ref, &link.operation_id) {
        (Some(_), Some(_)) => Err(DocumentError::invalid(
            location,
            "operationRef and operationId are mutually exclusive",
        )),
        _ if link.request_body.is_some() && !link.request_body_parameters.is_empty() => {
            Err(DocumentError::invalid(
                location,
                "requestBody and x-apigraph-requestBodyParameters are mutually exclusive",
            ))
        }
        _ => Ok(()),
    }
}

fn validate_backlinks(
    location: &str,
    backlinks: &BTreeMap<String, BacklinkChain>,
) -> Result<(), DocumentError> {
    for (chain_key, chain) in backlinks {
        if chain.request_body.is_some() && !chain.request_body_parameters.is_empty() {
            return Err(DocumentError::invalid(
                format!("{location}/{chain_key}"),
                "requestBody and requestBodyParameters are mutually exclusive",
            ));
        }
    }
    Ok(())
}
