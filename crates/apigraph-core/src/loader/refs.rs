//! Text parsing and `$ref` expansion.

use percent_encoding::percent_decode_str;
use serde_json::{Map, Number, Value};
use url::Url;

use super::error::LoaderError;

/// Parse JSON or YAML text into a JSON value.
///
/// YAML mapping keys that are scalars (`200:` for a response code) become
/// strings. Text starting with `{` is tried as JSON first and falls back to
/// YAML, since a YAML flow mapping starts the same way.
pub fn parse_text(text: &str) -> Result<Value, LoaderError> {
    if text.trim_start().starts_with('{') {
        if let Ok(value) = serde_json::from_str(text) {
            return Ok(value);
        }
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
    Ok(yaml_to_json(yaml))
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => {
            let object: Map<String, Value> = mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect();
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => s,
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Split a reference target into its document URI and decoded JSON pointer.
pub fn split_target(target: &Url) -> (Url, String) {
    let mut document = target.clone();
    document.set_fragment(None);
    let pointer = target
        .fragment()
        .map(|f| percent_decode_str(f).decode_utf8_lossy().into_owned())
        .unwrap_or_default();
    (document, pointer)
}

/// Source of raw (unexpanded) documents for reference resolution.
pub trait RawDocuments {
    fn raw(&self, uri: &Url) -> Result<std::sync::Arc<Value>, LoaderError>;
}

/// Replace every `{"$ref": ...}` object in `value` with the value it points to.
///
/// References are resolved relative to `base`. A reference already being
/// expanded further up the current path is left in place, so recursive
/// schemas stay finite.
pub fn expand<R: RawDocuments + ?Sized>(
    value: &Value,
    base: &Url,
    documents: &R,
) -> Result<Value, LoaderError> {
    let mut active = Vec::new();
    expand_inner(value, base, documents, &mut active)
}

fn expand_inner<R: RawDocuments + ?Sized>(
    value: &Value,
    base: &Url,
    documents: &R,
    active: &mut Vec<String>,
) -> Result<Value, LoaderError> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                return expand_reference(value, reference, base, documents, active);
            }
            let mut expanded = Map::with_capacity(map.len());
            for (key, item) in map {
                expanded.insert(key.clone(), expand_inner(item, base, documents, active)?);
            }
            Ok(Value::Object(expanded))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| expand_inner(item, base, documents, active))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn expand_reference<R: RawDocuments + ?Sized>(
    original: &Value,
    reference: &str,
    base: &Url,
    documents: &R,
    active: &mut Vec<String>,
) -> Result<Value, LoaderError> {
    let target = base
        .join(reference)
        .map_err(|e| LoaderError::invalid_uri(reference, e))?;
    let (document_uri, pointer) = split_target(&target);

    let key = format!("{document_uri}#{pointer}");
    if active.contains(&key) {
        tracing::trace!(reference, "Leaving recursive $ref unexpanded");
        return Ok(original.clone());
    }

    let document = documents.raw(&document_uri)?;
    let resolved = document.pointer(&pointer).ok_or_else(|| {
        LoaderError::invalid_uri(target.as_str(), "$ref does not resolve to a value")
    })?;

    active.push(key);
    let expanded = expand_inner(resolved, &document_uri, documents, active);
    active.pop();
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct Fixed(HashMap<String, Arc<Value>>);

    impl RawDocuments for Fixed {
        fn raw(&self, uri: &Url) -> Result<Arc<Value>, LoaderError> {
            self.0
                .get(uri.as_str())
                .cloned()
                .ok_or_else(|| LoaderError::NotFound(uri.to_string()))
        }
    }

    #[test]
    fn test_yaml_numeric_keys_become_strings() {
        let value = parse_text("responses:\n  200:\n    description: ok\n").unwrap();
        assert_eq!(value["responses"]["200"]["description"], "ok");
    }

    #[test]
    fn test_yaml_flow_mapping() {
        let value =
            parse_text("{openapi: 3.0.3, paths: {/a: {get: {responses: {200: {}}}}}}").unwrap();
        assert_eq!(value["openapi"], "3.0.3");
        assert!(value["paths"]["/a"]["get"]["responses"]["200"].is_object());
    }

    #[test]
    fn test_malformed_flow_mapping_reports_yaml_error() {
        assert!(matches!(parse_text("{openapi: [3.0.3}"), Err(LoaderError::Yaml(_))));
    }

    #[test]
    fn test_json_text() {
        let value = parse_text(r#"{"openapi": "3.0.0"}"#).unwrap();
        assert_eq!(value["openapi"], "3.0.0");
    }

    #[test]
    fn test_internal_and_external_refs() {
        let base = Url::parse("https://example.com/api/main.yaml").unwrap();
        let main = json!({
            "components": {"links": {"L": {"operationId": "op"}}},
            "a": {"$ref": "#/components/links/L"},
            "b": {"$ref": "shared.yaml#/items/0"}
        });
        let shared = json!({"items": [{"$ref": "#/value"}], "value": 42});
        let documents = Fixed(HashMap::from([
            (base.to_string(), Arc::new(main.clone())),
            (
                "https://example.com/api/shared.yaml".to_string(),
                Arc::new(shared),
            ),
        ]));

        let expanded = expand(&main, &base, &documents).unwrap();
        assert_eq!(expanded["a"], json!({"operationId": "op"}));
        assert_eq!(expanded["b"], json!(42));
    }

    #[test]
    fn test_escaped_path_pointer() {
        let base = Url::parse("https://example.com/main.yaml").unwrap();
        let main = json!({
            "paths": {"/users/{id}": {"get": {"summary": "user"}}},
            "x": {"$ref": "#/paths/~1users~1{id}/get"}
        });
        let documents = Fixed(HashMap::from([(base.to_string(), Arc::new(main.clone()))]));

        let expanded = expand(&main, &base, &documents).unwrap();
        assert_eq!(expanded["x"]["summary"], "user");
    }

    #[test]
    fn test_recursive_ref_is_left_in_place() {
        let base = Url::parse("https://example.com/main.yaml").unwrap();
        let main = json!({
            "schemas": {"Node": {"properties": {"child": {"$ref": "#/schemas/Node"}}}},
            "root": {"$ref": "#/schemas/Node"}
        });
        let documents = Fixed(HashMap::from([(base.to_string(), Arc::new(main.clone()))]));

        let expanded = expand(&main, &base, &documents).unwrap();
        assert_eq!(
            expanded["root"]["properties"]["child"],
            json!({"$ref": "#/schemas/Node"})
        );
    }

    #[test]
    fn test_dangling_ref_fails() {
        let base = Url::parse("https://example.com/main.yaml").unwrap();
        let main = json!({"x": {"$ref": "#/missing"}});
        let documents = Fixed(HashMap::from([(base.to_string(), Arc::new(main.clone()))]));

        assert!(matches!(
            expand(&main, &base, &documents),
            Err(LoaderError::InvalidUri { .. })
        ));
    }
}
