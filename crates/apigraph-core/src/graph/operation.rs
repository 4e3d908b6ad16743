//! Per-operation parameter merging and security resolution.

use std::collections::{BTreeMap, BTreeSet};

use crate::document::{OpenApiDocument, Operation, Parameter, PathItem};

use super::error::GraphError;
use super::types::{
    NodeKey, OperationDetail, ParamKey, ResolvedSecurityScheme, SecurityAlternatives,
};

/// Path item parameters overlaid with the operation's own.
///
/// An operation parameter replaces the path item parameter with the same
/// `(name, in)`; path item parameters it does not mention are kept.
pub fn merge_parameters(item: &PathItem, operation: &Operation) -> BTreeMap<ParamKey, Parameter> {
    item.parameters
        .iter()
        .chain(&operation.parameters)
        .map(|param| (ParamKey::from(param), param.clone()))
        .collect()
}

/// Effective security alternatives of an operation.
///
/// The operation's own `security` replaces the document default, even when
/// empty. Empty requirements are dropped.
pub fn resolve_security(
    doc: &OpenApiDocument,
    node: &NodeKey,
    operation: &Operation,
) -> Result<SecurityAlternatives, GraphError> {
    let requirements = operation.security.as_ref().unwrap_or(&doc.security);
    let declared = doc.security_schemes();

    let mut alternatives = BTreeSet::new();
    for requirement in requirements.iter().filter(|r| !r.is_empty()) {
        let schemes = requirement
            .keys()
            .map(|name| {
                declared
                    .and_then(|schemes| schemes.get(name))
                    .map(|scheme| ResolvedSecurityScheme {
                        name: name.clone(),
                        scheme: scheme.clone(),
                    })
                    .ok_or_else(|| GraphError::InvalidSecurityScheme {
                        scheme: name.clone(),
                        operation: node.clone(),
                    })
            })
            .collect::<Result<BTreeSet<_>, _>>()?;
        alternatives.insert(schemes);
    }

    Ok(alternatives)
}

pub fn operation_detail(
    doc: &OpenApiDocument,
    node: &NodeKey,
    item: &PathItem,
    operation: &Operation,
) -> Result<OperationDetail, GraphError> {
    Ok(OperationDetail {
        path: node.path.clone(),
        method: node.method,
        operation_id: operation.operation_id.clone(),
        summary: operation.summary.clone(),
        description: operation.description.clone(),
        parameters: merge_parameters(item, operation),
        request_body: operation.request_body.clone(),
        security_schemes: resolve_security(doc, node, operation)?,
    })
}
