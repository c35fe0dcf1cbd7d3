//! Operation indexer: which operations reference which schema nodes.

use std::collections::{HashMap, HashSet};

use serde_yaml_ng::{Mapping, Value};

use openapi_transform_core::{collect_refs, pointer_to_path};

use crate::rules::helpers::for_each_operation_ref;

/// One operation that references a schema node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationRef {
    /// `operationId`, or `"{METHOD} {path}"` when the operation has none.
    pub operation_id: String,
    /// Upper-case HTTP method.
    pub method: String,
    /// Path template.
    pub path: String,
}

/// Map from rendered tree path (`components.schemas.Pet`) to the operations
/// whose subtree holds a local `$ref` to that path.
#[derive(Debug, Default, Clone)]
pub struct OperationIndex {
    by_path: HashMap<String, Vec<OperationRef>>,
}

impl OperationIndex {
    /// Index every operation under the document's top-level `paths`.
    ///
    /// Only HTTP-method keys count as operations. External references are
    /// ignored; an operation referencing one node several times is recorded
    /// once for it.
    #[must_use]
    pub fn build(doc: &Value) -> Self {
        let mut index = Self::default();
        for_each_operation_ref(doc, |path, method, op| {
            let method = method.to_uppercase();
            let operation = OperationRef {
                operation_id: operation_id(op, &method, path),
                method,
                path: path.to_string(),
            };
            for target in local_refs(op) {
                let refs = index.by_path.entry(target).or_default();
                if !refs.contains(&operation) {
                    refs.push(operation.clone());
                }
            }
        });
        index
    }

    /// Operations referencing the node at `path` (empty if none).
    #[must_use]
    pub fn refs_for(&self, path: &str) -> &[OperationRef] {
        self.by_path.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct referenced paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    /// Whether no operation references anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

fn operation_id(op: &Mapping, method: &str, path: &str) -> String {
    op.get("operationId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map_or_else(|| format!("{method} {path}"), ToString::to_string)
}

/// Rendered target paths of every distinct local `$ref` inside one operation.
fn local_refs(op: &Mapping) -> Vec<String> {
    let mut refs = HashSet::new();
    for value in op.values() {
        collect_refs(value, &mut refs);
    }
    refs.iter()
        .filter_map(|pointer| pointer_to_path(pointer))
        .map(|path| path.to_string())
        .collect()
}
