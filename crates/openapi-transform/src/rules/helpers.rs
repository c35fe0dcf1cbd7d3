//! Shared YAML manipulation helpers used across rule modules.

use serde_yaml_ng::{Mapping, Sequence, Value};

use openapi_transform_core::ValueExt;

/// Known HTTP methods per the OpenAPI specification.
///
/// Path items can also contain `summary`, `description`, `parameters`, and
/// `servers` keys; those are skipped so callbacks only receive actual operations.
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Vendor keys under which operations carry per-language code samples.
pub const CODE_SAMPLE_KEYS: &[&str] = &["x-codeSamples", "x-code-samples"];

/// Whether a path-item key names an operation (case-insensitive).
pub fn is_http_method(key: &str) -> bool {
    HTTP_METHODS.iter().any(|m| m.eq_ignore_ascii_case(key))
}

/// Iterate over all operations in the spec, calling `f(path, method, operation_map)`.
///
/// Only iterates HTTP method keys (`get`, `post`, etc.), skipping path-level
/// metadata keys like `summary`, `parameters`, and `servers`.
pub fn for_each_operation(doc: &mut Value, mut f: impl FnMut(&str, &str, &mut Mapping)) {
    let Some(paths) = doc.mapping_mut("paths") else {
        return;
    };

    for (path_key, path_item) in paths.iter_mut() {
        let path_str = path_key.as_str().unwrap_or_default();
        let Some(path_map) = path_item.as_mapping_mut() else {
            continue;
        };

        for (method_key, operation) in path_map.iter_mut() {
            let method_str = method_key.as_str().unwrap_or_default();
            if !is_http_method(method_str) {
                continue;
            }
            let Some(op_map) = operation.as_mapping_mut() else {
                continue;
            };
            f(path_str, method_str, op_map);
        }
    }
}

/// Read-only variant of [`for_each_operation`].
pub fn for_each_operation_ref<'a>(doc: &'a Value, mut f: impl FnMut(&'a str, &'a str, &'a Mapping)) {
    let Some(paths) = doc.mapping("paths") else {
        return;
    };

    for (path_key, path_item) in paths {
        let Some(path_str) = path_key.as_str() else {
            continue;
        };
        let Some(path_map) = path_item.as_mapping() else {
            continue;
        };

        for (method_key, operation) in path_map {
            let Some(method_str) = method_key.as_str() else {
                continue;
            };
            if !is_http_method(method_str) {
                continue;
            }
            if let Some(op_map) = operation.as_mapping() {
                f(path_str, method_str, op_map);
            }
        }
    }
}

/// Call `f` on the top-level `security` list and on every per-operation
/// `security` override.
pub fn for_each_security_list(doc: &mut Value, mut f: impl FnMut(&mut Sequence)) {
    if let Some(security) = doc.sequence_mut("security") {
        f(security);
    }
    for_each_operation(doc, |_path, _method, op_map| {
        if let Some(security) = op_map.sequence_mut("security") {
            f(security);
        }
    });
}

/// Call `f` on every code-sample container (`x-codeSamples` /
/// `x-code-samples`) at the document root and on every operation.
pub fn for_each_code_sample_container(doc: &mut Value, mut f: impl FnMut(&mut Value)) {
    if let Some(root) = doc.as_mapping_mut() {
        for key in CODE_SAMPLE_KEYS {
            if let Some(container) = root.get_mut(*key) {
                f(container);
            }
        }
    }
    for_each_operation(doc, |_path, _method, op_map| {
        for key in CODE_SAMPLE_KEYS {
            if let Some(container) = op_map.get_mut(*key) {
                f(container);
            }
        }
    });
}

/// Ensure `root[key]` is a mapping (creating an empty one when absent or of
/// another type) and return it.
pub fn ensure_mapping<'a>(root: &'a mut Mapping, key: &str) -> Option<&'a mut Mapping> {
    if !root.get(key).is_some_and(Value::is_mapping) {
        root.insert(Value::String(key.to_string()), Value::Mapping(Mapping::new()));
    }
    root.get_mut(key).and_then(Value::as_mapping_mut)
}
