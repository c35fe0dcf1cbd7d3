//! Provenance injection.

use serde_yaml_ng::Value;
use tracing::debug;

use openapi_transform_core::val_s;

use super::helpers::ensure_mapping;

/// Record the spec repository commit in `info.<key>`.
///
/// A missing or empty commit identifier is a no-op. Otherwise `info` is
/// created when absent and the key is overwritten; other `info` fields are
/// untouched.
pub fn inject_provenance(doc: &mut Value, key: &str, commit_sha: Option<&str>) {
    let Some(sha) = commit_sha.filter(|s| !s.is_empty()) else {
        return;
    };
    let Some(info) = doc.as_mapping_mut().and_then(|root| ensure_mapping(root, "info")) else {
        return;
    };
    info.insert(val_s(key), val_s(sha));
    debug!(key, sha, "injected provenance");
}
