//! Component registry renames.

use serde_yaml_ng::Value;
use tracing::debug;

use openapi_transform_core::{component_ref, rename_key, rewrite_references, ValueExt};

use crate::config::ComponentRename;

/// Move `components.<section>.<from>` to `<to>` and rewire every reference.
///
/// A missing source entry is expected (not every document defines every
/// component) and only skips the registry move; references are rewritten
/// regardless so no pointer to the old name survives. Returns the number of
/// references rewritten.
pub fn rename_component(doc: &mut Value, rename: &ComponentRename) -> usize {
    let moved = doc
        .dig_mut(&["components", rename.section.as_str()])
        .and_then(Value::as_mapping_mut)
        .is_some_and(|registry| rename_key(registry, &rename.from, &rename.to));

    let from = component_ref(&rename.section, &rename.from);
    let to = component_ref(&rename.section, &rename.to);
    let rewritten = rewrite_references(doc, &from, &to);

    if moved || rewritten > 0 {
        debug!(
            section = %rename.section,
            from = %rename.from,
            to = %rename.to,
            references = rewritten,
            "renamed component"
        );
    }
    rewritten
}
