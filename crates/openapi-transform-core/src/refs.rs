//! Reference rewriting.
//!
//! Two distinct strategies live here and must not be mixed up:
//!
//! - **Structural**: [`rewrite_references`] replaces string scalars that are
//!   *exactly* equal to a local pointer (`#/components/schemas/Foo`). It never
//!   touches substrings.
//! - **Textual**: [`rewrite_text`] / [`rewrite_strings`] perform case-sensitive
//!   substring substitution for human-facing spellings of the same concept
//!   (e.g. `bearerAuth` inside example source code).

use std::collections::HashSet;

use serde_yaml_ng::Value;

use crate::tree::{walk, walk_mut, Segment, TreePath, Visit};

/// Canonical local pointer for a component registry entry.
///
/// `component_ref("schemas", "Pet")` → `#/components/schemas/Pet`
pub fn component_ref(section: &str, name: &str) -> String {
    format!("#/components/{section}/{name}")
}

/// Replace every string scalar exactly equal to `from` with `to`.
///
/// Returns the number of scalars rewritten. Calling it again with the same
/// arguments rewrites nothing.
pub fn rewrite_references(root: &mut Value, from: &str, to: &str) -> usize {
    if from == to {
        return 0;
    }
    let mut rewritten = 0;
    walk_mut(root, &mut |node, _| {
        if node.as_str() == Some(from) {
            *node = Value::String(to.to_string());
            rewritten += 1;
        }
        Visit::Continue
    });
    rewritten
}

/// Count string scalars exactly equal to `needle`.
pub fn count_exact(root: &Value, needle: &str) -> usize {
    let mut count = 0;
    walk(root, &mut |node, _| {
        if node.as_str() == Some(needle) {
            count += 1;
        }
        Visit::Continue
    });
    count
}

/// Recursively walk a YAML value tree and collect all `$ref` string values.
pub fn collect_refs(value: &Value, refs: &mut HashSet<String>) {
    walk(value, &mut |node, _| {
        if let Some(r) = node.get("$ref").and_then(Value::as_str) {
            refs.insert(r.to_string());
        }
        Visit::Continue
    });
}

/// Convert a local JSON pointer (`#/components/schemas/Pet`) into the tree
/// path of the node it targets (`components.schemas.Pet`).
///
/// Returns `None` for external or malformed pointers.
pub fn pointer_to_path(pointer: &str) -> Option<TreePath> {
    let rest = pointer.strip_prefix("#/")?;
    if rest.is_empty() {
        return None;
    }
    Some(
        rest.split('/')
            .map(|token| Segment::Key(token.replace("~1", "/").replace("~0", "~")))
            .collect(),
    )
}

/// Case-sensitive substring substitution of every `(from, to)` pair, applied
/// in order. Returns `None` when nothing changed.
pub fn rewrite_text(text: &str, renames: &[(String, String)]) -> Option<String> {
    let mut out: Option<String> = None;
    for (from, to) in renames {
        if from.is_empty() {
            continue;
        }
        let current = out.as_deref().unwrap_or(text);
        if current.contains(from.as_str()) {
            out = Some(current.replace(from.as_str(), to));
        }
    }
    out
}

/// Apply [`rewrite_text`] to every string scalar under `root`.
///
/// Returns the number of scalars changed.
pub fn rewrite_strings(root: &mut Value, renames: &[(String, String)]) -> usize {
    let mut changed = 0;
    walk_mut(root, &mut |node, _| {
        if let Some(new_text) = node.as_str().and_then(|s| rewrite_text(s, renames)) {
            *node = Value::String(new_text);
            changed += 1;
        }
        Visit::Continue
    });
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(yaml: &str) -> Value {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    fn renames(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
            .collect()
    }

    #[test]
    fn rewrites_exact_pointers_only() {
        let mut doc = parse(indoc! {r##"
            components:
              schemas:
                Holder:
                  properties:
                    a: {$ref: "#/components/schemas/Shortcut"}
                    b: {$ref: "#/components/schemas/ShortcutList"}
                    c:
                      type: array
                      items: {$ref: "#/components/schemas/Shortcut"}
            description: "see #/components/schemas/Shortcut"
        "##});

        let from = component_ref("schemas", "Shortcut");
        let to = component_ref("schemas", "IndexingShortcut");
        assert_eq!(rewrite_references(&mut doc, &from, &to), 2);

        assert_eq!(count_exact(&doc, &from), 0);
        assert_eq!(count_exact(&doc, &to), 2);
        assert_eq!(
            doc["components"]["schemas"]["Holder"]["properties"]["b"]["$ref"].as_str(),
            Some("#/components/schemas/ShortcutList")
        );
        assert_eq!(
            doc["description"].as_str(),
            Some("see #/components/schemas/Shortcut")
        );
    }

    #[test]
    fn rewrite_references_is_idempotent() {
        let mut doc = parse("x: {$ref: '#/components/schemas/A'}\n");
        let from = component_ref("schemas", "A");
        let to = component_ref("schemas", "B");
        rewrite_references(&mut doc, &from, &to);
        let once = doc.clone();
        assert_eq!(rewrite_references(&mut doc, &from, &to), 0);
        assert_eq!(doc, once);
    }

    #[test]
    fn collects_refs_from_nested_sequences() {
        let doc = parse(indoc! {r##"
            oneOf:
              - $ref: "#/components/schemas/A"
              - items:
                  $ref: "#/components/schemas/B"
        "##});
        let mut refs = HashSet::new();
        collect_refs(&doc, &mut refs);
        assert_eq!(refs.len(), 2);
        assert!(refs.contains("#/components/schemas/B"));
    }

    #[test]
    fn pointer_to_path_decodes_escapes() {
        assert_eq!(
            pointer_to_path("#/components/schemas/Pet").unwrap().to_string(),
            "components.schemas.Pet"
        );
        assert_eq!(
            pointer_to_path("#/paths/~1users~1{id}").unwrap().to_string(),
            "paths./users/{id}"
        );
        assert!(pointer_to_path("other.yaml#/components/schemas/Pet").is_none());
        assert!(pointer_to_path("#/").is_none());
    }

    #[test]
    fn textual_rewrite_handles_every_casing_pair() {
        let pairs = renames(&[("bearerAuth", "apiToken"), ("BEARER_AUTH", "API_TOKEN")]);
        let text = "client(bearerAuth=os.getenv(\"BEARER_AUTH\"), bearerAuthExtra=1)";
        assert_eq!(
            rewrite_text(text, &pairs).unwrap(),
            "client(apiToken=os.getenv(\"API_TOKEN\"), apiTokenExtra=1)"
        );
        assert!(rewrite_text("BearerAuth stays", &pairs).is_none());
    }

    #[test]
    fn rewrite_strings_counts_changed_scalars() {
        let mut doc = parse("- source: use bearerAuth\n- source: nothing here\n");
        let pairs = renames(&[("bearerAuth", "apiToken")]);
        assert_eq!(rewrite_strings(&mut doc, &pairs), 1);
        assert_eq!(doc[0]["source"].as_str(), Some("use apiToken"));
        assert_eq!(rewrite_strings(&mut doc, &pairs), 0);
    }
}
