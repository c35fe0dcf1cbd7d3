//! Deprecation annotations → SDK generator deprecation fields.
//!
//! The annotation is either a single record or a list of records tagged by
//! `kind`:
//!
//! ```yaml
//! x-glean-deprecated:
//!   - id: 8c1f
//!     kind: property
//!     introduced: "2024-01-15"
//!     removal: "2024-07-15"
//!     message: Use /v2/test instead
//!   - id: 3b77
//!     kind: enum-value
//!     enum-value: LEGACY
//!     docs: https://developers.glean.com/deprecations
//! ```
//!
//! A property-kind record (or a plain single record) sets `deprecated: true`
//! and the deprecation message on the node. Enum-value records instead append
//! an `@deprecated` note to the description of that enum literal.

use serde_yaml_ng::{Mapping, Value};
use tracing::debug;

use openapi_transform_core::{scalar_text, val_s, walk_mut, ValueExt, Visit};

use crate::config::DeprecationKeys;

const KIND_PROPERTY: &str = "property";
const KIND_ENUM_VALUE: &str = "enum-value";
const DEPRECATED_MARKER: &str = "@deprecated";

/// Human-readable deprecation message for one annotation record.
///
/// Empty or missing fields are skipped, so the result never contains
/// placeholder text:
///
/// | introduced | removal | message | result |
/// |---|---|---|---|
/// | ✓ | ✓ | ✓ | `Deprecated on I, removal scheduled for R: M` |
/// | ✓ | | | `Deprecated on I` |
/// | | ✓ | ✓ | `Removal scheduled for R: M` |
/// | | | ✓ | `M` |
/// | | | | *(empty)* |
pub fn build_deprecation_message(record: &Mapping) -> String {
    let field = |key: &str| record.get(key).and_then(scalar_text);

    let mut text = String::new();
    if let Some(introduced) = field("introduced") {
        text.push_str("Deprecated on ");
        text.push_str(&introduced);
    }
    if let Some(removal) = field("removal") {
        text.push_str(if text.is_empty() {
            "Removal scheduled for "
        } else {
            ", removal scheduled for "
        });
        text.push_str(&removal);
    }
    if let Some(message) = field("message") {
        if !text.is_empty() {
            text.push_str(": ");
        }
        text.push_str(&message);
    }
    text
}

/// Translate every deprecation annotation in the document.
///
/// `descriptions_key` is the enum description map enriched by enum-value
/// records (normally the SDK generator's key, already populated by the enum
/// description conversion).
pub fn rewrite_deprecations(doc: &mut Value, keys: &DeprecationKeys, descriptions_key: &str) {
    let mut annotated = 0;
    walk_mut(doc, &mut |node, _| {
        let Some(map) = node.as_mapping_mut() else {
            return Visit::Continue;
        };
        let Some(annotation) = map.get(keys.annotation_key.as_str()).cloned() else {
            return Visit::Continue;
        };

        match annotation {
            Value::Null | Value::Bool(false) => return Visit::Continue,
            Value::Sequence(entries) => {
                apply_entries(map, &entries, &keys.message_key, descriptions_key);
            }
            Value::Mapping(record) if is_enum_value_record(&record) => {
                map.shift_remove(keys.message_key.as_str());
            }
            Value::Mapping(record) => apply_record(map, &record, &keys.message_key),
            _ => {
                map.shift_remove(keys.message_key.as_str());
            }
        }
        annotated += 1;
        Visit::Continue
    });

    if annotated > 0 {
        debug!(annotated, "rewrote deprecation annotations");
    }
}

fn kind(record: &Mapping) -> Option<&str> {
    record.str_field("kind")
}

fn is_enum_value_record(record: &Mapping) -> bool {
    kind(record) == Some(KIND_ENUM_VALUE) || record.contains_key(KIND_ENUM_VALUE)
}

/// Set or clear the node's own deprecation fields from one record.
///
/// An empty message clears the message key but never resets an existing
/// `deprecated` flag.
fn apply_record(node: &mut Mapping, record: &Mapping, message_key: &str) {
    let message = build_deprecation_message(record);
    if message.is_empty() {
        node.shift_remove(message_key);
    } else {
        node.insert(val_s("deprecated"), Value::Bool(true));
        node.insert(val_s(message_key), Value::String(message));
    }
}

/// Handle a list annotation: a property-kind record wins; otherwise
/// enum-value records enrich the enum descriptions. Lists without usable
/// records leave the node untouched.
fn apply_entries(node: &mut Mapping, entries: &[Value], message_key: &str, descriptions_key: &str) {
    let records: Vec<&Mapping> = entries.iter().filter_map(Value::as_mapping).collect();

    if let Some(property) = records.iter().find(|r| kind(r) == Some(KIND_PROPERTY)) {
        apply_record(node, property, message_key);
        return;
    }

    let enum_records: Vec<(&str, &Mapping)> = records
        .iter()
        .filter(|r| kind(r) == Some(KIND_ENUM_VALUE))
        .filter_map(|r| Some((r.str_field(KIND_ENUM_VALUE)?, *r)))
        .collect();
    if !enum_records.is_empty() {
        enrich_enum_descriptions(node, &enum_records, descriptions_key);
    }
}

fn enrich_enum_descriptions(node: &mut Mapping, records: &[(&str, &Mapping)], descriptions_key: &str) {
    let enum_values: Vec<String> = node
        .sequence("enum")
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();
    if enum_values.is_empty() {
        return;
    }

    let mut descriptions = description_map(node.get(descriptions_key), &enum_values);
    for (value, record) in records {
        if !enum_values.iter().any(|v| v == value) {
            continue;
        }
        let text = build_deprecation_message(record);
        if text.is_empty() {
            continue;
        }
        let see = record
            .get("docs")
            .and_then(scalar_text)
            .map(|docs| format!(" See {docs}"))
            .unwrap_or_default();
        let note = format!("{DEPRECATED_MARKER} {text}{see}");

        let merged = match descriptions
            .get(*value)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            None => note,
            Some(existing) if existing.contains(DEPRECATED_MARKER) => existing.to_string(),
            Some(existing) => format!("{existing}\n\n{note}"),
        };
        descriptions.insert(val_s(value), Value::String(merged));
    }

    if !descriptions.is_empty() {
        node.insert(val_s(descriptions_key), Value::Mapping(descriptions));
    }
}

/// Normalize an enum description vendor value to map form.
///
/// A list is matched to the enum literals by position (empty entries are
/// dropped); a map is copied; anything else yields an empty map.
fn description_map(existing: Option<&Value>, enum_values: &[String]) -> Mapping {
    match existing {
        Some(Value::Mapping(map)) => map.clone(),
        Some(Value::Sequence(list)) => enum_values
            .iter()
            .zip(list)
            .filter_map(|(key, description)| {
                let description = description.as_str().filter(|s| !s.is_empty())?;
                Some((val_s(key), val_s(description)))
            })
            .collect(),
        _ => Mapping::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const DESCRIPTIONS: &str = "x-speakeasy-enum-descriptions";
    const MESSAGE: &str = "x-speakeasy-deprecation-message";

    fn parse(yaml: &str) -> Value {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    fn record(yaml: &str) -> Mapping {
        parse(yaml).as_mapping().cloned().unwrap()
    }

    fn rewrite(doc: &mut Value) {
        rewrite_deprecations(doc, &DeprecationKeys::default(), DESCRIPTIONS);
    }

    #[test]
    fn full_message() {
        let r = record(indoc! {r#"
            introduced: "2024-01-15"
            removal: "2024-07-15"
            message: Use /v2/test instead
        "#});
        assert_eq!(
            build_deprecation_message(&r),
            "Deprecated on 2024-01-15, removal scheduled for 2024-07-15: Use /v2/test instead"
        );
    }

    #[test]
    fn partial_messages_never_contain_placeholders() {
        let fields = [
            ("introduced", "2024-01-15"),
            ("removal", "2024-07-15"),
            ("message", "Use v2"),
        ];
        for mask in 0..8u8 {
            let mut r = Mapping::new();
            for (bit, (key, value)) in fields.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    r.insert(val_s(key), val_s(value));
                } else if bit == 0 {
                    r.insert(val_s(key), val_s(""));
                }
            }
            let message = build_deprecation_message(&r);
            assert!(!message.contains("undefined"), "{message}");
            assert!(!message.contains("null"), "{message}");
            assert!(!message.starts_with(':'), "{message}");
            assert!(!message.starts_with(','), "{message}");
            assert_eq!(message.is_empty(), mask == 0);
        }

        assert_eq!(
            build_deprecation_message(&record("removal: '2025-01-01'\nmessage: Gone")),
            "Removal scheduled for 2025-01-01: Gone"
        );
        assert_eq!(
            build_deprecation_message(&record("introduced: '2024-01-01'")),
            "Deprecated on 2024-01-01"
        );
        assert_eq!(build_deprecation_message(&record("message: Only text")), "Only text");
    }

    #[test]
    fn single_record_sets_fields() {
        let mut doc = parse(indoc! {r#"
            paths:
              /test:
                get:
                  operationId: test
                  x-glean-deprecated:
                    id: abc
                    introduced: "2024-01-15"
                    removal: "2024-07-15"
                    message: Use /v2/test instead
        "#});
        rewrite(&mut doc);

        let op = &doc["paths"]["/test"]["get"];
        assert_eq!(op["deprecated"], Value::Bool(true));
        assert_eq!(
            op[MESSAGE].as_str(),
            Some("Deprecated on 2024-01-15, removal scheduled for 2024-07-15: Use /v2/test instead")
        );
        assert_eq!(op["x-glean-deprecated"]["id"].as_str(), Some("abc"));
    }

    #[test]
    fn empty_record_clears_message_but_keeps_flag() {
        let mut doc = parse(indoc! {"
            deprecated: true
            x-speakeasy-deprecation-message: stale
            x-glean-deprecated: {id: abc}
        "});
        rewrite(&mut doc);
        assert_eq!(doc["deprecated"], Value::Bool(true));
        assert!(doc.get(MESSAGE).is_none());

        let mut fresh = parse("x-glean-deprecated: {}\n");
        rewrite(&mut fresh);
        assert!(fresh.get("deprecated").is_none());
        assert!(fresh.get(MESSAGE).is_none());
    }

    #[test]
    fn single_enum_value_record_does_not_mark_node() {
        let mut doc = parse(indoc! {"
            type: string
            enum: [A, B]
            x-speakeasy-deprecation-message: stale
            x-glean-deprecated:
              kind: enum-value
              enum-value: A
              message: Use B
        "});
        rewrite(&mut doc);
        assert!(doc.get("deprecated").is_none());
        assert!(doc.get(MESSAGE).is_none());
    }

    #[test]
    fn property_entry_wins_over_enum_entry() {
        let mut doc = parse(indoc! {r#"
            type: string
            enum: [OLD, NEW]
            x-glean-deprecated:
              - kind: enum-value
                enum-value: OLD
                message: Use NEW
              - kind: property
                introduced: "2024-01-15"
                message: Field is going away
        "#});
        rewrite(&mut doc);

        assert_eq!(doc["deprecated"], Value::Bool(true));
        let message = doc[MESSAGE].as_str().unwrap();
        assert_eq!(message, "Deprecated on 2024-01-15: Field is going away");
        assert!(!message.contains("Use NEW"));
        assert!(doc.get(DESCRIPTIONS).is_none());
    }

    #[test]
    fn enum_entries_enrich_descriptions() {
        let mut doc = parse(indoc! {r#"
            type: string
            enum: [OLD, NEW, OTHER]
            x-speakeasy-enum-descriptions:
              OLD: The old mode
              NEW: The new mode
            x-glean-deprecated:
              - kind: enum-value
                enum-value: OLD
                introduced: "2024-01-15"
                message: Use NEW
                docs: https://example.com/deprecations
              - kind: enum-value
                enum-value: OTHER
                removal: "2025-01-01"
              - kind: enum-value
                enum-value: MISSING
                message: Not in the enum
              - not a record
        "#});
        rewrite(&mut doc);

        assert!(doc.get("deprecated").is_none());
        assert!(doc.get(MESSAGE).is_none());
        let descriptions = doc[DESCRIPTIONS].as_mapping().unwrap();
        assert_eq!(
            descriptions["OLD"].as_str(),
            Some(
                "The old mode\n\n@deprecated Deprecated on 2024-01-15: Use NEW \
                 See https://example.com/deprecations"
            )
        );
        assert_eq!(descriptions["NEW"].as_str(), Some("The new mode"));
        assert_eq!(
            descriptions["OTHER"].as_str(),
            Some("@deprecated Removal scheduled for 2025-01-01")
        );
        assert!(descriptions.get("MISSING").is_none());

        let once = doc.clone();
        rewrite(&mut doc);
        assert_eq!(doc, once);
    }

    #[test]
    fn list_descriptions_are_converted_by_position() {
        let mut doc = parse(indoc! {"
            enum: [A, B, C]
            x-speakeasy-enum-descriptions: [First, '', Third]
            x-glean-deprecated:
              - kind: enum-value
                enum-value: B
                message: Use C
        "});
        rewrite(&mut doc);
        let descriptions = doc[DESCRIPTIONS].as_mapping().unwrap();
        let keys: Vec<_> = descriptions.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["A", "C", "B"]);
        assert_eq!(descriptions["B"].as_str(), Some("@deprecated Use C"));
    }

    #[test]
    fn enum_entries_without_enum_list_are_ignored() {
        let mut doc = parse(indoc! {"
            type: string
            x-glean-deprecated:
              - kind: enum-value
                enum-value: A
                message: Use B
        "});
        let original = doc.clone();
        rewrite(&mut doc);
        assert_eq!(doc, original);
    }

    #[test]
    fn empty_or_malformed_lists_change_nothing() {
        for yaml in [
            "x-speakeasy-deprecation-message: kept\nx-glean-deprecated: []\n",
            "x-speakeasy-deprecation-message: kept\nx-glean-deprecated: [1, text, null]\n",
        ] {
            let mut doc = parse(yaml);
            let original = doc.clone();
            rewrite(&mut doc);
            assert_eq!(doc, original);
        }
    }

    #[test]
    fn nested_annotations_are_found() {
        let mut doc = parse(indoc! {"
            components:
              schemas:
                Request:
                  type: object
                  properties:
                    legacy:
                      type: string
                      x-glean-deprecated:
                        message: Do not use
                    items:
                      type: array
                      items:
                        - x-glean-deprecated: {removal: '2026-01-01'}
        "});
        rewrite(&mut doc);
        let props = &doc["components"]["schemas"]["Request"]["properties"];
        assert_eq!(props["legacy"][MESSAGE].as_str(), Some("Do not use"));
        assert_eq!(props["legacy"]["deprecated"], Value::Bool(true));
        assert_eq!(
            props["items"]["items"][0][MESSAGE].as_str(),
            Some("Removal scheduled for 2026-01-01")
        );
    }
}
