//! Enum description vendor-key conversion.

use serde_yaml_ng::Value;
use tracing::debug;

use openapi_transform_core::{val_s, walk_mut, Visit};

use crate::config::{EnumDescriptionPolicy, EnumDescriptions};

/// Copy (or move) the enum description map from the source vendor key to the
/// target key on every mapping node in the document.
///
/// The value is copied as-is. Under [`EnumDescriptionPolicy::Copy`] the
/// source key stays for tools that read it; under
/// [`EnumDescriptionPolicy::Move`] it is removed. Null or `false` values are
/// treated as absent.
pub fn convert_enum_descriptions(doc: &mut Value, config: &EnumDescriptions) -> usize {
    if config.source_key == config.target_key {
        return 0;
    }
    let mut converted = 0;
    walk_mut(doc, &mut |node, _| {
        let Some(map) = node.as_mapping_mut() else {
            return Visit::Continue;
        };
        let Some(descriptions) = map
            .get(config.source_key.as_str())
            .filter(|v| !matches!(v, Value::Null | Value::Bool(false)))
            .cloned()
        else {
            return Visit::Continue;
        };

        map.insert(val_s(&config.target_key), descriptions);
        if config.policy == EnumDescriptionPolicy::Move {
            map.shift_remove(config.source_key.as_str());
        }
        converted += 1;
        Visit::Continue
    });

    if converted > 0 {
        debug!(converted, policy = ?config.policy, "converted enum descriptions");
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(yaml: &str) -> Value {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    const DOC: &str = indoc! {"
        components:
          schemas:
            Status:
              type: string
              enum: [ACTIVE, ARCHIVED]
              x-enumDescriptions:
                ACTIVE: In use
                ARCHIVED: Kept for history
            Holder:
              type: object
              properties:
                nested:
                  type: array
                  items:
                    type: string
                    enum: [A]
                    x-enumDescriptions: {A: Letter a}
                untouched:
                  type: string
    "};

    #[test]
    fn copy_keeps_both_keys_at_every_depth() {
        let mut doc = parse(DOC);
        let converted = convert_enum_descriptions(&mut doc, &EnumDescriptions::default());
        assert_eq!(converted, 2);

        let status = &doc["components"]["schemas"]["Status"];
        assert_eq!(status["x-enumDescriptions"], status["x-speakeasy-enum-descriptions"]);
        assert_eq!(
            status["x-speakeasy-enum-descriptions"]["ARCHIVED"].as_str(),
            Some("Kept for history")
        );

        let items = &doc["components"]["schemas"]["Holder"]["properties"]["nested"]["items"];
        assert_eq!(
            items["x-speakeasy-enum-descriptions"]["A"].as_str(),
            Some("Letter a")
        );
        assert!(doc["components"]["schemas"]["Holder"]["properties"]["untouched"]
            .get("x-speakeasy-enum-descriptions")
            .is_none());
    }

    #[test]
    fn move_removes_source_key() {
        let mut doc = parse(DOC);
        let config = EnumDescriptions {
            policy: EnumDescriptionPolicy::Move,
            ..EnumDescriptions::default()
        };
        convert_enum_descriptions(&mut doc, &config);

        let status = &doc["components"]["schemas"]["Status"];
        assert!(status.get("x-enumDescriptions").is_none());
        assert_eq!(
            status["x-speakeasy-enum-descriptions"]["ACTIVE"].as_str(),
            Some("In use")
        );

        let once = doc.clone();
        assert_eq!(convert_enum_descriptions(&mut doc, &config), 0);
        assert_eq!(doc, once);
    }

    #[test]
    fn copy_is_idempotent() {
        let mut doc = parse(DOC);
        convert_enum_descriptions(&mut doc, &EnumDescriptions::default());
        let once = doc.clone();
        convert_enum_descriptions(&mut doc, &EnumDescriptions::default());
        assert_eq!(doc, once);
    }

    #[test]
    fn null_source_is_absent() {
        let mut doc = parse("x-enumDescriptions: null\n");
        assert_eq!(
            convert_enum_descriptions(&mut doc, &EnumDescriptions::default()),
            0
        );
        assert!(doc.get("x-speakeasy-enum-descriptions").is_none());
    }
}
