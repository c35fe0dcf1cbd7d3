//! Security scheme renames and consolidation.

use serde_yaml_ng::Value;
use tracing::debug;

use openapi_transform_core::{rename_key, rewrite_strings, ValueExt};

use super::helpers::{for_each_code_sample_container, for_each_security_list};
use crate::config::{SchemeConsolidation, SecuritySchemeRename};

/// Rename a security scheme everywhere it is named.
///
/// Renames the `components.securitySchemes` entry, every requirement key
/// (document default and per-operation overrides, scopes preserved) and the
/// configured alternate spellings inside code samples. Documents without a
/// `securitySchemes` registry are left alone. Returns `false` in that case.
pub fn rename_security_scheme(doc: &mut Value, rename: &SecuritySchemeRename) -> bool {
    let Some(schemes) = doc
        .dig_mut(&["components", "securitySchemes"])
        .and_then(Value::as_mapping_mut)
    else {
        return false;
    };
    let registry_renamed = rename_key(schemes, &rename.from, &rename.to);

    let mut requirements = 0;
    for_each_security_list(doc, |list| {
        for requirement in list.iter_mut() {
            if let Some(requirement) = requirement.as_mapping_mut() {
                if rename_key(requirement, &rename.from, &rename.to) {
                    requirements += 1;
                }
            }
        }
    });

    let pairs = rename.text_pairs();
    let mut samples = 0;
    for_each_code_sample_container(doc, |container| {
        samples += rewrite_strings(container, &pairs);
    });

    debug!(
        from = %rename.from,
        to = %rename.to,
        registry_renamed,
        requirements,
        samples,
        "renamed security scheme"
    );
    true
}

/// Collapse an equivalent auth scheme into the canonical one.
///
/// - the `extra` scheme is removed from the registry and from every
///   requirement object
/// - the `alias` scheme becomes `canonical` in every requirement object; in
///   the registry it is renamed when `canonical` is not defined yet, and
///   removed otherwise
/// - requirement objects that are empty after this cleanup are dropped from
///   their list, including ones that were empty to begin with; lists keep the
///   order of surviving entries
pub fn consolidate_security_schemes(doc: &mut Value, consolidation: &SchemeConsolidation) {
    if doc.mapping("components").is_none() {
        return;
    }
    let alias = consolidation.alias.as_str();
    let canonical = consolidation.canonical.as_str();
    let extra = consolidation.extra.as_str();

    if let Some(schemes) = doc
        .dig_mut(&["components", "securitySchemes"])
        .and_then(Value::as_mapping_mut)
    {
        schemes.shift_remove(extra);
        if schemes.contains_key(alias) {
            if schemes.contains_key(canonical) {
                schemes.shift_remove(alias);
            } else {
                rename_key(schemes, alias, canonical);
            }
        }
    }

    let mut dropped = 0;
    for_each_security_list(doc, |list| {
        let before = list.len();
        list.retain_mut(|requirement| {
            let Some(requirement) = requirement.as_mapping_mut() else {
                return true;
            };
            rename_key(requirement, alias, canonical);
            requirement.shift_remove(extra);
            !requirement.is_empty()
        });
        dropped += before - list.len();
    });

    debug!(alias, canonical, extra, dropped, "consolidated security schemes");
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(yaml: &str) -> Value {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    fn keys(value: &Value) -> Vec<&str> {
        value
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect()
    }

    #[test]
    fn renames_registry_requirements_and_samples() {
        let mut doc = parse(indoc! {r#"
            security:
              - BearerAuth: []
              - OtherAuth: []
            paths:
              /search:
                post:
                  security:
                    - BearerAuth: [read]
                      Extra: []
                  x-code-samples:
                    - lang: python
                      source: |
                        client = Glean(bearerAuth=os.getenv("BEARER_AUTH"))
                  x-codeSamples:
                    - lang: go
                      source: sdk.WithSecurity(os.Getenv("BEARER_AUTH"))
                  description: mentions bearerAuth outside samples
            components:
              securitySchemes:
                First: {type: apiKey}
                BearerAuth: {type: http, scheme: bearer}
        "#});

        assert!(rename_security_scheme(&mut doc, &SecuritySchemeRename::default()));

        assert_eq!(
            keys(&doc["components"]["securitySchemes"]),
            vec!["First", "APIToken"]
        );
        assert_eq!(keys(&doc["security"][0]), vec!["APIToken"]);
        assert_eq!(keys(&doc["security"][1]), vec!["OtherAuth"]);

        let op = &doc["paths"]["/search"]["post"];
        assert_eq!(keys(&op["security"][0]), vec!["APIToken", "Extra"]);
        assert_eq!(op["security"][0]["APIToken"][0].as_str(), Some("read"));
        assert_eq!(
            op["x-code-samples"][0]["source"].as_str(),
            Some("client = Glean(apiToken=os.getenv(\"API_TOKEN\"))\n")
        );
        assert_eq!(
            op["x-codeSamples"][0]["source"].as_str(),
            Some("sdk.WithSecurity(os.Getenv(\"API_TOKEN\"))")
        );
        assert_eq!(
            op["description"].as_str(),
            Some("mentions bearerAuth outside samples")
        );
    }

    #[test]
    fn absent_registry_is_a_noop() {
        let mut doc = parse("security:\n  - BearerAuth: []\n");
        let original = doc.clone();
        assert!(!rename_security_scheme(&mut doc, &SecuritySchemeRename::default()));
        assert_eq!(doc, original);
    }

    #[test]
    fn rename_is_idempotent() {
        let mut doc = parse(indoc! {"
            security:
              - BearerAuth: []
            components:
              securitySchemes:
                BearerAuth: {type: http}
        "});
        rename_security_scheme(&mut doc, &SecuritySchemeRename::default());
        let once = doc.clone();
        rename_security_scheme(&mut doc, &SecuritySchemeRename::default());
        assert_eq!(doc, once);
    }

    #[test]
    fn consolidation_drops_extra_and_emptied_requirements() {
        let mut doc = parse(indoc! {"
            security:
              - cookieAuth: []
              - actAsBearerToken: []
              - {}
            paths:
              /users:
                get:
                  security:
                    - APIToken: []
                    - cookieAuth: []
                      actAsBearerToken: [admin]
            components:
              securitySchemes:
                APIToken: {type: http}
                actAsBearerToken: {type: http}
                cookieAuth: {type: apiKey}
        "});

        consolidate_security_schemes(&mut doc, &SchemeConsolidation::default());

        assert_eq!(keys(&doc["components"]["securitySchemes"]), vec!["APIToken"]);

        let top = doc["security"].as_sequence().unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(keys(&top[0]), vec!["APIToken"]);

        let op = doc["paths"]["/users"]["get"]["security"].as_sequence().unwrap();
        assert_eq!(op.len(), 2);
        assert_eq!(keys(&op[0]), vec!["APIToken"]);
        assert_eq!(keys(&op[1]), vec!["APIToken"]);
        assert_eq!(op[1]["APIToken"][0].as_str(), Some("admin"));
    }

    #[test]
    fn consolidation_drops_requirements_that_were_already_empty() {
        let mut doc = parse(indoc! {"
            security:
              - {}
              - APIToken: []
            components:
              securitySchemes:
                APIToken: {type: http}
        "});

        consolidate_security_schemes(&mut doc, &SchemeConsolidation::default());

        let top = doc["security"].as_sequence().unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(keys(&top[0]), vec!["APIToken"]);
    }

    #[test]
    fn consolidation_renames_alias_in_registry_when_canonical_missing() {
        let mut doc = parse(indoc! {"
            components:
              securitySchemes:
                actAsBearerToken: {type: http, scheme: bearer}
        "});
        consolidate_security_schemes(&mut doc, &SchemeConsolidation::default());
        assert_eq!(keys(&doc["components"]["securitySchemes"]), vec!["APIToken"]);
        assert_eq!(
            doc["components"]["securitySchemes"]["APIToken"]["scheme"].as_str(),
            Some("bearer")
        );
    }

    #[test]
    fn consolidation_without_components_is_a_noop() {
        let mut doc = parse("security:\n  - cookieAuth: []\n");
        let original = doc.clone();
        consolidate_security_schemes(&mut doc, &SchemeConsolidation::default());
        assert_eq!(doc, original);
    }
}
