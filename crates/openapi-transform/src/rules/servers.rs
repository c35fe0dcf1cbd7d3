//! Server URL handling: base-path extraction, path prefixing and server
//! variable renames.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde_yaml_ng::{Mapping, Value};
use tracing::{debug, warn};

use openapi_transform_core::{key_text, rename_key, val_s, ValueExt};

use crate::config::ServerVariableRename;
use crate::pipeline::SkipReason;

/// `{name}` template placeholders in server URLs.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]+\}").expect("static regex must compile"));

/// Static path component of a (possibly templated) server URL.
///
/// Placeholders are replaced by a dummy host label before parsing. The path
/// is the parsed URL's normalized path (dot segments resolved, unsafe
/// characters percent-encoded) minus one trailing slash, so
/// `https://{domain}-be.glean.com/rest/api/v1/` yields `/rest/api/v1`. A URL
/// without a path yields an empty string; so does a URL that cannot be
/// parsed (logged at `warn`).
pub fn extract_base_path(url: &str) -> String {
    let concrete = PLACEHOLDER.replace_all(url, "domain");
    match Url::parse(&concrete) {
        Ok(parsed) => {
            let path = parsed.path();
            path.strip_suffix('/').unwrap_or(path).to_string()
        }
        Err(error) => {
            warn!(url, %error, "unable to parse server URL");
            String::new()
        }
    }
}

/// Move the first server's base path from every server URL onto every path
/// key.
///
/// Returns the base path that was applied, or the reason the document has
/// to be left alone: no servers, a first server without a URL, or a URL
/// with no static path. Nothing is modified in the error case.
pub fn apply_base_path(doc: &mut Value) -> Result<String, SkipReason> {
    let first = doc
        .sequence("servers")
        .and_then(|servers| servers.first())
        .ok_or(SkipReason::NoServers)?;
    let url = first
        .str_field("url")
        .filter(|url| !url.is_empty())
        .ok_or(SkipReason::MissingServerUrl)?;

    let base_path = extract_base_path(url);
    if base_path.is_empty() {
        return Err(SkipReason::EmptyBasePath);
    }

    strip_base_path(doc, &base_path);
    prefix_paths(doc, &base_path);
    debug!(base_path, "applied base path");
    Ok(base_path)
}

/// Remove the first occurrence of `base_path` from every server URL.
fn strip_base_path(doc: &mut Value, base_path: &str) {
    let Some(servers) = doc.sequence_mut("servers") else {
        return;
    };
    for server in servers {
        if let Some(url) = server.field_mut("url") {
            if let Some(stripped) = url.as_str().map(|u| u.replacen(base_path, "", 1)) {
                *url = Value::String(stripped);
            }
        }
    }
}

/// Re-key every path template as `{base_path}/{template}`.
///
/// Entry order and values are kept. When two templates collapse onto the same
/// key the first one wins and the collision is logged.
fn prefix_paths(doc: &mut Value, base_path: &str) {
    let Some(paths) = doc.mapping_mut("paths") else {
        return;
    };

    let mut prefixed = Mapping::with_capacity(paths.len());
    for (key, item) in std::mem::take(paths) {
        let Some(template) = key_text(&key) else {
            prefixed.insert(key, item);
            continue;
        };
        let new_key = if template.starts_with('/') {
            format!("{base_path}{template}")
        } else {
            format!("{base_path}/{template}")
        };
        if prefixed.contains_key(new_key.as_str()) {
            warn!(path = %new_key, "duplicate path after prefixing; keeping the first entry");
            continue;
        }
        prefixed.insert(val_s(&new_key), item);
    }
    *paths = prefixed;
}

/// Rename a server template variable in every server entry.
///
/// Every `{from}` placeholder in a server URL becomes `{to}`. A variable
/// record named `from` is renamed in place and its content replaced by the
/// configured default and description.
pub fn rename_server_variable(doc: &mut Value, rename: &ServerVariableRename) {
    let Some(servers) = doc.sequence_mut("servers") else {
        return;
    };
    let from_token = format!("{{{}}}", rename.from);
    let to_token = format!("{{{}}}", rename.to);

    for server in servers {
        let Some(server) = server.as_mapping_mut() else {
            continue;
        };

        if let Some(url) = server.get_mut("url") {
            if let Some(renamed) = url
                .as_str()
                .filter(|u| u.contains(&from_token))
                .map(|u| u.replace(&from_token, &to_token))
            {
                *url = Value::String(renamed);
            }
        }

        let Some(variables) = server.mapping_mut("variables") else {
            continue;
        };
        if rename_key(variables, &rename.from, &rename.to) {
            let mut record = Mapping::new();
            record.insert(val_s("default"), val_s(&rename.default));
            record.insert(val_s("description"), val_s(&rename.description));
            variables.insert(val_s(&rename.to), Value::Mapping(record));
            debug!(from = %rename.from, to = %rename.to, "renamed server variable");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(yaml: &str) -> Value {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn base_path_from_templated_url() {
        assert_eq!(
            extract_base_path("https://{domain}-be.glean.com/rest/api/v1"),
            "/rest/api/v1"
        );
        assert_eq!(
            extract_base_path("https://{domain}-be.glean.com/api/index/v1/"),
            "/api/index/v1"
        );
        assert_eq!(extract_base_path("https://example.com/v1?x=1#top"), "/v1");
    }

    #[test]
    fn base_path_empty_cases() {
        assert_eq!(extract_base_path("https://{domain}-be.glean.com"), "");
        assert_eq!(extract_base_path("https://{domain}-be.glean.com/"), "");
        assert_eq!(extract_base_path("not a url"), "");
        assert_eq!(extract_base_path("/rest/api/v1"), "");
        assert_eq!(extract_base_path("https:///rest"), "");
        assert_eq!(extract_base_path("https://{domain}-be.glean.com:99999/rest"), "");
    }

    #[test]
    fn base_path_is_normalized_like_a_browser_url() {
        assert_eq!(
            extract_base_path("https://{domain}-be.glean.com/rest/./api/../api/v1"),
            "/rest/api/v1"
        );
        assert_eq!(
            extract_base_path("https://{domain}-be.glean.com/rest api/v1"),
            "/rest%20api/v1"
        );
        assert_eq!(
            extract_base_path(r"https://{domain}-be.glean.com\rest\api"),
            "/rest/api"
        );
    }

    #[test]
    fn apply_base_path_rekeys_paths_and_strips_servers() {
        let mut doc = parse(indoc! {"
            servers:
              - url: https://{domain}-be.glean.com/rest/api/v1
              - url: https://staging.glean.com/rest/api/v1
            paths:
              /activity:
                post: {operationId: activity}
              search:
                post: {operationId: search}
        "});
        let before = doc["paths"].as_mapping().unwrap().len();

        assert_eq!(apply_base_path(&mut doc).unwrap(), "/rest/api/v1");

        let paths = doc["paths"].as_mapping().unwrap();
        let keys: Vec<_> = paths.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["/rest/api/v1/activity", "/rest/api/v1/search"]);
        assert_eq!(paths.len(), before);
        assert_eq!(
            paths["/rest/api/v1/search"]["post"]["operationId"].as_str(),
            Some("search")
        );
        assert_eq!(
            doc["servers"][0]["url"].as_str(),
            Some("https://{domain}-be.glean.com")
        );
        assert_eq!(
            doc["servers"][1]["url"].as_str(),
            Some("https://staging.glean.com")
        );
    }

    #[test]
    fn apply_base_path_reports_skip_reasons() {
        let mut no_servers = parse("paths: {}\n");
        assert_eq!(apply_base_path(&mut no_servers), Err(SkipReason::NoServers));

        let mut empty_list = parse("servers: []\n");
        assert_eq!(apply_base_path(&mut empty_list), Err(SkipReason::NoServers));

        let mut no_url = parse("servers:\n  - description: prod\n");
        assert_eq!(apply_base_path(&mut no_url), Err(SkipReason::MissingServerUrl));

        let mut no_path = parse("servers:\n  - url: https://{instance}-be.glean.com\npaths:\n  /a: {}\n");
        let original = no_path.clone();
        assert_eq!(apply_base_path(&mut no_path), Err(SkipReason::EmptyBasePath));
        assert_eq!(no_path, original);
    }

    #[test]
    fn colliding_paths_keep_first_entry() {
        let mut doc = parse(indoc! {"
            paths:
              /a: {get: {operationId: first}}
              a: {get: {operationId: second}}
        "});
        prefix_paths(&mut doc, "/v1");
        let paths = doc["paths"].as_mapping().unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths["/v1/a"]["get"]["operationId"].as_str(), Some("first"));
    }

    #[test]
    fn renames_placeholder_and_variable_record() {
        let mut doc = parse(indoc! {"
            servers:
              - url: https://{domain}-be.glean.com
                variables:
                  region:
                    default: us
                  domain:
                    default: domain
                    description: Email domain
                  port:
                    default: '443'
              - url: https://static.glean.com
        "});

        rename_server_variable(&mut doc, &ServerVariableRename::default());

        let server = &doc["servers"][0];
        assert_eq!(server["url"].as_str(), Some("https://{instance}-be.glean.com"));
        let variables = server["variables"].as_mapping().unwrap();
        let keys: Vec<_> = variables.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["region", "instance", "port"]);
        assert_eq!(variables["instance"]["default"].as_str(), Some("instance-name"));
        assert!(variables["instance"]["description"]
            .as_str()
            .unwrap()
            .starts_with("The instance name"));
        assert_eq!(doc["servers"][1]["url"].as_str(), Some("https://static.glean.com"));
    }

    #[test]
    fn rename_without_variables_only_touches_url() {
        let mut doc = parse("servers:\n  - url: https://{domain}.example.com/{domain}\n");
        rename_server_variable(&mut doc, &ServerVariableRename::default());
        assert_eq!(
            doc["servers"][0]["url"].as_str(),
            Some("https://{instance}.example.com/{instance}")
        );
        assert!(doc["servers"][0].get("variables").is_none());
    }
}
