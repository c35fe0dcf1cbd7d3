//! Code-sample rewriting.
//!
//! Operations carry per-language example code under `x-codeSamples` (or
//! `x-code-samples`). Rewrites are organized as rule families, each a table
//! from language tag to an ordered list of regex substitutions:
//!
//! - [`namespace_imports`]: Python imports move under `glean.api_client`
//! - [`server_url`]: client constructors gain a server URL argument that
//!   mirrors the API token argument
//!
//! Substitutions are tied to the exact shape of the generated samples. A
//! pattern that does not match is skipped silently.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_yaml_ng::{Mapping, Value};
use tracing::debug;

use openapi_transform_core::ValueExt;

use crate::config::CodeSampleConfig;
use crate::document::{self, DocumentFormat};
use crate::error::Result;
use crate::rules::helpers::{for_each_operation, is_http_method, CODE_SAMPLE_KEYS};

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pattern).expect("static regex must compile"));
    };
}

static_regex!(PY_FROM_PACKAGE, r"from glean import\s+");
static_regex!(PY_FROM_MODULE, r"from glean\.([^.\s]+)");
static_regex!(PY_IMPORT_MODULE, r"import glean\.([^.\s]+)");

static_regex!(PY_TOKEN_ARG, r"(?m)^([ \t]*)api_token=.*,[ \t]*$");
static_regex!(TS_TOKEN_ARG, r"(?m)^([ \t]*)apiToken:.*,[ \t]*$");
static_regex!(GO_TOKEN_ARG, r"(?m)^([ \t]*)apiclientgo\.WithSecurity\(.*\),[ \t]*$");
static_regex!(JAVA_TOKEN_ARG, r"(?m)^([ \t]*)\.apiToken\(.*\)[ \t]*$");

const NAMESPACE: &str = "api_client";

/// How a match is replaced.
#[derive(Debug, Clone)]
pub enum Rewrite {
    /// Replacement template with `$n` / `${n}` capture references.
    Template(String),
    /// Replacement computed from the captures.
    With(fn(&Captures<'_>) -> String),
}

/// One substitution over a sample's source text.
#[derive(Debug, Clone)]
pub struct SampleRule {
    /// What to match.
    pub pattern: &'static Regex,
    /// What to replace each match with.
    pub rewrite: Rewrite,
    /// Skip the rule when the source already contains this text.
    pub unless: Option<String>,
}

impl SampleRule {
    /// Rewrite `source`, or `None` when the rule is skipped or nothing matched.
    #[must_use]
    pub fn apply(&self, source: &str) -> Option<String> {
        if self
            .unless
            .as_deref()
            .is_some_and(|marker| source.contains(marker))
        {
            return None;
        }
        if !self.pattern.is_match(source) {
            return None;
        }
        let rewritten = match &self.rewrite {
            Rewrite::Template(template) => self.pattern.replace_all(source, template.as_str()),
            Rewrite::With(f) => self.pattern.replace_all(source, *f),
        };
        (rewritten != source).then(|| rewritten.into_owned())
    }
}

/// A named table from language tag to ordered substitutions.
#[derive(Debug, Clone)]
pub struct RuleFamily {
    name: &'static str,
    languages: Vec<(&'static str, Vec<SampleRule>)>,
}

impl RuleFamily {
    /// Family name (for logs).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Substitutions for `lang`, in application order.
    #[must_use]
    pub fn rules_for(&self, lang: &str) -> &[SampleRule] {
        self.languages
            .iter()
            .find(|(tag, _)| *tag == lang)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or_default()
    }

    /// Run this family's substitutions for `lang` over `source`, each on the
    /// result of the previous one. `None` when nothing changed.
    #[must_use]
    pub fn rewrite(&self, lang: &str, source: &str) -> Option<String> {
        let mut out: Option<String> = None;
        for rule in self.rules_for(lang) {
            if let Some(next) = rule.apply(out.as_deref().unwrap_or(source)) {
                out = Some(next);
            }
        }
        out
    }
}

fn keep_existing_namespace(caps: &Captures<'_>, prefix: &str) -> String {
    let module = &caps[1];
    if module.starts_with(NAMESPACE) {
        caps[0].to_string()
    } else {
        format!("{prefix} glean.{NAMESPACE}.{module}")
    }
}

/// Python imports from the top-level `glean` package move to
/// `glean.api_client`. Already-namespaced imports are left alone.
#[must_use]
pub fn namespace_imports() -> RuleFamily {
    RuleFamily {
        name: "namespace-imports",
        languages: vec![(
            "python",
            vec![
                SampleRule {
                    pattern: &PY_FROM_PACKAGE,
                    rewrite: Rewrite::Template(format!("from glean.{NAMESPACE} import ")),
                    unless: None,
                },
                SampleRule {
                    pattern: &PY_FROM_MODULE,
                    rewrite: Rewrite::With(|caps| keep_existing_namespace(caps, "from")),
                    unless: None,
                },
                SampleRule {
                    pattern: &PY_IMPORT_MODULE,
                    rewrite: Rewrite::With(|caps| keep_existing_namespace(caps, "import")),
                    unless: None,
                },
            ],
        )],
    }
}

/// Add a server URL argument next to the API token argument of each client
/// constructor, with the same indentation. Samples that already set a server
/// URL are left alone.
#[must_use]
pub fn server_url(url: &str) -> RuleFamily {
    let url = url.replace('$', "$$");
    let inject = |pattern: &'static Regex, line: String, marker: &str| SampleRule {
        pattern,
        rewrite: Rewrite::Template(format!("${{0}}\n${{1}}{line}")),
        unless: Some(marker.to_string()),
    };

    RuleFamily {
        name: "server-url",
        languages: vec![
            (
                "python",
                vec![inject(&PY_TOKEN_ARG, format!("server_url=\"{url}\","), "server_url=")],
            ),
            (
                "typescript",
                vec![inject(&TS_TOKEN_ARG, format!("serverURL: \"{url}\","), "serverURL:")],
            ),
            (
                "go",
                vec![inject(
                    &GO_TOKEN_ARG,
                    format!("apiclientgo.WithServerURL(\"{url}\"),"),
                    "WithServerURL(",
                )],
            ),
            (
                "java",
                vec![inject(&JAVA_TOKEN_ARG, format!(".serverURL(\"{url}\")"), ".serverURL(")],
            ),
        ],
    }
}

/// The families enabled by `config`, in application order: namespace
/// imports first, then server URL injection.
#[must_use]
pub fn families(config: &CodeSampleConfig) -> Vec<RuleFamily> {
    let mut families = vec![namespace_imports()];
    if let Some(url) = config.server_url.as_deref().filter(|u| !u.is_empty()) {
        families.push(server_url(url));
    }
    families
}

/// Apply `families` in order to every code sample of every operation.
///
/// Returns the number of samples whose source changed.
pub fn rewrite_code_samples(doc: &mut Value, families: &[RuleFamily]) -> usize {
    let mut changed = 0;
    for_each_operation(doc, |path, method, op| {
        for key in CODE_SAMPLE_KEYS {
            let Some(samples) = op.sequence_mut(key) else {
                continue;
            };
            for sample in samples.iter_mut().filter_map(Value::as_mapping_mut) {
                if rewrite_sample(sample, families) {
                    debug!(path, method, lang = sample.str_field("lang"), "rewrote code sample");
                    changed += 1;
                }
            }
        }
    });
    changed
}

fn rewrite_sample(sample: &mut Mapping, families: &[RuleFamily]) -> bool {
    let (Some(lang), Some(source)) = (sample.str_field("lang"), sample.str_field("source")) else {
        return false;
    };
    let mut out: Option<String> = None;
    for family in families {
        if let Some(next) = family.rewrite(lang, out.as_deref().unwrap_or(source)) {
            out = Some(next);
        }
    }
    let Some(rewritten) = out else {
        return false;
    };
    sample.insert(Value::from("source"), Value::String(rewritten));
    true
}

/// First code sample for `lang` among the operations of one path item.
pub fn extract_code_sample<'a>(path_item: &'a Value, lang: &str) -> Option<&'a Mapping> {
    path_item
        .as_mapping()?
        .iter()
        .filter(|(method, _)| method.as_str().is_some_and(is_http_method))
        .flat_map(|(_, op)| CODE_SAMPLE_KEYS.iter().filter_map(move |key| op.sequence(key)))
        .flatten()
        .filter_map(Value::as_mapping)
        .find(|sample| sample.str_field("lang") == Some(lang))
}

/// Rewrite the code samples of one document's text.
///
/// # Errors
///
/// Returns an error if the text cannot be parsed or serialized.
pub fn transform(content: &str, filename: &str, config: &CodeSampleConfig) -> Result<String> {
    let format = DocumentFormat::from_path(filename);
    let mut doc = document::parse(content, format)?;
    let changed = rewrite_code_samples(&mut doc, &families(config));
    debug!(file = filename, changed, "rewrote code samples");
    document::serialize(&doc, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn python(source: &str) -> String {
        namespace_imports()
            .rewrite("python", source)
            .unwrap_or_else(|| source.to_string())
    }

    #[test]
    fn package_import_is_namespaced() {
        assert_eq!(
            python("from glean import Glean, models\nimport os\n"),
            "from glean.api_client import Glean, models\nimport os\n"
        );
    }

    #[test]
    fn module_imports_are_namespaced() {
        assert_eq!(
            python("from glean.models import Chat\nimport glean.errors\n"),
            "from glean.api_client.models import Chat\nimport glean.api_client.errors\n"
        );
    }

    #[test]
    fn namespaced_imports_are_left_alone() {
        let source = indoc! {"
            from glean.api_client import Glean
            from glean.api_client.models import Chat
            import glean.api_client.errors
        "};
        assert!(namespace_imports().rewrite("python", source).is_none());
    }

    #[test]
    fn other_languages_are_not_touched() {
        let source = "from glean import Glean";
        assert!(namespace_imports().rewrite("typescript", source).is_none());
        assert!(namespace_imports().rules_for("go").is_empty());
    }

    #[test]
    fn server_url_mirrors_token_indentation() {
        let family = server_url("mycompany-be.glean.com");
        let source = indoc! {r#"
            with Glean(
                api_token=os.getenv("GLEAN_API_TOKEN", ""),
            ) as g_client:
                pass
        "#};
        assert_eq!(
            family.rewrite("python", source).unwrap(),
            indoc! {r#"
                with Glean(
                    api_token=os.getenv("GLEAN_API_TOKEN", ""),
                    server_url="mycompany-be.glean.com",
                ) as g_client:
                    pass
            "#}
        );
    }

    #[test]
    fn server_url_injection_is_idempotent() {
        let family = server_url("mycompany-be.glean.com");
        let once = family
            .rewrite("typescript", "const glean = new Glean({\n  apiToken: token,\n});\n")
            .unwrap();
        assert_eq!(
            once,
            "const glean = new Glean({\n  apiToken: token,\n  serverURL: \"mycompany-be.glean.com\",\n});\n"
        );
        assert!(family.rewrite("typescript", &once).is_none());
    }

    #[test]
    fn dollar_signs_in_url_are_literal() {
        let family = server_url("https://$tenant.example.com");
        let out = family.rewrite("java", "        .apiToken(\"t\")\n").unwrap();
        assert_eq!(
            out,
            "        .apiToken(\"t\")\n        .serverURL(\"https://$tenant.example.com\")\n"
        );
    }

    #[test]
    fn rewrites_every_operation_and_container() {
        let mut doc: Value = serde_yaml_ng::from_str(indoc! {r#"
            paths:
              /rest/api/v1/chat:
                post:
                  x-codeSamples:
                    - lang: python
                      source: from glean import Glean
                    - lang: curl
                      source: curl https://example.com
              /rest/api/v1/search:
                summary: not an operation
                post:
                  x-code-samples:
                    - lang: python
                      source: from glean.models import Search
        "#})
        .unwrap();

        let changed = rewrite_code_samples(&mut doc, &[namespace_imports()]);
        assert_eq!(changed, 2);

        let chat = extract_code_sample(&doc["paths"]["/rest/api/v1/chat"], "python").unwrap();
        assert_eq!(chat["source"].as_str(), Some("from glean.api_client import Glean"));
        let curl = extract_code_sample(&doc["paths"]["/rest/api/v1/chat"], "curl").unwrap();
        assert_eq!(curl["source"].as_str(), Some("curl https://example.com"));
        let search = extract_code_sample(&doc["paths"]["/rest/api/v1/search"], "python").unwrap();
        assert_eq!(
            search["source"].as_str(),
            Some("from glean.api_client.models import Search")
        );
        assert!(extract_code_sample(&doc["paths"]["/rest/api/v1/search"], "go").is_none());
    }

    #[test]
    fn families_follow_config() {
        assert_eq!(families(&CodeSampleConfig::default()).len(), 1);
        let config = CodeSampleConfig {
            server_url: Some("acme-be.glean.com".to_string()),
        };
        let names: Vec<_> = families(&config).iter().map(RuleFamily::name).collect();
        assert_eq!(names, vec!["namespace-imports", "server-url"]);
    }
}
