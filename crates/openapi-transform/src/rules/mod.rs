//! Rewrite rules applied to one parsed spec document.
//!
//! Each rule is a descriptor: a stable name, an applicability predicate over
//! the file name, and a transform over the document tree. The order in which
//! rules run is data ([`RuleSet`]), not a hardcoded call sequence, so tests can
//! assert it directly.
//!
//! Rules are grouped into modules by the part of the document they touch:
//! - `components`: component registry renames
//! - `security`: security scheme renames and consolidation
//! - `servers`: base-path extraction, path prefixing, server variables
//! - `enums`: enum description vendor-key conversion
//! - `deprecation`: deprecation annotations → SDK generator fields
//! - `provenance`: commit identifier injection

mod components;
mod deprecation;
mod enums;
pub(crate) mod helpers;
mod provenance;
mod security;
mod servers;

use std::fmt;
use std::path::Path;

use serde_yaml_ng::Value;
use tracing::debug;

use crate::config::ProjectConfig;

pub use components::rename_component;
pub use deprecation::{build_deprecation_message, rewrite_deprecations};
pub use enums::convert_enum_descriptions;
pub use provenance::inject_provenance;
pub use security::{consolidate_security_schemes, rename_security_scheme};
pub use servers::{apply_base_path, extract_base_path, rename_server_variable};

/// Per-document inputs visible to every rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleContext {
    /// Name of the file being processed (a path is accepted; only the file
    /// name is compared).
    pub filename: String,
    /// Commit identifier of the spec repository, if known.
    pub commit_sha: Option<String>,
}

impl RuleContext {
    /// Context for `filename` without a commit identifier.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            commit_sha: None,
        }
    }

    /// Attach a commit identifier. Empty strings count as absent.
    #[must_use]
    pub fn with_commit_sha(mut self, sha: Option<&str>) -> Self {
        self.commit_sha = sha.filter(|s| !s.is_empty()).map(ToString::to_string);
        self
    }

    fn file_name(&self) -> &str {
        Path::new(&self.filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.filename)
    }
}

/// Which documents a rule fires on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applicability {
    /// Every document.
    Always,
    /// Only documents whose file name equals one of these.
    Files(Vec<String>),
}

impl Applicability {
    /// `Always` for an empty list, `Files` otherwise.
    #[must_use]
    pub fn files(files: &[String]) -> Self {
        if files.is_empty() {
            Self::Always
        } else {
            Self::Files(files.to_vec())
        }
    }

    /// Whether a document named `file_name` is selected.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::Always => true,
            Self::Files(files) => files.iter().any(|f| f == file_name),
        }
    }
}

type Transform = Box<dyn Fn(&mut Value, &RuleContext) + Send + Sync>;

/// A named, file-scoped document transform.
pub struct Rule {
    name: &'static str,
    applicability: Applicability,
    transform: Transform,
}

impl Rule {
    /// Rule that applies to every document.
    pub fn new(
        name: &'static str,
        transform: impl Fn(&mut Value, &RuleContext) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            applicability: Applicability::Always,
            transform: Box::new(transform),
        }
    }

    /// Restrict the rule to some documents.
    #[must_use]
    pub fn applies(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    /// Stable rule name (e.g. `rename-component`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The rule's applicability predicate.
    #[must_use]
    pub fn applicability(&self) -> &Applicability {
        &self.applicability
    }

    /// Run the rule if it applies to `ctx`, returning the rewritten tree.
    ///
    /// Documents the rule does not apply to are returned untouched.
    #[must_use]
    pub fn apply(&self, mut doc: Value, ctx: &RuleContext) -> Value {
        if self.applicability.matches(ctx.file_name()) {
            debug!(rule = self.name, file = %ctx.filename, "applying rule");
            (self.transform)(&mut doc, ctx);
        }
        doc
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("applicability", &self.applicability)
            .finish_non_exhaustive()
    }
}

/// An ordered list of rules.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    #[must_use]
    pub fn with(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Build the standard rule order from configuration, skipping disabled
    /// rules:
    ///
    /// 1. `rename-component` (one per configured rename)
    /// 2. `rename-security-scheme`
    /// 3. `rename-server-variable`
    /// 4. `convert-enum-descriptions`
    /// 5. `rewrite-deprecations`
    /// 6. `consolidate-security-schemes`
    /// 7. `inject-provenance`
    #[must_use]
    pub fn from_config(config: &ProjectConfig) -> Self {
        let toggles = &config.transforms;
        let mut set = Self::new();

        if toggles.rename_components {
            for rename in &config.component_renames {
                let applicability = Applicability::files(&rename.files);
                let rename = rename.clone();
                set = set.with(
                    Rule::new("rename-component", move |doc, _| {
                        rename_component(doc, &rename);
                    })
                    .applies(applicability),
                );
            }
        }

        if toggles.rename_security_scheme {
            let rename = config.security.clone();
            set = set.with(Rule::new("rename-security-scheme", move |doc, _| {
                rename_security_scheme(doc, &rename);
            }));
        }

        if toggles.rename_server_variable {
            let rename = config.server_variable.clone();
            set = set.with(Rule::new("rename-server-variable", move |doc, _| {
                rename_server_variable(doc, &rename);
            }));
        }

        if toggles.convert_enum_descriptions {
            let enums = config.enum_descriptions.clone();
            set = set.with(Rule::new("convert-enum-descriptions", move |doc, _| {
                convert_enum_descriptions(doc, &enums);
            }));
        }

        if toggles.rewrite_deprecations {
            let keys = config.deprecation.clone();
            let descriptions_key = config.enum_descriptions.target_key.clone();
            set = set.with(Rule::new("rewrite-deprecations", move |doc, _| {
                rewrite_deprecations(doc, &keys, &descriptions_key);
            }));
        }

        if toggles.consolidate_security_schemes {
            let consolidation = config.consolidation.clone();
            let applicability = Applicability::files(&consolidation.files);
            set = set.with(
                Rule::new("consolidate-security-schemes", move |doc, _| {
                    consolidate_security_schemes(doc, &consolidation);
                })
                .applies(applicability),
            );
        }

        if toggles.inject_provenance {
            let key = config.provenance.key.clone();
            set = set.with(Rule::new("inject-provenance", move |doc, ctx| {
                inject_provenance(doc, &key, ctx.commit_sha.as_deref());
            }));
        }

        set
    }

    /// Rule names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(Rule::name).collect()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule in order, each on the output of the previous one.
    #[must_use]
    pub fn apply(&self, doc: Value, ctx: &RuleContext) -> Value {
        self.rules.iter().fold(doc, |doc, rule| rule.apply(doc, ctx))
    }
}
