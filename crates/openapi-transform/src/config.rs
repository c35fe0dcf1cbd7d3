//! Project-level configuration loaded from YAML.
//!
//! Externalizes the names every rule operates on (component renames, scheme
//! keys, vendor-extension keys, release repositories) so they live next to
//! the source specs instead of being hardcoded in Rust source. Every default
//! reproduces the stock behavior, so an empty file is a valid config.
//!
//! # File format
//!
//! ```yaml
//! # openapi-transform.yaml
//! component_renames:
//!   - section: schemas
//!     from: Shortcut
//!     to: IndexingShortcut
//!     files: [indexing.yaml]
//!
//! security:
//!   from: BearerAuth
//!   to: APIToken
//!   text_renames:
//!     - { from: bearerAuth, to: apiToken }
//!     - { from: BEARER_AUTH, to: API_TOKEN }
//!
//! consolidation:
//!   files: [admin_rest.yaml]
//!   canonical: APIToken
//!   alias: actAsBearerToken
//!   extra: cookieAuth
//!
//! server_variable:
//!   from: domain
//!   to: instance
//!   default: instance-name
//!
//! enum_descriptions:
//!   policy: copy   # or `move`
//!
//! code_samples:
//!   server_url: mycompany-be.glean.com
//!
//! # Transform toggles (all default to true).
//! transforms:
//!   inject_provenance: false
//! ```

use std::path::Path;

use serde::Deserialize;

/// Project-level transform config.
///
/// Loaded from a YAML file via [`ProjectConfig::load`], then handed to
/// [`Pipeline::new`](crate::Pipeline::new) and the other entry points.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Component registry renames, each optionally limited to some files.
    pub component_renames: Vec<ComponentRename>,

    /// Security scheme rename applied to every file.
    pub security: SecuritySchemeRename,

    /// Auth scheme consolidation for a subset of files.
    pub consolidation: SchemeConsolidation,

    /// Server template variable rename.
    pub server_variable: ServerVariableRename,

    /// Enum description vendor-extension conversion.
    pub enum_descriptions: EnumDescriptions,

    /// Deprecation annotation keys.
    pub deprecation: DeprecationKeys,

    /// Provenance field written into `info`.
    pub provenance: ProvenanceConfig,

    /// Code-sample rewriting settings.
    pub code_samples: CodeSampleConfig,

    /// Release-sync check settings.
    pub releases: ReleaseConfig,

    /// Source-spec diff report settings.
    pub diff: DiffConfig,

    /// Transform toggles.
    pub transforms: TransformConfig,
}

/// Move a component registry entry to a new name and rewire references.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentRename {
    /// Registry section under `components` (e.g. `schemas`).
    #[serde(default = "default_section")]
    pub section: String,
    /// Current component name.
    pub from: String,
    /// New component name.
    pub to: String,
    /// File names this rename applies to. Empty means every file.
    #[serde(default)]
    pub files: Vec<String>,
}

fn default_section() -> String {
    "schemas".to_string()
}

/// A `(from, to)` pair for textual substitution.
#[derive(Debug, Clone, Deserialize)]
pub struct TextRename {
    /// Text to find (case-sensitive).
    pub from: String,
    /// Replacement text.
    pub to: String,
}

/// Security scheme rename.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecuritySchemeRename {
    /// Current scheme key.
    pub from: String,
    /// New scheme key.
    pub to: String,
    /// Alternate spellings rewritten inside code samples.
    pub text_renames: Vec<TextRename>,
}

/// Collapse an equivalent, differently-named scheme into the canonical one.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemeConsolidation {
    /// File names this consolidation applies to.
    pub files: Vec<String>,
    /// Canonical scheme key that survives.
    pub canonical: String,
    /// Equivalent scheme renamed to `canonical` in requirements.
    pub alias: String,
    /// Extra scheme dropped from the registry and every requirement.
    pub extra: String,
}

/// Server template variable rename.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerVariableRename {
    /// Current variable name.
    pub from: String,
    /// New variable name.
    pub to: String,
    /// `default` written into the renamed variable record.
    pub default: String,
    /// `description` written into the renamed variable record.
    pub description: String,
}

/// What happens to the source key after enum descriptions are converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumDescriptionPolicy {
    /// Keep both keys (docs tooling reads the source key, SDK generation the target).
    Copy,
    /// Remove the source key after copying.
    Move,
}

/// Enum description vendor-extension conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnumDescriptions {
    /// Source vendor key.
    pub source_key: String,
    /// Target vendor key read by the SDK generator.
    pub target_key: String,
    /// Copy or move.
    pub policy: EnumDescriptionPolicy,
}

/// Deprecation annotation keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeprecationKeys {
    /// Vendor key carrying the structured deprecation annotation.
    pub annotation_key: String,
    /// Vendor key receiving the generated deprecation message.
    pub message_key: String,
}

/// Provenance injection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvenanceConfig {
    /// Vendor key set on `info`.
    pub key: String,
}

/// Code-sample rewriting.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodeSampleConfig {
    /// When set, every supported sample gets a server URL constructor argument.
    pub server_url: Option<String>,
}

/// Release-sync check.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Repositories (`owner/name`) whose latest releases must agree.
    pub repositories: Vec<String>,
    /// Path of the merged spec inside each release.
    pub spec_path: String,
    /// `info` key holding the source commit.
    pub source_sha_key: String,
    /// `info` key holding the spec repository commit.
    pub open_api_sha_key: String,
}

/// Source-spec diff report.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Published spec to compare against.
    pub remote_url: String,
    /// Local spec file.
    pub local_file: String,
}

/// Individual transform on/off switches (all default to `true`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct TransformConfig {
    /// Apply [`ProjectConfig::component_renames`].
    pub rename_components: bool,

    /// Apply [`ProjectConfig::security`].
    pub rename_security_scheme: bool,

    /// Apply [`ProjectConfig::server_variable`].
    pub rename_server_variable: bool,

    /// Apply [`ProjectConfig::enum_descriptions`].
    pub convert_enum_descriptions: bool,

    /// Translate deprecation annotations.
    pub rewrite_deprecations: bool,

    /// Apply [`ProjectConfig::consolidation`].
    pub consolidate_security_schemes: bool,

    /// Write the commit identifier into `info`.
    pub inject_provenance: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            component_renames: vec![ComponentRename {
                section: default_section(),
                from: "Shortcut".to_string(),
                to: "IndexingShortcut".to_string(),
                files: vec!["indexing.yaml".to_string()],
            }],
            security: SecuritySchemeRename::default(),
            consolidation: SchemeConsolidation::default(),
            server_variable: ServerVariableRename::default(),
            enum_descriptions: EnumDescriptions::default(),
            deprecation: DeprecationKeys::default(),
            provenance: ProvenanceConfig::default(),
            code_samples: CodeSampleConfig::default(),
            releases: ReleaseConfig::default(),
            diff: DiffConfig::default(),
            transforms: TransformConfig::default(),
        }
    }
}

impl Default for SecuritySchemeRename {
    fn default() -> Self {
        Self {
            from: "BearerAuth".to_string(),
            to: "APIToken".to_string(),
            text_renames: vec![
                TextRename {
                    from: "bearerAuth".to_string(),
                    to: "apiToken".to_string(),
                },
                TextRename {
                    from: "BEARER_AUTH".to_string(),
                    to: "API_TOKEN".to_string(),
                },
            ],
        }
    }
}

impl SecuritySchemeRename {
    /// Text renames as plain pairs.
    #[must_use]
    pub fn text_pairs(&self) -> Vec<(String, String)> {
        self.text_renames
            .iter()
            .map(|r| (r.from.clone(), r.to.clone()))
            .collect()
    }
}

impl Default for SchemeConsolidation {
    fn default() -> Self {
        Self {
            files: vec!["admin_rest.yaml".to_string()],
            canonical: "APIToken".to_string(),
            alias: "actAsBearerToken".to_string(),
            extra: "cookieAuth".to_string(),
        }
    }
}

impl Default for ServerVariableRename {
    fn default() -> Self {
        Self {
            from: "domain".to_string(),
            to: "instance".to_string(),
            default: "instance-name".to_string(),
            description: "The instance name (typically the email domain without the TLD) \
                          that determines the deployment backend."
                .to_string(),
        }
    }
}

impl Default for EnumDescriptions {
    fn default() -> Self {
        Self {
            source_key: "x-enumDescriptions".to_string(),
            target_key: "x-speakeasy-enum-descriptions".to_string(),
            policy: EnumDescriptionPolicy::Copy,
        }
    }
}

impl Default for DeprecationKeys {
    fn default() -> Self {
        Self {
            annotation_key: "x-glean-deprecated".to_string(),
            message_key: "x-speakeasy-deprecation-message".to_string(),
        }
    }
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            key: "x-open-api-commit-sha".to_string(),
        }
    }
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            repositories: [
                "gleanwork/api-client-python",
                "gleanwork/api-client-typescript",
                "gleanwork/api-client-go",
                "gleanwork/api-client-java",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            spec_path: ".speakeasy/glean-merged-spec.yaml".to_string(),
            source_sha_key: "x-source-commit-sha".to_string(),
            open_api_sha_key: "x-open-api-commit-sha".to_string(),
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            remote_url: "https://gleanwork.github.io/open-api/specs/source/client_rest.yaml"
                .to_string(),
            local_file: "source_specs/client_rest.yaml".to_string(),
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            rename_components: true,
            rename_security_scheme: true,
            rename_server_variable: true,
            convert_enum_descriptions: true,
            rewrite_deprecations: true,
            consolidate_security_schemes: true,
            inject_provenance: true,
        }
    }
}

impl ProjectConfig {
    /// Load config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_defaults() {
        let config: ProjectConfig = serde_yaml_ng::from_str("{}").unwrap();
        assert_eq!(config.component_renames.len(), 1);
        assert_eq!(config.component_renames[0].to, "IndexingShortcut");
        assert_eq!(config.security.from, "BearerAuth");
        assert_eq!(config.security.text_renames.len(), 2);
        assert_eq!(config.server_variable.default, "instance-name");
        assert_eq!(config.enum_descriptions.policy, EnumDescriptionPolicy::Copy);
        assert!(config.code_samples.server_url.is_none());
        assert_eq!(config.releases.repositories.len(), 4);
        assert!(config.transforms.inject_provenance);
    }

    #[test]
    fn deserialize_partial_overrides() {
        let yaml = r"
component_renames:
  - from: Widget
    to: LegacyWidget
security:
  from: JwtAuth
  to: Token
enum_descriptions:
  policy: move
code_samples:
  server_url: acme-be.example.com
transforms:
  inject_provenance: false
";
        let config: ProjectConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.component_renames[0].section, "schemas");
        assert!(config.component_renames[0].files.is_empty());
        assert_eq!(config.security.to, "Token");
        // Unlisted nested fields keep their defaults
        assert_eq!(config.security.text_renames.len(), 2);
        assert_eq!(config.enum_descriptions.policy, EnumDescriptionPolicy::Move);
        assert_eq!(
            config.enum_descriptions.target_key,
            "x-speakeasy-enum-descriptions"
        );
        assert_eq!(
            config.code_samples.server_url.as_deref(),
            Some("acme-be.example.com")
        );
        assert!(!config.transforms.inject_provenance);
        assert!(config.transforms.rewrite_deprecations);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server_variable:\n  to: tenant\n").unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.server_variable.to, "tenant");
        assert_eq!(config.server_variable.from, "domain");
    }

    #[test]
    fn load_nonexistent_file_returns_error() {
        let result = ProjectConfig::load(Path::new("/nonexistent/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_invalid_yaml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "component_renames: [[[invalid").unwrap();
        assert!(ProjectConfig::load(&path).is_err());
    }
}
