//! Object-type auditor.
//!
//! Finds every `type: object` schema node in a set of spec documents and
//! classifies it:
//!
//! - **open**: no declared properties and no composition (`allOf`, `oneOf`,
//!   `anyOf`), so the object most likely carries arbitrary key/value pairs
//!   and should say `additionalProperties: true`;
//! - **closed**: declared properties and/or composition, so the object has a
//!   fixed shape and should say `additionalProperties: false`.
//!
//! Each finding is cross-referenced with the operations of the same document
//! that reference it (see [`OperationIndex`]). [`render_console`] and
//! [`render_csv`] turn the accumulated [`AuditReport`] into text.

mod index;
mod report;

use std::fmt;
use std::path::Path;

use serde_yaml_ng::{Mapping, Value};
use tracing::{debug, warn};

use openapi_transform_core::{walk, ValueExt, Visit};

use crate::document::{self, DocumentFormat};
use crate::error::Result;

pub use index::{OperationIndex, OperationRef};
pub use report::{render_console, render_csv};

const COMPOSITION_KEYS: [&str; 3] = ["allOf", "oneOf", "anyOf"];

/// Whether an object schema accepts arbitrary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No properties, no composition.
    Open,
    /// Properties and/or composition.
    Closed,
}

impl Classification {
    /// Priority attached to findings of this class.
    #[must_use]
    pub fn priority(self) -> Priority {
        match self {
            Self::Open => Priority::High,
            Self::Closed => Priority::Medium,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
        })
    }
}

/// Fix priority of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Open objects.
    High,
    /// Closed objects.
    Medium,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
        })
    }
}

/// One classified object schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFinding {
    /// File name the schema was found in.
    pub file: String,
    /// Tree path of the schema node (`components.schemas.Pet.allOf[0]`).
    pub path: String,
    /// Open or closed.
    pub classification: Classification,
    /// Derived from the classification.
    pub priority: Priority,
    /// `properties` is a non-empty mapping.
    pub has_properties: bool,
    /// Number of declared properties.
    pub properties_count: usize,
    /// Any non-empty composition list is present.
    pub has_composition: bool,
    /// Which composition keys are present, in `allOf`, `oneOf`, `anyOf` order.
    pub composition_types: Vec<&'static str>,
    /// Rendered `additionalProperties` value, `None` when the key is absent.
    pub additional_properties: Option<String>,
    /// Suggested fix.
    pub recommendation: String,
    /// Why the classification was made.
    pub reason: String,
    /// Operations of the same document referencing this node.
    pub operations: Vec<OperationRef>,
}

impl ObjectFinding {
    /// Whether `additionalProperties` is declared.
    #[must_use]
    pub fn has_additional_properties(&self) -> bool {
        self.additional_properties.is_some()
    }

    fn classify(file: &str, path: String, schema: &Mapping, operations: Vec<OperationRef>) -> Self {
        let properties_count = schema.mapping("properties").map_or(0, Mapping::len);
        let has_properties = properties_count > 0;
        let composition_types: Vec<_> = COMPOSITION_KEYS
            .into_iter()
            .filter(|key| schema.has_items(key))
            .collect();
        let has_composition = !composition_types.is_empty();
        let additional_properties = schema.field("additionalProperties").map(render_value);

        let classification = if has_properties || has_composition {
            Classification::Closed
        } else {
            Classification::Open
        };

        let (recommendation, reason) = match classification {
            Classification::Open => (
                "Add additionalProperties: true",
                "Object has no properties defined, likely intended to accept arbitrary key-value pairs"
                    .to_string(),
            ),
            Classification::Closed => (
                if additional_properties.is_some() {
                    "Consider setting additionalProperties: false"
                } else {
                    "Add additionalProperties: false"
                },
                if has_properties {
                    format!("Object has {properties_count} defined properties")
                } else {
                    format!("Object uses composition ({})", composition_types.join(", "))
                },
            ),
        };

        Self {
            file: file.to_string(),
            path,
            classification,
            priority: classification.priority(),
            has_properties,
            properties_count,
            has_composition,
            composition_types,
            additional_properties,
            recommendation: recommendation.to_string(),
            reason,
            operations,
        }
    }
}

/// Scalars as written; structured values as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "schema".to_string()),
    }
}

/// Findings of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAudit {
    /// File name.
    pub file: String,
    /// Open objects in walk order.
    pub open_objects: Vec<ObjectFinding>,
    /// Closed objects in walk order.
    pub closed_objects: Vec<ObjectFinding>,
}

/// Audit one parsed document.
///
/// Every node is visited once, composition members included (they are
/// addressed as `...allOf[i]`). Tagged nodes are audited through their inner
/// value only.
#[must_use]
pub fn audit_document(file: &str, doc: &Value) -> FileAudit {
    let index = OperationIndex::build(doc);
    let mut audit = FileAudit {
        file: file.to_string(),
        ..FileAudit::default()
    };

    walk(doc, &mut |node, path| {
        let Value::Mapping(schema) = node else {
            return Visit::Continue;
        };
        if schema.str_field("type") != Some("object") {
            return Visit::Continue;
        }

        let path = path.to_string();
        let operations = index.refs_for(&path).to_vec();
        let finding = ObjectFinding::classify(file, path, schema, operations);
        match finding.classification {
            Classification::Open => audit.open_objects.push(finding),
            Classification::Closed => audit.closed_objects.push(finding),
        }
        Visit::Continue
    });

    debug!(
        file,
        open = audit.open_objects.len(),
        closed = audit.closed_objects.len(),
        "audited document"
    );
    audit
}

/// Aggregate counts over an audit run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSummary {
    /// Files considered, including ones that failed to parse.
    pub files: usize,
    /// Object schemas found.
    pub object_schemas: usize,
    /// Open objects.
    pub open: usize,
    /// Closed objects.
    pub closed: usize,
    /// Objects declaring `additionalProperties`.
    pub with_additional_properties: usize,
    /// Objects not declaring it.
    pub without_additional_properties: usize,
}

/// A file the auditor could not read or parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditError {
    /// File name.
    pub file: String,
    /// Error message.
    pub message: String,
}

/// Accumulated audit result across files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Files audited successfully, in order.
    pub files: Vec<String>,
    /// Open objects across all files.
    pub open_objects: Vec<ObjectFinding>,
    /// Closed objects across all files.
    pub closed_objects: Vec<ObjectFinding>,
    /// Aggregate counts.
    pub summary: AuditSummary,
    /// Files that failed.
    pub errors: Vec<AuditError>,
}

impl AuditReport {
    /// All findings, open first.
    pub fn findings(&self) -> impl Iterator<Item = &ObjectFinding> {
        self.open_objects.iter().chain(&self.closed_objects)
    }
}

/// Accumulates [`FileAudit`]s into an [`AuditReport`].
#[derive(Debug, Default)]
pub struct Auditor {
    report: AuditReport,
}

impl Auditor {
    /// Empty auditor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document's findings.
    pub fn add(&mut self, audit: FileAudit) {
        let summary = &mut self.report.summary;
        summary.files += 1;
        for finding in audit.open_objects.iter().chain(&audit.closed_objects) {
            summary.object_schemas += 1;
            if finding.has_additional_properties() {
                summary.with_additional_properties += 1;
            } else {
                summary.without_additional_properties += 1;
            }
        }
        summary.open += audit.open_objects.len();
        summary.closed += audit.closed_objects.len();

        self.report.files.push(audit.file);
        self.report.open_objects.extend(audit.open_objects);
        self.report.closed_objects.extend(audit.closed_objects);
    }

    /// Record a file that could not be audited. It still counts as processed.
    pub fn add_error(&mut self, file: impl Into<String>, message: impl Into<String>) {
        self.report.summary.files += 1;
        self.report.errors.push(AuditError {
            file: file.into(),
            message: message.into(),
        });
    }

    /// Parse and audit document text; a parse failure is recorded, not
    /// returned.
    pub fn audit_str(&mut self, file: &str, content: &str) {
        match document::parse(content, DocumentFormat::from_path(file)) {
            Ok(doc) => self.add(audit_document(file, &doc)),
            Err(e) => {
                warn!(file, error = %e, "failed to parse spec for audit");
                self.add_error(file, e.to_string());
            }
        }
    }

    /// Audit every spec file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory cannot be listed. Per-file read
    /// and parse failures land in [`AuditReport::errors`].
    pub fn audit_dir(&mut self, dir: &Path) -> Result<()> {
        for path in document::list_spec_files(dir)? {
            let file = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            match std::fs::read_to_string(&path) {
                Ok(content) => self.audit_str(&file, &content),
                Err(e) => self.add_error(file, e.to_string()),
            }
        }
        Ok(())
    }

    /// The report accumulated so far.
    #[must_use]
    pub fn report(&self) -> &AuditReport {
        &self.report
    }

    /// Finish and take the report.
    #[must_use]
    pub fn finish(self) -> AuditReport {
        self.report
    }
}
