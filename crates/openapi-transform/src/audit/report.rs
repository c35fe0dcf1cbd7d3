//! Console and CSV renderers for [`AuditReport`].

use std::collections::HashMap;
use std::fmt;

use super::{AuditReport, Classification, ObjectFinding, Priority};

const RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

const CSV_HEADER: [&str; 13] = [
    "File",
    "Schema Path",
    "Type",
    "Priority",
    "Has Properties",
    "Properties Count",
    "Has Composition",
    "Has Additional Properties",
    "Additional Properties Value",
    "Recommendation",
    "Reason",
    "Operations Count",
    "Operation IDs",
];

/// Human-readable report: summary, open objects, closed objects, affected
/// operations, recommendations.
#[must_use]
pub fn render_console(report: &AuditReport) -> String {
    Console(report).to_string()
}

/// One row per finding (open objects first), with a header row. Lines are
/// joined with `\n` and there is no trailing newline.
#[must_use]
pub fn render_csv(report: &AuditReport) -> String {
    let mut rows = vec![csv_row(CSV_HEADER.iter().map(ToString::to_string))];
    rows.extend(report.findings().map(|finding| csv_row(csv_cells(finding))));
    rows.join("\n")
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

fn csv_cells(finding: &ObjectFinding) -> [String; 13] {
    [
        finding.file.clone(),
        finding.path.clone(),
        finding.classification.to_string(),
        finding.priority.to_string(),
        yes_no(finding.has_properties),
        finding.properties_count.to_string(),
        yes_no(finding.has_composition),
        yes_no(finding.has_additional_properties()),
        finding.additional_properties.clone().unwrap_or_default(),
        finding.recommendation.clone(),
        finding.reason.clone(),
        finding.operations.len().to_string(),
        operation_ids(finding, "; "),
    ]
}

fn csv_row(cells: impl IntoIterator<Item = String>) -> String {
    cells
        .into_iter()
        .map(|cell| csv_escape(&cell))
        .collect::<Vec<_>>()
        .join(",")
}

fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn operation_ids(finding: &ObjectFinding, separator: &str) -> String {
    finding
        .operations
        .iter()
        .map(|op| op.operation_id.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Operation row of the affected-operations table.
struct AffectedOperation<'a> {
    id: &'a str,
    method: &'a str,
    priority: Priority,
    open: usize,
    closed: usize,
}

fn affected_operations(report: &AuditReport) -> Vec<AffectedOperation<'_>> {
    let mut order = Vec::new();
    let mut rows: HashMap<&str, AffectedOperation<'_>> = HashMap::new();

    for finding in report.findings() {
        for op in &finding.operations {
            let row = rows.entry(op.operation_id.as_str()).or_insert_with(|| {
                order.push(op.operation_id.as_str());
                AffectedOperation {
                    id: &op.operation_id,
                    method: &op.method,
                    priority: Priority::Medium,
                    open: 0,
                    closed: 0,
                }
            });
            match finding.classification {
                Classification::Open => {
                    row.open += 1;
                    row.priority = Priority::High;
                }
                Classification::Closed => row.closed += 1,
            }
        }
    }

    let mut sorted: Vec<_> = order.into_iter().filter_map(|id| rows.remove(id)).collect();
    sorted.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(b.id)));
    sorted
}

struct Console<'a>(&'a AuditReport);

impl Console<'_> {
    fn summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.0.summary;
        writeln!(f, "📊 SUMMARY")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Files processed: {}", s.files)?;
        writeln!(f, "Total object schemas found: {}", s.object_schemas)?;
        writeln!(
            f,
            "Objects missing additionalProperties: {}",
            s.without_additional_properties
        )?;
        writeln!(
            f,
            "Objects with additionalProperties: {}",
            s.with_additional_properties
        )?;
        writeln!(f, "Open objects (no properties): {} [HIGH PRIORITY]", s.open)?;
        writeln!(
            f,
            "Closed objects (with properties): {} [MEDIUM PRIORITY]",
            s.closed
        )?;
        writeln!(f)
    }

    fn findings(
        f: &mut fmt::Formatter<'_>,
        findings: &[ObjectFinding],
        classification: Classification,
    ) -> fmt::Result {
        let (heading, hint, empty) = match classification {
            Classification::Open => (
                "🔓 OPEN OBJECTS (HIGH PRIORITY)",
                "These objects have no properties defined and likely need additionalProperties: true",
                "✅ No open objects found - all objects without properties have been properly configured!",
            ),
            Classification::Closed => (
                "🔒 CLOSED OBJECTS (MEDIUM PRIORITY)",
                "These objects have properties defined and likely need additionalProperties: false",
                "✅ No closed objects found - all objects with properties have been properly configured!",
            ),
        };
        if findings.is_empty() {
            writeln!(f, "{empty}")?;
            return writeln!(f);
        }

        writeln!(f, "{heading}")?;
        writeln!(f, "{hint}")?;
        writeln!(f, "{RULE}")?;
        for (i, finding) in findings.iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, finding.file)?;
            writeln!(f, "   Path: {}", finding.path)?;
            if classification == Classification::Closed {
                write!(f, "   Properties: {} defined", finding.properties_count)?;
                if finding.has_composition {
                    write!(f, " + composition ({})", finding.composition_types.join(", "))?;
                }
                writeln!(f)?;
            }
            match &finding.additional_properties {
                Some(value) => writeln!(f, "   Status: Has additionalProperties: {value}")?,
                None => writeln!(f, "   Status: Missing additionalProperties")?,
            }
            writeln!(f, "   Recommendation: {}", finding.recommendation)?;
            writeln!(f, "   Reason: {}", finding.reason)?;
            if !finding.operations.is_empty() {
                writeln!(f, "   Used in operations: {}", operation_ids(finding, ", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn operations(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📋 OPERATIONS AFFECTED BY OBJECT TYPE ISSUES")?;
        writeln!(f, "{RULE}")?;

        let operations = affected_operations(self.0);
        if operations.is_empty() {
            writeln!(f, "✅ No operations are affected by object type issues!")?;
            return writeln!(f);
        }

        writeln!(f, "{:<50} {:<8} {:<10} {:<10}", "Operation ID", "Method", "Priority", "Issues")?;
        writeln!(f, "{} {} {} {}", "-".repeat(50), "-".repeat(8), "-".repeat(10), "-".repeat(10))?;
        for op in &operations {
            writeln!(
                f,
                "{:<50} {:<8} {:<10} {}/{}",
                op.id,
                op.method,
                op.priority.to_string(),
                op.open,
                op.closed
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Legend: Issues column shows \"Open Objects\"/\"Closed Objects\"")?;
        writeln!(f)
    }

    fn recommendations(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.0.summary;
        writeln!(f, "💡 RECOMMENDATIONS")?;
        writeln!(f, "{RULE}")?;
        if s.open > 0 {
            writeln!(f, "🔴 HIGH PRIORITY: {} open objects", s.open)?;
            writeln!(f, "   Action: Add \"additionalProperties: true\" to schemas with no properties")?;
            writeln!(f, "   Impact: These objects are likely intended to accept arbitrary key-value pairs")?;
            writeln!(f, "   Risk: High - may break client generation if not addressed")?;
            writeln!(f)?;
        }
        if s.closed > 0 {
            writeln!(f, "🟡 MEDIUM PRIORITY: {} closed objects", s.closed)?;
            writeln!(f, "   Action: Add \"additionalProperties: false\" to schemas with defined properties")?;
            writeln!(f, "   Impact: Ensures type safety and prevents unexpected properties")?;
            writeln!(f, "   Risk: Medium - may cause stricter validation than expected")?;
            writeln!(f)?;
        }
        writeln!(f, "Next Steps:")?;
        writeln!(f, "1. Review and fix HIGH priority open objects first")?;
        writeln!(f, "2. Consider business requirements for each schema")?;
        writeln!(f, "3. Update schemas systematically using the paths provided")?;
        writeln!(f, "4. Test with Speakeasy tools after changes")?;
        writeln!(f, "5. Validate that client code generation works as expected")?;
        if s.without_additional_properties == 0 {
            writeln!(f)?;
            writeln!(
                f,
                "🎉 Congratulations! All object schemas have explicit additionalProperties settings!"
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Console<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OPENAPI OBJECT TYPE AUDIT REPORT")?;
        writeln!(f)?;
        self.summary(f)?;
        Self::findings(f, &self.0.open_objects, Classification::Open)?;
        Self::findings(f, &self.0.closed_objects, Classification::Closed)?;
        self.operations(f)?;
        self.recommendations(f)?;
        for error in &self.0.errors {
            writeln!(f)?;
            write!(f, "❌ Error processing {}: {}", error.file, error.message)?;
        }
        Ok(())
    }
}
