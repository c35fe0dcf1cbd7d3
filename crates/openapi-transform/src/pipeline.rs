//! Spec transform pipeline.
//!
//! One document at a time: parse, move the server base path onto the path
//! keys, run the [`RuleSet`] in order, serialize. Documents whose servers do
//! not yield a base path are returned byte-for-byte unchanged, since every
//! later path-keyed rule assumes prefixed paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml_ng::Value;
use tracing::warn;

use crate::config::ProjectConfig;
use crate::document::{self, DocumentFormat};
use crate::error::Result;
use crate::rules::{apply_base_path, RuleContext, RuleSet};

/// Why a document was left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `servers` is absent or empty.
    NoServers,
    /// The first server has no `url`.
    MissingServerUrl,
    /// The first server URL has no static path component.
    EmptyBasePath,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoServers => "no servers found in the spec",
            Self::MissingServerUrl => "server URL is missing",
            Self::EmptyBasePath => "no base path found in server URL",
        })
    }
}

/// Result of transforming one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The rules ran; this is the serialized output.
    Transformed(String),
    /// The input was returned as-is.
    Unchanged {
        /// Original input text.
        content: String,
        /// Precondition that failed.
        reason: SkipReason,
    },
}

impl Outcome {
    /// Output text, whether transformed or not.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Transformed(content) | Self::Unchanged { content, .. } => content,
        }
    }

    /// Why the document was skipped, if it was.
    #[must_use]
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Transformed(_) => None,
            Self::Unchanged { reason, .. } => Some(*reason),
        }
    }
}

/// Transforms spec documents with a fixed rule set.
#[derive(Debug)]
pub struct Pipeline {
    rules: RuleSet,
}

impl Pipeline {
    /// Pipeline running [`RuleSet::from_config`].
    #[must_use]
    pub fn new(config: &ProjectConfig) -> Self {
        Self::with_rules(RuleSet::from_config(config))
    }

    /// Pipeline running a custom rule set.
    #[must_use]
    pub fn with_rules(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// The rules in execution order.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Transform an already-parsed document.
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] when the document has no usable base path;
    /// the input tree is discarded in that case.
    pub fn transform_document(
        &self,
        mut doc: Value,
        ctx: &RuleContext,
    ) -> std::result::Result<Value, SkipReason> {
        apply_base_path(&mut doc)?;
        Ok(self.rules.apply(doc, ctx))
    }

    /// Transform document text.
    ///
    /// The format (YAML or JSON) follows the file name's extension, and the
    /// file name drives per-file rule applicability.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or the result cannot be
    /// serialized. A failed structural precondition is not an error: it yields
    /// [`Outcome::Unchanged`] and a warning.
    pub fn transform(&self, content: &str, filename: &str, commit_sha: Option<&str>) -> Result<Outcome> {
        let format = DocumentFormat::from_path(filename);
        let doc = document::parse(content, format)?;
        let ctx = RuleContext::new(filename).with_commit_sha(commit_sha);

        match self.transform_document(doc, &ctx) {
            Ok(doc) => Ok(Outcome::Transformed(document::serialize(&doc, format)?)),
            Err(reason) => {
                warn!(file = filename, %reason, "leaving spec unchanged");
                Ok(Outcome::Unchanged {
                    content: content.to_string(),
                    reason,
                })
            }
        }
    }

    /// Transform `input` and write the result to the same file name inside
    /// `output_dir`. Returns the outcome and the written path.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or parsed, or the output
    /// cannot be written.
    pub fn transform_file(
        &self,
        input: &Path,
        output_dir: &Path,
        commit_sha: Option<&str>,
    ) -> Result<(Outcome, PathBuf)> {
        let filename = input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let content = std::fs::read_to_string(input)?;
        let outcome = self.transform(&content, &filename, commit_sha)?;

        let output = output_dir.join(&filename);
        std::fs::write(&output, outcome.content())?;
        Ok((outcome, output))
    }

    /// Transform every spec file in `input_dir` into `output_dir` (created if
    /// missing).
    ///
    /// Failures are reported per file; one bad file does not stop the rest.
    ///
    /// # Errors
    ///
    /// Returns an error only if the input directory cannot be listed or the
    /// output directory cannot be created.
    pub fn transform_dir(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        commit_sha: Option<&str>,
    ) -> Result<Vec<FileResult>> {
        std::fs::create_dir_all(output_dir)?;
        Ok(document::list_spec_files(input_dir)?
            .into_iter()
            .map(|input| {
                let result = self.transform_file(&input, output_dir, commit_sha);
                FileResult { input, result }
            })
            .collect())
    }
}

/// Per-file result of [`Pipeline::transform_dir`].
#[derive(Debug)]
pub struct FileResult {
    /// Input file.
    pub input: PathBuf,
    /// Outcome and written path, or the error for this file.
    pub result: Result<(Outcome, PathBuf)>,
}
