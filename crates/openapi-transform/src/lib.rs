#![allow(clippy::doc_markdown)] // README uses "OpenAPI" proper noun throughout
#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! ## API Reference

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod audit;
mod command;
mod config;
pub mod diff;
pub mod document;
mod error;
pub mod pipeline;
pub mod release;
pub mod rules;
pub mod samples;

pub use audit::{audit_document, render_console, render_csv, AuditReport, Auditor};
pub use config::{
    CodeSampleConfig, ComponentRename, DeprecationKeys, DiffConfig, EnumDescriptionPolicy,
    EnumDescriptions, ProjectConfig, ProvenanceConfig, ReleaseConfig, SchemeConsolidation,
    SecuritySchemeRename, ServerVariableRename, TextRename, TransformConfig,
};
pub use document::DocumentFormat;
pub use error::{Error, Result};
pub use pipeline::{FileResult, Outcome, Pipeline, SkipReason};
pub use release::{GhCli, ReleaseSource, SyncOutcome, SyncReport};
pub use rules::{Applicability, Rule, RuleContext, RuleSet};
