//! Shared document-tree primitives for the openapi-transform ecosystem.
//!
//! This crate provides the traversal and rewriting building blocks that every
//! transform in `openapi-transform` is written against:
//!
//! - [`tree`]: [`TreePath`], the pre-order walkers [`walk`] / [`walk_mut`],
//!   and the [`ValueExt`] typed accessors over `serde_yaml_ng::Value`.
//! - [`refs`]: exact `$ref` pointer rewriting and textual substitution.
//!
//! You should not need to depend on this crate directly; use the
//! higher-level `openapi-transform` crate instead.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod refs;
pub mod tree;

pub use refs::{
    collect_refs, component_ref, count_exact, pointer_to_path, rewrite_references,
    rewrite_strings, rewrite_text,
};
pub use tree::{
    key_text, rename_key, scalar_text, val_s, walk, walk_mut, Segment, TreePath, ValueExt, Visit,
};
