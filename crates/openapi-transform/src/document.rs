//! Parsing and serialization of spec documents.
//!
//! YAML is the default; files ending in `.json` are read and written as JSON.
//! Both paths produce the same `serde_yaml_ng::Value` tree with key order
//! preserved.

use std::path::{Path, PathBuf};

use serde_yaml_ng::Value;

use crate::error::Result;

/// Markup format of a spec document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// YAML (also the fallback for unknown extensions).
    Yaml,
    /// JSON.
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file name or path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Parse document text into a tree.
///
/// # Errors
///
/// Returns an error if the text is not valid YAML / JSON.
pub fn parse(content: &str, format: DocumentFormat) -> Result<Value> {
    Ok(match format {
        DocumentFormat::Yaml => serde_yaml_ng::from_str(content)?,
        DocumentFormat::Json => serde_json::from_str(content)?,
    })
}

/// Serialize a tree back to text.
///
/// YAML output keeps key order as encountered, never emits anchors or
/// aliases, does not wrap long lines and writes every scalar that needs
/// quoting in double-quoted style. JSON output is pretty-printed.
///
/// # Errors
///
/// Returns an error if the tree cannot be represented in the target format
/// (e.g. non-string mapping keys in JSON).
pub fn serialize(doc: &Value, format: DocumentFormat) -> Result<String> {
    Ok(match format {
        DocumentFormat::Yaml => double_quote_scalars(&serde_yaml_ng::to_string(doc)?),
        DocumentFormat::Json => {
            let mut out = serde_json::to_string_pretty(doc)?;
            out.push('\n');
            out
        }
    })
}

/// Rewrite the single-quoted scalars of block-style emitter output in
/// double-quoted style.
///
/// Keys and values are requoted; block scalar bodies (`|`, `>`) are copied
/// verbatim.
fn double_quote_scalars(yaml: &str) -> String {
    let mut out = String::with_capacity(yaml.len() + yaml.len() / 16);
    // Column of the node owning an open block scalar.
    let mut block_owner: Option<usize> = None;

    for line in yaml.split_inclusive('\n') {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let indent = body.len() - body.trim_start_matches(' ').len();
        if let Some(owner) = block_owner {
            if body.trim().is_empty() || indent > owner {
                out.push_str(line);
                continue;
            }
            block_owner = None;
        }

        block_owner = requote_line(body, &mut out);
        if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Requote one emitted line into `out`. Returns the owner column when the
/// line opens a block scalar.
fn requote_line(body: &str, out: &mut String) -> Option<usize> {
    let column = |rest: &str| body.len() - rest.len();
    let mut rest = body.trim_start_matches(' ');
    out.push_str(&body[..column(rest)]);

    let mut owner = column(rest);
    while let Some(after) = rest.strip_prefix("- ") {
        owner = column(rest);
        out.push_str("- ");
        rest = after;
    }
    if rest.starts_with("? ") {
        out.push_str(rest);
        return None;
    }

    let key_column = column(rest);
    let Some((first, after)) = scalar_token(rest) else {
        out.push_str(rest);
        return None;
    };
    let Some(value) = after.strip_prefix(':') else {
        out.push_str(&first);
        out.push_str(after);
        return is_block_indicator(&first).then_some(owner);
    };

    out.push_str(&first);
    out.push(':');
    let Some(value) = value.strip_prefix(' ') else {
        out.push_str(value);
        return None;
    };
    out.push(' ');
    if is_block_indicator(value) {
        out.push_str(value);
        return Some(key_column);
    }
    match scalar_token(value) {
        Some((token, tail)) if value.starts_with('\'') => {
            out.push_str(&token);
            out.push_str(tail);
        }
        _ => out.push_str(value),
    }
    None
}

fn is_block_indicator(token: &str) -> bool {
    token.starts_with('|') || token.starts_with('>')
}

/// Split the leading scalar off `s`, converting a single-quoted scalar to
/// double-quoted style. Plain scalars end at the first `": "` (or a trailing
/// `:`). `None` for an unterminated quoted scalar.
fn scalar_token(s: &str) -> Option<(String, &str)> {
    if let Some(quoted) = s.strip_prefix('\'') {
        let mut text = String::with_capacity(quoted.len() + 2);
        text.push('"');
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '\'' if chars.peek().is_some_and(|&(_, next)| next == '\'') => {
                    chars.next();
                    text.push('\'');
                }
                '\'' => {
                    text.push('"');
                    return Some((text, &quoted[i + 1..]));
                }
                '"' => text.push_str("\\\""),
                '\\' => text.push_str("\\\\"),
                _ => text.push(c),
            }
        }
        return None;
    }

    if let Some(quoted) = s.strip_prefix('"') {
        let mut escaped = false;
        for (i, c) in quoted.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return Some((s[..i + 2].to_string(), &quoted[i + 1..])),
                _ => {}
            }
        }
        return None;
    }

    let end = s
        .find(": ")
        .or_else(|| s.strip_suffix(':').map(str::len))
        .unwrap_or(s.len());
    Some((s[..end].to_string(), &s[end..]))
}

/// List spec files (`.yaml`, `.yml`, `.json`) directly inside `dir`, sorted.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_spec_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_spec = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e, "yaml" | "yml" | "json"));
        if is_spec {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
