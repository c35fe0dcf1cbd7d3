//! Document tree traversal, paths, and typed accessors.
//!
//! The document tree is a plain `serde_yaml_ng::Value`. Mappings keep
//! insertion order, so every helper here that restructures a mapping does so
//! without moving unrelated keys.

use std::fmt;

use serde_yaml_ng::{Mapping, Sequence, Value};

/// Shorthand for `Value::String`.
pub fn val_s(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Render a mapping key as text.
///
/// Unquoted YAML keys such as `200:` parse as numbers; they are rendered the
/// same way they were written.
pub fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Render a scalar as non-empty text, or `None` for null, empty strings and
/// non-scalar values.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Rename `from` to `to` inside `map`, keeping the entry at its position.
///
/// If `to` already exists, its value is replaced by the value of `from` (at
/// the position of `to`) and `from` is removed. Returns `false` when `from`
/// is absent.
pub fn rename_key(map: &mut Mapping, from: &str, to: &str) -> bool {
    if from == to || !map.contains_key(from) {
        return false;
    }

    if map.contains_key(to) {
        if let Some(value) = map.shift_remove(from) {
            map.insert(val_s(to), value);
        }
        return true;
    }

    let entries = std::mem::take(map);
    *map = entries
        .into_iter()
        .map(|(k, v)| {
            if k.as_str() == Some(from) {
                (val_s(to), v)
            } else {
                (k, v)
            }
        })
        .collect();
    true
}

/// One step from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A mapping key.
    Key(String),
    /// A sequence index.
    Index(usize),
}

/// Location of a node relative to the document root.
///
/// Renders as dot-joined keys with bracketed indices, e.g.
/// `components.schemas.Pet.allOf[0]`. The rendered form is used as a lookup
/// key when cross-referencing nodes, so it must stay stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath {
    segments: Vec<Segment>,
}

impl TreePath {
    /// The empty path (document root).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Path to the mapping entry `key` below this path.
    #[must_use]
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    /// Path to sequence element `index` below this path.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    /// The individual segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this is the document root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The final mapping key, if the path ends in one.
    #[must_use]
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last()? {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }
}

impl FromIterator<Segment> for TreePath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(k) if i == 0 => write!(f, "{k}")?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// Visitor verdict for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Descend into the node's children.
    Continue,
    /// Do not descend into this node.
    Skip,
}

/// Depth-first, pre-order walk over every node reachable from `root`.
///
/// Every node is visited exactly once (scalars included). Null and absent
/// children are simply leaves.
pub fn walk<'a, F>(root: &'a Value, visitor: &mut F)
where
    F: FnMut(&'a Value, &TreePath) -> Visit,
{
    walk_at(root, &TreePath::root(), visitor);
}

fn walk_at<'a, F>(node: &'a Value, path: &TreePath, visitor: &mut F)
where
    F: FnMut(&'a Value, &TreePath) -> Visit,
{
    if visitor(node, path) == Visit::Skip {
        return;
    }
    match node {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(key) = key_text(k) else {
                    continue;
                };
                walk_at(v, &path.key(&key), visitor);
            }
        }
        Value::Sequence(seq) => {
            for (i, item) in seq.iter().enumerate() {
                walk_at(item, &path.index(i), visitor);
            }
        }
        Value::Tagged(tagged) => walk_at(&tagged.value, path, visitor),
        _ => {}
    }
}

/// Mutable variant of [`walk`].
///
/// The visitor may rewrite or replace the node it is given; the walk then
/// descends into the node as it stands after the visitor returned. Siblings
/// and ancestors are unaffected.
pub fn walk_mut<F>(root: &mut Value, visitor: &mut F)
where
    F: FnMut(&mut Value, &TreePath) -> Visit,
{
    walk_mut_at(root, &TreePath::root(), visitor);
}

fn walk_mut_at<F>(node: &mut Value, path: &TreePath, visitor: &mut F)
where
    F: FnMut(&mut Value, &TreePath) -> Visit,
{
    if visitor(node, path) == Visit::Skip {
        return;
    }
    match node {
        Value::Mapping(map) => {
            for (k, v) in map.iter_mut() {
                let Some(key) = key_text(k) else {
                    continue;
                };
                walk_mut_at(v, &path.key(&key), visitor);
            }
        }
        Value::Sequence(seq) => {
            for (i, item) in seq.iter_mut().enumerate() {
                walk_mut_at(item, &path.index(i), visitor);
            }
        }
        Value::Tagged(tagged) => walk_mut_at(&mut tagged.value, path, visitor),
        _ => {}
    }
}

/// Typed accessors shared by `Value` and `Mapping`.
///
/// Each accessor returns `None` when the key is absent or holds a different
/// variant, so rules can chain lookups with `?` instead of probing.
pub trait ValueExt {
    /// Raw field lookup.
    fn field(&self, key: &str) -> Option<&Value>;

    /// Raw mutable field lookup.
    fn field_mut(&mut self, key: &str) -> Option<&mut Value>;

    /// Field as a mapping.
    fn mapping(&self, key: &str) -> Option<&Mapping> {
        self.field(key)?.as_mapping()
    }

    /// Field as a mutable mapping.
    fn mapping_mut(&mut self, key: &str) -> Option<&mut Mapping> {
        self.field_mut(key)?.as_mapping_mut()
    }

    /// Field as a sequence.
    fn sequence(&self, key: &str) -> Option<&Sequence> {
        self.field(key)?.as_sequence()
    }

    /// Field as a mutable sequence.
    fn sequence_mut(&mut self, key: &str) -> Option<&mut Sequence> {
        self.field_mut(key)?.as_sequence_mut()
    }

    /// Field as a string.
    fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key)?.as_str()
    }

    /// Whether the field is a sequence with at least one element.
    fn has_items(&self, key: &str) -> bool {
        self.sequence(key).is_some_and(|s| !s.is_empty())
    }

    /// Whether the field is a mapping with at least one entry.
    fn has_entries(&self, key: &str) -> bool {
        self.mapping(key).is_some_and(|m| !m.is_empty())
    }

    /// Follow a chain of mapping keys.
    fn dig(&self, keys: &[&str]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        let mut current = self.field(first)?;
        for key in rest {
            current = current.field(key)?;
        }
        Some(current)
    }

    /// Follow a chain of mapping keys, mutably.
    fn dig_mut(&mut self, keys: &[&str]) -> Option<&mut Value> {
        let (first, rest) = keys.split_first()?;
        let mut current = self.field_mut(first)?;
        for key in rest {
            current = current.field_mut(key)?;
        }
        Some(current)
    }
}

impl ValueExt for Value {
    fn field(&self, key: &str) -> Option<&Value> {
        self.as_mapping()?.get(key)
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.as_mapping_mut()?.get_mut(key)
    }
}

impl ValueExt for Mapping {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.get_mut(key)
    }
}
