//! Field paths addressing values inside request structures
//!
//! A path is either a plain string (`"email"`, `"user.emails[0]"`) or an
//! explicit list of segments. Lookup follows lodash-style `get`/`has`/`set`
//! semantics so that nested JSON bodies can be validated and rewritten.

use serde_json::{Map, Value};
use std::fmt;

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    /// Array index this segment addresses, if it looks like one
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(k) if is_index_like(k) => k.parse().ok(),
            Segment::Key(_) => None,
        }
    }

    /// Object key this segment addresses
    pub fn key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// Path to a field inside a location's structured data
#[derive(Debug, Clone)]
pub struct FieldPath {
    /// Original string form, when the path was given as a string
    literal: Option<String>,
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a dot/bracket path (`a.b[0].c`)
    pub fn parse(path: &str) -> Self {
        Self {
            literal: Some(path.to_string()),
            segments: parse_segments(path),
        }
    }

    /// Build a path from explicit segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        Self {
            literal: None,
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Name used in error output and as the key of the legal result maps.
    ///
    /// String paths render verbatim. Segment lists join keys with `.` and
    /// render index-like segments as `[n]`.
    pub fn render(&self) -> String {
        if let Some(literal) = &self.literal {
            return literal.clone();
        }

        self.segments
            .iter()
            .fold(String::new(), |mut out, segment| {
                match segment.as_index() {
                    Some(i) => out.push_str(&format!("[{}]", i)),
                    None if out.is_empty() => out.push_str(&segment.key()),
                    None => {
                        out.push('.');
                        out.push_str(&segment.key());
                    }
                }
                out
            })
    }

    /// Resolve the path against `root`. `Some(Value::Null)` means the field
    /// is present with a null value; `None` means it is absent.
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        if let (Some(literal), Value::Object(map)) = (&self.literal, root) {
            if let Some(value) = map.get(literal) {
                return Some(value);
            }
        }

        self.segments
            .iter()
            .try_fold(root, |current, segment| step(current, segment))
    }

    pub fn has(&self, root: &Value) -> bool {
        self.get(root).is_some()
    }

    /// Write `value` at the path, creating intermediate objects (or arrays
    /// when the next segment is an index) as needed.
    pub fn set(&self, root: &mut Value, value: Value) {
        if let (Some(literal), Value::Object(map)) = (&self.literal, &mut *root) {
            if map.contains_key(literal) {
                map.insert(literal.clone(), value);
                return;
            }
        }

        let Some((last, parents)) = self.segments.split_last() else {
            return;
        };

        let mut current = root;
        for (i, segment) in parents.iter().enumerate() {
            current = child_mut(current, segment);
            let next = self.segments.get(i + 1);
            let is_container = current.is_object() || current.is_array();
            if !is_container {
                *current = match next.and_then(Segment::as_index) {
                    Some(_) => Value::Array(Vec::new()),
                    None => Value::Object(Map::new()),
                };
            }
        }

        *child_mut(current, last) = value;
    }
}

impl PartialEq for FieldPath {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for FieldPath {}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::parse(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        FieldPath::parse(&path)
    }
}

impl From<&String> for FieldPath {
    fn from(path: &String) -> Self {
        FieldPath::parse(path)
    }
}

impl From<Vec<Segment>> for FieldPath {
    fn from(segments: Vec<Segment>) -> Self {
        FieldPath::from_segments(segments)
    }
}

impl<const N: usize> From<[&str; N]> for FieldPath {
    fn from(segments: [&str; N]) -> Self {
        FieldPath::from_segments(segments)
    }
}

impl From<&FieldPath> for FieldPath {
    fn from(path: &FieldPath) -> Self {
        path.clone()
    }
}

fn is_index_like(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn step<'a>(current: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(&segment.key()),
        Value::Array(items) => items.get(segment.as_index()?),
        _ => None,
    }
}

fn child_mut<'a>(parent: &'a mut Value, segment: &Segment) -> &'a mut Value {
    match (segment.as_index(), parent.is_array()) {
        (Some(index), true) => {
            if let Value::Array(items) = parent {
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
            }
            &mut parent[index]
        }
        _ => {
            if !parent.is_object() {
                *parent = Value::Object(Map::new());
            }
            &mut parent[segment.key().as_str()]
        }
    }
}

fn parse_segments(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut buffer = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !buffer.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut buffer)));
                }
            }
            '[' => {
                if !buffer.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut buffer)));
                }
                let inner: String = chars.by_ref().take_while(|&c| c != ']').collect();
                let inner = inner.trim_matches(|c| c == '"' || c == '\'');
                if is_index_like(inner) {
                    if let Ok(index) = inner.parse() {
                        segments.push(Segment::Index(index));
                        continue;
                    }
                }
                segments.push(Segment::Key(inner.to_string()));
            }
            c => buffer.push(c),
        }
    }

    if !buffer.is_empty() || segments.is_empty() {
        segments.push(Segment::Key(buffer));
    }

    segments
}
