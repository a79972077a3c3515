//! Path-safe traversal over loosely typed JSON.
//!
//! Listing pages embed a client-side payload whose shape changes without
//! notice. Every lookup into it goes through these helpers, which stop at
//! the first segment that does not resolve and hand back `None` (or a
//! caller-supplied default) instead of panicking.

use std::fmt;

use serde_json::Value;

/// One step of a path: an object key or an array index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for PathSegment<'a> {
    fn from(key: &'a str) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment<'_> {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "[{key:?}]"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Apply a single segment. Keys only resolve on objects, indices only on arrays.
pub fn step<'v>(value: &'v Value, segment: PathSegment<'_>) -> Option<&'v Value> {
    match segment {
        PathSegment::Key(key) => value.as_object()?.get(key),
        PathSegment::Index(index) => value.as_array()?.get(index),
    }
}

/// Walk `path` from `value`. Returns `None` as soon as a segment is missing.
///
/// A JSON `null` reached at the end of the path counts as missing, matching
/// how the payload uses `null` for "section not rendered".
pub fn get<'v>(value: &'v Value, path: &[PathSegment<'_>]) -> Option<&'v Value> {
    let mut current = value;
    for segment in path {
        current = step(current, *segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Like [`get`], falling back to `default` when the path does not resolve.
pub fn get_or<'v>(value: &'v Value, path: &[PathSegment<'_>], default: &'v Value) -> &'v Value {
    get(value, path).unwrap_or(default)
}

/// String leaf at `path`, or `None` if missing or not a string.
pub fn get_str<'v>(value: &'v Value, path: &[PathSegment<'_>]) -> Option<&'v str> {
    get(value, path)?.as_str()
}

/// Non-empty string leaf at `path`.
pub fn get_non_empty_str<'v>(value: &'v Value, path: &[PathSegment<'_>]) -> Option<&'v str> {
    get_str(value, path).filter(|s| !s.is_empty())
}

/// Array at `path`. Missing paths and non-array values yield an empty slice.
pub fn get_array<'v>(value: &'v Value, path: &[PathSegment<'_>]) -> &'v [Value] {
    get(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// First item whose string value at `path` equals `expected`.
///
/// Scans in order and stops at the first match, so when the payload repeats
/// a section the earliest one wins.
pub fn find_by_field<'v>(
    items: &'v [Value],
    path: &[PathSegment<'_>],
    expected: &str,
) -> Option<&'v Value> {
    items
        .iter()
        .find(|item| get_str(item, path) == Some(expected))
}

/// All items whose string value at `path` equals `expected`, in order.
pub fn filter_by_field<'v>(
    items: &'v [Value],
    path: &[PathSegment<'_>],
    expected: &str,
) -> Vec<&'v Value> {
    items
        .iter()
        .filter(|item| get_str(item, path) == Some(expected))
        .collect()
}

/// Build a path from a mix of keys and indices.
///
/// ```
/// use haven_core::path;
/// use haven_core::navigate::PathSegment;
///
/// let p = path![0, "data", "presentation"];
/// assert_eq!(p[0], PathSegment::Index(0));
/// assert_eq!(p[2], PathSegment::Key("presentation"));
/// ```
#[macro_export]
macro_rules! path {
    ($($segment:expr),* $(,)?) => {
        [$($crate::navigate::PathSegment::from($segment)),*]
    };
}
