use std::fmt;

use serde_json::Value;

use crate::navigate::{PathSegment, step};

/// Where the page bootstrap payload keeps the listing's `presentation`.
///
/// This is the listing page's internal client wiring, not something we
/// control. When the upstream page changes shape, this is the one place to
/// update.
pub const PRESENTATION_PATH: &[PathSegment<'static>] = &[
    PathSegment::Index(0),
    PathSegment::Key("root > core-guest-spa"),
    PathSegment::Index(1),
    PathSegment::Index(1),
    PathSegment::Key("niobeMinimalClientData"),
    PathSegment::Index(1),
    PathSegment::Index(1),
    PathSegment::Key("data"),
    PathSegment::Key("presentation"),
];

/// The presentation path stopped resolving at `position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationError {
    pub position: usize,
    pub segment: PathSegment<'static>,
    pub found: &'static str,
}

impl fmt::Display for PresentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let walked: String = PRESENTATION_PATH[..self.position]
            .iter()
            .map(ToString::to_string)
            .collect();
        write!(
            f,
            "presentation path broke at step {} ({}{}): found {}",
            self.position, walked, self.segment, self.found
        )
    }
}

impl std::error::Error for PresentationError {}

/// Follow [`PRESENTATION_PATH`] through a raw listing document.
pub fn locate_presentation(document: &Value) -> Result<&Value, PresentationError> {
    let mut current = document;
    for (position, segment) in PRESENTATION_PATH.iter().enumerate() {
        current = step(current, *segment).ok_or(PresentationError {
            position,
            segment: *segment,
            found: describe(current, *segment),
        })?;
    }
    if current.is_null() {
        let last = PRESENTATION_PATH.len() - 1;
        return Err(PresentationError {
            position: last,
            segment: PRESENTATION_PATH[last],
            found: "null",
        });
    }
    Ok(current)
}

fn describe(value: &Value, segment: PathSegment<'_>) -> &'static str {
    match (value, segment) {
        (Value::Object(_), PathSegment::Key(_)) => "object without that key",
        (Value::Array(_), PathSegment::Index(_)) => "array too short",
        (Value::Object(_), PathSegment::Index(_)) => "object where an array was expected",
        (Value::Array(_), PathSegment::Key(_)) => "array where an object was expected",
        (Value::Null, _) => "null",
        (Value::String(_), _) => "string",
        (Value::Number(_), _) => "number",
        (Value::Bool(_), _) => "bool",
    }
}
