//! Listing extractor: turns a listing page's embedded bootstrap JSON into a
//! flat [`ParsedListing`].
//!
//! Three independent passes (house rules, amenities, description) read the
//! page's `presentation` sub-tree. A pass that cannot find its section
//! contributes nothing and leaves a diagnostic; it never fails the listing.

pub mod amenities;
pub mod description;
pub mod house_rules;
pub mod normalize;
pub mod presentation;

use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity, TracingSink};
use crate::models::{FieldMap, ParsedListing};
use crate::navigate::{PathSegment, find_by_field, get};
use crate::path;

pub use amenities::extract_amenities;
pub use description::extract_description;
pub use house_rules::extract_house_rules;
pub use presentation::{PRESENTATION_PATH, PresentationError, locate_presentation};

/// Where the section list lives inside `presentation`.
pub const SECTIONS_PATH: &[PathSegment<'static>] = &[
    PathSegment::Key("stayProductDetailPage"),
    PathSegment::Key("sections"),
    PathSegment::Key("sections"),
];

fn section_list<'v>(
    presentation: Option<&'v Value>,
    listing_id: &str,
    sink: &dyn DiagnosticSink,
    pass: &str,
) -> Option<&'v [Value]> {
    let Some(presentation) = presentation else {
        sink.emit(Diagnostic::new(
            Severity::Info,
            listing_id,
            DiagnosticKind::SectionsMissing,
            format!("No presentation available, skipping {pass}"),
        ));
        return None;
    };
    match get(presentation, SECTIONS_PATH).and_then(Value::as_array) {
        Some(sections) => Some(sections.as_slice()),
        None => {
            sink.emit(Diagnostic::new(
                Severity::Error,
                listing_id,
                DiagnosticKind::SectionsMissing,
                format!("Presentation has no stayProductDetailPage.sections.sections, skipping {pass}"),
            ));
            None
        }
    }
}

/// Inner `section` object of the first entry whose `section.__typename`
/// equals `typename`.
fn find_typed_section<'v>(sections: &'v [Value], typename: &str) -> Option<&'v Value> {
    let entry = find_by_field(sections, &path!["section", "__typename"], typename)?;
    get(entry, &path!["section"])
}

/// Runs the three extraction passes for one listing.
///
/// Holds nothing but the diagnostics sink, so one extractor can serve any
/// number of listings, from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct ListingExtractor<S = TracingSink> {
    sink: S,
}

impl ListingExtractor<TracingSink> {
    pub fn new() -> Self {
        Self { sink: TracingSink }
    }
}

impl<S: DiagnosticSink> ListingExtractor<S> {
    pub fn with_sink(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Extract house rules, amenities and descriptions from a raw listing
    /// document.
    ///
    /// Always returns a listing carrying `listing_id`. When the presentation
    /// cannot be reached, that is all it carries.
    pub fn extract(&self, document: &Value, listing_id: &str) -> ParsedListing {
        let presentation = match locate_presentation(document) {
            Ok(presentation) => Some(presentation),
            Err(err) => {
                self.sink.emit(Diagnostic::new(
                    Severity::Error,
                    listing_id,
                    DiagnosticKind::PresentationUnreachable,
                    format!("can't get presentation: {err}"),
                ));
                None
            }
        };

        let mut listing = ParsedListing::new(listing_id);
        let passes: [(&str, fn(Option<&Value>, &str, &dyn DiagnosticSink) -> FieldMap); 3] = [
            ("house_rules", extract_house_rules),
            ("amenities", extract_amenities),
            ("description", extract_description),
        ];

        for (name, pass) in passes {
            let fields = pass(presentation, listing_id, &self.sink);
            self.sink.emit(Diagnostic::new(
                Severity::Info,
                listing_id,
                DiagnosticKind::PassSummary,
                format!("{name} processed: {} fields", fields.len()),
            ));
            for key in listing.fields.merge(fields) {
                self.sink.emit(Diagnostic::new(
                    Severity::Warning,
                    listing_id,
                    DiagnosticKind::KeyCollision,
                    format!("{name} overwrote existing field '{key}'"),
                ));
            }
        }

        listing
    }
}

/// Extract one listing, logging diagnostics through `tracing`.
pub fn extract(document: &Value, listing_id: &str) -> ParsedListing {
    ListingExtractor::new().extract(document, listing_id)
}
