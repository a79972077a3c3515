use serde_json::Value;

use super::normalize::{DESCRIPTION_SUFFIX, derive_key, replace_line_breaks};
use super::section_list;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use crate::models::FieldMap;
use crate::navigate::{filter_by_field, get_array, get_non_empty_str};
use crate::path;

pub const DESCRIPTION_SECTION_ID: &str = "DESCRIPTION_MODAL";

/// Key used for the untitled overview paragraph.
pub const PLACE_DESCRIPTION_KEY: &str = "place_description";

/// Description paragraphs from the first `DESCRIPTION_MODAL` section.
pub fn extract_description(
    presentation: Option<&Value>,
    listing_id: &str,
    sink: &dyn DiagnosticSink,
) -> FieldMap {
    let mut fields = FieldMap::new();

    let Some(sections) = section_list(presentation, listing_id, sink, "description") else {
        return fields;
    };

    let matching = filter_by_field(sections, &path!["sectionId"], DESCRIPTION_SECTION_ID);
    let Some(section) = matching.first() else {
        sink.emit(Diagnostic::new(
            Severity::Error,
            listing_id,
            DiagnosticKind::SectionNotFound,
            format!("No {DESCRIPTION_SECTION_ID} sections found"),
        ));
        return fields;
    };
    sink.emit(Diagnostic::new(
        Severity::Info,
        listing_id,
        DiagnosticKind::SectionFound,
        format!("Number of selected description sections: {}", matching.len()),
    ));

    let items = get_array(section, &path!["section", "items"]);
    sink.emit(Diagnostic::new(
        Severity::Info,
        listing_id,
        DiagnosticKind::PassSummary,
        format!("Number of items in selected description section: {}", items.len()),
    ));

    for item in items {
        let Some(text) = get_non_empty_str(item, &path!["html", "htmlText"]) else {
            continue;
        };
        let key = match get_non_empty_str(item, &path!["title"]) {
            Some(title) => derive_key(title, DESCRIPTION_SUFFIX),
            None => PLACE_DESCRIPTION_KEY.to_string(),
        };
        fields.insert(key, text);
    }

    replace_line_breaks(&mut fields);
    fields
}
