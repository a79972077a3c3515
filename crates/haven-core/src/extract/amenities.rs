use serde_json::Value;

use super::normalize::{AMENITIES_SUFFIX, derive_key, replace_line_breaks};
use super::{find_typed_section, section_list};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use crate::models::FieldMap;
use crate::navigate::{get_array, get_non_empty_str, get_str};
use crate::path;

pub const AMENITIES_SECTION: &str = "AmenitiesSection";
pub const AMENITY_GROUPS_KEY: &str = "seeAllAmenitiesGroups";

/// Amenities, one `<group>_amenities` list of amenity titles per group.
///
/// A found `AmenitiesSection` without `seeAllAmenitiesGroups` is reported as
/// schema drift, with the section itself attached to the message.
pub fn extract_amenities(
    presentation: Option<&Value>,
    listing_id: &str,
    sink: &dyn DiagnosticSink,
) -> FieldMap {
    let mut fields = FieldMap::new();

    let Some(sections) = section_list(presentation, listing_id, sink, "amenities") else {
        return fields;
    };

    let Some(amenities) = find_typed_section(sections, AMENITIES_SECTION) else {
        sink.emit(Diagnostic::new(
            Severity::Error,
            listing_id,
            DiagnosticKind::SectionNotFound,
            format!("No {AMENITIES_SECTION} found"),
        ));
        return fields;
    };

    let has_groups = amenities
        .as_object()
        .is_some_and(|section| section.contains_key(AMENITY_GROUPS_KEY));
    if !has_groups {
        sink.emit(Diagnostic::new(
            Severity::Error,
            listing_id,
            DiagnosticKind::SchemaDrift,
            format!("{AMENITIES_SECTION} is missing '{AMENITY_GROUPS_KEY}': {amenities}"),
        ));
        return fields;
    }
    sink.emit(Diagnostic::new(
        Severity::Info,
        listing_id,
        DiagnosticKind::SectionFound,
        format!("{AMENITIES_SECTION} found"),
    ));

    for group in get_array(amenities, &path![AMENITY_GROUPS_KEY]) {
        let Some(title) = get_non_empty_str(group, &path!["title"]) else {
            continue;
        };
        let names = get_array(group, &path!["amenities"])
            .iter()
            .filter_map(|amenity| get_str(amenity, &path!["title"]))
            .map(str::to_string)
            .collect::<Vec<_>>();
        fields.insert(derive_key(title, AMENITIES_SUFFIX), names);
    }

    replace_line_breaks(&mut fields);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use crate::testutil::{RecordingSink, presentation_with_sections};
    use serde_json::json;

    fn amenities_section(body: Value) -> Value {
        let mut section = json!({"__typename": "AmenitiesSection"});
        if let (Some(target), Some(extra)) = (section.as_object_mut(), body.as_object()) {
            target.extend(extra.clone());
        }
        presentation_with_sections(vec![json!({ "section": section })])
    }

    #[test]
    fn groups_become_ordered_lists() {
        let presentation = amenities_section(json!({"seeAllAmenitiesGroups": [
            {"title": "Bathroom", "amenities": [{"title": "Hair dryer"}, {"title": "Shampoo"}]},
            {"title": "Heating and cooling", "amenities": [{"title": "Heating\nCentral"}]}
        ]}));

        let fields = extract_amenities(Some(&presentation), "1", &RecordingSink::new());

        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["bathroom_amenities", "heating_and_cooling_amenities"]
        );
        assert_eq!(
            fields.get("bathroom_amenities"),
            Some(&FieldValue::List(vec!["Hair dryer".into(), "Shampoo".into()]))
        );
        assert_eq!(
            fields.get("heating_and_cooling_amenities"),
            Some(&FieldValue::List(vec!["Heating %%% Central".into()]))
        );
    }

    #[test]
    fn untitled_groups_and_amenities_are_skipped() {
        let presentation = amenities_section(json!({"seeAllAmenitiesGroups": [
            {"amenities": [{"title": "orphan"}]},
            {"title": "Kitchen", "amenities": [{"title": "Oven"}, {"icon": "x"}]}
        ]}));

        let fields = extract_amenities(Some(&presentation), "1", &RecordingSink::new());

        assert_eq!(fields.len(), 1);
        assert_eq!(
            fields.get("kitchen_amenities"),
            Some(&FieldValue::List(vec!["Oven".into()]))
        );
    }

    #[test]
    fn missing_groups_key_is_schema_drift() {
        let presentation = amenities_section(json!({"previewAmenitiesGroups": []}));
        let sink = RecordingSink::new();

        let fields = extract_amenities(Some(&presentation), "5", &sink);

        assert!(fields.is_empty());
        let diag = sink.find_kind(DiagnosticKind::SchemaDrift).unwrap();
        assert_eq!(diag.severity, Severity::Error);
        assert!(diag.message.contains("previewAmenitiesGroups"));
        assert!(!sink.has_kind(DiagnosticKind::SectionNotFound));
    }

    #[test]
    fn missing_section_is_not_schema_drift() {
        let presentation = presentation_with_sections(vec![json!({
            "section": {"__typename": "PoliciesSection"}
        })]);
        let sink = RecordingSink::new();

        let fields = extract_amenities(Some(&presentation), "5", &sink);

        assert!(fields.is_empty());
        assert!(sink.has_kind(DiagnosticKind::SectionNotFound));
        assert!(!sink.has_kind(DiagnosticKind::SchemaDrift));
    }

    #[test]
    fn null_groups_value_yields_empty() {
        let presentation = amenities_section(json!({"seeAllAmenitiesGroups": null}));
        let sink = RecordingSink::new();

        assert!(extract_amenities(Some(&presentation), "1", &sink).is_empty());
        assert!(!sink.has_kind(DiagnosticKind::SchemaDrift));
    }
}
