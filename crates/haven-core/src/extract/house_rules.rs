use serde_json::Value;

use super::normalize::{HOUSE_RULE_SUFFIX, derive_key, replace_line_breaks};
use super::{find_typed_section, section_list};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use crate::models::FieldMap;
use crate::navigate::{get_array, get_non_empty_str, get_str};
use crate::path;

pub const POLICIES_SECTION: &str = "PoliciesSection";

/// Item title whose long-form rules live in `html.htmlText` rather than in
/// structured items. Matched exactly.
pub const ADDITIONAL_RULES_TITLE: &str = "Additional rules";

/// House rules, one `<group>_house_rule` list per titled rule group.
///
/// Each item renders as `"title: subtitle"`, or just `title` when there is
/// no subtitle. The "Additional rules" item also contributes its free text
/// as an extra entry right after its own.
pub fn extract_house_rules(
    presentation: Option<&Value>,
    listing_id: &str,
    sink: &dyn DiagnosticSink,
) -> FieldMap {
    let mut fields = FieldMap::new();

    let Some(sections) = section_list(presentation, listing_id, sink, "house rules") else {
        return fields;
    };

    let Some(policies) = find_typed_section(sections, POLICIES_SECTION) else {
        sink.emit(Diagnostic::new(
            Severity::Error,
            listing_id,
            DiagnosticKind::SectionNotFound,
            format!("No {POLICIES_SECTION} found"),
        ));
        return fields;
    };
    sink.emit(Diagnostic::new(
        Severity::Info,
        listing_id,
        DiagnosticKind::SectionFound,
        "house rules section found",
    ));

    for group in get_array(policies, &path!["houseRulesSections"]) {
        let Some(title) = get_non_empty_str(group, &path!["title"]) else {
            continue;
        };
        let entries = get_array(group, &path!["items"])
            .iter()
            .flat_map(rule_entries)
            .collect::<Vec<_>>();
        fields.insert(derive_key(title, HOUSE_RULE_SUFFIX), entries);
    }

    replace_line_breaks(&mut fields);
    fields
}

fn rule_entries(item: &Value) -> Vec<String> {
    let Some(title) = get_str(item, &path!["title"]) else {
        return Vec::new();
    };

    let mut entries = vec![match get_non_empty_str(item, &path!["subtitle"]) {
        Some(subtitle) => format!("{title}: {subtitle}"),
        None => title.to_string(),
    }];

    if title == ADDITIONAL_RULES_TITLE
        && let Some(text) = get_non_empty_str(item, &path!["html", "htmlText"])
    {
        entries.push(text.to_string());
    }
    entries
}
