use crate::models::FieldMap;

/// Replacement for line breaks so a value stays on one JSON-Lines row.
pub const LINE_BREAK_SENTINEL: &str = " %%% ";

pub const HOUSE_RULE_SUFFIX: &str = "_house_rule";
pub const AMENITIES_SUFFIX: &str = "_amenities";
pub const DESCRIPTION_SUFFIX: &str = "_description";

/// Derive an output key from a human-readable title.
///
/// Lowercases and turns spaces into underscores; every other character,
/// hyphens included, is kept. `"Check-in Time"` with `_house_rule` gives
/// `check-in_time_house_rule`.
pub fn derive_key(title: &str, suffix: &str) -> String {
    let mut key = title.to_lowercase().replace(' ', "_");
    key.push_str(suffix);
    key
}

/// Replace every line break in `text` with [`LINE_BREAK_SENTINEL`].
///
/// `\r\n` counts as a single break.
pub fn replace_line_breaks_in(text: &str) -> String {
    if !text.contains(['\n', '\r']) {
        return text.to_string();
    }
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', LINE_BREAK_SENTINEL)
}

/// Normalize line breaks in every value of `fields`, list elements included.
pub fn replace_line_breaks(fields: &mut FieldMap) {
    for value in fields.values_mut() {
        value.map_strings(replace_line_breaks_in);
    }
}
