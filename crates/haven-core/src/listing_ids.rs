use std::io::Read;
use std::path::Path;

use crate::error::AppError;

pub const ID_COLUMN: &str = "id";

/// Listing ids from the `id` column of a CSV file with a header row.
pub fn read_listing_ids(path: &Path) -> Result<Vec<String>, AppError> {
    let reader = csv::Reader::from_path(path)?;
    collect_ids(reader)
}

/// Same as [`read_listing_ids`] for any reader.
pub fn read_listing_ids_from<R: Read>(input: R) -> Result<Vec<String>, AppError> {
    collect_ids(csv::Reader::from_reader(input))
}

fn collect_ids<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<String>, AppError> {
    let column = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == ID_COLUMN)
        .ok_or_else(|| AppError::ConfigError(format!("CSV has no '{ID_COLUMN}' column")))?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        match record.get(column).map(normalize_id) {
            Some(id) if !id.is_empty() => ids.push(id),
            _ => tracing::warn!(line = ?record.position().map(|p| p.line()), "Row without listing id"),
        }
    }
    Ok(ids)
}

/// Ids read back from spreadsheets sometimes come out as `12345.0`.
fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(".0") {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.to_string()
        }
        _ => trimmed.to_string(),
    }
}
