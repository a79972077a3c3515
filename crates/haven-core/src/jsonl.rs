//! JSON-Lines reading and appending.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

pub const JSONL_EXTENSION: &str = "jsonl";

/// Read every non-blank line of a JSON-Lines file.
pub fn read_jsonl(path: &Path) -> Result<Vec<Value>, AppError> {
    let file = File::open(path)?;
    let mut values = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line).map_err(|e| {
            AppError::ParseError(format!("{}:{}: {e}", path.display(), index + 1))
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Read a listing's raw document from `<listing_id>.jsonl`.
///
/// The document is the array of all lines in the file, which is the shape
/// the presentation path expects.
pub fn read_listing_document(path: &Path) -> Result<Value, AppError> {
    read_jsonl(path).map(Value::Array)
}

/// Listing id encoded in a `<listing_id>.jsonl` file name.
pub fn listing_id_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(JSONL_EXTENSION) {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Path of the raw document for `listing_id` inside `dir`.
pub fn listing_file(dir: &Path, listing_id: &str) -> PathBuf {
    dir.join(format!("{listing_id}.{JSONL_EXTENSION}"))
}

/// All `*.jsonl` files directly inside `dir`, sorted by name.
pub fn listing_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && listing_id_from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Write `value` as the single line of `path`, replacing any previous content.
pub fn write_single_line<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Appends one JSON record per line, flushing after each record so a crash
/// mid-run keeps everything written so far.
pub struct JsonlWriter {
    writer: BufWriter<File>,
    written: usize,
}

impl JsonlWriter {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn append(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<(), AppError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Records written through this writer (not counting earlier content).
    pub fn written(&self) -> usize {
        self.written
    }
}
