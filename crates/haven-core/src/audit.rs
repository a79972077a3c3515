//! Listing ids that could not be processed, grouped by failure category and
//! written out after a run so they can be inspected or retried.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use indexmap::IndexSet;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity, TracingSink};
use crate::error::AppError;
use crate::jsonl::write_single_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureCategory {
    /// The page data has no presentation object.
    PresentationUnreachable,
    /// The section list, or a section a pass looks for, is absent.
    SectionsMissing,
    /// A section is present but the key holding its items is gone.
    SectionItemsMissing,
    /// A downloaded `<listing_id>.jsonl` file could not be read.
    UnreadableFile,
    /// The listing page has no injected data script (removed listing).
    NoScriptTag,
    /// The listing page could not be fetched or its data not parsed.
    PageFailed,
}

impl FailureCategory {
    /// Categories tracked while parsing downloaded pages.
    pub const PARSE: [FailureCategory; 4] = [
        FailureCategory::PresentationUnreachable,
        FailureCategory::SectionsMissing,
        FailureCategory::SectionItemsMissing,
        FailureCategory::UnreadableFile,
    ];

    /// Categories tracked while downloading pages.
    pub const DOWNLOAD: [FailureCategory; 2] =
        [FailureCategory::NoScriptTag, FailureCategory::PageFailed];

    pub fn file_name(&self) -> &'static str {
        match self {
            FailureCategory::PresentationUnreachable => "cannot_get_presentation_list.txt",
            FailureCategory::SectionsMissing => "cannot_get_selected_sections_list.txt",
            FailureCategory::SectionItemsMissing => "cannot_get_item_from_selected_section_list.txt",
            FailureCategory::UnreadableFile => "unreadable_listing_file_list.txt",
            FailureCategory::NoScriptTag => "listing_does_not_exist_no_matching_script_tag_list.txt",
            FailureCategory::PageFailed => "page_request_failed_list.txt",
        }
    }

    /// Category an extractor diagnostic counts towards. Only error-severity
    /// diagnostics count; informational ones follow from an earlier error.
    pub fn from_diagnostic(diagnostic: &Diagnostic) -> Option<Self> {
        if diagnostic.severity != Severity::Error {
            return None;
        }
        match diagnostic.kind {
            DiagnosticKind::PresentationUnreachable => Some(FailureCategory::PresentationUnreachable),
            DiagnosticKind::SectionsMissing | DiagnosticKind::SectionNotFound => {
                Some(FailureCategory::SectionsMissing)
            }
            DiagnosticKind::SchemaDrift => Some(FailureCategory::SectionItemsMissing),
            _ => None,
        }
    }
}

/// Failed listing ids per category, each list in first-seen order without
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureLists {
    lists: BTreeMap<FailureCategory, IndexSet<String>>,
}

impl FailureLists {
    /// Lists for `categories`. These are written even when they stay empty.
    pub fn with_categories(categories: &[FailureCategory]) -> Self {
        Self {
            lists: categories.iter().map(|c| (*c, IndexSet::new())).collect(),
        }
    }

    pub fn record(&mut self, category: FailureCategory, listing_id: &str) {
        self.lists
            .entry(category)
            .or_default()
            .insert(listing_id.to_string());
    }

    pub fn ids(&self, category: FailureCategory) -> Vec<&str> {
        self.lists
            .get(&category)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, category: FailureCategory) -> usize {
        self.lists.get(&category).map_or(0, IndexSet::len)
    }

    /// Write each list to `<dir>/<category file>` as a JSON array.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, AppError> {
        let mut written = Vec::with_capacity(self.lists.len());
        for (category, ids) in &self.lists {
            let path = dir.join(category.file_name());
            write_single_line(&path, ids)?;
            tracing::info!(count = ids.len(), path = %path.display(), "Failure list saved");
            written.push(path);
        }
        Ok(written)
    }
}

/// Diagnostics sink that records failing listing ids and forwards every
/// diagnostic to an inner sink.
#[derive(Debug, Default)]
pub struct AuditSink<S = TracingSink> {
    inner: S,
    failures: Mutex<FailureLists>,
}

impl<S: DiagnosticSink> AuditSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failures: Mutex::new(FailureLists::with_categories(&FailureCategory::PARSE)),
        }
    }

    /// Record a failure that did not come through a diagnostic.
    pub fn record(&self, category: FailureCategory, listing_id: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(category, listing_id);
    }

    pub fn failures(&self) -> FailureLists {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<S: DiagnosticSink> DiagnosticSink for AuditSink<S> {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Some(category) = FailureCategory::from_diagnostic(&diagnostic) {
            self.record(category, &diagnostic.listing_id);
        }
        self.inner.emit(diagnostic);
    }
}
