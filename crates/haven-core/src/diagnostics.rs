use std::fmt;

/// Severity vocabulary for extractor diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What kind of condition a diagnostic describes.
///
/// `SectionNotFound` (the listing simply has no such section) and
/// `SchemaDrift` (the section exists but a key we rely on is gone) are kept
/// apart so drift can be audited separately after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    SectionFound,
    SectionsMissing,
    SectionNotFound,
    SchemaDrift,
    PresentationUnreachable,
    KeyCollision,
    PassSummary,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::SectionFound => "section_found",
            DiagnosticKind::SectionsMissing => "sections_missing",
            DiagnosticKind::SectionNotFound => "section_not_found",
            DiagnosticKind::SchemaDrift => "schema_drift",
            DiagnosticKind::PresentationUnreachable => "presentation_unreachable",
            DiagnosticKind::KeyCollision => "key_collision",
            DiagnosticKind::PassSummary => "pass_summary",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single degraded-but-non-fatal condition observed while extracting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub listing_id: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        listing_id: &str,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            listing_id: listing_id.to_string(),
            kind,
            message: message.into(),
        }
    }
}

/// Receives extractor diagnostics (decoupled logging).
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn emit(&self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic)
    }
}

/// Sink that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        let Diagnostic {
            severity,
            listing_id,
            kind,
            message,
        } = diagnostic;
        match severity {
            Severity::Info => tracing::info!(%listing_id, %kind, "{message}"),
            Severity::Warning => tracing::warn!(%listing_id, %kind, "{message}"),
            Severity::Error => tracing::error!(%listing_id, %kind, "{message}"),
        }
    }
}
