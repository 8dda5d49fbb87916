//! Structured diagnostics for the compile pipeline.
//!
//! Lexing, parsing and analysis never throw past the pipeline boundary;
//! every failure is a [`Diagnostic`] carrying a severity, a message and the
//! span of the offending construct. Downstream consumers (editor, CLI)
//! render the list; [`DiagnosticFormatter`] provides the reference
//! rendering with source snippets and underlines.

use crate::foundation::{SourceLocation, SourceMap, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of diagnostic, by the stage that detected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Malformed token or unexpected token
    Syntax,
    /// Reference to a name with no declaration
    UndefinedName,
    /// Two declarations under the same name
    DuplicateName,
    /// Type reference that resolves to nothing
    UnknownType,
    /// Literal whose kind contradicts the declared type
    TypeMismatch,
    /// Socket endpoint or spawn target that is not part of the topology
    InvalidTopology,
    /// Emit payload that disagrees with the frequency schema
    PayloadMismatch,
    /// Duplicate or unrecognized section / config key
    Structure,
}

impl DiagnosticKind {
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::Syntax => "syntax error",
            DiagnosticKind::UndefinedName => "undefined name",
            DiagnosticKind::DuplicateName => "duplicate name",
            DiagnosticKind::UnknownType => "unknown type",
            DiagnosticKind::TypeMismatch => "type mismatch",
            DiagnosticKind::InvalidTopology => "invalid topology",
            DiagnosticKind::PayloadMismatch => "payload mismatch",
            DiagnosticKind::Structure => "structure",
        }
    }
}

/// Diagnostic severity.
///
/// A non-empty `Error` list disqualifies an AST from execution; warnings
/// and notes do not.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Secondary labeled span ("first declared here").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

/// A single compile-time diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self::with_severity(kind, Severity::Error, span, message.into())
    }

    pub fn warning(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self::with_severity(kind, Severity::Warning, span, message.into())
    }

    fn with_severity(
        kind: DiagnosticKind,
        severity: Severity,
        span: Span,
        message: String,
    ) -> Self {
        Self {
            kind,
            severity,
            span,
            message,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// The (severity, message, location) triple of the external interface.
    pub fn resolved(&self, sources: &SourceMap) -> (Severity, &str, SourceLocation) {
        (self.severity, &self.message, sources.location(&self.span))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.severity,
            self.kind.name(),
            self.message
        )
    }
}

impl std::error::Error for Diagnostic {}

/// Returns true if any diagnostic in the list has `Error` severity.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error)
}

/// Formats diagnostics with source context: location line, snippet and a
/// `^^^` underline, followed by labels and notes.
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "{}: {}: {}\n",
            diagnostic.severity,
            diagnostic.kind.name(),
            diagnostic.message
        ));

        let (line, col) = self.sources.line_col(&diagnostic.span);
        let path = self.sources.file_path(&diagnostic.span);
        out.push_str(&format!("  --> {}:{}:{}\n", path.display(), line, col));

        let file = self.sources.file(&diagnostic.span);
        if let Some(text) = file.line_text(line) {
            out.push_str("   |\n");
            out.push_str(&format!("{:3} | {}\n", line, text));
            let start_col = col as usize;
            let span_len = (diagnostic.span.end - diagnostic.span.start) as usize;
            let end_col = (start_col + span_len).min(text.len() + 1);
            let underline = " ".repeat(start_col.saturating_sub(1))
                + &"^".repeat(end_col.saturating_sub(start_col).max(1));
            out.push_str(&format!("   | {}\n", underline));
        }

        for label in &diagnostic.labels {
            let (l, c) = self.sources.line_col(&label.span);
            let p = self.sources.file_path(&label.span);
            out.push_str(&format!("   = note: {}\n", label.message));
            out.push_str(&format!("     at {}:{}:{}\n", p.display(), l, c));
        }
        for note in &diagnostic.notes {
            out.push_str(&format!("   = help: {}\n", note));
        }

        out
    }

    pub fn format_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| self.format(d))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sources() -> SourceMap {
        let mut map = SourceMap::new();
        map.add_file(
            PathBuf::from("t.myc"),
            "network demo {\n  frequencies {}\n}".to_string(),
        );
        map
    }

    #[test]
    fn test_builder_chaining() {
        let d = Diagnostic::error(DiagnosticKind::DuplicateName, Span::new(0, 8, 12), "dup")
            .with_label(Span::new(0, 0, 7), "first declared here")
            .with_note("rename one of them");
        assert_eq!(d.labels.len(), 1);
        assert_eq!(d.notes.len(), 1);
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn test_has_errors_ignores_warnings() {
        let warn = Diagnostic::warning(DiagnosticKind::Structure, Span::zero(0), "w");
        assert!(!has_errors(&[warn.clone()]));
        let err = Diagnostic::error(DiagnosticKind::Syntax, Span::zero(0), "e");
        assert!(has_errors(&[warn, err]));
    }

    #[test]
    fn test_formatter_underlines_offending_text() {
        let sources = sources();
        let d = Diagnostic::error(
            DiagnosticKind::UndefinedName,
            Span::new(0, 8, 12),
            "no such frequency 'demo'",
        );
        let rendered = DiagnosticFormatter::new(&sources).format(&d);
        assert!(rendered.contains("t.myc:1:9"));
        assert!(rendered.contains("network demo {"));
        assert!(rendered.contains("^^^^"));
    }

    #[test]
    fn test_resolved_shape() {
        let sources = sources();
        let d = Diagnostic::warning(DiagnosticKind::Structure, Span::new(0, 17, 28), "dup section");
        let (severity, message, loc) = d.resolved(&sources);
        assert_eq!(severity, Severity::Warning);
        assert_eq!(message, "dup section");
        assert_eq!(loc.line, 2);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }
}
