//! Source location tracking for tokens, AST nodes and diagnostics.
//!
//! # Design
//!
//! - `Span` — compact byte range into a registered source file
//! - `SourceMap` — owns all source files, resolves spans to lines/columns
//! - `SourceLocation` — resolved (file, line, column) triple handed to
//!   external consumers
//!
//! Every token and every AST node carries a `Span`; the text a span covers
//! is always recoverable via [`SourceMap::snippet`], so a token's lexeme is
//! by construction the exact source substring at its location.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compact reference to a byte range in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index into `SourceMap` files
    pub file_id: u16,
    /// Byte offset of the first byte
    pub start: u32,
    /// Byte offset past the last byte
    pub end: u32,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    /// Zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Span covering both `self` and `other`.
    ///
    /// Panics if the spans come from different files.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot merge spans from different files"
        );
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Resolved source position, 1-based, as exposed to external consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Path of the originating file, if one was registered under a name
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

/// All source files participating in a compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with a precomputed line index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    /// Byte offsets of line starts; last entry is an EOF sentinel.
    line_starts: Vec<u32>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Register a source file and return its id.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let file_id = self.files.len();
        assert!(file_id < u16::MAX as usize, "too many source files");
        self.files.push(SourceFile::new(path, source));
        file_id as u16
    }

    pub fn file(&self, span: &Span) -> &SourceFile {
        &self.files[span.file_id as usize]
    }

    pub fn file_path(&self, span: &Span) -> &Path {
        &self.files[span.file_id as usize].path
    }

    /// Exact source text covered by a span.
    pub fn snippet(&self, span: &Span) -> &str {
        let file = &self.files[span.file_id as usize];
        &file.source[span.start as usize..span.end as usize]
    }

    /// 1-based (line, column) of a span's start.
    pub fn line_col(&self, span: &Span) -> (u32, u32) {
        self.files[span.file_id as usize].line_col(span.start)
    }

    /// Resolve a span into the (file, line, column) triple carried by
    /// externally visible diagnostics.
    pub fn location(&self, span: &Span) -> SourceLocation {
        let file = &self.files[span.file_id as usize];
        let (line, column) = file.line_col(span.start);
        let path = file.path.to_string_lossy();
        SourceLocation {
            file: if path.is_empty() {
                None
            } else {
                Some(path.into_owned())
            },
            line,
            column,
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl SourceFile {
    pub fn new(path: PathBuf, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// 1-based (line, column) for a byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.max(1) - 1,
        };
        let line = (line_idx + 1) as u32;
        let col = (offset - self.line_starts[line_idx]) + 1;
        (line, col)
    }

    /// Text of a 1-based line, without consuming the trailing newline.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 || line as usize >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[(line - 1) as usize] as usize;
        let end = self.line_starts[line as usize] as usize;
        Some(self.source[start..end].trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len() - 1
    }
}

fn compute_line_starts(source: &str) -> Vec<u32> {
    let mut line_starts = vec![0];
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            line_starts.push((idx + 1) as u32);
        }
    }
    if line_starts.last() != Some(&(source.len() as u32)) {
        line_starts.push(source.len() as u32);
    }
    line_starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_reconstructs_source() {
        let mut map = SourceMap::new();
        let id = map.add_file(PathBuf::from("t.myc"), "network demo {}".to_string());
        let span = Span::new(id, 8, 12);
        assert_eq!(map.snippet(&span), "demo");
    }

    #[test]
    fn test_line_col() {
        let file = SourceFile::new(PathBuf::from("t.myc"), "hello\nworld\n".to_string());
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(6), (2, 1));
        assert_eq!(file.line_col(9), (2, 4));
    }

    #[test]
    fn test_line_text_strips_newline() {
        let file = SourceFile::new(PathBuf::from("t.myc"), "one\ntwo\n".to_string());
        assert_eq!(file.line_text(1), Some("one"));
        assert_eq!(file.line_text(2), Some("two"));
        assert_eq!(file.line_text(3), None);
    }

    #[test]
    fn test_merge() {
        let a = Span::new(0, 4, 9);
        let b = Span::new(0, 7, 15);
        let merged = a.merge(&b);
        assert_eq!((merged.start, merged.end), (4, 15));
    }

    #[test]
    fn test_location_for_unnamed_file() {
        let mut map = SourceMap::new();
        let id = map.add_file(PathBuf::new(), "x".to_string());
        let loc = map.location(&Span::new(id, 0, 1));
        assert_eq!(loc.file, None);
        assert_eq!((loc.line, loc.column), (1, 1));
    }
}
