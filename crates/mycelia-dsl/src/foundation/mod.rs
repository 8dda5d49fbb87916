//! Shared value types used by every compiler stage.

mod span;

pub use span::{SourceFile, SourceLocation, SourceMap, Span};
