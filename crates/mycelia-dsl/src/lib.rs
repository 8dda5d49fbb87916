//! # Mycelia DSL front end
//!
//! Compiler front half for Mycelia, an event-driven coordination language
//! for networks of communicating agents: signal schemas ("frequencies"),
//! agent templates ("hyphae") with local state and reactive rules, a
//! topology of instances connected by typed sockets, and runtime
//! configuration.
//!
//! ## Pipeline
//!
//! ```text
//! source text → lexer → parser → analyzer → ValidatedNetwork
//!                  ↘︎        ↘︎         ↘︎
//!                    shared Diagnostic list
//! ```
//!
//! Every stage accumulates into the same diagnostic list instead of
//! failing fast; a [`ValidatedNetwork`] exists only when no stage produced
//! an error, and is the sole input the runtime crate accepts.

pub mod analyze;
pub mod ast;
pub mod compile;
pub mod error;
pub mod foundation;
pub mod lexer;
pub mod parser;

pub use analyze::{analyze, Analysis, Symbols};
pub use compile::{compile, parse, Compilation, ParseResult, ValidatedNetwork};
pub use error::{Diagnostic, DiagnosticFormatter, DiagnosticKind, Severity};
pub use foundation::{SourceLocation, SourceMap, Span};
