//! Hand-written recursive descent parser.
//!
//! One pass over the token stream with single-token lookahead, plus one
//! two-token lookahead to tell an object construction (`Ident {`) apart
//! from an identifier used as a value.
//!
//! ## Architecture
//!
//! - `stream`: token cursor with lookahead, span tracking and recovery
//! - `decl`: `network` root and its sections
//! - `stmt`: rule bodies
//! - `expr`: precedence-climbing expression parser
//!
//! On a mismatched token the parser records a diagnostic and synchronizes
//! forward to the next section/statement keyword or brace, so a single
//! input yields as much AST and as many diagnostics as possible. The root
//! is `None` only when the opening `network` keyword is missing.

mod decl;
mod expr;
mod stmt;
mod stream;

use crate::ast::Network;
use crate::error::Diagnostic;
use crate::foundation::Span;
use crate::lexer::Token;
use stream::TokenStream;

/// Parse a tokenized file into a network AST.
///
/// Always returns every diagnostic encountered; the AST is partial when
/// recovery skipped tokens.
pub fn parse_network(tokens: &[(Token, Span)], file_id: u16) -> (Option<Network>, Vec<Diagnostic>) {
    let mut stream = TokenStream::new(tokens, file_id);
    decl::parse_network(&mut stream)
}

/// Parse a standalone expression (used by tests and tooling).
pub fn parse_expr(tokens: &[(Token, Span)], file_id: u16) -> Result<crate::ast::Expr, Diagnostic> {
    let mut stream = TokenStream::new(tokens, file_id);
    let parsed = expr::parse_expr(&mut stream, true)?;
    if !stream.at_end() {
        return Err(stream.unexpected("after expression"));
    }
    Ok(parsed)
}
