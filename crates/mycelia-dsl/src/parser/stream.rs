//! Token cursor for the recursive descent parser.

use crate::error::{Diagnostic, DiagnosticKind};
use crate::foundation::Span;
use crate::lexer::Token;

/// Token stream with lookahead, byte-accurate span tracking and error
/// recovery.
pub struct TokenStream<'src> {
    tokens: &'src [(Token, Span)],
    pos: usize,
    file_id: u16,
}

impl<'src> TokenStream<'src> {
    pub fn new(tokens: &'src [(Token, Span)], file_id: u16) -> Self {
        Self {
            tokens,
            pos: 0,
            file_id,
        }
    }

    /// Current token without consuming it. `Eof` past the end.
    pub fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    /// Token `n` positions ahead without consuming.
    pub fn peek_nth(&self, n: usize) -> &Token {
        self.tokens
            .get(self.pos + n)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    /// Consume and return the current token with its span.
    pub fn advance(&mut self) -> (Token, Span) {
        match self.tokens.get(self.pos) {
            Some((token, span)) => {
                self.pos += 1;
                (token.clone(), *span)
            }
            None => (Token::Eof, self.eof_span()),
        }
    }

    /// True when the current token has the same discriminant as `expected`.
    pub fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(expected)
    }

    /// Consume the current token if it matches, otherwise report it.
    pub fn expect(&mut self, expected: Token) -> Result<Span, Diagnostic> {
        if self.check(&expected) {
            Ok(self.advance().1)
        } else {
            Err(Diagnostic::error(
                DiagnosticKind::Syntax,
                self.current_span(),
                format!("expected `{}`, found `{}`", expected, self.peek()),
            ))
        }
    }

    /// Consume an identifier and return its text.
    pub fn expect_ident(&mut self, context: &str) -> Result<(String, Span), Diagnostic> {
        match self.peek() {
            Token::Ident(_) => {
                let (token, span) = self.advance();
                match token {
                    Token::Ident(name) => Ok((name, span)),
                    _ => unreachable!(),
                }
            }
            other => Err(Diagnostic::error(
                DiagnosticKind::Syntax,
                self.current_span(),
                format!("expected identifier {}, found `{}`", context, other),
            )),
        }
    }

    /// Consume the current token if it matches (separator skipping).
    pub fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    pub fn current_pos(&self) -> usize {
        self.pos
    }

    /// Span of the current token.
    pub fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| self.eof_span())
    }

    /// Byte span covering everything from the token at `start` up to the
    /// last consumed token.
    pub fn span_from(&self, start: usize) -> Span {
        let first = self
            .tokens
            .get(start)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| self.eof_span());
        let last = self
            .tokens
            .get(self.pos.saturating_sub(1).max(start))
            .map(|(_, s)| *s)
            .unwrap_or(first);
        first.merge(&last)
    }

    /// Diagnostic for an unexpected current token.
    pub fn unexpected(&self, context: &str) -> Diagnostic {
        Diagnostic::error(
            DiagnosticKind::Syntax,
            self.current_span(),
            format!("unexpected `{}` {}", self.peek(), context),
        )
    }

    /// Recover after a failed production that started at `start`: if the
    /// production consumed nothing, advance one token so recovery always
    /// makes progress, then synchronize.
    pub fn recover_from(&mut self, start: usize) {
        if self.pos == start && !self.at_end() {
            self.advance();
        }
        self.synchronize();
    }

    /// Skip forward to the next synchronization point: a section or
    /// statement keyword, an opening brace, or a closing brace (left for
    /// the enclosing production to consume).
    pub fn synchronize(&mut self) {
        while !self.at_end() {
            match self.peek() {
                Token::Frequencies
                | Token::Hyphae
                | Token::Topology
                | Token::Config
                | Token::Frequency
                | Token::Hyphal
                | Token::State
                | Token::On
                | Token::Emit
                | Token::Let
                | Token::If
                | Token::Report
                | Token::Spawn
                | Token::Die
                | Token::Socket
                | Token::FruitingBody
                | Token::LBrace
                | Token::RBrace => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn eof_span(&self) -> Span {
        self.tokens
            .last()
            .map(|(_, s)| Span::new(self.file_id, s.end, s.end))
            .unwrap_or_else(|| Span::zero(self.file_id))
    }
}
