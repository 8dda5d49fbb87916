//! Lexical analysis for Mycelia source text.
//!
//! Tokenization uses a logos-derived lexer. Whitespace, `#` line comments
//! and non-nesting `/* ... */` block comments are skipped; everything else
//! becomes a [`Token`] paired with its byte [`Span`]. Unrecognized input
//! never aborts the scan: it is reported as a diagnostic and the lexer
//! resumes at the next recognizable character.
//!
//! A token's lexeme is recovered from the [`SourceMap`] via its span, so
//! lexeme and source substring can never disagree.

use crate::error::{Diagnostic, DiagnosticKind};
use crate::foundation::Span;
use logos::Logos;

/// One Mycelia token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token {
    // === Keywords ===
    #[token("network")]
    Network,
    #[token("frequencies")]
    Frequencies,
    #[token("frequency")]
    Frequency,
    #[token("hyphae")]
    Hyphae,
    #[token("hyphal")]
    Hyphal,
    #[token("state")]
    State,
    #[token("on")]
    On,
    #[token("signal")]
    Signal,
    #[token("emit")]
    Emit,
    #[token("report")]
    Report,
    #[token("spawn")]
    Spawn,
    #[token("die")]
    Die,
    #[token("socket")]
    Socket,
    #[token("fruiting_body")]
    FruitingBody,
    #[token("topology")]
    Topology,
    #[token("config")]
    Config,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("where")]
    Where,
    #[token("rest")]
    Rest,
    #[token("cycle")]
    Cycle,
    #[token("let")]
    Let,
    #[token("as")]
    As,

    // Type keywords
    #[token("u32")]
    U32,
    #[token("i64")]
    I64,
    #[token("f64")]
    F64,
    #[token("string")]
    StringTy,
    #[token("binary")]
    Binary,
    #[token("boolean")]
    Boolean,
    #[token("vec")]
    Vec,
    #[token("queue")]
    Queue,
    #[token("map")]
    Map,

    // === Operators ===
    #[token("->")]
    Arrow,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    // === Delimiters ===
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("@")]
    At,

    // === Literals ===
    /// Boolean literal `true`
    #[token("true")]
    True,
    /// Boolean literal `false`
    #[token("false")]
    False,

    /// Integer literal, e.g. `42`
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    /// Decimal literal, e.g. `3.14`
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    /// String literal, double- or single-quoted. A backslash makes the
    /// following character stand for itself.
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    Str(String),

    /// Identifier: `[A-Za-z_][A-Za-z0-9_]*`
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// End of input; appended once by [`lex`].
    Eof,
}

fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fixed = match self {
            Token::Network => "network",
            Token::Frequencies => "frequencies",
            Token::Frequency => "frequency",
            Token::Hyphae => "hyphae",
            Token::Hyphal => "hyphal",
            Token::State => "state",
            Token::On => "on",
            Token::Signal => "signal",
            Token::Emit => "emit",
            Token::Report => "report",
            Token::Spawn => "spawn",
            Token::Die => "die",
            Token::Socket => "socket",
            Token::FruitingBody => "fruiting_body",
            Token::Topology => "topology",
            Token::Config => "config",
            Token::If => "if",
            Token::Else => "else",
            Token::Where => "where",
            Token::Rest => "rest",
            Token::Cycle => "cycle",
            Token::Let => "let",
            Token::As => "as",
            Token::U32 => "u32",
            Token::I64 => "i64",
            Token::F64 => "f64",
            Token::StringTy => "string",
            Token::Binary => "binary",
            Token::Boolean => "boolean",
            Token::Vec => "vec",
            Token::Queue => "queue",
            Token::Map => "map",
            Token::Arrow => "->",
            Token::EqEq => "==",
            Token::BangEq => "!=",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Eq => "=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Bang => "!",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::Dot => ".",
            Token::At => "@",
            Token::True => "true",
            Token::False => "false",
            Token::Eof => "end of input",
            Token::Integer(v) => return write!(f, "{}", v),
            Token::Float(v) => return write!(f, "{}", v),
            Token::Str(s) => return write!(f, "\"{}\"", s),
            Token::Ident(name) => return write!(f, "{}", name),
        };
        write!(f, "{}", fixed)
    }
}

/// Tokenize a source file.
///
/// Returns every recognized token in order, terminated by [`Token::Eof`],
/// plus a diagnostic for each stretch of unrecognized input. Errors never
/// abort the scan.
pub fn lex(source: &str, file_id: u16) -> (Vec<(Token, Span)>, Vec<Diagnostic>) {
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();

    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(file_id, range.start as u32, range.end as u32);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let slice = lexer.slice();
                let message = if slice.starts_with('"') || slice.starts_with('\'') {
                    "unterminated string literal".to_string()
                } else {
                    format!("unrecognized character {:?}", slice)
                };
                diagnostics.push(Diagnostic::error(DiagnosticKind::Syntax, span, message));
            }
        }
    }

    let end = source.len() as u32;
    tokens.push((Token::Eof, Span::new(file_id, end, end)));
    (tokens, diagnostics)
}
