//! Expression parser: precedence climbing over the binary operator
//! ladder, a unary level, and a primary level with postfix field access.
//!
//! `allow_struct` is the one piece of context threaded through: at the top
//! level of a `where` or `if` condition an identifier followed by `{` must
//! be read as the condition ending and the rule/branch block beginning,
//! not as an object construction. Parentheses reset it.

use super::stream::TokenStream;
use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::error::Diagnostic;
use crate::lexer::Token;

pub fn parse_expr(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    parse_or(stream, allow_struct)
}

/// `name: expr, ...` field list shared by `emit` payloads and object
/// construction. An identifier followed by `:` is always a field name
/// here, never an expression; the trailing comma is permitted.
pub fn parse_payload_fields(stream: &mut TokenStream) -> Result<Vec<(String, Expr)>, Diagnostic> {
    let mut fields = Vec::new();
    while !stream.at_end() && !stream.check(&Token::RBrace) {
        let (name, _) = stream.expect_ident("for payload field")?;
        stream.expect(Token::Colon)?;
        let value = parse_expr(stream, true)?;
        fields.push((name, value));
        if !stream.eat(&Token::Comma) {
            break;
        }
    }
    Ok(fields)
}

fn parse_or(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    let start = stream.current_pos();
    let mut left = parse_and(stream, allow_struct)?;
    while stream.eat(&Token::OrOr) {
        let right = parse_and(stream, allow_struct)?;
        left = binary(BinaryOp::Or, left, right, stream, start);
    }
    Ok(left)
}

fn parse_and(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    let start = stream.current_pos();
    let mut left = parse_equality(stream, allow_struct)?;
    while stream.eat(&Token::AndAnd) {
        let right = parse_equality(stream, allow_struct)?;
        left = binary(BinaryOp::And, left, right, stream, start);
    }
    Ok(left)
}

fn parse_equality(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    let start = stream.current_pos();
    let mut left = parse_comparison(stream, allow_struct)?;
    loop {
        let op = match stream.peek() {
            Token::EqEq => BinaryOp::Eq,
            Token::BangEq => BinaryOp::Ne,
            _ => break,
        };
        stream.advance();
        let right = parse_comparison(stream, allow_struct)?;
        left = binary(op, left, right, stream, start);
    }
    Ok(left)
}

fn parse_comparison(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    let start = stream.current_pos();
    let mut left = parse_additive(stream, allow_struct)?;
    loop {
        let op = match stream.peek() {
            Token::Lt => BinaryOp::Lt,
            Token::LtEq => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::GtEq => BinaryOp::Ge,
            _ => break,
        };
        stream.advance();
        let right = parse_additive(stream, allow_struct)?;
        left = binary(op, left, right, stream, start);
    }
    Ok(left)
}

fn parse_additive(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    let start = stream.current_pos();
    let mut left = parse_multiplicative(stream, allow_struct)?;
    loop {
        let op = match stream.peek() {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            _ => break,
        };
        stream.advance();
        let right = parse_multiplicative(stream, allow_struct)?;
        left = binary(op, left, right, stream, start);
    }
    Ok(left)
}

fn parse_multiplicative(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    let start = stream.current_pos();
    let mut left = parse_unary(stream, allow_struct)?;
    loop {
        let op = match stream.peek() {
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Rem,
            _ => break,
        };
        stream.advance();
        let right = parse_unary(stream, allow_struct)?;
        left = binary(op, left, right, stream, start);
    }
    Ok(left)
}

fn parse_unary(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    let start = stream.current_pos();
    let op = match stream.peek() {
        Token::Bang => Some(UnaryOp::Not),
        Token::Minus => Some(UnaryOp::Neg),
        _ => None,
    };
    if let Some(op) = op {
        stream.advance();
        let operand = parse_unary(stream, allow_struct)?;
        return Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            stream.span_from(start),
        ));
    }
    parse_postfix(stream, allow_struct)
}

fn parse_postfix(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    let start = stream.current_pos();
    let mut expr = parse_primary(stream, allow_struct)?;
    while stream.eat(&Token::Dot) {
        let (field, _) = stream.expect_ident("after `.`")?;
        expr = Expr::new(
            ExprKind::FieldAccess {
                object: Box::new(expr),
                field,
            },
            stream.span_from(start),
        );
    }
    Ok(expr)
}

fn parse_primary(stream: &mut TokenStream, allow_struct: bool) -> Result<Expr, Diagnostic> {
    let start = stream.current_pos();
    let span = stream.current_span();
    match stream.peek().clone() {
        Token::Integer(value) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Integer(value), span))
        }
        Token::Float(value) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Float(value), span))
        }
        Token::True => {
            stream.advance();
            Ok(Expr::new(ExprKind::Bool(true), span))
        }
        Token::False => {
            stream.advance();
            Ok(Expr::new(ExprKind::Bool(false), span))
        }
        Token::Str(value) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Str(value), span))
        }
        Token::LParen => {
            stream.advance();
            let inner = parse_expr(stream, true)?;
            stream.expect(Token::RParen)?;
            Ok(inner)
        }
        Token::Ident(name) => {
            // The two-token lookahead: `Ident (` is a call, `Ident {` an
            // object construction when struct literals are allowed.
            if stream.peek_nth(1) == &Token::LParen {
                stream.advance();
                stream.advance();
                let mut args = Vec::new();
                while !stream.at_end() && !stream.check(&Token::RParen) {
                    args.push(parse_expr(stream, true)?);
                    if !stream.eat(&Token::Comma) {
                        break;
                    }
                }
                stream.expect(Token::RParen)?;
                Ok(Expr::new(
                    ExprKind::Call { name, args },
                    stream.span_from(start),
                ))
            } else if allow_struct && stream.peek_nth(1) == &Token::LBrace {
                stream.advance();
                stream.advance();
                let fields = parse_payload_fields(stream)?;
                stream.expect(Token::RBrace)?;
                Ok(Expr::new(
                    ExprKind::Object { tag: name, fields },
                    stream.span_from(start),
                ))
            } else {
                stream.advance();
                Ok(Expr::new(ExprKind::Identifier(name), span))
            }
        }
        _ => Err(stream.unexpected("where an expression was expected")),
    }
}

fn binary(
    op: BinaryOp,
    left: Expr,
    right: Expr,
    stream: &TokenStream,
    start: usize,
) -> Expr {
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        stream.span_from(start),
    )
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, ExprKind};
    use crate::lexer::lex;
    use crate::parser::parse_expr;

    fn parse(source: &str) -> crate::ast::Expr {
        let (tokens, diagnostics) = lex(source, 0);
        assert!(diagnostics.is_empty(), "lex errors: {:?}", diagnostics);
        parse_expr(&tokens, 0).expect("parse failed")
    }

    #[test]
    fn test_precedence_mul_binds_tighter_than_add() {
        let expr = parse("1 + 2 * 3");
        match expr.kind {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected binary add, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_or_is_lowest() {
        let expr = parse("a == 1 || b == 2 && c == 3");
        assert!(matches!(
            expr.kind,
            ExprKind::Binary {
                op: BinaryOp::Or,
                ..
            }
        ));
    }

    #[test]
    fn test_field_access_chain() {
        let expr = parse("task.meta.owner");
        match expr.kind {
            ExprKind::FieldAccess { object, field } => {
                assert_eq!(field, "owner");
                assert!(matches!(object.kind, ExprKind::FieldAccess { .. }));
            }
            other => panic!("expected field access, got {:?}", other),
        }
    }

    #[test]
    fn test_call_with_args() {
        let expr = parse("format(\"{} and {}\", a, b.c)");
        match expr.kind {
            ExprKind::Call { name, args } => {
                assert_eq!(name, "format");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_object_construction() {
        let expr = parse("task { p: 1, label: \"hi\" }");
        match expr.kind {
            ExprKind::Object { tag, fields } => {
                assert_eq!(tag, "task");
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].0, "p");
            }
            other => panic!("expected object construction, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_nesting() {
        let expr = parse("!-x");
        match expr.kind {
            ExprKind::Unary { op, operand } => {
                assert_eq!(op, crate::ast::UnaryOp::Not);
                assert!(matches!(
                    operand.kind,
                    ExprKind::Unary {
                        op: crate::ast::UnaryOp::Neg,
                        ..
                    }
                ));
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_spans_cover_whole_expression() {
        let source = "1 + 2 * 3";
        let expr = parse(source);
        assert_eq!(expr.span.start, 0);
        assert_eq!(expr.span.end as usize, source.len());
    }
}
