//! Statement parsers for rule bodies.

use super::expr::{parse_expr, parse_payload_fields};
use super::stream::TokenStream;
use crate::ast::Statement;
use crate::error::Diagnostic;
use crate::lexer::Token;

/// Parse a `{ statement* }` block, recovering inside it so one bad
/// statement does not take the rest of the body with it.
pub fn parse_block(
    stream: &mut TokenStream,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<Statement>, Diagnostic> {
    stream.expect(Token::LBrace)?;
    let mut statements = Vec::new();
    while !stream.at_end() && !stream.check(&Token::RBrace) {
        if stream.eat(&Token::Semicolon) {
            continue;
        }
        let start = stream.current_pos();
        match parse_statement(stream, diagnostics) {
            Ok(statement) => statements.push(statement),
            Err(d) => {
                diagnostics.push(d);
                stream.recover_from(start);
                if stream.check(&Token::RBrace) || stream.check(&Token::LBrace) {
                    break;
                }
            }
        }
    }
    stream.expect(Token::RBrace)?;
    Ok(statements)
}

fn parse_statement(
    stream: &mut TokenStream,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Statement, Diagnostic> {
    let start = stream.current_pos();
    match stream.peek() {
        Token::Emit => {
            stream.advance();
            let (frequency, _) = stream.expect_ident("for emit frequency")?;
            stream.expect(Token::LBrace)?;
            let fields = parse_payload_fields(stream)?;
            stream.expect(Token::RBrace)?;
            Ok(Statement::Emit {
                frequency,
                fields,
                span: stream.span_from(start),
            })
        }
        Token::Let => {
            stream.advance();
            let (name, _) = stream.expect_ident("for let binding")?;
            stream.expect(Token::Eq)?;
            let value = parse_expr(stream, true)?;
            Ok(Statement::Let {
                name,
                value,
                span: stream.span_from(start),
            })
        }
        Token::If => {
            stream.advance();
            let condition = parse_expr(stream, false)?;
            let then_branch = parse_block(stream, diagnostics)?;
            let mut else_ifs = Vec::new();
            let mut else_branch = None;
            while stream.eat(&Token::Else) {
                if stream.eat(&Token::If) {
                    let elif_condition = parse_expr(stream, false)?;
                    let elif_body = parse_block(stream, diagnostics)?;
                    else_ifs.push((elif_condition, elif_body));
                } else {
                    else_branch = Some(parse_block(stream, diagnostics)?);
                    break;
                }
            }
            Ok(Statement::Conditional {
                condition,
                then_branch,
                else_ifs,
                else_branch,
                span: stream.span_from(start),
            })
        }
        Token::Report => {
            stream.advance();
            let (metric, _) = stream.expect_ident("for report metric")?;
            stream.expect(Token::Colon)?;
            let value = parse_expr(stream, true)?;
            Ok(Statement::Report {
                metric,
                value,
                span: stream.span_from(start),
            })
        }
        Token::Spawn => {
            stream.advance();
            let (template, _) = stream.expect_ident("for spawn template")?;
            stream.expect(Token::As)?;
            let (instance, _) = stream.expect_ident("for instance id")?;
            Ok(Statement::Spawn {
                template,
                instance,
                span: stream.span_from(start),
            })
        }
        Token::Die => {
            stream.advance();
            Ok(Statement::Die {
                span: stream.span_from(start),
            })
        }
        Token::Ident(_) => {
            // Without `let`, a dotted path on the left of `=` assigns to an
            // existing target.
            let mut target = vec![stream.expect_ident("for assignment target")?.0];
            while stream.eat(&Token::Dot) {
                target.push(stream.expect_ident("after `.`")?.0);
            }
            stream.expect(Token::Eq)?;
            let value = parse_expr(stream, true)?;
            Ok(Statement::Assign {
                target,
                value,
                span: stream.span_from(start),
            })
        }
        _ => Err(stream.unexpected("at statement start")),
    }
}
