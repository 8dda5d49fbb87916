//! Section-level parsers: `network` root, `frequencies`, `hyphae`,
//! `topology`, `config`.

use super::stmt::parse_block;
use super::stream::TokenStream;
use super::expr::parse_expr;
use crate::ast::{
    Endpoint, Field, FrequencyDef, FruitingBodyDecl, HyphalDef, Network, NetworkConfig, Rule,
    SocketDecl, SpawnDecl, StateField, TopologyDef, Trigger, TypeKind, TypeRef,
};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::lexer::Token;

/// Parse the single `network` declaration a file contains.
pub fn parse_network(stream: &mut TokenStream) -> (Option<Network>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let start = stream.current_pos();

    if !stream.check(&Token::Network) {
        diagnostics.push(Diagnostic::error(
            DiagnosticKind::Syntax,
            stream.current_span(),
            format!("expected `network`, found `{}`", stream.peek()),
        ));
        return (None, diagnostics);
    }
    stream.advance();

    let name = match stream.expect_ident("for network name") {
        Ok((name, _)) => name,
        Err(diagnostic) => {
            diagnostics.push(diagnostic);
            String::from("<anonymous>")
        }
    };
    if let Err(diagnostic) = stream.expect(Token::LBrace) {
        diagnostics.push(diagnostic);
        stream.synchronize();
    }

    let mut frequencies: Option<(Vec<FrequencyDef>, crate::foundation::Span)> = None;
    let mut hyphae: Option<(Vec<HyphalDef>, crate::foundation::Span)> = None;
    let mut topology: Option<TopologyDef> = None;
    let mut config: Option<NetworkConfig> = None;

    while !stream.at_end() && !stream.check(&Token::RBrace) {
        let section_span = stream.current_span();
        match stream.peek() {
            Token::Frequencies => {
                let parsed = parse_frequencies(stream, &mut diagnostics);
                if frequencies.replace((parsed, section_span)).is_some() {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::Structure,
                        section_span,
                        "duplicate `frequencies` section; the later one replaces the earlier",
                    ));
                }
            }
            Token::Hyphae => {
                let parsed = parse_hyphae(stream, &mut diagnostics);
                if hyphae.replace((parsed, section_span)).is_some() {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::Structure,
                        section_span,
                        "duplicate `hyphae` section; the later one replaces the earlier",
                    ));
                }
            }
            Token::Topology => {
                let parsed = parse_topology(stream, &mut diagnostics);
                if topology.replace(parsed).is_some() {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::Structure,
                        section_span,
                        "duplicate `topology` section; the later one replaces the earlier",
                    ));
                }
            }
            Token::Config => {
                let parsed = parse_config(stream, &mut diagnostics);
                if config.replace(parsed).is_some() {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::Structure,
                        section_span,
                        "duplicate `config` section; the later one replaces the earlier",
                    ));
                }
            }
            _ => {
                let at = stream.current_pos();
                diagnostics.push(stream.unexpected("in network body"));
                stream.recover_from(at);
                // A stray closing brace here belongs to nothing we know;
                // consume it so the loop can make progress.
                if stream.check(&Token::RBrace) && stream.peek_nth(1) != &Token::Eof {
                    stream.advance();
                }
            }
        }
    }
    if let Err(diagnostic) = stream.expect(Token::RBrace) {
        diagnostics.push(diagnostic);
    }

    let network = Network {
        name,
        frequencies: frequencies.map(|(f, _)| f).unwrap_or_default(),
        hyphae: hyphae.map(|(h, _)| h).unwrap_or_default(),
        topology,
        config: config.unwrap_or_default(),
        span: stream.span_from(start),
    };
    (Some(network), diagnostics)
}

fn parse_frequencies(
    stream: &mut TokenStream,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<FrequencyDef> {
    stream.advance(); // `frequencies`
    let mut defs = Vec::new();
    if let Err(d) = stream.expect(Token::LBrace) {
        diagnostics.push(d);
        stream.synchronize();
        return defs;
    }
    while !stream.at_end() && !stream.check(&Token::RBrace) {
        let start = stream.current_pos();
        match parse_frequency(stream, diagnostics) {
            Ok(def) => defs.push(def),
            Err(d) => {
                diagnostics.push(d);
                stream.recover_from(start);
                if stream.check(&Token::LBrace) {
                    skip_braced(stream);
                }
            }
        }
    }
    if let Err(d) = stream.expect(Token::RBrace) {
        diagnostics.push(d);
    }
    defs
}

fn parse_frequency(
    stream: &mut TokenStream,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<FrequencyDef, Diagnostic> {
    let start = stream.current_pos();
    stream.expect(Token::Frequency)?;
    let (name, _) = stream.expect_ident("for frequency name")?;
    stream.expect(Token::LBrace)?;
    let mut fields = Vec::new();
    while !stream.at_end() && !stream.check(&Token::RBrace) {
        let field_start = stream.current_pos();
        let parsed = (|| -> Result<Field, Diagnostic> {
            let (field_name, _) = stream.expect_ident("for field name")?;
            stream.expect(Token::Colon)?;
            let ty = parse_type(stream)?;
            Ok(Field {
                name: field_name,
                ty,
                span: stream.span_from(field_start),
            })
        })();
        match parsed {
            Ok(field) => {
                fields.push(field);
                if !stream.eat(&Token::Comma) {
                    break;
                }
            }
            Err(d) => {
                // Recover inside this body: skip to the next field or the
                // closing brace.
                diagnostics.push(d);
                skip_field(stream);
            }
        }
    }
    stream.expect(Token::RBrace)?;
    Ok(FrequencyDef {
        name,
        fields,
        span: stream.span_from(start),
    })
}

/// Skip to the next `,` (consumed) or `}` (left in place).
fn skip_field(stream: &mut TokenStream) {
    while !stream.at_end() {
        match stream.peek() {
            Token::Comma => {
                stream.advance();
                break;
            }
            Token::RBrace => break,
            _ => {
                stream.advance();
            }
        }
    }
}

/// Type references: primitives, generic containers, or a named frequency.
pub(super) fn parse_type(stream: &mut TokenStream) -> Result<TypeRef, Diagnostic> {
    let start = stream.current_pos();
    let kind = match stream.peek().clone() {
        Token::U32 => {
            stream.advance();
            TypeKind::U32
        }
        Token::I64 => {
            stream.advance();
            TypeKind::I64
        }
        Token::F64 => {
            stream.advance();
            TypeKind::F64
        }
        Token::StringTy => {
            stream.advance();
            TypeKind::Str
        }
        Token::Binary => {
            stream.advance();
            TypeKind::Binary
        }
        Token::Boolean => {
            stream.advance();
            TypeKind::Boolean
        }
        Token::Vec => {
            stream.advance();
            stream.expect(Token::Lt)?;
            let inner = parse_type(stream)?;
            stream.expect(Token::Gt)?;
            TypeKind::Vec(Box::new(inner))
        }
        Token::Queue => {
            stream.advance();
            stream.expect(Token::Lt)?;
            let inner = parse_type(stream)?;
            stream.expect(Token::Gt)?;
            TypeKind::Queue(Box::new(inner))
        }
        Token::Map => {
            stream.advance();
            stream.expect(Token::Lt)?;
            let key = parse_type(stream)?;
            stream.expect(Token::Comma)?;
            let value = parse_type(stream)?;
            stream.expect(Token::Gt)?;
            TypeKind::Map(Box::new(key), Box::new(value))
        }
        Token::Ident(name) => {
            stream.advance();
            TypeKind::Named(name)
        }
        _ => return Err(stream.unexpected("where a type was expected")),
    };
    Ok(TypeRef {
        kind,
        span: stream.span_from(start),
    })
}

fn parse_hyphae(stream: &mut TokenStream, diagnostics: &mut Vec<Diagnostic>) -> Vec<HyphalDef> {
    stream.advance(); // `hyphae`
    let mut defs = Vec::new();
    if let Err(d) = stream.expect(Token::LBrace) {
        diagnostics.push(d);
        stream.synchronize();
        return defs;
    }
    while !stream.at_end() && !stream.check(&Token::RBrace) {
        if !stream.check(&Token::Hyphal) {
            let at = stream.current_pos();
            diagnostics.push(stream.unexpected("in hyphae section"));
            stream.recover_from(at);
            if !stream.check(&Token::Hyphal) {
                break;
            }
        }
        let start = stream.current_pos();
        match parse_hyphal(stream, diagnostics) {
            Ok(def) => defs.push(def),
            Err(d) => {
                diagnostics.push(d);
                stream.recover_from(start);
            }
        }
    }
    if let Err(d) = stream.expect(Token::RBrace) {
        diagnostics.push(d);
    }
    defs
}

fn parse_hyphal(
    stream: &mut TokenStream,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<HyphalDef, Diagnostic> {
    let start = stream.current_pos();
    stream.expect(Token::Hyphal)?;
    let (name, _) = stream.expect_ident("for hyphal name")?;
    stream.expect(Token::LBrace)?;

    let mut state = Vec::new();
    let mut rules = Vec::new();
    while !stream.at_end() && !stream.check(&Token::RBrace) {
        match stream.peek() {
            Token::State => {
                stream.advance();
                parse_state_fields(stream, &mut state, diagnostics);
            }
            Token::On => {
                let start = stream.current_pos();
                match parse_rule(stream, diagnostics) {
                    Ok(rule) => rules.push(rule),
                    Err(d) => {
                        diagnostics.push(d);
                        stream.recover_from(start);
                    }
                }
            }
            _ => {
                let at = stream.current_pos();
                diagnostics.push(stream.unexpected("in hyphal body"));
                stream.recover_from(at);
                if stream.check(&Token::RBrace) {
                    break;
                }
            }
        }
    }
    stream.expect(Token::RBrace)?;
    Ok(HyphalDef {
        name,
        state,
        rules,
        span: stream.span_from(start),
    })
}

fn parse_state_fields(
    stream: &mut TokenStream,
    state: &mut Vec<StateField>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Err(d) = stream.expect(Token::LBrace) {
        diagnostics.push(d);
        stream.synchronize();
        return;
    }
    while !stream.at_end() && !stream.check(&Token::RBrace) {
        let start = stream.current_pos();
        let parsed = (|| -> Result<StateField, Diagnostic> {
            let (name, _) = stream.expect_ident("for state field name")?;
            stream.expect(Token::Colon)?;
            let ty = parse_type(stream)?;
            let init = if stream.eat(&Token::Eq) {
                Some(parse_expr(stream, true)?)
            } else {
                None
            };
            Ok(StateField {
                name,
                ty,
                init,
                span: stream.span_from(start),
            })
        })();
        match parsed {
            Ok(field) => {
                state.push(field);
                stream.eat(&Token::Comma);
                stream.eat(&Token::Semicolon);
            }
            Err(d) => {
                diagnostics.push(d);
                stream.recover_from(start);
                if stream.check(&Token::RBrace) {
                    break;
                }
            }
        }
    }
    if let Err(d) = stream.expect(Token::RBrace) {
        diagnostics.push(d);
    }
}

fn parse_rule(
    stream: &mut TokenStream,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Rule, Diagnostic> {
    let start = stream.current_pos();
    stream.expect(Token::On)?;
    let trigger = match stream.peek() {
        Token::Signal => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let (frequency, _) = stream.expect_ident("for trigger frequency")?;
            let binding = if stream.eat(&Token::Comma) {
                Some(stream.expect_ident("for signal binding")?.0)
            } else {
                None
            };
            stream.expect(Token::RParen)?;
            // The whole parenthesized block is consumed before `where` is
            // considered.
            let guard = if stream.eat(&Token::Where) {
                Some(parse_expr(stream, false)?)
            } else {
                None
            };
            Trigger::Signal {
                frequency,
                binding,
                guard,
            }
        }
        Token::Cycle => {
            stream.advance();
            let span = stream.current_span();
            match stream.advance().0 {
                Token::Integer(period) if period > 0 => Trigger::Cycle {
                    period: period as u64,
                },
                Token::Integer(_) => {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Syntax,
                        span,
                        "cycle period must be a positive integer",
                    ));
                }
                other => {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Syntax,
                        span,
                        format!("expected cycle period, found `{}`", other),
                    ));
                }
            }
        }
        Token::Rest => {
            stream.advance();
            Trigger::Rest
        }
        _ => return Err(stream.unexpected("after `on`; expected `signal`, `cycle` or `rest`")),
    };
    let body = parse_block(stream, diagnostics)?;
    Ok(Rule {
        trigger,
        body,
        span: stream.span_from(start),
    })
}

fn parse_topology(stream: &mut TokenStream, diagnostics: &mut Vec<Diagnostic>) -> TopologyDef {
    let start = stream.current_pos();
    stream.advance(); // `topology`
    let mut topology = TopologyDef {
        bodies: Vec::new(),
        spawns: Vec::new(),
        sockets: Vec::new(),
        span: stream.current_span(),
    };
    if let Err(d) = stream.expect(Token::LBrace) {
        diagnostics.push(d);
        stream.synchronize();
        return topology;
    }
    while !stream.at_end() && !stream.check(&Token::RBrace) {
        let item_start = stream.current_pos();
        let parsed = (|| -> Result<(), Diagnostic> {
            match stream.peek() {
                Token::FruitingBody => {
                    stream.advance();
                    let (name, _) = stream.expect_ident("for fruiting body name")?;
                    topology.bodies.push(FruitingBodyDecl {
                        name,
                        span: stream.span_from(item_start),
                    });
                }
                Token::Spawn => {
                    stream.advance();
                    let (template, _) = stream.expect_ident("for spawn template")?;
                    stream.expect(Token::As)?;
                    let (instance, _) = stream.expect_ident("for instance id")?;
                    topology.spawns.push(SpawnDecl {
                        template,
                        instance,
                        span: stream.span_from(item_start),
                    });
                }
                Token::Socket => {
                    stream.advance();
                    let from = parse_endpoint(stream)?;
                    stream.expect(Token::Arrow)?;
                    let to = parse_endpoint(stream)?;
                    stream.expect(Token::Colon)?;
                    let (frequency, _) = stream.expect_ident("for socket frequency")?;
                    topology.sockets.push(SocketDecl {
                        from,
                        to,
                        frequency,
                        span: stream.span_from(item_start),
                    });
                }
                _ => return Err(stream.unexpected("in topology section")),
            }
            Ok(())
        })();
        if let Err(d) = parsed {
            diagnostics.push(d);
            stream.recover_from(item_start);
            if stream.check(&Token::RBrace) {
                break;
            }
        }
    }
    if let Err(d) = stream.expect(Token::RBrace) {
        diagnostics.push(d);
    }
    topology.span = stream.span_from(start);
    topology
}

fn parse_endpoint(stream: &mut TokenStream) -> Result<Endpoint, Diagnostic> {
    match stream.peek() {
        Token::Star => {
            stream.advance();
            Ok(Endpoint::Broadcast)
        }
        Token::Ident(_) => Ok(Endpoint::Name(stream.expect_ident("for endpoint")?.0)),
        _ => Err(stream.unexpected("where a socket endpoint was expected")),
    }
}

fn parse_config(stream: &mut TokenStream, diagnostics: &mut Vec<Diagnostic>) -> NetworkConfig {
    stream.advance(); // `config`
    let mut config = NetworkConfig::default();
    if let Err(d) = stream.expect(Token::LBrace) {
        diagnostics.push(d);
        stream.synchronize();
        return config;
    }
    while !stream.at_end() && !stream.check(&Token::RBrace) {
        let entry_start = stream.current_pos();
        let key_span = stream.current_span();
        let parsed = (|| -> Result<(), Diagnostic> {
            let (key, _) = stream.expect_ident("for config key")?;
            stream.expect(Token::Colon)?;
            let value_span = stream.current_span();
            let value = stream.advance().0;
            match (key.as_str(), &value) {
                ("cycle_period_ms", Token::Integer(v)) if *v >= 0 => {
                    config.cycle_period_ms = *v as u64;
                }
                ("max_buffer_size", Token::Integer(v)) if *v >= 0 => {
                    config.max_buffer_size = *v as usize;
                }
                ("enable_health_monitoring", Token::True) => {
                    config.enable_health_monitoring = true;
                }
                ("enable_health_monitoring", Token::False) => {
                    config.enable_health_monitoring = false;
                }
                ("cycle_period_ms" | "max_buffer_size" | "enable_health_monitoring", other) => {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Structure,
                        value_span,
                        format!("invalid value `{}` for config key `{}`", other, key),
                    ));
                }
                _ => {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::Structure,
                        key_span,
                        format!("unrecognized config key `{}`", key),
                    ));
                }
            }
            Ok(())
        })();
        if let Err(d) = parsed {
            diagnostics.push(d);
            stream.recover_from(entry_start);
            if stream.check(&Token::RBrace) {
                break;
            }
        }
        stream.eat(&Token::Comma);
        stream.eat(&Token::Semicolon);
    }
    if let Err(d) = stream.expect(Token::RBrace) {
        diagnostics.push(d);
    }
    config
}

/// Skip a balanced `{ ... }` group during recovery.
fn skip_braced(stream: &mut TokenStream) {
    let mut depth = 0usize;
    loop {
        match stream.peek() {
            Token::LBrace => {
                depth += 1;
                stream.advance();
            }
            Token::RBrace => {
                stream.advance();
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            Token::Eof => break,
            _ => {
                stream.advance();
            }
        }
    }
}
