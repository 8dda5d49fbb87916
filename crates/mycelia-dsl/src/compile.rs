//! High-level compile pipeline: lex → parse → analyze.
//!
//! All three stages report through the same [`Diagnostic`] list; nothing
//! here panics on bad input. A [`ValidatedNetwork`] can only be obtained
//! from an analysis that produced zero errors, which is what makes it safe
//! for the runtime crate to accept one without re-checking.

use crate::analyze::{self, Symbols};
use crate::ast::Network;
use crate::error::{has_errors, Diagnostic};
use crate::foundation::SourceMap;
use crate::lexer;
use crate::parser;
use std::path::PathBuf;
use tracing::debug;

/// Everything `parse` produces: the (possibly partial) AST, all lex and
/// parse diagnostics, and the source map needed to render them.
#[derive(Debug)]
pub struct ParseResult {
    pub network: Option<Network>,
    pub diagnostics: Vec<Diagnostic>,
    pub sources: SourceMap,
}

/// Tokenize and parse one source text.
///
/// The AST is `None` only when the opening `network` keyword is missing;
/// recovery otherwise yields a partial tree alongside the diagnostics.
pub fn parse(source: &str, filename: Option<&str>) -> ParseResult {
    let mut sources = SourceMap::new();
    let file_id = sources.add_file(
        PathBuf::from(filename.unwrap_or_default()),
        source.to_string(),
    );

    let (tokens, mut diagnostics) = lexer::lex(source, file_id);
    let (network, parse_diagnostics) = parser::parse_network(&tokens, file_id);
    diagnostics.extend(parse_diagnostics);

    debug!(
        tokens = tokens.len(),
        diagnostics = diagnostics.len(),
        parsed = network.is_some(),
        "parse finished"
    );
    ParseResult {
        network,
        diagnostics,
        sources,
    }
}

/// A network that passed analysis with zero errors; the only input the
/// interpreter accepts.
#[derive(Debug, Clone)]
pub struct ValidatedNetwork {
    network: Network,
    symbols: Symbols,
}

impl ValidatedNetwork {
    /// Analyze `network` and wrap it on success. Warnings are returned
    /// alongside; any error fails the construction.
    pub fn try_new(network: Network) -> Result<(Self, Vec<Diagnostic>), Vec<Diagnostic>> {
        let analysis = analyze::analyze(&network);
        if analysis.has_errors() {
            return Err(analysis.diagnostics);
        }
        Ok((
            Self {
                network,
                symbols: analysis.symbols,
            },
            analysis.diagnostics,
        ))
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }
}

/// Full pipeline output.
#[derive(Debug)]
pub struct Compilation {
    pub sources: SourceMap,
    /// Present iff no stage produced an error.
    pub network: Option<ValidatedNetwork>,
    /// Every diagnostic from every stage, warnings included.
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

/// Compile one source text end to end.
pub fn compile(source: &str, filename: Option<&str>) -> Compilation {
    let parsed = parse(source, filename);
    let mut diagnostics = parsed.diagnostics;

    let network = match parsed.network {
        Some(network) if !has_errors(&diagnostics) => {
            match ValidatedNetwork::try_new(network) {
                Ok((validated, warnings)) => {
                    diagnostics.extend(warnings);
                    Some(validated)
                }
                Err(analysis_diagnostics) => {
                    diagnostics.extend(analysis_diagnostics);
                    None
                }
            }
        }
        // With parse errors present the AST may be partial; analysis still
        // runs for its diagnostics, but the result is not executable.
        Some(network) => {
            diagnostics.extend(analyze::analyze(&network).diagnostics);
            None
        }
        None => None,
    };

    Compilation {
        sources: parsed.sources,
        network,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;

    const HELLO: &str = r#"
network hello {
    frequencies {
        frequency greeting { name: string }
        frequency response { message: string }
    }
    hyphae {
        hyphal greeter {
            on signal(greeting, g) {
                emit response { message: format("Hello, {}!", g.name) }
            }
        }
    }
    topology {
        fruiting_body input
        fruiting_body output
        spawn greeter as G1
        socket input -> G1 : greeting
        socket G1 -> output : response
    }
}
"#;

    #[test]
    fn test_compile_valid_program() {
        let compilation = compile(HELLO, Some("hello.myc"));
        assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);
        let validated = compilation.network.expect("expected a validated network");
        assert_eq!(validated.network().name, "hello");
        assert_eq!(validated.network().frequencies.len(), 2);
        assert!(validated.symbols().is_instance("G1"));
    }

    #[test]
    fn test_semantic_error_blocks_execution() {
        let source = HELLO.replace("spawn greeter as G1", "spawn missing as G1");
        let compilation = compile(&source, None);
        assert!(compilation.has_errors());
        assert!(compilation.network.is_none());
    }

    #[test]
    fn test_missing_network_keyword_yields_null_root() {
        let parsed = parse("frequency ping { n: u32 }", None);
        assert!(parsed.network.is_none());
        assert!(crate::error::has_errors(&parsed.diagnostics));
    }

    #[test]
    fn test_parse_recovers_a_partial_ast() {
        let source = r#"
network broken {
    frequencies {
        frequency ok { n: u32 }
        frequency bad { n: }
    }
    hyphae {
        hyphal fine { on rest { report idle: 1 } }
    }
}
"#;
        let parsed = parse(source, None);
        assert!(crate::error::has_errors(&parsed.diagnostics));
        let network = parsed.network.expect("recovery should keep the root");
        assert!(network.frequencies.iter().any(|f| f.name == "ok"));
        assert!(network.hyphae.iter().any(|h| h.name == "fine"));
    }

    #[test]
    fn test_duplicate_section_warns_and_later_wins() {
        let source = r#"
network twice {
    config { max_buffer_size: 5 }
    config { max_buffer_size: 9 }
}
"#;
        let compilation = compile(source, None);
        assert!(!compilation.has_errors());
        assert!(compilation
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains("duplicate `config`")));
        let validated = compilation.network.unwrap();
        assert_eq!(validated.network().config.max_buffer_size, 9);
    }

    #[test]
    fn test_config_defaults() {
        let compilation = compile("network bare { }", None);
        let validated = compilation.network.unwrap();
        let config = &validated.network().config;
        assert_eq!(config.cycle_period_ms, 100);
        assert_eq!(config.max_buffer_size, 1000);
        assert!(config.enable_health_monitoring);
    }
}
