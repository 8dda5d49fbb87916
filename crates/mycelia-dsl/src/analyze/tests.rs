use super::{analyze, Analysis};
use crate::compile;
use crate::error::{DiagnosticKind, Severity};

fn analyze_source(source: &str) -> Analysis {
    let parsed = compile::parse(source, None);
    assert!(
        !crate::error::has_errors(&parsed.diagnostics),
        "parse errors: {:?}",
        parsed.diagnostics
    );
    analyze(parsed.network.as_ref().expect("no AST"))
}

const VALID: &str = r#"
network demo {
    frequencies {
        frequency ping { n: u32 }
        frequency pong { n: u32 }
    }
    hyphae {
        hyphal echo {
            state { seen: u32 = 0 }
            on signal(ping, p) {
                seen = seen + 1
                emit pong { n: p.n }
            }
        }
    }
    topology {
        fruiting_body input
        fruiting_body output
        spawn echo as E1
        socket input -> E1 : ping
        socket E1 -> output : pong
    }
}
"#;

#[test]
fn test_valid_network_has_no_diagnostics() {
    let analysis = analyze_source(VALID);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert!(analysis.symbols.has_frequency("ping"));
    assert!(analysis.symbols.has_hyphal("echo"));
    assert!(analysis.symbols.is_instance("E1"));
    assert!(analysis.symbols.is_body("input"));
    assert_eq!(analysis.symbols.template_of("E1"), Some("echo"));
}

#[test]
fn test_analyze_is_idempotent() {
    let parsed = compile::parse(VALID, None);
    let network = parsed.network.as_ref().unwrap();
    let first = analyze(network);
    let second = analyze(network);
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[test]
fn test_duplicate_frequency_is_an_error() {
    let analysis = analyze_source(
        r#"
network demo {
    frequencies {
        frequency ping { n: u32 }
        frequency ping { m: u32 }
    }
}
"#,
    );
    let dup: Vec<_> = analysis
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::DuplicateName)
        .collect();
    assert_eq!(dup.len(), 1);
    assert_eq!(dup[0].severity, Severity::Error);
    assert_eq!(dup[0].labels.len(), 1);
    // registration reflects the surviving declaration
    assert!(analysis.symbols.has_frequency("ping"));
}

#[test]
fn test_duplicate_instance_and_hyphal() {
    let analysis = analyze_source(
        r#"
network demo {
    hyphae {
        hyphal a { }
        hyphal a { }
    }
    topology {
        spawn a as X
        spawn a as X
    }
}
"#,
    );
    let dups = analysis
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::DuplicateName)
        .count();
    assert_eq!(dups, 2);
}

#[test]
fn test_spawn_of_unknown_template_is_an_error() {
    let analysis = analyze_source(
        r#"
network demo {
    topology {
        spawn ghost as G
    }
}
"#,
    );
    assert!(analysis.has_errors());
    assert!(analysis
        .diagnostics
        .iter()
        .any(|d| d.message.contains("undeclared hyphal `ghost`")));
}

#[test]
fn test_socket_endpoint_must_resolve() {
    let analysis = analyze_source(
        r#"
network demo {
    frequencies { frequency ping { n: u32 } }
    topology {
        socket nowhere -> elsewhere : ping
    }
}
"#,
    );
    let topo_errors = analysis
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::InvalidTopology)
        .count();
    assert_eq!(topo_errors, 2);
}

#[test]
fn test_broadcast_origin_is_rejected() {
    let analysis = analyze_source(
        r#"
network demo {
    frequencies { frequency ping { n: u32 } }
    hyphae { hyphal a { } }
    topology {
        spawn a as A
        socket * -> A : ping
    }
}
"#,
    );
    assert!(analysis
        .diagnostics
        .iter()
        .any(|d| d.message.contains("not a valid socket origin")));
}

#[test]
fn test_broadcast_destination_is_fine() {
    let analysis = analyze_source(
        r#"
network demo {
    frequencies { frequency ping { n: u32 } }
    hyphae { hyphal a { } }
    topology {
        spawn a as A
        socket A -> * : ping
    }
}
"#,
    );
    assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics);
}

#[test]
fn test_unresolved_trigger_and_emit_frequencies() {
    let analysis = analyze_source(
        r#"
network demo {
    hyphae {
        hyphal a {
            on signal(ghost, g) {
                emit phantom { x: 1 }
            }
        }
    }
}
"#,
    );
    let undefined = analysis
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::UndefinedName && d.severity == Severity::Error)
        .count();
    assert_eq!(undefined, 2);
}

#[test]
fn test_emit_inside_conditional_is_checked() {
    let analysis = analyze_source(
        r#"
network demo {
    frequencies { frequency ping { n: u32 } }
    hyphae {
        hyphal a {
            on signal(ping, p) {
                if p.n > 1 {
                    emit ghost { n: 1 }
                } else {
                    emit ping { n: 0 }
                }
            }
        }
    }
}
"#,
    );
    assert!(analysis
        .diagnostics
        .iter()
        .any(|d| d.message.contains("undeclared frequency `ghost`")));
}

#[test]
fn test_payload_shape_warnings() {
    let analysis = analyze_source(
        r#"
network demo {
    frequencies { frequency ping { n: u32, tag: string } }
    hyphae {
        hyphal a {
            on cycle 2 {
                emit ping { n: 1, bogus: 2 }
            }
        }
    }
}
"#,
    );
    assert!(!analysis.has_errors());
    let warnings: Vec<_> = analysis
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::PayloadMismatch)
        .collect();
    assert_eq!(warnings.len(), 2); // unknown `bogus`, missing `tag`
}

#[test]
fn test_unknown_named_type_is_an_error() {
    let analysis = analyze_source(
        r#"
network demo {
    frequencies { frequency ping { payload: mystery } }
}
"#,
    );
    assert!(analysis
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::UnknownType));
}

#[test]
fn test_named_type_resolving_to_frequency_is_fine() {
    let analysis = analyze_source(
        r#"
network demo {
    frequencies {
        frequency inner { n: u32 }
        frequency outer { wrapped: inner, all: vec<inner> }
    }
}
"#,
    );
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
}

#[test]
fn test_initializer_kind_mismatch_warns() {
    let analysis = analyze_source(
        r#"
network demo {
    hyphae {
        hyphal a {
            state { count: u32 = "zero" }
        }
    }
}
"#,
    );
    assert!(analysis
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::TypeMismatch));
}

#[test]
fn test_rule_spawn_of_unknown_template_warns() {
    let analysis = analyze_source(
        r#"
network demo {
    frequencies { frequency ping { n: u32 } }
    hyphae {
        hyphal a {
            on signal(ping, p) {
                spawn ghost as g2
            }
        }
    }
}
"#,
    );
    assert!(!analysis.has_errors());
    assert!(analysis
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("will be skipped")));
}
