//! Semantic analysis.
//!
//! A fixed five-phase sweep over the AST: register frequencies, register
//! hyphae, resolve topology spawns, validate sockets, then walk every rule.
//! The analyzer populates insertion-ordered symbol tables and emits
//! diagnostics; it never mutates the AST, and running it twice over the
//! same AST yields the same result.
//!
//! A network whose diagnostics contain any `Error` must not be executed;
//! the `compile` module enforces that by construction.

#[cfg(test)]
mod tests;

use crate::ast::{
    Endpoint, Expr, ExprKind, FrequencyDef, HyphalDef, Network, Statement, Trigger, TypeKind,
    TypeRef,
};
use crate::error::{Diagnostic, DiagnosticKind};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// Symbol tables produced by analysis. Iteration order everywhere is
/// declaration order.
#[derive(Debug, Clone, Default)]
pub struct Symbols {
    /// Frequency name → index into `Network::frequencies`
    frequencies: IndexMap<String, usize>,
    /// Hyphal name → index into `Network::hyphae`
    hyphae: IndexMap<String, usize>,
    /// Instance id → template name, from topology spawns
    instances: IndexMap<String, String>,
    /// Declared fruiting bodies
    bodies: IndexSet<String>,
}

impl Symbols {
    pub fn frequency<'n>(&self, network: &'n Network, name: &str) -> Option<&'n FrequencyDef> {
        self.frequencies.get(name).map(|&i| &network.frequencies[i])
    }

    pub fn hyphal<'n>(&self, network: &'n Network, name: &str) -> Option<&'n HyphalDef> {
        self.hyphae.get(name).map(|&i| &network.hyphae[i])
    }

    pub fn has_frequency(&self, name: &str) -> bool {
        self.frequencies.contains_key(name)
    }

    pub fn has_hyphal(&self, name: &str) -> bool {
        self.hyphae.contains_key(name)
    }

    pub fn template_of(&self, instance: &str) -> Option<&str> {
        self.instances.get(instance).map(|s| s.as_str())
    }

    pub fn is_instance(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    pub fn is_body(&self, name: &str) -> bool {
        self.bodies.contains(name)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &str> {
        self.bodies.iter().map(|s| s.as_str())
    }

    pub fn instances(&self) -> impl Iterator<Item = (&str, &str)> {
        self.instances.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Analysis output: tables plus the full diagnostic list.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub symbols: Symbols,
    pub diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        crate::error::has_errors(&self.diagnostics)
    }
}

/// Run the five-phase sweep.
pub fn analyze(network: &Network) -> Analysis {
    let mut analysis = Analysis::default();

    register_frequencies(network, &mut analysis);
    register_hyphae(network, &mut analysis);
    resolve_spawns(network, &mut analysis);
    check_sockets(network, &mut analysis);
    check_rules(network, &mut analysis);

    debug!(
        frequencies = analysis.symbols.frequencies.len(),
        hyphae = analysis.symbols.hyphae.len(),
        instances = analysis.symbols.instances.len(),
        diagnostics = analysis.diagnostics.len(),
        "analysis complete"
    );
    analysis
}

/// Phase 1: register every frequency; duplicate names are errors, and
/// fields within one frequency must be unique.
fn register_frequencies(network: &Network, analysis: &mut Analysis) {
    for (index, frequency) in network.frequencies.iter().enumerate() {
        if let Some(&first) = analysis.symbols.frequencies.get(&frequency.name) {
            analysis.diagnostics.push(
                Diagnostic::error(
                    DiagnosticKind::DuplicateName,
                    frequency.span,
                    format!("duplicate frequency `{}`", frequency.name),
                )
                .with_label(network.frequencies[first].span, "first declared here"),
            );
            continue;
        }
        analysis
            .symbols
            .frequencies
            .insert(frequency.name.clone(), index);

        let mut seen = IndexSet::new();
        for field in &frequency.fields {
            if !seen.insert(field.name.as_str()) {
                analysis.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::DuplicateName,
                    field.span,
                    format!(
                        "duplicate field `{}` in frequency `{}`",
                        field.name, frequency.name
                    ),
                ));
            }
        }
    }

    // Field types can reference other frequencies, so they are checked
    // once the table is complete.
    for frequency in &network.frequencies {
        for field in &frequency.fields {
            check_type_ref(&field.ty, &analysis.symbols, &mut analysis.diagnostics);
        }
    }
}

/// Phase 2: register every hyphal; duplicate templates and duplicate
/// state fields are errors. State types resolve against the frequency
/// table.
fn register_hyphae(network: &Network, analysis: &mut Analysis) {
    for (index, hyphal) in network.hyphae.iter().enumerate() {
        if let Some(&first) = analysis.symbols.hyphae.get(&hyphal.name) {
            analysis.diagnostics.push(
                Diagnostic::error(
                    DiagnosticKind::DuplicateName,
                    hyphal.span,
                    format!("duplicate hyphal `{}`", hyphal.name),
                )
                .with_label(network.hyphae[first].span, "first declared here"),
            );
            continue;
        }
        analysis.symbols.hyphae.insert(hyphal.name.clone(), index);

        let mut seen = IndexSet::new();
        for field in &hyphal.state {
            if !seen.insert(field.name.as_str()) {
                analysis.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::DuplicateName,
                    field.span,
                    format!(
                        "duplicate state field `{}` in hyphal `{}`",
                        field.name, hyphal.name
                    ),
                ));
            }
            check_type_ref(&field.ty, &analysis.symbols, &mut analysis.diagnostics);
            if let Some(init) = &field.init {
                check_initializer(&field.ty, init, &mut analysis.diagnostics);
            }
        }
    }
}

/// Phase 3: every topology spawn must name a declared hyphal; instance
/// ids must be unique.
fn resolve_spawns(network: &Network, analysis: &mut Analysis) {
    let Some(topology) = &network.topology else {
        return;
    };
    for spawn in &topology.spawns {
        if !analysis.symbols.hyphae.contains_key(&spawn.template) {
            analysis.diagnostics.push(Diagnostic::error(
                DiagnosticKind::UndefinedName,
                spawn.span,
                format!("spawn of undeclared hyphal `{}`", spawn.template),
            ));
        }
        if analysis
            .symbols
            .instances
            .insert(spawn.instance.clone(), spawn.template.clone())
            .is_some()
        {
            analysis.diagnostics.push(Diagnostic::error(
                DiagnosticKind::DuplicateName,
                spawn.span,
                format!("duplicate instance id `{}`", spawn.instance),
            ));
        }
    }
    for body in &topology.bodies {
        if !analysis.symbols.bodies.insert(body.name.clone()) {
            analysis.diagnostics.push(Diagnostic::error(
                DiagnosticKind::DuplicateName,
                body.span,
                format!("duplicate fruiting body `{}`", body.name),
            ));
        }
    }
}

/// Phase 4: socket endpoints must be `*` (destination only), a fruiting
/// body, or a spawned instance; the carried frequency must resolve.
fn check_sockets(network: &Network, analysis: &mut Analysis) {
    let Some(topology) = &network.topology else {
        return;
    };
    for socket in &topology.sockets {
        match &socket.from {
            Endpoint::Broadcast => {
                analysis.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::InvalidTopology,
                    socket.span,
                    "`*` is not a valid socket origin",
                ));
            }
            Endpoint::Name(name) => {
                if !analysis.symbols.is_body(name) && !analysis.symbols.is_instance(name) {
                    analysis.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::InvalidTopology,
                        socket.span,
                        format!("socket origin `{}` is not a fruiting body or instance", name),
                    ));
                }
            }
        }
        if let Endpoint::Name(name) = &socket.to {
            if !analysis.symbols.is_body(name) && !analysis.symbols.is_instance(name) {
                analysis.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::InvalidTopology,
                    socket.span,
                    format!(
                        "socket destination `{}` is not a fruiting body or instance",
                        name
                    ),
                ));
            }
        }
        if !analysis.symbols.has_frequency(&socket.frequency) {
            analysis.diagnostics.push(Diagnostic::error(
                DiagnosticKind::UndefinedName,
                socket.span,
                format!("socket carries undeclared frequency `{}`", socket.frequency),
            ));
        }
    }
}

/// Phase 5: walk every rule of every hyphal. Trigger and emit frequencies
/// must resolve; emit payloads are compared against the frequency schema;
/// conditional branches are descended into.
fn check_rules(network: &Network, analysis: &mut Analysis) {
    for hyphal in &network.hyphae {
        for rule in &hyphal.rules {
            if let Trigger::Signal { frequency, .. } = &rule.trigger {
                if !analysis.symbols.has_frequency(frequency) {
                    analysis.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::UndefinedName,
                        rule.span,
                        format!("rule triggers on undeclared frequency `{}`", frequency),
                    ));
                }
            }
            check_statements(network, &rule.body, analysis);
        }
    }
}

fn check_statements(network: &Network, statements: &[Statement], analysis: &mut Analysis) {
    for statement in statements {
        match statement {
            Statement::Emit {
                frequency,
                fields,
                span,
            } => match analysis.symbols.frequency(network, frequency) {
                None => {
                    analysis.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::UndefinedName,
                        *span,
                        format!("emit of undeclared frequency `{}`", frequency),
                    ));
                }
                Some(def) => {
                    let def = def.clone();
                    check_payload(&def, fields, *span, &mut analysis.diagnostics);
                }
            },
            Statement::Conditional {
                then_branch,
                else_ifs,
                else_branch,
                ..
            } => {
                check_statements(network, then_branch, analysis);
                for (_, branch) in else_ifs {
                    check_statements(network, branch, analysis);
                }
                if let Some(branch) = else_branch {
                    check_statements(network, branch, analysis);
                }
            }
            Statement::Spawn { template, span, .. } => {
                if !analysis.symbols.has_hyphal(template) {
                    analysis.diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::UndefinedName,
                        *span,
                        format!("spawn of undeclared hyphal `{}` will be skipped", template),
                    ));
                }
            }
            Statement::Let { .. }
            | Statement::Assign { .. }
            | Statement::Report { .. }
            | Statement::Die { .. } => {}
        }
    }
}

fn check_payload(
    frequency: &FrequencyDef,
    fields: &[(String, Expr)],
    span: crate::foundation::Span,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, _) in fields {
        if !frequency.fields.iter().any(|f| &f.name == name) {
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::PayloadMismatch,
                span,
                format!(
                    "frequency `{}` has no field `{}`",
                    frequency.name, name
                ),
            ));
        }
    }
    for declared in &frequency.fields {
        if !fields.iter().any(|(name, _)| name == &declared.name) {
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::PayloadMismatch,
                span,
                format!(
                    "emit of `{}` is missing field `{}`",
                    frequency.name, declared.name
                ),
            ));
        }
    }
}

fn check_type_ref(ty: &TypeRef, symbols: &Symbols, diagnostics: &mut Vec<Diagnostic>) {
    match &ty.kind {
        TypeKind::Named(name) => {
            if !symbols.has_frequency(name) {
                diagnostics.push(Diagnostic::error(
                    DiagnosticKind::UnknownType,
                    ty.span,
                    format!("`{}` does not name a declared frequency", name),
                ));
            }
        }
        TypeKind::Vec(inner) | TypeKind::Queue(inner) => {
            check_type_ref(inner, symbols, diagnostics);
        }
        TypeKind::Map(key, value) => {
            check_type_ref(key, symbols, diagnostics);
            check_type_ref(value, symbols, diagnostics);
        }
        _ => {}
    }
}

/// Literal initializers get a shallow kind check against declared
/// primitive types; runtime coercion handles the rest.
fn check_initializer(ty: &TypeRef, init: &Expr, diagnostics: &mut Vec<Diagnostic>) {
    let mismatch = match (&ty.kind, &init.kind) {
        (TypeKind::U32 | TypeKind::I64, ExprKind::Float(_)) => true,
        (TypeKind::U32 | TypeKind::I64 | TypeKind::F64, ExprKind::Str(_) | ExprKind::Bool(_)) => {
            true
        }
        (TypeKind::Str, ExprKind::Integer(_) | ExprKind::Float(_) | ExprKind::Bool(_)) => true,
        (TypeKind::Boolean, ExprKind::Integer(_) | ExprKind::Float(_) | ExprKind::Str(_)) => true,
        _ => false,
    };
    if mismatch {
        diagnostics.push(Diagnostic::warning(
            DiagnosticKind::TypeMismatch,
            init.span,
            "initializer literal does not match the declared type",
        ));
    }
}
