//! Abstract syntax tree for Mycelia programs.
//!
//! The parser produces exactly one [`Network`] per input. Nodes are plain
//! tagged data with a [`Span`] recorded at the first token of the
//! production; nothing here is mutated after parsing. Name resolution and
//! type checks live in `analyze`, execution in the runtime crate.

use crate::foundation::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub frequencies: Vec<FrequencyDef>,
    pub hyphae: Vec<HyphalDef>,
    pub topology: Option<TopologyDef>,
    pub config: NetworkConfig,
    pub span: Span,
}

/// Named record schema classifying signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyDef {
    pub name: String,
    pub fields: Vec<Field>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub span: Span,
}

/// Reference to a type in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub kind: TypeKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    U32,
    I64,
    F64,
    Str,
    Binary,
    Boolean,
    Vec(Box<TypeRef>),
    Queue(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    /// Reference to a declared frequency (a record type); must resolve at
    /// analysis time.
    Named(String),
}

/// Agent template: state fields plus reactive rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyphalDef {
    pub name: String,
    pub state: Vec<StateField>,
    pub rules: Vec<Rule>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateField {
    pub name: String,
    pub ty: TypeRef,
    pub init: Option<Expr>,
    pub span: Span,
}

/// One reactive rule. Rule order within a hyphal is semantically
/// significant: signal matching is first-match-wins in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub trigger: Trigger,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Trigger {
    /// `on signal(freq, bind) where guard`
    Signal {
        frequency: String,
        binding: Option<String>,
        guard: Option<Expr>,
    },
    /// `on cycle N`
    Cycle { period: u64 },
    /// `on rest`
    Rest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `emit freq { field: expr, ... }`
    Emit {
        frequency: String,
        fields: Vec<(String, Expr)>,
        span: Span,
    },
    /// `let name = expr` — introduces a rule-local binding
    Let {
        name: String,
        value: Expr,
        span: Span,
    },
    /// `path = expr` — assignment to an existing target
    Assign {
        target: Vec<String>,
        value: Expr,
        span: Span,
    },
    Conditional {
        condition: Expr,
        then_branch: Vec<Statement>,
        else_ifs: Vec<(Expr, Vec<Statement>)>,
        else_branch: Option<Vec<Statement>>,
        span: Span,
    },
    /// `report metric: expr`
    Report {
        metric: String,
        value: Expr,
        span: Span,
    },
    /// `spawn template as instance`
    Spawn {
        template: String,
        instance: String,
        span: Span,
    },
    Die { span: Span },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Emit { span, .. }
            | Statement::Let { span, .. }
            | Statement::Assign { span, .. }
            | Statement::Conditional { span, .. }
            | Statement::Report { span, .. }
            | Statement::Spawn { span, .. }
            | Statement::Die { span } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Identifier(String),
    FieldAccess {
        object: Box<Expr>,
        field: String,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// `Tag { field: expr, ... }`
    Object {
        tag: String,
        fields: Vec<(String, Expr)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Instantiation plan: external endpoints, agent spawns, typed sockets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyDef {
    pub bodies: Vec<FruitingBodyDecl>,
    pub spawns: Vec<SpawnDecl>,
    pub sockets: Vec<SocketDecl>,
    pub span: Span,
}

/// Named external I/O endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FruitingBodyDecl {
    pub name: String,
    pub span: Span,
}

/// `spawn template as instance` in the topology section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnDecl {
    pub template: String,
    pub instance: String,
    pub span: Span,
}

/// `socket from -> to : frequency`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketDecl {
    pub from: Endpoint,
    pub to: Endpoint,
    pub frequency: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Endpoint {
    /// `*` — one copy to every current agent; legal only as `to`
    Broadcast,
    Name(String),
}

impl Endpoint {
    pub fn name(&self) -> Option<&str> {
        match self {
            Endpoint::Broadcast => None,
            Endpoint::Name(n) => Some(n),
        }
    }
}

/// Runtime configuration knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Hint to the external driver between steps; the interpreter never
    /// sleeps.
    pub cycle_period_ms: u64,
    /// Socket buffer capacity. Zero disables a socket.
    pub max_buffer_size: usize,
    pub enable_health_monitoring: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: 100,
            max_buffer_size: 1000,
            enable_health_monitoring: true,
        }
    }
}
