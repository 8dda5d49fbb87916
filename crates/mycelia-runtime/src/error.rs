//! Runtime errors and the recoverable-fault stream.
//!
//! Two severities, never conflated: [`Error`] is for misuse of the
//! interpreter API itself (injecting into a body that does not exist).
//! Everything that can go wrong *inside* a running network — unmatched
//! signals, unknown functions, division by zero, socket overflow — is a
//! [`RuntimeDiagnostic`]: recorded, visible, and never fatal to the cycle.

use crate::value::Value;
use serde::Serialize;
use thiserror::Error;

/// Runtime result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Hard errors at the interpreter API boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown fruiting body: {0}")]
    UnknownFruitingBody(String),

    #[error("unknown frequency: {0}")]
    UnknownFrequency(String),
}

/// Category of recoverable runtime fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaultKind {
    /// Signal arrived at an agent with no matching rule
    UnmatchedSignal,
    /// Call to a function the builtin registry does not know
    UnknownFunction,
    DivideByZero,
    /// Drop-head eviction on a full socket buffer
    Backpressure,
    /// `spawn` of a template that does not exist
    UnknownTemplate,
    /// `spawn` under an instance id that is already taken
    DuplicateInstance,
    /// Operator applied to operands it has no meaning for
    TypeError,
    /// Assignment to a target that does not exist
    UnresolvedTarget,
}

/// A fault as produced by the evaluator, before the interpreter knows
/// which agent and cycle to attribute it to.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One entry in the interpreter's diagnostic stream.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeDiagnostic {
    pub cycle: u64,
    /// Agent (or fruiting body) the fault is attributed to, if any
    pub agent: Option<String>,
    pub kind: FaultKind,
    pub message: String,
}

/// Context side-channel for evaluation: faults raised while producing a
/// value. The value itself is always produced (`Null` on failure).
pub type Faults = Vec<Fault>;

/// Convenience used by the evaluator: raise a fault and yield bottom.
pub fn raise(faults: &mut Faults, kind: FaultKind, message: impl Into<String>) -> Value {
    faults.push(Fault::new(kind, message));
    Value::Null
}
