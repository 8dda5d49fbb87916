//! Core runtime types: the tidal-cycle phase machine, signals, and the
//! agents the interpreter owns. Populated from a validated AST.

use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Execution phases of one tidal cycle, in order. The machine starts in
/// `Rest` and every cycle runs `Sense → Act → Rest`; no agent ever runs
/// in a different phase than its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Rest,
    Sense,
    Act,
}

impl Phase {
    /// Phase order within a cycle.
    pub const CYCLE: [Phase; 3] = [Phase::Sense, Phase::Act, Phase::Rest];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Rest => write!(f, "rest"),
            Phase::Sense => write!(f, "sense"),
            Phase::Act => write!(f, "act"),
        }
    }
}

/// Agent health, recomputed at every REST when health monitoring is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Vitality {
    Active,
    Idle,
    Degraded,
    Failed,
}

/// One signal in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    /// Frequency name; the payload conforms to its schema
    pub frequency: String,
    pub payload: IndexMap<String, Value>,
    /// Agent or fruiting body that emitted this signal
    pub origin: String,
    /// Stamped by broadcast fan-out; `None` for point-to-point delivery
    pub destination: Option<String>,
    /// Monotonic per-interpreter sequence number
    pub seq: u64,
}

/// A runtime instance of a hyphal template.
///
/// Agents own their state, inbox and outbox exclusively; they never hold
/// references to each other. All communication goes through sockets owned
/// by the interpreter.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: String,
    /// Template (hyphal) name this agent instantiates
    pub template: String,
    pub state: IndexMap<String, Value>,
    pub inbox: Vec<Signal>,
    pub outbox: Vec<Signal>,
    pub vitality: Vitality,
    /// Completed cycles this agent has survived
    pub age: u64,
    /// Backpressure and fault strikes; drives vitality
    pub failures: u32,
    /// Last reported (metric, value) pairs, newest wins per cycle
    pub metrics: IndexMap<String, Value>,
    /// Marked by `die`; retired at REST
    pub dying: bool,
    /// Saw inbox or outbox traffic this cycle
    pub traffic: bool,
}

impl Agent {
    pub fn new(id: String, template: String, state: IndexMap<String, Value>) -> Self {
        Self {
            id,
            template,
            state,
            inbox: Vec::new(),
            outbox: Vec::new(),
            vitality: Vitality::Idle,
            age: 0,
            failures: 0,
            metrics: IndexMap::new(),
            dying: false,
            traffic: false,
        }
    }
}
