//! Read-only runtime views produced at phase boundaries.
//!
//! Snapshots are plain serializable data so visualization and CLI
//! collaborators can consume them without touching live runtime state.

use crate::types::{Phase, Signal, Vitality};
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// Full observable state of an interpreter between cycles.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeSnapshot {
    pub cycle: u64,
    pub phase: Phase,
    pub agents: Vec<AgentSnapshot>,
    pub sockets: Vec<SocketSnapshot>,
    pub bodies: Vec<BodySnapshot>,
    /// Per-agent reported metrics, snapshotted at REST
    pub metrics: IndexMap<String, IndexMap<String, Value>>,
    /// Signals that matched no socket since the interpreter started
    pub routing_misses: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub template: String,
    pub state: IndexMap<String, Value>,
    pub inbox_depth: usize,
    pub outbox_depth: usize,
    pub vitality: Vitality,
    pub age: u64,
    pub failures: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SocketSnapshot {
    pub from: String,
    pub to: String,
    pub frequency: String,
    pub buffered: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BodySnapshot {
    pub name: String,
    /// Delivered by the network, awaiting external observation
    pub inbox: Vec<Signal>,
    /// Injected, awaiting routing at the next SENSE
    pub outbox: Vec<Signal>,
}

/// Per-cycle accounting returned by `step`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    /// Signals placed into agent inboxes during SENSE
    pub delivered: u64,
    /// Signals appended to outboxes during ACT and REST
    pub emitted: u64,
    /// Routing misses, lost destinations and drop-head evictions
    pub dropped: u64,
    /// Wall-clock cost of the cycle; reported, never enforced
    pub duration_ms: f64,
}
