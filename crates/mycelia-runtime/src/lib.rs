//! # Mycelia runtime
//!
//! Cycle-based interpreter for validated Mycelia networks. The runtime
//! graph — agents, sockets, fruiting bodies — is instantiated from the
//! topology, then driven one tidal cycle (`SENSE → ACT → REST`) at a time
//! by an external tick source.
//!
//! Scheduling is single-threaded, cooperative and phase-synchronous: all
//! agents advance through the same phase together, and read-only
//! snapshots are produced at phase boundaries. Runtime faults are data on
//! a diagnostic stream, never panics.

pub mod error;
pub mod eval;
pub mod interpreter;
pub mod router;
pub mod snapshot;
pub mod storage;
pub mod types;
pub mod value;

pub use error::{Error, FaultKind, Result, RuntimeDiagnostic};
pub use interpreter::Interpreter;
pub use snapshot::{CycleReport, RuntimeSnapshot};
pub use types::{Phase, Signal, Vitality};
pub use value::Value;
