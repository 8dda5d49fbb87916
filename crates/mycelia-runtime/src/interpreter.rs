//! The tidal-cycle interpreter.
//!
//! Instantiates agents and sockets from a validated topology and executes
//! cycles until the driver stops calling [`Interpreter::step`]. Each cycle
//! runs exactly three ordered phases over every agent:
//!
//! - **SENSE** — socket buffers drain into agent inboxes; freshly injected
//!   fruiting-body signals are routed into buffers for the *next* cycle.
//! - **ACT** — cycle-trigger rules fire, then each inbox signal is matched
//!   first-match-wins in source order; rule bodies mutate state and emit;
//!   outboxes are routed.
//! - **REST** — rest rules run, deferred spawns and deaths are applied,
//!   ages, vitality and metrics are updated.
//!
//! Iteration order is insertion order everywhere it is observable, which
//! is what makes runs bit-identical. Runtime faults never halt a cycle;
//! they accumulate on the diagnostic stream.

use crate::error::{Error, Fault, FaultKind, Faults, Result, RuntimeDiagnostic};
use crate::eval::{eval, EvalContext};
use crate::router::route_signal;
use crate::snapshot::{
    AgentSnapshot, BodySnapshot, CycleReport, RuntimeSnapshot, SocketSnapshot,
};
use crate::storage::{FruitingBody, SocketState, SocketTarget};
use crate::types::{Agent, Phase, Signal, Vitality};
use crate::value::Value;
use indexmap::IndexMap;
use mycelia_dsl::ast::{
    Endpoint, HyphalDef, NetworkConfig, Statement, Trigger,
};
use mycelia_dsl::ValidatedNetwork;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, trace};

struct SpawnRequest {
    template: String,
    instance: String,
    requested_by: Option<String>,
}

/// Cycle-based interpreter over a validated network.
pub struct Interpreter {
    program: Arc<ValidatedNetwork>,
    config: NetworkConfig,
    agents: IndexMap<String, Agent>,
    sockets: Vec<SocketState>,
    bodies: IndexMap<String, FruitingBody>,
    cycle: u64,
    phase: Phase,
    next_seq: u64,
    pending_spawns: VecDeque<SpawnRequest>,
    diagnostics: Vec<RuntimeDiagnostic>,
    metrics: IndexMap<String, IndexMap<String, Value>>,
    routing_misses: u64,
    // per-cycle accounting
    delivered: u64,
    emitted: u64,
    dropped: u64,
}

impl Interpreter {
    /// Build the runtime graph from a validated network. Topology spawns
    /// become agents in declaration order; sockets keep their declaration
    /// order for the routing and delivery guarantees.
    pub fn new(program: ValidatedNetwork) -> Self {
        let program = Arc::new(program);
        let config = program.network().config.clone();

        let mut interpreter = Self {
            program: Arc::clone(&program),
            config,
            agents: IndexMap::new(),
            sockets: Vec::new(),
            bodies: IndexMap::new(),
            cycle: 0,
            phase: Phase::Rest,
            next_seq: 0,
            pending_spawns: VecDeque::new(),
            diagnostics: Vec::new(),
            metrics: IndexMap::new(),
            routing_misses: 0,
            delivered: 0,
            emitted: 0,
            dropped: 0,
        };

        for body in program.symbols().bodies() {
            interpreter
                .bodies
                .insert(body.to_string(), FruitingBody::new(body.to_string()));
        }

        if let Some(topology) = &program.network().topology {
            for spawn in &topology.spawns {
                interpreter.apply_spawn(SpawnRequest {
                    template: spawn.template.clone(),
                    instance: spawn.instance.clone(),
                    requested_by: None,
                });
            }
            for socket in &topology.sockets {
                let Endpoint::Name(from) = &socket.from else {
                    continue;
                };
                let to = match &socket.to {
                    Endpoint::Broadcast => SocketTarget::Broadcast,
                    Endpoint::Name(name) if program.symbols().is_body(name) => {
                        SocketTarget::Body(name.clone())
                    }
                    Endpoint::Name(name) => SocketTarget::Agent(name.clone()),
                };
                interpreter.sockets.push(SocketState::new(
                    from.clone(),
                    to,
                    socket.frequency.clone(),
                    interpreter.config.max_buffer_size,
                ));
            }
        }

        debug!(
            agents = interpreter.agents.len(),
            sockets = interpreter.sockets.len(),
            bodies = interpreter.bodies.len(),
            "interpreter built"
        );
        interpreter
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Read-only view of a fruiting body, for external observers.
    pub fn body(&self, name: &str) -> Option<&FruitingBody> {
        self.bodies.get(name)
    }

    /// Drain the signals the network delivered to a fruiting body.
    pub fn drain_body_inbox(&mut self, name: &str) -> Result<Vec<Signal>> {
        match self.bodies.get_mut(name) {
            Some(body) => Ok(std::mem::take(&mut body.inbox)),
            None => Err(Error::UnknownFruitingBody(name.to_string())),
        }
    }

    /// Accumulated runtime diagnostics.
    pub fn diagnostics(&self) -> &[RuntimeDiagnostic] {
        &self.diagnostics
    }

    /// Drain the diagnostic stream.
    pub fn drain_diagnostics(&mut self) -> Vec<RuntimeDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Append a signal to a fruiting body's outbox; it is routed into the
    /// network at the next SENSE.
    pub fn inject(
        &mut self,
        body: &str,
        frequency: &str,
        payload: IndexMap<String, Value>,
    ) -> Result<()> {
        if !self.program.symbols().has_frequency(frequency) {
            return Err(Error::UnknownFrequency(frequency.to_string()));
        }
        if !self.bodies.contains_key(body) {
            return Err(Error::UnknownFruitingBody(body.to_string()));
        }
        let seq = self.bump_seq();
        match self.bodies.get_mut(body) {
            Some(state) => {
                state.outbox.push(Signal {
                    frequency: frequency.to_string(),
                    payload,
                    origin: body.to_string(),
                    destination: None,
                    seq,
                });
                trace!(body, frequency, seq, "signal injected");
                Ok(())
            }
            None => Err(Error::UnknownFruitingBody(body.to_string())),
        }
    }

    /// Execute exactly one cycle: SENSE, ACT, REST.
    #[instrument(skip(self), fields(cycle = self.cycle + 1))]
    pub fn step(&mut self) -> CycleReport {
        let started = Instant::now();
        self.cycle += 1;
        self.delivered = 0;
        self.emitted = 0;
        self.dropped = 0;

        self.sense();
        self.act();
        self.rest();

        let report = CycleReport {
            cycle: self.cycle,
            delivered: self.delivered,
            emitted: self.emitted,
            dropped: self.dropped,
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        trace!(
            delivered = report.delivered,
            emitted = report.emitted,
            dropped = report.dropped,
            "cycle complete"
        );
        report
    }

    /// Read-only snapshot of all observable runtime state.
    pub fn state(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            cycle: self.cycle,
            phase: self.phase,
            agents: self
                .agents
                .values()
                .map(|agent| AgentSnapshot {
                    id: agent.id.clone(),
                    template: agent.template.clone(),
                    state: agent.state.clone(),
                    inbox_depth: agent.inbox.len(),
                    outbox_depth: agent.outbox.len(),
                    vitality: agent.vitality,
                    age: agent.age,
                    failures: agent.failures,
                })
                .collect(),
            sockets: self
                .sockets
                .iter()
                .map(|socket| SocketSnapshot {
                    from: socket.from.clone(),
                    to: socket.to.label(),
                    frequency: socket.frequency.clone(),
                    buffered: socket.len(),
                })
                .collect(),
            bodies: self
                .bodies
                .values()
                .map(|body| BodySnapshot {
                    name: body.name.clone(),
                    inbox: body.inbox.clone(),
                    outbox: body.outbox.clone(),
                })
                .collect(),
            metrics: self.metrics.clone(),
            routing_misses: self.routing_misses,
        }
    }

    // === Phase 1: SENSE ===

    #[instrument(skip(self), name = "sense")]
    fn sense(&mut self) {
        self.phase = Phase::Sense;

        for agent in self.agents.values_mut() {
            agent.inbox.clear();
            agent.traffic = false;
        }

        // Drain socket buffers in insertion order; this fixes the inbox
        // order when several sockets target one agent.
        for index in 0..self.sockets.len() {
            let drained = self.sockets[index].drain();
            if drained.is_empty() {
                continue;
            }
            match self.sockets[index].to.clone() {
                SocketTarget::Agent(id) => match self.agents.get_mut(&id) {
                    Some(agent) => {
                        self.delivered += drained.len() as u64;
                        agent.traffic = true;
                        agent.inbox.extend(drained);
                    }
                    None => self.dropped += drained.len() as u64,
                },
                SocketTarget::Broadcast => {
                    for signal in drained {
                        let target = signal.destination.clone();
                        match target.and_then(|id| self.agents.get_mut(&id)) {
                            Some(agent) => {
                                self.delivered += 1;
                                agent.traffic = true;
                                agent.inbox.push(signal);
                            }
                            None => self.dropped += 1,
                        }
                    }
                }
                SocketTarget::Body(name) => {
                    // Body-destined signals are normally delivered at
                    // routing time and never buffer; drain defensively.
                    if let Some(body) = self.bodies.get_mut(&name) {
                        body.inbox.extend(drained);
                    }
                }
            }
        }

        // Injected signals enter the network now, after delivery, so a
        // signal enqueued in cycle N is never seen before SENSE of N+1.
        let agent_ids: Vec<String> = self.agents.keys().cloned().collect();
        let body_names: Vec<String> = self.bodies.keys().cloned().collect();
        for name in body_names {
            let pending = match self.bodies.get_mut(&name) {
                Some(body) => std::mem::take(&mut body.outbox),
                None => continue,
            };
            for signal in pending {
                let outcome =
                    route_signal(&signal, &mut self.sockets, &agent_ids, &mut self.bodies);
                if !outcome.matched {
                    self.routing_misses += 1;
                    self.dropped += 1;
                }
                for _ in 0..outcome.overflows {
                    self.dropped += 1;
                    self.diagnostics.push(RuntimeDiagnostic {
                        cycle: self.cycle,
                        agent: Some(name.clone()),
                        kind: FaultKind::Backpressure,
                        message: format!(
                            "socket buffer overflow routing `{}` from `{}`",
                            signal.frequency, name
                        ),
                    });
                }
            }
        }
    }

    // === Phase 2: ACT ===

    #[instrument(skip(self), name = "act")]
    fn act(&mut self) {
        self.phase = Phase::Act;
        let program = Arc::clone(&self.program);
        let ids: Vec<String> = self.agents.keys().cloned().collect();

        for id in &ids {
            let template_name = match self.agents.get_mut(id) {
                Some(agent) => {
                    agent.outbox.clear();
                    if agent.vitality == Vitality::Failed {
                        continue;
                    }
                    agent.template.clone()
                }
                None => continue,
            };
            let Some(hyphal) = program.symbols().hyphal(program.network(), &template_name)
            else {
                continue;
            };

            let mut faults: Faults = Vec::new();
            let mut spawns: Vec<(String, String)> = Vec::new();

            // Cycle triggers are considered once per cycle, regardless of
            // inbox contents, and never fire in cycle 0.
            for rule in &hyphal.rules {
                if let Trigger::Cycle { period } = rule.trigger {
                    if self.cycle % period == 0 {
                        if let Some(agent) = self.agents.get_mut(id) {
                            let mut locals = vec![IndexMap::new()];
                            exec_statements(
                                agent,
                                &rule.body,
                                None,
                                None,
                                &mut locals,
                                &mut faults,
                                &mut spawns,
                                &mut self.next_seq,
                            );
                        }
                    }
                }
            }

            // Inbox signals in arrival order, first matching rule in
            // source order.
            let inbox: Vec<Signal> = self
                .agents
                .get(id)
                .map(|agent| agent.inbox.clone())
                .unwrap_or_default();
            for signal in &inbox {
                if !self.dispatch_signal(hyphal, id, signal, &mut faults, &mut spawns) {
                    faults.push(Fault::new(
                        FaultKind::UnmatchedSignal,
                        format!("no rule matched signal `{}`", signal.frequency),
                    ));
                }
            }

            // After the inbox is processed, route this agent's emissions.
            self.route_outbox(id);
            self.record_faults(id, faults);
            for (template, instance) in spawns {
                self.pending_spawns.push_back(SpawnRequest {
                    template,
                    instance,
                    requested_by: Some(id.clone()),
                });
            }
        }
    }

    /// Try each rule in source order; returns whether one matched.
    fn dispatch_signal(
        &mut self,
        hyphal: &HyphalDef,
        id: &str,
        signal: &Signal,
        faults: &mut Faults,
        spawns: &mut Vec<(String, String)>,
    ) -> bool {
        for rule in &hyphal.rules {
            let Trigger::Signal {
                frequency,
                binding,
                guard,
            } = &rule.trigger
            else {
                continue;
            };
            if frequency != &signal.frequency {
                continue;
            }
            if let Some(guard_expr) = guard {
                let passed = match self.agents.get(id) {
                    Some(agent) => {
                        let ctx = EvalContext {
                            state: &agent.state,
                            binding: binding.as_deref().map(|b| (b, &signal.payload)),
                            locals: &[],
                        };
                        eval(guard_expr, &ctx, faults).is_truthy()
                    }
                    None => false,
                };
                if !passed {
                    continue;
                }
            }
            if let Some(agent) = self.agents.get_mut(id) {
                let mut locals = vec![IndexMap::new()];
                exec_statements(
                    agent,
                    &rule.body,
                    Some(signal),
                    binding.as_deref(),
                    &mut locals,
                    faults,
                    spawns,
                    &mut self.next_seq,
                );
            }
            return true;
        }
        false
    }

    /// Route every signal currently in the agent's outbox that has not
    /// been routed yet (callers pass `from` to bound the slice).
    fn route_outbox(&mut self, id: &str) {
        self.route_outbox_from(id, 0)
    }

    fn route_outbox_from(&mut self, id: &str, start: usize) {
        let outbox: Vec<Signal> = self
            .agents
            .get(id)
            .map(|agent| agent.outbox[start..].to_vec())
            .unwrap_or_default();
        if outbox.is_empty() {
            return;
        }
        self.emitted += outbox.len() as u64;

        let agent_ids: Vec<String> = self.agents.keys().cloned().collect();
        let mut overflows = 0u32;
        for signal in &outbox {
            let outcome = route_signal(signal, &mut self.sockets, &agent_ids, &mut self.bodies);
            if !outcome.matched {
                self.routing_misses += 1;
                self.dropped += 1;
            }
            overflows += outcome.overflows;
        }
        for _ in 0..overflows {
            self.dropped += 1;
            self.diagnostics.push(RuntimeDiagnostic {
                cycle: self.cycle,
                agent: Some(id.to_string()),
                kind: FaultKind::Backpressure,
                message: "socket buffer overflow, oldest signal evicted".to_string(),
            });
        }
        if overflows > 0 {
            if let Some(agent) = self.agents.get_mut(id) {
                agent.failures += overflows;
            }
        }
    }

    // === Phase 3: REST ===

    #[instrument(skip(self), name = "rest")]
    fn rest(&mut self) {
        self.phase = Phase::Rest;
        let program = Arc::clone(&self.program);
        let ids: Vec<String> = self.agents.keys().cloned().collect();

        // Rest rules, one per agent per cycle.
        for id in &ids {
            let template_name = match self.agents.get(id) {
                Some(agent) if agent.vitality != Vitality::Failed => agent.template.clone(),
                _ => continue,
            };
            let Some(hyphal) = program.symbols().hyphal(program.network(), &template_name)
            else {
                continue;
            };
            let Some(rule) = hyphal
                .rules
                .iter()
                .find(|rule| matches!(rule.trigger, Trigger::Rest))
            else {
                continue;
            };

            let mut faults: Faults = Vec::new();
            let mut spawns: Vec<(String, String)> = Vec::new();
            let routed_already = match self.agents.get_mut(id) {
                Some(agent) => {
                    let before = agent.outbox.len();
                    let mut locals = vec![IndexMap::new()];
                    exec_statements(
                        agent,
                        &rule.body,
                        None,
                        None,
                        &mut locals,
                        &mut faults,
                        &mut spawns,
                        &mut self.next_seq,
                    );
                    before
                }
                None => continue,
            };
            self.route_outbox_from(id, routed_already);
            self.record_faults(id, faults);
            for (template, instance) in spawns {
                self.pending_spawns.push_back(SpawnRequest {
                    template,
                    instance,
                    requested_by: Some(id.clone()),
                });
            }
        }

        // Deferred lifecycle: spawns in FIFO order, then deaths. Sockets
        // referencing a retired agent go with it.
        while let Some(request) = self.pending_spawns.pop_front() {
            self.apply_spawn(request);
        }
        let dead: Vec<String> = self
            .agents
            .values()
            .filter(|agent| agent.dying)
            .map(|agent| agent.id.clone())
            .collect();
        for id in &dead {
            debug!(agent = %id, "agent retired");
            self.agents.shift_remove(id);
            self.sockets
                .retain(|socket| socket.from != *id && !socket.to.references_agent(id));
        }

        for agent in self.agents.values_mut() {
            agent.age += 1;
            if self.config.enable_health_monitoring {
                agent.vitality = if agent.failures > 3 {
                    Vitality::Failed
                } else if agent.failures > 1 {
                    Vitality::Degraded
                } else if agent.traffic {
                    Vitality::Active
                } else {
                    Vitality::Idle
                };
            }
        }

        for agent in self.agents.values() {
            if !agent.metrics.is_empty() {
                self.metrics
                    .insert(agent.id.clone(), agent.metrics.clone());
            }
        }
    }

    // === Shared helpers ===

    fn apply_spawn(&mut self, request: SpawnRequest) {
        let program = Arc::clone(&self.program);
        let Some(hyphal) = program
            .symbols()
            .hyphal(program.network(), &request.template)
        else {
            self.diagnostics.push(RuntimeDiagnostic {
                cycle: self.cycle,
                agent: request.requested_by.clone(),
                kind: FaultKind::UnknownTemplate,
                message: format!(
                    "spawn of unknown template `{}` skipped",
                    request.template
                ),
            });
            return;
        };
        if self.agents.contains_key(&request.instance) {
            self.diagnostics.push(RuntimeDiagnostic {
                cycle: self.cycle,
                agent: request.requested_by.clone(),
                kind: FaultKind::DuplicateInstance,
                message: format!(
                    "instance id `{}` is already taken, spawn skipped",
                    request.instance
                ),
            });
            return;
        }

        let mut faults: Faults = Vec::new();
        let state = initial_state(hyphal, &mut faults);
        self.record_faults(&request.instance, faults);
        debug!(agent = %request.instance, template = %request.template, "agent spawned");
        self.agents.insert(
            request.instance.clone(),
            Agent::new(request.instance, request.template, state),
        );
    }

    fn record_faults(&mut self, agent: &str, faults: Faults) {
        for fault in faults {
            self.diagnostics.push(RuntimeDiagnostic {
                cycle: self.cycle,
                agent: Some(agent.to_string()),
                kind: fault.kind,
                message: fault.message,
            });
        }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// Evaluate state-field initializers in declaration order; earlier fields
/// are visible to later initializers.
fn initial_state(hyphal: &HyphalDef, faults: &mut Faults) -> IndexMap<String, Value> {
    let mut state = IndexMap::new();
    for field in &hyphal.state {
        let value = match &field.init {
            Some(init) => {
                let ctx = EvalContext {
                    state: &state,
                    binding: None,
                    locals: &[],
                };
                eval(init, &ctx, faults)
            }
            None => Value::default_for(&field.ty),
        };
        state.insert(field.name.clone(), value);
    }
    state
}

/// Execute a rule body sequentially against one agent.
///
/// Statements mutate agent state, append to the outbox, record metrics,
/// and queue spawn/die requests; faults accumulate without interrupting
/// the remaining statements.
#[allow(clippy::too_many_arguments)]
fn exec_statements(
    agent: &mut Agent,
    statements: &[Statement],
    signal: Option<&Signal>,
    binding: Option<&str>,
    locals: &mut Vec<IndexMap<String, Value>>,
    faults: &mut Faults,
    spawns: &mut Vec<(String, String)>,
    next_seq: &mut u64,
) {
    for statement in statements {
        match statement {
            Statement::Emit {
                frequency, fields, ..
            } => {
                let mut payload = IndexMap::new();
                for (name, expr) in fields {
                    let value = {
                        let ctx = context(agent, signal, binding, locals);
                        eval(expr, &ctx, faults)
                    };
                    payload.insert(name.clone(), value);
                }
                let seq = *next_seq;
                *next_seq += 1;
                agent.outbox.push(Signal {
                    frequency: frequency.clone(),
                    payload,
                    origin: agent.id.clone(),
                    destination: None,
                    seq,
                });
                agent.traffic = true;
            }
            Statement::Let { name, value, .. } => {
                let value = {
                    let ctx = context(agent, signal, binding, locals);
                    eval(value, &ctx, faults)
                };
                if let Some(scope) = locals.last_mut() {
                    scope.insert(name.clone(), value);
                }
            }
            Statement::Assign { target, value, .. } => {
                let value = {
                    let ctx = context(agent, signal, binding, locals);
                    eval(value, &ctx, faults)
                };
                assign(agent, locals, target, value, faults);
            }
            Statement::Conditional {
                condition,
                then_branch,
                else_ifs,
                else_branch,
                ..
            } => {
                let branch = pick_branch(
                    agent, signal, binding, locals, condition, then_branch, else_ifs,
                    else_branch, faults,
                );
                if let Some(branch) = branch {
                    locals.push(IndexMap::new());
                    exec_statements(
                        agent, &branch, signal, binding, locals, faults, spawns, next_seq,
                    );
                    locals.pop();
                }
            }
            Statement::Report { metric, value, .. } => {
                let value = {
                    let ctx = context(agent, signal, binding, locals);
                    eval(value, &ctx, faults)
                };
                agent.metrics.insert(metric.clone(), value);
            }
            Statement::Spawn {
                template, instance, ..
            } => {
                spawns.push((template.clone(), instance.clone()));
            }
            Statement::Die { .. } => {
                agent.dying = true;
            }
        }
    }
}

fn context<'a>(
    agent: &'a Agent,
    signal: Option<&'a Signal>,
    binding: Option<&'a str>,
    locals: &'a [IndexMap<String, Value>],
) -> EvalContext<'a> {
    EvalContext {
        state: &agent.state,
        binding: match (signal, binding) {
            (Some(signal), Some(name)) => Some((name, &signal.payload)),
            _ => None,
        },
        locals,
    }
}

/// Choose the branch of a conditional: head condition, each else-if in
/// order, finally the else branch.
#[allow(clippy::too_many_arguments)]
fn pick_branch(
    agent: &Agent,
    signal: Option<&Signal>,
    binding: Option<&str>,
    locals: &[IndexMap<String, Value>],
    condition: &mycelia_dsl::ast::Expr,
    then_branch: &[Statement],
    else_ifs: &[(mycelia_dsl::ast::Expr, Vec<Statement>)],
    else_branch: &Option<Vec<Statement>>,
    faults: &mut Faults,
) -> Option<Vec<Statement>> {
    let ctx = context(agent, signal, binding, locals);
    if eval(condition, &ctx, faults).is_truthy() {
        return Some(then_branch.to_vec());
    }
    for (elif_condition, elif_body) in else_ifs {
        if eval(elif_condition, &ctx, faults).is_truthy() {
            return Some(elif_body.to_vec());
        }
    }
    else_branch.clone()
}

/// Assignment targets an existing `let` binding (innermost scope first)
/// or a state field; a dotted path descends into records and maps.
fn assign(
    agent: &mut Agent,
    locals: &mut [IndexMap<String, Value>],
    target: &[String],
    value: Value,
    faults: &mut Faults,
) {
    let Some((root, rest)) = target.split_first() else {
        return;
    };
    if let Some(scope) = locals.iter_mut().rev().find(|s| s.contains_key(root)) {
        if rest.is_empty() {
            scope.insert(root.clone(), value);
        } else if let Some(slot) = scope.get_mut(root) {
            assign_path(slot, rest, value, faults);
        }
        return;
    }
    if agent.state.contains_key(root) {
        if rest.is_empty() {
            agent.state.insert(root.clone(), value);
        } else if let Some(slot) = agent.state.get_mut(root) {
            assign_path(slot, rest, value, faults);
        }
        return;
    }
    faults.push(Fault::new(
        FaultKind::UnresolvedTarget,
        format!("assignment to unknown target `{}`", target.join(".")),
    ));
}

fn assign_path(slot: &mut Value, path: &[String], value: Value, faults: &mut Faults) {
    let mut current = slot;
    for segment in &path[..path.len() - 1] {
        current = match current {
            Value::Record { fields, .. } => match fields.get_mut(segment) {
                Some(next) => next,
                None => {
                    faults.push(Fault::new(
                        FaultKind::UnresolvedTarget,
                        format!("record has no field `{}`", segment),
                    ));
                    return;
                }
            },
            Value::Map(entries) => entries.entry(segment.clone()).or_insert(Value::Null),
            other => {
                faults.push(Fault::new(
                    FaultKind::TypeError,
                    format!("cannot descend into {}", other.type_name()),
                ));
                return;
            }
        };
    }
    let last = &path[path.len() - 1];
    match current {
        Value::Record { fields, .. } => {
            fields.insert(last.clone(), value);
        }
        Value::Map(entries) => {
            entries.insert(last.clone(), value);
        }
        other => {
            faults.push(Fault::new(
                FaultKind::TypeError,
                format!("cannot assign field `{}` on {}", last, other.type_name()),
            ));
        }
    }
}
