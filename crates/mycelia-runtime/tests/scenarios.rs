//! End-to-end interpreter scenarios: compile a program, drive cycles,
//! observe fruiting bodies and runtime state.

use indexmap::IndexMap;
use mycelia_runtime::{FaultKind, Interpreter, Phase, Value, Vitality};

fn interpreter(source: &str) -> Interpreter {
    let compilation = mycelia_dsl::compile(source, None);
    assert!(
        !compilation.has_errors(),
        "compile errors: {:?}",
        compilation.diagnostics
    );
    Interpreter::new(compilation.network.expect("validated network"))
}

fn payload(entries: &[(&str, Value)]) -> IndexMap<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_hello_scenario() {
    let mut vm = interpreter(
        r#"
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
"#,
    );
    vm.inject("input", "greeting", payload(&[("name", Value::Str("world".into()))]))
        .unwrap();
    vm.step();
    vm.step();

    let delivered = vm.body("output").unwrap().inbox.clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].frequency, "response");
    assert_eq!(
        delivered[0].payload.get("message"),
        Some(&Value::Str("Hello, world!".into()))
    );
}

#[test]
fn test_pipeline_scenario() {
    let mut vm = interpreter(
        r#"
network pipeline {
    frequencies {
        frequency data { v: i64 }
    }
    hyphae {
        hyphal stage {
            on signal(data, d) {
                emit data { v: d.v + 1 }
            }
        }
    }
    topology {
        fruiting_body head
        fruiting_body tail
        spawn stage as S1
        spawn stage as S2
        spawn stage as S3
        socket head -> S1 : data
        socket S1 -> S2 : data
        socket S2 -> S3 : data
        socket S3 -> tail : data
    }
}
"#,
    );
    vm.inject("head", "data", payload(&[("v", Value::Integer(0))]))
        .unwrap();
    for _ in 0..4 {
        vm.step();
    }
    let delivered = vm.body("tail").unwrap().inbox.clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].payload.get("v"), Some(&Value::Integer(3)));
}

#[test]
fn test_guard_selection_scenario() {
    let mut vm = interpreter(
        r#"
network guards {
    frequencies {
        frequency task { p: i64 }
        frequency hi { }
        frequency lo { }
    }
    hyphae {
        hyphal sorter {
            on signal(task, t) where t.p > 5 {
                emit hi { }
            }
            on signal(task, t) {
                emit lo { }
            }
        }
    }
    topology {
        fruiting_body input
        fruiting_body output
        spawn sorter as W
        socket input -> W : task
        socket W -> output : hi
        socket W -> output : lo
    }
}
"#,
    );
    vm.inject("input", "task", payload(&[("p", Value::Integer(9))]))
        .unwrap();
    vm.inject("input", "task", payload(&[("p", Value::Integer(1))]))
        .unwrap();
    vm.step();
    vm.step();

    let delivered = vm.body("output").unwrap().inbox.clone();
    let order: Vec<&str> = delivered.iter().map(|s| s.frequency.as_str()).collect();
    assert_eq!(order, vec!["hi", "lo"]);
}

#[test]
fn test_backpressure_scenario() {
    let mut vm = interpreter(
        r#"
network pressured {
    frequencies {
        frequency burst { n: i64 }
        frequency tick { }
    }
    hyphae {
        hyphal producer {
            on cycle 1 {
                emit burst { n: 1 }
                emit burst { n: 2 }
                emit burst { n: 3 }
            }
        }
        hyphal sink { }
    }
    topology {
        spawn producer as P
        spawn sink as Q
        socket P -> Q : burst
    }
    config {
        max_buffer_size: 2
    }
}
"#,
    );
    vm.step();

    let snapshot = vm.state();
    let socket = &snapshot.sockets[0];
    assert_eq!(socket.buffered, 2);

    let producer = snapshot.agents.iter().find(|a| a.id == "P").unwrap();
    assert_eq!(producer.failures, 1);

    let backpressure: Vec<_> = vm
        .diagnostics()
        .iter()
        .filter(|d| d.kind == FaultKind::Backpressure)
        .collect();
    assert_eq!(backpressure.len(), 1);
    assert_eq!(backpressure[0].agent.as_deref(), Some("P"));

    // the buffer holds the newest two
    vm.step();
    let sink = vm
        .state()
        .agents
        .iter()
        .find(|a| a.id == "Q")
        .unwrap()
        .inbox_depth;
    assert_eq!(sink, 2);
}

#[test]
fn test_broadcast_scenario() {
    let mut vm = interpreter(
        r#"
network broadcasting {
    frequencies {
        frequency ping { }
    }
    hyphae {
        hyphal origin {
            on signal(ping, p) {
                emit ping { }
            }
        }
        hyphal listener {
            state { heard: i64 = 0 }
            on signal(ping, p) {
                heard = heard + 1
            }
        }
    }
    topology {
        fruiting_body input
        spawn origin as O
        spawn listener as A
        spawn listener as B
        spawn listener as C
        socket input -> O : ping
        socket O -> * : ping
    }
}
"#,
    );
    vm.inject("input", "ping", IndexMap::new()).unwrap();
    vm.step(); // inject routes into input->O
    vm.step(); // O hears ping, re-emits to broadcast
    vm.step(); // A, B, C each receive one copy

    let snapshot = vm.state();
    for id in ["A", "B", "C"] {
        let agent = snapshot.agents.iter().find(|a| a.id == id).unwrap();
        assert_eq!(
            agent.state.get("heard"),
            Some(&Value::Integer(1)),
            "agent {} should have heard exactly one ping",
            id
        );
    }
}

#[test]
fn test_cycle_trigger_scenario() {
    let mut vm = interpreter(
        r#"
network ticking {
    frequencies {
        frequency tick { at: i64 }
    }
    hyphae {
        hyphal clock {
            state { beats: i64 = 0 }
            on cycle 3 {
                beats = beats + 1
                emit tick { at: beats }
            }
        }
    }
    topology {
        fruiting_body output
        spawn clock as K
        socket K -> output : tick
    }
}
"#,
    );
    let mut emissions_by_cycle = Vec::new();
    for _ in 0..10 {
        let report = vm.step();
        if report.emitted > 0 {
            emissions_by_cycle.push(report.cycle);
        }
    }
    assert_eq!(emissions_by_cycle, vec![3, 6, 9]);
    assert_eq!(vm.body("output").unwrap().inbox.len(), 3);
}

#[test]
fn test_phase_sequence_and_idle_step() {
    let mut vm = interpreter(
        r#"
network quiet {
    frequencies { frequency noop { } }
    hyphae {
        hyphal still {
            state { x: i64 = 7 }
            on signal(noop, n) { x = x + 1 }
        }
    }
    topology {
        spawn still as S
    }
}
"#,
    );
    assert_eq!(vm.phase(), Phase::Rest);
    assert_eq!(vm.cycle(), 0);

    let before = vm.state();
    vm.step();
    let after = vm.state();

    // an empty step advances only the cycle counter
    assert_eq!(after.cycle, before.cycle + 1);
    assert_eq!(vm.phase(), Phase::Rest);
    let agent = after.agents.iter().find(|a| a.id == "S").unwrap();
    assert_eq!(agent.state.get("x"), Some(&Value::Integer(7)));
    assert_eq!(agent.inbox_depth, 0);
    assert_eq!(agent.outbox_depth, 0);
}

#[test]
fn test_die_is_observed_at_rest() {
    let mut vm = interpreter(
        r#"
network mortal {
    frequencies {
        frequency poison { }
        frequency last_words { }
    }
    hyphae {
        hyphal victim {
            on signal(poison, p) {
                emit last_words { }
                die
            }
        }
    }
    topology {
        fruiting_body input
        fruiting_body output
        spawn victim as V
        socket input -> V : poison
        socket V -> output : last_words
    }
}
"#,
    );
    vm.inject("input", "poison", IndexMap::new()).unwrap();
    vm.step();
    assert_eq!(vm.state().agents.len(), 1, "alive until the poison arrives");
    vm.step();

    let snapshot = vm.state();
    assert!(snapshot.agents.is_empty(), "agent retired at REST");
    // sockets referencing the dead agent are gone with it
    assert!(snapshot.sockets.is_empty());
    // outbox signals emitted before `die` were still delivered
    assert_eq!(vm.body("output").unwrap().inbox.len(), 1);
}

#[test]
fn test_spawn_becomes_visible_next_cycle() {
    let mut vm = interpreter(
        r#"
network growing {
    frequencies {
        frequency seed { }
    }
    hyphae {
        hyphal worker { }
        hyphal mother {
            on signal(seed, s) {
                spawn worker as W1
            }
        }
    }
    topology {
        fruiting_body input
        spawn mother as M
        socket input -> M : seed
    }
}
"#,
    );
    vm.inject("input", "seed", IndexMap::new()).unwrap();
    vm.step();
    assert_eq!(vm.state().agents.len(), 1);
    vm.step();
    let snapshot = vm.state();
    assert_eq!(snapshot.agents.len(), 2);
    let spawned = snapshot.agents.iter().find(|a| a.id == "W1").unwrap();
    assert_eq!(spawned.template, "worker");
}

#[test]
fn test_unmatched_signal_is_a_warning_not_a_halt() {
    let mut vm = interpreter(
        r#"
network deaf {
    frequencies {
        frequency ping { }
        frequency pong { }
    }
    hyphae {
        hyphal oneway {
            on signal(pong, p) { }
        }
    }
    topology {
        fruiting_body input
        spawn oneway as D
        socket input -> D : ping
    }
}
"#,
    );
    vm.inject("input", "ping", IndexMap::new()).unwrap();
    vm.step();
    vm.step();

    let unmatched: Vec<_> = vm
        .diagnostics()
        .iter()
        .filter(|d| d.kind == FaultKind::UnmatchedSignal)
        .collect();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].agent.as_deref(), Some("D"));
    // the interpreter keeps running
    vm.step();
    assert_eq!(vm.cycle(), 3);
}

#[test]
fn test_report_metrics_reach_the_global_map() {
    let mut vm = interpreter(
        r#"
network measured {
    frequencies { frequency beat { } }
    hyphae {
        hyphal meter {
            state { n: i64 = 0 }
            on cycle 1 { n = n + 1 }
            on rest {
                report pulse: n * 10
            }
        }
    }
    topology {
        spawn meter as M
    }
}
"#,
    );
    vm.step();
    vm.step();
    let snapshot = vm.state();
    let metrics = snapshot.metrics.get("M").expect("metrics for M");
    assert_eq!(metrics.get("pulse"), Some(&Value::Integer(20)));
}

#[test]
fn test_vitality_tracks_traffic_and_failures() {
    let mut vm = interpreter(
        r#"
network health {
    frequencies { frequency spam { } }
    hyphae {
        hyphal noisy {
            on cycle 1 {
                emit spam { }
                emit spam { }
            }
        }
        hyphal lazy { }
    }
    topology {
        spawn noisy as N
        spawn lazy as L
        socket N -> L : spam
    }
    config {
        max_buffer_size: 1
    }
}
"#,
    );
    // Each cycle: two emissions into a capacity-1 socket, one eviction,
    // one failure strike for N.
    vm.step();
    let snapshot = vm.state();
    let noisy = snapshot.agents.iter().find(|a| a.id == "N").unwrap();
    let lazy = snapshot.agents.iter().find(|a| a.id == "L").unwrap();
    assert_eq!(noisy.failures, 1);
    assert_eq!(noisy.vitality, Vitality::Active);
    assert_eq!(lazy.vitality, Vitality::Idle);

    vm.step();
    let noisy = vm
        .state()
        .agents
        .iter()
        .find(|a| a.id == "N")
        .unwrap()
        .vitality;
    assert_eq!(noisy, Vitality::Degraded);

    vm.step();
    vm.step();
    let snapshot = vm.state();
    let noisy = snapshot.agents.iter().find(|a| a.id == "N").unwrap();
    assert_eq!(noisy.failures, 4);
    assert_eq!(noisy.vitality, Vitality::Failed);

    // failed agents stop matching rules but stay in the graph
    vm.step();
    let snapshot = vm.state();
    let noisy = snapshot.agents.iter().find(|a| a.id == "N").unwrap();
    assert_eq!(noisy.failures, 4);
    assert_eq!(snapshot.agents.len(), 2);
}

#[test]
fn test_inject_validates_body_and_frequency() {
    let mut vm = interpreter(
        r#"
network strict {
    frequencies { frequency ping { } }
    topology {
        fruiting_body input
    }
}
"#,
    );
    assert!(vm.inject("input", "ping", IndexMap::new()).is_ok());
    assert!(vm.inject("nowhere", "ping", IndexMap::new()).is_err());
    assert!(vm.inject("input", "ghost", IndexMap::new()).is_err());
}

#[test]
fn test_deterministic_runs_are_bit_identical() {
    let source = r#"
network det {
    frequencies {
        frequency data { v: i64 }
    }
    hyphae {
        hyphal mixer {
            state { acc: i64 = 0 }
            on signal(data, d) where d.v % 2 == 0 {
                acc = acc + d.v * 2
                emit data { v: acc }
            }
            on signal(data, d) {
                acc = acc - d.v
            }
            on cycle 2 {
                emit data { v: acc }
            }
        }
    }
    topology {
        fruiting_body input
        fruiting_body output
        spawn mixer as M1
        spawn mixer as M2
        socket input -> M1 : data
        socket M1 -> M2 : data
        socket M2 -> output : data
    }
}
"#;
    let run = |cycles: usize| {
        let mut vm = interpreter(source);
        vm.inject("input", "data", payload(&[("v", Value::Integer(4))]))
            .unwrap();
        vm.inject("input", "data", payload(&[("v", Value::Integer(3))]))
            .unwrap();
        let mut states = Vec::new();
        for _ in 0..cycles {
            vm.step();
            states.push(serde_json::to_string(&vm.state()).unwrap());
        }
        states
    };
    assert_eq!(run(6), run(6));
}
